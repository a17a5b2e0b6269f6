use std::sync::Arc;

use cgmath::Point2;
use tracing::warn;

use crate::camera::Camera;
use crate::color::Color;
use crate::config::*;
use crate::film::Film;
use crate::float::*;
use crate::sampler::{Sampler, StratifiedSampler};
use crate::scene::Scene;
use crate::stats;

use super::coordinator::Rect;
use super::tracers;

/// Renders blocks of the image into the shared film
pub struct RenderWorker {
    scene: Arc<Scene>,
    camera: Camera,
    config: RenderConfig,
    film: Arc<Film>,
    /// Every block renders with its own copy
    sampler: Box<dyn Sampler>,
}

impl RenderWorker {
    pub(super) fn new(
        scene: Arc<Scene>,
        camera: Camera,
        config: RenderConfig,
        film: Arc<Film>,
    ) -> RenderWorker {
        let sampler = Box::new(StratifiedSampler::new(config.samples_per_dir, config.seed));
        RenderWorker {
            scene,
            camera,
            config,
            film,
            sampler,
        }
    }

    pub fn render_block(&self, rect: Rect) {
        // Pixel streams are seeded by position so the image doesn't
        // depend on which thread renders which block
        let mut sampler = self.sampler.clone_with_seed(self.config.seed);
        let spp = sampler.samples_per_pixel();
        let mut splats = Vec::new();
        for (x, y) in rect.pixels() {
            sampler.start_pixel(Point2::new(x, y));
            for i in 0..spp {
                sampler.start_sample(i);
                let c = match self.config.render_mode {
                    RenderMode::AdaptivePathTracing => self.adaptive_sample(x, y, &mut *sampler),
                    _ => {
                        let jitter = sampler.next_2d();
                        let raster = Point2::new(x.to_float() + jitter.x, y.to_float() + jitter.y);
                        self.trace(raster, &mut *sampler, &mut splats)
                    }
                };
                if c.is_finite() {
                    self.film.add_color_sample(x, y, c);
                } else {
                    discard(c);
                }
                for (raster, splat) in splats.drain(..) {
                    if splat.is_finite() {
                        self.film.add_splat_sample(raster, splat);
                    } else {
                        discard(splat);
                    }
                }
            }
        }
    }

    /// Radiance through a raster position with the configured integrator
    fn trace(
        &self,
        raster: Point2<Float>,
        sampler: &mut dyn Sampler,
        splats: &mut Vec<(Point2<Float>, Color)>,
    ) -> Color {
        let ray = self.camera.generate_ray(raster, sampler.next_2d());
        match self.config.render_mode {
            RenderMode::PathTracing | RenderMode::AdaptivePathTracing => {
                tracers::path_trace(ray, &self.scene, &self.camera, &self.config, sampler)
            }
            RenderMode::Bdpt => tracers::bdpt(
                ray,
                &self.scene,
                &self.camera,
                &self.config,
                sampler,
                splats,
            ),
        }
    }

    fn adaptive_sample(&self, x: u32, y: u32, sampler: &mut dyn Sampler) -> Color {
        let mut splats = Vec::new();
        let mut trace = |raster: Point2<Float>| self.trace(raster, &mut *sampler, &mut splats);
        let mut pixel = tracers::AdaptivePixel::new(
            Point2::new(x, y),
            self.config.adaptive_grid,
            self.config.adaptive_tolerance,
            &mut trace,
        );
        pixel.estimate()
    }
}

fn discard(c: Color) {
    let count = stats::discard_sample();
    if cfg!(debug_assertions) && count.is_power_of_two() {
        warn!(count, sample = ?c, "discarded non-finite sample");
    }
}
