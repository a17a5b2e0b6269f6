use crate::bsdf::{BsdfSample, TransportMode};
use crate::color::Color;
use crate::float::*;
use crate::intersect::Ray;
use crate::sampler::Sampler;
use crate::scene::Scene;

use super::vertex::PathVertex;

/// Incrementally extended sub-path. Callers alternate extend and scatter
/// and may stop or reweight the walk in between.
pub struct Walk<'a> {
    scene: &'a Scene,
    ray: Ray,
    beta: Color,
    /// Solid angle density of the current ray direction
    pdf_fwd: Float,
    mode: TransportMode,
}

impl<'a> Walk<'a> {
    pub fn new(scene: &'a Scene, ray: Ray, beta: Color, pdf_fwd: Float, mode: TransportMode) -> Self {
        Self {
            scene,
            ray,
            beta,
            pdf_fwd,
            mode,
        }
    }

    pub fn ray(&self) -> &Ray {
        &self.ray
    }

    pub fn beta(&self) -> Color {
        self.beta
    }

    pub fn scale(&mut self, s: Float) {
        self.beta *= s;
    }

    /// Trace the current ray and append the hit to path.
    /// Returns false if the ray escapes or arrives at the back of a
    /// surface whose shading normal faces the ray.
    pub fn extend(&mut self, path: &mut Vec<PathVertex<'a>>) -> bool {
        let isect = match self.scene.intersect(&self.ray) {
            Some(isect) => isect,
            None => return false,
        };
        let wo = -self.ray.dir;
        if !isect.consistent(wo) {
            return false;
        }
        let vertex = match path.last() {
            Some(prev) => PathVertex::surface(isect, wo, self.mode, self.beta, self.pdf_fwd, prev),
            None => return false,
        };
        path.push(vertex);
        true
    }

    /// Sample a continuation from the last vertex of path and record the
    /// reverse density on the one before it
    pub fn scatter(
        &mut self,
        path: &mut [PathVertex<'a>],
        sampler: &mut dyn Sampler,
    ) -> Option<BsdfSample> {
        let n = path.len();
        if n < 2 {
            return None;
        }
        let (head, tail) = path.split_at_mut(n - 1);
        let prev = &mut head[n - 2];
        let vertex = &mut tail[0];
        let isect = vertex.interaction()?;
        let wo = -self.ray.dir;
        let uc = sampler.next_1d();
        let u = sampler.next_2d();
        let (weight, wi, s) = isect.sample_bsdf(wo, self.mode, uc, u)?;
        if weight.is_black() || s.pdf == 0.0 || !isect.consistent(wi) {
            return None;
        }
        let correction = isect.shading_correction(wo, wi, self.mode);
        let ray = isect.spawn_ray(wi);
        let (pdf_fwd, pdf_rev) = if s.is_delta() {
            (0.0, 0.0)
        } else {
            (s.pdf, isect.pdf_bsdf(wi, wo, self.mode))
        };
        vertex.delta = s.is_delta();
        prev.pdf_rev = vertex.convert_density(pdf_rev, prev);
        self.beta *= weight * correction;
        self.pdf_fwd = pdf_fwd;
        self.ray = ray;
        Some(s)
    }
}

/// Extend path until it has max_vertices vertices or the walk ends.
/// path must hold the starting endpoint.
#[allow(clippy::too_many_arguments)]
pub fn random_walk<'a>(
    scene: &'a Scene,
    ray: Ray,
    beta: Color,
    pdf: Float,
    max_vertices: usize,
    mode: TransportMode,
    sampler: &mut dyn Sampler,
    path: &mut Vec<PathVertex<'a>>,
) {
    let mut walk = Walk::new(scene, ray, beta, pdf, mode);
    while path.len() < max_vertices {
        if !walk.extend(path) || path.len() >= max_vertices {
            break;
        }
        if walk.scatter(path, sampler).is_none() {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bsdf::Bsdf;
    use crate::camera::Camera;
    use crate::sampler::RandomSampler;
    use crate::scene::SceneBuilder;
    use crate::shape::Shape;
    use cgmath::prelude::*;
    use cgmath::{Point3, Rad, Vector3};

    // Open box of diffuse walls facing the origin
    fn box_scene() -> Scene {
        let mut builder = SceneBuilder::new();
        let white = Bsdf::lambertian(Color::gray(0.8));
        let s = 2.0;
        builder
            .add(
                Shape::quad(
                    Point3::new(-s, -s, -s),
                    Vector3::new(0.0, 0.0, 2.0 * s),
                    Vector3::new(2.0 * s, 0.0, 0.0),
                ),
                white.clone(),
            )
            .add(
                Shape::quad(
                    Point3::new(-s, s, -s),
                    Vector3::new(2.0 * s, 0.0, 0.0),
                    Vector3::new(0.0, 0.0, 2.0 * s),
                ),
                white.clone(),
            )
            .add(
                Shape::quad(
                    Point3::new(-s, -s, -s),
                    Vector3::new(2.0 * s, 0.0, 0.0),
                    Vector3::new(0.0, 2.0 * s, 0.0),
                ),
                white,
            );
        builder.build()
    }

    #[test]
    fn walk_respects_vertex_limit_and_densities() {
        let scene = box_scene();
        let camera = Camera::look_at(
            Point3::new(0.0, 0.0, 1.5),
            Point3::new(0.0, 0.0, 0.0),
            Vector3::unit_y(),
            Rad(1.0),
            4,
            4,
        );
        let mut sampler = RandomSampler::new(1, 3);
        for _ in 0..50 {
            let ray = Ray::from_dir(camera.pos, -Vector3::unit_z());
            let mut path = vec![PathVertex::camera(&camera, camera.pos, Color::white())];
            random_walk(
                &scene,
                ray,
                Color::white(),
                1.0,
                5,
                TransportMode::Radiance,
                &mut sampler,
                &mut path,
            );
            assert!(path.len() >= 2 && path.len() <= 5);
            // Vertices followed by a scattered vertex got their reverse density
            for i in 1..path.len().saturating_sub(2) {
                assert!(path[i].pdf_rev > 0.0);
            }
            for v in &path[1..] {
                assert!(v.pdf_fwd > 0.0);
                assert!(v.beta.max_component() <= 1.0);
            }
        }
    }

    #[test]
    fn walk_stops_when_escaping() {
        let scene = box_scene();
        let camera = Camera::look_at(
            Point3::new(0.0, 0.0, 1.5),
            Point3::new(0.0, 0.0, 5.0),
            Vector3::unit_y(),
            Rad(1.0),
            4,
            4,
        );
        let mut sampler = RandomSampler::new(1, 3);
        let ray = Ray::from_dir(camera.pos, Vector3::unit_z());
        let mut path = vec![PathVertex::camera(&camera, camera.pos, Color::white())];
        random_walk(
            &scene,
            ray,
            Color::white(),
            1.0,
            5,
            TransportMode::Radiance,
            &mut sampler,
            &mut path,
        );
        assert_eq!(path.len(), 1);
        assert!(path[0].p.distance(camera.pos) == 0.0);
    }
}
