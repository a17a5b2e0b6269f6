use cgmath::prelude::*;
use cgmath::Point2;

use crate::bsdf::TransportMode;
use crate::camera::Camera;
use crate::color::Color;
use crate::config::RenderConfig;
use crate::consts;
use crate::float::*;
use crate::intersect::Ray;
use crate::sampler::Sampler;
use crate::scene::Scene;
use crate::util;

use super::vertex::{self, PathVertex};
use super::walk::random_walk;

mod mis;

/// Contribution of one strategy and the film position it belongs to
/// when it doesn't belong to the sampled pixel
struct Connection {
    radiance: Color,
    raster: Option<Point2<Float>>,
}

fn camera_subpath<'a>(
    camera_ray: Ray,
    scene: &'a Scene,
    camera: &'a Camera,
    config: &RenderConfig,
    sampler: &mut dyn Sampler,
) -> Vec<PathVertex<'a>> {
    let max_vertices = config.max_bounces.saturating_add(2);
    let mut path = Vec::with_capacity(max_vertices.min(64));
    let (_, pdf_dir) = camera.pdf_we(camera_ray.orig, camera_ray.dir);
    path.push(PathVertex::camera(camera, camera_ray.orig, Color::white()));
    if pdf_dir == 0.0 {
        return path;
    }
    random_walk(
        scene,
        camera_ray,
        Color::white(),
        pdf_dir,
        max_vertices,
        TransportMode::Radiance,
        sampler,
        &mut path,
    );
    path
}

fn light_subpath<'a>(
    scene: &'a Scene,
    config: &RenderConfig,
    sampler: &mut dyn Sampler,
) -> Vec<PathVertex<'a>> {
    let max_vertices = config.max_bounces.saturating_add(1);
    let mut path = Vec::with_capacity(max_vertices.min(64));
    let u_pick = sampler.next_1d();
    let u_pos = sampler.next_2d();
    let u_dir = sampler.next_2d();
    let (index, light, pmf) = match scene.sample_light(u_pick) {
        Some(picked) => picked,
        None => return path,
    };
    let (p, n, pdf_pos) = light.sample_position(u_pos);
    let (dir, pdf_dir) = match light.sample_emit_direction(u_dir, n) {
        Some(emitted) => emitted,
        None => return path,
    };
    if pdf_pos == 0.0 || pdf_dir == 0.0 {
        return path;
    }
    let le = light.emission(n, dir);
    path.push(PathVertex::light(light, index, p, n, le, pdf_pos * pmf));
    if le.is_black() {
        return path;
    }
    let (cos_t, origin) = if light.is_on_surface() {
        (
            n.dot(dir).abs(),
            p + consts::EPSILON * util::face_forward(n, dir),
        )
    } else {
        (1.0, p)
    };
    let beta = le * cos_t / (pmf * pdf_pos * pdf_dir);
    random_walk(
        scene,
        Ray::from_dir(origin, dir),
        beta,
        pdf_dir,
        max_vertices,
        TransportMode::Importance,
        sampler,
        &mut path,
    );
    path
}

/// Evaluate the strategy with s light vertices and t camera vertices
#[allow(clippy::too_many_arguments)]
fn connect<'a>(
    scene: &'a Scene,
    camera: &'a Camera,
    light_path: &[PathVertex<'a>],
    camera_path: &[PathVertex<'a>],
    s: usize,
    t: usize,
    mis: bool,
    sampler: &mut dyn Sampler,
) -> Option<Connection> {
    let mut sampled = None;
    let mut raster = None;
    let radiance = if s == 0 {
        // Camera path found a light on its own
        let pt = &camera_path[t - 1];
        if !pt.is_light() {
            return None;
        }
        pt.le(&camera_path[t - 2]) * pt.beta
    } else if t == 1 {
        // Connect light path to the camera
        let qs = &light_path[s - 1];
        if !qs.is_connectible() {
            return None;
        }
        let cs = camera.sample_wi(qs.p, sampler.next_2d())?;
        if cs.pdf == 0.0 || cs.we.is_black() {
            return None;
        }
        let v = PathVertex::camera(camera, cs.p, cs.we / cs.pdf);
        let mut l = qs.beta * qs.f(&v, TransportMode::Importance) * v.beta;
        if qs.is_on_surface() {
            l *= cs.wi.dot(qs.ns()).abs();
        }
        if l.is_black() || scene.is_occluded(&qs.shadow_ray_to(cs.p)) {
            return None;
        }
        raster = Some(cs.raster);
        sampled = Some(v);
        l
    } else if s == 1 {
        // Connect camera path to a new light sample
        let pt = &camera_path[t - 1];
        if !pt.is_connectible() {
            return None;
        }
        let (index, light, pmf) = scene.sample_light(sampler.next_1d())?;
        let ls = light.sample_direct(sampler.next_2d(), pt.p)?;
        if ls.pdf == 0.0 || ls.li.is_black() {
            return None;
        }
        let mut v = PathVertex::light(light, index, ls.p, ls.n, ls.li / (ls.pdf * pmf), 0.0);
        v.pdf_fwd = v.pdf_light_origin(scene);
        let mut l = pt.beta * pt.f(&v, TransportMode::Radiance) * v.beta;
        if pt.is_on_surface() {
            l *= ls.wi.dot(pt.ns()).abs();
        }
        if l.is_black() || scene.is_occluded(&pt.shadow_ray_to(ls.p)) {
            return None;
        }
        sampled = Some(v);
        l
    } else {
        // Connect the sub-path ends
        let qs = &light_path[s - 1];
        let pt = &camera_path[t - 1];
        if !qs.is_connectible() || !pt.is_connectible() {
            return None;
        }
        let l = qs.beta
            * qs.f(pt, TransportMode::Importance)
            * pt.f(qs, TransportMode::Radiance)
            * pt.beta;
        if l.is_black() {
            return None;
        }
        let g = vertex::g(scene, qs, pt);
        if g == 0.0 {
            return None;
        }
        l * g
    };
    let weight = mis::weight(scene, light_path, camera_path, sampled.as_ref(), s, t, mis);
    Some(Connection {
        radiance: radiance * weight,
        raster,
    })
}

/// Bidirectional estimate for the camera ray.
/// Returns the contribution to the sampled pixel and pushes
/// contributions landing elsewhere on the film to splats.
pub fn bdpt<'a>(
    camera_ray: Ray,
    scene: &'a Scene,
    camera: &'a Camera,
    config: &RenderConfig,
    sampler: &mut dyn Sampler,
    splats: &mut Vec<(Point2<Float>, Color)>,
) -> Color {
    let camera_path = camera_subpath(camera_ray, scene, camera, config, sampler);
    let light_path = light_subpath(scene, config, sampler);
    let mut c = Color::black();
    for t in 1..=camera_path.len() {
        for s in 0..=light_path.len() {
            // A lone camera vertex and light vertex never see each other
            if s + t < 2 || (s == 1 && t == 1) || s + t - 2 > config.max_bounces {
                continue;
            }
            let connection = match connect(
                scene,
                camera,
                &light_path,
                &camera_path,
                s,
                t,
                config.mis,
                sampler,
            ) {
                Some(connection) => connection,
                None => continue,
            };
            match connection.raster {
                Some(raster) => splats.push((raster, connection.radiance)),
                None => c += connection.radiance,
            }
        }
    }
    c
}
