use crate::bsdf::TransportMode;
use crate::camera::Camera;
use crate::color::Color;
use crate::config::*;
use crate::float::*;
use crate::intersect::Ray;
use crate::sampler::Sampler;
use crate::scene::Scene;

use super::direct::estimate_direct;
use super::vertex::PathVertex;
use super::walk::Walk;

/// Survival probability of the path after the current bounce
fn survival(config: &RenderConfig, bounce: usize, beta: Color) -> Float {
    if bounce < config.pre_rr_bounces {
        return 1.0;
    }
    match config.russian_roulette {
        RussianRoulette::Dynamic => beta.luma().max(0.01).min(1.0),
        RussianRoulette::Static(prob) => prob,
        RussianRoulette::Off => 1.0,
    }
}

/// Unidirectional estimate of the radiance arriving along ray.
/// Emission is counted on the first hit and after specular bounces,
/// every other vertex gathers light through next event estimation.
pub fn path_trace<'a>(
    ray: Ray,
    scene: &'a Scene,
    camera: &'a Camera,
    config: &RenderConfig,
    sampler: &mut dyn Sampler,
) -> Color {
    let mut c = Color::black();
    let mut path = vec![PathVertex::camera(camera, ray.orig, Color::white())];
    let mut walk = Walk::new(scene, ray, Color::white(), 1.0, TransportMode::Radiance);
    let mut bounce = 0;
    let mut specular_bounce = false;
    while walk.extend(&mut path) {
        let wo = -walk.ray().dir;
        let beta = walk.beta();
        match path.last().and_then(|v| v.interaction()) {
            Some(isect) => {
                if bounce == 0 || specular_bounce {
                    c += beta * isect.le(wo);
                }
                if bounce >= config.max_bounces {
                    break;
                }
                if !isect.is_specular() {
                    c += beta * estimate_direct(scene, isect, wo, sampler);
                }
            }
            None => break,
        }
        let prob = survival(config, bounce, beta);
        if prob < 1.0 {
            if sampler.next_1d() >= prob {
                break;
            }
            walk.scale(1.0 / prob);
        }
        match walk.scatter(&mut path, sampler) {
            Some(s) => specular_bounce = s.is_delta(),
            None => break,
        }
        if walk.beta().is_black() {
            break;
        }
        bounce += 1;
        // Only the newest vertex is needed for the next extension
        let stale = path.len() - 1;
        path.drain(..stale);
    }
    c
}
