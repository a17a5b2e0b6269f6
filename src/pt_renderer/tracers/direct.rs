use cgmath::Vector3;

use crate::bsdf::TransportMode;
use crate::color::Color;
use crate::float::*;
use crate::intersect::Interaction;
use crate::sample;
use crate::sampler::Sampler;
use crate::scene::Scene;

/// Next event estimation at isect for radiance leaving toward wo.
/// One light is picked by power and sampled both through the light and
/// through the bsdf, the two combined with the power heuristic.
pub fn estimate_direct(
    scene: &Scene,
    isect: &Interaction<'_>,
    wo: Vector3<Float>,
    sampler: &mut dyn Sampler,
) -> Color {
    let u_pick = sampler.next_1d();
    let u_light = sampler.next_2d();
    let uc_bsdf = sampler.next_1d();
    let u_bsdf = sampler.next_2d();
    let (index, light, pmf) = match scene.sample_light(u_pick) {
        Some(picked) => picked,
        None => return Color::black(),
    };
    let mut ld = Color::black();

    // Sample the light
    if let Some(ls) = light.sample_direct(u_light, isect.p) {
        if ls.pdf > 0.0 && !ls.li.is_black() {
            let f = isect.eval_bsdf(wo, ls.wi, TransportMode::Radiance)
                * isect.cos_s(ls.wi).abs();
            if !f.is_black() && !scene.is_occluded(&isect.shadow_ray_to(ls.p)) {
                if light.is_delta() {
                    ld += f * ls.li / ls.pdf;
                } else {
                    let bsdf_pdf = isect.pdf_bsdf(wo, ls.wi, TransportMode::Radiance);
                    let weight = sample::power_heuristic(1, ls.pdf, 1, bsdf_pdf);
                    ld += f * ls.li * weight / ls.pdf;
                }
            }
        }
    }

    // Sample the bsdf. Delta lights can't be hit.
    if !light.is_delta() {
        if let Some((beta, wi, s)) =
            isect.sample_bsdf(wo, TransportMode::Radiance, uc_bsdf, u_bsdf)
        {
            if !s.is_delta() && !beta.is_black() && isect.consistent(wi) {
                let ray = isect.spawn_ray(wi);
                if let Some(hit) = scene.intersect(&ray) {
                    if hit.emitter.map_or(false, |e| e.index == index) {
                        let light_pdf = light.pdf_direct(isect.p, hit.p, hit.ng);
                        if light_pdf > 0.0 {
                            let weight = sample::power_heuristic(1, s.pdf, 1, light_pdf);
                            ld += beta * hit.le(-wi) * weight;
                        }
                    }
                }
            }
        }
    }
    ld / pmf
}
