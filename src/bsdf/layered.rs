//! Coatings: a dielectric layer of fixed thickness over an owned substrate.
//! Directions are refracted into the layer, scattered by the substrate,
//! attenuated by absorption inside the layer and refracted back out.
//! Coats are two-sided and only model reflection.

use cgmath::prelude::*;
use cgmath::{Point2, Vector3};

use crate::color::Color;
use crate::float::*;

use super::fresnel;
use super::util;
use super::{Bsdf, BsdfSample, BsdfT, LobeType, MicrofacetDistribution};

const SPECULAR_REFLECTION: LobeType = LobeType::from_bits_truncate(
    LobeType::SPECULAR.bits() | LobeType::REFLECTION.bits(),
);
const GLOSSY_REFLECTION: LobeType = LobeType::from_bits_truncate(
    LobeType::GLOSSY.bits() | LobeType::REFLECTION.bits(),
);

fn flip(w: Vector3<Float>) -> Vector3<Float> {
    Vector3::new(w.x, w.y, -w.z)
}

/// Query oriented so that wo is above the coat
fn oriented(s: &BsdfSample) -> (BsdfSample, bool) {
    if s.wo.z < 0.0 {
        let mut flipped = *s;
        flipped.wo = flip(s.wo);
        flipped.wi = flip(s.wi);
        (flipped, true)
    } else {
        (*s, false)
    }
}

/// Slab between the outside and the substrate
#[derive(Clone, Debug)]
struct Layer {
    eta: Float,
    thickness: Float,
    sigma_a: Color,
    substrate: Box<Bsdf>,
}

impl Layer {
    /// Direction inside the layer matching the outside direction w.
    /// Both point away from the substrate.
    fn enter(&self, w: Vector3<Float>) -> Option<Vector3<Float>> {
        let (wt, _) = util::refract(w, Vector3::unit_z(), self.eta)?;
        let inner = -wt;
        if inner.z <= 0.0 {
            None
        } else {
            Some(inner)
        }
    }

    fn exit(&self, inner: Vector3<Float>) -> Option<Vector3<Float>> {
        let (wt, _) = util::refract(-inner, Vector3::unit_z(), self.eta)?;
        if wt.z <= 0.0 {
            None
        } else {
            Some(wt)
        }
    }

    fn transmittance(&self, cos_t: Float) -> Float {
        1.0 - fresnel::dielectric(cos_t, self.eta)
    }

    /// Beer-Lambert attenuation along both inner paths
    fn absorption(&self, wo: Vector3<Float>, wi: Vector3<Float>) -> Color {
        if self.sigma_a.is_black() || self.thickness == 0.0 {
            return Color::white();
        }
        let length = self.thickness * (1.0 / wo.z.abs() + 1.0 / wi.z.abs());
        (self.sigma_a * -length).exp()
    }

    fn substrate_allowed(&self, requested: LobeType) -> bool {
        let sub = self.substrate.lobe_type() & requested;
        sub.contains(LobeType::REFLECTION)
            && sub.intersects(LobeType::DIFFUSE | LobeType::GLOSSY | LobeType::SPECULAR)
    }

    /// Substrate contribution for an oriented query
    fn eval(&self, s: &BsdfSample) -> Color {
        if s.wi.z <= 0.0 {
            return Color::black();
        }
        let (wo_in, wi_in) = match (self.enter(s.wo), self.enter(s.wi)) {
            (Some(wo_in), Some(wi_in)) => (wo_in, wi_in),
            // Total internal reflection
            _ => return Color::black(),
        };
        let inner = BsdfSample::with_wi(wo_in, wi_in, s.mode).filtered(s.requested);
        let f = self.substrate.eval(&inner);
        if f.is_black() {
            return f;
        }
        let t = self.transmittance(s.wo.z) * self.transmittance(s.wi.z);
        f * self.absorption(wo_in, wi_in) * (t / sq(self.eta))
    }

    /// Solid angle density of sampling wi through the substrate
    fn pdf(&self, s: &BsdfSample) -> Float {
        if s.wi.z <= 0.0 {
            return 0.0;
        }
        let (wo_in, wi_in) = match (self.enter(s.wo), self.enter(s.wi)) {
            (Some(wo_in), Some(wi_in)) => (wo_in, wi_in),
            _ => return 0.0,
        };
        let inner = BsdfSample::with_wi(wo_in, wi_in, s.mode).filtered(s.requested);
        let pdf = self.substrate.pdf(&inner);
        pdf * s.wi.z.abs() / (sq(self.eta) * wi_in.z.abs())
    }

    /// Sample the substrate through the layer. Returns the weight of the
    /// full path through the layer, leaving the substrate density in s.pdf.
    fn sample(&self, uc: Float, u: Point2<Float>, s: &mut BsdfSample) -> Option<Color> {
        let wo_in = self.enter(s.wo)?;
        let mut inner = BsdfSample::new(wo_in, s.mode).filtered(s.requested);
        let weight = self.substrate.sample(uc, u, &mut inner)?;
        if inner.wi.z <= 0.0 {
            return None;
        }
        let wi = self.exit(inner.wi)?;
        let t = self.transmittance(s.wo.z) * self.transmittance(wi.z);
        s.wi = wi;
        s.sampled = inner.sampled;
        s.eta = 1.0;
        s.pdf = if inner.is_delta() {
            inner.pdf
        } else {
            inner.pdf * wi.z / (sq(self.eta) * inner.wi.z)
        };
        Some(weight * self.absorption(wo_in, inner.wi) * t)
    }
}

/// Smooth clear coat over a substrate
#[derive(Clone, Debug)]
pub struct SmoothCoat {
    layer: Layer,
}

impl SmoothCoat {
    pub fn new(eta: Float, thickness: Float, sigma_a: Color, substrate: Bsdf) -> Self {
        Self {
            layer: Layer {
                eta,
                thickness,
                sigma_a,
                substrate: Box::new(substrate),
            },
        }
    }

    /// Probability of sampling the specular interface
    fn specular_probability(&self, s: &BsdfSample) -> Option<Float> {
        let spec = s.requested.allows(SPECULAR_REFLECTION);
        let sub = self.layer.substrate_allowed(s.requested);
        match (spec, sub) {
            (true, true) => Some(fresnel::dielectric(s.wo.z, self.layer.eta)),
            (true, false) => Some(1.0),
            (false, true) => Some(0.0),
            (false, false) => None,
        }
    }
}

impl BsdfT for SmoothCoat {
    fn lobe_type(&self) -> LobeType {
        (self.layer.substrate.lobe_type() - LobeType::TRANSMISSION) | SPECULAR_REFLECTION
    }

    fn eval(&self, sample: &BsdfSample) -> Color {
        let (s, _) = oriented(sample);
        self.layer.eval(&s)
    }

    fn pdf(&self, sample: &BsdfSample) -> Float {
        let (s, _) = oriented(sample);
        match self.specular_probability(&s) {
            Some(ps) if ps < 1.0 => (1.0 - ps) * self.layer.pdf(&s),
            _ => 0.0,
        }
    }

    fn sample(&self, uc: Float, u: Point2<Float>, sample: &mut BsdfSample) -> Option<Color> {
        if sample.wo.z == 0.0 {
            return None;
        }
        let (mut s, flipped) = oriented(sample);
        let ps = self.specular_probability(&s)?;
        let (specular, uc) = util::choose(ps, uc);
        let weight = if specular {
            s.wi = Vector3::new(-s.wo.x, -s.wo.y, s.wo.z);
            s.pdf = ps;
            s.sampled = SPECULAR_REFLECTION;
            s.eta = 1.0;
            fresnel::dielectric(s.wo.z, self.layer.eta) / ps * Color::white()
        } else {
            let weight = self.layer.sample(uc, u, &mut s)?;
            s.pdf *= 1.0 - ps;
            weight / (1.0 - ps)
        };
        if s.pdf == 0.0 || !weight.is_finite() {
            return None;
        }
        if flipped {
            s.wo = flip(s.wo);
            s.wi = flip(s.wi);
        }
        *sample = s;
        Some(weight)
    }
}

/// Rough dielectric coat over a substrate. The substrate is reached
/// through the smooth refraction of the mean surface.
#[derive(Clone, Debug)]
pub struct RoughCoat {
    layer: Layer,
    distribution: MicrofacetDistribution,
}

impl RoughCoat {
    pub fn new(
        distribution: MicrofacetDistribution,
        eta: Float,
        thickness: Float,
        sigma_a: Color,
        substrate: Bsdf,
    ) -> Self {
        Self {
            layer: Layer {
                eta,
                thickness,
                sigma_a,
                substrate: Box::new(substrate),
            },
            distribution,
        }
    }

    fn specular_probability(&self, s: &BsdfSample) -> Option<Float> {
        let spec = s.requested.allows(GLOSSY_REFLECTION);
        let sub = self.layer.substrate_allowed(s.requested);
        match (spec, sub) {
            (true, true) => Some(clamp(fresnel::dielectric(s.wo.z, self.layer.eta), 0.1, 0.9)),
            (true, false) => Some(1.0),
            (false, true) => Some(0.0),
            (false, false) => None,
        }
    }

    fn half(s: &BsdfSample) -> Option<Vector3<Float>> {
        let wm = s.wo + s.wi;
        if wm.magnitude2() == 0.0 || s.wi.z <= 0.0 {
            return None;
        }
        Some(util::face_up(wm.normalize()))
    }

    fn interface_f(&self, s: &BsdfSample) -> Color {
        if !s.requested.allows(GLOSSY_REFLECTION) {
            return Color::black();
        }
        let wm = match Self::half(s) {
            Some(wm) => wm,
            None => return Color::black(),
        };
        let fr = fresnel::dielectric(s.wo.dot(wm), self.layer.eta);
        let d = self.distribution.d(wm);
        let g = self.distribution.g(s.wo, s.wi);
        Color::gray(d * g * fr / (4.0 * s.wo.z * s.wi.z))
    }

    fn interface_pdf(&self, s: &BsdfSample) -> Float {
        let wm = match Self::half(s) {
            Some(wm) => wm,
            None => return 0.0,
        };
        let dot = s.wo.dot(wm).abs();
        if dot == 0.0 {
            return 0.0;
        }
        self.distribution.pdf(s.wo, wm) / (4.0 * dot)
    }

    fn oriented_eval(&self, s: &BsdfSample) -> Color {
        if s.wi.z <= 0.0 {
            return Color::black();
        }
        self.interface_f(s) + self.layer.eval(s)
    }

    fn oriented_pdf(&self, s: &BsdfSample) -> Float {
        let ps = match self.specular_probability(s) {
            Some(ps) => ps,
            None => return 0.0,
        };
        let mut pdf = 0.0;
        if ps > 0.0 {
            pdf += ps * self.interface_pdf(s);
        }
        if ps < 1.0 {
            pdf += (1.0 - ps) * self.layer.pdf(s);
        }
        pdf
    }
}

impl BsdfT for RoughCoat {
    fn lobe_type(&self) -> LobeType {
        (self.layer.substrate.lobe_type() - LobeType::TRANSMISSION) | GLOSSY_REFLECTION
    }

    fn eval(&self, sample: &BsdfSample) -> Color {
        let (s, _) = oriented(sample);
        self.oriented_eval(&s)
    }

    fn pdf(&self, sample: &BsdfSample) -> Float {
        let (s, _) = oriented(sample);
        self.oriented_pdf(&s)
    }

    fn sample(&self, uc: Float, u: Point2<Float>, sample: &mut BsdfSample) -> Option<Color> {
        if sample.wo.z == 0.0 {
            return None;
        }
        let (mut s, flipped) = oriented(sample);
        let ps = self.specular_probability(&s)?;
        let (specular, uc) = util::choose(ps, uc);
        let weight = if specular {
            let wm = self.distribution.sample_wm(s.wo, u);
            let wi = util::reflect(s.wo, wm);
            if wi.z <= 0.0 {
                return None;
            }
            s.wi = wi;
            s.sampled = GLOSSY_REFLECTION;
            s.eta = 1.0;
            s.pdf = self.oriented_pdf(&s);
            if s.pdf == 0.0 {
                return None;
            }
            self.oriented_eval(&s) * s.wi.z / s.pdf
        } else {
            let weight = self.layer.sample(uc, u, &mut s)?;
            if s.is_delta() {
                s.pdf *= 1.0 - ps;
                weight / (1.0 - ps)
            } else {
                // Combine with the interface lobe that could also produce wi
                s.pdf = self.oriented_pdf(&s);
                if s.pdf == 0.0 {
                    return None;
                }
                self.oriented_eval(&s) * s.wi.z / s.pdf
            }
        };
        if !weight.is_finite() {
            return None;
        }
        if flipped {
            s.wo = flip(s.wo);
            s.wi = flip(s.wi);
        }
        *sample = s;
        Some(weight)
    }
}
