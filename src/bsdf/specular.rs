use cgmath::{Point2, Vector3};

use crate::color::Color;
use crate::float::*;

use super::fresnel::{self, Fresnel};
use super::util;
use super::{BsdfSample, BsdfT, LobeType, TransportMode};

const SPECULAR_REFLECTION: LobeType = LobeType::from_bits_truncate(
    LobeType::SPECULAR.bits() | LobeType::REFLECTION.bits(),
);
const SPECULAR_TRANSMISSION: LobeType = LobeType::from_bits_truncate(
    LobeType::SPECULAR.bits() | LobeType::TRANSMISSION.bits(),
);

fn mirror_direction(wo: Vector3<Float>) -> Vector3<Float> {
    Vector3::new(-wo.x, -wo.y, wo.z)
}

/// Shared sampling of delta reflectors
fn sample_reflection(s: &mut BsdfSample, reflectance: Color) -> Option<Color> {
    if !s.requested.allows(SPECULAR_REFLECTION) || s.wo.z == 0.0 {
        return None;
    }
    s.wi = mirror_direction(s.wo);
    s.pdf = 1.0;
    s.sampled = SPECULAR_REFLECTION;
    s.eta = 1.0;
    Some(reflectance)
}

/// Perfect mirror with a constant reflectance
#[derive(Clone, Debug)]
pub struct Mirror {
    color: Color,
}

impl Mirror {
    pub fn new(color: Color) -> Self {
        Self { color }
    }
}

impl BsdfT for Mirror {
    fn lobe_type(&self) -> LobeType {
        SPECULAR_REFLECTION
    }

    fn eval(&self, _sample: &BsdfSample) -> Color {
        Color::black()
    }

    fn pdf(&self, _sample: &BsdfSample) -> Float {
        0.0
    }

    fn sample(&self, _uc: Float, _u: Point2<Float>, sample: &mut BsdfSample) -> Option<Color> {
        sample_reflection(sample, self.color)
    }
}

/// Polished metal with conductor Fresnel
#[derive(Clone, Debug)]
pub struct SmoothConductor {
    fresnel: Fresnel,
}

impl SmoothConductor {
    pub fn new(eta: Color, k: Color) -> Self {
        Self {
            fresnel: Fresnel::Conductor { eta, k },
        }
    }
}

impl BsdfT for SmoothConductor {
    fn lobe_type(&self) -> LobeType {
        SPECULAR_REFLECTION
    }

    fn eval(&self, _sample: &BsdfSample) -> Color {
        Color::black()
    }

    fn pdf(&self, _sample: &BsdfSample) -> Float {
        0.0
    }

    fn sample(&self, _uc: Float, _u: Point2<Float>, sample: &mut BsdfSample) -> Option<Color> {
        let f = self.fresnel.eval(util::abs_cos_t(sample.wo));
        sample_reflection(sample, f)
    }
}

/// Smooth glass interface choosing reflection or refraction by Fresnel
#[derive(Clone, Debug)]
pub struct SmoothDielectric {
    reflect: Color,
    transmit: Color,
    eta: Float,
}

impl SmoothDielectric {
    pub fn new(reflect: Color, transmit: Color, eta: Float) -> Self {
        Self {
            reflect,
            transmit,
            eta,
        }
    }
}

impl BsdfT for SmoothDielectric {
    fn lobe_type(&self) -> LobeType {
        SPECULAR_REFLECTION | SPECULAR_TRANSMISSION
    }

    fn eval(&self, _sample: &BsdfSample) -> Color {
        Color::black()
    }

    fn pdf(&self, _sample: &BsdfSample) -> Float {
        0.0
    }

    fn sample(&self, uc: Float, _u: Point2<Float>, s: &mut BsdfSample) -> Option<Color> {
        let wo = s.wo;
        if wo.z == 0.0 {
            return None;
        }
        let fr = fresnel::dielectric(util::cos_t(wo), self.eta);
        let pr = if s.requested.allows(SPECULAR_REFLECTION) {
            fr
        } else {
            0.0
        };
        let pt = if s.requested.allows(SPECULAR_TRANSMISSION) {
            1.0 - fr
        } else {
            0.0
        };
        if pr + pt == 0.0 {
            return None;
        }
        if uc < pr / (pr + pt) {
            s.wi = mirror_direction(wo);
            s.pdf = pr / (pr + pt);
            s.sampled = SPECULAR_REFLECTION;
            s.eta = 1.0;
            // f = R * fr / |cos|
            Some(self.reflect * (fr / s.pdf))
        } else {
            let (wi, etap) = util::refract(wo, Vector3::unit_z(), self.eta)?;
            if wi.z == 0.0 {
                return None;
            }
            s.wi = wi;
            s.pdf = pt / (pr + pt);
            s.sampled = SPECULAR_TRANSMISSION;
            s.eta = etap;
            let mut ft = (1.0 - fr) / s.pdf;
            // Radiance is compressed into the smaller solid angle
            if s.mode == TransportMode::Radiance {
                ft /= etap * etap;
            }
            Some(self.transmit * ft)
        }
    }
}

/// Thin slab of glass. Light passes straight through or reflects with
/// the sum of all inter-reflections inside the slab.
#[derive(Clone, Debug)]
pub struct ThinDielectric {
    eta: Float,
}

impl ThinDielectric {
    pub fn new(eta: Float) -> Self {
        Self { eta }
    }
}

impl BsdfT for ThinDielectric {
    fn lobe_type(&self) -> LobeType {
        SPECULAR_REFLECTION | SPECULAR_TRANSMISSION
    }

    fn eval(&self, _sample: &BsdfSample) -> Color {
        Color::black()
    }

    fn pdf(&self, _sample: &BsdfSample) -> Float {
        0.0
    }

    fn sample(&self, uc: Float, _u: Point2<Float>, s: &mut BsdfSample) -> Option<Color> {
        let wo = s.wo;
        if wo.z == 0.0 {
            return None;
        }
        let mut r = fresnel::dielectric(util::abs_cos_t(wo), self.eta);
        let mut t = 1.0 - r;
        if r < 1.0 {
            r += t * t * r / (1.0 - r * r);
            t = 1.0 - r;
        }
        let pr = if s.requested.allows(SPECULAR_REFLECTION) {
            r
        } else {
            0.0
        };
        let pt = if s.requested.allows(SPECULAR_TRANSMISSION) {
            t
        } else {
            0.0
        };
        if pr + pt == 0.0 {
            return None;
        }
        s.eta = 1.0;
        if uc < pr / (pr + pt) {
            s.wi = mirror_direction(wo);
            s.pdf = pr / (pr + pt);
            s.sampled = SPECULAR_REFLECTION;
            Some(Color::gray(r / s.pdf))
        } else {
            s.wi = -wo;
            s.pdf = pt / (pr + pt);
            s.sampled = SPECULAR_TRANSMISSION;
            Some(Color::gray(t / s.pdf))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn thin_dielectric_passes_straight_through() {
        let bsdf = ThinDielectric::new(1.5);
        let wo = Vector3::new(0.6, 0.0, 0.8);
        let mut s = BsdfSample::new(wo, TransportMode::Radiance);
        let w = bsdf.sample(0.99, Point2::new(0.5, 0.5), &mut s).unwrap();
        assert_eq!(s.wi, -wo);
        assert_eq!(s.sampled, SPECULAR_TRANSMISSION);
        // With both lobes allowed the weight is exactly one
        assert_relative_eq!(w.r(), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn smooth_dielectric_respects_filter() {
        let bsdf = SmoothDielectric::new(Color::white(), Color::white(), 1.5);
        let wo = Vector3::new(0.0, 0.0, 1.0);
        let mut s = BsdfSample::new(wo, TransportMode::Radiance).filtered(SPECULAR_REFLECTION);
        let w = bsdf.sample(0.99, Point2::new(0.5, 0.5), &mut s).unwrap();
        assert_eq!(s.sampled, SPECULAR_REFLECTION);
        assert_relative_eq!(s.pdf, 1.0);
        assert_relative_eq!(w.r(), 0.04, epsilon = 1e-9);
    }

    #[test]
    fn radiance_refraction_scales_by_eta() {
        let bsdf = SmoothDielectric::new(Color::white(), Color::white(), 1.5);
        let wo = Vector3::new(0.0, 0.0, 1.0);
        let mut s = BsdfSample::new(wo, TransportMode::Radiance);
        let w = bsdf.sample(0.5, Point2::new(0.5, 0.5), &mut s).unwrap();
        assert_eq!(s.sampled, SPECULAR_TRANSMISSION);
        assert_relative_eq!(w.r(), 1.0 / 2.25, epsilon = 1e-9);
    }
}
