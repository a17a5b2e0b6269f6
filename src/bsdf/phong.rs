use cgmath::prelude::*;
use cgmath::{Matrix3, Point2, Vector3};

use crate::color::Color;
use crate::consts;
use crate::float::*;
use crate::sample;

use super::util;
use super::{BsdfSample, BsdfT, LobeType};

const DIFFUSE_REFLECTION: LobeType = LobeType::from_bits_truncate(
    LobeType::DIFFUSE.bits() | LobeType::REFLECTION.bits(),
);
const GLOSSY_REFLECTION: LobeType = LobeType::from_bits_truncate(
    LobeType::GLOSSY.bits() | LobeType::REFLECTION.bits(),
);

/// Energy normalized Phong: a diffuse base plus a lobe around the
/// mirror direction. Lobes are picked by their luminance.
#[derive(Clone, Debug)]
pub struct Phong {
    diffuse: Color,
    specular: Color,
    exponent: Float,
    /// Probability of sampling the specular lobe when both are allowed
    specular_weight: Float,
}

impl Phong {
    pub fn new(diffuse: Color, specular: Color, exponent: Float) -> Self {
        let d = diffuse.luma().max(0.0);
        let s = specular.luma().max(0.0);
        let specular_weight = if d + s > 0.0 { s / (d + s) } else { 0.5 };
        Self {
            diffuse,
            specular,
            exponent: exponent.max(0.0),
            specular_weight,
        }
    }

    fn mirror(wo: Vector3<Float>) -> Vector3<Float> {
        Vector3::new(-wo.x, -wo.y, wo.z)
    }

    /// Cosine between wi and the mirror direction of wo, raised to the exponent
    fn lobe(&self, wo: Vector3<Float>, wi: Vector3<Float>) -> Float {
        let cos_a = Self::mirror(wo).dot(wi);
        if cos_a <= 0.0 {
            0.0
        } else {
            cos_a.powf(self.exponent)
        }
    }

    fn weights(&self, requested: LobeType) -> Option<(Float, Float)> {
        let pd = if requested.allows(DIFFUSE_REFLECTION) && !self.diffuse.is_black() {
            1.0 - self.specular_weight
        } else {
            0.0
        };
        let ps = if requested.allows(GLOSSY_REFLECTION) && !self.specular.is_black() {
            self.specular_weight
        } else {
            0.0
        };
        if pd + ps == 0.0 {
            None
        } else {
            Some((pd / (pd + ps), ps / (pd + ps)))
        }
    }
}

impl BsdfT for Phong {
    fn lobe_type(&self) -> LobeType {
        DIFFUSE_REFLECTION | GLOSSY_REFLECTION
    }

    fn eval(&self, s: &BsdfSample) -> Color {
        if !util::same_hemisphere(s.wo, s.wi) {
            return Color::black();
        }
        let mut f = Color::black();
        if s.requested.allows(DIFFUSE_REFLECTION) {
            f += self.diffuse * consts::FRAC_1_PI;
        }
        if s.requested.allows(GLOSSY_REFLECTION) {
            let norm = (self.exponent + 2.0) * consts::INV_2_PI;
            f += self.specular * (norm * self.lobe(s.wo, s.wi));
        }
        f
    }

    fn pdf(&self, s: &BsdfSample) -> Float {
        if !util::same_hemisphere(s.wo, s.wi) {
            return 0.0;
        }
        let (pd, ps) = match self.weights(s.requested) {
            Some(w) => w,
            None => return 0.0,
        };
        let diffuse = sample::cosine_hemisphere_pdf(s.wi.z);
        let glossy = (self.exponent + 1.0) * consts::INV_2_PI * self.lobe(s.wo, s.wi);
        pd * diffuse + ps * glossy
    }

    fn sample(&self, uc: Float, u: Point2<Float>, s: &mut BsdfSample) -> Option<Color> {
        if s.wo.z == 0.0 {
            return None;
        }
        let (pd, _) = self.weights(s.requested)?;
        let (diffuse, _) = util::choose(pd, uc);
        let wi = if diffuse {
            let mut wi = sample::cosine_sample_hemisphere(u);
            if s.wo.z < 0.0 {
                wi.z = -wi.z;
            }
            s.sampled = DIFFUSE_REFLECTION;
            wi
        } else {
            // Sample a cosine power lobe around the mirror direction
            let cos_a = u.x.powf(1.0 / (self.exponent + 1.0));
            let sin_a = safe_sqrt(1.0 - cos_a * cos_a);
            let phi = consts::TWO_PI * u.y;
            let local = Vector3::new(sin_a * phi.cos(), sin_a * phi.sin(), cos_a);
            let frame: Matrix3<Float> = crate::util::local_to_world(Self::mirror(s.wo));
            s.sampled = GLOSSY_REFLECTION;
            frame * local
        };
        if !util::same_hemisphere(s.wo, wi) {
            return None;
        }
        s.wi = wi;
        s.eta = 1.0;
        s.pdf = self.pdf(s);
        if s.pdf == 0.0 {
            return None;
        }
        Some(self.eval(s) * wi.z.abs() / s.pdf)
    }
}
