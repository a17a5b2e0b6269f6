use cgmath::prelude::*;
use cgmath::Point2;

use crate::color::Color;
use crate::consts;
use crate::float::*;
use crate::sample;

use super::fresnel;
use super::util;
use super::MicrofacetDistribution;
use super::{BsdfSample, BsdfT, LobeType};

const DIFFUSE_REFLECTION: LobeType = LobeType::from_bits_truncate(
    LobeType::DIFFUSE.bits() | LobeType::REFLECTION.bits(),
);
const GLOSSY_REFLECTION: LobeType = LobeType::from_bits_truncate(
    LobeType::GLOSSY.bits() | LobeType::REFLECTION.bits(),
);

fn pow5(x: Float) -> Float {
    (x * x) * (x * x) * x
}

/// Ashikhmin-Shirley coupled diffuse and glossy reflection.
/// The glossy lobe is picked with the Schlick reflectance toward wo.
#[derive(Clone, Debug)]
pub struct AshikhminShirley {
    diffuse: Color,
    specular: Color,
    distribution: MicrofacetDistribution,
}

impl AshikhminShirley {
    pub fn new(diffuse: Color, specular: Color, exponent: Float) -> Self {
        Self {
            diffuse,
            specular,
            distribution: MicrofacetDistribution::phong(exponent),
        }
    }

    fn specular_probability(&self, s: &BsdfSample) -> Option<Float> {
        let diffuse = s.requested.allows(DIFFUSE_REFLECTION);
        let glossy = s.requested.allows(GLOSSY_REFLECTION);
        match (diffuse, glossy) {
            (true, true) => {
                let fr = fresnel::schlick(util::abs_cos_t(s.wo), self.specular).average();
                Some(clamp(fr, 0.1, 0.9))
            }
            (false, true) => Some(1.0),
            (true, false) => Some(0.0),
            (false, false) => None,
        }
    }

    fn diffuse_term(&self, s: &BsdfSample) -> Color {
        let cos_i = util::abs_cos_t(s.wi);
        let cos_o = util::abs_cos_t(s.wo);
        let scale = 28.0 / (23.0 * consts::PI)
            * (1.0 - pow5(1.0 - 0.5 * cos_i))
            * (1.0 - pow5(1.0 - 0.5 * cos_o));
        self.diffuse * (Color::white() - self.specular) * scale
    }

    fn glossy_term(&self, s: &BsdfSample) -> Color {
        let wh = s.wo + s.wi;
        if wh.magnitude2() == 0.0 {
            return Color::black();
        }
        let wh = util::face_up(wh.normalize());
        let cos_i = util::abs_cos_t(s.wi);
        let cos_o = util::abs_cos_t(s.wo);
        let dot = s.wi.dot(wh).abs();
        let denom = 4.0 * dot * cos_i.max(cos_o);
        if denom == 0.0 {
            return Color::black();
        }
        fresnel::schlick(dot, self.specular) * (self.distribution.d(wh) / denom)
    }

    fn glossy_pdf(&self, s: &BsdfSample) -> Float {
        let wh = s.wo + s.wi;
        if wh.magnitude2() == 0.0 {
            return 0.0;
        }
        let wh = util::face_up(wh.normalize());
        let dot = s.wo.dot(wh).abs();
        if dot == 0.0 {
            return 0.0;
        }
        self.distribution.pdf(s.wo, wh) / (4.0 * dot)
    }
}

impl BsdfT for AshikhminShirley {
    fn lobe_type(&self) -> LobeType {
        DIFFUSE_REFLECTION | GLOSSY_REFLECTION
    }

    fn eval(&self, s: &BsdfSample) -> Color {
        if !util::same_hemisphere(s.wo, s.wi) {
            return Color::black();
        }
        let mut f = Color::black();
        if s.requested.allows(DIFFUSE_REFLECTION) {
            f += self.diffuse_term(s);
        }
        if s.requested.allows(GLOSSY_REFLECTION) {
            f += self.glossy_term(s);
        }
        f
    }

    fn pdf(&self, s: &BsdfSample) -> Float {
        if !util::same_hemisphere(s.wo, s.wi) {
            return 0.0;
        }
        let ps = match self.specular_probability(s) {
            Some(p) => p,
            None => return 0.0,
        };
        (1.0 - ps) * sample::cosine_hemisphere_pdf(s.wi.z) + ps * self.glossy_pdf(s)
    }

    fn sample(&self, uc: Float, u: Point2<Float>, s: &mut BsdfSample) -> Option<Color> {
        if s.wo.z == 0.0 {
            return None;
        }
        let ps = self.specular_probability(s)?;
        let (glossy, _) = util::choose(ps, uc);
        let wi = if glossy {
            let wh = self.distribution.sample_wm(s.wo, u);
            s.sampled = GLOSSY_REFLECTION;
            util::reflect(s.wo, wh)
        } else {
            let mut wi = sample::cosine_sample_hemisphere(u);
            if s.wo.z < 0.0 {
                wi.z = -wi.z;
            }
            s.sampled = DIFFUSE_REFLECTION;
            wi
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
