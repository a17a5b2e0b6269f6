use cgmath::Point2;

use crate::color::Color;
use crate::consts;
use crate::float::*;
use crate::sample;

use super::util;
use super::{BsdfSample, BsdfT, LobeType};

const DIFFUSE_REFLECTION: LobeType = LobeType::from_bits_truncate(
    LobeType::DIFFUSE.bits() | LobeType::REFLECTION.bits(),
);

/// Cosine sample the hemisphere of wo
fn sample_diffuse(u: Point2<Float>, sample: &mut BsdfSample) {
    let mut wi = sample::cosine_sample_hemisphere(u);
    if sample.wo.z < 0.0 {
        wi.z = -wi.z;
    }
    sample.wi = wi;
    sample.pdf = sample::cosine_hemisphere_pdf(wi.z);
    sample.sampled = DIFFUSE_REFLECTION;
    sample.eta = 1.0;
}

fn diffuse_pdf(sample: &BsdfSample) -> Float {
    if util::same_hemisphere(sample.wo, sample.wi) {
        sample::cosine_hemisphere_pdf(sample.wi.z)
    } else {
        0.0
    }
}

#[derive(Clone, Debug)]
pub struct Lambertian {
    albedo: Color,
}

impl Lambertian {
    pub fn new(albedo: Color) -> Self {
        Self { albedo }
    }
}

impl BsdfT for Lambertian {
    fn lobe_type(&self) -> LobeType {
        DIFFUSE_REFLECTION
    }

    fn eval(&self, sample: &BsdfSample) -> Color {
        if !sample.requested.allows(DIFFUSE_REFLECTION)
            || !util::same_hemisphere(sample.wo, sample.wi)
        {
            return Color::black();
        }
        self.albedo * consts::FRAC_1_PI
    }

    fn pdf(&self, sample: &BsdfSample) -> Float {
        if !sample.requested.allows(DIFFUSE_REFLECTION) {
            return 0.0;
        }
        diffuse_pdf(sample)
    }

    fn sample(&self, _uc: Float, u: Point2<Float>, sample: &mut BsdfSample) -> Option<Color> {
        if !sample.requested.allows(DIFFUSE_REFLECTION) || sample.wo.z == 0.0 {
            return None;
        }
        sample_diffuse(u, sample);
        if sample.pdf == 0.0 {
            return None;
        }
        // f * cos / pdf simplifies to the albedo
        Some(self.albedo)
    }
}

/// Rough diffuse reflection with the qualitative Oren-Nayar model
#[derive(Clone, Debug)]
pub struct OrenNayar {
    albedo: Color,
    a: Float,
    b: Float,
}

impl OrenNayar {
    pub fn new(albedo: Color, sigma: Float) -> Self {
        let sigma2 = sigma * sigma;
        let a = 1.0 - sigma2 / (2.0 * (sigma2 + 0.33));
        let b = 0.45 * sigma2 / (sigma2 + 0.09);
        Self { albedo, a, b }
    }

    fn f(&self, sample: &BsdfSample) -> Color {
        let (wo, wi) = (sample.wo, sample.wi);
        let sin_i = util::sin_t(wi);
        let sin_o = util::sin_t(wo);
        let mut max_cos = 0.0;
        if sin_i > 1e-4 && sin_o > 1e-4 {
            let d_cos = util::cos_phi(wi) * util::cos_phi(wo) + util::sin_phi(wi) * util::sin_phi(wo);
            max_cos = d_cos.max(0.0);
        }
        let (sin_alpha, tan_beta) = if util::abs_cos_t(wi) > util::abs_cos_t(wo) {
            (sin_o, sin_i / util::abs_cos_t(wi))
        } else {
            (sin_i, sin_o / util::abs_cos_t(wo))
        };
        self.albedo * consts::FRAC_1_PI * (self.a + self.b * max_cos * sin_alpha * tan_beta)
    }
}

impl BsdfT for OrenNayar {
    fn lobe_type(&self) -> LobeType {
        DIFFUSE_REFLECTION
    }

    fn eval(&self, sample: &BsdfSample) -> Color {
        if !sample.requested.allows(DIFFUSE_REFLECTION)
            || !util::same_hemisphere(sample.wo, sample.wi)
        {
            return Color::black();
        }
        self.f(sample)
    }

    fn pdf(&self, sample: &BsdfSample) -> Float {
        if !sample.requested.allows(DIFFUSE_REFLECTION) {
            return 0.0;
        }
        diffuse_pdf(sample)
    }

    fn sample(&self, _uc: Float, u: Point2<Float>, sample: &mut BsdfSample) -> Option<Color> {
        if !sample.requested.allows(DIFFUSE_REFLECTION) || sample.wo.z == 0.0 {
            return None;
        }
        sample_diffuse(u, sample);
        if sample.pdf == 0.0 {
            return None;
        }
        Some(self.f(sample) * sample.wi.z.abs() / sample.pdf)
    }
}
