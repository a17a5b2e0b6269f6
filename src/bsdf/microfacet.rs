use cgmath::prelude::*;
use cgmath::{Point2, Vector3};

use crate::color::Color;
use crate::consts;
use crate::float::*;

use super::fresnel::{self, Fresnel};
use super::util;
use super::{BsdfSample, BsdfT, LobeType, TransportMode};

/// Microfacet normal distributions
#[derive(Clone, Copy, Debug)]
pub enum MicrofacetDistribution {
    Beckmann { alpha: Float },
    /// Trowbridge-Reitz, sampled from the distribution of visible normals
    Ggx { alpha: Float },
    /// Normalized Blinn-Phong
    Phong { exponent: Float },
}

impl MicrofacetDistribution {
    pub fn beckmann(alpha: Float) -> Self {
        MicrofacetDistribution::Beckmann {
            alpha: alpha.max(1e-3),
        }
    }

    pub fn ggx(alpha: Float) -> Self {
        MicrofacetDistribution::Ggx {
            alpha: alpha.max(1e-3),
        }
    }

    pub fn phong(exponent: Float) -> Self {
        MicrofacetDistribution::Phong {
            exponent: exponent.max(0.0),
        }
    }

    pub fn ggx_from_shininess(shininess: Float) -> Self {
        // Shininess to alpha conversion from
        // http://graphicrants.blogspot.com/2013/08/specular-brdf-reference.html
        Self::ggx((2.0 / (shininess + 2.0)).sqrt())
    }

    /// Density of microfacet normals wm, projected onto the macro surface
    pub fn d(&self, wm: Vector3<Float>) -> Float {
        let cos2 = util::cos2_t(wm);
        if cos2 == 0.0 {
            return 0.0;
        }
        match *self {
            MicrofacetDistribution::Beckmann { alpha } => {
                let a2 = alpha * alpha;
                let tan2 = util::tan2_t(wm);
                (-tan2 / a2).exp() / (consts::PI * a2 * cos2 * cos2)
            }
            MicrofacetDistribution::Ggx { alpha } => {
                let a2 = alpha * alpha;
                let denom = consts::PI * sq(cos2 * (a2 - 1.0) + 1.0);
                a2 / denom
            }
            MicrofacetDistribution::Phong { exponent } => {
                if wm.z <= 0.0 {
                    return 0.0;
                }
                (exponent + 2.0) * consts::INV_2_PI * wm.z.powf(exponent)
            }
        }
    }

    /// Smith shadowing auxiliary function
    pub fn lambda(&self, w: Vector3<Float>) -> Float {
        let tan2 = util::tan2_t(w);
        if tan2.is_infinite() {
            return 0.0;
        }
        let beckmann = |alpha: Float| {
            let a = 1.0 / (alpha * tan2.sqrt());
            if a >= 1.6 {
                0.0
            } else {
                (1.0 - 1.259 * a + 0.396 * a * a) / (3.535 * a + 2.181 * a * a)
            }
        };
        match *self {
            MicrofacetDistribution::Beckmann { alpha } => beckmann(alpha),
            MicrofacetDistribution::Ggx { alpha } => {
                ((1.0 + alpha * alpha * tan2).sqrt() - 1.0) / 2.0
            }
            // Phong is shadowed like the Beckmann of matching width
            MicrofacetDistribution::Phong { exponent } => {
                beckmann((2.0 / (exponent + 2.0)).sqrt())
            }
        }
    }

    pub fn g1(&self, w: Vector3<Float>) -> Float {
        1.0 / (1.0 + self.lambda(w))
    }

    pub fn g(&self, wo: Vector3<Float>, wi: Vector3<Float>) -> Float {
        1.0 / (1.0 + self.lambda(wo) + self.lambda(wi))
    }

    /// Sample a microfacet normal in the upper hemisphere
    pub fn sample_wm(&self, wo: Vector3<Float>, u: Point2<Float>) -> Vector3<Float> {
        match *self {
            MicrofacetDistribution::Beckmann { alpha } => {
                let tan2 = -alpha * alpha * (1.0 - u.x).ln();
                let cos_t = 1.0 / (1.0 + tan2).sqrt();
                spherical_direction(cos_t, consts::TWO_PI * u.y)
            }
            MicrofacetDistribution::Ggx { alpha } => {
                let wo = if wo.z < 0.0 { -wo } else { wo };
                sample_ggx_visible(alpha, wo, u)
            }
            MicrofacetDistribution::Phong { exponent } => {
                let cos_t = u.x.powf(1.0 / (exponent + 2.0));
                spherical_direction(cos_t, consts::TWO_PI * u.y)
            }
        }
    }

    /// Density of sample_wm producing wm
    pub fn pdf(&self, wo: Vector3<Float>, wm: Vector3<Float>) -> Float {
        match *self {
            MicrofacetDistribution::Ggx { .. } => {
                let cos_o = util::abs_cos_t(wo);
                if cos_o == 0.0 {
                    return 0.0;
                }
                self.g1(wo) / cos_o * self.d(wm) * wo.dot(wm).abs()
            }
            _ => self.d(wm) * util::abs_cos_t(wm),
        }
    }
}

fn spherical_direction(cos_t: Float, phi: Float) -> Vector3<Float> {
    let sin_t = safe_sqrt(1.0 - cos_t * cos_t);
    Vector3::new(sin_t * phi.cos(), sin_t * phi.sin(), cos_t)
}

/// Heitz 2018, "Sampling the GGX Distribution of Visible Normals"
fn sample_ggx_visible(alpha: Float, wo: Vector3<Float>, u: Point2<Float>) -> Vector3<Float> {
    // Stretch to the hemisphere configuration
    let vh = Vector3::new(alpha * wo.x, alpha * wo.y, wo.z).normalize();
    let len2 = vh.x * vh.x + vh.y * vh.y;
    let t1 = if len2 > 0.0 {
        Vector3::new(-vh.y, vh.x, 0.0) / len2.sqrt()
    } else {
        Vector3::unit_x()
    };
    let t2 = vh.cross(t1);
    let r = u.x.sqrt();
    let phi = consts::TWO_PI * u.y;
    let p1 = r * phi.cos();
    let s = 0.5 * (1.0 + vh.z);
    let p2 = (1.0 - s) * safe_sqrt(1.0 - p1 * p1) + s * r * phi.sin();
    let nh = p1 * t1 + p2 * t2 + safe_sqrt(1.0 - p1 * p1 - p2 * p2) * vh;
    Vector3::new(alpha * nh.x, alpha * nh.y, nh.z.max(1e-6)).normalize()
}

const GLOSSY_REFLECTION: LobeType = LobeType::from_bits_truncate(
    LobeType::GLOSSY.bits() | LobeType::REFLECTION.bits(),
);
const GLOSSY_TRANSMISSION: LobeType = LobeType::from_bits_truncate(
    LobeType::GLOSSY.bits() | LobeType::TRANSMISSION.bits(),
);

/// Half vector of a reflection pair, in the upper hemisphere
fn reflection_half(wo: Vector3<Float>, wi: Vector3<Float>) -> Option<Vector3<Float>> {
    let wm = wo + wi;
    if wm.magnitude2() == 0.0 {
        return None;
    }
    Some(util::face_up(wm.normalize()))
}

/// Glossy reflection from a rough metal or any Fresnel reflector
#[derive(Clone, Debug)]
pub struct RoughConductor {
    distribution: MicrofacetDistribution,
    fresnel: Fresnel,
    tint: Color,
}

impl RoughConductor {
    pub fn new(distribution: MicrofacetDistribution, fresnel: Fresnel, tint: Color) -> Self {
        Self {
            distribution,
            fresnel,
            tint,
        }
    }

    fn f(&self, wo: Vector3<Float>, wi: Vector3<Float>, wm: Vector3<Float>) -> Color {
        let cos_o = util::abs_cos_t(wo);
        let cos_i = util::abs_cos_t(wi);
        if cos_o == 0.0 || cos_i == 0.0 {
            return Color::black();
        }
        let d = self.distribution.d(wm);
        let g = self.distribution.g(wo, wi);
        let f = self.fresnel.eval(wo.dot(wm).abs());
        self.tint * f * (d * g / (4.0 * cos_o * cos_i))
    }

    fn pdf_wi(&self, wo: Vector3<Float>, wm: Vector3<Float>) -> Float {
        let dot = wo.dot(wm).abs();
        if dot == 0.0 {
            return 0.0;
        }
        self.distribution.pdf(wo, wm) / (4.0 * dot)
    }
}

impl BsdfT for RoughConductor {
    fn lobe_type(&self) -> LobeType {
        GLOSSY_REFLECTION
    }

    fn eval(&self, sample: &BsdfSample) -> Color {
        if !sample.requested.allows(GLOSSY_REFLECTION)
            || !util::same_hemisphere(sample.wo, sample.wi)
        {
            return Color::black();
        }
        match reflection_half(sample.wo, sample.wi) {
            Some(wm) => self.f(sample.wo, sample.wi, wm),
            None => Color::black(),
        }
    }

    fn pdf(&self, sample: &BsdfSample) -> Float {
        if !sample.requested.allows(GLOSSY_REFLECTION)
            || !util::same_hemisphere(sample.wo, sample.wi)
        {
            return 0.0;
        }
        match reflection_half(sample.wo, sample.wi) {
            Some(wm) => self.pdf_wi(sample.wo, wm),
            None => 0.0,
        }
    }

    fn sample(&self, _uc: Float, u: Point2<Float>, sample: &mut BsdfSample) -> Option<Color> {
        if !sample.requested.allows(GLOSSY_REFLECTION) || sample.wo.z == 0.0 {
            return None;
        }
        let wo = sample.wo;
        let wm = self.distribution.sample_wm(wo, u);
        let wi = util::reflect(wo, wm);
        if !util::same_hemisphere(wo, wi) {
            return None;
        }
        let pdf = self.pdf_wi(wo, wm);
        if pdf == 0.0 {
            return None;
        }
        sample.wi = wi;
        sample.pdf = pdf;
        sample.sampled = GLOSSY_REFLECTION;
        sample.eta = 1.0;
        Some(self.f(wo, wi, wm) * util::abs_cos_t(wi) / pdf)
    }
}

/// Glossy reflection and refraction through a rough dielectric interface
#[derive(Clone, Debug)]
pub struct RoughDielectric {
    distribution: MicrofacetDistribution,
    reflect: Color,
    transmit: Color,
    eta: Float,
}

/// Geometry of a wo, wi pair over a rough dielectric interface
struct Configuration {
    wm: Vector3<Float>,
    reflect: bool,
    etap: Float,
}

impl RoughDielectric {
    pub fn new(
        distribution: MicrofacetDistribution,
        reflect: Color,
        transmit: Color,
        eta: Float,
    ) -> Self {
        Self {
            distribution,
            reflect,
            transmit,
            eta,
        }
    }

    fn configuration(&self, wo: Vector3<Float>, wi: Vector3<Float>) -> Option<Configuration> {
        let cos_o = util::cos_t(wo);
        let cos_i = util::cos_t(wi);
        if cos_o == 0.0 || cos_i == 0.0 {
            return None;
        }
        let reflect = cos_o * cos_i > 0.0;
        let etap = if reflect {
            1.0
        } else if cos_o > 0.0 {
            self.eta
        } else {
            1.0 / self.eta
        };
        let wm = wi * etap + wo;
        if wm.magnitude2() == 0.0 {
            return None;
        }
        let wm = util::face_up(wm.normalize());
        // Discard back facing microfacets
        if wm.dot(wi) * cos_i < 0.0 || wm.dot(wo) * cos_o < 0.0 {
            return None;
        }
        Some(Configuration { wm, reflect, etap })
    }

    /// Probabilities of choosing reflection and transmission
    fn lobe_probabilities(&self, requested: LobeType, fr: Float) -> Option<(Float, Float)> {
        let pr = if requested.allows(GLOSSY_REFLECTION) {
            fr
        } else {
            0.0
        };
        let pt = if requested.allows(GLOSSY_TRANSMISSION) {
            1.0 - fr
        } else {
            0.0
        };
        if pr + pt == 0.0 {
            None
        } else {
            Some((pr, pt))
        }
    }

    fn f(&self, sample: &BsdfSample, conf: &Configuration) -> Color {
        let (wo, wi, wm) = (sample.wo, sample.wi, conf.wm);
        let fr = fresnel::dielectric(wo.dot(wm), self.eta);
        let d = self.distribution.d(wm);
        let g = self.distribution.g(wo, wi);
        let cos_o = util::cos_t(wo);
        let cos_i = util::cos_t(wi);
        if conf.reflect {
            self.reflect * (d * g * fr / (4.0 * cos_i * cos_o).abs())
        } else {
            let denom = sq(wi.dot(wm) + wo.dot(wm) / conf.etap) * cos_i * cos_o;
            let mut ft = d * g * (1.0 - fr) * (wi.dot(wm) * wo.dot(wm) / denom).abs();
            if sample.mode == TransportMode::Radiance {
                ft /= sq(conf.etap);
            }
            self.transmit * ft
        }
    }

    fn pdf_conf(&self, sample: &BsdfSample, conf: &Configuration) -> Float {
        let (wo, wi, wm) = (sample.wo, sample.wi, conf.wm);
        let fr = fresnel::dielectric(wo.dot(wm), self.eta);
        let (pr, pt) = match self.lobe_probabilities(sample.requested, fr) {
            Some(p) => p,
            None => return 0.0,
        };
        let pdf_wm = self.distribution.pdf(wo, wm);
        if conf.reflect {
            pdf_wm / (4.0 * wo.dot(wm).abs()) * pr / (pr + pt)
        } else {
            let denom = sq(wi.dot(wm) + wo.dot(wm) / conf.etap);
            let dwm_dwi = wi.dot(wm).abs() / denom;
            pdf_wm * dwm_dwi * pt / (pr + pt)
        }
    }

    fn allows(&self, requested: LobeType, reflect: bool) -> bool {
        if reflect {
            requested.allows(GLOSSY_REFLECTION)
        } else {
            requested.allows(GLOSSY_TRANSMISSION)
        }
    }
}

impl BsdfT for RoughDielectric {
    fn lobe_type(&self) -> LobeType {
        GLOSSY_REFLECTION | GLOSSY_TRANSMISSION
    }

    fn eval(&self, sample: &BsdfSample) -> Color {
        match self.configuration(sample.wo, sample.wi) {
            Some(conf) if self.allows(sample.requested, conf.reflect) => self.f(sample, &conf),
            _ => Color::black(),
        }
    }

    fn pdf(&self, sample: &BsdfSample) -> Float {
        match self.configuration(sample.wo, sample.wi) {
            Some(conf) if self.allows(sample.requested, conf.reflect) => {
                self.pdf_conf(sample, &conf)
            }
            _ => 0.0,
        }
    }

    fn sample(&self, uc: Float, u: Point2<Float>, sample: &mut BsdfSample) -> Option<Color> {
        let wo = sample.wo;
        if wo.z == 0.0 {
            return None;
        }
        let wm = self.distribution.sample_wm(wo, u);
        let fr = fresnel::dielectric(wo.dot(wm), self.eta);
        let (pr, pt) = self.lobe_probabilities(sample.requested, fr)?;
        let (wi, reflect, etap) = if uc < pr / (pr + pt) {
            let wi = util::reflect(wo, wm);
            if !util::same_hemisphere(wo, wi) {
                return None;
            }
            (wi, true, 1.0)
        } else {
            let (wi, etap) = util::refract(wo, wm, self.eta)?;
            if util::same_hemisphere(wo, wi) || wi.z == 0.0 {
                return None;
            }
            (wi, false, etap)
        };
        sample.wi = wi;
        let conf = Configuration { wm, reflect, etap };
        let pdf = self.pdf_conf(sample, &conf);
        if pdf == 0.0 {
            return None;
        }
        sample.pdf = pdf;
        sample.eta = etap;
        sample.sampled = if reflect {
            GLOSSY_REFLECTION
        } else {
            GLOSSY_TRANSMISSION
        };
        Some(self.f(sample, &conf) * util::abs_cos_t(wi) / pdf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::{Rng, SeedableRng};
    use rand_xoshiro::Xoshiro256Plus;

    fn integrate_projected(dist: MicrofacetDistribution) -> Float {
        // The projected area of the microsurface equals the macro surface
        let mut rng = Xoshiro256Plus::seed_from_u64(7);
        let n = 200_000usize;
        let mut sum = 0.0;
        for _ in 0..n {
            let u = Point2::new(rng.gen::<Float>(), rng.gen::<Float>());
            let wm = crate::sample::uniform_sample_hemisphere(u);
            sum += dist.d(wm) * wm.z / crate::sample::uniform_hemisphere_pdf();
        }
        sum / n.to_float()
    }

    #[test]
    fn distributions_are_normalized() {
        for dist in &[
            MicrofacetDistribution::beckmann(0.5),
            MicrofacetDistribution::ggx(0.5),
            MicrofacetDistribution::phong(10.0),
        ] {
            let integral = integrate_projected(*dist);
            assert!((integral - 1.0).abs() < 0.02, "{:?}: {}", dist, integral);
        }
    }

    #[test]
    fn visible_normals_face_wo() {
        let dist = MicrofacetDistribution::ggx(0.6);
        let mut rng = Xoshiro256Plus::seed_from_u64(3);
        let wo = Vector3::new(0.8, 0.0, 0.6);
        for _ in 0..1000 {
            let u = Point2::new(rng.gen::<Float>(), rng.gen::<Float>());
            let wm = dist.sample_wm(wo, u);
            assert!(wm.z > 0.0);
            assert!(wm.dot(wo) >= -1e-6);
            assert_relative_eq!(wm.magnitude(), 1.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn rough_dielectric_is_reciprocal_in_reflection() {
        let bsdf = RoughDielectric::new(
            MicrofacetDistribution::beckmann(0.3),
            Color::white(),
            Color::white(),
            1.5,
        );
        let wo = Vector3::new(0.3, 0.1, 0.9).normalize();
        let wi = Vector3::new(-0.4, 0.2, 0.8).normalize();
        let s = BsdfSample::with_wi(wo, wi, TransportMode::Radiance);
        let a = bsdf.eval(&s);
        let b = bsdf.eval(&s.swapped());
        assert_relative_eq!(a.r(), b.r(), max_relative = 1e-9);
    }
}
