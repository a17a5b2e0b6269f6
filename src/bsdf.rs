use std::ops::Deref;

use bitflags::bitflags;
use cgmath::{Point2, Vector3};

use crate::color::Color;
use crate::float::*;

mod ashikhmin_shirley;
mod fresnel;
mod lambertian;
mod layered;
mod microfacet;
mod phong;
mod specular;
mod util;

pub use self::ashikhmin_shirley::*;
pub use self::fresnel::Fresnel;
pub use self::lambertian::*;
pub use self::layered::*;
pub use self::microfacet::*;
pub use self::phong::*;
pub use self::specular::*;

bitflags! {
    /// Classification of scattering events and filter for lobe queries
    pub struct LobeType: u8 {
        const REFLECTION = 1;
        const TRANSMISSION = 1 << 1;
        const DIFFUSE = 1 << 2;
        const GLOSSY = 1 << 3;
        const SPECULAR = 1 << 4;
        const ALL = Self::REFLECTION.bits
            | Self::TRANSMISSION.bits
            | Self::DIFFUSE.bits
            | Self::GLOSSY.bits
            | Self::SPECULAR.bits;
    }
}

impl LobeType {
    /// Does the filter allow an event of the given type
    pub fn allows(self, event: LobeType) -> bool {
        self.contains(event)
    }

    /// Non-empty and delta-only
    pub fn is_specular_only(self) -> bool {
        self.contains(LobeType::SPECULAR)
            && !self.intersects(LobeType::DIFFUSE | LobeType::GLOSSY)
    }
}

/// Direction of the light flow along a path
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransportMode {
    /// Path traced from the camera, carries radiance
    Radiance,
    /// Path traced from a light, carries importance
    Importance,
}

/// Query record shared by eval, pdf and sample.
/// Both directions point away from the surface and are given in the
/// local shading frame where (0, 0, 1) is the shading normal.
#[derive(Clone, Copy, Debug)]
pub struct BsdfSample {
    /// Direction toward the previous path vertex
    pub wo: Vector3<Float>,
    /// Direction toward the next path vertex
    pub wi: Vector3<Float>,
    pub mode: TransportMode,
    /// Lobes allowed to respond
    pub requested: LobeType,
    /// Lobe that produced wi during sampling
    pub sampled: LobeType,
    /// Solid angle density of wi. Discrete probability for delta lobes.
    pub pdf: Float,
    /// Relative index of refraction over a refraction event, 1 otherwise
    pub eta: Float,
}

impl BsdfSample {
    pub fn new(wo: Vector3<Float>, mode: TransportMode) -> Self {
        Self {
            wo,
            wi: Vector3::new(0.0, 0.0, 1.0),
            mode,
            requested: LobeType::ALL,
            sampled: LobeType::empty(),
            pdf: 0.0,
            eta: 1.0,
        }
    }

    pub fn with_wi(wo: Vector3<Float>, wi: Vector3<Float>, mode: TransportMode) -> Self {
        Self {
            wi,
            ..Self::new(wo, mode)
        }
    }

    pub fn filtered(mut self, requested: LobeType) -> Self {
        self.requested = requested;
        self
    }

    /// Same query seen from the other end of the path segment
    pub fn swapped(&self) -> Self {
        Self {
            wo: self.wi,
            wi: self.wo,
            ..*self
        }
    }

    pub fn is_delta(&self) -> bool {
        self.sampled.is_specular_only()
    }
}

/// Trait for handling local light transport.
/// eval and pdf never respond for delta distributions, those are only sampled.
pub trait BsdfT {
    /// All lobe types this bsdf can produce
    fn lobe_type(&self) -> LobeType;

    /// Value of the scattering function for the wo, wi pair in sample
    fn eval(&self, sample: &BsdfSample) -> Color;

    /// Solid angle density of sampling sample.wi given sample.wo
    fn pdf(&self, sample: &BsdfSample) -> Float;

    /// Importance sample sample.wi. Fills wi, pdf, sampled and eta.
    /// Returns the throughput weight f * |cos| / pdf or None if the
    /// sample is degenerate or no allowed lobe responds.
    fn sample(&self, uc: Float, u: Point2<Float>, sample: &mut BsdfSample) -> Option<Color>;

    /// Is the distribution fully described by Dirac deltas
    fn is_delta(&self) -> bool {
        self.lobe_type().is_specular_only()
    }
}

#[derive(Clone, Debug)]
pub enum Bsdf {
    Lambertian(Lambertian),
    OrenNayar(OrenNayar),
    Phong(Phong),
    AshikhminShirley(AshikhminShirley),
    RoughConductor(RoughConductor),
    RoughDielectric(RoughDielectric),
    Mirror(Mirror),
    SmoothConductor(SmoothConductor),
    SmoothDielectric(SmoothDielectric),
    ThinDielectric(ThinDielectric),
    SmoothCoat(SmoothCoat),
    RoughCoat(RoughCoat),
}

impl Bsdf {
    pub fn lambertian(albedo: Color) -> Self {
        Bsdf::Lambertian(Lambertian::new(albedo))
    }

    /// sigma is the standard deviation of the facet angle in radians
    pub fn oren_nayar(albedo: Color, sigma: Float) -> Self {
        Bsdf::OrenNayar(OrenNayar::new(albedo, sigma))
    }

    pub fn phong(diffuse: Color, specular: Color, exponent: Float) -> Self {
        Bsdf::Phong(Phong::new(diffuse, specular, exponent))
    }

    pub fn ashikhmin_shirley(diffuse: Color, specular: Color, exponent: Float) -> Self {
        Bsdf::AshikhminShirley(AshikhminShirley::new(diffuse, specular, exponent))
    }

    pub fn rough_conductor(
        distribution: MicrofacetDistribution,
        eta: Color,
        k: Color,
    ) -> Self {
        Bsdf::RoughConductor(RoughConductor::new(
            distribution,
            Fresnel::Conductor { eta, k },
            Color::white(),
        ))
    }

    /// Glossy reflector with Schlick Fresnel from the normal incidence color.
    /// Shininess follows the Phong exponent convention.
    pub fn glossy(color: Color, shininess: Float) -> Self {
        Bsdf::RoughConductor(RoughConductor::new(
            MicrofacetDistribution::ggx_from_shininess(shininess),
            Fresnel::Schlick(color),
            Color::white(),
        ))
    }

    pub fn rough_dielectric(distribution: MicrofacetDistribution, eta: Float) -> Self {
        Bsdf::RoughDielectric(RoughDielectric::new(
            distribution,
            Color::white(),
            Color::white(),
            eta,
        ))
    }

    pub fn mirror(color: Color) -> Self {
        Bsdf::Mirror(Mirror::new(color))
    }

    pub fn smooth_conductor(eta: Color, k: Color) -> Self {
        Bsdf::SmoothConductor(SmoothConductor::new(eta, k))
    }

    pub fn smooth_dielectric(reflect: Color, transmit: Color, eta: Float) -> Self {
        Bsdf::SmoothDielectric(SmoothDielectric::new(reflect, transmit, eta))
    }

    pub fn thin_dielectric(eta: Float) -> Self {
        Bsdf::ThinDielectric(ThinDielectric::new(eta))
    }

    /// sigma_a is the absorption coefficient per unit thickness
    pub fn smooth_coat(eta: Float, thickness: Float, sigma_a: Color, substrate: Bsdf) -> Self {
        Bsdf::SmoothCoat(SmoothCoat::new(eta, thickness, sigma_a, substrate))
    }

    pub fn rough_coat(
        distribution: MicrofacetDistribution,
        eta: Float,
        thickness: Float,
        sigma_a: Color,
        substrate: Bsdf,
    ) -> Self {
        Bsdf::RoughCoat(RoughCoat::new(
            distribution,
            eta,
            thickness,
            sigma_a,
            substrate,
        ))
    }
}

impl Deref for Bsdf {
    type Target = dyn BsdfT + Send + Sync;

    fn deref(&self) -> &Self::Target {
        use self::Bsdf::*;
        match self {
            Lambertian(inner) => inner,
            OrenNayar(inner) => inner,
            Phong(inner) => inner,
            AshikhminShirley(inner) => inner,
            RoughConductor(inner) => inner,
            RoughDielectric(inner) => inner,
            Mirror(inner) => inner,
            SmoothConductor(inner) => inner,
            SmoothDielectric(inner) => inner,
            ThinDielectric(inner) => inner,
            SmoothCoat(inner) => inner,
            RoughCoat(inner) => inner,
        }
    }
}
