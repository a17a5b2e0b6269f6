use crate::color::Color;
use crate::float::*;

/// Fresnel reflectance models
#[derive(Clone, Copy, Debug)]
pub enum Fresnel {
    /// Dielectric interface with the relative index of refraction
    Dielectric(Float),
    /// Conductor with a per channel complex index of refraction
    Conductor { eta: Color, k: Color },
    /// Schlick approximation from the normal incidence reflectance
    Schlick(Color),
    /// Full reflection
    NoOp,
}

impl Fresnel {
    /// Reflectance for the cosine of the incident angle.
    /// Negative cosines are on the inner side of the interface.
    pub fn eval(&self, cos_i: Float) -> Color {
        match *self {
            Fresnel::Dielectric(eta) => Color::gray(dielectric(cos_i, eta)),
            Fresnel::Conductor { eta, k } => conductor(cos_i.abs(), eta, k),
            Fresnel::Schlick(r0) => schlick(cos_i.abs(), r0),
            Fresnel::NoOp => Color::white(),
        }
    }
}

/// Fresnel reflectance of an unpolarized wave on a dielectric interface.
/// Total internal reflection gives 1.
pub fn dielectric(cos_i: Float, eta: Float) -> Float {
    let mut cos_i = clamp(cos_i, -1.0, 1.0);
    let mut eta = eta;
    // Incident from the inside
    if cos_i < 0.0 {
        eta = 1.0 / eta;
        cos_i = -cos_i;
    }
    let sin2_i = 1.0 - cos_i * cos_i;
    let sin2_t = sin2_i / (eta * eta);
    if sin2_t >= 1.0 {
        return 1.0;
    }
    let cos_t = safe_sqrt(1.0 - sin2_t);
    let paral = (eta * cos_i - cos_t) / (eta * cos_i + cos_t);
    let perp = (cos_i - eta * cos_t) / (cos_i + eta * cos_t);
    (paral * paral + perp * perp) / 2.0
}

fn conductor_channel(cos_i: Float, eta: Float, k: Float) -> Float {
    let cos2 = cos_i * cos_i;
    let sin2 = 1.0 - cos2;
    let eta2 = eta * eta;
    let k2 = k * k;
    let t0 = eta2 - k2 - sin2;
    let a2_plus_b2 = safe_sqrt(t0 * t0 + 4.0 * eta2 * k2);
    let t1 = a2_plus_b2 + cos2;
    let a = safe_sqrt(0.5 * (a2_plus_b2 + t0));
    let t2 = 2.0 * cos_i * a;
    let rs = (t1 - t2) / (t1 + t2);
    let t3 = cos2 * a2_plus_b2 + sin2 * sin2;
    let t4 = t2 * sin2;
    let rp = rs * (t3 - t4) / (t3 + t4);
    0.5 * (rp + rs)
}

/// Fresnel reflectance of a conductor seen from a dielectric of index 1
pub fn conductor(cos_i: Float, eta: Color, k: Color) -> Color {
    let cos_i = clamp(cos_i, 0.0, 1.0);
    Color::new(
        conductor_channel(cos_i, eta.r(), k.r()),
        conductor_channel(cos_i, eta.g(), k.g()),
        conductor_channel(cos_i, eta.b(), k.b()),
    )
}

pub fn schlick(cos_i: Float, r0: Color) -> Color {
    let m = clamp(1.0 - cos_i, 0.0, 1.0);
    let m5 = (m * m) * (m * m) * m;
    r0 + m5 * (Color::white() - r0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn dielectric_normal_incidence() {
        // ((n - 1) / (n + 1))^2
        assert_relative_eq!(dielectric(1.0, 1.5), 0.04, epsilon = 1e-9);
        assert_relative_eq!(dielectric(-1.0, 1.5), 0.04, epsilon = 1e-9);
    }

    #[test]
    fn dielectric_total_internal_reflection() {
        assert_eq!(dielectric(-0.1, 1.5), 1.0);
    }

    #[test]
    fn conductor_grazing_reflects_everything() {
        let f = conductor(0.0, Color::gray(0.2), Color::gray(3.0));
        assert_relative_eq!(f.r(), 1.0, epsilon = 1e-6);
        let f = conductor(1.0, Color::gray(0.2), Color::gray(3.0));
        assert!(f.r() < 1.0 && f.r() > 0.8);
    }

    #[test]
    fn schlick_matches_endpoints() {
        let r0 = Color::gray(0.04);
        assert_relative_eq!(schlick(1.0, r0).r(), 0.04);
        assert_relative_eq!(schlick(0.0, r0).r(), 1.0);
    }
}
