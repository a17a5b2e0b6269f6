//! Warping functions from uniform variates to the distributions used by
//! the integrators. All functions consume explicit random numbers so
//! that the caller decides where the randomness comes from.

use cgmath::{Point2, Point3, Vector3};

use crate::consts;
use crate::float::*;

/// Map [0,1)^2 to the unit disk while preserving relative areas
pub fn concentric_sample_disk(u: Point2<Float>) -> Point2<Float> {
    let ox = 2.0 * u.x - 1.0;
    let oy = 2.0 * u.y - 1.0;
    if ox == 0.0 && oy == 0.0 {
        return Point2::new(0.0, 0.0);
    }
    let (r, theta) = if ox.abs() > oy.abs() {
        (ox, 0.25 * consts::PI * (oy / ox))
    } else {
        (oy, 0.5 * consts::PI - 0.25 * consts::PI * (ox / oy))
    };
    Point2::new(r * theta.cos(), r * theta.sin())
}

/// Cosine sample the (0, 0, 1) hemisphere
pub fn cosine_sample_hemisphere(u: Point2<Float>) -> Vector3<Float> {
    let d = concentric_sample_disk(u);
    let z = safe_sqrt(1.0 - d.x * d.x - d.y * d.y);
    Vector3::new(d.x, d.y, z)
}

pub fn cosine_hemisphere_pdf(cos_t: Float) -> Float {
    cos_t.abs() * consts::FRAC_1_PI
}

pub fn uniform_sample_hemisphere(u: Point2<Float>) -> Vector3<Float> {
    let z = u.x;
    let r = safe_sqrt(1.0 - z * z);
    let phi = consts::TWO_PI * u.y;
    Vector3::new(r * phi.cos(), r * phi.sin(), z)
}

pub fn uniform_hemisphere_pdf() -> Float {
    consts::INV_2_PI
}

pub fn uniform_sample_sphere(u: Point2<Float>) -> Vector3<Float> {
    let z = 1.0 - 2.0 * u.x;
    let r = safe_sqrt(1.0 - z * z);
    let phi = consts::TWO_PI * u.y;
    Vector3::new(r * phi.cos(), r * phi.sin(), z)
}

pub fn uniform_sphere_pdf() -> Float {
    consts::INV_4_PI
}

/// Uniformly sample a direction inside a cone around +z
pub fn uniform_sample_cone(u: Point2<Float>, cos_max: Float) -> Vector3<Float> {
    let cos_t = (1.0 - u.x) + u.x * cos_max;
    let sin_t = safe_sqrt(1.0 - cos_t * cos_t);
    let phi = consts::TWO_PI * u.y;
    Vector3::new(sin_t * phi.cos(), sin_t * phi.sin(), cos_t)
}

pub fn uniform_cone_pdf(cos_max: Float) -> Float {
    1.0 / (consts::TWO_PI * (1.0 - cos_max))
}

/// Barycentric coordinates distributed uniformly over a triangle
pub fn uniform_sample_triangle(u: Point2<Float>) -> (Float, Float) {
    let su = u.x.sqrt();
    (1.0 - su, u.y * su)
}

/// Point uniformly distributed over the triangle (p0, p1, p2)
pub fn triangle_point(
    u: Point2<Float>,
    p0: Point3<Float>,
    p1: Point3<Float>,
    p2: Point3<Float>,
) -> Point3<Float> {
    let (b0, b1) = uniform_sample_triangle(u);
    p0 + b1 * (p1 - p0) + (1.0 - b0 - b1) * (p2 - p0)
}

/// n stratified and jittered samples in [0, 1)
pub fn stratified_1d(n: usize, jitter: &mut dyn FnMut() -> Float) -> Vec<Float> {
    let inv_n = 1.0 / n.to_float();
    (0..n)
        .map(|i| ((i.to_float() + jitter()) * inv_n).min(ONE_MINUS_EPSILON))
        .collect()
}

/// nx * ny jittered samples in [0, 1)^2, row-major
pub fn jittered_2d(nx: usize, ny: usize, jitter: &mut dyn FnMut() -> Float) -> Vec<Point2<Float>> {
    let dx = 1.0 / nx.to_float();
    let dy = 1.0 / ny.to_float();
    let mut samples = Vec::with_capacity(nx * ny);
    for y in 0..ny {
        for x in 0..nx {
            let sx = ((x.to_float() + jitter()) * dx).min(ONE_MINUS_EPSILON);
            let sy = ((y.to_float() + jitter()) * dy).min(ONE_MINUS_EPSILON);
            samples.push(Point2::new(sx, sy));
        }
    }
    samples
}

/// The largest float below one
#[cfg(not(feature = "single_precision"))]
pub const ONE_MINUS_EPSILON: Float = 1.0 - std::f64::EPSILON / 2.0;
#[cfg(feature = "single_precision")]
pub const ONE_MINUS_EPSILON: Float = 1.0 - std::f32::EPSILON / 2.0;

/// Convert a solid angle pdf to an area pdf
pub fn to_area_pdf(pdf_sa: Float, dist2: Float, cos_t: Float) -> Float {
    pdf_sa * cos_t.abs() / dist2
}

/// Convert an area pdf to a solid angle pdf
pub fn to_solid_angle_pdf(pdf_a: Float, dist2: Float, cos_t: Float) -> Float {
    let cos_t = cos_t.abs();
    if cos_t == 0.0 {
        return 0.0;
    }
    pdf_a * dist2 / cos_t
}

pub fn balance_heuristic(nf: usize, f_pdf: Float, ng: usize, g_pdf: Float) -> Float {
    let f = nf.to_float() * f_pdf;
    let g = ng.to_float() * g_pdf;
    if f + g == 0.0 {
        return 0.0;
    }
    f / (f + g)
}

pub fn power_heuristic(nf: usize, f_pdf: Float, ng: usize, g_pdf: Float) -> Float {
    let f = nf.to_float() * f_pdf;
    let g = ng.to_float() * g_pdf;
    if f.is_infinite() {
        return 1.0;
    }
    let denom = f * f + g * g;
    if denom == 0.0 {
        return 0.0;
    }
    f * f / denom
}

/// Piecewise-constant distribution over a discrete set of weights
#[derive(Clone, Debug)]
pub struct Distribution1D {
    func: Vec<Float>,
    cdf: Vec<Float>,
    func_int: Float,
}

impl Distribution1D {
    pub fn new(weights: &[Float]) -> Self {
        let n = weights.len();
        let func: Vec<Float> = weights.iter().map(|w| w.max(0.0)).collect();
        let mut cdf = Vec::with_capacity(n + 1);
        cdf.push(0.0);
        for i in 0..n {
            let prev = cdf[i];
            cdf.push(prev + func[i] / n.to_float());
        }
        let func_int = cdf[n];
        if func_int == 0.0 {
            // Fall back to uniform selection
            for (i, c) in cdf.iter_mut().enumerate().skip(1) {
                *c = i.to_float() / n.to_float();
            }
        } else {
            for c in cdf.iter_mut().skip(1) {
                *c /= func_int;
            }
        }
        Self {
            func,
            cdf,
            func_int,
        }
    }

    pub fn count(&self) -> usize {
        self.func.len()
    }

    pub fn is_empty(&self) -> bool {
        self.func.is_empty()
    }

    /// Integral of the unnormalized weights over [0, 1]
    pub fn integral(&self) -> Float {
        self.func_int
    }

    /// Sample an index. Returns the index, its probability
    /// and u remapped to [0, 1) within the selected bucket.
    pub fn sample_discrete(&self, u: Float) -> Option<(usize, Float, Float)> {
        if self.func.is_empty() {
            return None;
        }
        // Last cdf entry not above u
        let mut lo = 0;
        let mut hi = self.cdf.len() - 1;
        while lo + 1 < hi {
            let mid = (lo + hi) / 2;
            if self.cdf[mid] <= u {
                lo = mid;
            } else {
                hi = mid;
            }
        }
        let i = lo.min(self.func.len() - 1);
        let width = self.cdf[i + 1] - self.cdf[i];
        let remapped = if width > 0.0 {
            ((u - self.cdf[i]) / width).min(ONE_MINUS_EPSILON)
        } else {
            0.0
        };
        Some((i, self.pmf(i), remapped))
    }

    pub fn pmf(&self, i: usize) -> Float {
        if i >= self.func.len() {
            return 0.0;
        }
        self.cdf[i + 1] - self.cdf[i]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use cgmath::prelude::*;

    #[test]
    fn disk_samples_stay_inside() {
        for i in 0..32u32 {
            for j in 0..32u32 {
                let u = Point2::new(i.to_float() / 32.0, j.to_float() / 32.0);
                let d = concentric_sample_disk(u);
                assert!(d.x * d.x + d.y * d.y <= 1.0 + 1e-6);
            }
        }
    }

    #[test]
    fn cosine_hemisphere_is_normalized() {
        let w = cosine_sample_hemisphere(Point2::new(0.3, 0.8));
        assert_relative_eq!(w.magnitude(), 1.0, epsilon = 1e-6);
        assert!(w.z >= 0.0);
    }

    #[test]
    fn cone_sample_within_angle() {
        let cos_max = 0.9;
        let w = uniform_sample_cone(Point2::new(0.99, 0.1), cos_max);
        assert!(w.z >= cos_max - 1e-6);
    }

    #[test]
    fn area_pdf_round_trip() {
        let pdf = 0.37;
        let dist2 = 4.2;
        let cos = -0.6;
        let area = to_area_pdf(pdf, dist2, cos);
        assert_relative_eq!(to_solid_angle_pdf(area, dist2, cos), pdf, epsilon = 1e-9);
    }

    #[test]
    fn power_heuristic_weights_sum_to_one() {
        let a = power_heuristic(1, 0.3, 1, 1.7);
        let b = power_heuristic(1, 1.7, 1, 0.3);
        assert_relative_eq!(a + b, 1.0, epsilon = 1e-9);
        assert_eq!(power_heuristic(1, 0.0, 1, 0.0), 0.0);
    }

    #[test]
    fn distribution_follows_weights() {
        let dist = Distribution1D::new(&[1.0, 3.0, 0.0, 4.0]);
        assert_relative_eq!(dist.pmf(0), 0.125, epsilon = 1e-9);
        assert_relative_eq!(dist.pmf(1), 0.375, epsilon = 1e-9);
        assert_eq!(dist.pmf(2), 0.0);
        assert_relative_eq!(dist.pmf(3), 0.5, epsilon = 1e-9);
        let (i, pmf, rem) = dist.sample_discrete(0.3).unwrap();
        assert_eq!(i, 1);
        assert_relative_eq!(pmf, 0.375, epsilon = 1e-9);
        assert_relative_eq!(rem, (0.3 - 0.125) / 0.375, epsilon = 1e-9);
        let (i, _, _) = dist.sample_discrete(0.6).unwrap();
        assert_eq!(i, 3);
    }

    #[test]
    fn zero_weights_fall_back_to_uniform() {
        let dist = Distribution1D::new(&[0.0, 0.0]);
        assert_relative_eq!(dist.pmf(0), 0.5, epsilon = 1e-9);
        assert!(Distribution1D::new(&[]).sample_discrete(0.5).is_none());
    }

    #[test]
    fn stratified_samples_cover_strata() {
        let mut j = || 0.5;
        let s = stratified_1d(4, &mut j);
        assert_eq!(s, vec![0.125, 0.375, 0.625, 0.875]);
        let s2 = jittered_2d(2, 2, &mut j);
        assert_eq!(s2[1], Point2::new(0.75, 0.25));
    }
}
