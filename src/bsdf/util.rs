#![allow(dead_code)]

use cgmath::prelude::*;
use cgmath::Vector3;

use crate::float::*;

// Trigonometric functions for vectors in shading coordinates

pub fn cos_t(vec: Vector3<Float>) -> Float {
    vec.z
}

pub fn abs_cos_t(vec: Vector3<Float>) -> Float {
    vec.z.abs()
}

pub fn cos2_t(vec: Vector3<Float>) -> Float {
    vec.z * vec.z
}

pub fn sin2_t(vec: Vector3<Float>) -> Float {
    (1.0 - cos2_t(vec)).max(0.0)
}

pub fn sin_t(vec: Vector3<Float>) -> Float {
    sin2_t(vec).sqrt()
}

pub fn tan2_t(vec: Vector3<Float>) -> Float {
    sin2_t(vec) / cos2_t(vec)
}

pub fn cos_phi(vec: Vector3<Float>) -> Float {
    let sin_t = sin_t(vec);
    if sin_t == 0.0 {
        1.0
    } else {
        clamp(vec.x / sin_t, -1.0, 1.0)
    }
}

pub fn sin_phi(vec: Vector3<Float>) -> Float {
    let sin_t = sin_t(vec);
    if sin_t == 0.0 {
        0.0
    } else {
        clamp(vec.y / sin_t, -1.0, 1.0)
    }
}

pub fn same_hemisphere(w1: Vector3<Float>, w2: Vector3<Float>) -> bool {
    w1.z * w2.z > 0.0
}

/// Flip w to the upper hemisphere
pub fn face_up(w: Vector3<Float>) -> Vector3<Float> {
    if w.z < 0.0 {
        -w
    } else {
        w
    }
}

/// Mirror w about the normal
pub fn reflect(w: Vector3<Float>, n: Vector3<Float>) -> Vector3<Float> {
    -w + 2.0 * w.dot(n) * n
}

/// Refract w through the interface with normal n, where eta is the
/// relative index on the side n points away from.
/// Returns the transmitted direction and the relative index that applied,
/// or None on total internal reflection.
pub fn refract(
    w: Vector3<Float>,
    mut n: Vector3<Float>,
    mut eta: Float,
) -> Option<(Vector3<Float>, Float)> {
    let mut cos_i = n.dot(w);
    // Flip the interface to the side of w
    if cos_i < 0.0 {
        eta = 1.0 / eta;
        cos_i = -cos_i;
        n = -n;
    }
    let sin2_i = (1.0 - cos_i * cos_i).max(0.0);
    let sin2_t = sin2_i / (eta * eta);
    if sin2_t >= 1.0 {
        return None;
    }
    let cos_t = safe_sqrt(1.0 - sin2_t);
    let wt = -w / eta + (cos_i / eta - cos_t) * n;
    Some((wt, eta))
}

/// Pick the first of two lobes with probability p by rescaling u.
/// Returns the choice and u remapped to [0, 1).
pub fn choose(p: Float, u: Float) -> (bool, Float) {
    if u < p {
        (true, (u / p).min(crate::sample::ONE_MINUS_EPSILON))
    } else {
        (false, ((u - p) / (1.0 - p)).min(crate::sample::ONE_MINUS_EPSILON))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn refraction_obeys_snell() {
        let w = Vector3::new(0.6, 0.0, 0.8);
        let (wt, eta) = refract(w, Vector3::unit_z(), 1.5).unwrap();
        assert_relative_eq!(eta, 1.5);
        assert_relative_eq!(wt.magnitude(), 1.0, epsilon = 1e-9);
        assert!(wt.z < 0.0);
        // sin_t * eta == sin_i
        assert_relative_eq!(sin_t(wt) * 1.5, 0.6, epsilon = 1e-9);
    }

    #[test]
    fn total_internal_reflection_is_none() {
        let w = Vector3::new(0.9, 0.0, -(1.0 - 0.81 as Float).sqrt());
        assert!(refract(w, Vector3::unit_z(), 1.5).is_none());
    }

    #[test]
    fn choice_rescales_variate() {
        assert_eq!(choose(0.25, 0.125), (true, 0.5));
        let (first, u) = choose(0.25, 0.625);
        assert!(!first);
        assert_relative_eq!(u, 0.5);
    }
}
