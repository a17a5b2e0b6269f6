use cgmath::prelude::*;
use cgmath::{Matrix3, Vector3};

use crate::float::*;

/// Compute an orthonormal coordinate frame where n defines is the z-axis
pub fn local_to_world(n: Vector3<Float>) -> Matrix3<Float> {
    let nx = if n.x.abs() > n.y.abs() {
        Vector3::new(n.z, 0.0, -n.x).normalize()
    } else {
        Vector3::new(0.0, -n.z, n.y).normalize()
    };
    let ny = n.cross(nx).normalize();
    Matrix3::from_cols(nx, ny, n)
}

/// Flip v to the hemisphere of reference
pub fn face_forward(v: Vector3<Float>, reference: Vector3<Float>) -> Vector3<Float> {
    if v.dot(reference) < 0.0 {
        -v
    } else {
        v
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn frame_is_orthonormal() {
        let n = Vector3::new(0.3, -0.5, 0.8).normalize();
        let m = local_to_world(n);
        assert_relative_eq!(m.x.dot(m.y), 0.0, epsilon = 1e-9);
        assert_relative_eq!(m.x.dot(n), 0.0, epsilon = 1e-9);
        assert_relative_eq!(m.y.magnitude(), 1.0, epsilon = 1e-9);
        let local = m.transpose() * n;
        assert_relative_eq!(local.z, 1.0, epsilon = 1e-9);
    }
}
