use cgmath::prelude::*;
use cgmath::{Point2, Point3, Vector3};

use crate::color::Color;
use crate::consts;
use crate::float::*;
use crate::sample;
use crate::shape::Shape;
use crate::util;

/// Light sampled toward a receiving point
#[derive(Clone, Copy, Debug)]
pub struct LightSample {
    /// Point on the light
    pub p: Point3<Float>,
    /// Light normal at p
    pub n: Vector3<Float>,
    /// Unit direction from the receiver to p
    pub wi: Vector3<Float>,
    pub dist: Float,
    /// Solid angle density at the receiver. 1 for delta lights.
    pub pdf: Float,
    /// Radiance arriving at the receiver along -wi
    pub li: Color,
}

pub trait Light: Send + Sync {
    /// Is the light a Dirac delta in position
    fn is_delta(&self) -> bool;

    /// Does the light have a surface that can be hit by rays
    fn is_on_surface(&self) -> bool {
        !self.is_delta()
    }

    /// Total emitted power
    fn power(&self) -> Color;

    /// Radiance (intensity for point lights) leaving a point with
    /// normal n toward dir
    fn emission(&self, n: Vector3<Float>, dir: Vector3<Float>) -> Color;

    fn sample_direct(&self, u: Point2<Float>, p_ref: Point3<Float>) -> Option<LightSample>;

    /// Solid angle density of sample_direct picking p with normal n
    fn pdf_direct(&self, p_ref: Point3<Float>, p: Point3<Float>, n: Vector3<Float>) -> Float;

    /// Sample an emission point. Returns position, normal and area density.
    fn sample_position(&self, u: Point2<Float>) -> (Point3<Float>, Vector3<Float>, Float);

    fn pdf_position(&self) -> Float;

    /// Sample an emission direction from a point with normal n.
    /// Returns the direction and its solid angle density.
    fn sample_emit_direction(
        &self,
        u: Point2<Float>,
        n: Vector3<Float>,
    ) -> Option<(Vector3<Float>, Float)>;

    fn pdf_emit_direction(&self, n: Vector3<Float>, dir: Vector3<Float>) -> Float;
}

/// One-sided diffuse emitter covering a shape
#[derive(Clone, Debug)]
pub struct AreaLight {
    shape: Shape,
    le: Color,
}

impl AreaLight {
    pub fn new(shape: Shape, le: Color) -> Self {
        Self { shape, le }
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }
}

impl Light for AreaLight {
    fn is_delta(&self) -> bool {
        false
    }

    fn power(&self) -> Color {
        consts::PI * self.le * self.shape.area()
    }

    fn emission(&self, n: Vector3<Float>, dir: Vector3<Float>) -> Color {
        if n.dot(dir) > 0.0 {
            self.le
        } else {
            Color::black()
        }
    }

    fn sample_direct(&self, u: Point2<Float>, p_ref: Point3<Float>) -> Option<LightSample> {
        let s = self.shape.sample_direct(u, p_ref)?;
        let d = s.p - p_ref;
        let dist = d.magnitude();
        if dist == 0.0 {
            return None;
        }
        let wi = d / dist;
        Some(LightSample {
            p: s.p,
            n: s.n,
            wi,
            dist,
            pdf: s.pdf,
            li: self.emission(s.n, -wi),
        })
    }

    fn pdf_direct(&self, p_ref: Point3<Float>, p: Point3<Float>, n: Vector3<Float>) -> Float {
        self.shape.pdf_direct(p_ref, p, n)
    }

    fn sample_position(&self, u: Point2<Float>) -> (Point3<Float>, Vector3<Float>, Float) {
        let s = self.shape.sample_position(u);
        (s.p, s.n, s.pdf)
    }

    fn pdf_position(&self) -> Float {
        1.0 / self.shape.area()
    }

    fn sample_emit_direction(
        &self,
        u: Point2<Float>,
        n: Vector3<Float>,
    ) -> Option<(Vector3<Float>, Float)> {
        let local = sample::cosine_sample_hemisphere(u);
        let pdf = sample::cosine_hemisphere_pdf(local.z);
        if pdf == 0.0 {
            return None;
        }
        Some((util::local_to_world(n) * local, pdf))
    }

    fn pdf_emit_direction(&self, n: Vector3<Float>, dir: Vector3<Float>) -> Float {
        let cos_t = n.dot(dir);
        if cos_t <= 0.0 {
            0.0
        } else {
            sample::cosine_hemisphere_pdf(cos_t)
        }
    }
}

/// Isotropic point light
#[derive(Clone, Debug)]
pub struct PointLight {
    pos: Point3<Float>,
    intensity: Color,
}

impl PointLight {
    pub fn new(pos: Point3<Float>, intensity: Color) -> Self {
        Self { pos, intensity }
    }
}

impl Light for PointLight {
    fn is_delta(&self) -> bool {
        true
    }

    fn power(&self) -> Color {
        4.0 * consts::PI * self.intensity
    }

    fn emission(&self, _n: Vector3<Float>, _dir: Vector3<Float>) -> Color {
        self.intensity
    }

    fn sample_direct(&self, _u: Point2<Float>, p_ref: Point3<Float>) -> Option<LightSample> {
        let d = self.pos - p_ref;
        let dist2 = d.magnitude2();
        if dist2 == 0.0 {
            return None;
        }
        let dist = dist2.sqrt();
        let wi = d / dist;
        Some(LightSample {
            p: self.pos,
            n: -wi,
            wi,
            dist,
            pdf: 1.0,
            li: self.intensity / dist2,
        })
    }

    fn pdf_direct(&self, _p_ref: Point3<Float>, _p: Point3<Float>, _n: Vector3<Float>) -> Float {
        0.0
    }

    fn sample_position(&self, _u: Point2<Float>) -> (Point3<Float>, Vector3<Float>, Float) {
        (self.pos, Vector3::unit_z(), 1.0)
    }

    fn pdf_position(&self) -> Float {
        1.0
    }

    fn sample_emit_direction(
        &self,
        u: Point2<Float>,
        _n: Vector3<Float>,
    ) -> Option<(Vector3<Float>, Float)> {
        Some((sample::uniform_sample_sphere(u), sample::uniform_sphere_pdf()))
    }

    fn pdf_emit_direction(&self, _n: Vector3<Float>, _dir: Vector3<Float>) -> Float {
        sample::uniform_sphere_pdf()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn area_light_emits_from_front_only() {
        let light = AreaLight::new(
            Shape::quad(
                Point3::new(0.0, 0.0, 1.0),
                Vector3::new(1.0, 0.0, 0.0),
                Vector3::new(0.0, 1.0, 0.0),
            ),
            Color::gray(2.0),
        );
        let n = Vector3::unit_z();
        assert_relative_eq!(light.emission(n, Vector3::unit_z()).r(), 2.0);
        assert!(light.emission(n, -Vector3::unit_z()).is_black());
        assert_relative_eq!(light.power().g(), 2.0 * consts::PI);
        let s = light
            .sample_direct(Point2::new(0.5, 0.5), Point3::new(0.5, 0.5, 2.0))
            .unwrap();
        assert_relative_eq!(s.li.r(), 2.0);
        assert_relative_eq!(s.pdf, 1.0, epsilon = 1e-9);
        assert_relative_eq!(s.wi.z, -1.0, epsilon = 1e-9);
        // A receiver below the quad sees its back
        let s = light
            .sample_direct(Point2::new(0.5, 0.5), Point3::new(0.5, 0.5, 0.0))
            .unwrap();
        assert!(s.li.is_black());
    }

    #[test]
    fn point_light_falls_off_with_distance() {
        let light = PointLight::new(Point3::new(0.0, 0.0, 2.0), Color::white());
        let s = light
            .sample_direct(Point2::new(0.1, 0.9), Point3::new(0.0, 0.0, 0.0))
            .unwrap();
        assert_relative_eq!(s.li.r(), 0.25);
        assert_relative_eq!(s.wi.z, 1.0);
        assert!(light.is_delta() && !light.is_on_surface());
    }
}
