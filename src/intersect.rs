use std::sync::atomic::{AtomicUsize, Ordering};

use cgmath::prelude::*;
use cgmath::{Matrix3, Point2, Point3, Vector3};

use crate::bsdf::{Bsdf, BsdfSample, TransportMode};
use crate::color::Color;
use crate::consts;
use crate::light::Light;
use crate::util;
use crate::Float;

static RAY_COUNT: AtomicUsize = AtomicUsize::new(0);

#[derive(Clone, Debug)]
pub struct Ray {
    pub orig: Point3<Float>,
    pub dir: Vector3<Float>,
    pub length: Float,
}

impl Ray {
    fn new(orig: Point3<Float>, dir: Vector3<Float>, length: Float) -> Ray {
        RAY_COUNT.fetch_add(1, Ordering::Relaxed);
        Ray { orig, dir, length }
    }

    /// Infinite ray with a given direction and origin
    pub fn from_dir(mut orig: Point3<Float>, dir: Vector3<Float>) -> Ray {
        orig += consts::EPSILON * dir;
        Ray::new(orig, dir, consts::INFINITY)
    }

    /// Shadow ray between two points
    pub fn shadow(mut orig: Point3<Float>, to: Point3<Float>) -> Ray {
        let dp = to - orig;
        let length = dp.magnitude() - 2.0 * consts::EPSILON;
        let dir = dp.normalize();
        orig += consts::EPSILON * dir;
        Ray::new(orig, dir, length.max(0.0))
    }

    pub fn at(&self, t: Float) -> Point3<Float> {
        self.orig + t * self.dir
    }

    /// Number of rays constructed by the process
    pub fn count() -> usize {
        RAY_COUNT.load(Ordering::Relaxed)
    }
}

/// Emitter found at an interaction
#[derive(Clone, Copy)]
pub struct Emitter<'a> {
    pub index: usize,
    pub light: &'a dyn Light,
}

impl std::fmt::Debug for Emitter<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("Emitter").field("index", &self.index).finish()
    }
}

/// Ray surface intersection
#[derive(Clone, Debug)]
pub struct Interaction<'a> {
    pub p: Point3<Float>,
    /// Distance along the ray
    pub t: Float,
    /// Geometric normal
    pub ng: Vector3<Float>,
    /// Shading normal
    pub ns: Vector3<Float>,
    frame: Matrix3<Float>,
    pub bsdf: Option<&'a Bsdf>,
    pub emitter: Option<Emitter<'a>>,
}

impl<'a> Interaction<'a> {
    pub fn new(
        p: Point3<Float>,
        t: Float,
        ng: Vector3<Float>,
        ns: Vector3<Float>,
        bsdf: Option<&'a Bsdf>,
        emitter: Option<Emitter<'a>>,
    ) -> Self {
        Self {
            p,
            t,
            ng,
            ns,
            frame: util::local_to_world(ns),
            bsdf,
            emitter,
        }
    }

    pub fn to_local(&self, v: Vector3<Float>) -> Vector3<Float> {
        self.frame.transpose() * v
    }

    pub fn to_world(&self, v: Vector3<Float>) -> Vector3<Float> {
        self.frame * v
    }

    /// Geometric cosine
    pub fn cos_g(&self, dir: Vector3<Float>) -> Float {
        self.ng.dot(dir)
    }

    /// Shading cosine
    pub fn cos_s(&self, dir: Vector3<Float>) -> Float {
        self.ns.dot(dir)
    }

    /// Do the geometric and shading normals see dir on the same side
    pub fn consistent(&self, dir: Vector3<Float>) -> bool {
        self.cos_g(dir) * self.cos_s(dir) > 0.0
    }

    /// Emitted radiance toward dir
    pub fn le(&self, dir: Vector3<Float>) -> Color {
        match self.emitter {
            Some(e) => e.light.emission(self.ng, dir),
            None => Color::black(),
        }
    }

    pub fn is_connectible(&self) -> bool {
        self.bsdf.map_or(false, |bsdf| !bsdf.is_delta())
    }

    pub fn is_specular(&self) -> bool {
        self.bsdf.map_or(false, |bsdf| bsdf.is_delta())
    }

    /// Bsdf value for world space directions.
    /// wo points toward the previous vertex of a path traced in mode.
    pub fn eval_bsdf(&self, wo: Vector3<Float>, wi: Vector3<Float>, mode: TransportMode) -> Color {
        let bsdf = match self.bsdf {
            Some(bsdf) => bsdf,
            None => return Color::black(),
        };
        if !self.consistent(wo) || !self.consistent(wi) {
            return Color::black();
        }
        let s = BsdfSample::with_wi(self.to_local(wo), self.to_local(wi), mode);
        bsdf.eval(&s)
    }

    pub fn pdf_bsdf(&self, wo: Vector3<Float>, wi: Vector3<Float>, mode: TransportMode) -> Float {
        let bsdf = match self.bsdf {
            Some(bsdf) => bsdf,
            None => return 0.0,
        };
        if !self.consistent(wo) || !self.consistent(wi) {
            return 0.0;
        }
        let s = BsdfSample::with_wi(self.to_local(wo), self.to_local(wi), mode);
        bsdf.pdf(&s)
    }

    /// Sample a continuation direction.
    /// Returns the weight f * |cos| / pdf, the world space direction and
    /// the local sample record.
    pub fn sample_bsdf(
        &self,
        wo: Vector3<Float>,
        mode: TransportMode,
        uc: Float,
        u: Point2<Float>,
    ) -> Option<(Color, Vector3<Float>, BsdfSample)> {
        let bsdf = self.bsdf?;
        let mut s = BsdfSample::new(self.to_local(wo), mode);
        let weight = bsdf.sample(uc, u, &mut s)?;
        let wi = self.to_world(s.wi);
        Some((weight, wi, s))
    }

    /// Factor that keeps importance transport consistent
    /// with interpolated shading normals
    pub fn shading_correction(
        &self,
        wo: Vector3<Float>,
        wi: Vector3<Float>,
        mode: TransportMode,
    ) -> Float {
        match mode {
            TransportMode::Radiance => 1.0,
            TransportMode::Importance => {
                let denom = (self.cos_g(wo) * self.cos_s(wi)).abs();
                if denom == 0.0 {
                    0.0
                } else {
                    (self.cos_s(wo) * self.cos_g(wi)).abs() / denom
                }
            }
        }
    }

    /// Origin offset to the side of dir
    pub fn ray_origin(&self, dir: Vector3<Float>) -> Point3<Float> {
        self.p + consts::EPSILON * util::face_forward(self.ng, dir)
    }

    pub fn spawn_ray(&self, dir: Vector3<Float>) -> Ray {
        Ray::from_dir(self.ray_origin(dir), dir)
    }

    pub fn shadow_ray_to(&self, p: Point3<Float>) -> Ray {
        Ray::shadow(self.ray_origin(p - self.p), p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn flat(ns: Vector3<Float>) -> Interaction<'static> {
        Interaction::new(
            Point3::origin(),
            1.0,
            Vector3::unit_z(),
            ns.normalize(),
            None,
            None,
        )
    }

    #[test]
    fn shadow_ray_stops_short_of_target() {
        let ray = Ray::shadow(Point3::new(0.0, 0.0, 0.0), Point3::new(0.0, 3.0, 4.0));
        assert!(ray.length < 5.0 && ray.length > 4.99);
        assert_relative_eq!(ray.dir.magnitude(), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn frame_round_trips() {
        let isect = flat(Vector3::new(0.1, 0.2, 1.0));
        let v = Vector3::new(0.3, -0.4, 0.5);
        let back = isect.to_world(isect.to_local(v));
        assert_relative_eq!(back.x, v.x, epsilon = 1e-9);
        assert_relative_eq!(back.y, v.y, epsilon = 1e-9);
        assert_relative_eq!(back.z, v.z, epsilon = 1e-9);
        assert_relative_eq!(isect.to_local(isect.ns).z, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn correction_is_identity_for_flat_shading() {
        let isect = flat(Vector3::unit_z());
        let wo = Vector3::new(0.6, 0.0, 0.8);
        let wi = Vector3::new(0.0, 0.6, 0.8);
        assert_relative_eq!(isect.shading_correction(wo, wi, TransportMode::Importance), 1.0);
        let bent = flat(Vector3::new(0.3, 0.0, 1.0));
        assert_relative_eq!(bent.shading_correction(wo, wi, TransportMode::Radiance), 1.0);
        assert!(bent.shading_correction(wo, wi, TransportMode::Importance) != 1.0);
    }
}
