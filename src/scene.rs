use cgmath::{Point3, Vector3};
use tracing::debug;

use crate::bsdf::Bsdf;
use crate::color::Color;
use crate::float::*;
use crate::intersect::{Emitter, Interaction, Ray};
use crate::light::{AreaLight, Light, PointLight};
use crate::sample::Distribution1D;
use crate::shape::Shape;

/// Renderable surface
#[derive(Clone, Debug)]
pub struct Primitive {
    pub shape: Shape,
    /// Surfaces without a bsdf absorb everything
    pub bsdf: Option<Bsdf>,
    /// Index of the area light covering the surface
    pub light: Option<usize>,
}

#[derive(Default)]
pub struct SceneBuilder {
    primitives: Vec<Primitive>,
    lights: Vec<Box<dyn Light>>,
}

impl SceneBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, shape: Shape, bsdf: Bsdf) -> &mut Self {
        self.primitives.push(Primitive {
            shape,
            bsdf: Some(bsdf),
            light: None,
        });
        self
    }

    /// Emissive surface. The bsdf is optional since most emitters
    /// only need to be seen.
    pub fn add_area_light(&mut self, shape: Shape, le: Color, bsdf: Option<Bsdf>) -> &mut Self {
        let index = self.lights.len();
        self.lights.push(Box::new(AreaLight::new(shape.clone(), le)));
        self.primitives.push(Primitive {
            shape,
            bsdf,
            light: Some(index),
        });
        self
    }

    pub fn add_point_light(&mut self, pos: Point3<Float>, intensity: Color) -> &mut Self {
        self.lights.push(Box::new(PointLight::new(pos, intensity)));
        self
    }

    pub fn build(&mut self) -> Scene {
        let primitives = std::mem::take(&mut self.primitives);
        let lights = std::mem::take(&mut self.lights);
        let powers: Vec<Float> = lights.iter().map(|l| l.power().luma()).collect();
        let light_distribution = Distribution1D::new(&powers);
        debug!(
            primitives = primitives.len(),
            lights = lights.len(),
            "built scene"
        );
        Scene {
            primitives,
            lights,
            light_distribution,
        }
    }
}

/// Static scene with a linear list of primitives
pub struct Scene {
    primitives: Vec<Primitive>,
    lights: Vec<Box<dyn Light>>,
    light_distribution: Distribution1D,
}

impl Scene {
    pub fn primitives(&self) -> &[Primitive] {
        &self.primitives
    }

    pub fn light_count(&self) -> usize {
        self.lights.len()
    }

    pub fn light(&self, index: usize) -> &dyn Light {
        self.lights[index].as_ref()
    }

    /// Closest hit along the ray
    pub fn intersect(&self, ray: &Ray) -> Option<Interaction<'_>> {
        let mut closest = None;
        let mut t_max = ray.length;
        for prim in &self.primitives {
            if let Some(hit) = prim.shape.intersect(ray) {
                if hit.t < t_max {
                    t_max = hit.t;
                    closest = Some((prim, hit));
                }
            }
        }
        let (prim, hit) = closest?;
        let emitter = prim.light.map(|index| Emitter {
            index,
            light: self.light(index),
        });
        Some(Interaction::new(
            hit.p,
            hit.t,
            hit.ng,
            hit.ns,
            prim.bsdf.as_ref(),
            emitter,
        ))
    }

    /// Is anything hit before the end of the ray
    pub fn is_occluded(&self, ray: &Ray) -> bool {
        self.primitives
            .iter()
            .any(|prim| prim.shape.intersect(ray).is_some())
    }

    /// Pick a light proportionally to its power.
    /// Returns the light index, the light and the selection probability.
    pub fn sample_light(&self, u: Float) -> Option<(usize, &dyn Light, Float)> {
        let (index, pmf, _) = self.light_distribution.sample_discrete(u)?;
        if pmf == 0.0 {
            return None;
        }
        Some((index, self.light(index), pmf))
    }

    pub fn light_pmf(&self, index: usize) -> Float {
        self.light_distribution.pmf(index)
    }

    /// Radiance of a ray that escapes the scene
    pub fn background(&self, _dir: Vector3<Float>) -> Color {
        Color::black()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use cgmath::prelude::*;

    fn two_lights() -> Scene {
        let mut builder = SceneBuilder::new();
        builder
            .add(
                Shape::quad(
                    Point3::new(-5.0, -5.0, 0.0),
                    Vector3::new(10.0, 0.0, 0.0),
                    Vector3::new(0.0, 10.0, 0.0),
                ),
                Bsdf::lambertian(Color::gray(0.5)),
            )
            .add_area_light(
                Shape::sphere(Point3::new(0.0, 0.0, 3.0), 0.5),
                Color::white(),
                None,
            )
            .add_point_light(Point3::new(2.0, 0.0, 2.0), Color::gray(0.25));
        builder.build()
    }

    #[test]
    fn intersect_finds_closest_surface() {
        let scene = two_lights();
        let ray = Ray::from_dir(Point3::new(0.0, 0.0, 5.0), -Vector3::unit_z());
        let isect = scene.intersect(&ray).unwrap();
        assert_relative_eq!(isect.p.z, 3.5, epsilon = 1e-6);
        assert!(isect.emitter.is_some());
        assert!(isect.bsdf.is_none());
        let ray = Ray::from_dir(Point3::new(3.0, 0.0, 5.0), -Vector3::unit_z());
        let isect = scene.intersect(&ray).unwrap();
        assert_relative_eq!(isect.p.z, 0.0, epsilon = 1e-6);
        assert!(isect.emitter.is_none());
    }

    #[test]
    fn lights_are_picked_by_power() {
        let scene = two_lights();
        // Sphere: pi * 4 pi r^2 = pi^2, point light: 4 pi * 0.25 = pi
        let p_sphere = scene.light_pmf(0);
        let p_point = scene.light_pmf(1);
        assert_relative_eq!(p_sphere + p_point, 1.0, epsilon = 1e-9);
        assert_relative_eq!(p_sphere / p_point, crate::consts::PI, epsilon = 1e-9);
        let (index, _, pmf) = scene.sample_light(0.99).unwrap();
        assert_eq!(index, 1);
        assert_relative_eq!(pmf, p_point);
    }

    #[test]
    fn shadow_ray_detects_blocker() {
        let scene = two_lights();
        let shadow = Ray::shadow(Point3::new(0.0, 0.0, 0.1), Point3::new(0.0, 0.0, 5.0));
        assert!(scene.is_occluded(&shadow));
        let free = Ray::shadow(Point3::new(3.0, 0.0, 0.1), Point3::new(3.0, 0.0, 5.0));
        assert!(!scene.is_occluded(&free));
        assert!(free.dir.magnitude() > 0.0);
    }
}
