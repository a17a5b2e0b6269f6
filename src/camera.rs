/// Module containing the camera functionality
use cgmath::prelude::*;
use cgmath::{Matrix3, Point2, Point3, Rad, Vector3};

use crate::color::Color;
use crate::consts;
use crate::float::*;
use crate::intersect::Ray;
use crate::sample;

/// Camera end of a connection from a scene point
#[derive(Clone, Copy, Debug)]
pub struct CameraSample {
    /// Point sampled on the lens
    pub p: Point3<Float>,
    /// Unit direction from the reference point toward p
    pub wi: Vector3<Float>,
    pub dist: Float,
    /// Solid angle density at the reference point
    pub pdf: Float,
    /// Importance carried back along -wi
    pub we: Color,
    /// Film position hit by the connection
    pub raster: Point2<Float>,
}

/// Perspective camera with an optional thin lens.
/// Looks along -z of its local frame.
#[derive(Clone, Debug)]
pub struct Camera {
    /// Position of the camera in world coordinates
    pub pos: Point3<Float>,
    /// Camera to world rotation
    rot: Matrix3<Float>,
    /// Width of the film in pixels
    pub width: u32,
    /// Height of the film in pixels
    pub height: u32,
    /// Vertical field-of-view of the camera
    fov: Rad<Float>,
    lens_radius: Float,
    focus_distance: Float,
    /// Half extents of the image plane at distance one
    half_width: Float,
    half_height: Float,
}

impl Camera {
    pub fn look_at(
        pos: Point3<Float>,
        target: Point3<Float>,
        up: Vector3<Float>,
        fov: Rad<Float>,
        width: u32,
        height: u32,
    ) -> Camera {
        let forward = (target - pos).normalize();
        let right = forward.cross(up).normalize();
        let up = right.cross(forward);
        let mut camera = Camera {
            pos,
            rot: Matrix3::from_cols(right, up, -forward),
            width,
            height,
            fov,
            lens_radius: 0.0,
            focus_distance: 1.0,
            half_width: 0.0,
            half_height: 0.0,
        };
        camera.update_viewport((width, height));
        camera
    }

    /// Thin lens focused at focus_distance along the view axis
    pub fn with_lens(self, lens_radius: Float, focus_distance: Float) -> Camera {
        Camera {
            lens_radius: lens_radius.max(0.0),
            focus_distance: focus_distance.max(consts::EPSILON),
            ..self
        }
    }

    pub fn update_viewport(&mut self, size: (u32, u32)) {
        self.width = size.0;
        self.height = size.1;
        self.half_height = (0.5 * self.fov.0).tan();
        self.half_width = self.half_height * self.width.to_float() / self.height.max(1).to_float();
    }

    /// Get the forward axis of the camera in the world frame
    pub fn forward(&self) -> Vector3<Float> {
        -self.rot.z
    }

    pub fn is_delta_position(&self) -> bool {
        self.lens_radius == 0.0
    }

    fn lens_area(&self) -> Float {
        if self.is_delta_position() {
            1.0
        } else {
            consts::PI * self.lens_radius * self.lens_radius
        }
    }

    /// Area of the image plane at distance one
    fn film_area(&self) -> Float {
        4.0 * self.half_width * self.half_height
    }

    /// Ray through a continuous raster position, y pointing down
    pub fn generate_ray(&self, raster: Point2<Float>, u_lens: Point2<Float>) -> Ray {
        let x = (2.0 * raster.x / self.width.to_float() - 1.0) * self.half_width;
        let y = (1.0 - 2.0 * raster.y / self.height.to_float()) * self.half_height;
        let dir = Vector3::new(x, y, -1.0);
        if self.is_delta_position() {
            return Ray::from_dir(self.pos, (self.rot * dir).normalize());
        }
        let lens = sample::concentric_sample_disk(u_lens);
        let origin = Vector3::new(lens.x * self.lens_radius, lens.y * self.lens_radius, 0.0);
        let focus = dir * self.focus_distance;
        let world_dir = (self.rot * (focus - origin)).normalize();
        Ray::from_dir(self.pos + self.rot * origin, world_dir)
    }

    /// Film position of the ray leaving the lens point origin along dir
    pub fn raster_position(&self, origin: Point3<Float>, dir: Vector3<Float>) -> Option<Point2<Float>> {
        let cos_t = dir.dot(self.forward());
        if cos_t <= 0.0 {
            return None;
        }
        // Rays through the lens center are not bent
        let focus = origin + dir * (self.focus_distance / cos_t);
        let local = self.rot.transpose() * (focus - self.pos);
        if local.z >= 0.0 {
            return None;
        }
        let x = local.x / -local.z;
        let y = local.y / -local.z;
        let raster = Point2::new(
            0.5 * (x / self.half_width + 1.0) * self.width.to_float(),
            0.5 * (1.0 - y / self.half_height) * self.height.to_float(),
        );
        if raster.x < 0.0
            || raster.y < 0.0
            || raster.x >= self.width.to_float()
            || raster.y >= self.height.to_float()
        {
            return None;
        }
        Some(raster)
    }

    /// Importance emitted from the lens point origin along dir
    pub fn we(&self, origin: Point3<Float>, dir: Vector3<Float>) -> Color {
        if self.raster_position(origin, dir).is_none() {
            return Color::black();
        }
        let cos_t = dir.dot(self.forward());
        let cos2 = cos_t * cos_t;
        Color::gray(1.0 / (self.film_area() * self.lens_area() * cos2 * cos2))
    }

    /// Area density of the lens point and solid angle density of dir
    pub fn pdf_we(&self, origin: Point3<Float>, dir: Vector3<Float>) -> (Float, Float) {
        if self.raster_position(origin, dir).is_none() {
            return (0.0, 0.0);
        }
        let cos_t = dir.dot(self.forward());
        (
            1.0 / self.lens_area(),
            1.0 / (self.film_area() * cos_t * cos_t * cos_t),
        )
    }

    /// Sample a lens point seen from p_ref
    pub fn sample_wi(&self, p_ref: Point3<Float>, u: Point2<Float>) -> Option<CameraSample> {
        let lens = sample::concentric_sample_disk(u);
        let offset = Vector3::new(lens.x * self.lens_radius, lens.y * self.lens_radius, 0.0);
        let p = self.pos + self.rot * offset;
        let d = p - p_ref;
        let dist = d.magnitude();
        if dist == 0.0 {
            return None;
        }
        let wi = d / dist;
        let cos_lens = self.forward().dot(-wi);
        if cos_lens <= 0.0 {
            return None;
        }
        let raster = self.raster_position(p, -wi)?;
        Some(CameraSample {
            p,
            wi,
            dist,
            pdf: dist * dist / (cos_lens * self.lens_area()),
            we: self.we(p, -wi),
            raster,
        })
    }
}
