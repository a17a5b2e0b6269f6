use cgmath::prelude::*;
use cgmath::{Point2, Point3, Vector3};

use crate::float::*;
use crate::intersect::Ray;
use crate::sample;
use crate::util;

/// Geometry of a ray hit
#[derive(Clone, Copy, Debug)]
pub struct Hit {
    pub t: Float,
    pub p: Point3<Float>,
    pub ng: Vector3<Float>,
    pub ns: Vector3<Float>,
}

/// Point sampled on a shape
#[derive(Clone, Copy, Debug)]
pub struct ShapeSample {
    pub p: Point3<Float>,
    pub n: Vector3<Float>,
    /// Area density for position sampling, solid angle density for direct sampling
    pub pdf: Float,
}

#[derive(Clone, Debug)]
pub enum Shape {
    Sphere {
        center: Point3<Float>,
        radius: Float,
    },
    /// Parallelogram spanned by two edges from a corner.
    /// The normal is edge0 x edge1.
    Quad {
        corner: Point3<Float>,
        edge0: Vector3<Float>,
        edge1: Vector3<Float>,
    },
    Triangle {
        p: [Point3<Float>; 3],
        /// Optional vertex normals for smooth shading
        n: Option<[Vector3<Float>; 3]>,
    },
}

impl Shape {
    pub fn sphere(center: Point3<Float>, radius: Float) -> Self {
        Shape::Sphere { center, radius }
    }

    pub fn quad(corner: Point3<Float>, edge0: Vector3<Float>, edge1: Vector3<Float>) -> Self {
        Shape::Quad {
            corner,
            edge0,
            edge1,
        }
    }

    pub fn triangle(p0: Point3<Float>, p1: Point3<Float>, p2: Point3<Float>) -> Self {
        Shape::Triangle {
            p: [p0, p1, p2],
            n: None,
        }
    }

    pub fn smooth_triangle(p: [Point3<Float>; 3], n: [Vector3<Float>; 3]) -> Self {
        Shape::Triangle {
            p,
            n: Some([n[0].normalize(), n[1].normalize(), n[2].normalize()]),
        }
    }

    pub fn intersect(&self, ray: &Ray) -> Option<Hit> {
        match *self {
            Shape::Sphere { center, radius } => intersect_sphere(ray, center, radius),
            Shape::Quad {
                corner,
                edge0,
                edge1,
            } => intersect_quad(ray, corner, edge0, edge1),
            Shape::Triangle { ref p, ref n } => intersect_triangle(ray, p, n.as_ref()),
        }
    }

    pub fn area(&self) -> Float {
        match *self {
            Shape::Sphere { radius, .. } => 4.0 * crate::consts::PI * radius * radius,
            Shape::Quad { edge0, edge1, .. } => edge0.cross(edge1).magnitude(),
            Shape::Triangle { p, .. } => 0.5 * (p[1] - p[0]).cross(p[2] - p[0]).magnitude(),
        }
    }

    /// Uniformly sample a point by area
    pub fn sample_position(&self, u: Point2<Float>) -> ShapeSample {
        let (p, n) = match *self {
            Shape::Sphere { center, radius } => {
                let n = sample::uniform_sample_sphere(u);
                (center + radius * n, n)
            }
            Shape::Quad {
                corner,
                edge0,
                edge1,
            } => (
                corner + u.x * edge0 + u.y * edge1,
                edge0.cross(edge1).normalize(),
            ),
            Shape::Triangle { p, .. } => (
                sample::triangle_point(u, p[0], p[1], p[2]),
                (p[1] - p[0]).cross(p[2] - p[0]).normalize(),
            ),
        };
        ShapeSample {
            p,
            n,
            pdf: 1.0 / self.area(),
        }
    }

    /// Sample a point visible from p_ref with a solid angle density.
    /// Spheres seen from outside sample the cone they subtend.
    pub fn sample_direct(&self, u: Point2<Float>, p_ref: Point3<Float>) -> Option<ShapeSample> {
        if let Shape::Sphere { center, radius } = *self {
            let to_center = center - p_ref;
            let dc2 = to_center.magnitude2();
            if dc2 > radius * radius {
                let dc = dc2.sqrt();
                let sin2_max = radius * radius / dc2;
                let cos_max = safe_sqrt(1.0 - sin2_max);
                let frame = util::local_to_world(to_center / dc);
                let local = sample::uniform_sample_cone(u, cos_max);
                let wi = (frame * local).normalize();
                let cos_t = local.z;
                let sin2_t = (1.0 - cos_t * cos_t).max(0.0);
                // Distance to the near side of the sphere
                let ds = dc * cos_t - safe_sqrt(radius * radius - dc2 * sin2_t);
                let p = p_ref + ds * wi;
                let n = (p - center).normalize();
                return Some(ShapeSample {
                    p,
                    n,
                    pdf: sample::uniform_cone_pdf(cos_max),
                });
            }
        }
        let s = self.sample_position(u);
        let d = s.p - p_ref;
        let dist2 = d.magnitude2();
        if dist2 == 0.0 {
            return None;
        }
        let cos_l = s.n.dot(d) / dist2.sqrt();
        let pdf = sample::to_solid_angle_pdf(s.pdf, dist2, cos_l);
        if pdf == 0.0 || !pdf.is_finite() {
            return None;
        }
        Some(ShapeSample { pdf, ..s })
    }

    /// Solid angle density of sample_direct choosing p with normal n
    pub fn pdf_direct(&self, p_ref: Point3<Float>, p: Point3<Float>, n: Vector3<Float>) -> Float {
        if let Shape::Sphere { center, radius } = *self {
            let dc2 = (center - p_ref).magnitude2();
            if dc2 > radius * radius {
                let cos_max = safe_sqrt(1.0 - radius * radius / dc2);
                return sample::uniform_cone_pdf(cos_max);
            }
        }
        let d = p - p_ref;
        let dist2 = d.magnitude2();
        if dist2 == 0.0 {
            return 0.0;
        }
        sample::to_solid_angle_pdf(1.0 / self.area(), dist2, n.dot(d) / dist2.sqrt())
    }
}

fn intersect_sphere(ray: &Ray, center: Point3<Float>, radius: Float) -> Option<Hit> {
    let oc = ray.orig - center;
    let b = oc.dot(ray.dir);
    let c = oc.magnitude2() - radius * radius;
    let disc = b * b - c;
    if disc < 0.0 {
        return None;
    }
    let sq_disc = disc.sqrt();
    let t0 = -b - sq_disc;
    let t1 = -b + sq_disc;
    let t = if t0 > 0.0 {
        t0
    } else if t1 > 0.0 {
        t1
    } else {
        return None;
    };
    if t >= ray.length {
        return None;
    }
    let p = ray.at(t);
    let n = (p - center) / radius;
    Some(Hit {
        t,
        p,
        ng: n,
        ns: n,
    })
}

fn intersect_quad(
    ray: &Ray,
    corner: Point3<Float>,
    edge0: Vector3<Float>,
    edge1: Vector3<Float>,
) -> Option<Hit> {
    let n = edge0.cross(edge1);
    let denom = n.dot(ray.dir);
    if denom == 0.0 {
        return None;
    }
    let t = n.dot(corner - ray.orig) / denom;
    if t <= 0.0 || t >= ray.length {
        return None;
    }
    let p = ray.at(t);
    // Parallelogram coordinates of the hit
    let w = n / n.magnitude2();
    let planar = p - corner;
    let alpha = w.dot(planar.cross(edge1));
    let beta = w.dot(edge0.cross(planar));
    if alpha < 0.0 || alpha > 1.0 || beta < 0.0 || beta > 1.0 {
        return None;
    }
    let ng = n.normalize();
    Some(Hit { t, p, ng, ns: ng })
}

fn intersect_triangle(
    ray: &Ray,
    p: &[Point3<Float>; 3],
    normals: Option<&[Vector3<Float>; 3]>,
) -> Option<Hit> {
    // Möller-Trumbore
    let e1 = p[1] - p[0];
    let e2 = p[2] - p[0];
    let pvec = ray.dir.cross(e2);
    let det = e1.dot(pvec);
    if det.abs() < 1e-12 {
        return None;
    }
    let inv_det = 1.0 / det;
    let tvec = ray.orig - p[0];
    let u = tvec.dot(pvec) * inv_det;
    if u < 0.0 || u > 1.0 {
        return None;
    }
    let qvec = tvec.cross(e1);
    let v = ray.dir.dot(qvec) * inv_det;
    if v < 0.0 || u + v > 1.0 {
        return None;
    }
    let t = e2.dot(qvec) * inv_det;
    if t <= 0.0 || t >= ray.length {
        return None;
    }
    let ng = e1.cross(e2).normalize();
    let ns = match normals {
        Some(n) => {
            let ns = (1.0 - u - v) * n[0] + u * n[1] + v * n[2];
            if ns.magnitude2() == 0.0 {
                ng
            } else {
                util::face_forward(ns.normalize(), ng)
            }
        }
        None => ng,
    };
    Some(Hit {
        t,
        p: ray.at(t),
        ng,
        ns,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::{Rng, SeedableRng};
    use rand_xoshiro::Xoshiro256Plus;

    fn below_ray(x: Float, y: Float) -> Ray {
        Ray::from_dir(Point3::new(x, y, -1.0), Vector3::unit_z())
    }

    #[test]
    fn quad_bounds_are_respected() {
        let quad = Shape::quad(
            Point3::new(0.0, 0.0, 0.0),
            Vector3::new(2.0, 0.0, 0.0),
            Vector3::new(0.0, 1.0, 0.0),
        );
        let hit = quad.intersect(&below_ray(1.5, 0.5)).unwrap();
        assert_relative_eq!(hit.t, 1.0, epsilon = 1e-6);
        assert_relative_eq!(hit.ng.z, 1.0);
        assert!(quad.intersect(&below_ray(2.5, 0.5)).is_none());
        assert!(quad.intersect(&below_ray(1.0, -0.1)).is_none());
        assert_relative_eq!(quad.area(), 2.0);
    }

    #[test]
    fn sphere_hit_from_inside_uses_far_root() {
        let sphere = Shape::sphere(Point3::new(0.0, 0.0, 0.0), 2.0);
        let ray = Ray::from_dir(Point3::new(0.0, 0.0, 0.0), Vector3::unit_x());
        let hit = sphere.intersect(&ray).unwrap();
        assert_relative_eq!(hit.p.x, 2.0, epsilon = 1e-6);
    }

    #[test]
    fn smooth_triangle_interpolates_normals() {
        let tri = Shape::smooth_triangle(
            [
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
            ],
            [
                Vector3::new(0.0, 0.0, 1.0),
                Vector3::new(1.0, 0.0, 1.0),
                Vector3::new(0.0, 0.0, 1.0),
            ],
        );
        let hit = tri.intersect(&below_ray(0.5, 0.25)).unwrap();
        assert_relative_eq!(hit.ng.z, 1.0);
        assert!(hit.ns.x > 0.0 && hit.ns.z > 0.0);
        assert!(tri.intersect(&below_ray(0.8, 0.8)).is_none());
    }

    #[test]
    fn direct_sampling_matches_pdf() {
        let mut rng = Xoshiro256Plus::seed_from_u64(3);
        let shapes = vec![
            Shape::sphere(Point3::new(0.0, 0.0, 3.0), 1.0),
            Shape::quad(
                Point3::new(-1.0, -1.0, 2.0),
                Vector3::new(2.0, 0.0, 0.0),
                Vector3::new(0.0, 2.0, 0.0),
            ),
            Shape::triangle(
                Point3::new(0.0, 0.0, 1.0),
                Point3::new(1.0, 0.0, 1.0),
                Point3::new(0.0, 1.0, 1.5),
            ),
        ];
        let p_ref = Point3::new(0.1, 0.2, 0.0);
        for shape in &shapes {
            for _ in 0..100 {
                let u = Point2::new(rng.gen::<Float>(), rng.gen::<Float>());
                let s = shape.sample_direct(u, p_ref).unwrap();
                let pdf = shape.pdf_direct(p_ref, s.p, s.n);
                assert_relative_eq!(s.pdf, pdf, max_relative = 1e-6);
                // The sampled point is on the surface and visible
                let ray = Ray::from_dir(p_ref, (s.p - p_ref).normalize());
                let hit = shape.intersect(&ray).unwrap();
                assert_relative_eq!(hit.t, (s.p - p_ref).magnitude(), max_relative = 1e-4);
            }
        }
    }

    #[test]
    fn cone_sampling_integrates_solid_angle() {
        // Mean of 1 / pdf over samples is the subtended solid angle
        let sphere = Shape::sphere(Point3::new(0.0, 0.0, 4.0), 1.0);
        let s = sphere
            .sample_direct(Point2::new(0.3, 0.7), Point3::new(0.0, 0.0, 0.0))
            .unwrap();
        let cos_max = (1.0 - 1.0 / 16.0 as Float).sqrt();
        let omega = crate::consts::TWO_PI * (1.0 - cos_max);
        assert_relative_eq!(1.0 / s.pdf, omega, max_relative = 1e-9);
    }
}
