use cgmath::prelude::*;
use cgmath::{Point3, Vector3};

use crate::bsdf::TransportMode;
use crate::camera::Camera;
use crate::color::Color;
use crate::float::*;
use crate::intersect::{Interaction, Ray};
use crate::light::Light;
use crate::scene::Scene;

#[derive(Clone)]
pub enum VertexKind<'a> {
    /// Point on the camera lens
    Camera { camera: &'a Camera },
    /// Point on a light. n is meaningless for lights without a surface.
    Light {
        light: &'a dyn Light,
        index: usize,
        n: Vector3<Float>,
    },
    Surface {
        isect: Interaction<'a>,
        /// Direction toward the previous vertex
        wo: Vector3<Float>,
        mode: TransportMode,
    },
}

/// Vertex of a camera or light sub-path.
/// Both densities are area densities of sampling this vertex,
/// pdf_fwd from the previous vertex and pdf_rev from the next.
#[derive(Clone)]
pub struct PathVertex<'a> {
    pub kind: VertexKind<'a>,
    pub p: Point3<Float>,
    /// Throughput of the sub-path up to and including this vertex
    pub beta: Color,
    pub pdf_fwd: Float,
    pub pdf_rev: Float,
    /// Continuation was sampled from a delta lobe
    pub delta: bool,
}

impl<'a> PathVertex<'a> {
    pub fn camera(camera: &'a Camera, p: Point3<Float>, beta: Color) -> Self {
        Self {
            kind: VertexKind::Camera { camera },
            p,
            beta,
            pdf_fwd: 0.0,
            pdf_rev: 0.0,
            delta: false,
        }
    }

    pub fn light(
        light: &'a dyn Light,
        index: usize,
        p: Point3<Float>,
        n: Vector3<Float>,
        beta: Color,
        pdf_fwd: Float,
    ) -> Self {
        Self {
            kind: VertexKind::Light { light, index, n },
            p,
            beta,
            pdf_fwd,
            pdf_rev: 0.0,
            delta: false,
        }
    }

    /// Surface vertex reached from prev with solid angle density pdf
    pub fn surface(
        isect: Interaction<'a>,
        wo: Vector3<Float>,
        mode: TransportMode,
        beta: Color,
        pdf: Float,
        prev: &PathVertex<'a>,
    ) -> Self {
        let mut vertex = Self {
            p: isect.p,
            kind: VertexKind::Surface { isect, wo, mode },
            beta,
            pdf_fwd: 0.0,
            pdf_rev: 0.0,
            delta: false,
        };
        vertex.pdf_fwd = prev.convert_density(pdf, &vertex);
        vertex
    }

    pub fn interaction(&self) -> Option<&Interaction<'a>> {
        match &self.kind {
            VertexKind::Surface { isect, .. } => Some(isect),
            _ => None,
        }
    }

    /// Normal used for cosine terms of connections
    pub fn ns(&self) -> Vector3<Float> {
        match &self.kind {
            VertexKind::Camera { camera } => camera.forward(),
            VertexKind::Light { n, .. } => *n,
            VertexKind::Surface { isect, .. } => isect.ns,
        }
    }

    fn ng(&self) -> Vector3<Float> {
        match &self.kind {
            VertexKind::Surface { isect, .. } => isect.ng,
            _ => self.ns(),
        }
    }

    pub fn is_on_surface(&self) -> bool {
        match &self.kind {
            VertexKind::Camera { .. } => false,
            VertexKind::Light { light, .. } => light.is_on_surface(),
            VertexKind::Surface { .. } => true,
        }
    }

    /// Can the vertex be an endpoint of a deterministic connection
    pub fn is_connectible(&self) -> bool {
        match &self.kind {
            VertexKind::Camera { .. } | VertexKind::Light { .. } => true,
            VertexKind::Surface { isect, .. } => isect.is_connectible(),
        }
    }

    pub fn is_light(&self) -> bool {
        self.emitter().is_some()
    }

    pub fn is_delta_light(&self) -> bool {
        match &self.kind {
            VertexKind::Light { light, .. } => light.is_delta(),
            _ => false,
        }
    }

    fn emitter(&self) -> Option<(usize, &'a dyn Light, Vector3<Float>)> {
        match &self.kind {
            VertexKind::Light { light, index, n } => Some((*index, *light, *n)),
            VertexKind::Surface { isect, .. } => isect.emitter.map(|e| (e.index, e.light, isect.ng)),
            VertexKind::Camera { .. } => None,
        }
    }

    /// Convert a solid angle density at this vertex into an area density at next
    pub fn convert_density(&self, pdf: Float, next: &PathVertex<'_>) -> Float {
        let w = next.p - self.p;
        let dist2 = w.magnitude2();
        if dist2 == 0.0 {
            return 0.0;
        }
        let mut pdf = pdf / dist2;
        if next.is_on_surface() {
            pdf *= next.ng().dot(w / dist2.sqrt()).abs();
        }
        pdf
    }

    /// Scattering toward next, including the shading normal correction
    pub fn f(&self, next: &PathVertex<'_>, mode: TransportMode) -> Color {
        match &self.kind {
            VertexKind::Surface { isect, wo, .. } => {
                let wi = (next.p - self.p).normalize();
                isect.eval_bsdf(*wo, wi, mode) * isect.shading_correction(*wo, wi, mode)
            }
            _ => Color::black(),
        }
    }

    /// Area density at next of continuing from this vertex toward next,
    /// when this vertex was reached from prev
    pub fn pdf(&self, prev: Option<&PathVertex<'_>>, next: &PathVertex<'_>) -> Float {
        if let VertexKind::Light { .. } = self.kind {
            return self.pdf_light(next);
        }
        let wn = next.p - self.p;
        if wn.magnitude2() == 0.0 {
            return 0.0;
        }
        let wn = wn.normalize();
        let pdf = match &self.kind {
            VertexKind::Camera { camera } => camera.pdf_we(self.p, wn).1,
            VertexKind::Surface { isect, mode, .. } => match prev {
                Some(prev) => {
                    let wp = prev.p - self.p;
                    if wp.magnitude2() == 0.0 {
                        return 0.0;
                    }
                    isect.pdf_bsdf(wp.normalize(), wn, *mode)
                }
                None => return 0.0,
            },
            VertexKind::Light { .. } => 0.0,
        };
        self.convert_density(pdf, next)
    }

    /// Area density at next of emitting toward it from this light point
    pub fn pdf_light(&self, next: &PathVertex<'_>) -> Float {
        let (_, light, n) = match self.emitter() {
            Some(emitter) => emitter,
            None => return 0.0,
        };
        let w = next.p - self.p;
        let dist2 = w.magnitude2();
        if dist2 == 0.0 {
            return 0.0;
        }
        let w = w / dist2.sqrt();
        let mut pdf = light.pdf_emit_direction(n, w) / dist2;
        if next.is_on_surface() {
            pdf *= next.ng().dot(w).abs();
        }
        pdf
    }

    /// Area density of a light path starting from this point
    pub fn pdf_light_origin(&self, scene: &Scene) -> Float {
        match self.emitter() {
            Some((index, light, _)) => scene.light_pmf(index) * light.pdf_position(),
            None => 0.0,
        }
    }

    /// Radiance emitted toward v
    pub fn le(&self, v: &PathVertex<'_>) -> Color {
        match &self.kind {
            VertexKind::Surface { isect, .. } => {
                let w = v.p - self.p;
                if w.magnitude2() == 0.0 {
                    return Color::black();
                }
                isect.le(w.normalize())
            }
            _ => Color::black(),
        }
    }

    pub fn shadow_ray_to(&self, p: Point3<Float>) -> Ray {
        match &self.kind {
            VertexKind::Surface { isect, .. } => isect.shadow_ray_to(p),
            _ => Ray::shadow(self.p, p),
        }
    }
}

/// Geometric coupling of two vertices with a visibility test
pub fn g(scene: &Scene, v0: &PathVertex<'_>, v1: &PathVertex<'_>) -> Float {
    let d = v1.p - v0.p;
    let dist2 = d.magnitude2();
    if dist2 == 0.0 {
        return 0.0;
    }
    let dir = d / dist2.sqrt();
    let mut g = 1.0 / dist2;
    if v0.is_on_surface() {
        g *= v0.ns().dot(dir).abs();
    }
    if v1.is_on_surface() {
        g *= v1.ns().dot(dir).abs();
    }
    if g == 0.0 || scene.is_occluded(&v0.shadow_ray_to(v1.p)) {
        return 0.0;
    }
    g
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bsdf::Bsdf;
    use crate::sample;
    use approx::assert_relative_eq;

    #[test]
    fn density_conversion_round_trips() {
        let bsdf = Bsdf::lambertian(Color::gray(0.5));
        let n = Vector3::new(0.0, 0.6, 0.8);
        let isect = Interaction::new(Point3::new(1.0, 2.0, 3.0), 1.0, n, n, Some(&bsdf), None);
        let camera = Camera::look_at(
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 2.0, 3.0),
            Vector3::unit_y(),
            cgmath::Rad(1.0),
            8,
            8,
        );
        let origin = PathVertex::camera(&camera, Point3::new(0.0, 0.0, 0.0), Color::white());
        let wo = (origin.p - isect.p).normalize();
        let pdf_sa = 0.37;
        let surface = PathVertex::surface(
            isect,
            wo,
            TransportMode::Radiance,
            Color::white(),
            pdf_sa,
            &origin,
        );
        let d = surface.p - origin.p;
        let back = sample::to_solid_angle_pdf(
            surface.pdf_fwd,
            d.magnitude2(),
            n.dot(d.normalize()),
        );
        assert_relative_eq!(back, pdf_sa, epsilon = 1e-9);
        assert!(surface.is_connectible());
        assert!(!surface.is_light());
    }
}
