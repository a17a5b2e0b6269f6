use std::collections::HashMap;

use cgmath::Point2;

use crate::color::Color;
use crate::float::*;

/// Recursive refinement of the pixel footprint on a grid x grid lattice.
/// Regions whose corner samples agree within tolerance are averaged,
/// the rest are split into quadrants until the finest lattice cell.
pub struct AdaptivePixel<'t> {
    pixel: Point2<u32>,
    grid: usize,
    tolerance: Float,
    trace: &'t mut dyn FnMut(Point2<Float>) -> Color,
    corners: HashMap<(usize, usize), Color>,
}

impl<'t> AdaptivePixel<'t> {
    pub fn new(
        pixel: Point2<u32>,
        grid: usize,
        tolerance: Float,
        trace: &'t mut dyn FnMut(Point2<Float>) -> Color,
    ) -> Self {
        Self {
            pixel,
            grid: grid.max(1),
            tolerance,
            trace,
            corners: HashMap::new(),
        }
    }

    /// Number of distinct lattice points traced so far
    pub fn samples(&self) -> usize {
        self.corners.len()
    }

    pub fn estimate(&mut self) -> Color {
        self.region(0, 0, self.grid)
    }

    fn corner(&mut self, i: usize, j: usize) -> Color {
        if let Some(c) = self.corners.get(&(i, j)) {
            return *c;
        }
        let grid = self.grid.to_float();
        let raster = Point2::new(
            self.pixel.x.to_float() + i.to_float() / grid,
            self.pixel.y.to_float() + j.to_float() / grid,
        );
        let c = (self.trace)(raster);
        self.corners.insert((i, j), c);
        c
    }

    fn region(&mut self, i: usize, j: usize, size: usize) -> Color {
        let corners = [
            self.corner(i, j),
            self.corner(i + size, j),
            self.corner(i, j + size),
            self.corner(i + size, j + size),
        ];
        let agree = corners
            .iter()
            .all(|a| corners.iter().all(|b| a.max_abs_diff(b) <= self.tolerance));
        if agree || size == 1 {
            return corners.iter().copied().sum::<Color>() / 4.0;
        }
        let half = size / 2;
        let quadrants = self.region(i, j, half)
            + self.region(i + half, j, half)
            + self.region(i, j + half, half)
            + self.region(i + half, j + half, half);
        quadrants / 4.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn uniform_pixel_takes_four_samples() {
        let mut trace = |_: Point2<Float>| Color::gray(0.7);
        let mut pixel = AdaptivePixel::new(Point2::new(3, 4), 8, 0.01, &mut trace);
        assert_relative_eq!(pixel.estimate().g(), 0.7);
        assert_eq!(pixel.samples(), 4);
    }

    #[test]
    fn edge_is_refined_to_finest_cells() {
        // Vertical edge at 0.3 of the pixel width
        let mut trace = |p: Point2<Float>| {
            if p.x - 3.0 < 0.3 {
                Color::white()
            } else {
                Color::black()
            }
        };
        let mut pixel = AdaptivePixel::new(Point2::new(3, 4), 8, 0.01, &mut trace);
        let c = pixel.estimate();
        // Cells left of 0.25 are lit, the straddling cell counts half
        assert_relative_eq!(c.r(), 0.25 + 0.5 / 8.0, epsilon = 1e-9);
        assert!(pixel.samples() > 4);
    }
}
