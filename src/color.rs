use std::iter::Sum;
use std::ops::{Add, AddAssign, Div, DivAssign, Index, Mul, MulAssign, Sub};

use cgmath::prelude::*;
use cgmath::Vector3;

use crate::float::*;

/// Linear rgb color
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
    color: Vector3<Float>,
}

impl Color {
    pub fn new(r: Float, g: Float, b: Float) -> Self {
        Self {
            color: Vector3::new(r, g, b),
        }
    }

    pub fn gray(c: Float) -> Self {
        Self::new(c, c, c)
    }

    pub fn black() -> Self {
        Self::gray(0.0)
    }

    pub fn white() -> Self {
        Self::gray(1.0)
    }

    pub fn r(&self) -> Float {
        self.color.x
    }

    pub fn g(&self) -> Float {
        self.color.y
    }

    pub fn b(&self) -> Float {
        self.color.z
    }

    pub fn luma(&self) -> Float {
        let luma_vec = Vector3::new(0.2126, 0.7152, 0.0722);
        luma_vec.dot(self.color)
    }

    pub fn average(&self) -> Float {
        (self.color.x + self.color.y + self.color.z) / 3.0
    }

    pub fn max_component(&self) -> Float {
        self.color.x.max(self.color.y).max(self.color.z)
    }

    pub fn is_black(&self) -> bool {
        self.color.x == 0.0 && self.color.y == 0.0 && self.color.z == 0.0
    }

    /// False if any channel is NaN or infinite
    pub fn is_finite(&self) -> bool {
        self.color.x.is_finite() && self.color.y.is_finite() && self.color.z.is_finite()
    }

    pub fn map<F: Fn(Float) -> Float>(self, f: F) -> Self {
        Self::new(f(self.color.x), f(self.color.y), f(self.color.z))
    }

    pub fn exp(self) -> Self {
        self.map(Float::exp)
    }

    pub fn sqrt(self) -> Self {
        self.map(safe_sqrt)
    }

    pub fn max_abs_diff(&self, other: &Color) -> Float {
        let d = self.color - other.color;
        d.x.abs().max(d.y.abs()).max(d.z.abs())
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::black()
    }
}

impl Index<usize> for Color {
    type Output = Float;

    fn index(&self, i: usize) -> &Float {
        &self.color[i]
    }
}

impl From<[Float; 3]> for Color {
    fn from(arr: [Float; 3]) -> Self {
        Self::new(arr[0], arr[1], arr[2])
    }
}

impl From<Color> for [Float; 3] {
    fn from(c: Color) -> Self {
        [c.color.x, c.color.y, c.color.z]
    }
}

// Arithmetic operations

impl Add for Color {
    type Output = Self;

    fn add(mut self, rhs: Self) -> Self {
        self += rhs;
        self
    }
}

impl AddAssign for Color {
    fn add_assign(&mut self, rhs: Self) {
        self.color += rhs.color;
    }
}

impl Sub for Color {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self {
            color: self.color - rhs.color,
        }
    }
}

impl Sub<Color> for Float {
    type Output = Color;

    fn sub(self, rhs: Color) -> Color {
        Color::gray(self) - rhs
    }
}

impl Div<Float> for Color {
    type Output = Self;

    fn div(mut self, rhs: Float) -> Self {
        self /= rhs;
        self
    }
}

impl DivAssign<Float> for Color {
    fn div_assign(&mut self, rhs: Float) {
        let recip = rhs.recip();
        self.color *= recip;
    }
}

impl Div for Color {
    type Output = Self;

    /// Element-wise division where zero divisors give zero
    fn div(self, rhs: Self) -> Self {
        let div = |a: Float, b: Float| if b == 0.0 { 0.0 } else { a / b };
        Self::new(
            div(self.color.x, rhs.color.x),
            div(self.color.y, rhs.color.y),
            div(self.color.z, rhs.color.z),
        )
    }
}

impl Mul for Color {
    type Output = Self;

    fn mul(mut self, rhs: Self) -> Self {
        self *= rhs;
        self
    }
}

impl MulAssign for Color {
    fn mul_assign(&mut self, rhs: Self) {
        self.color.mul_assign_element_wise(rhs.color);
    }
}

impl Mul<Float> for Color {
    type Output = Self;

    fn mul(mut self, rhs: Float) -> Self {
        self *= rhs;
        self
    }
}

impl MulAssign<Float> for Color {
    fn mul_assign(&mut self, rhs: Float) {
        self.color *= rhs;
    }
}

impl Mul<Color> for Float {
    type Output = Color;

    fn mul(self, rhs: Color) -> Self::Output {
        rhs * self
    }
}

impl Sum for Color {
    fn sum<I: Iterator<Item = Color>>(iter: I) -> Self {
        iter.fold(Color::black(), |acc, c| acc + c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn luma_of_white_is_one() {
        approx::assert_relative_eq!(Color::white().luma(), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn division_by_zero_channel_is_zero() {
        let c = Color::new(1.0, 2.0, 3.0) / Color::new(2.0, 0.0, 1.0);
        assert_eq!(c, Color::new(0.5, 0.0, 3.0));
    }

    #[test]
    fn non_finite_is_detected() {
        assert!(Color::new(1.0, 0.0, 0.0).is_finite());
        assert!(!Color::new(Float::NAN, 0.0, 0.0).is_finite());
        assert!(!Color::new(0.0, Float::INFINITY, 0.0).is_finite());
    }
}
