use crate::float::*;

#[cfg(not(feature = "single_precision"))]
pub use self::double::*;
#[cfg(feature = "single_precision")]
pub use self::single::*;

#[cfg(not(feature = "single_precision"))]
mod double {
    use super::*;

    /// Offset used to move ray origins off surfaces
    pub const EPSILON: Float = 1e-7;
    pub const INFINITY: Float = std::f64::INFINITY;
    pub const MAX: Float = std::f64::MAX;
    pub const PI: Float = std::f64::consts::PI;
    pub const FRAC_1_PI: Float = std::f64::consts::FRAC_1_PI;
}

#[cfg(feature = "single_precision")]
mod single {
    use super::*;

    /// Offset used to move ray origins off surfaces
    pub const EPSILON: Float = 1e-4;
    pub const INFINITY: Float = std::f32::INFINITY;
    pub const MAX: Float = std::f32::MAX;
    pub const PI: Float = std::f32::consts::PI;
    pub const FRAC_1_PI: Float = std::f32::consts::FRAC_1_PI;
}

pub const TWO_PI: Float = 2.0 * PI;
pub const INV_2_PI: Float = 0.5 * FRAC_1_PI;
pub const INV_4_PI: Float = 0.25 * FRAC_1_PI;
