//! Small dense linear algebra used by color reduction and transform estimation.

pub mod eigen;
pub mod linear;
pub mod matrix;

pub use eigen::*;
pub use linear::*;
pub use matrix::*;

/// Tolerance used by every pivot, degeneracy and conditioning check.
///
/// Bit pattern `0x33FFFFFF` read as an `f32`, i.e. the largest single-precision
/// value below `f32::EPSILON`.
pub const TINY: f64 = 1.192_092_824_453_538_9e-7;
