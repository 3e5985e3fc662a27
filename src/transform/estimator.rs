//! Closed-form fits of each transform family to anchor correspondences.

use super::{AnchorSet, TransformFamily};
use crate::error::RegistrationError;
use crate::numeric::{invert3, Matrix3};
use crate::Result;

impl TransformFamily {
    /// Homogeneous transform mapping `from` onto `to`.
    ///
    /// Only the first [`anchor_count`](Self::anchor_count) points of each set
    /// are used; fewer is an error.
    pub fn estimate(self, from: &AnchorSet, to: &AnchorSet) -> Result<Matrix3> {
        let required = self.anchor_count();
        let provided = from.len().min(to.len());
        if provided < required {
            return Err(RegistrationError::InsufficientAnchors {
                family: self,
                required,
                provided,
            });
        }
        let (f, t) = (from.points(), to.points());

        let matrix = match self {
            TransformFamily::Translation => {
                Matrix3::translation(t[0][0] - f[0][0], t[0][1] - f[0][1])
            }
            TransformFamily::RigidBody => rigid_body(f, t),
            TransformFamily::ScaledRotation => scaled_rotation(f, t),
            TransformFamily::Affine => affine(f, t),
        };
        Ok(matrix)
    }
}

/// Convenience wrapper around [`TransformFamily::estimate`].
pub fn estimate(family: TransformFamily, from: &AnchorSet, to: &AnchorSet) -> Result<Matrix3> {
    family.estimate(from, to)
}

/// Rotation from the direction of the second-to-third anchor in both frames;
/// the translation pins the first anchor exactly.
fn rigid_body(f: &[[f64; 2]], t: &[[f64; 2]]) -> Matrix3 {
    let angle = (f[2][0] - f[1][0]).atan2(f[2][1] - f[1][1])
        - (t[2][0] - t[1][0]).atan2(t[2][1] - t[1][1]);
    let (s, c) = angle.sin_cos();
    Matrix3::from_rows(
        [c, -s, t[0][0] - c * f[0][0] + s * f[0][1]],
        [s, c, t[0][1] - s * f[0][0] - c * f[0][1]],
    )
}

/// Similarity `(x, y) → (ax − by + e, bx + ay + f)` from two correspondences.
///
/// A third point, the second anchor offset by the first-to-second vector
/// turned a quarter turn, is added in both frames so the system is square.
fn scaled_rotation(f: &[[f64; 2]], t: &[[f64; 2]]) -> Matrix3 {
    let system = Matrix3([
        [f[0][0], f[0][1], 1.0],
        [f[1][0], f[1][1], 1.0],
        [f[0][1] - f[1][1] + f[1][0], f[1][0] + f[1][1] - f[0][0], 1.0],
    ]);
    let inverse = invert3(&system);
    let row0 = inverse.mul_vec([t[0][0], t[1][0], t[0][1] - t[1][1] + t[1][0]]);
    let row1 = inverse.mul_vec([t[0][1], t[1][1], t[1][0] + t[1][1] - t[0][0]]);
    Matrix3::from_rows(row0, row1)
}

/// One 3×3 solve per output coordinate over the homogeneous source anchors.
fn affine(f: &[[f64; 2]], t: &[[f64; 2]]) -> Matrix3 {
    let system = Matrix3([
        [f[0][0], f[0][1], 1.0],
        [f[1][0], f[1][1], 1.0],
        [f[2][0], f[2][1], 1.0],
    ]);
    let inverse = invert3(&system);
    let row0 = inverse.mul_vec([t[0][0], t[1][0], t[2][0]]);
    let row1 = inverse.mul_vec([t[0][1], t[1][1], t[2][1]]);
    Matrix3::from_rows(row0, row1)
}
