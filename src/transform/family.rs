use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::AnchorSet;
use crate::error::RegistrationError;

/// Parametric class of 2D homogeneous transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformFamily {
    Translation,
    RigidBody,
    ScaledRotation,
    Affine,
}

impl TransformFamily {
    pub const ALL: [TransformFamily; 4] = [
        TransformFamily::Translation,
        TransformFamily::RigidBody,
        TransformFamily::ScaledRotation,
        TransformFamily::Affine,
    ];

    /// Number of anchor correspondences the family is estimated from.
    pub fn anchor_count(self) -> usize {
        match self {
            TransformFamily::Translation => 1,
            TransformFamily::RigidBody => 3,
            TransformFamily::ScaledRotation => 2,
            TransformFamily::Affine => 3,
        }
    }

    /// Tag used in the transform log.
    pub fn log_tag(self) -> &'static str {
        match self {
            TransformFamily::Translation => "TRANSLATION",
            TransformFamily::RigidBody => "RIGID_BODY",
            TransformFamily::ScaledRotation => "SCALED_ROTATION",
            TransformFamily::Affine => "AFFINE",
        }
    }

    /// Family by its position in the transformation choice list.
    pub fn from_index(index: usize) -> Result<Self, RegistrationError> {
        Self::ALL
            .get(index)
            .copied()
            .ok_or_else(|| RegistrationError::InvalidTransformFamily(index.to_string()))
    }

    /// Canonical anchors for a `width`×`height` slice.
    ///
    /// Centre and quarter points, computed with integer division.
    pub fn canonical_anchors(self, width: u32, height: u32) -> AnchorSet {
        let (w, h) = (width, height);
        let p = |x: u32, y: u32| [x as f64, y as f64];
        let points = match self {
            TransformFamily::Translation => vec![p(w / 2, h / 2)],
            TransformFamily::RigidBody => {
                vec![p(w / 2, h / 2), p(w / 2, h / 4), p(w / 2, (3 * h) / 4)]
            }
            TransformFamily::ScaledRotation => vec![p(w / 4, h / 2), p((3 * w) / 4, h / 2)],
            TransformFamily::Affine => vec![
                p(w / 2, h / 4),
                p(w / 4, (3 * h) / 4),
                p((3 * w) / 4, (3 * h) / 4),
            ],
        };
        AnchorSet::new(points)
    }
}

impl fmt::Display for TransformFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.log_tag())
    }
}

impl FromStr for TransformFamily {
    type Err = RegistrationError;

    /// Accepts log tags (`RIGID_BODY`), config names (`rigid_body`),
    /// CLI names (`rigid-body`), display names (`Rigid Body`) and choice
    /// indices (`0` to `3`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(index) = s.trim().parse::<usize>() {
            return Self::from_index(index);
        }
        let normalized: String = s
            .trim()
            .chars()
            .map(|c| match c {
                '-' | ' ' => '_',
                other => other.to_ascii_lowercase(),
            })
            .collect();
        match normalized.as_str() {
            "translation" => Ok(TransformFamily::Translation),
            "rigid_body" | "rigidbody" => Ok(TransformFamily::RigidBody),
            "scaled_rotation" | "scaledrotation" => Ok(TransformFamily::ScaledRotation),
            "affine" => Ok(TransformFamily::Affine),
            _ => Err(RegistrationError::InvalidTransformFamily(s.to_string())),
        }
    }
}
