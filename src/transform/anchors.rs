use serde::{Deserialize, Serialize};

use crate::numeric::Matrix3;

/// Ordered anchor points in image-pixel coordinates.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AnchorSet {
    points: Vec<[f64; 2]>,
}

impl AnchorSet {
    pub fn new(points: Vec<[f64; 2]>) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[[f64; 2]] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Every anchor mapped through `transform`.
    pub fn warped(&self, transform: &Matrix3) -> AnchorSet {
        AnchorSet {
            points: self.points.iter().map(|&p| transform.apply(p)).collect(),
        }
    }

    /// Exactly `rows` points: extra points are dropped, missing ones are zero.
    pub fn padded(&self, rows: usize) -> Vec<[f64; 2]> {
        let mut out: Vec<[f64; 2]> = self.points.iter().take(rows).copied().collect();
        out.resize(rows, [0.0, 0.0]);
        out
    }
}

impl From<Vec<[f64; 2]>> for AnchorSet {
    fn from(points: Vec<[f64; 2]>) -> Self {
        Self::new(points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_warped_applies_transform_to_every_point() {
        let anchors = AnchorSet::new(vec![[1.0, 2.0], [3.0, 4.0]]);
        let moved = anchors.warped(&Matrix3::translation(10.0, -1.0));
        assert_eq!(moved.points(), &[[11.0, 1.0], [13.0, 3.0]]);
    }

    #[test]
    fn test_padded_fills_missing_rows_with_zero() {
        let anchors = AnchorSet::new(vec![[5.0, 6.0]]);
        assert_eq!(anchors.padded(3), vec![[5.0, 6.0], [0.0, 0.0], [0.0, 0.0]]);
    }
}
