use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::ops::{Index, IndexMut};

/// 3×3 double matrix.
///
/// Used both as a homogeneous 2D transform (bottom row `[0, 0, 1]`) and as a
/// symmetric scatter matrix.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Matrix3(pub [[f64; 3]; 3]);

impl Default for Matrix3 {
    fn default() -> Self {
        Self::identity()
    }
}

impl Matrix3 {
    pub const fn identity() -> Self {
        Self([[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]])
    }

    pub const fn zeros() -> Self {
        Self([[0.0; 3]; 3])
    }

    pub fn translation(dx: f64, dy: f64) -> Self {
        Self([[1.0, 0.0, dx], [0.0, 1.0, dy], [0.0, 0.0, 1.0]])
    }

    /// Homogeneous 2D transform from the top two rows.
    pub fn from_rows(row0: [f64; 3], row1: [f64; 3]) -> Self {
        Self([row0, row1, [0.0, 0.0, 1.0]])
    }

    /// Matrix product `self · rhs`, i.e. `rhs` applied first, then `self`.
    pub fn compose(&self, rhs: &Matrix3) -> Matrix3 {
        let mut out = Matrix3::zeros();
        for i in 0..3 {
            for j in 0..3 {
                for k in 0..3 {
                    out.0[i][j] += self.0[i][k] * rhs.0[k][j];
                }
            }
        }
        out
    }

    /// Maps a 2D point through the homogeneous transform.
    pub fn apply(&self, point: [f64; 2]) -> [f64; 2] {
        let m = &self.0;
        [
            m[0][0] * point[0] + m[0][1] * point[1] + m[0][2],
            m[1][0] * point[0] + m[1][1] * point[1] + m[1][2],
        ]
    }

    pub fn trace(&self) -> f64 {
        self.0[0][0] + self.0[1][1] + self.0[2][2]
    }

    /// Sum of the three principal 2×2 minors.
    pub fn principal_minor_sum(&self) -> f64 {
        let m = &self.0;
        m[0][0] * m[1][1] - m[0][1] * m[1][0] + m[1][1] * m[2][2] - m[1][2] * m[2][1]
            + m[0][0] * m[2][2]
            - m[0][2] * m[2][0]
    }

    pub fn determinant(&self) -> f64 {
        let m = &self.0;
        m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
            - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
            + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0])
    }

    pub fn mul_vec(&self, v: [f64; 3]) -> [f64; 3] {
        let m = &self.0;
        [
            m[0][0] * v[0] + m[0][1] * v[1] + m[0][2] * v[2],
            m[1][0] * v[0] + m[1][1] * v[1] + m[1][2] * v[2],
            m[2][0] * v[0] + m[2][1] * v[1] + m[2][2] * v[2],
        ]
    }

    /// Largest absolute element-wise difference to `other`.
    pub fn max_abs_diff(&self, other: &Matrix3) -> f64 {
        let mut worst = 0.0f64;
        for i in 0..3 {
            for j in 0..3 {
                worst = worst.max((self.0[i][j] - other.0[i][j]).abs());
            }
        }
        worst
    }

    pub fn to_array(&self) -> Array2<f64> {
        Array2::from_shape_fn((3, 3), |(i, j)| self.0[i][j])
    }

    /// Reads the top-left 3×3 block of `array`.
    pub fn from_array(array: &Array2<f64>) -> Self {
        let mut out = Matrix3::zeros();
        for i in 0..3 {
            for j in 0..3 {
                out.0[i][j] = array[[i, j]];
            }
        }
        out
    }
}

impl Index<(usize, usize)> for Matrix3 {
    type Output = f64;

    fn index(&self, (row, col): (usize, usize)) -> &f64 {
        &self.0[row][col]
    }
}

impl IndexMut<(usize, usize)> for Matrix3 {
    fn index_mut(&mut self, (row, col): (usize, usize)) -> &mut f64 {
        &mut self.0[row][col]
    }
}
