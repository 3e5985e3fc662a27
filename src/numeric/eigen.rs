//! Closed-form eigenvalues of a symmetric 3×3 matrix and eigenvector
//! extraction that survives degenerate eigenspaces.

use std::f64::consts::PI;

use ndarray::{Array1, Array2};

use super::{qr_least_squares, Matrix3, TINY};
use crate::error::NumericFallback;

/// ITU-R BT.709 derived direction returned when the eigenvector reduction
/// cannot be trusted.
pub const FALLBACK_EIGENVECTOR: [f64; 3] = [0.212671, 0.71516, 0.072169];

/// The three real eigenvalues of a symmetric 3×3 matrix, ascending.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Eigenvalues(pub [f64; 3]);

impl Eigenvalues {
    pub fn sum_of_squares(&self) -> f64 {
        self.0.iter().map(|l| l * l).sum()
    }

    /// The eigenvalue of greatest magnitude.
    ///
    /// Equal magnitudes resolve to the algebraically larger value, so `-λ`
    /// loses against `λ`.
    pub fn largest_absolute(&self) -> f64 {
        let mut best = self.0[0];
        for &candidate in &self.0[1..] {
            if best.abs() < candidate.abs() {
                best = candidate;
            }
            if best.abs() == candidate.abs() && best < candidate {
                best = candidate;
            }
        }
        best
    }
}

/// Unit eigenvector, plus the fallback that produced it if reduction failed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Eigenvector {
    pub components: [f64; 3],
    pub fallback: Option<NumericFallback>,
}

impl Eigenvector {
    fn fallback() -> Self {
        tracing::warn!("eigenvector reduction lost precision, using BT.709 fallback direction");
        Self {
            components: FALLBACK_EIGENVECTOR,
            fallback: Some(NumericFallback::InsufficientPrecision),
        }
    }
}

/// Solves the characteristic cubic `det(M - λI) = 0` analytically.
///
/// The cubic is built from the trace, the sum of the principal 2×2 minors and
/// the determinant. A negative discriminant takes the trigonometric
/// three-real-roots path; a zero discriminant yields a double root; a positive
/// one only arises from rounding on a symmetric input, in which case the real
/// parts of the complex pair are used and a warning is logged.
pub fn solve_eigenvalues(m: &Matrix3) -> Eigenvalues {
    // a3 λ³ + a2 λ² + a1 λ + a0 = 0 with a3 = -1
    let a0 = m.determinant();
    let a1 = -m.principal_minor_sum();
    let a2 = m.trace();
    let a3 = -1.0;

    let mut q = (3.0 * a1 - a2 * a2 / a3) / (9.0 * a3);
    let mut r = (a1 * a2 - 3.0 * a0 * a3 - (2.0 / 9.0) * a2 * a2 * a2 / a3) / (6.0 * a3 * a3);
    let discriminant = q * q * q + r * r;
    let mut roots = [0.0f64; 3];

    if discriminant < 0.0 {
        let radius = 2.0 * (-q).sqrt();
        let cosine = (r / (-q * q * q).sqrt()).clamp(-1.0, 1.0);
        let theta = cosine.acos() / 3.0;
        let shift = a2 / (3.0 * a3);
        roots[0] = radius * theta.cos() - shift;
        roots[1] = radius * (theta + (2.0 / 3.0) * PI).cos() - shift;
        roots[2] = radius * (theta + (4.0 / 3.0) * PI).cos() - shift;
        sort_three(&mut roots);
    } else if discriminant == 0.0 {
        let p = 2.0 * r.cbrt();
        q = a2 / (3.0 * a3);
        if p < 0.0 {
            roots[0] = p - q;
            roots[1] = -0.5 * p - q;
            roots[2] = roots[1];
        } else {
            roots[0] = -0.5 * p - q;
            roots[1] = roots[0];
            roots[2] = p - q;
        }
    } else {
        tracing::warn!(
            discriminant,
            "complex eigenvalue found; ignoring imaginary part"
        );
        let root = discriminant.sqrt();
        let s = (r + root).cbrt();
        r = s + (r - root).cbrt();
        q = -a2 / (3.0 * a3);
        let real = q + r;
        let pair = q - r / 2.0;
        roots = [pair; 3];
        if real < pair {
            roots[0] = real;
        } else {
            roots[2] = real;
        }
    }

    Eigenvalues(roots)
}

/// Ascending order through explicit pairwise swaps.
fn sort_three(roots: &mut [f64; 3]) {
    if roots[0] < roots[1] {
        if roots[2] < roots[1] {
            roots.swap(1, 2);
            if roots[1] < roots[0] {
                roots.swap(0, 1);
            }
        }
    } else {
        roots.swap(0, 1);
        if roots[2] < roots[1] {
            roots.swap(1, 2);
            if roots[1] < roots[0] {
                roots.swap(0, 1);
            }
        }
    }
}

/// Unit eigenvector of `m` for `eigenvalue`.
///
/// `M - λI` is row-normalised and reduced by Gaussian elimination with partial
/// pivoting. Coordinates whose pivot vanishes are free and get a provisional
/// value of 1; rows that decouple entirely pin their coordinate to 0. The
/// remaining coordinates come from a least-squares solve of the reduced
/// system. The result has unit norm and its largest-magnitude component is
/// positive. If a pivot that should be 1 is not, the BT.709 fallback
/// direction is returned instead.
pub fn eigenvector(m: &Matrix3, eigenvalue: f64) -> Eigenvector {
    const N: usize = 3;
    let mut matrix = m.0;
    for (i, row) in matrix.iter_mut().enumerate() {
        row[i] -= eigenvalue;
    }

    for row in matrix.iter_mut() {
        let norm = row.iter().map(|v| v * v).sum::<f64>().sqrt();
        if TINY < norm {
            for v in row.iter_mut() {
                *v /= norm;
            }
        }
    }

    for j in 0..N {
        let mut max = matrix[j][j];
        let mut abs_max = max.abs();
        let mut k = j;
        for (i, row) in matrix.iter().enumerate().skip(j + 1) {
            if abs_max < row[j].abs() {
                max = row[j];
                abs_max = max.abs();
                k = i;
            }
        }
        if k != j {
            for c in j..N {
                let tmp = matrix[j][c];
                matrix[j][c] = matrix[k][c];
                matrix[k][c] = tmp;
            }
        }
        if TINY < abs_max {
            for c in 0..N {
                matrix[j][c] /= max;
            }
        }
        for i in (j + 1)..N {
            let factor = matrix[i][j];
            for c in 0..N {
                matrix[i][c] -= factor * matrix[j][c];
            }
        }
    }

    let mut vector = [0.0f64; N];
    let mut ignore = [false; N];
    let mut valid = N;
    for i in 0..N {
        if matrix[i][i].abs() < TINY {
            ignore[i] = true;
            valid -= 1;
            vector[i] = 1.0;
            continue;
        }
        if TINY < (matrix[i][i] - 1.0).abs() {
            return Eigenvector::fallback();
        }
        let off_diagonal: f64 = (0..N)
            .filter(|&j| j != i)
            .map(|j| matrix[i][j] * matrix[i][j])
            .sum();
        if off_diagonal.sqrt() < TINY {
            ignore[i] = true;
            valid -= 1;
            vector[i] = 0.0;
        }
    }

    if valid > 0 {
        let kept: Vec<usize> = (0..N).filter(|&i| !ignore[i]).collect();
        let reduced = Array2::from_shape_fn((valid, valid), |(u, v)| matrix[kept[u]][kept[v]]);
        let rhs = Array1::from_shape_fn(valid, |u| {
            (0..N)
                .filter(|&j| ignore[j])
                .map(|j| -matrix[kept[u]][j] * vector[j])
                .sum::<f64>()
        });
        let solution = qr_least_squares(&reduced, &rhs);
        for (u, &i) in kept.iter().enumerate() {
            vector[i] = solution[u];
        }
    }

    let mut norm = vector.iter().map(|v| v * v).sum::<f64>().sqrt();
    if norm < TINY {
        return Eigenvector::fallback();
    }

    let mut largest = 0;
    for i in 1..N {
        if vector[largest].abs() < vector[i].abs() {
            largest = i;
        }
    }
    if vector[largest] < 0.0 {
        norm = -norm;
    }
    for v in vector.iter_mut() {
        *v /= norm;
    }

    Eigenvector {
        components: vector,
        fallback: None,
    }
}
