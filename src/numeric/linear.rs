//! Gauss-Jordan inversion and Gram-Schmidt least squares for small dense systems.

use ndarray::{Array1, Array2};

use super::Matrix3;

/// Inverts a square matrix by Gauss-Jordan elimination.
///
/// Each row is first scaled by its largest-magnitude entry, then every column
/// is pivoted on its largest-magnitude candidate with an explicit row swap.
/// A singular input yields a non-finite or meaningless result; no error is
/// raised, callers must check conditioning themselves.
pub fn invert(matrix: &Array2<f64>) -> Array2<f64> {
    let n = matrix.nrows();
    debug_assert_eq!(n, matrix.ncols(), "invert expects a square matrix");

    let mut m = matrix.clone();
    let mut inverse = Array2::<f64>::zeros((n, n));

    for i in 0..n {
        let mut max = m[[i, 0]];
        let mut abs_max = max.abs();
        for j in 0..n {
            if abs_max < m[[i, j]].abs() {
                max = m[[i, j]];
                abs_max = max.abs();
            }
        }
        inverse[[i, i]] = 1.0 / max;
        for j in 0..n {
            m[[i, j]] /= max;
        }
    }

    for j in 0..n {
        let mut max = m[[j, j]];
        let mut abs_max = max.abs();
        let mut k = j;
        for i in (j + 1)..n {
            if abs_max < m[[i, j]].abs() {
                max = m[[i, j]];
                abs_max = max.abs();
                k = i;
            }
        }
        if k != j {
            for c in j..n {
                m.swap([j, c], [k, c]);
            }
            for c in 0..n {
                inverse.swap([j, c], [k, c]);
            }
        }
        for c in 0..=j {
            inverse[[j, c]] /= max;
        }
        for c in (j + 1)..n {
            m[[j, c]] /= max;
            inverse[[j, c]] /= max;
        }
        for i in (j + 1)..n {
            let factor = m[[i, j]];
            for c in 0..=j {
                inverse[[i, c]] -= factor * inverse[[j, c]];
            }
            for c in (j + 1)..n {
                m[[i, c]] -= factor * m[[j, c]];
                inverse[[i, c]] -= factor * inverse[[j, c]];
            }
        }
    }

    for j in (1..n).rev() {
        for i in (0..j).rev() {
            let factor = m[[i, j]];
            for c in 0..=j {
                inverse[[i, c]] -= factor * inverse[[j, c]];
            }
            for c in (j + 1)..n {
                m[[i, c]] -= factor * m[[j, c]];
                inverse[[i, c]] -= factor * inverse[[j, c]];
            }
        }
    }

    inverse
}

/// [`invert`] specialised to [`Matrix3`].
pub fn invert3(matrix: &Matrix3) -> Matrix3 {
    Matrix3::from_array(&invert(&matrix.to_array()))
}

/// Classical (not modified) Gram-Schmidt QR factorisation of an m×n matrix.
///
/// Returns `(Q, R)` with `Q` m×n and `R` n×n upper triangular. A column whose
/// squared norm underflows to zero is left as a zero column of `Q`.
pub fn qr_decomposition(a: &Array2<f64>) -> (Array2<f64>, Array2<f64>) {
    let (lines, columns) = a.dim();
    let mut q = a.clone();
    let mut r = Array2::<f64>::zeros((columns, columns));

    for j in 0..columns {
        for k in 0..j {
            // projections use the original column, not the updated one
            let mut s = 0.0;
            for i in 0..lines {
                s += a[[i, j]] * q[[i, k]];
            }
            for i in 0..lines {
                q[[i, j]] -= s * q[[i, k]];
            }
        }
        let mut s = 0.0;
        for i in 0..lines {
            s += q[[i, j]] * q[[i, j]];
        }
        let scale = if s * s == 0.0 { 0.0 } else { 1.0 / s.sqrt() };
        for i in 0..lines {
            q[[i, j]] *= scale;
        }
    }

    for i in 0..columns {
        for j in i..columns {
            let mut s = 0.0;
            for k in 0..lines {
                s += q[[k, i]] * a[[k, j]];
            }
            r[[i, j]] = s;
        }
    }

    (q, r)
}

/// Least-squares solution of `A x = b` through `x = R⁻¹ Qᵀ b`.
///
/// A diagonal entry of `R` whose square is zero marks a free column; its
/// unknown is set to 0 instead of failing.
pub fn qr_least_squares(a: &Array2<f64>, b: &Array1<f64>) -> Array1<f64> {
    let (lines, columns) = a.dim();
    debug_assert_eq!(lines, b.len(), "right-hand side length must match rows");

    let (q, r) = qr_decomposition(a);
    let mut x = Array1::<f64>::zeros(columns);
    for i in 0..columns {
        let mut s = 0.0;
        for j in 0..lines {
            s += q[[j, i]] * b[j];
        }
        x[i] = s;
    }

    for i in (0..columns).rev() {
        let s = r[[i, i]];
        if s * s == 0.0 {
            x[i] = 0.0;
        } else {
            x[i] /= s;
        }
        for j in (0..i).rev() {
            x[j] -= r[[j, i]] * x[i];
        }
    }

    x
}
