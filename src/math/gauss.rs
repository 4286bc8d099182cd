//! Normal-equation least squares with Gaussian elimination.
//!
//! Every batch estimate in this crate solves a small square system
//!
//! ```text
//! (Φᵗ Φ) θ = Φᵗ Y
//! ```
//!
//! with at most `2 * MAX_ORDER + 1 = 7` unknowns, so a dense elimination with
//! partial pivoting is both fast and easy to audit.
//!
//! Singularity is detected per column: a pivot whose magnitude is below
//! `PIVOT_REL_TOL` times the largest entry of the matrix counts as zero. Exact
//! zero tests are useless here because collinear regressors (e.g. a constant
//! input) leave round-off-sized pivots rather than exact zeros.

use nalgebra::{DMatrix, DVector};

/// Relative pivot threshold (scaled by the largest magnitude in the matrix).
const PIVOT_REL_TOL: f64 = 1e-12;

/// Why a linear solve failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveError {
    /// `a` is not square or `b` has the wrong length.
    DimensionMismatch,
    /// No usable pivot exists for this column.
    Singular { column: usize },
}

/// Build `(Φᵗ Φ, Φᵗ Y)` for a regression matrix and target vector.
pub fn normal_equations(phi: &DMatrix<f64>, y: &DVector<f64>) -> (DMatrix<f64>, DVector<f64>) {
    (phi.tr_mul(phi), phi.tr_mul(y))
}

/// Solve `a x = b` by Gaussian elimination with partial pivoting.
///
/// Before eliminating column `c`, the row (at or below `c`) holding the
/// largest-magnitude entry of that column is swapped into the pivot position.
pub fn solve_gaussian(a: &DMatrix<f64>, b: &DVector<f64>) -> Result<DVector<f64>, SolveError> {
    let n = a.nrows();
    if a.ncols() != n || b.len() != n {
        return Err(SolveError::DimensionMismatch);
    }
    if n == 0 {
        return Ok(DVector::zeros(0));
    }

    let scale = a.amax();
    if !(scale.is_finite() && scale > 0.0) {
        return Err(SolveError::Singular { column: 0 });
    }
    let tol = PIVOT_REL_TOL * scale;

    let mut m = a.clone();
    let mut rhs = b.clone();

    // Forward elimination.
    for col in 0..n {
        let mut max_row = col;
        let mut max_val = m[(col, col)].abs();
        for row in (col + 1)..n {
            let v = m[(row, col)].abs();
            if v > max_val {
                max_val = v;
                max_row = row;
            }
        }
        if !(max_val > tol) {
            return Err(SolveError::Singular { column: col });
        }
        if max_row != col {
            m.swap_rows(col, max_row);
            rhs.swap_rows(col, max_row);
        }

        let pivot = m[(col, col)];
        for row in (col + 1)..n {
            let factor = m[(row, col)] / pivot;
            if factor == 0.0 {
                continue;
            }
            for k in col..n {
                m[(row, k)] -= factor * m[(col, k)];
            }
            rhs[row] -= factor * rhs[col];
        }
    }

    // Back substitution.
    let mut x = DVector::<f64>::zeros(n);
    for i in (0..n).rev() {
        let mut sum = rhs[i];
        for j in (i + 1)..n {
            sum -= m[(i, j)] * x[j];
        }
        x[i] = sum / m[(i, i)];
    }

    if let Some(column) = x.iter().position(|v| !v.is_finite()) {
        return Err(SolveError::Singular { column });
    }
    Ok(x)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn solves_system_that_needs_a_row_swap() {
        // Zero in the (0,0) position forces a pivot swap.
        let a = DMatrix::from_row_slice(3, 3, &[0.0, 2.0, 1.0, 1.0, 1.0, 0.0, 2.0, 0.0, 3.0]);
        let x_true = DVector::from_row_slice(&[1.0, -2.0, 0.5]);
        let b = &a * &x_true;

        let x = solve_gaussian(&a, &b).unwrap();
        for i in 0..3 {
            assert!((x[i] - x_true[i]).abs() < 1e-12, "x[{i}]={}", x[i]);
        }
    }

    #[test]
    fn normal_equations_fit_a_line() {
        // y = 2 + 3x on x = [0,1,2]
        let phi = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0]);
        let y = DVector::from_row_slice(&[2.0, 5.0, 8.0]);
        let (ata, aty) = normal_equations(&phi, &y);
        let beta = solve_gaussian(&ata, &aty).unwrap();
        assert!((beta[0] - 2.0).abs() < 1e-10);
        assert!((beta[1] - 3.0).abs() < 1e-10);
    }

    #[test]
    fn duplicate_columns_are_singular() {
        let phi = DMatrix::from_row_slice(4, 2, &[1.0, 1.0, 2.0, 2.0, 3.0, 3.0, 4.0, 4.0]);
        let y = DVector::from_row_slice(&[1.0, 2.0, 3.0, 4.0]);
        let (ata, aty) = normal_equations(&phi, &y);
        assert_eq!(solve_gaussian(&ata, &aty), Err(SolveError::Singular { column: 1 }));
    }

    #[test]
    fn all_zero_matrix_is_singular_at_first_column() {
        let a = DMatrix::<f64>::zeros(3, 3);
        let b = DVector::<f64>::zeros(3);
        assert_eq!(solve_gaussian(&a, &b), Err(SolveError::Singular { column: 0 }));
    }

    #[test]
    fn non_square_is_rejected() {
        let a = DMatrix::<f64>::zeros(2, 3);
        let b = DVector::<f64>::zeros(2);
        assert_eq!(solve_gaussian(&a, &b), Err(SolveError::DimensionMismatch));
    }
}
