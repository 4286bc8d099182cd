//! Batch least-squares estimation of a single ARX order.
//!
//! For order `n` over a window of `N` samples:
//!
//! - `Φ` has `N - n` rows (`k = n..N-1`) and `2n + 1` columns
//! - `Y[k] = y(k)`
//! - `θ` solves `ΦᵗΦ θ = ΦᵗY` (see [`crate::math::solve_gaussian`])

use nalgebra::{DMatrix, DVector};

use crate::domain::{ArxCoefficients, NormalizedSample, ResidualStats};
use crate::error::IdentError;
use crate::math::{SolveError, normal_equations, solve_gaussian};
use crate::models::{fill_regressor, one_step_errors};

/// A regression problem for one order.
#[derive(Debug, Clone, PartialEq)]
pub struct Regression {
    pub order: usize,
    pub phi: DMatrix<f64>,
    pub y: DVector<f64>,
}

/// Build `Φ` and `Y` for `order` over `samples`.
///
/// When `samples.len() <= order` the matrices have zero rows; the solve then
/// reports the order as singular.
pub fn build_regression(samples: &[NormalizedSample], order: usize) -> Regression {
    let cols = 2 * order + 1;
    let rows = samples.len().saturating_sub(order);

    let mut phi = DMatrix::<f64>::zeros(rows, cols);
    let mut y = DVector::<f64>::zeros(rows);
    let mut row = vec![0.0; cols];

    for (r, k) in (order..samples.len()).enumerate() {
        fill_regressor(samples, k, order, &mut row);
        for (c, v) in row.iter().enumerate() {
            phi[(r, c)] = *v;
        }
        y[r] = samples[k].y;
    }

    Regression { order, phi, y }
}

/// Estimate ARX coefficients of `order` by batch least squares.
pub fn estimate(samples: &[NormalizedSample], order: usize) -> Result<ArxCoefficients, IdentError> {
    let reg = build_regression(samples, order);
    let (ata, aty) = normal_equations(&reg.phi, &reg.y);

    let theta = solve_gaussian(&ata, &aty).map_err(|e| match e {
        SolveError::Singular { column } => IdentError::SingularSystem { order, column },
        SolveError::DimensionMismatch => IdentError::SingularSystem { order, column: 0 },
    })?;

    ArxCoefficients::from_theta(theta.as_slice(), order)
        .ok_or(IdentError::SingularSystem { order, column: 0 })
}

/// Variance and lag-1 autocorrelation of the one-step prediction errors.
///
/// The autocorrelation is the plain mean of `e(k) e(k-1)`, not normalized by
/// the variance. Both values are zero when there are no errors to inspect.
pub fn one_step_stats(samples: &[NormalizedSample], coeffs: &ArxCoefficients) -> ResidualStats {
    let errors = one_step_errors(samples, coeffs);
    if errors.is_empty() {
        return ResidualStats {
            variance: 0.0,
            autocorr: 0.0,
        };
    }

    let n = errors.len() as f64;
    let mean = errors.iter().sum::<f64>() / n;
    let variance = errors.iter().map(|e| (e - mean).powi(2)).sum::<f64>() / n;

    let autocorr = if errors.len() > 1 {
        let s: f64 = errors.windows(2).map(|w| w[0] * w[1]).sum();
        s / (errors.len() - 1) as f64
    } else {
        0.0
    };

    ResidualStats { variance, autocorr }
}
