//! Open-loop validation of a candidate model.
//!
//! The candidate is simulated from rest over the full normalized series using
//! only measured inputs; its predictions never see measured outputs. The mean
//! squared error between measured and simulated output is the quality score
//! used by the selector.

use crate::domain::{ArxCoefficients, NormalizedSample};
use crate::error::IdentError;
use crate::models::simulate;

/// Fewest comparable points accepted for a valid MSE.
pub const MIN_RESIDUAL_POINTS: usize = 5;

/// Simulation fit of one candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct ResidualReport {
    pub mse: f64,
    /// `100 * (1 - |y - ŷ| / |y - ȳ|)`; `None` for a constant output.
    pub fit_percent: Option<f64>,
    /// Comparable points used.
    pub points: usize,
    pub simulated: Vec<f64>,
}

/// Simulate `coeffs` over `samples` and score the result.
pub fn analyze(
    samples: &[NormalizedSample],
    coeffs: &ArxCoefficients,
) -> Result<ResidualReport, IdentError> {
    let order = coeffs.order();
    if samples.len() < MIN_RESIDUAL_POINTS {
        return Err(IdentError::InsufficientResidualData {
            order,
            points: samples.len(),
            required: MIN_RESIDUAL_POINTS,
        });
    }

    let inputs: Vec<f64> = samples.iter().map(|s| s.u).collect();
    let simulated = simulate(&inputs, coeffs);

    let n = samples.len() as f64;
    let mut sse = 0.0;
    for (s, y_hat) in samples.iter().zip(&simulated) {
        sse += (s.y - y_hat).powi(2);
    }
    let mse = sse / n;

    let mean = samples.iter().map(|s| s.y).sum::<f64>() / n;
    let sst: f64 = samples.iter().map(|s| (s.y - mean).powi(2)).sum();
    let fit_percent = if sst > 0.0 && sse.is_finite() {
        Some(100.0 * (1.0 - (sse / sst).sqrt()))
    } else {
        None
    };

    Ok(ResidualReport {
        mse,
        fit_percent,
        points: samples.len(),
        simulated,
    })
}
