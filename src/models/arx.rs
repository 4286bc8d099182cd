//! ARX model evaluation.
//!
//! The estimators and validators rely on three primitive operations:
//! - build a regressor row for sample `k` (for least squares)
//! - predict `y(k)` one step ahead from *measured* history (for diagnostics)
//! - simulate the model open loop from *predicted* history (for validation)
//!
//! Regressor layout everywhere in the crate: `[y(k-1)..y(k-n), u(k)..u(k-n)]`,
//! matching the `[a_1..a_n, b_0..b_n]` parameter layout.

use crate::domain::{ArxCoefficients, NormalizedSample};

/// Fill the regressor row for sample `k`.
///
/// # Panics
/// Panics if `k < order`, `k >= samples.len()` or `out.len() != 2 * order + 1`.
/// Callers iterate `k` over `order..samples.len()` with a correctly sized row.
pub fn fill_regressor(samples: &[NormalizedSample], k: usize, order: usize, out: &mut [f64]) {
    for i in 1..=order {
        out[i - 1] = samples[k - i].y;
    }
    for i in 0..=order {
        out[order + i] = samples[k - i].u;
    }
}

/// One-step-ahead prediction of `y(k)` from measured outputs and inputs.
pub fn predict_one_step(samples: &[NormalizedSample], k: usize, coeffs: &ArxCoefficients) -> f64 {
    let ar: f64 = coeffs
        .a
        .iter()
        .enumerate()
        .map(|(i, a)| a * samples[k - i - 1].y)
        .sum();
    let x: f64 = coeffs
        .b
        .iter()
        .enumerate()
        .map(|(i, b)| b * samples[k - i].u)
        .sum();
    ar + x
}

/// One-step prediction errors `y(k) - ŷ(k)` for `k = n..N-1`.
pub fn one_step_errors(samples: &[NormalizedSample], coeffs: &ArxCoefficients) -> Vec<f64> {
    let order = coeffs.order();
    (order..samples.len())
        .map(|k| samples[k].y - predict_one_step(samples, k, coeffs))
        .collect()
}

/// Simulate the model open loop over an input sequence, starting from rest.
///
/// Past outputs are the model's own previous predictions; only the inputs
/// come from data. The returned vector has one prediction per input.
pub fn simulate(inputs: &[f64], coeffs: &ArxCoefficients) -> Vec<f64> {
    let mut y_hist = vec![0.0; coeffs.a.len()];
    let mut u_hist = vec![0.0; coeffs.b.len()];
    let mut out = Vec::with_capacity(inputs.len());

    for &u in inputs {
        push_front(&mut u_hist, u);

        let y_hat: f64 = coeffs.a.iter().zip(&y_hist).map(|(a, y)| a * y).sum::<f64>()
            + coeffs.b.iter().zip(&u_hist).map(|(b, u)| b * u).sum::<f64>();

        push_front(&mut y_hist, y_hat);
        out.push(y_hat);
    }

    out
}

/// Shift a history buffer by one and insert the newest value at index 0.
pub(crate) fn push_front(buf: &mut [f64], value: f64) {
    if buf.is_empty() {
        return;
    }
    buf.rotate_right(1);
    buf[0] = value;
}
