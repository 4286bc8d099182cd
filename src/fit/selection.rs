//! Candidate evaluation and model selection.
//!
//! Each requested order is estimated on the trimmed window, validated by open
//! loop simulation over the full series and classified by its poles. Orders
//! whose estimate or validation fails are recorded as dropped and never abort
//! the run.
//!
//! Selection rules (heuristic policy):
//! 1. Restrict to stable candidates if there is at least one
//! 2. Choose the minimum simulation MSE
//! 3. On an exact MSE tie, choose the lowest order
//!
//! The advisory policy consults an external judge first and falls back to the
//! heuristic on any failure.

use std::cmp::Ordering;

use tracing::{debug, warn};

use crate::domain::{
    CandidateModel, DroppedOrder, EstimationMethod, NormalizedSample, SelectionDecision, SelectionMethod,
};
use crate::error::IdentError;
use crate::fit::advisory::{Advisor, AdvisoryRequest};
use crate::fit::estimator::{estimate, one_step_stats};
use crate::fit::residual::analyze;
use crate::fit::stability::verify;

/// How the final candidate is chosen.
#[derive(Debug, Clone, Default)]
pub enum SelectionPolicy {
    #[default]
    Heuristic,
    Advisory(Advisor),
}

/// Output of evaluation + selection.
#[derive(Debug, Clone)]
pub struct FitSelection {
    pub decision: SelectionDecision,
    /// Surviving candidates, in increasing order.
    pub candidates: Vec<CandidateModel>,
    /// Orders that were attempted and dropped, and why.
    pub dropped: Vec<DroppedOrder>,
}

/// Estimate, validate and classify one order.
///
/// - `window`: samples used for estimation (start-up transient removed)
/// - `full`: the full normalized series used for simulation
pub fn evaluate_order(
    window: &[NormalizedSample],
    full: &[NormalizedSample],
    order: usize,
    sampling_interval: f64,
) -> Result<CandidateModel, IdentError> {
    let coefficients = estimate(window, order)?;
    let residual = analyze(full, &coefficients)?;
    let stability = verify(&coefficients.a);
    let one_step = one_step_stats(window, &coefficients);

    Ok(CandidateModel {
        order,
        equation: coefficients.equation(),
        coefficients,
        sampling_interval,
        mse: residual.mse,
        fit_percent: residual.fit_percent,
        one_step,
        stable: stability.stable,
        poles: stability.poles,
        method: EstimationMethod::BatchLeastSquares,
    })
}

/// Evaluate every order in `orders` and select the best candidate.
pub fn fit_and_select(
    window: &[NormalizedSample],
    full: &[NormalizedSample],
    orders: &[usize],
    sampling_interval: f64,
    policy: &SelectionPolicy,
) -> Result<FitSelection, IdentError> {
    let mut candidates = Vec::with_capacity(orders.len());
    let mut dropped = Vec::new();

    for &order in orders {
        match evaluate_order(window, full, order, sampling_interval) {
            Ok(c) => {
                debug!(
                    order,
                    mse = c.mse,
                    stable = c.stable,
                    max_pole = c.max_pole_modulus(),
                    "evaluated candidate"
                );
                candidates.push(c);
            }
            Err(e) if e.is_recoverable() => {
                warn!(order, error = %e, "dropping order");
                dropped.push(DroppedOrder {
                    order,
                    reason: e.to_string(),
                });
            }
            Err(e) => return Err(e),
        }
    }

    let decision = select(&candidates, sampling_interval, policy).ok_or(IdentError::NoUsableCandidate {
        attempted: orders.len(),
    })?;

    Ok(FitSelection {
        decision,
        candidates,
        dropped,
    })
}

/// Pick a candidate under `policy`. `None` only when `candidates` is empty.
pub fn select(
    candidates: &[CandidateModel],
    sampling_interval: f64,
    policy: &SelectionPolicy,
) -> Option<SelectionDecision> {
    if candidates.is_empty() {
        return None;
    }

    if let SelectionPolicy::Advisory(advisor) = policy {
        let request = AdvisoryRequest::from_candidates(candidates, sampling_interval);
        let outcome = advisor
            .consult(request)
            .and_then(|verdict| verdict.resolve_index(candidates).map(|i| (i, verdict.rationale)));

        match outcome {
            Ok((index, rationale)) => {
                let chosen = candidates[index].clone();
                let rationale = if rationale.trim().is_empty() {
                    format!("ARX({}) selected by external advisory", chosen.order)
                } else {
                    rationale
                };
                return Some(SelectionDecision {
                    chosen,
                    index,
                    rationale,
                    method: SelectionMethod::ExternalAdvisory,
                });
            }
            Err(e) => {
                warn!(
                    error = %e,
                    timeout_ms = advisor.timeout().as_millis() as u64,
                    "advisory selection unavailable; using heuristic"
                );
            }
        }
    }

    select_heuristic(candidates)
}

/// Stable-first, minimum-MSE, lowest-order selection.
pub fn select_heuristic(candidates: &[CandidateModel]) -> Option<SelectionDecision> {
    let stable_count = candidates.iter().filter(|c| c.stable).count();
    let pool_is_stable = stable_count > 0;

    let (index, chosen) = candidates
        .iter()
        .enumerate()
        .filter(|(_, c)| !pool_is_stable || c.stable)
        .min_by(|(_, a), (_, b)| compare_candidates(a, b))?;

    let rationale = if pool_is_stable {
        format!(
            "ARX({}) has the lowest simulation MSE ({:.3e}) among {} stable candidate(s)",
            chosen.order, chosen.mse, stable_count
        )
    } else {
        format!(
            "no stable candidate; ARX({}) has the lowest simulation MSE ({:.3e}) of all {} candidate(s)",
            chosen.order,
            chosen.mse,
            candidates.len()
        )
    };

    Some(SelectionDecision {
        chosen: chosen.clone(),
        index,
        rationale,
        method: SelectionMethod::Heuristic,
    })
}

/// MSE ascending (NaN last), then order ascending.
fn compare_candidates(a: &CandidateModel, b: &CandidateModel) -> Ordering {
    mse_key(a).total_cmp(&mse_key(b)).then(a.order.cmp(&b.order))
}

fn mse_key(c: &CandidateModel) -> f64 {
    if c.mse.is_nan() { f64::INFINITY } else { c.mse }
}
