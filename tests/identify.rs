//! End-to-end identification scenarios through the public library API.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use arx_ident::data::{PlantConfig, discard_transient, generate_capture, preprocess};
use arx_ident::domain::{
    ArxCoefficients, CandidateModel, ComplexNumber, DEFAULT_TRANSIENT_FRACTION, EstimationMethod, RawSample,
    ResidualStats, Scaling, SelectionMethod,
};
use arx_ident::error::{AdvisoryError, IdentError};
use arx_ident::fit::{
    Advisor, AdvisoryRequest, AdvisoryVerdict, SelectionPolicy, estimate, select_heuristic, verify,
};
use arx_ident::{IdentifyOptions, identify};

fn first_order_plant() -> ArxCoefficients {
    ArxCoefficients::new(vec![0.9], vec![0.1, 0.0])
}

fn noisy_capture() -> Vec<RawSample> {
    generate_capture(&PlantConfig::new(first_order_plant(), 400).with_noise(0.001).with_seed(11)).unwrap()
}

fn advisory<F>(resolve: F, timeout: Duration) -> IdentifyOptions
where
    F: Fn(&AdvisoryRequest) -> Result<AdvisoryVerdict, AdvisoryError> + Send + Sync + 'static,
{
    IdentifyOptions {
        policy: SelectionPolicy::Advisory(Advisor::new(Arc::new(resolve), timeout)),
        ..IdentifyOptions::default()
    }
}

#[test]
fn recovers_noise_free_first_order_plant() {
    let raw = generate_capture(&PlantConfig::new(first_order_plant(), 400)).unwrap();
    let prepared = preprocess(&raw, &Scaling::default()).unwrap();
    let window = discard_transient(&prepared.samples, DEFAULT_TRANSIENT_FRACTION);

    let c = estimate(window, 1).unwrap();
    assert!((c.a[0] - 0.9).abs() < 1e-6, "a1 = {}", c.a[0]);
    assert!((c.b[0] - 0.1).abs() < 1e-6, "b0 = {}", c.b[0]);
    assert!(c.b[1].abs() < 1e-6, "b1 = {}", c.b[1]);
}

#[test]
fn heuristic_identification_of_noisy_capture() {
    let result = identify(&noisy_capture(), &IdentifyOptions::default()).unwrap();

    assert_eq!(result.method(), SelectionMethod::Heuristic);
    assert!(result.stable());
    assert!(result.mse() < 1e-4, "mse = {}", result.mse());
    assert_eq!(result.candidates.len() + result.dropped.len(), 3);
    assert_eq!(result.dataset.rows_used, 400);
    assert_eq!(result.dataset.estimation_rows, 320);
    assert!((result.sampling_interval() - 0.05).abs() < 1e-12);
    assert_eq!(result.coefficients().len(), 2 * result.order() + 1);
}

#[test]
fn identification_is_repeatable() {
    let capture = noisy_capture();
    let first = identify(&capture, &IdentifyOptions::default()).unwrap();
    let second = identify(&capture, &IdentifyOptions::default()).unwrap();
    assert_eq!(first, second);
}

#[test]
fn failing_advisor_falls_back_to_heuristic() {
    let capture = noisy_capture();
    let baseline = identify(&capture, &IdentifyOptions::default()).unwrap();

    let opts = advisory(
        |_: &AdvisoryRequest| -> Result<AdvisoryVerdict, AdvisoryError> {
            Err(AdvisoryError::Resolver("service unavailable".to_string()))
        },
        Duration::from_secs(5),
    );
    let result = identify(&capture, &opts).unwrap();

    assert_eq!(result.method(), SelectionMethod::Heuristic);
    assert_eq!(result.decision, baseline.decision);
}

#[test]
fn slow_advisor_times_out_to_heuristic() {
    let opts = advisory(
        |_: &AdvisoryRequest| -> Result<AdvisoryVerdict, AdvisoryError> {
            thread::sleep(Duration::from_secs(2));
            Ok(AdvisoryVerdict::index(0, "too late"))
        },
        Duration::from_millis(50),
    );
    let result = identify(&noisy_capture(), &opts).unwrap();
    assert_eq!(result.method(), SelectionMethod::Heuristic);
}

#[test]
fn panicking_advisor_falls_back_to_heuristic() {
    let opts = advisory(
        |_: &AdvisoryRequest| -> Result<AdvisoryVerdict, AdvisoryError> { panic!("resolver bug") },
        Duration::from_secs(5),
    );
    let result = identify(&noisy_capture(), &opts).unwrap();
    assert_eq!(result.method(), SelectionMethod::Heuristic);
}

#[test]
fn out_of_range_verdict_falls_back_to_heuristic() {
    let opts = advisory(
        |_: &AdvisoryRequest| -> Result<AdvisoryVerdict, AdvisoryError> {
            Ok(AdvisoryVerdict::index(42, "no such candidate"))
        },
        Duration::from_secs(5),
    );
    let result = identify(&noisy_capture(), &opts).unwrap();
    assert_eq!(result.method(), SelectionMethod::Heuristic);
}

#[test]
fn out_of_range_index_is_not_rescued_by_order() {
    let opts = advisory(
        |_: &AdvisoryRequest| -> Result<AdvisoryVerdict, AdvisoryError> {
            Ok(AdvisoryVerdict {
                selected_index: Some(42),
                order: Some(3),
                rationale: "index past the end".to_string(),
            })
        },
        Duration::from_secs(5),
    );
    let capture = noisy_capture();
    let baseline = identify(&capture, &IdentifyOptions::default()).unwrap();
    let result = identify(&capture, &opts).unwrap();

    assert_eq!(result.method(), SelectionMethod::Heuristic);
    assert_eq!(result.decision, baseline.decision);
}

#[test]
fn verdict_by_order_alone_is_honored() {
    let opts = advisory(
        |_: &AdvisoryRequest| -> Result<AdvisoryVerdict, AdvisoryError> {
            Ok(AdvisoryVerdict::order(1, "first order is enough"))
        },
        Duration::from_secs(5),
    );
    let result = identify(&noisy_capture(), &opts).unwrap();
    assert_eq!(result.method(), SelectionMethod::ExternalAdvisory);
    assert_eq!(result.order(), 1);
}

#[test]
fn valid_advisory_verdict_is_honored() {
    let opts = advisory(
        |req: &AdvisoryRequest| -> Result<AdvisoryVerdict, AdvisoryError> {
            Ok(AdvisoryVerdict::index(
                req.candidates.len() - 1,
                "highest order captures the dynamics",
            ))
        },
        Duration::from_secs(5),
    );
    let result = identify(&noisy_capture(), &opts).unwrap();

    assert_eq!(result.method(), SelectionMethod::ExternalAdvisory);
    assert_eq!(result.rationale(), "highest order captures the dynamics");
    let last = result.candidates.last().unwrap();
    assert_eq!(result.order(), last.order);
    assert_eq!(result.decision.index, result.candidates.len() - 1);
}

#[test]
fn too_few_rows_is_insufficient_data() {
    let raw: Vec<RawSample> = (0..5)
        .map(|k| RawSample::new(k as f64 * 0.05, 2000.0, 1500.0))
        .collect();
    let err = identify(&raw, &IdentifyOptions::default()).unwrap_err();
    assert_eq!(err, IdentError::InsufficientData { valid: 5, required: 10 });
}

#[test]
fn non_finite_rows_do_not_count_toward_minimum() {
    let mut raw: Vec<RawSample> = (0..9)
        .map(|k| RawSample::new(k as f64 * 0.05, 2000.0, 1500.0))
        .collect();
    raw.push(RawSample::new(0.5, f64::NAN, 1500.0));
    raw.push(RawSample::new(f64::INFINITY, 2000.0, 1500.0));
    let err = identify(&raw, &IdentifyOptions::default()).unwrap_err();
    assert_eq!(err, IdentError::InsufficientData { valid: 9, required: 10 });
}

fn candidate(order: usize, stable: bool, mse: f64) -> CandidateModel {
    let coefficients = ArxCoefficients::new(vec![0.5; order], vec![0.1; order + 1]);
    CandidateModel {
        order,
        equation: coefficients.equation(),
        coefficients,
        sampling_interval: 0.05,
        mse,
        fit_percent: None,
        one_step: ResidualStats {
            variance: 0.0,
            autocorr: 0.0,
        },
        stable,
        poles: vec![ComplexNumber::new(if stable { 0.5 } else { 1.5 }, 0.0)],
        method: EstimationMethod::BatchLeastSquares,
    }
}

#[test]
fn heuristic_never_prefers_unstable_candidate() {
    let candidates = vec![candidate(1, true, 0.02), candidate(2, false, 0.001), candidate(3, true, 0.03)];
    let decision = select_heuristic(&candidates).unwrap();
    assert_eq!(decision.index, 0);
    assert_eq!(decision.chosen.mse, 0.02);
    assert_eq!(decision.method, SelectionMethod::Heuristic);
}

#[test]
fn heuristic_tie_goes_to_lowest_order() {
    let candidates = vec![candidate(3, true, 0.01), candidate(1, true, 0.01), candidate(2, true, 0.01)];
    assert_eq!(select_heuristic(&candidates).unwrap().chosen.order, 1);
}

#[test]
fn stability_boundary_cases() {
    assert!(verify(&[0.9]).stable);
    assert!(!verify(&[1.5]).stable);
    // z² - 0.5z - 0.5 has a root at exactly 1.
    assert!(!verify(&[0.5, 0.5]).stable);
}
