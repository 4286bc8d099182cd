//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory during identification
//! - exported to JSON (model files, `--json` reports)
//! - handed to the advisory resolver as a serialized candidate set

use std::path::PathBuf;

use num_complex::Complex64;
use serde::{Deserialize, Serialize};

/// Hard upper bound on the ARX order (the root finder is specified up to cubics).
pub const MAX_ORDER: usize = 3;

/// Sampling interval (seconds) used when the time column has too few usable deltas.
pub const DEFAULT_SAMPLING_INTERVAL: f64 = 0.05;

/// Leading share of the normalized series treated as start-up transient.
pub const DEFAULT_TRANSIENT_FRACTION: f64 = 0.2;

/// Minimum number of clean rows required to attempt identification.
pub const MIN_VALID_SAMPLES: usize = 10;

/// One raw acquisition row in device units.
///
/// A missing field is carried as `NaN`; the preprocessor drops such rows.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawSample {
    /// Acquisition time in seconds.
    pub time: f64,
    /// Actuator command in raw counts (e.g. PWM duty).
    pub input: f64,
    /// Sensor reading in raw counts (e.g. ADC conversion).
    pub output: f64,
}

impl RawSample {
    pub fn new(time: f64, input: f64, output: f64) -> Self {
        Self { time, input, output }
    }

    /// `true` when every field is finite.
    pub fn is_complete(&self) -> bool {
        self.time.is_finite() && self.input.is_finite() && self.output.is_finite()
    }
}

/// A normalized `(u, y)` pair in `[0, 1]` for well-formed device readings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizedSample {
    pub u: f64,
    pub y: f64,
}

impl NormalizedSample {
    pub fn new(u: f64, y: f64) -> Self {
        Self { u, y }
    }
}

/// Physical-interface constants used to normalize raw counts.
///
/// `u = input / full_scale`, `y = output * calibration / full_scale`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Scaling {
    pub full_scale: f64,
    pub calibration: f64,
}

impl Default for Scaling {
    fn default() -> Self {
        // 12-bit converter; the sensor saturates at 3617 counts.
        Self {
            full_scale: 4095.0,
            calibration: 4095.0 / 3617.0,
        }
    }
}

impl Scaling {
    pub fn normalize(&self, raw: &RawSample) -> NormalizedSample {
        NormalizedSample {
            u: raw.input / self.full_scale,
            y: raw.output * self.calibration / self.full_scale,
        }
    }

    /// Inverse of [`Scaling::normalize`]: raw `(input, output)` counts for a normalized pair.
    pub fn to_counts(&self, sample: NormalizedSample) -> (f64, f64) {
        (
            sample.u * self.full_scale,
            sample.y * self.full_scale / self.calibration,
        )
    }
}

/// ARX coefficients `{a_1..a_n}` and `{b_0..b_n}`.
///
/// The model is `y[k] = Σ a_i y[k-i] + Σ b_j u[k-j]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArxCoefficients {
    pub a: Vec<f64>,
    pub b: Vec<f64>,
}

impl ArxCoefficients {
    pub fn new(a: Vec<f64>, b: Vec<f64>) -> Self {
        Self { a, b }
    }

    /// Unpack a parameter vector laid out as `[a_1..a_n, b_0..b_n]`.
    ///
    /// Returns `None` if `theta.len() != 2 * order + 1`.
    pub fn from_theta(theta: &[f64], order: usize) -> Option<Self> {
        if theta.len() != 2 * order + 1 {
            return None;
        }
        Some(Self {
            a: theta[..order].to_vec(),
            b: theta[order..].to_vec(),
        })
    }

    pub fn order(&self) -> usize {
        self.a.len()
    }

    /// Total parameter count (`2n + 1` for a well-formed model).
    pub fn len(&self) -> usize {
        self.a.len() + self.b.len()
    }

    pub fn is_empty(&self) -> bool {
        self.a.is_empty() && self.b.is_empty()
    }

    /// `b` has exactly one more entry than `a`.
    pub fn is_well_formed(&self) -> bool {
        self.b.len() == self.a.len() + 1
    }

    pub fn all_finite(&self) -> bool {
        self.a.iter().chain(self.b.iter()).all(|v| v.is_finite())
    }

    /// Human-readable difference equation, e.g. `y[k] = 0.9000*y[k-1] + 0.1000*u[k-0]`.
    pub fn equation(&self) -> String {
        let terms: Vec<String> = self
            .a
            .iter()
            .enumerate()
            .map(|(i, v)| format!("{v:.4}*y[k-{}]", i + 1))
            .chain(self.b.iter().enumerate().map(|(i, v)| format!("{v:.4}*u[k-{i}]")))
            .collect();
        format!("y[k] = {}", terms.join(" + "))
    }
}

/// A complex pole `{re, im}` in serializable form.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComplexNumber {
    pub re: f64,
    pub im: f64,
}

impl ComplexNumber {
    pub fn new(re: f64, im: f64) -> Self {
        Self { re, im }
    }

    /// Distance from the origin.
    pub fn modulus(&self) -> f64 {
        self.re.hypot(self.im)
    }
}

impl From<Complex64> for ComplexNumber {
    fn from(value: Complex64) -> Self {
        Self {
            re: value.re,
            im: value.im,
        }
    }
}

/// How a candidate's coefficients were estimated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EstimationMethod {
    /// One-shot normal-equation solve over the capture window.
    BatchLeastSquares,
}

impl EstimationMethod {
    pub fn display_name(self) -> &'static str {
        match self {
            EstimationMethod::BatchLeastSquares => "batch-least-squares",
        }
    }
}

/// How the final candidate was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SelectionMethod {
    Heuristic,
    ExternalAdvisory,
}

impl SelectionMethod {
    pub fn display_name(self) -> &'static str {
        match self {
            SelectionMethod::Heuristic => "heuristic",
            SelectionMethod::ExternalAdvisory => "external-advisory",
        }
    }
}

/// Diagnostics of the one-step-ahead prediction errors over the estimation window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResidualStats {
    pub variance: f64,
    /// Lag-1 autocorrelation (un-normalized mean product of consecutive errors).
    pub autocorr: f64,
}

/// An evaluated model of a single order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateModel {
    pub order: usize,
    pub coefficients: ArxCoefficients,
    pub sampling_interval: f64,
    /// Open-loop simulation MSE against the measured output.
    pub mse: f64,
    /// `100 * (1 - |y - ŷ| / |y - ȳ|)`; `None` for a constant output.
    pub fit_percent: Option<f64>,
    pub one_step: ResidualStats,
    pub equation: String,
    pub stable: bool,
    pub poles: Vec<ComplexNumber>,
    pub method: EstimationMethod,
}

impl CandidateModel {
    /// Largest pole modulus; `NaN` if any pole is not a number.
    pub fn max_pole_modulus(&self) -> f64 {
        self.poles
            .iter()
            .map(ComplexNumber::modulus)
            .try_fold(0.0_f64, |acc, m| (!m.is_nan()).then(|| acc.max(m)))
            .unwrap_or(f64::NAN)
    }
}

/// The outcome of model selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionDecision {
    pub chosen: CandidateModel,
    /// Position of `chosen` in the candidate list handed to the selector.
    pub index: usize,
    pub rationale: String,
    pub method: SelectionMethod,
}

/// An order removed from the candidate pool, and why.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DroppedOrder {
    pub order: usize,
    pub reason: String,
}

/// Summary stats about the dataset actually used.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DatasetStats {
    pub rows_read: usize,
    pub rows_used: usize,
    /// Samples left for estimation after the start-up transient was discarded.
    pub estimation_rows: usize,
    pub sampling_interval: f64,
}

/// A full `identify` result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identification {
    pub decision: SelectionDecision,
    /// Every candidate that survived estimation and validation, in order.
    pub candidates: Vec<CandidateModel>,
    pub dropped: Vec<DroppedOrder>,
    pub dataset: DatasetStats,
}

impl Identification {
    pub fn order(&self) -> usize {
        self.decision.chosen.order
    }

    pub fn coefficients(&self) -> &ArxCoefficients {
        &self.decision.chosen.coefficients
    }

    pub fn sampling_interval(&self) -> f64 {
        self.decision.chosen.sampling_interval
    }

    pub fn mse(&self) -> f64 {
        self.decision.chosen.mse
    }

    pub fn stable(&self) -> bool {
        self.decision.chosen.stable
    }

    pub fn poles(&self) -> &[ComplexNumber] {
        &self.decision.chosen.poles
    }

    pub fn rationale(&self) -> &str {
        &self.decision.rationale
    }

    pub fn method(&self) -> SelectionMethod {
        self.decision.method
    }

    pub fn equation(&self) -> &str {
        &self.decision.chosen.equation
    }
}

/// A full `identify` run configuration as understood by the binary.
///
/// This is derived from CLI flags (plus defaults).
#[derive(Debug, Clone)]
pub struct IdentifyConfig {
    pub input_path: PathBuf,
    pub max_order: usize,
    /// Evaluate only this order (overrides `max_order`).
    pub order: Option<usize>,
    pub transient_fraction: f64,

    pub advisory: bool,
    pub advisory_timeout_ms: u64,

    pub json: bool,
    pub plot: bool,
    pub plot_width: usize,
    pub plot_height: usize,

    pub export_model: Option<PathBuf>,
}
