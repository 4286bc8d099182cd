//! Raw acquisition rows → normalized `(u, y)` series.
//!
//! Cleaning is lenient: any row with a non-finite field is dropped silently and
//! only the count is reported. The sampling interval is estimated from the
//! surviving rows' timestamps.

use crate::domain::{
    DEFAULT_SAMPLING_INTERVAL, MIN_VALID_SAMPLES, NormalizedSample, RawSample, Scaling,
};
use crate::error::IdentError;

/// Output of [`preprocess`].
#[derive(Debug, Clone, PartialEq)]
pub struct Preprocessed {
    pub samples: Vec<NormalizedSample>,
    /// Seconds between samples.
    pub sampling_interval: f64,
    pub rows_read: usize,
    pub rows_used: usize,
}

/// Clean, time-step and normalize a raw capture.
///
/// Fails with [`IdentError::InsufficientData`] when fewer than
/// [`MIN_VALID_SAMPLES`] complete rows remain.
pub fn preprocess(raw: &[RawSample], scaling: &Scaling) -> Result<Preprocessed, IdentError> {
    let clean: Vec<&RawSample> = raw.iter().filter(|r| r.is_complete()).collect();

    if clean.len() < MIN_VALID_SAMPLES {
        return Err(IdentError::InsufficientData {
            valid: clean.len(),
            required: MIN_VALID_SAMPLES,
        });
    }

    let times: Vec<f64> = clean.iter().map(|r| r.time).collect();
    let sampling_interval = sampling_interval(&times);
    let samples = clean.iter().map(|r| scaling.normalize(r)).collect();

    Ok(Preprocessed {
        samples,
        sampling_interval,
        rows_read: raw.len(),
        rows_used: clean.len(),
    })
}

/// Mean of the positive consecutive time deltas.
///
/// Returns [`DEFAULT_SAMPLING_INTERVAL`] when fewer than two usable deltas exist
/// (e.g. a frozen or missing clock).
pub fn sampling_interval(times: &[f64]) -> f64 {
    let mut sum = 0.0;
    let mut count = 0usize;
    for w in times.windows(2) {
        let dt = w[1] - w[0];
        if dt.is_finite() && dt > 0.0 {
            sum += dt;
            count += 1;
        }
    }
    if count < 2 {
        return DEFAULT_SAMPLING_INTERVAL;
    }
    sum / count as f64
}

/// Skip the leading `fraction` of the series (rounded down) as start-up transient.
pub fn discard_transient(samples: &[NormalizedSample], fraction: f64) -> &[NormalizedSample] {
    let skip = (samples.len() as f64 * fraction).floor() as usize;
    &samples[skip.min(samples.len())..]
}
