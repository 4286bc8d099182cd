//! Synthetic plant captures for demos and tests.
//!
//! A known ARX plant is driven by a random piecewise-constant input (levels
//! held for a random number of samples) and its output is perturbed with
//! Gaussian measurement noise. Everything is generated in normalized units and
//! then converted back to raw device counts, so the result round-trips through
//! the normal preprocessing path.

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use crate::domain::{ArxCoefficients, RawSample, Scaling};
use crate::error::IdentError;
use crate::models::simulate;

/// Shortest and longest hold (in samples) of each input level.
const HOLD_MIN: usize = 3;
const HOLD_MAX: usize = 15;

/// Normalized input range used for excitation.
const INPUT_LOW: f64 = 0.1;
const INPUT_HIGH: f64 = 0.9;

/// Synthetic capture settings.
#[derive(Debug, Clone)]
pub struct PlantConfig {
    pub coefficients: ArxCoefficients,
    pub samples: usize,
    /// Seconds between samples.
    pub interval: f64,
    /// Standard deviation of the additive output noise, in normalized units.
    pub noise_std: f64,
    pub seed: u64,
    pub scaling: Scaling,
}

impl PlantConfig {
    pub fn new(coefficients: ArxCoefficients, samples: usize) -> Self {
        Self {
            coefficients,
            samples,
            interval: crate::domain::DEFAULT_SAMPLING_INTERVAL,
            noise_std: 0.0,
            seed: 42,
            scaling: Scaling::default(),
        }
    }

    pub fn with_noise(mut self, noise_std: f64) -> Self {
        self.noise_std = noise_std;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_interval(mut self, interval: f64) -> Self {
        self.interval = interval;
        self
    }
}

/// Generate a raw capture from a known plant.
pub fn generate_capture(config: &PlantConfig) -> Result<Vec<RawSample>, IdentError> {
    if config.samples == 0 {
        return Err(IdentError::InvalidConfig("sample count must be > 0".to_string()));
    }
    if !config.coefficients.is_well_formed() || !config.coefficients.all_finite() {
        return Err(IdentError::InvalidConfig(format!(
            "plant needs n AR and n+1 finite input coefficients (got {} and {})",
            config.coefficients.a.len(),
            config.coefficients.b.len()
        )));
    }
    if !(config.interval.is_finite() && config.interval > 0.0) {
        return Err(IdentError::InvalidConfig("sampling interval must be > 0".to_string()));
    }
    if !(config.noise_std.is_finite() && config.noise_std >= 0.0) {
        return Err(IdentError::InvalidConfig("noise std must be >= 0".to_string()));
    }

    let mut rng = StdRng::seed_from_u64(config.seed);
    let noise = Normal::new(0.0, config.noise_std)
        .map_err(|e| IdentError::InvalidConfig(format!("noise distribution: {e}")))?;

    let inputs = excitation(&mut rng, config.samples);
    let clean = simulate(&inputs, &config.coefficients);

    let mut out = Vec::with_capacity(config.samples);
    for (k, (&u, &y)) in inputs.iter().zip(&clean).enumerate() {
        let y_meas = if config.noise_std > 0.0 {
            y + noise.sample(&mut rng)
        } else {
            y
        };
        let (input, output) = config
            .scaling
            .to_counts(crate::domain::NormalizedSample::new(u, y_meas));
        out.push(RawSample::new(k as f64 * config.interval, input, output));
    }

    Ok(out)
}

/// Random piecewise-constant input in `[INPUT_LOW, INPUT_HIGH]`.
pub fn excitation(rng: &mut StdRng, n: usize) -> Vec<f64> {
    let mut out = Vec::with_capacity(n);
    while out.len() < n {
        let level = rng.gen_range(INPUT_LOW..=INPUT_HIGH);
        let hold = rng.gen_range(HOLD_MIN..=HOLD_MAX);
        for _ in 0..hold.min(n - out.len()) {
            out.push(level);
        }
    }
    out
}
