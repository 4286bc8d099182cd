//! The identification pipeline shared by the CLI and library callers.
//!
//! raw samples -> preprocess -> transient discard -> per-order fit/validate
//! -> stability -> selection
//!
//! Every call owns its data; nothing is cached between calls.

use tracing::info;

use crate::data::{discard_transient, preprocess};
use crate::domain::{
    DEFAULT_TRANSIENT_FRACTION, DatasetStats, Identification, MAX_ORDER, RawSample, Scaling,
};
use crate::error::IdentError;
use crate::fit::{SelectionPolicy, fit_and_select};

/// Options for [`identify`].
#[derive(Debug, Clone)]
pub struct IdentifyOptions {
    /// Evaluate orders `1..=max_order`.
    pub max_order: usize,
    /// Evaluate only this order (overrides `max_order`).
    pub order: Option<usize>,
    /// Leading share of the series excluded from estimation.
    pub transient_fraction: f64,
    pub scaling: Scaling,
    pub policy: SelectionPolicy,
}

impl Default for IdentifyOptions {
    fn default() -> Self {
        Self {
            max_order: MAX_ORDER,
            order: None,
            transient_fraction: DEFAULT_TRANSIENT_FRACTION,
            scaling: Scaling::default(),
            policy: SelectionPolicy::Heuristic,
        }
    }
}

impl IdentifyOptions {
    /// Orders to attempt, after validating the options.
    pub fn orders(&self) -> Result<Vec<usize>, IdentError> {
        let in_range = |n: usize| (1..=MAX_ORDER).contains(&n);

        if let Some(order) = self.order {
            if !in_range(order) {
                return Err(IdentError::InvalidConfig(format!(
                    "order must be in 1..={MAX_ORDER}, got {order}"
                )));
            }
            return Ok(vec![order]);
        }
        if !in_range(self.max_order) {
            return Err(IdentError::InvalidConfig(format!(
                "max order must be in 1..={MAX_ORDER}, got {}",
                self.max_order
            )));
        }
        Ok((1..=self.max_order).collect())
    }

    fn validate(&self) -> Result<(), IdentError> {
        if !(self.transient_fraction.is_finite() && (0.0..1.0).contains(&self.transient_fraction)) {
            return Err(IdentError::InvalidConfig(format!(
                "transient fraction must be in [0, 1), got {}",
                self.transient_fraction
            )));
        }
        let s = &self.scaling;
        let positive = |v: f64| v.is_finite() && v > 0.0;
        if !(positive(s.full_scale) && positive(s.calibration)) {
            return Err(IdentError::InvalidConfig(
                "scaling constants must be finite and positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Identify an ARX model from a raw capture.
#[tracing::instrument(level = "debug", skip_all, fields(rows = samples.len()))]
pub fn identify(
    samples: &[RawSample],
    options: &IdentifyOptions,
) -> Result<Identification, IdentError> {
    let orders = options.orders()?;
    options.validate()?;

    let prepared = preprocess(samples, &options.scaling)?;
    let window = discard_transient(&prepared.samples, options.transient_fraction);

    let selection = fit_and_select(
        window,
        &prepared.samples,
        &orders,
        prepared.sampling_interval,
        &options.policy,
    )?;

    info!(
        order = selection.decision.chosen.order,
        mse = selection.decision.chosen.mse,
        stable = selection.decision.chosen.stable,
        method = selection.decision.method.display_name(),
        "selected model"
    );

    Ok(Identification {
        decision: selection.decision,
        candidates: selection.candidates,
        dropped: selection.dropped,
        dataset: DatasetStats {
            rows_read: prepared.rows_read,
            rows_used: prepared.rows_used,
            estimation_rows: window.len(),
            sampling_interval: prepared.sampling_interval,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{PlantConfig, generate_capture};
    use crate::domain::{ArxCoefficients, SelectionMethod};

    fn capture() -> Vec<RawSample> {
        let plant = ArxCoefficients::new(vec![0.9], vec![0.1, 0.0]);
        generate_capture(&PlantConfig::new(plant, 300).with_noise(0.001).with_seed(3)).unwrap()
    }

    #[test]
    fn default_options_try_all_orders() {
        assert_eq!(IdentifyOptions::default().orders().unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn fixed_order_overrides_max_order() {
        let opts = IdentifyOptions {
            order: Some(2),
            ..IdentifyOptions::default()
        };
        assert_eq!(opts.orders().unwrap(), vec![2]);
    }

    #[test]
    fn out_of_range_orders_are_rejected() {
        for opts in [
            IdentifyOptions {
                max_order: 0,
                ..IdentifyOptions::default()
            },
            IdentifyOptions {
                max_order: 4,
                ..IdentifyOptions::default()
            },
            IdentifyOptions {
                order: Some(5),
                ..IdentifyOptions::default()
            },
        ] {
            assert!(matches!(identify(&capture(), &opts), Err(IdentError::InvalidConfig(_))));
        }
    }

    #[test]
    fn bad_transient_fraction_is_rejected() {
        let opts = IdentifyOptions {
            transient_fraction: 1.0,
            ..IdentifyOptions::default()
        };
        assert!(matches!(identify(&capture(), &opts), Err(IdentError::InvalidConfig(_))));
    }

    #[test]
    fn identifies_first_order_plant() {
        let result = identify(&capture(), &IdentifyOptions::default()).unwrap();
        assert_eq!(result.method(), SelectionMethod::Heuristic);
        assert!(result.stable());
        assert_eq!(result.dataset.rows_used, 300);
        assert_eq!(result.dataset.estimation_rows, 240);
        assert!((result.dataset.sampling_interval - 0.05).abs() < 1e-9);
        assert_eq!(result.candidates.len() + result.dropped.len(), 3);
        assert!(result.mse().is_finite());
        assert_eq!(result.coefficients().len(), 2 * result.order() + 1);
    }

    #[test]
    fn empty_capture_is_insufficient() {
        let err = identify(&[], &IdentifyOptions::default()).unwrap_err();
        assert_eq!(err, IdentError::InsufficientData { valid: 0, required: 10 });
    }
}
