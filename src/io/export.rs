//! Exports: chosen-model JSON, machine-readable run reports and capture CSVs.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::domain::{ArxCoefficients, ComplexNumber, Identification, RawSample, SelectionMethod};
use crate::error::{AppError, IdentError};

/// The neutral model file written by `identify --export`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelFile {
    pub tool: String,
    pub version: String,
    pub generated_at: DateTime<Utc>,
    pub order: usize,
    pub coefficients: ArxCoefficients,
    pub sampling_interval: f64,
    pub mse: f64,
    pub fit_percent: Option<f64>,
    pub stable: bool,
    pub poles: Vec<ComplexNumber>,
    pub equation: String,
    pub method: SelectionMethod,
    pub rationale: String,
}

impl ModelFile {
    pub fn from_identification(result: &Identification, generated_at: DateTime<Utc>) -> Self {
        let chosen = &result.decision.chosen;
        Self {
            tool: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            generated_at,
            order: chosen.order,
            coefficients: chosen.coefficients.clone(),
            sampling_interval: chosen.sampling_interval,
            mse: chosen.mse,
            fit_percent: chosen.fit_percent,
            stable: chosen.stable,
            poles: chosen.poles.clone(),
            equation: chosen.equation.clone(),
            method: result.method(),
            rationale: result.rationale().to_string(),
        }
    }
}

/// Write the chosen model as pretty JSON.
pub fn write_model_json(path: &Path, result: &Identification) -> Result<(), AppError> {
    let model = ModelFile::from_identification(result, Utc::now());
    let text = serde_json::to_string_pretty(&model)
        .map_err(|e| AppError::new(4, format!("Failed to serialize model: {e}")))?;

    let mut file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create model JSON '{}': {e}", path.display())))?;
    writeln!(file, "{text}").map_err(|e| AppError::new(2, format!("Failed to write model JSON: {e}")))?;
    Ok(())
}

/// The `--json` report: `{ok: true, ...}` or `{ok: false, error_kind, message}`.
pub fn report_json(result: &Result<Identification, IdentError>) -> serde_json::Value {
    match result {
        Ok(r) => json!({
            "ok": true,
            "order": r.order(),
            "coefficients": r.coefficients(),
            "sampling_interval": r.sampling_interval(),
            "mse": r.mse(),
            "stable": r.stable(),
            "poles": r.poles(),
            "equation": r.equation(),
            "method": r.method(),
            "rationale": r.rationale(),
            "candidates": r.candidates,
            "dropped": r.dropped,
            "dataset": r.dataset,
        }),
        Err(e) => json!({
            "ok": false,
            "error_kind": e.kind(),
            "message": e.to_string(),
        }),
    }
}

/// Write a capture as `time,input,output` CSV.
pub fn write_capture_csv(path: &Path, samples: &[RawSample]) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| AppError::new(2, format!("Failed to create capture CSV '{}': {e}", path.display())))?;

    writer
        .write_record(["time", "input", "output"])
        .map_err(|e| AppError::new(2, format!("Failed to write capture CSV header: {e}")))?;
    for s in samples {
        writer
            .write_record([
                format!("{:.6}", s.time),
                format!("{:.3}", s.input),
                format!("{:.3}", s.output),
            ])
            .map_err(|e| AppError::new(2, format!("Failed to write capture CSV row: {e}")))?;
    }
    writer
        .flush()
        .map_err(|e| AppError::new(2, format!("Failed to flush capture CSV: {e}")))?;
    Ok(())
}
