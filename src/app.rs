//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - loads captures and runs identification
//! - prints reports/plots
//! - writes optional exports

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{info, warn};

use crate::cli::{Command, IdentifyArgs, SimulateArgs, TrackArgs};
use crate::data::{PlantConfig, generate_capture, preprocess};
use crate::domain::{ArxCoefficients, Identification, IdentifyConfig, Scaling};
use crate::error::AppError;
use crate::fit::{Advisor, HttpAdvisor, RecursiveEstimator, SelectionPolicy};
use crate::io::{FieldMap, load_capture};

pub mod pipeline;

/// Entry point for the `arxid` binary.
pub fn run() -> Result<(), AppError> {
    let cli = crate::cli::Cli::parse();
    crate::logging::init(cli.verbose);

    match cli.command {
        Command::Identify(args) => handle_identify(args),
        Command::Simulate(args) => handle_simulate(args),
        Command::Track(args) => handle_track(args),
    }
}

fn handle_identify(args: IdentifyArgs) -> Result<(), AppError> {
    let config = identify_config_from_args(&args);
    let capture = load_capture(&config.input_path, &FieldMap::default())?;
    info!(
        rows = capture.samples.len(),
        format = ?capture.format,
        input = %capture.columns.input,
        output = %capture.columns.output,
        "loaded capture"
    );

    let options = identify_options(&config);
    let result = pipeline::identify(&capture.samples, &options);

    if config.json {
        let report = crate::io::report_json(&result);
        let text = serde_json::to_string_pretty(&report)
            .map_err(|e| AppError::new(4, format!("Failed to serialize report: {e}")))?;
        println!("{text}");
    }
    let result = result?;

    if !config.json {
        println!(
            "{}",
            crate::report::format_summary(&result, &config.input_path.display().to_string())
        );
        if config.plot {
            println!("{}", render_plot(&capture.samples, &result, &config)?);
        }
    }

    if let Some(path) = &config.export_model {
        crate::io::write_model_json(path, &result)?;
        info!(path = %path.display(), "wrote model JSON");
    }

    Ok(())
}

fn render_plot(
    samples: &[crate::domain::RawSample],
    result: &Identification,
    config: &IdentifyConfig,
) -> Result<String, AppError> {
    let prepared = preprocess(samples, &Scaling::default())?;
    let inputs: Vec<f64> = prepared.samples.iter().map(|s| s.u).collect();
    let measured: Vec<f64> = prepared.samples.iter().map(|s| s.y).collect();
    let simulated = crate::models::simulate(&inputs, result.coefficients());

    Ok(crate::plot::render_response_plot(
        &measured,
        &simulated,
        prepared.sampling_interval,
        config.plot_width,
        config.plot_height,
    ))
}

/// Library options for a CLI configuration.
///
/// An advisor that cannot be configured is not fatal: selection falls back to
/// the heuristic, the same as any other advisory failure.
pub fn identify_options(config: &IdentifyConfig) -> pipeline::IdentifyOptions {
    let policy = if config.advisory {
        let timeout = Duration::from_millis(config.advisory_timeout_ms);
        match HttpAdvisor::from_env(timeout) {
            Ok(http) => SelectionPolicy::Advisory(Advisor::new(Arc::new(http), timeout)),
            Err(e) => {
                warn!(error = %e, "advisory unavailable, using heuristic selection");
                SelectionPolicy::Heuristic
            }
        }
    } else {
        SelectionPolicy::Heuristic
    };

    pipeline::IdentifyOptions {
        max_order: config.max_order,
        order: config.order,
        transient_fraction: config.transient_fraction,
        scaling: Scaling::default(),
        policy,
    }
}

pub fn identify_config_from_args(args: &IdentifyArgs) -> IdentifyConfig {
    IdentifyConfig {
        input_path: args.input.clone(),
        max_order: args.max_order,
        order: args.order,
        transient_fraction: args.transient,
        advisory: args.advisory,
        advisory_timeout_ms: args.advisory_timeout_ms,
        json: args.json,
        plot: args.plot,
        plot_width: args.width,
        plot_height: args.height,
        export_model: args.export.clone(),
    }
}

fn handle_simulate(args: SimulateArgs) -> Result<(), AppError> {
    let plant = ArxCoefficients::new(args.a.clone(), args.b.clone());
    let config = PlantConfig::new(plant, args.samples)
        .with_interval(args.interval)
        .with_noise(args.noise)
        .with_seed(args.seed);
    let samples = generate_capture(&config)?;

    crate::io::write_capture_csv(&args.output, &samples)?;
    println!("Wrote {} samples to {}", samples.len(), args.output.display());
    Ok(())
}

fn handle_track(args: TrackArgs) -> Result<(), AppError> {
    let capture = load_capture(&args.input, &FieldMap::default())?;
    let prepared = preprocess(&capture.samples, &Scaling::default())?;

    let mut estimator = RecursiveEstimator::new(args.order, args.lambda)?;
    let rms = track_rms(&mut estimator, &prepared.samples)?;

    println!(
        "{}",
        crate::report::format_track_summary(
            &estimator.coefficients(),
            estimator.steps(),
            rms,
            estimator.forgetting_factor(),
        )
    );
    Ok(())
}

/// Feed every sample through `estimator`; returns the RMS of the a-priori errors.
fn track_rms(
    estimator: &mut RecursiveEstimator,
    samples: &[crate::domain::NormalizedSample],
) -> Result<f64, AppError> {
    if samples.is_empty() {
        return Ok(0.0);
    }
    let mut sum_sq = 0.0;
    for s in samples {
        let e = estimator.step(s.u, s.y)?;
        sum_sq += e * e;
    }
    Ok((sum_sq / samples.len() as f64).sqrt())
}
