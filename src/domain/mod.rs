//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - raw and normalized samples (`RawSample`, `NormalizedSample`, `Scaling`)
//! - model outputs (`ArxCoefficients`, `CandidateModel`, `SelectionDecision`)
//! - the run configuration derived from CLI flags (`IdentifyConfig`)

pub mod types;

pub use types::*;
