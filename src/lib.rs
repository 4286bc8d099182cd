//! `arx-ident` library crate.
//!
//! The binary (`arxid`) is a thin wrapper around this library so that:
//!
//! - the identification core is testable without spawning processes
//! - the pipeline can be embedded by other tools (acquisition front-ends, notebooks)
//!
//! The main entry point is [`identify`].

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod logging;
pub mod math;
pub mod models;
pub mod plot;
pub mod report;

pub use app::pipeline::{IdentifyOptions, identify};
