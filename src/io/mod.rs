//! Input/output helpers.
//!
//! - capture ingest + field-name resolution (`ingest`)
//! - model JSON, run report JSON and capture CSV exports (`export`)

pub mod export;
pub mod ingest;

pub use export::*;
pub use ingest::*;
