//! Reporting utilities: formatted terminal output for identification runs.

pub mod format;

pub use format::*;
