//! Data sources for identification.
//!
//! - `preprocess`: raw rows → cleaned, normalized series + sampling interval
//! - `synthetic`: seeded captures from a known plant

pub mod preprocess;
pub mod synthetic;

pub use preprocess::*;
pub use synthetic::*;
