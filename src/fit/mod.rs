//! Identification core.
//!
//! Responsibilities:
//!
//! - estimate ARX coefficients per order (batch and recursive)
//! - validate candidates by open-loop simulation
//! - classify stability from the characteristic polynomial
//! - select the final model (heuristic or external advisory)

pub mod advisory;
pub mod estimator;
pub mod recursive;
pub mod residual;
pub mod selection;
pub mod stability;

pub use advisory::*;
pub use estimator::*;
pub use recursive::*;
pub use residual::*;
pub use selection::*;
pub use stability::*;
