//! ARX model implementation.
//!
//! Models are implemented as small, pure functions so that estimation and
//! validation code can stay generic over the order.

pub mod arx;

pub use arx::*;
