//! Mathematical utilities: normal-equation solving and polynomial roots.

pub mod gauss;
pub mod poly;

pub use gauss::*;
pub use poly::*;
