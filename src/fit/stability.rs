//! Pole-based stability check.
//!
//! A discrete ARX model is stable iff every root of its characteristic
//! polynomial `z^n - a_1 z^{n-1} - … - a_n` lies strictly inside the unit
//! circle. A pole of modulus exactly 1 (integrator, oscillator) is unstable.

use crate::domain::ComplexNumber;
use crate::math::Polynomial;

/// Stability verdict plus the poles that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct StabilityReport {
    pub stable: bool,
    pub poles: Vec<ComplexNumber>,
}

/// Classify an AR part. Never fails; non-finite poles count as unstable.
pub fn verify(a: &[f64]) -> StabilityReport {
    let poles: Vec<ComplexNumber> = Polynomial::characteristic(a)
        .roots()
        .into_iter()
        .map(ComplexNumber::from)
        .collect();
    let stable = poles.iter().all(|p| p.modulus() < 1.0);
    StabilityReport { stable, poles }
}
