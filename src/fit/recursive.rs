//! Recursive least squares with exponential forgetting.
//!
//! An online counterpart to [`crate::fit::estimate`] for streaming captures.
//! Each [`RecursiveEstimator::step`] consumes one `(u, y)` pair and refines
//! `θ = [a_1..a_n, b_0..b_n]`.
//!
//! Numerical guards:
//! - the gain denominator `λ + φᵗPφ` is floored at `1e-10` in magnitude
//! - every `θ` component is clamped to `[-THETA_LIMIT, THETA_LIMIT]`; a
//!   non-finite update keeps the previous value
//! - a non-finite covariance entry is reset to its initial value

use nalgebra::{DMatrix, DVector};

use crate::domain::ArxCoefficients;
use crate::error::IdentError;
use crate::models::push_front;

/// Initial covariance diagonal.
pub const INITIAL_COVARIANCE: f64 = 10.0;

/// Default forgetting factor.
pub const DEFAULT_FORGETTING: f64 = 0.98;

/// Bound on each parameter magnitude.
pub const THETA_LIMIT: f64 = 100.0;

const MIN_DENOMINATOR: f64 = 1e-10;

/// Recursive ARX estimator for one stream. Not shared across threads.
#[derive(Debug, Clone)]
pub struct RecursiveEstimator {
    order: usize,
    lambda: f64,
    theta: DVector<f64>,
    p: DMatrix<f64>,
    y_hist: Vec<f64>,
    u_hist: Vec<f64>,
    steps: u64,
}

impl RecursiveEstimator {
    /// A fresh estimator of `order` with forgetting factor `lambda`.
    pub fn new(order: usize, lambda: f64) -> Result<Self, IdentError> {
        if order == 0 {
            return Err(IdentError::InvalidConfig("recursive order must be >= 1".to_string()));
        }
        if !(lambda.is_finite() && lambda > 0.0 && lambda <= 1.0) {
            return Err(IdentError::InvalidConfig(format!(
                "forgetting factor must be in (0, 1], got {lambda}"
            )));
        }
        let dim = 2 * order + 1;
        Ok(Self {
            order,
            lambda,
            theta: DVector::zeros(dim),
            p: DMatrix::from_diagonal_element(dim, dim, INITIAL_COVARIANCE),
            y_hist: vec![0.0; order],
            u_hist: vec![0.0; order],
            steps: 0,
        })
    }

    /// Same as [`RecursiveEstimator::new`] with [`DEFAULT_FORGETTING`].
    pub fn with_default_forgetting(order: usize) -> Result<Self, IdentError> {
        Self::new(order, DEFAULT_FORGETTING)
    }

    /// Consume one sample and return the a-priori prediction error `y - φᵗθ`.
    ///
    /// Non-finite inputs are rejected and leave the state untouched.
    pub fn step(&mut self, u: f64, y: f64) -> Result<f64, IdentError> {
        if !(u.is_finite() && y.is_finite()) {
            return Err(IdentError::NonFiniteInput);
        }

        let phi = self.regressor(u);
        let error = y - phi.dot(&self.theta);
        if !error.is_finite() {
            return Err(IdentError::NonFiniteInput);
        }

        let p_phi = &self.p * &phi;
        let mut denom = self.lambda + phi.dot(&p_phi);
        if denom.abs() < MIN_DENOMINATOR {
            denom = if denom < 0.0 { -MIN_DENOMINATOR } else { MIN_DENOMINATOR };
        }
        let gain = &p_phi / denom;

        for i in 0..self.theta.len() {
            let next = self.theta[i] + gain[i] * error;
            if next.is_finite() {
                self.theta[i] = next.clamp(-THETA_LIMIT, THETA_LIMIT);
            }
        }

        // P ← (P - K (φᵗP)) / λ. P is symmetric, so φᵗP = (Pφ)ᵗ.
        let dim = self.theta.len();
        for i in 0..dim {
            for j in 0..dim {
                let v = (self.p[(i, j)] - gain[i] * p_phi[j]) / self.lambda;
                self.p[(i, j)] = if v.is_finite() {
                    v
                } else if i == j {
                    INITIAL_COVARIANCE
                } else {
                    0.0
                };
            }
        }

        push_front(&mut self.y_hist, y);
        push_front(&mut self.u_hist, u);
        self.steps += 1;

        Ok(error)
    }

    /// `[y(k-1)..y(k-n), u(k), u(k-1)..u(k-n)]`
    fn regressor(&self, u: f64) -> DVector<f64> {
        let mut phi = Vec::with_capacity(2 * self.order + 1);
        phi.extend_from_slice(&self.y_hist);
        phi.push(u);
        phi.extend_from_slice(&self.u_hist);
        DVector::from_vec(phi)
    }

    pub fn order(&self) -> usize {
        self.order
    }

    pub fn forgetting_factor(&self) -> f64 {
        self.lambda
    }

    pub fn theta(&self) -> &DVector<f64> {
        &self.theta
    }

    pub fn covariance(&self) -> &DMatrix<f64> {
        &self.p
    }

    /// Accepted updates since construction or the last reset.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Current estimate unpacked into `{a, b}`.
    pub fn coefficients(&self) -> ArxCoefficients {
        ArxCoefficients::new(
            self.theta.as_slice()[..self.order].to_vec(),
            self.theta.as_slice()[self.order..].to_vec(),
        )
    }

    /// Back to the initial state (same order and forgetting factor).
    pub fn reset(&mut self) {
        let dim = self.theta.len();
        self.theta.fill(0.0);
        self.p = DMatrix::from_diagonal_element(dim, dim, INITIAL_COVARIANCE);
        self.y_hist.fill(0.0);
        self.u_hist.fill(0.0);
        self.steps = 0;
    }
}
