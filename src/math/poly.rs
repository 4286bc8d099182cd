//! Real polynomials and their complex roots.
//!
//! Root extraction is closed-form up to degree 2. From degree 3 on we run
//! Durand–Kerner (Weierstrass) simultaneous iteration for a fixed number of
//! sweeps with no convergence early-exit. For the cubics this crate produces
//! the fixed budget is far more than enough and keeps results bit-for-bit
//! reproducible.
//!
//! The classic cubic seeds `{1, -0.5+0.5i, -0.5-0.5i}` contain a conjugate
//! pair, and with real coefficients the iteration preserves that symmetry
//! exactly, so the pair can never split into two distinct real roots. After
//! the fixed budget a cubic is therefore checked by residual; if any root has
//! not converged, the best-converged root is deflated out and the remaining
//! quadratic is solved in closed form.
//!
//! Known limitation: repeated roots are not special-cased. The iteration
//! converges only linearly toward a multiple root, so a degenerate cubic can
//! come back with roots that are slightly off after the fixed budget.

use num_complex::Complex64;

/// Sweeps of Durand–Kerner iteration.
pub const DURAND_KERNER_ITERATIONS: usize = 50;

/// Scaled residual above which a cubic root counts as unconverged.
const ROOT_RESIDUAL_TOL: f64 = 1e-9;

/// A real polynomial stored highest power first: `c[0] z^n + … + c[n]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Polynomial {
    coeffs: Vec<f64>,
}

impl Polynomial {
    pub fn new(coeffs: Vec<f64>) -> Self {
        Self { coeffs }
    }

    /// Monic characteristic polynomial `z^n - a_1 z^{n-1} - … - a_n` of an AR part.
    pub fn characteristic(a: &[f64]) -> Self {
        let mut coeffs = Vec::with_capacity(a.len() + 1);
        coeffs.push(1.0);
        coeffs.extend(a.iter().map(|v| -v));
        Self { coeffs }
    }

    pub fn coefficients(&self) -> &[f64] {
        &self.coeffs
    }

    pub fn degree(&self) -> usize {
        self.coeffs.len().saturating_sub(1)
    }

    /// Horner evaluation at a complex point.
    pub fn eval(&self, z: Complex64) -> Complex64 {
        self.coeffs
            .iter()
            .fold(Complex64::new(0.0, 0.0), |acc, &c| acc * z + c)
    }

    /// All complex roots (with multiplicity), `degree()` of them.
    ///
    /// Never fails: a degenerate polynomial (e.g. zero leading coefficient)
    /// yields whatever the formulas produce, possibly non-finite values.
    pub fn roots(&self) -> Vec<Complex64> {
        match self.degree() {
            0 => Vec::new(),
            1 => vec![Complex64::new(-self.coeffs[1] / self.coeffs[0], 0.0)],
            2 => quadratic_roots(self.coeffs[0], self.coeffs[1], self.coeffs[2]),
            3 => {
                let roots = self.durand_kerner();
                self.deflate_unconverged_cubic(roots)
            }
            _ => self.durand_kerner(),
        }
    }

    /// `|p(z)|` relative to the size of the terms summed at `z`.
    fn scaled_residual(&self, z: Complex64) -> f64 {
        let magnitude: f64 = self.coeffs.iter().map(|c| c.abs()).sum();
        let reach = z.norm().max(1.0).powi(self.degree() as i32);
        self.eval(z).norm() / (magnitude * reach).max(f64::MIN_POSITIVE)
    }

    fn deflate_unconverged_cubic(&self, roots: Vec<Complex64>) -> Vec<Complex64> {
        let residuals: Vec<f64> = roots.iter().map(|&r| self.scaled_residual(r)).collect();
        if residuals.iter().all(|&r| r <= ROOT_RESIDUAL_TOL) {
            return roots;
        }
        let Some(best) = (0..roots.len()).min_by(|&i, &j| residuals[i].total_cmp(&residuals[j])) else {
            return roots;
        };
        let anchor = roots[best];
        if !(anchor.re.is_finite() && anchor.im.is_finite()) {
            return roots;
        }

        let lead = self.coeffs[0];
        let c1 = self.coeffs[1] / lead;
        let c2 = self.coeffs[2] / lead;

        if anchor.im.abs() <= 1e-12 * (1.0 + anchor.norm()) {
            // Real anchor: synthetic division leaves z² + q1 z + q2.
            let r = anchor.re;
            let q1 = c1 + r;
            let q2 = c2 + r * q1;
            let mut out = vec![Complex64::new(r, 0.0)];
            out.extend(quadratic_roots(1.0, q1, q2));
            out
        } else {
            // Complex anchor: divide out (z - r)(z - r̄) = z² + s z + t, leaving z - w.
            let s = -2.0 * anchor.re;
            let w = s - c1;
            vec![anchor, anchor.conj(), Complex64::new(w, 0.0)]
        }
    }

    fn durand_kerner(&self) -> Vec<Complex64> {
        let lead = self.coeffs[0];
        let monic = Polynomial::new(self.coeffs.iter().map(|c| c / lead).collect());
        let n = monic.degree();

        let mut roots = initial_guesses(n);
        for _ in 0..DURAND_KERNER_ITERATIONS {
            // Simultaneous update: every new root is computed from the previous sweep.
            let prev = roots.clone();
            for (k, &rk) in prev.iter().enumerate() {
                let mut den = Complex64::new(1.0, 0.0);
                for (j, &rj) in prev.iter().enumerate() {
                    if j != k {
                        den *= rk - rj;
                    }
                }
                if den.re == 0.0 && den.im == 0.0 {
                    // Collapsed estimates; leave this root for the sweep.
                    continue;
                }
                roots[k] = rk - monic.eval(rk) / den;
            }
        }
        roots
    }
}

/// Roots of `a z² + b z + c`; a complex-conjugate pair when the discriminant is negative.
fn quadratic_roots(a: f64, b: f64, c: f64) -> Vec<Complex64> {
    let d = b * b - 4.0 * a * c;
    if d >= 0.0 {
        let s = d.sqrt();
        vec![
            Complex64::new((-b + s) / (2.0 * a), 0.0),
            Complex64::new((-b - s) / (2.0 * a), 0.0),
        ]
    } else {
        let re = -b / (2.0 * a);
        let im = (-d).sqrt() / (2.0 * a);
        vec![Complex64::new(re, im), Complex64::new(re, -im)]
    }
}

fn initial_guesses(n: usize) -> Vec<Complex64> {
    if n == 3 {
        return vec![
            Complex64::new(1.0, 0.0),
            Complex64::new(-0.5, 0.5),
            Complex64::new(-0.5, -0.5),
        ];
    }
    // Standard Weierstrass seeds: powers of a point that is neither real nor on the unit circle.
    let base = Complex64::new(0.4, 0.9);
    (0..n).map(|k| base.powu(k as u32)).collect()
}
