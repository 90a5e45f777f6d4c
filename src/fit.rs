//! Quadratic residual-surface fitting.
//!
//! Each refinement round fits the matched residuals with a fixed-form
//! quadratic surface over z-scored coordinates:
//!
//! ```text
//! quad(c, x, y) = c0 + c1·x + c2·y + c3·x² + c4·x·y + c5·y²
//! ```
//!
//! The model is linear in its six coefficients, so the sum-of-squares minimum
//! is found by a direct SVD least-squares solve. Rank-deficient systems (for
//! example, fewer kept matches than coefficients) still yield the minimum-norm
//! solution that fits the data exactly where possible.
//!
//! The RA and Dec axes are fitted independently against the same normalized
//! coordinates with different residual targets.

use std::fmt;

use nalgebra::{DMatrix, DVector};

use crate::error::RemasterError;

/// Number of coefficients in the quadratic surface.
pub const NUM_COEFFS: usize = 6;

/// Seed value used for every coefficient when the solve produces nothing
/// usable; small but nonzero so downstream evaluation stays well-defined.
pub const SEED_COEFF: f64 = 1e-5;

/// Which angular axis a fit targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Ra,
    Dec,
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Axis::Ra => write!(f, "ra"),
            Axis::Dec => write!(f, "dec"),
        }
    }
}

/// A fitted quadratic correction surface over normalized coordinates.
///
/// Coefficient order: constant, x, y, x², x·y, y².
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuadSurface {
    pub coeffs: [f64; NUM_COEFFS],
}

impl QuadSurface {
    pub fn new(coeffs: [f64; NUM_COEFFS]) -> Self {
        Self { coeffs }
    }

    /// The fallback surface: every coefficient at [`SEED_COEFF`].
    pub fn seed() -> Self {
        Self::new([SEED_COEFF; NUM_COEFFS])
    }

    /// Evaluate the surface at a normalized coordinate pair.
    #[inline]
    pub fn eval(&self, x: f64, y: f64) -> f64 {
        let c = &self.coeffs;
        c[0] + c[1] * x + c[2] * y + c[3] * x * x + c[4] * x * y + c[5] * y * y
    }
}

/// Outcome of a successful quadratic fit.
#[derive(Debug, Clone)]
pub struct QuadFit {
    pub surface: QuadSurface,
    /// Residual sum of squares achieved at the minimum.
    pub rss: f64,
}

/// Fit the quadratic surface minimizing `Σ (quad(c, x, y) − delta)²`.
///
/// `xnorm`, `ynorm`, and `delta` must have equal lengths. A solve that yields
/// non-finite coefficients (or an empty input) is reported as
/// [`RemasterError::FitNonConvergence`] carrying the seed surface as the
/// best-available fallback; callers treat that as non-fatal.
pub fn fit_quad(
    xnorm: &[f64],
    ynorm: &[f64],
    delta: &[f64],
    axis: Axis,
) -> Result<QuadFit, RemasterError> {
    assert_eq!(xnorm.len(), ynorm.len(), "xnorm/ynorm length mismatch");
    assert_eq!(xnorm.len(), delta.len(), "xnorm/delta length mismatch");

    let n = xnorm.len();
    let finite = |s: &[f64]| s.iter().all(|v| v.is_finite());
    if n == 0 || !finite(xnorm) || !finite(ynorm) || !finite(delta) {
        return Err(RemasterError::FitNonConvergence {
            axis,
            fallback: QuadSurface::seed(),
        });
    }

    let mut a = DMatrix::<f64>::zeros(n, NUM_COEFFS);
    let mut b = DVector::<f64>::zeros(n);
    for i in 0..n {
        let (x, y) = (xnorm[i], ynorm[i]);
        a[(i, 0)] = 1.0;
        a[(i, 1)] = x;
        a[(i, 2)] = y;
        a[(i, 3)] = x * x;
        a[(i, 4)] = x * y;
        a[(i, 5)] = y * y;
        b[i] = delta[i];
    }

    let svd = a.clone().svd(true, true);
    let coeffs = match svd.solve(&b, 1e-12) {
        Ok(c) if c.iter().all(|v| v.is_finite()) => c,
        _ => {
            return Err(RemasterError::FitNonConvergence {
                axis,
                fallback: QuadSurface::seed(),
            })
        }
    };

    let surface = QuadSurface::new([
        coeffs[0], coeffs[1], coeffs[2], coeffs[3], coeffs[4], coeffs[5],
    ]);
    let rss = (&a * &coeffs - &b).norm_squared();

    Ok(QuadFit { surface, rss })
}
