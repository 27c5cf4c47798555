//! Gamma maximum-likelihood fit for step lengths.

use super::{FitError, MIN_OBSERVATIONS};
use serde::{Deserialize, Serialize};
use statrs::function::gamma::digamma;

/// Fitted gamma distribution over strictly positive step lengths.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GammaFit {
    pub shape: f64,
    pub scale: f64,
}

impl GammaFit {
    pub fn mean(&self) -> f64 {
        self.shape * self.scale
    }
}

/// Maximum-likelihood estimate of gamma shape and scale.
///
/// Uses the closed-form initialiser of Minka's profile-likelihood treatment,
/// `k0 = (3 - s + sqrt((s - 3)^2 + 24 s)) / (12 s)` with
/// `s = ln(mean) - mean(ln)`, then Newton steps on
/// `f(k) = ln(k) - psi(k) - s` within the supplied iteration budget. The
/// scale follows as `mean / shape`. Deterministic for a given input multiset.
pub fn fit_gamma(lengths: &[f64], max_iter: usize) -> Result<GammaFit, FitError> {
    if lengths.len() < MIN_OBSERVATIONS {
        return Err(FitError::TooFewObservations {
            found: lengths.len(),
            minimum: MIN_OBSERVATIONS,
        });
    }
    if let Some(&bad) = lengths.iter().find(|&&v| v <= 0.0 || !v.is_finite()) {
        return Err(FitError::NonPositiveLength { value: bad });
    }

    let n = lengths.len() as f64;
    let mean = lengths.iter().sum::<f64>() / n;
    let mean_ln = lengths.iter().map(|v| v.ln()).sum::<f64>() / n;
    let s = mean.ln() - mean_ln;

    // Jensen guarantees s >= 0, with equality only for constant data, where
    // the likelihood has no finite maximiser.
    if s <= 1e-12 {
        return Err(FitError::DegenerateData);
    }

    let mut shape = (3.0 - s + ((s - 3.0) * (s - 3.0) + 24.0 * s).sqrt()) / (12.0 * s);
    let mut converged = false;
    for _ in 0..max_iter {
        let f = shape.ln() - digamma(shape) - s;
        let fprime = 1.0 / shape - trigamma(shape);
        let next = shape - f / fprime;
        // The profile likelihood is unimodal; a Newton overshoot below zero
        // only happens from a poor region, so bisect toward it instead.
        let next = if next > 0.0 { next } else { shape / 2.0 };
        if (next - shape).abs() <= 1e-10 * shape.max(1.0) {
            shape = next;
            converged = true;
            break;
        }
        shape = next;
    }
    if !converged {
        return Err(FitError::NoConvergence {
            iterations: max_iter,
        });
    }

    Ok(GammaFit {
        shape,
        scale: mean / shape,
    })
}

/// Trigamma via the ascending recurrence and the asymptotic tail expansion.
fn trigamma(mut x: f64) -> f64 {
    let mut acc = 0.0;
    while x < 6.0 {
        acc += 1.0 / (x * x);
        x += 1.0;
    }
    let inv = 1.0 / x;
    let inv2 = inv * inv;
    acc + inv * (1.0 + inv * (0.5 + inv * (1.0 / 6.0 - inv2 * (1.0 / 30.0 - inv2 / 42.0))))
}
