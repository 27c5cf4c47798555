//! Likelihood-ratio comparison of nested fitted models.

use super::{Model, Term};
use serde::{Deserialize, Serialize};
use statrs::distribution::{ChiSquared, ContinuousCDF};

/// The requested comparison does not involve strictly nested models.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NotNestedError {
    /// Terms of the claimed-reduced model absent from the full model.
    pub missing_from_full: Vec<String>,
    pub full_terms: usize,
    pub reduced_terms: usize,
}

impl std::fmt::Display for NotNestedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.missing_from_full.is_empty() {
            write!(
                f,
                "reduced model is not a strict subset of the full model \
                 ({} vs {} terms)",
                self.reduced_terms, self.full_terms
            )
        } else {
            write!(
                f,
                "reduced model carries terms the full model lacks: {}",
                self.missing_from_full.join(", ")
            )
        }
    }
}

impl std::error::Error for NotNestedError {}

/// Result of a likelihood-ratio test between nested models.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Comparison {
    pub likelihood_ratio_stat: f64,
    pub df: usize,
    pub p_value: f64,
    pub aic_full: f64,
    pub aic_reduced: f64,
}

/// Caller-facing reading of a [`Comparison`] under supplied thresholds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelPreference {
    Full,
    Reduced,
    Undecided,
}

impl Comparison {
    /// Apply the caller's decision thresholds: an insignificant
    /// likelihood-ratio p-value reads as "added complexity not justified";
    /// otherwise the decisively lower AIC wins, and differences below
    /// `aic_threshold` stay undecided.
    pub fn verdict(&self, aic_threshold: f64, p_threshold: f64) -> ModelPreference {
        if self.p_value > p_threshold {
            return ModelPreference::Reduced;
        }
        if self.aic_full + aic_threshold <= self.aic_reduced {
            ModelPreference::Full
        } else if self.aic_reduced + aic_threshold <= self.aic_full {
            ModelPreference::Reduced
        } else {
            ModelPreference::Undecided
        }
    }
}

/// Likelihood-ratio test of `reduced` against `full`.
///
/// The reduced model's terms must be a strict subset of the full model's;
/// swapping the arguments, or comparing unrelated term sets, fails with
/// [`NotNestedError`]. Both models are read immutably; the p-value comes
/// from the chi-squared survival function on the parameter-count gap.
pub fn compare(full: &Model, reduced: &Model) -> Result<Comparison, NotNestedError> {
    let missing: Vec<String> = reduced
        .terms
        .iter()
        .filter(|&t| !full.terms.contains(t))
        .map(Term::to_string)
        .collect();
    if !missing.is_empty() || reduced.terms.len() >= full.terms.len() {
        return Err(NotNestedError {
            missing_from_full: missing,
            full_terms: full.terms.len(),
            reduced_terms: reduced.terms.len(),
        });
    }

    let df = full.n_parameters - reduced.n_parameters;
    let likelihood_ratio_stat =
        (2.0 * (full.log_likelihood - reduced.log_likelihood)).max(0.0);
    let p_value = ChiSquared::new(df as f64)
        .map(|chi| chi.sf(likelihood_ratio_stat))
        .unwrap_or(1.0);

    Ok(Comparison {
        likelihood_ratio_stat,
        df,
        p_value,
        aic_full: full.aic(),
        aic_reduced: reduced.aic(),
    })
}
