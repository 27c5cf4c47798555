//! Stratified conditional regression: fitting and model comparison.
//!
//! The matched case-control design conditions the likelihood on each
//! stratum, so strata are eliminated rather than estimated; coefficients are
//! identified purely from within-stratum contrasts. See [`fit`] for the
//! Newton solver and [`compare`] for nested-model comparison.

mod compare;
mod fitter;
mod terms;

pub use compare::{compare, Comparison, ModelPreference, NotNestedError};
pub use fitter::{fit, FitOptions};
pub use terms::Term;

use crate::types::StratumId;
use serde::{Deserialize, Serialize};

/// A malformed stratum or an invalid set of predictor terms.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DesignError {
    NoTerms,
    UnknownCovariate { name: String },
    NoUsableStrata,
    StratumWithoutCase { stratum: StratumId },
    StratumWithMultipleCases { stratum: StratumId, found: usize },
    StratumWithoutControls { stratum: StratumId },
    ControlCountMismatch { stratum: StratumId, found: usize, expected: usize },
}

impl std::fmt::Display for DesignError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DesignError::NoTerms => write!(f, "no predictor terms supplied"),
            DesignError::UnknownCovariate { name } => {
                write!(f, "term references covariate '{name}' which no step carries")
            }
            DesignError::NoUsableStrata => {
                write!(f, "no stratum with complete observations remains")
            }
            DesignError::StratumWithoutCase { stratum } => {
                write!(f, "stratum {} has no observed (case) step", stratum.0)
            }
            DesignError::StratumWithMultipleCases { stratum, found } => {
                write!(f, "stratum {} has {found} case steps, expected 1", stratum.0)
            }
            DesignError::StratumWithoutControls { stratum } => {
                write!(f, "stratum {} has no control steps", stratum.0)
            }
            DesignError::ControlCountMismatch {
                stratum,
                found,
                expected,
            } => write!(
                f,
                "stratum {} has {found} control steps, expected {expected}",
                stratum.0
            ),
        }
    }
}

impl std::error::Error for DesignError {}

/// The Newton solver exhausted its iteration budget.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ConvergenceError {
    pub iterations: usize,
    pub last_gradient_norm: f64,
}

impl std::fmt::Display for ConvergenceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "optimizer did not converge within {} iterations (|grad| = {:.3e})",
            self.iterations, self.last_gradient_norm
        )
    }
}

impl std::error::Error for ConvergenceError {}

/// Failure modes of [`fit`].
#[derive(Clone, Debug, PartialEq)]
pub enum ModelFitError {
    Design(DesignError),
    Convergence(ConvergenceError),
}

impl std::fmt::Display for ModelFitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelFitError::Design(e) => write!(f, "design error: {e}"),
            ModelFitError::Convergence(e) => write!(f, "convergence error: {e}"),
        }
    }
}

impl std::error::Error for ModelFitError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ModelFitError::Design(e) => Some(e),
            ModelFitError::Convergence(e) => Some(e),
        }
    }
}

impl From<DesignError> for ModelFitError {
    fn from(e: DesignError) -> Self {
        ModelFitError::Design(e)
    }
}

impl From<ConvergenceError> for ModelFitError {
    fn from(e: ConvergenceError) -> Self {
        ModelFitError::Convergence(e)
    }
}

/// One fitted coefficient with its Wald standard error.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coefficient {
    pub term: String,
    pub estimate: f64,
    pub std_error: f64,
}

impl Coefficient {
    /// Wald z statistic of the coefficient against zero.
    pub fn z(&self) -> f64 {
        self.estimate / self.std_error
    }
}

/// A fitted stratified conditional regression. Immutable once produced.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Model {
    pub terms: Vec<Term>,
    pub coefficients: Vec<Coefficient>,
    pub log_likelihood: f64,
    /// Conditional log-likelihood at the zero coefficient vector.
    pub null_log_likelihood: f64,
    pub n_parameters: usize,
    /// Strata contributing to the likelihood.
    pub n_strata: usize,
    /// Strata dropped because missing covariates left them without a usable
    /// case/control contrast.
    pub n_strata_dropped: usize,
    pub iterations: usize,
}

impl Model {
    /// Akaike information criterion of the fitted model.
    pub fn aic(&self) -> f64 {
        2.0 * self.n_parameters as f64 - 2.0 * self.log_likelihood
    }
}
