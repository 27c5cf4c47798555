//! Predictor terms for the stratified regression.
//!
//! Terms form a small tagged algebra instead of a parsed formula string:
//! raw covariates by name, the two movement transforms used by integrated
//! step-selection models (log step length, cosine turning angle), the raw
//! step length, and pairwise products. Validation against the available
//! covariate names happens before any likelihood work.

use super::DesignError;
use crate::types::Step;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One column of the design matrix.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Term {
    /// An environmental covariate attached at the step endpoint.
    Covariate { name: String },
    /// Step length in projection units.
    StepLength,
    /// Natural log of the step length.
    LogStepLength,
    /// Cosine of the turning angle.
    CosTurnAngle,
    /// Product of two terms.
    Interaction { a: Box<Term>, b: Box<Term> },
}

impl Term {
    pub fn covariate(name: impl Into<String>) -> Self {
        Term::Covariate { name: name.into() }
    }

    pub fn interaction(a: Term, b: Term) -> Self {
        Term::Interaction {
            a: Box::new(a),
            b: Box::new(b),
        }
    }

    /// Value of this term for one step, or `None` when an input the term
    /// needs is missing (unsampled covariate, undefined turning angle, or a
    /// non-positive length under the log transform).
    pub fn value(&self, step: &Step) -> Option<f64> {
        match self {
            Term::Covariate { name } => step.covariates.get(name).copied().flatten(),
            Term::StepLength => Some(step.sl),
            Term::LogStepLength => (step.sl > 0.0).then(|| step.sl.ln()),
            Term::CosTurnAngle => step.ta.map(f64::cos),
            Term::Interaction { a, b } => Some(a.value(step)? * b.value(step)?),
        }
    }

    /// Check every covariate this term references against the names the
    /// sampler actually produced.
    pub fn validate(&self, available: &HashSet<&str>) -> Result<(), DesignError> {
        match self {
            Term::Covariate { name } => {
                if available.contains(name.as_str()) {
                    Ok(())
                } else {
                    Err(DesignError::UnknownCovariate { name: name.clone() })
                }
            }
            Term::Interaction { a, b } => {
                a.validate(available)?;
                b.validate(available)
            }
            _ => Ok(()),
        }
    }
}

impl std::fmt::Display for Term {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Term::Covariate { name } => write!(f, "{name}"),
            Term::StepLength => write!(f, "sl"),
            Term::LogStepLength => write!(f, "log(sl)"),
            Term::CosTurnAngle => write!(f, "cos(ta)"),
            Term::Interaction { a, b } => write!(f, "{a}:{b}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BurstId, CovariateMap, StratumId};
    use approx::assert_abs_diff_eq;
    use chrono::{Duration, TimeZone, Utc};

    fn step(sl: f64, ta: Option<f64>, elevation: Option<f64>) -> Step {
        let t1 = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let mut covariates = CovariateMap::new();
        covariates.insert("elevation".into(), elevation);
        Step {
            stratum: StratumId(0),
            case: true,
            burst: BurstId(0),
            x1: 0.0,
            y1: 0.0,
            x2: sl,
            y2: 0.0,
            t1,
            t2: t1 + Duration::hours(2),
            sl,
            bearing: 0.0,
            ta,
            covariates,
        }
    }

    #[test]
    fn movement_terms_evaluate() {
        let s = step(100.0, Some(0.5), Some(1200.0));
        assert_abs_diff_eq!(Term::StepLength.value(&s).unwrap(), 100.0);
        assert_abs_diff_eq!(Term::LogStepLength.value(&s).unwrap(), 100.0f64.ln());
        assert_abs_diff_eq!(Term::CosTurnAngle.value(&s).unwrap(), 0.5f64.cos());
        assert_abs_diff_eq!(
            Term::covariate("elevation").value(&s).unwrap(),
            1200.0
        );
    }

    #[test]
    fn interactions_multiply() {
        let s = step(100.0, Some(0.0), Some(3.0));
        let term = Term::interaction(Term::covariate("elevation"), Term::LogStepLength);
        assert_abs_diff_eq!(term.value(&s).unwrap(), 3.0 * 100.0f64.ln());
    }

    #[test]
    fn missing_inputs_propagate_as_none() {
        let no_turn = step(100.0, None, Some(1.0));
        assert!(Term::CosTurnAngle.value(&no_turn).is_none());
        let unsampled = step(100.0, Some(0.1), None);
        assert!(Term::covariate("elevation").value(&unsampled).is_none());
        let inter = Term::interaction(Term::covariate("elevation"), Term::CosTurnAngle);
        assert!(inter.value(&unsampled).is_none());
    }

    #[test]
    fn validation_rejects_unknown_names() {
        let available: HashSet<&str> = ["elevation"].into();
        assert!(Term::covariate("elevation").validate(&available).is_ok());
        let err = Term::interaction(Term::covariate("snow"), Term::StepLength)
            .validate(&available)
            .unwrap_err();
        assert_eq!(
            err,
            DesignError::UnknownCovariate {
                name: "snow".into()
            }
        );
    }

    #[test]
    fn labels_render_the_formula_vocabulary() {
        let term = Term::interaction(Term::covariate("elevation"), Term::CosTurnAngle);
        assert_eq!(term.to_string(), "elevation:cos(ta)");
        assert_eq!(Term::LogStepLength.to_string(), "log(sl)");
    }
}
