//! Maximum-likelihood fitting of the movement distributions.
//!
//! Two families parameterise the control-step sampler: a gamma distribution
//! over step lengths and a von Mises distribution over turning angles. Both
//! fits are deterministic for a given input multiset; the only iteration is
//! the budgeted Newton polish of the gamma shape.

mod gamma;
mod von_mises;

pub use gamma::{fit_gamma, GammaFit};
pub use von_mises::{fit_von_mises, VonMisesFit};

use crate::types::Step;
use log::debug;
use serde::{Deserialize, Serialize};

/// Fewest observations either fitter accepts.
pub const MIN_OBSERVATIONS: usize = 2;

/// Distribution MLE failure. Terminal for the affected individual; the
/// caller decides whether to retry with adjusted regularisation settings.
#[derive(Clone, Debug, PartialEq)]
pub enum FitError {
    TooFewObservations { found: usize, minimum: usize },
    NonPositiveLength { value: f64 },
    DegenerateData,
    NoConvergence { iterations: usize },
}

impl std::fmt::Display for FitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FitError::TooFewObservations { found, minimum } => {
                write!(f, "too few observations ({found} < {minimum})")
            }
            FitError::NonPositiveLength { value } => {
                write!(f, "non-positive step length {value} reached the gamma fitter")
            }
            FitError::DegenerateData => {
                write!(f, "observations are constant; the MLE is unbounded")
            }
            FitError::NoConvergence { iterations } => {
                write!(f, "shape update did not converge within {iterations} iterations")
            }
        }
    }
}

impl std::error::Error for FitError {}

/// Tagged view of a fitted distribution, for reports and serialized output.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FittedDistribution {
    Gamma { shape: f64, scale: f64 },
    VonMises { mean_direction: f64, concentration: f64 },
}

impl From<GammaFit> for FittedDistribution {
    fn from(fit: GammaFit) -> Self {
        FittedDistribution::Gamma {
            shape: fit.shape,
            scale: fit.scale,
        }
    }
}

impl From<VonMisesFit> for FittedDistribution {
    fn from(fit: VonMisesFit) -> Self {
        FittedDistribution::VonMises {
            mean_direction: fit.mean_direction,
            concentration: fit.concentration,
        }
    }
}

/// The fitted movement kernel: step-length gamma plus turning-angle von
/// Mises. Parameterises the control-step generator.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct MovementDistributions {
    pub step_length: GammaFit,
    pub turn_angle: VonMisesFit,
}

impl MovementDistributions {
    /// Both fits in tagged form, step length first.
    pub fn tagged(&self) -> [FittedDistribution; 2] {
        [self.step_length.into(), self.turn_angle.into()]
    }
}

/// Fit both movement distributions from observed steps.
///
/// Step lengths must already have zero lengths replaced by an epsilon (see
/// `steps::replace_zero_lengths`); "no-turn" first steps are excluded from
/// the angular fit here.
pub fn fit_movement(steps: &[Step], max_iter: usize) -> Result<MovementDistributions, FitError> {
    let lengths: Vec<f64> = steps.iter().map(|s| s.sl).collect();
    let angles: Vec<f64> = steps.iter().filter_map(|s| s.ta).collect();

    let step_length = fit_gamma(&lengths, max_iter)?;
    let turn_angle = fit_von_mises(&angles)?;
    debug!(
        "fit_movement: gamma(shape={:.4}, scale={:.4}) von_mises(mu={:.4}, kappa={:.4})",
        step_length.shape, step_length.scale, turn_angle.mean_direction, turn_angle.concentration
    );
    Ok(MovementDistributions {
        step_length,
        turn_angle,
    })
}
