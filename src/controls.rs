//! Control-step generation: the matched case-control sample.
//!
//! For every observed step with a defined turning angle, `n_controls`
//! alternatives are drawn from the fitted movement kernel. Controls share
//! the observed step's start point, time window, burst, and stratum; only
//! length and turning angle are resampled, and the endpoint follows from
//! `(x1, y1) + sl * (cos b, sin b)` with `b = previous_bearing + ta`.
//!
//! The random generator is always injected by the caller. A fixed seed
//! reproduces a bit-identical stratum set, which the tests rely on.

use crate::angle::wrap_signed;
use crate::fit::MovementDistributions;
use crate::types::{CovariateMap, Step};
use log::debug;
use rand::Rng;
use rand_distr::{Distribution, Gamma};
use std::f64::consts::PI;

/// Control generation was requested without a usable movement kernel.
#[derive(Clone, Debug, PartialEq)]
pub enum GenerationError {
    InvalidStepLengthModel { shape: f64, scale: f64 },
    InvalidTurnAngleModel { concentration: f64 },
    NoControlsRequested,
}

impl std::fmt::Display for GenerationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GenerationError::InvalidStepLengthModel { shape, scale } => {
                write!(f, "unusable step-length fit (shape={shape}, scale={scale})")
            }
            GenerationError::InvalidTurnAngleModel { concentration } => {
                write!(f, "unusable turning-angle fit (kappa={concentration})")
            }
            GenerationError::NoControlsRequested => {
                write!(f, "n_controls must be at least 1")
            }
        }
    }
}

impl std::error::Error for GenerationError {}

/// Draws matched control steps from a fitted movement kernel.
pub struct ControlGenerator {
    movement: MovementDistributions,
    n_controls: usize,
    length_sampler: Gamma<f64>,
}

impl ControlGenerator {
    /// Validate the fitted kernel and build a generator producing
    /// `n_controls` controls per observed step.
    pub fn new(
        movement: MovementDistributions,
        n_controls: usize,
    ) -> Result<Self, GenerationError> {
        if n_controls == 0 {
            return Err(GenerationError::NoControlsRequested);
        }
        let g = movement.step_length;
        if !(g.shape.is_finite() && g.shape > 0.0 && g.scale.is_finite() && g.scale > 0.0) {
            return Err(GenerationError::InvalidStepLengthModel {
                shape: g.shape,
                scale: g.scale,
            });
        }
        let kappa = movement.turn_angle.concentration;
        if !kappa.is_finite() || kappa < 0.0 {
            return Err(GenerationError::InvalidTurnAngleModel {
                concentration: kappa,
            });
        }
        let length_sampler = Gamma::new(g.shape, g.scale)
            .map_err(|_| GenerationError::InvalidStepLengthModel {
                shape: g.shape,
                scale: g.scale,
            })?;
        Ok(Self {
            movement,
            n_controls,
            length_sampler,
        })
    }

    /// Build the case-control sample: each observed step with a defined
    /// turning angle is emitted (case = true) followed by its `n_controls`
    /// generated alternatives (case = false), all sharing its stratum.
    ///
    /// First-of-burst steps carry no turning angle, so no stratum can be
    /// anchored on them; they are left out of the sample.
    pub fn generate<R: Rng>(&self, steps: &[Step], rng: &mut R) -> Vec<Step> {
        let mut out = Vec::new();
        let mut skipped = 0usize;

        for step in steps {
            let Some(ta_observed) = step.ta else {
                skipped += 1;
                continue;
            };
            // The previous step's bearing, recovered from this step's own
            // bearing and observed turn.
            let prev_bearing = wrap_signed(step.bearing - ta_observed);
            out.push(step.clone());
            for _ in 0..self.n_controls {
                let sl = self.length_sampler.sample(rng);
                let ta = sample_von_mises(
                    self.movement.turn_angle.mean_direction,
                    self.movement.turn_angle.concentration,
                    rng,
                );
                let bearing = wrap_signed(prev_bearing + ta);
                out.push(Step {
                    stratum: step.stratum,
                    case: false,
                    burst: step.burst,
                    x1: step.x1,
                    y1: step.y1,
                    x2: step.x1 + sl * bearing.cos(),
                    y2: step.y1 + sl * bearing.sin(),
                    t1: step.t1,
                    t2: step.t2,
                    sl,
                    bearing,
                    ta: Some(ta),
                    covariates: CovariateMap::new(),
                });
            }
        }

        debug!(
            "generate: {} observed steps -> {} strata ({} first-of-burst skipped), {} rows",
            steps.len(),
            (out.len()) / (self.n_controls + 1),
            skipped,
            out.len()
        );
        out
    }

    pub fn n_controls(&self) -> usize {
        self.n_controls
    }
}

/// Best-Fisher rejection sampler for the von Mises distribution.
///
/// Near-zero concentration degenerates to the circular uniform.
fn sample_von_mises<R: Rng>(mu: f64, kappa: f64, rng: &mut R) -> f64 {
    if kappa < 1e-7 {
        return wrap_signed(mu + rng.gen_range(-PI..PI));
    }

    let a = 1.0 + (1.0 + 4.0 * kappa * kappa).sqrt();
    let b = (a - (2.0 * a).sqrt()) / (2.0 * kappa);
    let r = (1.0 + b * b) / (2.0 * b);

    let f = loop {
        let u1: f64 = rng.gen();
        let z = (PI * u1).cos();
        let f = (1.0 + r * z) / (r + z);
        let c = kappa * (r - f);
        let u2: f64 = rng.gen();
        if c * (2.0 - c) - u2 > 0.0 || (c / u2).ln() + 1.0 - c >= 0.0 {
            break f;
        }
    };

    let u3: f64 = rng.gen();
    let sign = if u3 > 0.5 { 1.0 } else { -1.0 };
    wrap_signed(mu + sign * f.clamp(-1.0, 1.0).acos())
}
