//! Step-selection pipeline orchestrating the full analysis for one
//! individual.
//!
//! Overview
//! - Regularises the fix stream into bursts at the target sampling rate.
//! - Extracts steps and substitutes an epsilon for zero lengths.
//! - Fits the movement kernel (gamma step lengths, von Mises turns).
//! - Draws matched control steps from the kernel with a seeded generator.
//! - Samples covariates at every endpoint through the injected source.
//! - Fits the stratified conditional regression over the requested terms.
//!
//! Each stage consumes an immutable input and produces a new collection;
//! nothing upstream is mutated. Individuals are independent: run one
//! pipeline instance per individual (each with its own seed) to process
//! them in parallel.

use crate::controls::{ControlGenerator, GenerationError};
use crate::covariates::{attach_covariates, CovariateSource};
use crate::fit::{fit_movement, FitError, MovementDistributions};
use crate::model::{fit, FitOptions, Model, ModelFitError, Term};
use crate::regularize::{regularize, InsufficientDataError, RegularizeOptions};
use crate::steps::{extract_steps, replace_zero_lengths};
use crate::types::Fix;
use chrono::Duration;
use log::debug;
use rand::{rngs::StdRng, SeedableRng};
use serde::Serialize;
use std::time::Instant;

/// Pipeline-wide parameters. No hidden globals: everything configurable
/// lives here, including the random seed.
#[derive(Clone, Debug)]
pub struct SsfParams {
    /// Target sampling rate between retained fixes.
    pub rate: Duration,
    /// Gap tolerance around `rate` before a burst breaks.
    pub tolerance: Duration,
    /// Minimum fixes per burst after segmentation.
    pub min_burst_length: usize,
    /// Control steps generated per observed step.
    pub n_controls: usize,
    /// Length substituted for zero-length steps before the gamma fit.
    pub zero_length_epsilon: f64,
    /// Iteration budget shared by the gamma shape update and the
    /// conditional-regression Newton solver.
    pub optimizer_max_iter: usize,
    /// AIC gap below which two models read as not decisively different.
    pub aic_threshold: f64,
    /// Significance level for the likelihood-ratio comparison.
    pub p_threshold: f64,
    /// Seed for the control-step generator; fixed seed, identical output.
    pub random_seed: u64,
}

impl Default for SsfParams {
    fn default() -> Self {
        Self {
            rate: Duration::hours(2),
            tolerance: Duration::minutes(15),
            min_burst_length: 3,
            n_controls: 10,
            zero_length_epsilon: 0.1,
            optimizer_max_iter: 100,
            aic_threshold: 2.0,
            p_threshold: 0.05,
            random_seed: 0,
        }
    }
}

/// Any stage failure, tagged by stage. Terminal for this individual; the
/// caller decides whether to retry with adjusted parameters or move on.
#[derive(Clone, Debug, PartialEq)]
pub enum PipelineError {
    InsufficientData(InsufficientDataError),
    Fit(FitError),
    Generation(GenerationError),
    Model(ModelFitError),
}

impl std::fmt::Display for PipelineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineError::InsufficientData(e) => write!(f, "regularisation: {e}"),
            PipelineError::Fit(e) => write!(f, "distribution fit: {e}"),
            PipelineError::Generation(e) => write!(f, "control generation: {e}"),
            PipelineError::Model(e) => write!(f, "model fit: {e}"),
        }
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PipelineError::InsufficientData(e) => Some(e),
            PipelineError::Fit(e) => Some(e),
            PipelineError::Generation(e) => Some(e),
            PipelineError::Model(e) => Some(e),
        }
    }
}

impl From<InsufficientDataError> for PipelineError {
    fn from(e: InsufficientDataError) -> Self {
        PipelineError::InsufficientData(e)
    }
}

impl From<FitError> for PipelineError {
    fn from(e: FitError) -> Self {
        PipelineError::Fit(e)
    }
}

impl From<GenerationError> for PipelineError {
    fn from(e: GenerationError) -> Self {
        PipelineError::Generation(e)
    }
}

impl From<ModelFitError> for PipelineError {
    fn from(e: ModelFitError) -> Self {
        PipelineError::Model(e)
    }
}

/// End-to-end result for one individual.
#[derive(Clone, Debug, Serialize)]
pub struct SsfReport {
    pub model: Model,
    pub movement: MovementDistributions,
    pub n_bursts: usize,
    pub n_observed_steps: usize,
    pub n_strata: usize,
    pub elapsed_ms: f64,
}

/// Single-individual step-selection pipeline.
pub struct SsfPipeline {
    params: SsfParams,
}

impl SsfPipeline {
    pub fn new(params: SsfParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &SsfParams {
        &self.params
    }

    /// Run the full pipeline over one individual's fix stream.
    ///
    /// `fixes` must be time ordered and deduplicated; `source` supplies
    /// covariates at arbitrary planar coordinates; `terms` selects the
    /// regression design. Deterministic end to end for fixed inputs and
    /// seed.
    pub fn run<S: CovariateSource>(
        &self,
        fixes: &[Fix],
        source: &S,
        terms: &[Term],
    ) -> Result<SsfReport, PipelineError> {
        let start = Instant::now();

        let bursts = regularize(
            fixes,
            &RegularizeOptions {
                rate: self.params.rate,
                tolerance: self.params.tolerance,
                min_burst_length: self.params.min_burst_length,
            },
        )?;

        let observed = extract_steps(&bursts);
        let observed = replace_zero_lengths(&observed, self.params.zero_length_epsilon);
        let movement = fit_movement(&observed, self.params.optimizer_max_iter)?;

        let generator = ControlGenerator::new(movement, self.params.n_controls)?;
        let mut rng = StdRng::seed_from_u64(self.params.random_seed);
        let sample = generator.generate(&observed, &mut rng);
        let n_strata = sample.len() / (self.params.n_controls + 1);

        let sample = attach_covariates(&sample, source);

        let model = fit(
            &sample,
            terms,
            &FitOptions {
                max_iter: self.params.optimizer_max_iter,
                expected_controls: Some(self.params.n_controls),
                ..Default::default()
            },
        )?;

        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
        debug!(
            "pipeline: {} fixes -> {} bursts -> {} steps -> {} strata in {:.2} ms",
            fixes.len(),
            bursts.len(),
            observed.len(),
            n_strata,
            elapsed_ms
        );

        Ok(SsfReport {
            model,
            movement,
            n_bursts: bursts.len(),
            n_observed_steps: observed.len(),
            n_strata,
            elapsed_ms,
        })
    }
}
