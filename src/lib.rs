//! Integrated step-selection analysis for animal GPS telemetry.
//!
//! The crate turns a cleaned, time-ordered stream of location fixes into a
//! fitted habitat-selection model: fixes are regularised into bursts, bursts
//! become steps (displacement, turning angle, elapsed time), movement
//! distributions are fitted by maximum likelihood, matched control steps are
//! drawn from them, covariates are sampled at every endpoint, and a
//! stratified conditional regression ties it all together.
//!
//! Raw ingestion, CRS handling, and raster storage stay outside: the core
//! sees fixes that are already planar and deduplicated, and reaches
//! environmental layers only through the [`covariates::CovariateSource`]
//! trait.

// Pipeline stages, upstream first.
pub mod regularize;
pub mod steps;
pub mod fit;
pub mod controls;
pub mod covariates;
pub mod model;

// Shared vocabulary and orchestration.
pub mod angle;
pub mod config;
pub mod pipeline;
pub mod types;

// --- High-level re-exports -------------------------------------------------

pub use crate::model::{compare, Comparison, Model, ModelPreference, Term};
pub use crate::pipeline::{PipelineError, SsfParams, SsfPipeline, SsfReport};
pub use crate::types::{Burst, Fix, Step};

/// Small prelude for quick experiments.
///
/// ```no_run
/// use issf::prelude::*;
/// use std::collections::HashMap;
///
/// # fn main() -> Result<(), issf::PipelineError> {
/// # let fixes: Vec<Fix> = Vec::new();
/// let source = |x: f64, y: f64| {
///     HashMap::from([("elevation".to_string(), Some(x + y))])
/// };
/// let pipeline = SsfPipeline::new(SsfParams::default());
/// let report = pipeline.run(&fixes, &source, &[Term::covariate("elevation")])?;
/// println!("AIC = {:.2}", report.model.aic());
/// # Ok(())
/// # }
/// ```
pub mod prelude {
    pub use crate::covariates::CovariateSource;
    pub use crate::model::Term;
    pub use crate::types::{Fix, IndividualId, Step};
    pub use crate::{SsfParams, SsfPipeline, SsfReport};
}
