use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Identifier of the tracked individual a fix belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IndividualId(pub u32);

/// Identifier of a burst within one individual's track.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BurstId(pub u32);

/// Identifier of a stratum: one observed step plus its matched controls.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StratumId(pub u32);

/// A single GPS location fix in a planar (distance-preserving) projection.
///
/// Timestamps are expected to be strictly increasing within an individual;
/// deduplication and CRS normalisation are the loader's responsibility.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Fix {
    pub individual: IndividualId,
    pub t: DateTime<Utc>,
    pub x: f64,
    pub y: f64,
}

impl Fix {
    pub fn new(individual: IndividualId, t: DateTime<Utc>, x: f64, y: f64) -> Self {
        Self { individual, t, x, y }
    }
}

/// A maximal run of fixes sampled at a consistent target interval.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Burst {
    pub id: BurstId,
    pub fixes: Vec<Fix>,
}

impl Burst {
    pub fn len(&self) -> usize {
        self.fixes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fixes.is_empty()
    }
}

/// Covariate values sampled at a step endpoint. `None` marks coordinates the
/// sampler could not cover (outside the raster, masked cells, ...).
pub type CovariateMap = HashMap<String, Option<f64>>;

/// Displacement between two consecutive fixes within a burst, or a simulated
/// alternative sharing an observed step's start point and time window.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Step {
    pub stratum: StratumId,
    /// `true` for the observed step, `false` for generated controls.
    pub case: bool,
    pub burst: BurstId,
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
    pub t1: DateTime<Utc>,
    pub t2: DateTime<Utc>,
    /// Euclidean step length in projection units.
    pub sl: f64,
    /// Absolute bearing of the displacement, radians in (-pi, pi].
    pub bearing: f64,
    /// Signed turning angle relative to the previous step's bearing.
    /// `None` for the first step of a burst, where no prior bearing exists.
    pub ta: Option<f64>,
    /// Environmental covariates sampled at the endpoint, if attached yet.
    #[serde(default)]
    pub covariates: CovariateMap,
}

impl Step {
    /// Elapsed time between the step's start and end fixes.
    pub fn dt(&self) -> Duration {
        self.t2 - self.t1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn step_dt_is_end_minus_start() {
        let t1 = Utc.with_ymd_and_hms(2024, 3, 1, 6, 0, 0).unwrap();
        let t2 = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();
        let step = Step {
            stratum: StratumId(0),
            case: true,
            burst: BurstId(0),
            x1: 0.0,
            y1: 0.0,
            x2: 3.0,
            y2: 4.0,
            t1,
            t2,
            sl: 5.0,
            bearing: 0.927,
            ta: None,
            covariates: CovariateMap::new(),
        };
        assert_eq!(step.dt(), Duration::hours(2));
    }
}
