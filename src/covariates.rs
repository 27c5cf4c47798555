//! Covariate extraction at step endpoints.
//!
//! The raster (or whatever backs the environmental layers) lives outside the
//! core; it is reached only through [`CovariateSource`]. Sampling must be
//! deterministic for fixed coordinates and side-effect free from the
//! pipeline's point of view. Coordinates the source cannot cover yield
//! `None` per covariate, which the model fitter later treats as a missing
//! observation rather than a failure.

use crate::types::{CovariateMap, Step};
use log::debug;

/// External collaborator mapping planar coordinates to named covariates.
pub trait CovariateSource {
    fn sample(&self, x: f64, y: f64) -> CovariateMap;
}

/// Plain closures work as sources, which keeps tests and small callers free
/// of wrapper types.
impl<F> CovariateSource for F
where
    F: Fn(f64, f64) -> CovariateMap,
{
    fn sample(&self, x: f64, y: f64) -> CovariateMap {
        self(x, y)
    }
}

/// Attach covariates sampled at each step's endpoint.
///
/// Returns a new collection; the input steps are never mutated.
pub fn attach_covariates<S: CovariateSource>(steps: &[Step], source: &S) -> Vec<Step> {
    let out: Vec<Step> = steps
        .iter()
        .map(|s| {
            let mut s = s.clone();
            s.covariates = source.sample(s.x2, s.y2);
            s
        })
        .collect();
    debug!("attach_covariates: sampled {} step endpoints", out.len());
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BurstId, StratumId};
    use chrono::{Duration, TimeZone, Utc};
    use std::collections::HashMap;

    fn step(x2: f64, y2: f64) -> Step {
        let t1 = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        Step {
            stratum: StratumId(0),
            case: true,
            burst: BurstId(0),
            x1: 0.0,
            y1: 0.0,
            x2,
            y2,
            t1,
            t2: t1 + Duration::hours(2),
            sl: (x2 * x2 + y2 * y2).sqrt(),
            bearing: 0.0,
            ta: None,
            covariates: CovariateMap::new(),
        }
    }

    fn gradient_source(x: f64, y: f64) -> CovariateMap {
        let mut map = HashMap::new();
        // Linear elevation ramp, undefined west of the origin.
        map.insert(
            "elevation".to_string(),
            if x >= 0.0 { Some(x + 0.5 * y) } else { None },
        );
        map
    }

    #[test]
    fn endpoint_values_are_attached() {
        let steps = vec![step(10.0, 4.0), step(2.0, 0.0)];
        let sampled = attach_covariates(&steps, &gradient_source);
        assert_eq!(sampled[0].covariates["elevation"], Some(12.0));
        assert_eq!(sampled[1].covariates["elevation"], Some(2.0));
        // Input untouched.
        assert!(steps[0].covariates.is_empty());
    }

    #[test]
    fn uncovered_coordinates_yield_the_undefined_sentinel() {
        let sampled = attach_covariates(&[step(-5.0, 0.0)], &gradient_source);
        assert_eq!(sampled[0].covariates["elevation"], None);
    }

    #[test]
    fn sampling_is_idempotent() {
        let steps = vec![step(3.0, 3.0)];
        let once = attach_covariates(&steps, &gradient_source);
        let twice = attach_covariates(&once, &gradient_source);
        assert_eq!(once[0].covariates, twice[0].covariates);
    }
}
