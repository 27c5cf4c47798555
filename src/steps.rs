//! Step extraction: converting bursts into step records.
//!
//! Each burst of `n` fixes yields `n - 1` steps. The first step of a burst
//! carries no turning angle, since no prior bearing exists. Output order is
//! (burst, time) order; control generation later pairs strata by this order.

use crate::angle::{bearing, turn_angle};
use crate::types::{Burst, CovariateMap, Step, StratumId};
use log::debug;

/// Emit one step per consecutive fix pair of every burst.
///
/// Strata ids are assigned sequentially across the whole output so that each
/// observed step anchors exactly one stratum; all extracted steps are flagged
/// `case = true`.
pub fn extract_steps(bursts: &[Burst]) -> Vec<Step> {
    let mut steps = Vec::new();
    let mut stratum = 0u32;

    for burst in bursts {
        let mut prev_bearing: Option<f64> = None;
        for pair in burst.fixes.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            let dx = b.x - a.x;
            let dy = b.y - a.y;
            let brg = bearing(dx, dy);
            steps.push(Step {
                stratum: StratumId(stratum),
                case: true,
                burst: burst.id,
                x1: a.x,
                y1: a.y,
                x2: b.x,
                y2: b.y,
                t1: a.t,
                t2: b.t,
                sl: (dx * dx + dy * dy).sqrt(),
                bearing: brg,
                ta: prev_bearing.map(|p| turn_angle(p, brg)),
                covariates: CovariateMap::new(),
            });
            prev_bearing = Some(brg);
            stratum += 1;
        }
    }

    debug!(
        "extract_steps: {} bursts -> {} steps",
        bursts.len(),
        steps.len()
    );
    steps
}

/// Replace zero step lengths with a small positive `epsilon`.
///
/// A length-0 observation has zero density under any continuous step-length
/// distribution, so it must not reach the gamma fitter. Returns a new
/// collection; the input is left untouched.
pub fn replace_zero_lengths(steps: &[Step], epsilon: f64) -> Vec<Step> {
    let mut replaced = 0usize;
    let out: Vec<Step> = steps
        .iter()
        .map(|s| {
            if s.sl > 0.0 {
                s.clone()
            } else {
                replaced += 1;
                let mut s = s.clone();
                s.sl = epsilon;
                s
            }
        })
        .collect();
    if replaced > 0 {
        debug!("replace_zero_lengths: {replaced} zero-length steps set to {epsilon}");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BurstId, Fix, IndividualId};
    use approx::assert_abs_diff_eq;
    use chrono::{Duration, TimeZone, Utc};
    use std::f64::consts::PI;

    fn burst(points: &[(f64, f64)]) -> Burst {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        Burst {
            id: BurstId(0),
            fixes: points
                .iter()
                .enumerate()
                .map(|(i, &(x, y))| {
                    Fix::new(IndividualId(1), start + Duration::hours(2 * i as i64), x, y)
                })
                .collect(),
        }
    }

    #[test]
    fn n_fixes_yield_n_minus_one_steps() {
        let steps = extract_steps(&[burst(&[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)])]);
        assert_eq!(steps.len(), 3);
        assert!(steps.iter().all(|s| s.case));
        assert_eq!(steps[0].stratum, StratumId(0));
        assert_eq!(steps[2].stratum, StratumId(2));
    }

    #[test]
    fn first_step_of_a_burst_has_no_turn() {
        let steps = extract_steps(&[burst(&[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0)])]);
        assert!(steps[0].ta.is_none());
        // East then north is a quarter turn counter-clockwise.
        assert_abs_diff_eq!(steps[1].ta.unwrap(), PI / 2.0, epsilon = 1e-12);
    }

    #[test]
    fn lengths_and_shared_endpoints() {
        let steps = extract_steps(&[burst(&[(0.0, 0.0), (3.0, 4.0), (3.0, 7.0)])]);
        assert_abs_diff_eq!(steps[0].sl, 5.0, epsilon = 1e-12);
        assert_abs_diff_eq!(steps[1].sl, 3.0, epsilon = 1e-12);
        assert!(steps.iter().all(|s| s.sl >= 0.0 && s.dt() > Duration::zero()));
        // Consecutive steps share the endpoint -> start transition.
        assert_eq!((steps[0].x2, steps[0].y2), (steps[1].x1, steps[1].y1));
    }

    #[test]
    fn strata_run_across_bursts() {
        let mut b1 = burst(&[(0.0, 0.0), (1.0, 0.0), (2.0, 0.0)]);
        b1.id = BurstId(0);
        let mut b2 = burst(&[(5.0, 5.0), (6.0, 5.0)]);
        b2.id = BurstId(1);
        let steps = extract_steps(&[b1, b2]);
        assert_eq!(steps.len(), 3);
        assert_eq!(steps[2].burst, BurstId(1));
        assert_eq!(steps[2].stratum, StratumId(2));
        // First step of the second burst starts a fresh bearing history.
        assert!(steps[2].ta.is_none());
    }

    #[test]
    fn zero_lengths_are_replaced_with_epsilon() {
        let steps = extract_steps(&[burst(&[(0.0, 0.0), (0.0, 0.0), (1.0, 0.0)])]);
        assert_eq!(steps[0].sl, 0.0);
        let cleaned = replace_zero_lengths(&steps, 0.1);
        assert_abs_diff_eq!(cleaned[0].sl, 0.1, epsilon = 1e-12);
        assert_abs_diff_eq!(cleaned[1].sl, 1.0, epsilon = 1e-12);
        // Input untouched.
        assert_eq!(steps[0].sl, 0.0);
    }
}
