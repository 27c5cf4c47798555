//! Synthetic trajectory builders for the end-to-end tests.

use chrono::{DateTime, Duration, TimeZone, Utc};
use issf::types::{Fix, IndividualId};
use rand::{rngs::StdRng, Rng, SeedableRng};
use rand_distr::Distribution;
use std::collections::HashMap;

pub fn track_start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()
}

/// Linear elevation ramp rising eastward, defined everywhere.
pub fn elevation_ramp(x: f64, _y: f64) -> HashMap<String, Option<f64>> {
    HashMap::from([("elevation".to_string(), Some(0.01 * x))])
}

/// A correlated random walk at an exact 2 h cadence whose mover prefers
/// high elevation: at every fix, several candidate displacements are drawn
/// from a gamma/von-Mises-like kernel and the highest-elevation endpoint
/// wins. Deterministic for a fixed seed.
pub fn selective_track(n_fixes: usize, seed: u64) -> Vec<Fix> {
    let mut rng = StdRng::seed_from_u64(seed);
    let length_kernel = rand_distr::Gamma::new(2.0, 100.0).unwrap();

    let mut fixes = Vec::with_capacity(n_fixes);
    let (mut x, mut y) = (0.0f64, 0.0f64);
    let mut heading = 0.0f64;
    for i in 0..n_fixes {
        fixes.push(Fix::new(
            IndividualId(1),
            track_start() + Duration::hours(2 * i as i64),
            x,
            y,
        ));

        let mut best: Option<(f64, f64, f64, f64)> = None;
        for _ in 0..8 {
            let sl: f64 = length_kernel.sample(&mut rng);
            let turn = rng.gen_range(-1.2..1.2);
            let b = heading + turn;
            let (cx, cy) = (x + sl * b.cos(), y + sl * b.sin());
            let score = elevation_ramp(cx, cy)["elevation"].unwrap();
            if best.map_or(true, |(s, ..)| score > s) {
                best = Some((score, cx, cy, b));
            }
        }
        let (_, cx, cy, b) = best.unwrap();
        x = cx;
        y = cy;
        heading = b;
    }
    fixes
}

/// Same cadence, but with a single `gap_hours` hole after `split_at` fixes.
pub fn track_with_gap(n_fixes: usize, split_at: usize, gap_hours: i64, seed: u64) -> Vec<Fix> {
    let mut fixes = selective_track(n_fixes, seed);
    for fix in fixes.iter_mut().skip(split_at) {
        fix.t += Duration::hours(gap_hours - 2);
    }
    fixes
}
