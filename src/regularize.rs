//! Track regularisation: segmenting an irregular fix stream into bursts.
//!
//! A burst is a maximal run of fixes whose consecutive gaps stay within
//! `[rate - tolerance, rate + tolerance]` of the target sampling rate. The
//! walker keeps the first fix, then for each candidate compares its gap from
//! the last retained fix: in-tolerance gaps extend the burst, short gaps are
//! skipped (no resampling below the target rate), long gaps close the burst
//! and open a new one at the candidate.

use crate::types::{Burst, BurstId, Fix};
use chrono::Duration;
use log::debug;

/// Parameters controlling burst segmentation.
#[derive(Clone, Debug)]
pub struct RegularizeOptions {
    /// Target sampling rate between retained fixes.
    pub rate: Duration,
    /// Acceptable deviation around `rate` for a gap to stay in-burst.
    pub tolerance: Duration,
    /// Bursts shorter than this are discarded (needs >= 2 for any step).
    pub min_burst_length: usize,
}

impl Default for RegularizeOptions {
    fn default() -> Self {
        Self {
            rate: Duration::hours(2),
            tolerance: Duration::minutes(15),
            min_burst_length: 3,
        }
    }
}

/// No burst survived segmentation and the minimum-length filter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InsufficientDataError {
    pub fixes: usize,
    pub bursts_before_filter: usize,
    pub min_burst_length: usize,
}

impl std::fmt::Display for InsufficientDataError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "no burst survived regularisation ({} fixes, {} bursts before the \
             min-length filter, min_burst_length={})",
            self.fixes, self.bursts_before_filter, self.min_burst_length
        )
    }
}

impl std::error::Error for InsufficientDataError {}

/// Segment a time-ordered fix sequence into bursts of evenly spaced fixes.
///
/// Fixes must belong to one individual and carry strictly increasing
/// timestamps. Returns the surviving bursts in time order, or
/// [`InsufficientDataError`] when none meets `min_burst_length`.
pub fn regularize(
    fixes: &[Fix],
    options: &RegularizeOptions,
) -> Result<Vec<Burst>, InsufficientDataError> {
    let lo = options.rate - options.tolerance;
    let hi = options.rate + options.tolerance;

    let mut bursts: Vec<Vec<Fix>> = Vec::new();
    let mut current: Vec<Fix> = Vec::new();

    for &fix in fixes {
        let Some(last) = current.last() else {
            current.push(fix);
            continue;
        };
        let gap = fix.t - last.t;
        if gap >= lo && gap <= hi {
            current.push(fix);
        } else if gap > hi {
            bursts.push(std::mem::take(&mut current));
            current.push(fix);
        }
        // gap < lo: oversampled fix, skip it and keep waiting.
    }
    if !current.is_empty() {
        bursts.push(current);
    }

    let before_filter = bursts.len();
    let kept: Vec<Burst> = bursts
        .into_iter()
        .filter(|b| b.len() >= options.min_burst_length)
        .enumerate()
        .map(|(i, fixes)| Burst {
            id: BurstId(i as u32),
            fixes,
        })
        .collect();

    debug!(
        "regularize: {} fixes -> {} bursts ({} before min-length filter)",
        fixes.len(),
        kept.len(),
        before_filter
    );

    if kept.is_empty() {
        return Err(InsufficientDataError {
            fixes: fixes.len(),
            bursts_before_filter: before_filter,
            min_burst_length: options.min_burst_length,
        });
    }
    Ok(kept)
}
