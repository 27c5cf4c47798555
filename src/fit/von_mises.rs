//! Von Mises maximum-likelihood fit for turning angles.

use super::{FitError, MIN_OBSERVATIONS};
use crate::angle::circular_mean;
use serde::{Deserialize, Serialize};

/// Concentration assigned when all angles coincide and the MLE diverges.
const KAPPA_CAP: f64 = 1e6;

/// Fitted von Mises distribution over angles in (-pi, pi].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct VonMisesFit {
    pub mean_direction: f64,
    pub concentration: f64,
}

/// Maximum-likelihood estimate of the von Mises mean direction and
/// concentration.
///
/// The mean direction is the direction of the resultant vector; the
/// concentration inverts the mean resultant length through Fisher's
/// piecewise approximation of `A(kappa) = I1(kappa) / I0(kappa)`. Closed
/// form, hence deterministic for a given input multiset.
pub fn fit_von_mises(angles: &[f64]) -> Result<VonMisesFit, FitError> {
    if angles.len() < MIN_OBSERVATIONS {
        return Err(FitError::TooFewObservations {
            found: angles.len(),
            minimum: MIN_OBSERVATIONS,
        });
    }

    let (mean_direction, rbar) =
        circular_mean(angles).expect("non-empty by the length check above");
    Ok(VonMisesFit {
        mean_direction,
        concentration: concentration_from_rbar(rbar),
    })
}

fn concentration_from_rbar(rbar: f64) -> f64 {
    if rbar < 0.53 {
        2.0 * rbar + rbar.powi(3) + 5.0 * rbar.powi(5) / 6.0
    } else if rbar < 0.85 {
        -0.4 + 1.39 * rbar + 0.43 / (1.0 - rbar)
    } else {
        let denom = rbar.powi(3) - 4.0 * rbar.powi(2) + 3.0 * rbar;
        if denom <= 0.0 {
            KAPPA_CAP
        } else {
            (1.0 / denom).min(KAPPA_CAP)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};
    use std::f64::consts::PI;

    #[test]
    fn uniform_angles_give_near_zero_concentration() {
        let angles: Vec<f64> = (0..360)
            .map(|d| -PI + (d as f64 + 0.5) * (2.0 * PI / 360.0))
            .collect();
        let fit = fit_von_mises(&angles).unwrap();
        assert!(fit.concentration < 0.05, "kappa = {}", fit.concentration);
    }

    #[test]
    fn concentrated_angles_recover_the_mean_direction() {
        // Symmetric spread around 0.7 rad keeps the resultant on the mean.
        let angles: Vec<f64> = (-20..=20).map(|i| 0.7 + i as f64 * 0.01).collect();
        let fit = fit_von_mises(&angles).unwrap();
        assert_abs_diff_eq!(fit.mean_direction, 0.7, epsilon = 1e-9);
        assert!(fit.concentration > 10.0);
    }

    #[test]
    fn known_rbar_maps_through_fisher_approximation() {
        // rbar = 0.4 falls in the low branch: 2r + r^3 + 5 r^5 / 6.
        let expected = 2.0 * 0.4 + 0.4f64.powi(3) + 5.0 * 0.4f64.powi(5) / 6.0;
        assert_relative_eq!(
            super::concentration_from_rbar(0.4),
            expected,
            max_relative = 1e-12
        );
    }

    #[test]
    fn identical_angles_hit_the_concentration_cap() {
        let fit = fit_von_mises(&[0.3, 0.3, 0.3]).unwrap();
        assert_abs_diff_eq!(fit.mean_direction, 0.3, epsilon = 1e-9);
        assert_eq!(fit.concentration, KAPPA_CAP);
    }

    #[test]
    fn too_few_angles_fail() {
        assert_eq!(
            fit_von_mises(&[0.1]),
            Err(FitError::TooFewObservations {
                found: 1,
                minimum: MIN_OBSERVATIONS
            })
        );
    }

    #[test]
    fn fit_is_deterministic() {
        let angles = vec![0.2, -0.4, 1.0, 0.1, -0.2];
        assert_eq!(fit_von_mises(&angles), fit_von_mises(&angles));
    }
}
