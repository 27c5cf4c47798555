//! Angle utilities used across the step-selection pipeline.

use std::f64::consts::PI;

/// Wraps an angle into the range (-pi, pi].
#[inline]
pub fn wrap_signed(angle: f64) -> f64 {
    let mut norm = angle.rem_euclid(2.0 * PI);
    if norm > PI {
        norm -= 2.0 * PI;
    }
    norm
}

/// Bearing of the displacement `(dx, dy)`, radians in (-pi, pi].
///
/// `atan2` returns values in [-pi, pi]; the -pi endpoint is folded onto pi so
/// that bearings and turning angles share one wrapping convention.
#[inline]
pub fn bearing(dx: f64, dy: f64) -> f64 {
    let b = dy.atan2(dx);
    if b <= -PI {
        PI
    } else {
        b
    }
}

/// Signed turning angle from bearing `from` to bearing `to`, in (-pi, pi].
/// Positive values turn counter-clockwise.
#[inline]
pub fn turn_angle(from: f64, to: f64) -> f64 {
    wrap_signed(to - from)
}

/// Direction of the mean resultant vector of `angles`, together with the
/// mean resultant length in [0, 1]. Returns `None` for an empty slice.
pub fn circular_mean(angles: &[f64]) -> Option<(f64, f64)> {
    if angles.is_empty() {
        return None;
    }
    let (mut c, mut s) = (0.0f64, 0.0f64);
    for &a in angles {
        c += a.cos();
        s += a.sin();
    }
    let n = angles.len() as f64;
    let rbar = (c * c + s * s).sqrt() / n;
    Some((bearing(c, s), rbar))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn wrap_signed_basic() {
        assert_abs_diff_eq!(wrap_signed(0.5), 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(wrap_signed(PI), PI, epsilon = 1e-12);
        assert_abs_diff_eq!(wrap_signed(-PI), PI, epsilon = 1e-12);
        assert_abs_diff_eq!(wrap_signed(3.0 * PI), PI, epsilon = 1e-12);
        assert_abs_diff_eq!(wrap_signed(-0.25), -0.25, epsilon = 1e-12);
    }

    #[test]
    fn turn_angle_wraps_across_the_cut() {
        // 170 deg -> -170 deg is a 20 deg counter-clockwise turn.
        let from = 170f64.to_radians();
        let to = -170f64.to_radians();
        assert_abs_diff_eq!(turn_angle(from, to), 20f64.to_radians(), epsilon = 1e-12);
        assert_abs_diff_eq!(turn_angle(to, from), -20f64.to_radians(), epsilon = 1e-12);
    }

    #[test]
    fn bearing_cardinal_directions() {
        assert_abs_diff_eq!(bearing(1.0, 0.0), 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(bearing(0.0, 1.0), PI / 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(bearing(-1.0, 0.0), PI, epsilon = 1e-12);
        assert_abs_diff_eq!(bearing(0.0, -1.0), -PI / 2.0, epsilon = 1e-12);
    }

    #[test]
    fn circular_mean_of_symmetric_angles_is_zero() {
        let (mu, rbar) = circular_mean(&[0.4, -0.4]).unwrap();
        assert_abs_diff_eq!(mu, 0.0, epsilon = 1e-12);
        assert!(rbar > 0.9 && rbar < 1.0);
        assert!(circular_mean(&[]).is_none());
    }
}
