//! Norms, distances, and angle normalisation.
//!
//! This module provides numerically stable functions for the 3-D vector
//! arithmetic the mesh needs (extrinsic edge lengths, flip diagonals) and the
//! angle normalisation the signpost index needs.

use num_traits::Float;

/// Full turn in radians.
pub const TAU: f64 = std::f64::consts::TAU;

/// Compute the squared norm of a 3-D vector using generic arithmetic.
///
/// # Examples
///
/// ```rust
/// use flipout::geometry::util::squared_norm3;
///
/// assert_eq!(squared_norm3([1.0, 2.0, 2.0]), 9.0);
/// ```
#[must_use]
pub fn squared_norm3<T: Float>(v: [T; 3]) -> T {
    v[0] * v[0] + v[1] * v[1] + v[2] * v[2]
}

/// Compute the Euclidean norm of a 3-D vector.
///
/// Scales by the maximum absolute component before squaring to avoid
/// overflow and underflow near the extremes of the floating-point range.
///
/// # Examples
///
/// ```rust
/// use flipout::geometry::util::hypot3;
///
/// assert_eq!(hypot3([1.0, 2.0, 2.0]), 3.0);
/// assert!(hypot3([1e200_f64, 1e200, 0.0]).is_finite());
/// ```
#[must_use]
pub fn hypot3<T: Float>(v: [T; 3]) -> T {
    let max_abs = v[0].abs().max(v[1].abs()).max(v[2].abs());
    if max_abs == T::zero() {
        return T::zero();
    }
    let scaled = [v[0] / max_abs, v[1] / max_abs, v[2] / max_abs];
    max_abs * squared_norm3(scaled).sqrt()
}

/// Euclidean distance between two 3-D coordinate triples.
#[must_use]
pub fn distance3<T: Float>(a: [T; 3], b: [T; 3]) -> T {
    hypot3([a[0] - b[0], a[1] - b[1], a[2] - b[2]])
}

/// Normalise an angle into `[0, 2π)`.
///
/// Negative inputs wrap around; values of ±∞ or NaN propagate as NaN.
///
/// # Examples
///
/// ```rust
/// use flipout::geometry::util::normalize_angle;
/// use std::f64::consts::PI;
///
/// assert!((normalize_angle(-PI / 2.0) - 1.5 * PI).abs() < 1e-12);
/// assert!((normalize_angle(5.0 * PI) - PI).abs() < 1e-12);
/// ```
#[must_use]
pub fn normalize_angle(theta: f64) -> f64 {
    let wrapped = theta.rem_euclid(TAU);
    // rem_euclid can return exactly 2π when theta is a tiny negative number.
    if wrapped >= TAU { wrapped - TAU } else { wrapped }
}

/// Counter-clockwise angular difference from `from` to `to`, in `[0, 2π)`.
#[must_use]
pub fn ccw_difference(from: f64, to: f64) -> f64 {
    normalize_angle(to - from)
}
