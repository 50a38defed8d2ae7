//! Checked triangle primitives.
//!
//! Everything the intrinsic metric needs is derivable from edge lengths
//! alone: interior angles by the law of cosines, areas by Heron's formula,
//! and a canonical planar layout for unfolding a triangle into the plane.
//! All helpers validate their inputs and surface degeneracies as a typed
//! error instead of silently producing NaN.

use thiserror::Error;

/// Relative slack admitted before a triangle-inequality violation is treated
/// as degenerate rather than rounding noise.
const TRIANGLE_INEQUALITY_SLACK: f64 = 1e-12;

/// Errors raised by the triangle primitives.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum TriangleError {
    /// The side lengths cannot form a valid triangle.
    #[error("Degenerate triangle with side lengths {a}, {b}, {c}")]
    Degenerate {
        /// First side length.
        a: f64,
        /// Second side length.
        b: f64,
        /// Third side length.
        c: f64,
    },
}

fn check_sides(a: f64, b: f64, c: f64) -> Result<(), TriangleError> {
    let degenerate = TriangleError::Degenerate { a, b, c };
    if !(a > 0.0 && b > 0.0 && c > 0.0) {
        return Err(degenerate);
    }
    let slack = TRIANGLE_INEQUALITY_SLACK * (a + b + c);
    if a + b < c - slack || b + c < a - slack || c + a < b - slack {
        return Err(degenerate);
    }
    Ok(())
}

/// Interior angle between the sides of length `a` and `b`, opposite `c`.
///
/// Computed by the law of cosines; the cosine is clamped to `[-1, 1]` so
/// rounding near flat configurations cannot produce NaN.
///
/// # Errors
///
/// Returns [`TriangleError::Degenerate`] when a side is non-positive or the
/// lengths materially violate the triangle inequality.
///
/// # Examples
///
/// ```rust
/// use flipout::geometry::primitives::corner_angle_from_lengths;
/// use std::f64::consts::PI;
///
/// // Equilateral triangle: every corner is 60 degrees.
/// let angle = corner_angle_from_lengths(1.0, 1.0, 1.0).unwrap();
/// assert!((angle - PI / 3.0).abs() < 1e-12);
///
/// // 3-4-5 right triangle: the corner opposite the hypotenuse is 90 degrees.
/// let right = corner_angle_from_lengths(3.0, 4.0, 5.0).unwrap();
/// assert!((right - PI / 2.0).abs() < 1e-12);
/// ```
pub fn corner_angle_from_lengths(a: f64, b: f64, c: f64) -> Result<f64, TriangleError> {
    check_sides(a, b, c)?;
    let cosine = (a * a + b * b - c * c) / (2.0 * a * b);
    Ok(cosine.clamp(-1.0, 1.0).acos())
}

/// Triangle area from its three side lengths (Heron's formula).
///
/// The radicand is clamped at zero so near-degenerate triangles report a
/// zero area instead of NaN.
///
/// # Errors
///
/// Returns [`TriangleError::Degenerate`] when a side is non-positive or the
/// lengths materially violate the triangle inequality.
///
/// # Examples
///
/// ```rust
/// use flipout::geometry::primitives::area_from_lengths;
///
/// let area = area_from_lengths(3.0, 4.0, 5.0).unwrap();
/// assert!((area - 6.0).abs() < 1e-12);
/// ```
pub fn area_from_lengths(a: f64, b: f64, c: f64) -> Result<f64, TriangleError> {
    check_sides(a, b, c)?;
    let s = 0.5 * (a + b + c);
    let radicand = (s * (s - a) * (s - b) * (s - c)).max(0.0);
    Ok(radicand.sqrt())
}

/// Lays a triangle out in the plane from its side lengths.
///
/// The returned corners satisfy `|p0 p1| = a`, `|p1 p2| = b`, `|p2 p0| = c`,
/// with `p0` at the origin, `p1` on the positive x axis, and `p2` in the
/// upper half-plane (counter-clockwise winding).
///
/// # Errors
///
/// Returns [`TriangleError::Degenerate`] when the lengths cannot form a
/// triangle.
///
/// # Examples
///
/// ```rust
/// use flipout::geometry::primitives::lay_out_triangle;
///
/// let [p0, p1, p2] = lay_out_triangle(1.0, 1.0, 1.0).unwrap();
/// assert_eq!(p0, [0.0, 0.0]);
/// assert_eq!(p1, [1.0, 0.0]);
/// assert!((p2[0] - 0.5).abs() < 1e-12);
/// assert!(p2[1] > 0.0);
/// ```
pub fn lay_out_triangle(a: f64, b: f64, c: f64) -> Result<[[f64; 2]; 3], TriangleError> {
    // Corner at p0 lies between the sides of length a and c, opposite b.
    let angle = corner_angle_from_lengths(a, c, b)?;
    let p2 = [c * angle.cos(), c * angle.sin()];
    Ok([[0.0, 0.0], [a, 0.0], p2])
}

/// Intersects a ray with a segment in the plane.
///
/// Returns the parameters `(t_ray, t_seg)` such that
/// `origin + t_ray * dir == a + t_seg * (b - a)`, with `t_ray >= 0` and
/// `0 <= t_seg <= 1`, or `None` when the ray misses the segment or runs
/// parallel to it.
///
/// # Examples
///
/// ```rust
/// use flipout::geometry::primitives::ray_segment_intersection;
///
/// let hit = ray_segment_intersection([0.0, 0.0], [1.0, 0.0], [2.0, -1.0], [2.0, 1.0]);
/// assert_eq!(hit, Some((2.0, 0.5)));
///
/// let miss = ray_segment_intersection([0.0, 0.0], [0.0, 1.0], [2.0, -1.0], [2.0, 1.0]);
/// assert_eq!(miss, None);
/// ```
#[must_use]
pub fn ray_segment_intersection(
    origin: [f64; 2],
    dir: [f64; 2],
    a: [f64; 2],
    b: [f64; 2],
) -> Option<(f64, f64)> {
    let seg = [b[0] - a[0], b[1] - a[1]];
    let denom = dir[0] * seg[1] - dir[1] * seg[0];
    if denom.abs() < f64::EPSILON {
        return None;
    }
    let delta = [a[0] - origin[0], a[1] - origin[1]];
    let t_ray = (delta[0] * seg[1] - delta[1] * seg[0]) / denom;
    let t_seg = (delta[0] * dir[1] - delta[1] * dir[0]) / denom;
    if t_ray >= 0.0 && (0.0..=1.0).contains(&t_seg) {
        Some((t_ray, t_seg))
    } else {
        None
    }
}
