//! Extrinsic 3-D positions.
//!
//! A [`Point3`] is the fixed embedding of a mesh vertex. Positions are
//! immutable once the mesh is built: edge flips change the intrinsic
//! connectivity and lengths, never the embedding.

use num_traits::Float;
use serde::{Deserialize, Serialize};

use super::util::distance3;

/// An extrinsic position in 3-D Euclidean space.
///
/// # Examples
///
/// ```rust
/// use flipout::geometry::point::Point3;
///
/// let p = Point3::new(3.0, 4.0, 0.0);
/// let q = Point3::origin();
/// assert_eq!(p.distance(&q), 5.0);
/// assert_eq!(p.coords(), [3.0, 4.0, 0.0]);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point3 {
    x: f64,
    y: f64,
    z: f64,
}

impl Point3 {
    /// Creates a new point from its coordinates.
    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// The origin `(0, 0, 0)`.
    #[must_use]
    pub const fn origin() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    /// Creates a point from any floating-point scalar type.
    ///
    /// Returns `None` when a coordinate cannot be represented as a finite
    /// `f64` (NaN, infinity, or a failed conversion).
    ///
    /// # Examples
    ///
    /// ```rust
    /// use flipout::geometry::point::Point3;
    ///
    /// let p = Point3::from_scalars(1.0_f32, 2.0, 3.0).unwrap();
    /// assert_eq!(p.coords(), [1.0, 2.0, 3.0]);
    /// assert!(Point3::from_scalars(f32::NAN, 0.0, 0.0).is_none());
    /// ```
    #[must_use]
    pub fn from_scalars<T: Float>(x: T, y: T, z: T) -> Option<Self> {
        let x = x.to_f64().filter(|v| v.is_finite())?;
        let y = y.to_f64().filter(|v| v.is_finite())?;
        let z = z.to_f64().filter(|v| v.is_finite())?;
        Some(Self::new(x, y, z))
    }

    /// Returns the x coordinate.
    #[inline]
    #[must_use]
    pub const fn x(&self) -> f64 {
        self.x
    }

    /// Returns the y coordinate.
    #[inline]
    #[must_use]
    pub const fn y(&self) -> f64 {
        self.y
    }

    /// Returns the z coordinate.
    #[inline]
    #[must_use]
    pub const fn z(&self) -> f64 {
        self.z
    }

    /// Returns the coordinates as an array.
    #[inline]
    #[must_use]
    pub const fn coords(&self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }

    /// Euclidean distance to another point.
    #[must_use]
    pub fn distance(&self, other: &Self) -> f64 {
        distance3(self.coords(), other.coords())
    }

    /// The displacement vector from `self` to `other`.
    #[must_use]
    pub fn vector_to(&self, other: &Self) -> [f64; 3] {
        [other.x - self.x, other.y - self.y, other.z - self.z]
    }
}

impl From<[f64; 3]> for Point3 {
    #[inline]
    fn from(coords: [f64; 3]) -> Self {
        Self::new(coords[0], coords[1], coords[2])
    }
}

impl From<Point3> for [f64; 3] {
    #[inline]
    fn from(point: Point3) -> Self {
        point.coords()
    }
}
