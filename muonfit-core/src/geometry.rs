//! Detector-frame vectors and containment volumes.
//!
//! All coordinates are in centimetres in a tank-centred frame. The tank
//! cylinder axis is `y` (height); `x`/`z` span the transverse plane and `z`
//! is the beam axis.

use std::ops::{Add, Mul, Neg, Sub};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Lengths below this are treated as zero.
pub const LENGTH_EPSILON: f64 = 1e-9;

/// Immutable 3-vector in the detector frame.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Vector3 {
    /// X coordinate (transverse).
    pub x: f64,
    /// Y coordinate (height).
    pub y: f64,
    /// Z coordinate (beam axis).
    pub z: f64,
}

impl Vector3 {
    /// Unit vector along the beam axis.
    pub const BEAM_AXIS: Self = Self::new(0.0, 0.0, 1.0);

    /// Creates a new vector.
    #[inline]
    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// The zero vector.
    #[inline]
    #[must_use]
    pub const fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    /// Dot product.
    #[inline]
    #[must_use]
    pub fn dot(&self, other: &Self) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    /// Cross product.
    #[inline]
    #[must_use]
    pub fn cross(&self, other: &Self) -> Self {
        Self::new(
            self.y * other.z - self.z * other.y,
            self.z * other.x - self.x * other.z,
            self.x * other.y - self.y * other.x,
        )
    }

    /// Euclidean length.
    #[inline]
    #[must_use]
    pub fn magnitude(&self) -> f64 {
        self.dot(self).sqrt()
    }

    /// Distance to another point.
    #[inline]
    #[must_use]
    pub fn distance(&self, other: &Self) -> f64 {
        (*self - *other).magnitude()
    }

    /// Unit vector in the same direction, or `None` for a zero-length vector.
    #[must_use]
    pub fn unit(&self) -> Option<Self> {
        let mag = self.magnitude();
        if mag < LENGTH_EPSILON || !mag.is_finite() {
            None
        } else {
            Some(*self * (1.0 / mag))
        }
    }

    /// Angle to another vector in `[0, π]`.
    ///
    /// Returns 0 when either vector has zero length.
    #[must_use]
    pub fn angle_to(&self, other: &Self) -> f64 {
        let norm = self.magnitude() * other.magnitude();
        if norm < LENGTH_EPSILON {
            return 0.0;
        }
        (self.dot(other) / norm).clamp(-1.0, 1.0).acos()
    }

    /// Radius in the transverse (x, z) plane.
    #[inline]
    #[must_use]
    pub fn transverse_radius(&self) -> f64 {
        self.x.hypot(self.z)
    }

    /// Returns true if every component is finite.
    #[inline]
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl Add for Vector3 {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vector3 {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Neg for Vector3 {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Self::new(-self.x, -self.y, -self.z)
    }
}

impl Mul<f64> for Vector3 {
    type Output = Self;

    #[inline]
    fn mul(self, rhs: f64) -> Self {
        Self::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl Mul<Vector3> for f64 {
    type Output = Vector3;

    #[inline]
    fn mul(self, rhs: Vector3) -> Vector3 {
        rhs * self
    }
}

impl From<[f64; 3]> for Vector3 {
    fn from(v: [f64; 3]) -> Self {
        Self::new(v[0], v[1], v[2])
    }
}

/// The tank-stage containment cylinder.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TankGeometry {
    /// Cylinder centre in the detector frame (cm).
    pub center: Vector3,
    /// Cylinder radius (cm).
    pub radius: f64,
    /// Half of the cylinder height along `y` (cm).
    pub half_height: f64,
}

impl Default for TankGeometry {
    fn default() -> Self {
        Self {
            center: Vector3::zero(),
            radius: 137.504,
            half_height: 128.33,
        }
    }
}

impl TankGeometry {
    /// Position relative to the tank centre.
    #[inline]
    #[must_use]
    pub fn relative(&self, point: &Vector3) -> Vector3 {
        *point - self.center
    }

    /// Returns true if the point lies inside the cylinder.
    ///
    /// The transverse boundary is exclusive, the end caps inclusive.
    #[must_use]
    pub fn contains(&self, point: &Vector3) -> bool {
        let p = self.relative(point);
        let r_sq = p.x * p.x + p.z * p.z;
        r_sq < self.radius * self.radius && p.y.abs() <= self.half_height
    }
}

/// An upright cylinder used for fiducial cuts, centred on the tank centre.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FiducialCylinder {
    /// Maximum transverse radius (cm, exclusive).
    pub radius: f64,
    /// Maximum |y| (cm, exclusive).
    pub half_height: f64,
}

impl FiducialCylinder {
    /// Creates a new fiducial cylinder.
    #[must_use]
    pub const fn new(radius: f64, half_height: f64) -> Self {
        Self {
            radius,
            half_height,
        }
    }

    /// Returns true if the tank-relative point lies strictly inside.
    #[must_use]
    pub fn contains(&self, relative: &Vector3) -> bool {
        relative.transverse_radius() < self.radius && relative.y.abs() < self.half_height
    }
}
