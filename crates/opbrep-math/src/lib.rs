#![warn(missing_docs)]

//! Math types for the opbrep kernel.
//!
//! Thin wrappers around nalgebra: points, vectors, directions, rigid
//! transforms, bounding boxes and the precision constants shared by the
//! topological algorithms.

use nalgebra::{Matrix4, Unit, Vector2, Vector3, Vector4};
use serde::{Deserialize, Serialize};

/// A point in 3D space.
pub type Point3 = nalgebra::Point3<f64>;

/// A vector in 3D space.
pub type Vec3 = Vector3<f64>;

/// A unit (normalized) direction vector in 3D space.
pub type Dir3 = Unit<Vector3<f64>>;

/// A point in 2D parameter space.
pub type Point2 = nalgebra::Point2<f64>;

/// A vector in 2D space.
pub type Vec2 = Vector2<f64>;

/// Precision constants.
pub mod precision {
    /// Two points closer than this are the same point.
    pub const CONFUSION: f64 = 1e-7;
    /// Two directions closer than this angle (radians) are parallel.
    pub const ANGULAR: f64 = 1e-12;
    /// Additive margin applied to tolerances derived from measured deviations.
    pub const DTOLERANCE: f64 = 1e-12;
    /// Parametric confusion on curves and surfaces.
    pub const PCONFUSION: f64 = 1e-9;
}

/// A 4x4 affine transformation matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct Transform {
    /// The underlying 4x4 matrix.
    pub matrix: Matrix4<f64>,
}

impl Transform {
    /// Identity transform.
    pub fn identity() -> Self {
        Self {
            matrix: Matrix4::identity(),
        }
    }

    /// Translation by `(dx, dy, dz)`.
    pub fn translation(dx: f64, dy: f64, dz: f64) -> Self {
        let mut m = Matrix4::identity();
        m[(0, 3)] = dx;
        m[(1, 3)] = dy;
        m[(2, 3)] = dz;
        Self { matrix: m }
    }

    /// Compose: `self` then `other` in matrix order (`self * other`).
    pub fn then(&self, other: &Transform) -> Self {
        Self {
            matrix: self.matrix * other.matrix,
        }
    }

    /// True when the matrix is exactly the identity.
    pub fn is_identity(&self) -> bool {
        self.matrix == Matrix4::identity()
    }

    /// Transform a point.
    pub fn apply_point(&self, p: &Point3) -> Point3 {
        let v = self.matrix * Vector4::new(p.x, p.y, p.z, 1.0);
        Point3::new(v.x, v.y, v.z)
    }

    /// Transform a direction vector (translation ignored).
    pub fn apply_vec(&self, v: &Vec3) -> Vec3 {
        let r = self.matrix * Vector4::new(v.x, v.y, v.z, 0.0);
        Vec3::new(r.x, r.y, r.z)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

/// Tolerance constants for geometric comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tolerance {
    /// Linear distance tolerance.
    pub linear: f64,
    /// Angular tolerance in radians.
    pub angular: f64,
}

impl Tolerance {
    /// Kernel defaults: [`precision::CONFUSION`] and [`precision::ANGULAR`].
    pub const DEFAULT: Self = Self {
        linear: precision::CONFUSION,
        angular: precision::ANGULAR,
    };

    /// Check if two points are coincident within tolerance.
    pub fn points_equal(&self, a: &Point3, b: &Point3) -> bool {
        (a - b).norm() <= self.linear
    }

    /// Check if a scalar distance is effectively zero.
    pub fn is_zero(&self, d: f64) -> bool {
        d.abs() <= self.linear
    }

    /// Check if two directions are parallel (same or opposite sense).
    pub fn is_parallel(&self, a: &Vec3, b: &Vec3) -> bool {
        let (na, nb) = (a.norm(), b.norm());
        if na <= 0.0 || nb <= 0.0 {
            return false;
        }
        a.cross(b).norm() / (na * nb) <= self.angular.max(1e-10)
    }
}

impl Default for Tolerance {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Signed angle from `d1` to `d2` measured around `reference`, in `(-π, π]`.
///
/// Both directions are expected to be roughly orthogonal to `reference`.
pub fn angle_with_ref(d1: &Vec3, d2: &Vec3, reference: &Vec3) -> f64 {
    let cross = d1.cross(d2);
    let sin = cross.norm();
    let cos = d1.dot(d2);
    let angle = sin.atan2(cos);
    if cross.dot(reference) < 0.0 {
        -angle
    } else {
        angle
    }
}

/// Axis-aligned bounding box in 3D.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb3 {
    /// Minimum corner.
    pub min: Point3,
    /// Maximum corner.
    pub max: Point3,
}

impl Aabb3 {
    /// Create an AABB from min and max corners.
    pub fn new(min: Point3, max: Point3) -> Self {
        Self { min, max }
    }

    /// Create an empty (inverted) AABB suitable for expansion.
    pub fn empty() -> Self {
        Self {
            min: Point3::new(f64::INFINITY, f64::INFINITY, f64::INFINITY),
            max: Point3::new(f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
        }
    }

    /// True if nothing has been added yet.
    pub fn is_void(&self) -> bool {
        self.min.x > self.max.x
    }

    /// Expand this AABB to include a point.
    pub fn include_point(&mut self, p: &Point3) {
        self.min = self.min.inf(p);
        self.max = self.max.sup(p);
    }

    /// Expand this AABB to include another one.
    pub fn include_box(&mut self, other: &Aabb3) {
        if other.is_void() {
            return;
        }
        self.include_point(&other.min);
        self.include_point(&other.max);
    }

    /// Test if two AABBs overlap (touching counts as overlap).
    pub fn overlaps(&self, other: &Aabb3) -> bool {
        !self.is_void()
            && !other.is_void()
            && self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }

    /// True if `p` is inside or on the box.
    pub fn contains_point(&self, p: &Point3) -> bool {
        p.x >= self.min.x
            && p.x <= self.max.x
            && p.y >= self.min.y
            && p.y <= self.max.y
            && p.z >= self.min.z
            && p.z <= self.max.z
    }

    /// Expand the AABB by a tolerance in all directions.
    pub fn expand(&mut self, tol: f64) {
        if self.is_void() {
            return;
        }
        let d = Vec3::new(tol, tol, tol);
        self.min -= d;
        self.max += d;
    }

    /// Length of the diagonal (0 for a void box).
    pub fn diagonal(&self) -> f64 {
        if self.is_void() {
            0.0
        } else {
            (self.max - self.min).norm()
        }
    }
}

impl Default for Aabb3 {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    #[test]
    fn test_translation() {
        let t = Transform::translation(10.0, 20.0, 30.0);
        let result = t.apply_point(&Point3::new(1.0, 2.0, 3.0));
        assert_relative_eq!(result, Point3::new(11.0, 22.0, 33.0), epsilon = 1e-12);
        assert!(!t.is_identity());
        assert!(Transform::identity().is_identity());
        let back = t.then(&Transform::translation(-10.0, -20.0, -30.0));
        assert!(back.is_identity());
    }

    #[test]
    fn test_tolerance_points_equal_is_inclusive() {
        let tol = Tolerance {
            linear: 0.5,
            angular: 1e-9,
        };
        let a = Point3::new(0.0, 0.0, 0.0);
        assert!(tol.points_equal(&a, &Point3::new(0.5, 0.0, 0.0)));
        assert!(!tol.points_equal(&a, &Point3::new(0.50001, 0.0, 0.0)));
    }

    #[test]
    fn test_parallel() {
        let tol = Tolerance::DEFAULT;
        assert!(tol.is_parallel(&Vec3::x(), &(-2.0 * Vec3::x())));
        assert!(!tol.is_parallel(&Vec3::x(), &Vec3::y()));
    }

    #[test]
    fn test_angle_with_ref() {
        let a = angle_with_ref(&Vec3::x(), &Vec3::y(), &Vec3::z());
        assert_relative_eq!(a, PI / 2.0, epsilon = 1e-12);
        let b = angle_with_ref(&Vec3::x(), &Vec3::y(), &-Vec3::z());
        assert_relative_eq!(b, -PI / 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_aabb_overlap_and_void() {
        let mut a = Aabb3::empty();
        assert!(a.is_void());
        a.include_point(&Point3::new(0.0, 0.0, 0.0));
        a.include_point(&Point3::new(1.0, 1.0, 1.0));
        let b = Aabb3::new(Point3::new(1.0, 0.0, 0.0), Point3::new(2.0, 1.0, 1.0));
        let c = Aabb3::new(Point3::new(1.5, 0.0, 0.0), Point3::new(2.0, 1.0, 1.0));
        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&c));
        assert!(!a.overlaps(&Aabb3::empty()));
        assert_relative_eq!(a.diagonal(), 3.0f64.sqrt(), epsilon = 1e-12);
    }
}
