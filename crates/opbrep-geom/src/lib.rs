#![warn(missing_docs)]

//! Analytic surface and curve types for the opbrep kernel.
//!
//! This is the narrow geometric interface consumed by the topological
//! algorithms: evaluation, derivatives, point projection, ray intersection
//! and periodicity. Surfaces and curves are immutable and shared through
//! `Arc` by every shape that references them.

use std::any::Any;
use std::f64::consts::PI;
use std::sync::Arc;

use opbrep_math::{precision, Dir3, Point2, Point3, Transform, Vec3};

/// Shared handle to a surface.
pub type SurfaceRef = Arc<dyn Surface>;

/// Shared handle to a 3D curve.
pub type CurveRef = Arc<dyn Curve3d>;

// =============================================================================
// Surface types
// =============================================================================

/// The kind of a surface (for match-based dispatch).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SurfaceKind {
    /// Infinite plane.
    Plane,
    /// Cylindrical surface (infinite extent along axis).
    Cylinder,
}

/// A parametric surface in 3D space.
pub trait Surface: Send + Sync + std::fmt::Debug {
    /// Evaluate the surface at parameter `(u, v)` to get a 3D point.
    fn evaluate(&self, uv: Point2) -> Point3;

    /// Surface normal at parameter `(u, v)`, oriented as `d_du × d_dv`.
    fn normal(&self, uv: Point2) -> Dir3;

    /// Partial derivative with respect to u at `(u, v)`.
    fn d_du(&self, uv: Point2) -> Vec3;

    /// Partial derivative with respect to v at `(u, v)`.
    fn d_dv(&self, uv: Point2) -> Vec3;

    /// Parameter domain as `((u_min, u_max), (v_min, v_max))`.
    fn domain(&self) -> ((f64, f64), (f64, f64));

    /// The kind of this surface.
    fn surface_type(&self) -> SurfaceKind;

    /// Parameters of the point of the surface closest to `p`.
    ///
    /// For periodic surfaces `u` is returned in `[u_min, u_min + period)`.
    /// Returns `None` when the projection is not unique (e.g. a point on a
    /// cylinder axis).
    fn project(&self, p: &Point3) -> Option<Point2>;

    /// Intersections of the ray `origin + t * dir` (`t > 0`) with the
    /// surface, as `(t, uv)` pairs sorted by `t`.
    fn intersect_ray(&self, origin: &Point3, dir: &Vec3) -> Vec<(f64, Point2)>;

    /// Period in `u`, if the surface is closed in that direction.
    fn u_period(&self) -> Option<f64> {
        None
    }

    /// True when `other` describes the same locus within `tol`
    /// (orientation of the normal is not compared).
    fn same_locus(&self, other: &dyn Surface, tol: f64) -> bool;

    /// Downcast to a concrete type via `Any`.
    fn as_any(&self) -> &dyn Any;

    /// Apply an affine transform to this surface, returning a new surface.
    fn transform(&self, t: &Transform) -> Box<dyn Surface>;
}

// =============================================================================
// Plane
// =============================================================================

/// An infinite plane defined by an origin point and a coordinate frame.
///
/// Parameterization: `P(u, v) = origin + u * x_dir + v * y_dir`
#[derive(Debug, Clone)]
pub struct Plane {
    /// Origin point on the plane.
    pub origin: Point3,
    /// Unit vector along the u direction.
    pub x_dir: Dir3,
    /// Unit vector along the v direction.
    pub y_dir: Dir3,
    /// Unit normal (x_dir × y_dir).
    pub normal_dir: Dir3,
}

impl Plane {
    /// Create a plane from origin and two orthogonal direction vectors.
    pub fn new(origin: Point3, x_dir: Vec3, y_dir: Vec3) -> Self {
        let x = Dir3::new_normalize(x_dir);
        let n = Dir3::new_normalize(x_dir.cross(&y_dir));
        let y = Dir3::new_normalize(n.as_ref().cross(x.as_ref()));
        Self {
            origin,
            x_dir: x,
            y_dir: y,
            normal_dir: n,
        }
    }

    /// Create a plane from origin and normal. X/Y directions are chosen arbitrarily.
    pub fn from_normal(origin: Point3, normal: Vec3) -> Self {
        let n = Dir3::new_normalize(normal);
        let arbitrary = if n.as_ref().x.abs() < 0.9 {
            Vec3::x()
        } else {
            Vec3::y()
        };
        let x = Dir3::new_normalize(arbitrary.cross(n.as_ref()));
        let y = Dir3::new_normalize(n.as_ref().cross(x.as_ref()));
        Self {
            origin,
            x_dir: x,
            y_dir: y,
            normal_dir: n,
        }
    }

    /// XY plane at the origin.
    pub fn xy() -> Self {
        Self::new(Point3::origin(), Vec3::x(), Vec3::y())
    }

    /// Project a 3D point onto this plane's (u, v) parameter space.
    pub fn project_uv(&self, p: &Point3) -> Point2 {
        let d = p - self.origin;
        Point2::new(d.dot(self.x_dir.as_ref()), d.dot(self.y_dir.as_ref()))
    }

    /// Signed distance from a point to this plane.
    pub fn signed_distance(&self, p: &Point3) -> f64 {
        (p - self.origin).dot(self.normal_dir.as_ref())
    }
}

impl Surface for Plane {
    fn evaluate(&self, uv: Point2) -> Point3 {
        self.origin + uv.x * self.x_dir.as_ref() + uv.y * self.y_dir.as_ref()
    }

    fn normal(&self, _uv: Point2) -> Dir3 {
        self.normal_dir
    }

    fn d_du(&self, _uv: Point2) -> Vec3 {
        *self.x_dir.as_ref()
    }

    fn d_dv(&self, _uv: Point2) -> Vec3 {
        *self.y_dir.as_ref()
    }

    fn domain(&self) -> ((f64, f64), (f64, f64)) {
        ((-1e10, 1e10), (-1e10, 1e10))
    }

    fn surface_type(&self) -> SurfaceKind {
        SurfaceKind::Plane
    }

    fn project(&self, p: &Point3) -> Option<Point2> {
        Some(self.project_uv(p))
    }

    fn intersect_ray(&self, origin: &Point3, dir: &Vec3) -> Vec<(f64, Point2)> {
        let n = self.normal_dir.as_ref();
        let denom = dir.dot(n);
        if denom.abs() < 1e-14 {
            return Vec::new();
        }
        let t = (self.origin - origin).dot(n) / denom;
        if t <= 0.0 {
            return Vec::new();
        }
        let hit = origin + t * dir;
        vec![(t, self.project_uv(&hit))]
    }

    fn same_locus(&self, other: &dyn Surface, tol: f64) -> bool {
        let Some(p) = other.as_any().downcast_ref::<Plane>() else {
            return false;
        };
        let cross = self.normal_dir.as_ref().cross(p.normal_dir.as_ref()).norm();
        cross <= 1e-9 && self.signed_distance(&p.origin).abs() <= tol
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn transform(&self, t: &Transform) -> Box<dyn Surface> {
        let new_origin = t.apply_point(&self.origin);
        let new_x = t.apply_vec(self.x_dir.as_ref());
        let new_y = t.apply_vec(self.y_dir.as_ref());
        Box::new(Plane::new(new_origin, new_x, new_y))
    }
}

// =============================================================================
// Cylinder
// =============================================================================

/// A cylindrical surface defined by an axis line and radius.
///
/// Parameterization: `P(u, v) = center + radius * (cos(u) * ref_dir + sin(u) * y) + v * axis`
/// with `y = axis × ref_dir`. Periodic in `u` with period `2π`; the seam lies
/// at `u = 0`.
#[derive(Debug, Clone)]
pub struct CylinderSurface {
    /// Point on the axis where `v = 0`.
    pub center: Point3,
    /// Unit direction along the cylinder axis.
    pub axis: Dir3,
    /// Reference direction for u=0 (perpendicular to axis).
    pub ref_dir: Dir3,
    /// Radius of the cylinder.
    pub radius: f64,
}

impl CylinderSurface {
    /// Create a cylinder with axis along Z, centered at origin.
    pub fn new(radius: f64) -> Self {
        Self {
            center: Point3::origin(),
            axis: Dir3::new_normalize(Vec3::z()),
            ref_dir: Dir3::new_normalize(Vec3::x()),
            radius,
        }
    }

    /// Create a cylinder with a custom center and axis.
    pub fn with_axis(center: Point3, axis: Vec3, radius: f64) -> Self {
        let a = Dir3::new_normalize(axis);
        let arbitrary = if a.as_ref().x.abs() < 0.9 {
            Vec3::x()
        } else {
            Vec3::y()
        };
        let ref_dir = Dir3::new_normalize(arbitrary - arbitrary.dot(a.as_ref()) * a.as_ref());
        Self {
            center,
            axis: a,
            ref_dir,
            radius,
        }
    }

    fn y_dir(&self) -> Vec3 {
        self.axis.as_ref().cross(self.ref_dir.as_ref())
    }

    /// Distance from `p` to the cylinder axis.
    pub fn axis_distance(&self, p: &Point3) -> f64 {
        let d = p - self.center;
        (d - d.dot(self.axis.as_ref()) * self.axis.as_ref()).norm()
    }
}

impl Surface for CylinderSurface {
    fn evaluate(&self, uv: Point2) -> Point3 {
        let (sin_u, cos_u) = uv.x.sin_cos();
        self.center
            + self.radius * (cos_u * self.ref_dir.as_ref() + sin_u * self.y_dir())
            + uv.y * self.axis.as_ref()
    }

    fn normal(&self, uv: Point2) -> Dir3 {
        let (sin_u, cos_u) = uv.x.sin_cos();
        Dir3::new_normalize(cos_u * self.ref_dir.as_ref() + sin_u * self.y_dir())
    }

    fn d_du(&self, uv: Point2) -> Vec3 {
        let (sin_u, cos_u) = uv.x.sin_cos();
        self.radius * (-sin_u * self.ref_dir.as_ref() + cos_u * self.y_dir())
    }

    fn d_dv(&self, _uv: Point2) -> Vec3 {
        *self.axis.as_ref()
    }

    fn domain(&self) -> ((f64, f64), (f64, f64)) {
        ((0.0, 2.0 * PI), (-1e10, 1e10))
    }

    fn surface_type(&self) -> SurfaceKind {
        SurfaceKind::Cylinder
    }

    fn project(&self, p: &Point3) -> Option<Point2> {
        let d = p - self.center;
        let v = d.dot(self.axis.as_ref());
        let radial = d - v * self.axis.as_ref();
        if radial.norm() < precision::CONFUSION {
            return None;
        }
        let x = radial.dot(self.ref_dir.as_ref());
        let y = radial.dot(&self.y_dir());
        let mut u = y.atan2(x);
        if u < 0.0 {
            u += 2.0 * PI;
        }
        if u >= 2.0 * PI {
            u -= 2.0 * PI;
        }
        Some(Point2::new(u, v))
    }

    fn intersect_ray(&self, origin: &Point3, dir: &Vec3) -> Vec<(f64, Point2)> {
        let a = self.axis.as_ref();
        let oc = origin - self.center;
        let d_perp = dir - dir.dot(a) * a;
        let o_perp = oc - oc.dot(a) * a;
        let qa = d_perp.norm_squared();
        if qa < 1e-20 {
            return Vec::new();
        }
        let qb = 2.0 * d_perp.dot(&o_perp);
        let qc = o_perp.norm_squared() - self.radius * self.radius;
        let disc = qb * qb - 4.0 * qa * qc;
        if disc < 0.0 {
            return Vec::new();
        }
        let sq = disc.sqrt();
        let mut hits = Vec::new();
        for t in [(-qb - sq) / (2.0 * qa), (-qb + sq) / (2.0 * qa)] {
            if t > 0.0 {
                if let Some(uv) = self.project(&(origin + t * dir)) {
                    hits.push((t, uv));
                }
            }
        }
        if disc == 0.0 {
            hits.truncate(1);
        }
        hits
    }

    fn u_period(&self) -> Option<f64> {
        Some(2.0 * PI)
    }

    fn same_locus(&self, other: &dyn Surface, tol: f64) -> bool {
        let Some(c) = other.as_any().downcast_ref::<CylinderSurface>() else {
            return false;
        };
        self.axis.as_ref().cross(c.axis.as_ref()).norm() <= 1e-9
            && (self.radius - c.radius).abs() <= tol
            && self.axis_distance(&c.center) <= tol
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn transform(&self, t: &Transform) -> Box<dyn Surface> {
        let new_center = t.apply_point(&self.center);
        let new_axis = t.apply_vec(self.axis.as_ref());
        let new_ref = t.apply_vec(self.ref_dir.as_ref());
        let scale = new_ref.norm();
        Box::new(CylinderSurface {
            center: new_center,
            axis: Dir3::new_normalize(new_axis),
            ref_dir: Dir3::new_normalize(new_ref),
            radius: self.radius * scale,
        })
    }
}

// =============================================================================
// Curve types
// =============================================================================

/// The kind of a 3D curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CurveKind {
    /// Straight line.
    Line,
    /// Circle.
    Circle,
}

/// A parametric curve in 3D space.
pub trait Curve3d: Send + Sync + std::fmt::Debug {
    /// Evaluate the curve at parameter `t` to get a 3D point.
    fn evaluate(&self, t: f64) -> Point3;

    /// Tangent vector at parameter `t`.
    fn tangent(&self, t: f64) -> Vec3;

    /// Natural parameter domain `(t_min, t_max)`.
    fn domain(&self) -> (f64, f64);

    /// The kind of this curve.
    fn curve_type(&self) -> CurveKind;

    /// Parameter of the point of the curve closest to `p`.
    ///
    /// Periodic curves return a value in `[t_min, t_min + period)`.
    fn project(&self, p: &Point3) -> Option<f64>;

    /// Period, if the curve is closed.
    fn period(&self) -> Option<f64> {
        None
    }

    /// Downcast to a concrete type via `Any`.
    fn as_any(&self) -> &dyn Any;

    /// Apply an affine transform to this curve, returning a new curve.
    fn transform(&self, t: &Transform) -> Box<dyn Curve3d>;
}

// =============================================================================
// Line3d
// =============================================================================

/// A 3D line defined by origin and direction.
///
/// Parameterization: `P(t) = origin + t * direction`
#[derive(Debug, Clone)]
pub struct Line3d {
    /// Point at `t = 0`.
    pub origin: Point3,
    /// Direction (magnitude determines speed).
    pub direction: Vec3,
}

impl Line3d {
    /// Create a line parameterized so `t=0` gives `start` and `t=1` gives `end`.
    pub fn from_points(start: Point3, end: Point3) -> Self {
        Self {
            origin: start,
            direction: end - start,
        }
    }
}

impl Curve3d for Line3d {
    fn evaluate(&self, t: f64) -> Point3 {
        self.origin + t * self.direction
    }

    fn tangent(&self, _t: f64) -> Vec3 {
        self.direction
    }

    fn domain(&self) -> (f64, f64) {
        (0.0, 1.0)
    }

    fn curve_type(&self) -> CurveKind {
        CurveKind::Line
    }

    fn project(&self, p: &Point3) -> Option<f64> {
        let len2 = self.direction.norm_squared();
        if len2 < 1e-24 {
            return None;
        }
        Some((p - self.origin).dot(&self.direction) / len2)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn transform(&self, t: &Transform) -> Box<dyn Curve3d> {
        Box::new(Line3d {
            origin: t.apply_point(&self.origin),
            direction: t.apply_vec(&self.direction),
        })
    }
}

// =============================================================================
// Circle3d
// =============================================================================

/// A circle in 3D space defined by center, frame and radius.
///
/// Parameterization: `P(t) = center + radius * (cos(t) * x_dir + sin(t) * y_dir)`
///
/// Where `t ∈ [0, 2π)`.
#[derive(Debug, Clone)]
pub struct Circle3d {
    /// Center of the circle.
    pub center: Point3,
    /// Radius.
    pub radius: f64,
    /// Reference direction for t=0.
    pub x_dir: Dir3,
    /// Second in-plane direction (normal × x_dir).
    pub y_dir: Dir3,
    /// Normal to the circle plane.
    pub normal: Dir3,
}

impl Circle3d {
    /// Create a circle in the XY plane centered at the given point.
    pub fn new(center: Point3, radius: f64) -> Self {
        Self {
            center,
            radius,
            x_dir: Dir3::new_normalize(Vec3::x()),
            y_dir: Dir3::new_normalize(Vec3::y()),
            normal: Dir3::new_normalize(Vec3::z()),
        }
    }

    /// Create a circle with the given normal whose `t = 0` point lies along `x_dir`.
    pub fn with_frame(center: Point3, radius: f64, normal: Vec3, x_dir: Vec3) -> Self {
        let n = Dir3::new_normalize(normal);
        let x = Dir3::new_normalize(x_dir - x_dir.dot(n.as_ref()) * n.as_ref());
        let y = Dir3::new_normalize(n.as_ref().cross(x.as_ref()));
        Self {
            center,
            radius,
            x_dir: x,
            y_dir: y,
            normal: n,
        }
    }
}

impl Curve3d for Circle3d {
    fn evaluate(&self, t: f64) -> Point3 {
        let (sin_t, cos_t) = t.sin_cos();
        self.center + self.radius * (cos_t * self.x_dir.as_ref() + sin_t * self.y_dir.as_ref())
    }

    fn tangent(&self, t: f64) -> Vec3 {
        let (sin_t, cos_t) = t.sin_cos();
        self.radius * (-sin_t * self.x_dir.as_ref() + cos_t * self.y_dir.as_ref())
    }

    fn domain(&self) -> (f64, f64) {
        (0.0, 2.0 * PI)
    }

    fn curve_type(&self) -> CurveKind {
        CurveKind::Circle
    }

    fn project(&self, p: &Point3) -> Option<f64> {
        let d = p - self.center;
        let x = d.dot(self.x_dir.as_ref());
        let y = d.dot(self.y_dir.as_ref());
        if x.hypot(y) < precision::CONFUSION {
            return None;
        }
        let mut t = y.atan2(x);
        if t < 0.0 {
            t += 2.0 * PI;
        }
        if t >= 2.0 * PI {
            t -= 2.0 * PI;
        }
        Some(t)
    }

    fn period(&self) -> Option<f64> {
        Some(2.0 * PI)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn transform(&self, t: &Transform) -> Box<dyn Curve3d> {
        let x = t.apply_vec(self.x_dir.as_ref());
        let scale = x.norm();
        Box::new(Circle3d::with_frame(
            t.apply_point(&self.center),
            self.radius * scale,
            t.apply_vec(self.normal.as_ref()),
            x,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plane_evaluate_and_project() {
        let p = Plane::xy();
        let pt = p.evaluate(Point2::new(3.0, 4.0));
        assert!((pt - Point3::new(3.0, 4.0, 0.0)).norm() < 1e-12);
        let uv = p.project(&Point3::new(5.0, 7.0, 99.0)).unwrap();
        assert!((uv.x - 5.0).abs() < 1e-12);
        assert!((uv.y - 7.0).abs() < 1e-12);
    }

    #[test]
    fn test_plane_ray() {
        let p = Plane::new(Point3::new(0.0, 0.0, 2.0), Vec3::x(), Vec3::y());
        let hits = p.intersect_ray(&Point3::origin(), &Vec3::z());
        assert_eq!(hits.len(), 1);
        assert!((hits[0].0 - 2.0).abs() < 1e-12);
        assert!(p.intersect_ray(&Point3::origin(), &-Vec3::z()).is_empty());
    }

    #[test]
    fn test_plane_same_locus_ignores_orientation() {
        let a = Plane::new(Point3::origin(), Vec3::x(), Vec3::y());
        let b = Plane::new(Point3::new(3.0, 1.0, 0.0), Vec3::y(), Vec3::x());
        let c = Plane::new(Point3::new(0.0, 0.0, 1.0), Vec3::x(), Vec3::y());
        assert!(a.same_locus(&b, 1e-7));
        assert!(!a.same_locus(&c, 1e-7));
    }

    #[test]
    fn test_cylinder_project_round_trip_on_seam() {
        let c = CylinderSurface::new(5.0);
        let uv = c.project(&Point3::new(5.0, 0.0, 3.0)).unwrap();
        assert!(uv.x.abs() < 1e-12);
        assert!((uv.y - 3.0).abs() < 1e-12);
        let back = c.project(&c.evaluate(Point2::new(1.5 * PI, 2.0))).unwrap();
        assert!((back.x - 1.5 * PI).abs() < 1e-12);
        assert!(c.project(&Point3::new(0.0, 0.0, 1.0)).is_none());
        assert_eq!(c.u_period(), Some(2.0 * PI));
    }

    #[test]
    fn test_cylinder_ray_two_hits() {
        let c = CylinderSurface::new(1.0);
        let hits = c.intersect_ray(&Point3::new(-5.0, 0.0, 0.5), &Vec3::x());
        assert_eq!(hits.len(), 2);
        assert!((hits[0].0 - 4.0).abs() < 1e-12);
        assert!((hits[1].0 - 6.0).abs() < 1e-12);
        let inside = c.intersect_ray(&Point3::new(0.0, 0.0, 0.5), &Vec3::x());
        assert_eq!(inside.len(), 1);
    }

    #[test]
    fn test_cylinder_transform() {
        let c = CylinderSurface::new(5.0);
        let c2 = c.transform(&Transform::translation(10.0, 0.0, 0.0));
        let pt = c2.evaluate(Point2::new(0.0, 0.0));
        assert!((pt.x - 15.0).abs() < 1e-10);
        assert!(c2.same_locus(&CylinderSurface::with_axis(Point3::new(10.0, 0.0, 7.0), Vec3::z(), 5.0), 1e-9));
    }

    #[test]
    fn test_line_project() {
        let line = Line3d::from_points(Point3::origin(), Point3::new(10.0, 0.0, 0.0));
        assert!((line.evaluate(0.5).x - 5.0).abs() < 1e-12);
        assert!((line.project(&Point3::new(2.5, 3.0, 0.0)).unwrap() - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_circle_project_periodic() {
        let circle = Circle3d::new(Point3::origin(), 5.0);
        assert!((circle.evaluate(0.0).x - 5.0).abs() < 1e-12);
        let t = circle.project(&Point3::new(0.0, -5.0, 0.0)).unwrap();
        assert!((t - 1.5 * PI).abs() < 1e-12);
        let frame = Circle3d::with_frame(Point3::origin(), 1.0, Vec3::z(), Vec3::y());
        assert!((frame.evaluate(0.0) - Point3::new(0.0, 1.0, 0.0)).norm() < 1e-12);
    }
}
