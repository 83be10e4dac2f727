//! Closed-form intersections of planes, cylinders, lines and circles.

use std::f64::consts::PI;

use opbrep_geom::{Circle3d, CylinderSurface, Curve3d, Line3d, Plane, Surface, SurfaceKind};
use opbrep_math::{Point3, Vec3};

/// Parallelism threshold on the sine of the angle between two directions.
const PARALLEL_TOL: f64 = 1e-10;

/// Result of a surface/surface intersection.
#[derive(Debug, Clone)]
pub enum SurfaceIntersection {
    /// The surfaces do not meet.
    Empty,
    /// The surfaces share their locus.
    Coincident,
    /// One line, parameterized by arc length.
    Line(Line3d),
    /// Two parallel lines.
    TwoLines(Line3d, Line3d),
    /// One circle.
    Circle(Circle3d),
    /// A configuration without a closed form here.
    Unsupported,
}

fn downcast_plane(s: &dyn Surface) -> Option<&Plane> {
    s.as_any().downcast_ref::<Plane>()
}

fn downcast_cylinder(s: &dyn Surface) -> Option<&CylinderSurface> {
    s.as_any().downcast_ref::<CylinderSurface>()
}

fn downcast_line(c: &dyn Curve3d) -> Option<&Line3d> {
    c.as_any().downcast_ref::<Line3d>()
}

fn downcast_circle(c: &dyn Curve3d) -> Option<&Circle3d> {
    c.as_any().downcast_ref::<Circle3d>()
}

/// Intersection of two surfaces.
pub fn intersect_surfaces(a: &dyn Surface, b: &dyn Surface, tol: f64) -> SurfaceIntersection {
    if a.same_locus(b, tol) {
        return SurfaceIntersection::Coincident;
    }
    match (a.surface_type(), b.surface_type()) {
        (SurfaceKind::Plane, SurfaceKind::Plane) => match (downcast_plane(a), downcast_plane(b)) {
            (Some(pa), Some(pb)) => plane_plane(pa, pb),
            _ => SurfaceIntersection::Unsupported,
        },
        (SurfaceKind::Plane, SurfaceKind::Cylinder) => match (downcast_plane(a), downcast_cylinder(b)) {
            (Some(p), Some(c)) => plane_cylinder(p, c, tol),
            _ => SurfaceIntersection::Unsupported,
        },
        (SurfaceKind::Cylinder, SurfaceKind::Plane) => match (downcast_cylinder(a), downcast_plane(b)) {
            (Some(c), Some(p)) => plane_cylinder(p, c, tol),
            _ => SurfaceIntersection::Unsupported,
        },
        (SurfaceKind::Cylinder, SurfaceKind::Cylinder) => match (downcast_cylinder(a), downcast_cylinder(b)) {
            (Some(c1), Some(c2)) => cylinder_cylinder(c1, c2, tol),
            _ => SurfaceIntersection::Unsupported,
        },
    }
}

// =============================================================================
// Surface / surface
// =============================================================================

fn plane_plane(a: &Plane, b: &Plane) -> SurfaceIntersection {
    let n1 = a.normal_dir.into_inner();
    let n2 = b.normal_dir.into_inner();
    let dir = n1.cross(&n2);
    if dir.norm() < PARALLEL_TOL {
        return SurfaceIntersection::Empty;
    }

    // Point of the line closest to the world origin.
    let d1 = n1.dot(&a.origin.coords);
    let d2 = n2.dot(&b.origin.coords);
    let n1n2 = n1.dot(&n2);
    let det = 1.0 - n1n2 * n1n2;
    let c1 = (d1 - d2 * n1n2) / det;
    let c2 = (d2 - d1 * n1n2) / det;
    SurfaceIntersection::Line(Line3d {
        origin: Point3::from(c1 * n1 + c2 * n2),
        direction: dir.normalize(),
    })
}

fn plane_cylinder(plane: &Plane, cyl: &CylinderSurface, tol: f64) -> SurfaceIntersection {
    let n = plane.normal_dir.into_inner();
    let axis = cyl.axis.into_inner();
    let cos_angle = n.dot(&axis);

    if (1.0 - cos_angle.abs()) < PARALLEL_TOL {
        // Plane across the axis: a circle starting on the seam.
        let t = plane.signed_distance(&cyl.center) / cos_angle;
        let center = cyl.center - t * axis;
        return SurfaceIntersection::Circle(Circle3d::with_frame(
            center,
            cyl.radius,
            axis,
            cyl.ref_dir.into_inner(),
        ));
    }

    if cos_angle.abs() < PARALLEL_TOL {
        let dist = plane.signed_distance(&cyl.center);
        if dist.abs() > cyl.radius + tol {
            return SurfaceIntersection::Empty;
        }
        let foot = cyl.center - dist * n;
        let lateral_dir = axis.cross(&n).normalize();
        let lateral = (cyl.radius * cyl.radius - dist * dist).max(0.0).sqrt();
        if lateral <= tol {
            return SurfaceIntersection::Line(Line3d {
                origin: foot,
                direction: axis,
            });
        }
        return SurfaceIntersection::TwoLines(
            Line3d {
                origin: foot + lateral * lateral_dir,
                direction: axis,
            },
            Line3d {
                origin: foot - lateral * lateral_dir,
                direction: axis,
            },
        );
    }

    SurfaceIntersection::Unsupported
}

fn cylinder_cylinder(a: &CylinderSurface, b: &CylinderSurface, tol: f64) -> SurfaceIntersection {
    let parallel = a.axis.as_ref().cross(b.axis.as_ref()).norm() < PARALLEL_TOL;
    if parallel && a.axis_distance(&b.center) > a.radius + b.radius + tol {
        return SurfaceIntersection::Empty;
    }
    SurfaceIntersection::Unsupported
}

// =============================================================================
// Curve / surface
// =============================================================================

/// Parameters where `curve` meets `surface`, unrestricted by any range.
///
/// Periodic curves report parameters in `[0, period)`. A curve lying on the
/// surface, or a pair without a closed form, gives no parameter.
pub fn intersect_curve_surface(curve: &dyn Curve3d, surface: &dyn Surface, tol: f64) -> Vec<f64> {
    if let Some(line) = downcast_line(curve) {
        if let Some(plane) = downcast_plane(surface) {
            return line_plane(line, plane).into_iter().collect();
        }
        if let Some(cyl) = downcast_cylinder(surface) {
            return line_cylinder(line, cyl);
        }
    }
    if let Some(circle) = downcast_circle(curve) {
        if let Some(plane) = downcast_plane(surface) {
            return circle_plane(circle, plane);
        }
        if let Some(cyl) = downcast_cylinder(surface) {
            return circle_cylinder(circle, cyl, tol);
        }
    }
    Vec::new()
}

fn line_plane(line: &Line3d, plane: &Plane) -> Option<f64> {
    let n = plane.normal_dir.into_inner();
    let d = line.direction.dot(&n);
    if d.abs() <= PARALLEL_TOL * line.direction.norm() {
        return None;
    }
    Some(n.dot(&(plane.origin - line.origin)) / d)
}

fn line_cylinder(line: &Line3d, cyl: &CylinderSurface) -> Vec<f64> {
    let a = cyl.axis.into_inner();
    let oc = line.origin - cyl.center;
    let d_perp = line.direction - line.direction.dot(&a) * a;
    let o_perp = oc - oc.dot(&a) * a;
    let qa = d_perp.norm_squared();
    if qa < PARALLEL_TOL * PARALLEL_TOL * line.direction.norm_squared() {
        return Vec::new();
    }
    let qb = 2.0 * d_perp.dot(&o_perp);
    let qc = o_perp.norm_squared() - cyl.radius * cyl.radius;
    let disc = qb * qb - 4.0 * qa * qc;
    if disc < 0.0 {
        return Vec::new();
    }
    let sq = disc.sqrt();
    if sq == 0.0 {
        return vec![-qb / (2.0 * qa)];
    }
    vec![(-qb - sq) / (2.0 * qa), (-qb + sq) / (2.0 * qa)]
}

fn normalize_angle(t: f64) -> f64 {
    let r = t.rem_euclid(2.0 * PI);
    if r >= 2.0 * PI {
        0.0
    } else {
        r
    }
}

/// Solve `a cos t + b sin t + c = 0`.
fn solve_trig(a: f64, b: f64, c: f64) -> Vec<f64> {
    let r = a.hypot(b);
    if r < PARALLEL_TOL {
        return Vec::new();
    }
    let phi = b.atan2(a);
    let k = -c / r;
    if k.abs() > 1.0 + 1e-12 {
        return Vec::new();
    }
    let delta = k.clamp(-1.0, 1.0).acos();
    if delta < 1e-12 {
        return vec![normalize_angle(phi)];
    }
    vec![normalize_angle(phi - delta), normalize_angle(phi + delta)]
}

fn circle_plane(circle: &Circle3d, plane: &Plane) -> Vec<f64> {
    let n = plane.normal_dir.into_inner();
    let a = circle.radius * circle.x_dir.dot(&n);
    let b = circle.radius * circle.y_dir.dot(&n);
    let c = n.dot(&(circle.center - plane.origin));
    solve_trig(a, b, c)
}

fn circle_cylinder(circle: &Circle3d, cyl: &CylinderSurface, tol: f64) -> Vec<f64> {
    let axis = cyl.axis.into_inner();
    if (1.0 - circle.normal.dot(&axis).abs()) >= PARALLEL_TOL {
        tracing::trace!("circle not across the cylinder axis");
        return Vec::new();
    }
    // Both circles lie in the same plane across the axis.
    let on_axis = cyl.center + (circle.center - cyl.center).dot(&axis) * axis;
    let d_vec: Vec3 = on_axis - circle.center;
    let d = d_vec.norm();
    let (r1, r2) = (circle.radius, cyl.radius);
    if d < tol || d > r1 + r2 + tol || d < (r1 - r2).abs() - tol {
        return Vec::new();
    }
    let a = (r1 * r1 - r2 * r2 + d * d) / (2.0 * d);
    let h = (r1 * r1 - a * a).max(0.0).sqrt();
    let ex = d_vec / d;
    let ey = circle.normal.cross(&ex);
    let base = circle.center + a * ex;
    let mut out = Vec::new();
    for p in [base + h * ey, base - h * ey] {
        if let Some(t) = circle.project(&p) {
            if !out.iter().any(|x: &f64| (x - t).abs() < 1e-12) {
                out.push(t);
            }
        }
    }
    out
}
