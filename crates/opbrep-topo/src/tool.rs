//! Geometric accessors on shapes, with the shape location applied.

use std::sync::Arc;

use opbrep_geom::{CurveKind, CurveRef, SurfaceRef};
use opbrep_math::{Point2, Point3, Vec3};

use crate::explorer::explore;
use crate::shape::Geometry;
use crate::{Orientation, Shape, ShapeType};

/// Position of a vertex.
pub fn vertex_point(v: &Shape) -> Option<Point3> {
    match v.tshape().geometry() {
        Geometry::Point(p) => Some(v.location().apply_point(p)),
        _ => None,
    }
}

/// Curve and parameter range of an edge.
pub fn edge_curve(e: &Shape) -> Option<(CurveRef, f64, f64)> {
    match e.tshape().geometry() {
        Geometry::Curve { curve, first, last } => {
            let c = match e.location().transform() {
                None => curve.clone(),
                Some(t) => Arc::from(curve.transform(t)),
            };
            Some((c, *first, *last))
        }
        _ => None,
    }
}

/// Parameter range of an edge.
pub fn edge_range(e: &Shape) -> Option<(f64, f64)> {
    match e.tshape().geometry() {
        Geometry::Curve { first, last, .. } => Some((*first, *last)),
        _ => None,
    }
}

/// Supporting surface of a face.
pub fn face_surface(f: &Shape) -> Option<SurfaceRef> {
    match f.tshape().geometry() {
        Geometry::Surface(s) => Some(match f.location().transform() {
            None => s.clone(),
            Some(t) => Arc::from(s.transform(t)),
        }),
        _ => None,
    }
}

/// Start and end vertices of an edge in the curve direction, ignoring
/// the edge orientation.
pub fn edge_vertices(e: &Shape) -> Option<(Shape, Shape)> {
    let mut first = None;
    let mut last = None;
    let base = e.oriented(Orientation::Forward);
    for v in base.children() {
        match v.orientation() {
            Orientation::Forward => first = Some(v),
            Orientation::Reversed => last = Some(v),
            _ => {}
        }
    }
    Some((first?, last?))
}

/// Start and end vertices of an edge as traversed with its orientation.
pub fn edge_vertices_oriented(e: &Shape) -> Option<(Shape, Shape)> {
    let (a, b) = edge_vertices(e)?;
    if e.orientation() == Orientation::Reversed {
        Some((b, a))
    } else {
        Some((a, b))
    }
}

/// True when both ends of the edge are the same vertex.
pub fn is_closed_edge(e: &Shape) -> bool {
    edge_vertices(e).is_some_and(|(a, b)| a.is_same(&b))
}

/// Point on the edge at parameter `t`.
pub fn edge_point(e: &Shape, t: f64) -> Option<Point3> {
    let (c, _, _) = edge_curve(e)?;
    Some(c.evaluate(t))
}

/// Point at the middle of the edge range.
pub fn edge_mid_point(e: &Shape) -> Option<Point3> {
    let (c, f, l) = edge_curve(e)?;
    Some(c.evaluate(0.5 * (f + l)))
}

/// Tangent at `t`, flipped when the edge is reversed.
pub fn edge_tangent(e: &Shape, t: f64) -> Option<Vec3> {
    let (c, _, _) = edge_curve(e)?;
    let d = c.tangent(t);
    Some(if e.orientation() == Orientation::Reversed { -d } else { d })
}

/// Length of the edge.
pub fn edge_length(e: &Shape) -> f64 {
    let Some((c, f, l)) = edge_curve(e) else {
        return 0.0;
    };
    match c.curve_type() {
        CurveKind::Line => c.tangent(f).norm() * (l - f),
        CurveKind::Circle => {
            let n = 64;
            let mut len = 0.0;
            let mut prev = c.evaluate(f);
            for i in 1..=n {
                let p = c.evaluate(f + (l - f) * i as f64 / n as f64);
                len += (p - prev).norm();
                prev = p;
            }
            len
        }
    }
}

/// True when `e` appears twice in the wires of `f` with opposite orientations (a seam).
pub fn is_closed_on_face(e: &Shape, f: &Shape) -> bool {
    let mut fwd = false;
    let mut rev = false;
    for x in explore(f, ShapeType::Edge) {
        if x.is_same(e) {
            match x.orientation() {
                Orientation::Forward => fwd = true,
                Orientation::Reversed => rev = true,
                _ => {}
            }
        }
    }
    fwd && rev
}

/// Normal of the face at `uv`, flipped when the face is reversed.
pub fn face_normal(f: &Shape, uv: Point2) -> Option<Vec3> {
    let s = face_surface(f)?;
    let n = s.normal(uv).into_inner();
    Some(if f.orientation() == Orientation::Reversed { -n } else { n })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{make_edge, make_vertex};
    use opbrep_geom::{Circle3d, Line3d};
    use std::f64::consts::PI;

    #[test]
    fn test_vertices_follow_orientation() {
        let a = make_vertex(Point3::origin(), 1e-7);
        let b = make_vertex(Point3::new(2.0, 0.0, 0.0), 1e-7);
        let c: CurveRef = Arc::new(Line3d::from_points(Point3::origin(), Point3::new(2.0, 0.0, 0.0)));
        let e = make_edge(c, 0.0, 1.0, &a, &b, 1e-7).unwrap();
        let (s, t) = edge_vertices_oriented(&e.reversed()).unwrap();
        assert!(s.is_same(&b) && t.is_same(&a));
        assert!((edge_length(&e) - 2.0).abs() < 1e-12);
        assert!(!is_closed_edge(&e));
        assert!((edge_mid_point(&e).unwrap().x - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_circle_length() {
        let v = make_vertex(Point3::new(1.0, 0.0, 0.0), 1e-7);
        let c: CurveRef = Arc::new(Circle3d::new(Point3::origin(), 1.0));
        let e = make_edge(c, 0.0, 2.0 * PI, &v, &v, 1e-7).unwrap();
        assert!(is_closed_edge(&e));
        assert!((edge_length(&e) - 2.0 * PI).abs() < 1e-2);
    }
}
