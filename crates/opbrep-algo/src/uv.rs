//! Parameter-space polygons of faces.
//!
//! Edges are sampled in 3D, projected onto the face surface and unwrapped
//! across the period of periodic surfaces so that every wire becomes one
//! closed polygon in `(u, v)`.

use std::f64::consts::PI;

use opbrep_geom::{CurveKind, SurfaceRef};
use opbrep_math::{Point2, Point3};
use opbrep_topo::tool::{edge_curve, face_surface};
use opbrep_topo::{explore, Orientation, Shape, ShapeType};

/// Segments used to sample a full circle.
pub const CIRCLE_SAMPLES: usize = 64;

/// Position of a parameter point relative to a set of loops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UvPosition {
    /// Strictly inside the material.
    Inside,
    /// Within tolerance of a loop.
    Boundary,
    /// Outside the material.
    Outside,
}

/// Points along an edge in traversal order, both ends included.
pub fn edge_polyline(edge: &Shape) -> Vec<Point3> {
    let Some((curve, first, last)) = edge_curve(edge) else {
        return Vec::new();
    };
    let n = match curve.curve_type() {
        CurveKind::Line => 1,
        CurveKind::Circle => ((CIRCLE_SAMPLES as f64) * (last - first) / (2.0 * PI)).ceil().max(2.0) as usize,
    };
    let mut pts: Vec<Point3> = (0..=n)
        .map(|i| curve.evaluate(first + (last - first) * i as f64 / n as f64))
        .collect();
    if edge.orientation() == Orientation::Reversed {
        pts.reverse();
    }
    pts
}

/// Shift `u` by whole periods so that it lies closest to `reference`.
pub fn unwrap_u(u: f64, reference: f64, period: f64) -> f64 {
    u + period * ((reference - u) / period).round()
}

/// Project 3D points onto `surface`, unwrapping `u` continuously from `prev_u`.
pub fn polyline_uv(surface: &SurfaceRef, points: &[Point3], mut prev_u: Option<f64>) -> Option<Vec<Point2>> {
    let period = surface.u_period();
    let mut out = Vec::with_capacity(points.len());
    for p in points {
        let mut uv = surface.project(p)?;
        if let (Some(per), Some(r)) = (period, prev_u) {
            uv.x = unwrap_u(uv.x, r, per);
        }
        prev_u = Some(uv.x);
        out.push(uv);
    }
    Some(out)
}

/// Closed polygon of `wire` on `surface`, following the wire orientation.
///
/// On periodic surfaces the polygon is shifted so its smallest `u` lies in
/// `[0, period)`.
pub fn wire_uv_loop(surface: &SurfaceRef, wire: &Shape) -> Vec<Point2> {
    let mut lp: Vec<Point2> = Vec::new();
    let mut prev = None;
    let mut edges = explore(wire, ShapeType::Edge);
    if wire.orientation() == Orientation::Reversed {
        edges.reverse();
    }
    for e in edges {
        let pts = edge_polyline(&e);
        let Some(uvs) = polyline_uv(surface, &pts, prev) else {
            continue;
        };
        prev = uvs.last().map(|p| p.x);
        let keep = uvs.len().saturating_sub(1);
        lp.extend(uvs.into_iter().take(keep));
    }
    if let Some(per) = surface.u_period() {
        normalize_periodic(&mut lp, per);
    }
    lp
}

fn normalize_periodic(lp: &mut [Point2], period: f64) {
    let Some(min_u) = lp.iter().map(|p| p.x).reduce(f64::min) else {
        return;
    };
    let k = (min_u / period + 1e-9).floor();
    if k != 0.0 {
        for p in lp.iter_mut() {
            p.x -= k * period;
        }
    }
}

/// Polygons of all wires of a face, outer wire first.
///
/// The face is taken Forward, so loops follow the surface orientation.
pub fn face_uv_loops(face: &Shape) -> Vec<Vec<Point2>> {
    let f = face.oriented(Orientation::Forward);
    let Some(surface) = face_surface(&f) else {
        return Vec::new();
    };
    explore(&f, ShapeType::Wire)
        .iter()
        .map(|w| wire_uv_loop(&surface, w))
        .filter(|lp| lp.len() >= 2)
        .collect()
}

/// Shoelace area; positive for counter-clockwise loops.
pub fn signed_area(poly: &[Point2]) -> f64 {
    let n = poly.len();
    let mut a = 0.0;
    for i in 0..n {
        let p = poly[i];
        let q = poly[(i + 1) % n];
        a += p.x * q.y - q.x * p.y;
    }
    0.5 * a
}

/// Distance from `p` to segment `[a, b]`.
pub fn segment_distance(p: Point2, a: Point2, b: Point2) -> f64 {
    let ab = b - a;
    let len2 = ab.norm_squared();
    if len2 < 1e-30 {
        return (p - a).norm();
    }
    let t = ((p - a).dot(&ab) / len2).clamp(0.0, 1.0);
    (p - (a + t * ab)).norm()
}

/// Even-odd classification of `p` against all loops.
pub fn classify_in_loops(loops: &[Vec<Point2>], p: Point2, tol: f64) -> UvPosition {
    let mut inside = false;
    for lp in loops {
        let n = lp.len();
        for i in 0..n {
            let a = lp[i];
            let b = lp[(i + 1) % n];
            if segment_distance(p, a, b) <= tol {
                return UvPosition::Boundary;
            }
            if (a.y > p.y) != (b.y > p.y) {
                let x = a.x + (p.y - a.y) * (b.x - a.x) / (b.y - a.y);
                if p.x < x {
                    inside = !inside;
                }
            }
        }
    }
    if inside {
        UvPosition::Inside
    } else {
        UvPosition::Outside
    }
}

/// Like [`classify_in_loops`], also trying `p` shifted by one period either way.
pub fn classify_uv(loops: &[Vec<Point2>], p: Point2, tol: f64, period: Option<f64>) -> UvPosition {
    let mut candidates = vec![p.x];
    if let Some(per) = period {
        candidates.push(p.x + per);
        candidates.push(p.x - per);
    }
    let mut best = UvPosition::Outside;
    for u in candidates {
        match classify_in_loops(loops, Point2::new(u, p.y), tol) {
            UvPosition::Inside => return UvPosition::Inside,
            UvPosition::Boundary => best = UvPosition::Boundary,
            UvPosition::Outside => {}
        }
    }
    best
}

/// Most scanlines tried by [`interior_uv`].
const MAX_SCANLINES: usize = 24;

/// Distance from `p` to the nearest loop segment.
fn clearance(loops: &[Vec<Point2>], p: Point2) -> f64 {
    let mut d = f64::INFINITY;
    for lp in loops {
        let n = lp.len();
        for i in 0..n {
            d = d.min(segment_distance(p, lp[i], lp[(i + 1) % n]));
        }
    }
    d
}

/// A point inside the material bounded by `loops`.
///
/// Horizontal scanlines are cast halfway between consecutive vertex
/// heights, so none passes through a vertex. Among the midpoints of the
/// inside intervals, the one farthest from every loop wins.
pub fn interior_uv(loops: &[Vec<Point2>]) -> Option<Point2> {
    let outer = loops.first()?;
    let v_min = outer.iter().map(|p| p.y).reduce(f64::min)?;
    let v_max = outer.iter().map(|p| p.y).reduce(f64::max)?;
    let mut heights: Vec<f64> = loops.iter().flatten().map(|p| p.y).collect();
    heights.sort_by(|a, b| a.total_cmp(b));
    heights.dedup_by(|a, b| (*a - *b).abs() <= 1e-12);

    let mut gaps: Vec<(f64, f64)> = heights
        .windows(2)
        .filter(|w| w[0] >= v_min && w[1] <= v_max)
        .map(|w| (w[1] - w[0], 0.5 * (w[0] + w[1])))
        .collect();
    gaps.sort_by(|a, b| b.0.total_cmp(&a.0));
    gaps.truncate(MAX_SCANLINES);

    let mut best: Option<(f64, Point2)> = None;
    for (_, v) in gaps {
        let mut xs = Vec::new();
        for lp in loops {
            let n = lp.len();
            for i in 0..n {
                let a = lp[i];
                let b = lp[(i + 1) % n];
                if (a.y > v) != (b.y > v) {
                    xs.push(a.x + (v - a.y) * (b.x - a.x) / (b.y - a.y));
                }
            }
        }
        xs.sort_by(|a, b| a.total_cmp(b));
        for pair in xs.chunks_exact(2) {
            if pair[1] - pair[0] <= 1e-12 {
                continue;
            }
            let p = Point2::new(0.5 * (pair[0] + pair[1]), v);
            let c = clearance(loops, p);
            if best.as_ref().map_or(true, |(b, _)| c > *b) {
                best = Some((c, p));
            }
        }
    }
    best.filter(|(c, _)| *c > 1e-12).map(|(_, p)| p)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use opbrep_primitives::{make_box, make_cylinder};

    fn square() -> Vec<Point2> {
        vec![
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(1.0, 1.0),
            Point2::new(0.0, 1.0),
        ]
    }

    #[test]
    fn test_unwrap_u() {
        assert_relative_eq!(unwrap_u(0.0, 6.2, 2.0 * PI), 2.0 * PI);
        assert_relative_eq!(unwrap_u(0.1, 0.0, 2.0 * PI), 0.1);
    }

    #[test]
    fn test_classify_square_with_hole() {
        let hole: Vec<Point2> = vec![
            Point2::new(0.4, 0.4),
            Point2::new(0.4, 0.6),
            Point2::new(0.6, 0.6),
            Point2::new(0.6, 0.4),
        ];
        let loops = vec![square(), hole];
        assert_eq!(classify_in_loops(&loops, Point2::new(0.2, 0.2), 1e-9), UvPosition::Inside);
        assert_eq!(classify_in_loops(&loops, Point2::new(0.5, 0.5), 1e-9), UvPosition::Outside);
        assert_eq!(classify_in_loops(&loops, Point2::new(1.0, 0.5), 1e-9), UvPosition::Boundary);
        let p = interior_uv(&loops).unwrap();
        assert_eq!(classify_in_loops(&loops, p, 1e-9), UvPosition::Inside);
    }

    #[test]
    fn test_interior_point_avoids_reflex_corner() {
        let l_shape = vec![
            Point2::new(0.5, 1.0),
            Point2::new(1.0, 1.0),
            Point2::new(1.0, 0.5),
            Point2::new(1.5, 0.5),
            Point2::new(1.5, 1.5),
            Point2::new(0.5, 1.5),
        ];
        let loops = vec![l_shape];
        let p = interior_uv(&loops).unwrap();
        assert_eq!(classify_in_loops(&loops, p, 1e-9), UvPosition::Inside);
        assert!(clearance(&loops, p) > 0.2);
    }

    #[test]
    fn test_interior_point_of_ring_with_hole_at_mid_height() {
        // hole edge at v = 0.5, the middle of the outer loop
        let hole: Vec<Point2> = vec![
            Point2::new(0.25, 0.25),
            Point2::new(0.25, 0.5),
            Point2::new(0.75, 0.5),
            Point2::new(0.75, 0.25),
        ];
        let loops = vec![square(), hole];
        let p = interior_uv(&loops).unwrap();
        assert_eq!(classify_in_loops(&loops, p, 1e-9), UvPosition::Inside);
        assert!(clearance(&loops, p) > 0.1);
    }

    #[test]
    fn test_box_faces_are_ccw() {
        let b = make_box(Point3::origin(), 1.0, 1.0, 1.0).unwrap();
        for f in explore(&b, ShapeType::Face) {
            let loops = face_uv_loops(&f);
            assert_eq!(loops.len(), 1);
            assert_relative_eq!(signed_area(&loops[0]), 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_cylinder_lateral_loop_spans_period() {
        let c = make_cylinder(Point3::origin(), 1.0, 2.0).unwrap();
        let lateral = explore(&c, ShapeType::Face)
            .into_iter()
            .find(|f| face_surface(f).is_some_and(|s| s.u_period().is_some()))
            .unwrap();
        let loops = face_uv_loops(&lateral);
        assert_eq!(loops.len(), 1);
        assert_relative_eq!(signed_area(&loops[0]), 4.0 * PI, epsilon = 1e-9);
        let p = interior_uv(&loops).unwrap();
        assert_relative_eq!(p.x, PI, epsilon = 1e-9);
    }
}
