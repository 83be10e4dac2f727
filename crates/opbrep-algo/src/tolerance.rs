//! Tolerance correction.
//!
//! Every correction only raises tolerances. A raise targets the measured
//! deviation plus [`precision::DTOLERANCE`] and is capped at `tol_max`
//! unless the entity was already above it.

use opbrep_math::precision;
use opbrep_topo::tool::{edge_curve, edge_vertices, face_surface, vertex_point};
use opbrep_topo::{explore, map_shapes, Shape, ShapeType};
use rayon::prelude::*;

/// Number of interior samples used to measure an edge against a face.
const NB_CURVE_SAMPLES: usize = 23;

fn raise(shape: &Shape, deviation: f64, tol_max: f64) {
    raise_to(shape, deviation + precision::DTOLERANCE, tol_max);
}

fn raise_to(shape: &Shape, mut target: f64, tol_max: f64) {
    let current = shape.tolerance();
    if current <= tol_max {
        target = target.min(tol_max);
    }
    if target > current {
        tracing::trace!(?shape, current, target, "raising tolerance");
        shape.raise_tolerance(target);
    }
}

fn for_each<F>(items: &[Shape], parallel: bool, f: F)
where
    F: Fn(&Shape) + Send + Sync,
{
    if parallel {
        items.par_iter().for_each(f);
    } else {
        items.iter().for_each(f);
    }
}

/// Make every vertex tolerance cover the distance to the curve ends of the
/// edges it bounds.
pub fn correct_point_on_curve(shape: &Shape, tol_max: f64, parallel: bool) {
    let edges = map_shapes(shape, ShapeType::Edge).keys().to_vec();
    // Shared vertices are raised with an atomic max.
    for_each(&edges, parallel, |e| {
        let (Some((c, first, last)), Some((v1, v2))) = (edge_curve(e), edge_vertices(e)) else {
            return;
        };
        for (v, t) in [(v1, first), (v2, last)] {
            if let Some(p) = vertex_point(&v) {
                let d = (p - c.evaluate(t)).norm();
                if d > v.tolerance() {
                    raise(&v, d, tol_max);
                }
            }
        }
    });
}

/// Make every edge tolerance cover the distance from its curve to the
/// surfaces of the faces it bounds.
pub fn correct_curve_on_surface(shape: &Shape, tol_max: f64, parallel: bool) {
    let faces = map_shapes(shape, ShapeType::Face).keys().to_vec();
    for_each(&faces, parallel, |f| {
        let Some(surface) = face_surface(f) else {
            return;
        };
        for e in explore(f, ShapeType::Edge) {
            let Some((c, first, last)) = edge_curve(&e) else {
                continue;
            };
            let mut dev: f64 = 0.0;
            for i in 0..=NB_CURVE_SAMPLES + 1 {
                let p = c.evaluate(first + (last - first) * i as f64 / (NB_CURVE_SAMPLES + 1) as f64);
                if let Some(uv) = surface.project(&p) {
                    dev = dev.max((surface.evaluate(uv) - p).norm());
                }
            }
            if dev > e.tolerance() {
                raise(&e, dev, tol_max);
            }
        }
    });
}

/// Correct vertex and edge tolerances of `shape`, then enforce
/// `Tol(vertex) >= Tol(edge) >= Tol(face)` within the same `tol_max` cap.
pub fn correct_tolerances(shape: &Shape, tol_max: f64, parallel: bool) {
    correct_point_on_curve(shape, tol_max, parallel);
    correct_curve_on_surface(shape, tol_max, parallel);

    let faces = map_shapes(shape, ShapeType::Face).keys().to_vec();
    for_each(&faces, parallel, |f| {
        let tf = f.tolerance();
        for e in explore(f, ShapeType::Edge) {
            raise_to(&e, tf, tol_max);
        }
    });
    let edges = map_shapes(shape, ShapeType::Edge).keys().to_vec();
    for_each(&edges, parallel, |e| {
        let te = e.tolerance();
        for v in explore(e, ShapeType::Vertex) {
            raise_to(&v, te, tol_max);
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use opbrep_geom::{CurveRef, Line3d};
    use opbrep_math::Point3;
    use opbrep_primitives::make_box;
    use opbrep_topo::builder::{make_edge, make_vertex};
    use proptest::prelude::*;
    use std::sync::Arc;

    #[test]
    fn test_vertex_raised_to_curve_end() {
        let a = make_vertex(Point3::new(0.0, 0.0, 1e-3), 1e-7);
        let b = make_vertex(Point3::new(1.0, 0.0, 0.0), 1e-7);
        let c: CurveRef = Arc::new(Line3d::from_points(Point3::origin(), Point3::new(1.0, 0.0, 0.0)));
        let e = make_edge(c, 0.0, 1.0, &a, &b, 1e-7).unwrap();
        correct_point_on_curve(&e, 1.0, false);
        assert!((a.tolerance() - (1e-3 + precision::DTOLERANCE)).abs() < 1e-12);
        assert!((b.tolerance() - 1e-7).abs() < 1e-15);
    }

    #[test]
    fn test_raise_is_capped() {
        let a = make_vertex(Point3::new(0.0, 0.0, 1e-2), 1e-7);
        let b = make_vertex(Point3::new(1.0, 0.0, 0.0), 1e-7);
        let c: CurveRef = Arc::new(Line3d::from_points(Point3::origin(), Point3::new(1.0, 0.0, 0.0)));
        let e = make_edge(c, 0.0, 1.0, &a, &b, 1e-7).unwrap();
        correct_point_on_curve(&e, 1e-3, true);
        assert!((a.tolerance() - 1e-3).abs() < 1e-15);
    }

    #[test]
    fn test_hierarchy_enforced() {
        let b = make_box(Point3::origin(), 1.0, 1.0, 1.0).unwrap();
        let f = explore(&b, ShapeType::Face)[0].clone();
        f.raise_tolerance(1e-4);
        correct_tolerances(&b, 1.0, true);
        for e in explore(&f, ShapeType::Edge) {
            assert!(e.tolerance() >= 1e-4);
            for v in explore(&e, ShapeType::Vertex) {
                assert!(v.tolerance() >= e.tolerance());
            }
        }
    }

    #[test]
    fn test_hierarchy_respects_cap() {
        let b = make_box(Point3::origin(), 1.0, 1.0, 1.0).unwrap();
        let f = explore(&b, ShapeType::Face)[0].clone();
        f.raise_tolerance(0.5);
        correct_tolerances(&b, 1e-3, false);
        for e in explore(&f, ShapeType::Edge) {
            assert!(e.tolerance() <= 1e-3);
            assert!(e.tolerance() >= 1e-7);
            for v in explore(&e, ShapeType::Vertex) {
                assert!(v.tolerance() <= 1e-3);
            }
        }
    }

    proptest! {
        #[test]
        fn prop_correction_never_lowers(t in 1e-7f64..1e-1, tf in 1e-7f64..1.0, tol_max in 0.0f64..1.0) {
            let b = make_box(Point3::origin(), 1.0, 1.0, 1.0).unwrap();
            for f in map_shapes(&b, ShapeType::Face).keys() {
                f.raise_tolerance(tf);
            }
            for v in map_shapes(&b, ShapeType::Vertex).keys() {
                v.raise_tolerance(t);
            }
            let tolerances = |kind| -> Vec<f64> { map_shapes(&b, kind).keys().iter().map(Shape::tolerance).collect() };
            let (edges_before, vertices_before) = (tolerances(ShapeType::Edge), tolerances(ShapeType::Vertex));
            correct_tolerances(&b, tol_max, false);
            let (edges_after, vertices_after) = (tolerances(ShapeType::Edge), tolerances(ShapeType::Vertex));
            for (before, after) in [(&edges_before, &edges_after), (&vertices_before, &vertices_after)] {
                for (x, y) in before.iter().zip(after.iter()) {
                    prop_assert!(y >= x);
                    if *x <= tol_max {
                        prop_assert!(*y <= tol_max);
                    }
                }
            }
        }
    }
}
