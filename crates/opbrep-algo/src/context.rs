//! Per-operation cache of derived face and solid data.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use opbrep_math::{precision, Aabb3, Point2, Point3};
use opbrep_topo::tool::{edge_curve, edge_point, face_surface, vertex_point};
use opbrep_topo::{explore, Shape, ShapeType};

use crate::uv::{classify_uv, edge_polyline, face_uv_loops, interior_uv, UvPosition};

/// Parameter-space boundary of a face.
#[derive(Debug, Clone)]
pub struct FaceUv {
    /// One closed polygon per wire, outer wire first.
    pub loops: Vec<Vec<Point2>>,
    /// Period in `u` of the supporting surface.
    pub period: Option<f64>,
}

/// Cache of face polygons, boxes and solid face lists.
///
/// Owned by one logical operation and shared by reference with the
/// helpers it calls. Every get-or-insert runs under the cache lock.
#[derive(Debug, Default)]
pub struct Context {
    uv: Mutex<HashMap<Shape, Arc<FaceUv>>>,
    boxes: Mutex<HashMap<Shape, Aabb3>>,
    solid_faces: Mutex<HashMap<Shape, Arc<Vec<Shape>>>>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl Context {
    /// Empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Boundary polygons of `face`.
    pub fn face_uv(&self, face: &Shape) -> Arc<FaceUv> {
        let mut cache = lock(&self.uv);
        cache
            .entry(face.clone())
            .or_insert_with(|| {
                let period = face_surface(face).and_then(|s| s.u_period());
                Arc::new(FaceUv {
                    loops: face_uv_loops(face),
                    period,
                })
            })
            .clone()
    }

    /// Bounding box of `face`, enlarged by its tolerance.
    pub fn face_box(&self, face: &Shape) -> Aabb3 {
        let mut cache = lock(&self.boxes);
        *cache.entry(face.clone()).or_insert_with(|| {
            let mut b = Aabb3::empty();
            for e in explore(face, ShapeType::Edge) {
                for p in edge_polyline(&e) {
                    b.include_point(&p);
                }
            }
            b.expand(face.tolerance() + precision::CONFUSION);
            b
        })
    }

    /// Bounding box of any shape: union of its face boxes, or of its
    /// edges and vertices when it has no faces.
    pub fn shape_box(&self, shape: &Shape) -> Aabb3 {
        let mut b = Aabb3::empty();
        let faces = explore(shape, ShapeType::Face);
        if !faces.is_empty() {
            for f in &faces {
                b.include_box(&self.face_box(f));
            }
            return b;
        }
        for e in explore(shape, ShapeType::Edge) {
            for p in edge_polyline(&e) {
                b.include_point(&p);
            }
            b.expand(e.tolerance());
        }
        for v in explore(shape, ShapeType::Vertex) {
            if let Some(p) = vertex_point(&v) {
                let mut vb = Aabb3::new(p, p);
                vb.expand(v.tolerance());
                b.include_box(&vb);
            }
        }
        b
    }

    /// Faces of `solid`, in exploration order.
    pub fn solid_faces(&self, solid: &Shape) -> Arc<Vec<Shape>> {
        let mut cache = lock(&self.solid_faces);
        cache
            .entry(solid.clone())
            .or_insert_with(|| Arc::new(explore(solid, ShapeType::Face)))
            .clone()
    }

    /// Position of `uv` relative to the boundary of `face`.
    pub fn classify_uv(&self, face: &Shape, uv: Point2, tol: f64) -> UvPosition {
        let fuv = self.face_uv(face);
        classify_uv(&fuv.loops, uv, tol, fuv.period)
    }

    /// Position of `p`, projected onto the surface of `face`, relative to
    /// the face boundary.
    ///
    /// Boundary edges are tested on their exact curves before the sampled
    /// polygons are used.
    pub fn position_in_face(&self, p: &Point3, face: &Shape, tol: f64) -> UvPosition {
        for e in explore(face, ShapeType::Edge) {
            let on_edge = self
                .project_point_on_edge(p, &e)
                .and_then(|t| edge_point(&e, t))
                .is_some_and(|q| (q - p).norm() <= tol + e.tolerance());
            if on_edge {
                return UvPosition::Boundary;
            }
        }
        let Some(uv) = face_surface(face).and_then(|s| s.project(p)) else {
            return UvPosition::Outside;
        };
        self.classify_uv(face, uv, tol.max(precision::PCONFUSION))
    }

    /// True when `p` projects onto `face` within `tol` and inside its boundary.
    pub fn is_valid_point_for_face(&self, p: &Point3, face: &Shape, tol: f64) -> bool {
        let Some(surface) = face_surface(face) else {
            return false;
        };
        let Some(uv) = surface.project(p) else {
            return false;
        };
        if (surface.evaluate(uv) - p).norm() > tol {
            return false;
        }
        self.position_in_face(p, face, tol) != UvPosition::Outside
    }

    /// A point strictly inside `face`, with its parameters.
    pub fn point_in_face(&self, face: &Shape) -> Option<(Point2, Point3)> {
        let surface = face_surface(face)?;
        let fuv = self.face_uv(face);
        let uv = interior_uv(&fuv.loops)?;
        Some((uv, surface.evaluate(uv)))
    }

    /// Parameter of the projection of `p` on `edge`, if it falls in the edge range.
    pub fn project_point_on_edge(&self, p: &Point3, edge: &Shape) -> Option<f64> {
        let (curve, first, last) = edge_curve(edge)?;
        let mut t = curve.project(p)?;
        if let Some(per) = curve.period() {
            while t < first - precision::PCONFUSION {
                t += per;
            }
            while t > last + precision::PCONFUSION {
                t -= per;
            }
        }
        let slack = precision::PCONFUSION;
        (t >= first - slack && t <= last + slack).then_some(t.clamp(first, last))
    }

    /// Drop all cached data.
    pub fn clear(&self) {
        lock(&self.uv).clear();
        lock(&self.boxes).clear();
        lock(&self.solid_faces).clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opbrep_primitives::{make_box, make_cylinder};

    #[test]
    fn test_cache_returns_same_entry() {
        let ctx = Context::new();
        let b = make_box(Point3::origin(), 1.0, 1.0, 1.0).unwrap();
        let f = explore(&b, ShapeType::Face)[0].clone();
        let a1 = ctx.face_uv(&f);
        let a2 = ctx.face_uv(&f.reversed());
        assert!(Arc::ptr_eq(&a1, &a2));
        assert_eq!(ctx.solid_faces(&b).len(), 6);
    }

    #[test]
    fn test_point_in_face_is_valid() {
        let ctx = Context::new();
        let b = make_box(Point3::origin(), 2.0, 1.0, 1.0).unwrap();
        for f in explore(&b, ShapeType::Face) {
            let (_, p) = ctx.point_in_face(&f).unwrap();
            assert!(ctx.is_valid_point_for_face(&p, &f, 1e-7));
        }
        let bx = ctx.shape_box(&b);
        assert!(bx.contains_point(&Point3::new(1.9, 0.5, 0.5)));
        assert!(!bx.contains_point(&Point3::new(2.5, 0.5, 0.5)));
    }

    #[test]
    fn test_position_on_circular_boundary() {
        let ctx = Context::new();
        let c = make_cylinder(Point3::origin(), 1.0, 2.0).unwrap();
        let bottom = explore(&c, ShapeType::Face)
            .into_iter()
            .find(|f| {
                face_surface(f).is_some_and(|s| {
                    s.u_period().is_none() && s.project(&Point3::origin()).is_some_and(|uv| s.evaluate(uv).z.abs() < 1e-12)
                })
            })
            .unwrap();
        let on_circle = Point3::new(0.3f64.cos(), 0.3f64.sin(), 0.0);
        assert_eq!(ctx.position_in_face(&on_circle, &bottom, 1e-7), UvPosition::Boundary);
        assert_eq!(ctx.position_in_face(&Point3::new(0.1, 0.2, 0.0), &bottom, 1e-7), UvPosition::Inside);
        assert_eq!(ctx.position_in_face(&Point3::new(1.5, 0.0, 0.0), &bottom, 1e-7), UvPosition::Outside);
    }

    #[test]
    fn test_project_point_on_edge_range() {
        let ctx = Context::new();
        let b = make_box(Point3::origin(), 1.0, 1.0, 1.0).unwrap();
        let e = explore(&b, ShapeType::Edge)[0].clone();
        let (c, _, _) = edge_curve(&e).unwrap();
        let mid = c.evaluate(0.5);
        assert!(ctx.project_point_on_edge(&mid, &e).is_some());
        let outside = c.evaluate(3.0);
        assert!(ctx.project_point_on_edge(&outside, &e).is_none());
    }
}
