//! The intersection pass filling a [`DataStructure`] from two solids.
//!
//! Edges of each operand are intersected with the faces of the other and
//! split by paves. Faces of both operands are intersected pairwise; each
//! carrier curve is clipped to the parts lying on both faces, using the
//! paves and vertices found on it as break points. Coplanar faces that
//! overlap become same-domain and receive the pieces of each other's
//! boundary lying inside them. A completion pass then records every DS
//! point on every edge and curve it lies on, and links points to the
//! operand vertices they coincide with.

use std::f64::consts::PI;
use std::sync::Arc;

use opbrep_algo::uv::UvPosition;
use opbrep_algo::{compute_vv_point, Context, ProgressRange};
use opbrep_geom::{CurveRef, SurfaceKind};
use opbrep_math::{precision, Point3, Vec3};
use opbrep_topo::tool::{edge_curve, edge_vertices, face_normal, face_surface, is_closed_edge, vertex_point};
use opbrep_topo::{explore, Orientation, Shape, ShapeType, State};

use crate::data_structure::{Config, CurveId, DataStructure, DsCurve, PointId};
use crate::error::FillError;
use crate::interference::{Interference, Transition};
use crate::intersect::{intersect_curve_surface, intersect_surfaces, SurfaceIntersection};

/// Parameter slack when matching intersection parameters with edge ranges.
const PARAM_TOL: f64 = 1e-9;

/// Below this normal component a crossing is tangential.
const CROSSING_TOL: f64 = 1e-9;

/// Fills a data structure from two operands.
#[derive(Debug, Clone, Copy)]
pub struct Filler<'a> {
    ctx: &'a Context,
    fuzzy: f64,
    progress: Option<&'a ProgressRange>,
}

impl<'a> Filler<'a> {
    /// Filler using `ctx` for cached face data.
    pub fn new(ctx: &'a Context) -> Self {
        Self {
            ctx,
            fuzzy: 0.0,
            progress: None,
        }
    }

    /// Extra distance under which entities are considered coincident.
    pub fn with_fuzzy(mut self, fuzzy: f64) -> Self {
        self.fuzzy = fuzzy.max(0.0);
        self
    }

    /// Poll `progress` for cancellation.
    pub fn with_progress(mut self, progress: &'a ProgressRange) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Initialize `ds` with `s1` and `s2` and record their intersections.
    pub fn perform(&self, ds: &mut DataStructure, s1: &Shape, s2: &Shape) -> Result<(), FillError> {
        ds.init(s1, s2);
        self.fill_edge_face(ds, 1)?;
        self.fill_edge_face(ds, 2)?;
        self.fill_face_face(ds)?;
        self.complete(ds);
        tracing::debug!(
            points = ds.nb_points(),
            curves = ds.nb_curves(),
            "intersection data structure filled"
        );
        Ok(())
    }

    fn check(&self) -> Result<(), FillError> {
        match self.progress {
            Some(p) if !p.step() => Err(FillError::Cancelled),
            _ => Ok(()),
        }
    }

    fn tol(&self, a: &Shape, b: &Shape) -> f64 {
        a.tolerance().max(b.tolerance()).max(precision::CONFUSION) + self.fuzzy
    }

    // ==== edge / face ====

    fn fill_edge_face(&self, ds: &mut DataStructure, rank: u8) -> Result<(), FillError> {
        let edges = ds.shapes_of(ShapeType::Edge, rank);
        let faces = ds.shapes_of(ShapeType::Face, 3 - rank);
        for e in &edges {
            self.check()?;
            let Some((curve, first, last)) = edge_curve(e) else {
                return Err(FillError::MissingGeometry("edge"));
            };
            let ebox = self.ctx.shape_box(e);
            for f in &faces {
                if !ebox.overlaps(&self.ctx.face_box(f)) {
                    continue;
                }
                let Some(surface) = face_surface(f) else {
                    return Err(FillError::MissingGeometry("face"));
                };
                let tol = self.tol(e, f);
                for t in intersect_curve_surface(curve.as_ref(), surface.as_ref(), tol) {
                    let Some(t) = fit_range(t, first, last, curve.period()) else {
                        continue;
                    };
                    let p = curve.evaluate(t);
                    if !self.ctx.is_valid_point_for_face(&p, f, tol) {
                        continue;
                    }
                    let transition = match normal_at(f, &p) {
                        Some(n) => crossing(curve.tangent(t).dot(&n), ShapeType::Face),
                        None => Transition::uniform(State::Unknown, ShapeType::Face),
                    };
                    let point = ds.add_point(p, tol);
                    tracing::trace!(?e, ?f, t, "edge pave");
                    ds.add_interference(
                        e,
                        Interference::EdgePave {
                            point,
                            parameter: t,
                            transition,
                        },
                    );
                }
            }
        }
        Ok(())
    }

    // ==== face / face ====

    fn fill_face_face(&self, ds: &mut DataStructure) -> Result<(), FillError> {
        let faces1 = ds.shapes_of(ShapeType::Face, 1);
        let faces2 = ds.shapes_of(ShapeType::Face, 2);
        for f1 in &faces1 {
            self.check()?;
            let b1 = self.ctx.face_box(f1);
            for f2 in &faces2 {
                if !b1.overlaps(&self.ctx.face_box(f2)) {
                    continue;
                }
                let (Some(s1), Some(s2)) = (face_surface(f1), face_surface(f2)) else {
                    return Err(FillError::MissingGeometry("face"));
                };
                let tol = self.tol(f1, f2);
                let unsupported = FillError::UnsupportedSurfaces {
                    first: s1.surface_type(),
                    second: s2.surface_type(),
                };
                match intersect_surfaces(s1.as_ref(), s2.as_ref(), tol) {
                    SurfaceIntersection::Empty => {}
                    SurfaceIntersection::Coincident if s1.surface_type() == SurfaceKind::Plane => {
                        self.fill_same_domain(ds, f1, f2, tol);
                    }
                    SurfaceIntersection::Coincident | SurfaceIntersection::Unsupported => return Err(unsupported),
                    SurfaceIntersection::Line(l) => self.fill_section(ds, f1, f2, Arc::new(l), tol),
                    SurfaceIntersection::TwoLines(a, b) => {
                        self.fill_section(ds, f1, f2, Arc::new(a), tol);
                        self.fill_section(ds, f1, f2, Arc::new(b), tol);
                    }
                    SurfaceIntersection::Circle(c) => self.fill_section(ds, f1, f2, Arc::new(c), tol),
                }
            }
        }
        Ok(())
    }

    /// Break points of `carrier`: DS points on both faces and face vertices
    /// lying on it, sorted by parameter.
    fn break_points(&self, ds: &DataStructure, f1: &Shape, f2: &Shape, carrier: &CurveRef, tol: f64) -> Vec<(f64, Point3)> {
        let mut out: Vec<(f64, Point3)> = Vec::new();
        let mut push = |p: Point3, ptol: f64| {
            let Some(t) = carrier.project(&p) else {
                return;
            };
            if (carrier.evaluate(t) - p).norm() > tol + ptol {
                return;
            }
            if !out.iter().any(|(_, q)| (q - p).norm() <= tol + ptol) {
                out.push((t, p));
            }
        };
        for (_, p) in ds.points() {
            if self.ctx.is_valid_point_for_face(&p.position, f1, tol + p.tolerance)
                && self.ctx.is_valid_point_for_face(&p.position, f2, tol + p.tolerance)
            {
                push(p.position, p.tolerance);
            }
        }
        for f in [f1, f2] {
            for v in explore(f, ShapeType::Vertex) {
                if let Some(p) = vertex_point(&v) {
                    push(p, v.tolerance());
                }
            }
        }
        out.sort_by(|a, b| a.0.total_cmp(&b.0));
        out
    }

    fn fill_section(&self, ds: &mut DataStructure, f1: &Shape, f2: &Shape, carrier: CurveRef, tol: f64) {
        let breaks = self.break_points(ds, f1, f2, &carrier, tol);
        let keep = |t: f64| {
            let m = carrier.evaluate(t);
            let p1 = self.ctx.position_in_face(&m, f1, tol);
            let p2 = self.ctx.position_in_face(&m, f2, tol);
            p1 != UvPosition::Outside
                && p2 != UvPosition::Outside
                && !(p1 == UvPosition::Boundary && p2 == UvPosition::Boundary)
        };

        let runs: Vec<Vec<(f64, Point3)>> = match carrier.period() {
            Some(period) if breaks.is_empty() => {
                if [0.5 * PI, PI, 1.5 * PI].iter().all(|t| keep(*t)) {
                    let p = carrier.evaluate(0.0);
                    vec![vec![(0.0, p), (period, p)]]
                } else {
                    Vec::new()
                }
            }
            Some(period) => {
                let mut ring = breaks.clone();
                let (t0, p0) = breaks[0];
                ring.push((t0 + period, p0));
                let runs = kept_runs(&ring, &keep);
                // A run ending where the ring closes continues the first one.
                merge_cyclic(runs, t0 + period, period)
            }
            None => kept_runs(&breaks, &keep),
        };

        for run in runs {
            let (Some(&(first, _)), Some(&(last, _))) = (run.first(), run.last()) else {
                continue;
            };
            if last - first <= PARAM_TOL {
                continue;
            }
            let mid = 0.5 * (first + last);
            let m = carrier.evaluate(mid);
            let tangent = carrier.tangent(mid);
            let (t1, t2) = match (normal_at(f1, &m), normal_at(f2, &m)) {
                (Some(n1), Some(n2)) => (
                    crossing(n2.dot(&n1.cross(&tangent)), ShapeType::Face),
                    crossing(n1.dot(&n2.cross(&tangent)), ShapeType::Face),
                ),
                _ => (
                    Transition::uniform(State::Unknown, ShapeType::Face),
                    Transition::uniform(State::Unknown, ShapeType::Face),
                ),
            };
            let closed = carrier.period().is_some_and(|per| (last - first - per).abs() < PARAM_TOL);
            let points: Vec<(f64, PointId)> = run.iter().map(|(t, p)| (*t, ds.add_point(*p, tol))).collect();
            let id = ds.add_curve(
                DsCurve {
                    curve: carrier.clone(),
                    first,
                    last,
                    closed,
                    tolerance: tol,
                    faces: [f1.clone(), f2.clone()],
                    points,
                },
                [Some(t1), Some(t2)],
            );
            tracing::trace!(?id, first, last, closed, "section curve");
        }
    }

    // ==== same domain ====

    fn fill_same_domain(&self, ds: &mut DataStructure, f1: &Shape, f2: &Shape, tol: f64) {
        let (Some(n1), Some(n2)) = (interior_normal(self.ctx, f1), interior_normal(self.ctx, f2)) else {
            return;
        };
        let config = if n1.dot(&n2) > 0.0 {
            Config::SameOriented
        } else {
            Config::DiffOriented
        };
        let cut2 = self.cut_edges_into(ds, f2, f1, n1, n2, tol);
        let cut1 = self.cut_edges_into(ds, f1, f2, n2, n1, tol);
        let mut overlap = cut1 || cut2;
        if !overlap {
            overlap = [(f1, f2), (f2, f1)].iter().any(|(a, b)| {
                self.ctx
                    .point_in_face(a)
                    .is_some_and(|(_, p)| self.ctx.position_in_face(&p, b, tol) == UvPosition::Inside)
            });
        }
        if overlap {
            tracing::debug!(?f1, ?f2, ?config, "same-domain faces");
            ds.add_same_domain(f1, f2, config);
        }
    }

    /// Record the pieces of the boundary of `from` lying strictly inside
    /// `into` as curves on `into`. Returns true when a piece was found.
    fn cut_edges_into(&self, ds: &mut DataStructure, from: &Shape, into: &Shape, n_into: Vec3, n_from: Vec3, tol: f64) -> bool {
        let mut found = false;
        for e in explore(from, ShapeType::Edge) {
            let Some((curve, first, last)) = edge_curve(&e) else {
                continue;
            };
            let mut breaks: Vec<(f64, Point3)> = vec![(first, curve.evaluate(first)), (last, curve.evaluate(last))];
            let mut push = |t: f64, p: Point3| {
                if t > first + PARAM_TOL && t < last - PARAM_TOL && !breaks.iter().any(|(_, q)| (q - p).norm() <= 2.0 * tol) {
                    breaks.push((t, p));
                }
            };
            for (_, p) in ds.points() {
                if let Some(t) = self.ctx.project_point_on_edge(&p.position, &e) {
                    if (curve.evaluate(t) - p.position).norm() <= tol + p.tolerance {
                        push(t, p.position);
                    }
                }
            }
            for v in explore(into, ShapeType::Vertex) {
                let Some(p) = vertex_point(&v) else {
                    continue;
                };
                if let Some(t) = self.ctx.project_point_on_edge(&p, &e) {
                    if (curve.evaluate(t) - p).norm() <= tol + v.tolerance() {
                        push(t, p);
                    }
                }
            }
            breaks.sort_by(|a, b| a.0.total_cmp(&b.0));

            let keep = |t: f64| self.ctx.position_in_face(&curve.evaluate(t), into, tol) == UvPosition::Inside;
            for run in kept_runs(&breaks, &keep) {
                let (Some(&(a, _)), Some(&(b, _))) = (run.first(), run.last()) else {
                    continue;
                };
                // Tangent along the boundary of `from`; its material lies on the left.
                let mut tangent = curve.tangent(0.5 * (a + b));
                if e.orientation() == Orientation::Reversed {
                    tangent = -tangent;
                }
                let left_of_from = n_from.cross(&tangent);
                let transition = crossing(-left_of_from.dot(&n_into.cross(&tangent)), ShapeType::Face);
                let transition = Transition {
                    before: on_or_out(transition.before),
                    after: on_or_out(transition.after),
                    index: ShapeType::Face,
                };
                let closed = is_closed_edge(&e) && (a - first).abs() < PARAM_TOL && (b - last).abs() < PARAM_TOL;
                let points: Vec<(f64, PointId)> = run.iter().map(|(t, p)| (*t, ds.add_point(*p, tol))).collect();
                ds.add_curve(
                    DsCurve {
                        curve: curve.clone(),
                        first: a,
                        last: b,
                        closed,
                        tolerance: tol,
                        faces: [into.clone(), from.clone()],
                        points,
                    },
                    [Some(transition), None],
                );
                found = true;
            }
        }
        found
    }

    // ==== completion ====

    fn complete(&self, ds: &mut DataStructure) {
        let points: Vec<(PointId, Point3, f64)> = ds.points().map(|(id, p)| (id, p.position, p.tolerance)).collect();
        let mut edges = ds.shapes_of(ShapeType::Edge, 1);
        edges.extend(ds.shapes_of(ShapeType::Edge, 2));
        let on_edge = Transition::uniform(State::On, ShapeType::Edge);

        for e in &edges {
            let Some((curve, _, _)) = edge_curve(e) else {
                continue;
            };
            let Some((v1, v2)) = edge_vertices(e) else {
                continue;
            };
            let known: Vec<PointId> = ds.edge_paves(e).iter().map(|(_, p)| *p).collect();
            let bx = self.ctx.shape_box(e);
            for (id, p, ptol) in &points {
                if known.contains(id) {
                    continue;
                }
                let mut pb = bx;
                pb.expand(*ptol);
                if !pb.contains_point(p) {
                    continue;
                }
                let Some(t) = self.ctx.project_point_on_edge(p, e) else {
                    continue;
                };
                if (curve.evaluate(t) - p).norm() > ptol + e.tolerance() + self.fuzzy {
                    continue;
                }
                if [&v1, &v2].iter().any(|v| compute_vv_point(v, p, *ptol, self.fuzzy) == 0) {
                    continue;
                }
                ds.add_interference(
                    e,
                    Interference::EdgePave {
                        point: *id,
                        parameter: t,
                        transition: on_edge,
                    },
                );
            }
        }

        let curve_ids: Vec<CurveId> = ds.curves().map(|(id, _)| id).collect();
        for cid in curve_ids {
            let Some(c) = ds.curve(cid) else {
                continue;
            };
            let (carrier, first, last, ctol) = (c.curve.clone(), c.first, c.last, c.tolerance);
            let known: Vec<PointId> = c.points.iter().map(|(_, p)| *p).collect();
            let mut extra = Vec::new();
            for (id, p, ptol) in &points {
                if known.contains(id) {
                    continue;
                }
                let Some(t) = carrier.project(p) else {
                    continue;
                };
                let Some(t) = fit_range(t, first, last, carrier.period()) else {
                    continue;
                };
                if t <= first + PARAM_TOL || t >= last - PARAM_TOL {
                    continue;
                }
                if (carrier.evaluate(t) - p).norm() <= ctol + ptol {
                    extra.push((t, *id));
                }
            }
            if let Some(c) = ds.curve_mut(cid) {
                c.points.extend(extra);
                c.points.sort_by(|a, b| a.0.total_cmp(&b.0));
            }
        }

        let mut vertices = ds.shapes_of(ShapeType::Vertex, 1);
        vertices.extend(ds.shapes_of(ShapeType::Vertex, 2));
        for (id, p, ptol) in &points {
            let origins: Vec<Shape> = vertices
                .iter()
                .filter(|v| compute_vv_point(v, p, *ptol, self.fuzzy) == 0)
                .cloned()
                .collect();
            if let Some(dp) = ds.point_mut(*id) {
                dp.origins = origins;
            }
        }
    }
}

/// Maximal runs of consecutive kept intervals of sorted break points.
fn kept_runs<F>(breaks: &[(f64, Point3)], keep: &F) -> Vec<Vec<(f64, Point3)>>
where
    F: Fn(f64) -> bool,
{
    let mut runs: Vec<Vec<(f64, Point3)>> = Vec::new();
    let mut current: Vec<(f64, Point3)> = Vec::new();
    for w in breaks.windows(2) {
        let (a, b) = (w[0], w[1]);
        if b.0 - a.0 > PARAM_TOL && keep(0.5 * (a.0 + b.0)) {
            if current.is_empty() {
                current.push(a);
            }
            current.push(b);
        } else if !current.is_empty() {
            runs.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        runs.push(current);
    }
    runs
}

/// Join the last run with the first when it ends on the closing break of a ring.
fn merge_cyclic(mut runs: Vec<Vec<(f64, Point3)>>, close: f64, period: f64) -> Vec<Vec<(f64, Point3)>> {
    if runs.len() < 2 {
        return runs;
    }
    let ends_on_close = runs
        .last()
        .and_then(|r| r.last())
        .is_some_and(|(t, _)| (t - close).abs() < PARAM_TOL);
    let starts_on_open = runs[0].first().is_some_and(|(t, _)| (t + period - close).abs() < PARAM_TOL);
    if ends_on_close && starts_on_open {
        let first = runs.remove(0);
        if let Some(last) = runs.last_mut() {
            last.extend(first.into_iter().skip(1).map(|(t, p)| (t + period, p)));
        }
    }
    runs
}

/// Bring `t` into `[first, last]`, shifting by periods when the curve is periodic.
fn fit_range(t: f64, first: f64, last: f64, period: Option<f64>) -> Option<f64> {
    let mut t = t;
    if let Some(per) = period {
        while t < first - PARAM_TOL {
            t += per;
        }
        while t > last + PARAM_TOL && t - per >= first - PARAM_TOL {
            t -= per;
        }
    }
    (t >= first - PARAM_TOL && t <= last + PARAM_TOL).then_some(t.clamp(first, last))
}

/// Outward normal of `face` at the projection of `p`.
fn normal_at(face: &Shape, p: &Point3) -> Option<Vec3> {
    let uv = face_surface(face)?.project(p)?;
    face_normal(face, uv)
}

fn interior_normal(ctx: &Context, face: &Shape) -> Option<Vec3> {
    let (uv, _) = ctx.point_in_face(face)?;
    face_normal(face, uv)
}

/// Transition of a move whose component along the outward normal of the
/// crossed face is `d`.
fn crossing(d: f64, index: ShapeType) -> Transition {
    let (before, after) = if d < -CROSSING_TOL {
        (State::Out, State::In)
    } else if d > CROSSING_TOL {
        (State::In, State::Out)
    } else {
        (State::On, State::On)
    };
    Transition { before, after, index }
}

fn on_or_out(state: State) -> State {
    match state {
        State::In => State::On,
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use opbrep_primitives::{make_box, make_cylinder};

    fn fill(s1: &Shape, s2: &Shape) -> DataStructure {
        let ctx = Context::new();
        let mut ds = DataStructure::new();
        Filler::new(&ctx).perform(&mut ds, s1, s2).unwrap();
        ds
    }

    #[test]
    fn test_disjoint_boxes_have_no_geometry() {
        let a = make_box(Point3::origin(), 1.0, 1.0, 1.0).unwrap();
        let b = make_box(Point3::new(3.0, 0.0, 0.0), 1.0, 1.0, 1.0).unwrap();
        let ds = fill(&a, &b);
        assert_eq!(ds.nb_points(), 0);
        assert_eq!(ds.nb_curves(), 0);
    }

    #[test]
    fn test_offset_boxes_sections() {
        let a = make_box(Point3::origin(), 1.0, 1.0, 1.0).unwrap();
        let b = make_box(Point3::new(0.5, 0.0, 0.0), 1.0, 1.0, 1.0).unwrap();
        let ds = fill(&a, &b);
        // Top, bottom, front and back of both boxes are coplanar and overlap.
        let sd_faces = ds
            .shapes_of(ShapeType::Face, 1)
            .iter()
            .filter(|f| ds.has_same_domain(f))
            .count();
        assert_eq!(sd_faces, 4);
        // Every section curve lies on the planes x = 0.5 or x = 1.
        assert!(ds.nb_curves() > 0);
        for (_, c) in ds.curves() {
            let m = c.curve.evaluate(0.5 * (c.first + c.last));
            let on_cut = (m.x - 0.5).abs() < 1e-9 || (m.x - 1.0).abs() < 1e-9;
            assert!(on_cut, "unexpected section at {m:?}");
        }
        // Vertices of one box on faces of the other are linked to DS points.
        let linked = ds.points().filter(|(_, p)| !p.origins.is_empty()).count();
        assert_eq!(linked, ds.nb_points());
    }

    #[test]
    fn test_plane_cuts_cylinder_along_full_circle() {
        let c = make_cylinder(Point3::origin(), 1.0, 2.0).unwrap();
        let b = make_box(Point3::new(-2.0, -2.0, 1.0), 4.0, 4.0, 2.0).unwrap();
        let ds = fill(&c, &b);
        let circles: Vec<_> = ds.curves().filter(|(_, c)| c.closed).collect();
        assert_eq!(circles.len(), 1);
        let (_, circle) = circles[0];
        let start = circle.curve.evaluate(circle.first);
        assert_relative_eq!(start.x, 1.0, epsilon = 1e-9);
        assert_relative_eq!(start.z, 1.0, epsilon = 1e-9);
        // The seam is split where the circle starts.
        let seam_paves: usize = ds
            .shapes_of(ShapeType::Edge, 1)
            .iter()
            .map(|e| ds.edge_paves(e).len())
            .sum();
        assert_eq!(seam_paves, 1);
    }

    #[test]
    fn test_fit_range_periodic() {
        let t = fit_range(-0.5, 0.0, 2.0 * PI, Some(2.0 * PI)).unwrap();
        assert_relative_eq!(t, 2.0 * PI - 0.5);
        assert!(fit_range(1.5, 0.0, 1.0, None).is_none());
        assert_eq!(fit_range(1.0 + 1e-12, 0.0, 1.0, None), Some(1.0));
    }

    #[test]
    fn test_kept_runs_join_consecutive_intervals() {
        let p = Point3::origin();
        let breaks = [(0.0, p), (1.0, p), (2.0, p), (3.0, p), (4.0, p)];
        let runs = kept_runs(&breaks, &|t: f64| t < 2.0 || t > 3.0);
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].len(), 3);
        assert_eq!(runs[1].len(), 2);
    }
}
