//! Rebuilding faces from a [`WireEdgeSet`].
//!
//! Edges with a free end are pruned first. Closed loops are then traced by
//! taking, at every vertex, the outgoing edge turning most to the left
//! around the surface normal. Loops running counter-clockwise in the
//! surface parameters bound faces; clockwise loops are holes and go to the
//! smallest face containing them.

use std::f64::consts::PI;

use opbrep_algo::uv::{classify_uv, signed_area, wire_uv_loop, UvPosition};
use opbrep_algo::{AlertKind, Report};
use opbrep_math::{angle_with_ref, precision, Point2, Vec3};
use opbrep_topo::builder::{make_face, make_wire};
use opbrep_topo::tool::{edge_range, edge_tangent, edge_vertices_oriented, vertex_point};
use opbrep_topo::{Orientation, Shape, TopoError};

use crate::shape_set::WireEdgeSet;

/// Turning angles below this are treated as going straight back.
const ANGLE_EPS: f64 = 1e-9;

/// Parameter tolerance when testing holes against outer loops.
const UV_TOL: f64 = 1e-7;

#[derive(Debug, Clone)]
struct Half {
    edge: Shape,
    start: Shape,
    end: Shape,
    out_dir: Vec3,
    in_dir: Vec3,
}

impl Half {
    fn new(edge: &Shape) -> Option<Self> {
        let (start, end) = edge_vertices_oriented(edge)?;
        let (first, last) = edge_range(edge)?;
        let (t0, t1) = if edge.orientation() == Orientation::Reversed {
            (last, first)
        } else {
            (first, last)
        };
        Some(Self {
            edge: edge.clone(),
            start,
            end,
            out_dir: edge_tangent(edge, t0)?,
            in_dir: edge_tangent(edge, t1)?,
        })
    }

    fn is_closed(&self) -> bool {
        self.start.is_same(&self.end)
    }

    fn is_reverse_of(&self, other: &Half) -> bool {
        self.edge.is_same(&other.edge) && self.edge.orientation() != other.edge.orientation()
    }
}

/// Builds the faces bounded by the edges of a [`WireEdgeSet`].
#[derive(Debug)]
pub struct FaceBuilder<'a> {
    wes: &'a WireEdgeSet,
    tol: f64,
}

impl<'a> FaceBuilder<'a> {
    /// Builder over `wes`; new faces get tolerance `tol`.
    pub fn new(wes: &'a WireEdgeSet, tol: f64) -> Self {
        Self { wes, tol }
    }

    fn normal_at(&self, v: &Shape) -> Option<Vec3> {
        let p = vertex_point(v)?;
        let s = self.wes.surface();
        let uv = s.project(&p)?;
        Some(s.normal(uv).into_inner())
    }

    /// Edge loops, in tracing order. Loops that could not be closed are
    /// reported and skipped.
    pub fn loops(&self, report: &Report) -> Vec<Vec<Shape>> {
        let halves: Vec<Half> = self.wes.edges().iter().filter_map(Half::new).collect();
        let alive = prune(&halves);
        let mut used = vec![false; halves.len()];
        let mut loops = Vec::new();

        for s in 0..halves.len() {
            if !alive[s] || used[s] {
                continue;
            }
            used[s] = true;
            let mut lp = vec![s];
            let mut cur = s;
            let closed = loop {
                if lp.len() > halves.len() {
                    break false;
                }
                let Some(next) = self.next_half(&halves, &alive, &used, cur, s) else {
                    break false;
                };
                if next == s {
                    break true;
                }
                used[next] = true;
                lp.push(next);
                cur = next;
            };
            if closed {
                loops.push(lp.iter().map(|i| halves[*i].edge.clone()).collect());
            } else {
                report.add_warning(
                    AlertKind::UnableToBuildFace,
                    "open edge loop while splitting a face",
                    vec![self.wes.face().clone()],
                );
            }
        }
        loops
    }

    fn next_half(&self, halves: &[Half], alive: &[bool], used: &[bool], cur: usize, first: usize) -> Option<usize> {
        let h = &halves[cur];
        let back = -h.in_dir;
        let n = self.normal_at(&h.end).unwrap_or_else(|| h.in_dir.cross(&h.out_dir));
        let flat = |d: &Vec3| d - d.dot(&n) * n;
        let r = flat(&back);
        let mut best: Option<(f64, usize)> = None;
        for (j, c) in halves.iter().enumerate() {
            if !alive[j] || (used[j] && j != first) || !c.start.is_same(&h.end) || c.is_reverse_of(h) {
                continue;
            }
            let mut cw = -angle_with_ref(&r, &flat(&c.out_dir), &n);
            if cw < 0.0 {
                cw += 2.0 * PI;
            }
            if cw < ANGLE_EPS {
                cw = 2.0 * PI;
            }
            if best.map_or(true, |(a, _)| cw < a) {
                best = Some((cw, j));
            }
        }
        best.map(|(_, j)| j)
    }

    /// Faces bounded by the traced loops, Forward on the set surface.
    pub fn build(&self, report: &Report) -> Result<Vec<Shape>, TopoError> {
        let surface = self.wes.surface();
        let period = surface.u_period();
        let mut outers: Vec<(Shape, Vec<Point2>, f64, Vec<Shape>)> = Vec::new();
        let mut holes: Vec<(Shape, Vec<Point2>)> = Vec::new();
        for lp in self.loops(report) {
            let wire = make_wire(&lp)?;
            let uv = wire_uv_loop(surface, &wire);
            let area = signed_area(&uv);
            if area.abs() <= precision::CONFUSION * precision::CONFUSION {
                report.add_warning(AlertKind::DegeneratedSplit, "loop with no area", vec![wire]);
            } else if area > 0.0 {
                outers.push((wire, uv, area, Vec::new()));
            } else {
                holes.push((wire, uv));
            }
        }
        outers.sort_by(|a, b| a.2.total_cmp(&b.2));

        for (hole, huv) in holes {
            let samples = loop_samples(&huv);
            let host = outers.iter_mut().find(|(_, ouv, _, _)| {
                let lps = std::slice::from_ref(ouv);
                let states: Vec<UvPosition> = samples.iter().map(|p| classify_uv(lps, *p, UV_TOL, period)).collect();
                states.contains(&UvPosition::Inside) && !states.contains(&UvPosition::Outside)
            });
            match host {
                Some((_, _, _, hs)) => hs.push(hole),
                None => report.add_warning(AlertKind::UnableToBuildFace, "hole outside every face piece", vec![hole]),
            }
        }

        let mut faces = Vec::with_capacity(outers.len());
        for (outer, _, _, hs) in outers {
            let mut wires = vec![outer];
            wires.extend(hs);
            faces.push(make_face(surface.clone(), &wires, self.tol)?);
        }
        Ok(faces)
    }
}

/// Mark edges that cannot belong to a closed loop.
fn prune(halves: &[Half]) -> Vec<bool> {
    let mut alive = vec![true; halves.len()];
    loop {
        let mut changed = false;
        for i in 0..halves.len() {
            if !alive[i] || halves[i].is_closed() {
                continue;
            }
            let h = &halves[i];
            let linked = |at_start: bool| {
                halves.iter().enumerate().any(|(j, o)| {
                    j != i
                        && alive[j]
                        && !o.is_reverse_of(h)
                        && if at_start { o.end.is_same(&h.start) } else { o.start.is_same(&h.end) }
                })
            };
            if !(linked(true) && linked(false)) {
                alive[i] = false;
                changed = true;
            }
        }
        if !changed {
            return alive;
        }
    }
}

/// Midpoints of the segments of a parameter loop.
fn loop_samples(lp: &[Point2]) -> Vec<Point2> {
    let n = lp.len();
    (0..n)
        .map(|i| Point2::from((lp[i].coords + lp[(i + 1) % n].coords) * 0.5))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use opbrep_algo::nb_wires_with_seam;
    use opbrep_geom::{Circle3d, CurveRef, Line3d, Plane, SurfaceRef};
    use opbrep_math::Point3;
    use opbrep_primitives::make_cylinder;
    use opbrep_topo::builder::{make_edge, make_vertex};
    use opbrep_topo::tool::edge_vertices;
    use opbrep_topo::{explore, ShapeType};
    use std::f64::consts::PI;
    use std::sync::Arc;

    fn pt(x: f64, y: f64) -> Shape {
        make_vertex(Point3::new(x, y, 0.0), 1e-7)
    }

    fn seg(a: &Shape, b: &Shape) -> Shape {
        let (pa, pb) = (vertex_point(a).unwrap(), vertex_point(b).unwrap());
        let c: CurveRef = Arc::new(Line3d::from_points(pa, pb));
        make_edge(c, 0.0, 1.0, a, b, 1e-7).unwrap()
    }

    fn square(edges: &[Shape]) -> Shape {
        let s: SurfaceRef = Arc::new(Plane::xy());
        make_face(s, &[make_wire(edges).unwrap()], 1e-7).unwrap()
    }

    fn start_set(face: &Shape) -> WireEdgeSet {
        let mut wes = WireEdgeSet::new(face).unwrap();
        for e in explore(face, ShapeType::Edge) {
            wes.add_start_element(&e);
        }
        wes
    }

    #[test]
    fn test_square_split_by_section_edge() {
        let (p0, p1, p2, p3) = (pt(0.0, 0.0), pt(1.0, 0.0), pt(1.0, 1.0), pt(0.0, 1.0));
        let (m0, m1) = (pt(0.5, 0.0), pt(0.5, 1.0));
        let face = square(&[seg(&p0, &m0), seg(&m0, &p1), seg(&p1, &p2), seg(&p2, &m1), seg(&m1, &p3), seg(&p3, &p0)]);
        let mut wes = start_set(&face);
        wes.add_section_element(&seg(&m0, &m1));
        let report = Report::new();
        let faces = FaceBuilder::new(&wes, 1e-7).build(&report).unwrap();
        assert_eq!(faces.len(), 2);
        for f in &faces {
            assert_eq!(explore(f, ShapeType::Wire).len(), 1);
            assert_eq!(explore(f, ShapeType::Edge).len(), 4);
        }
        assert!(report.alerts().is_empty());
    }

    #[test]
    fn test_dangling_section_edge_is_pruned() {
        let (p0, p1, p2, p3) = (pt(0.0, 0.0), pt(1.0, 0.0), pt(1.0, 1.0), pt(0.0, 1.0));
        let m0 = pt(0.5, 0.0);
        let face = square(&[seg(&p0, &m0), seg(&m0, &p1), seg(&p1, &p2), seg(&p2, &p3), seg(&p3, &p0)]);
        let mut wes = start_set(&face);
        wes.add_section_element(&seg(&m0, &pt(0.5, 0.5)));
        let faces = FaceBuilder::new(&wes, 1e-7).build(&Report::new()).unwrap();
        assert_eq!(faces.len(), 1);
        assert_eq!(explore(&faces[0], ShapeType::Edge).len(), 5);
    }

    #[test]
    fn test_inner_circle_makes_hole_and_disk() {
        let (p0, p1, p2, p3) = (pt(0.0, 0.0), pt(4.0, 0.0), pt(4.0, 4.0), pt(0.0, 4.0));
        let face = square(&[seg(&p0, &p1), seg(&p1, &p2), seg(&p2, &p3), seg(&p3, &p0)]);
        let v = pt(3.0, 2.0);
        let c: CurveRef = Arc::new(Circle3d::new(Point3::new(2.0, 2.0, 0.0), 1.0));
        let circle = make_edge(c, 0.0, 2.0 * PI, &v, &v, 1e-7).unwrap();
        let mut wes = start_set(&face);
        wes.add_section_element(&circle);
        let mut faces = FaceBuilder::new(&wes, 1e-7).build(&Report::new()).unwrap();
        faces.sort_by_key(|f| explore(f, ShapeType::Wire).len());
        assert_eq!(faces.len(), 2);
        assert_eq!(explore(&faces[0], ShapeType::Wire).len(), 1);
        assert_eq!(explore(&faces[1], ShapeType::Wire).len(), 2);
    }

    #[test]
    fn test_cylinder_band_split_keeps_one_seam_per_face() {
        let cyl = make_cylinder(Point3::origin(), 1.0, 2.0).unwrap();
        let lateral = explore(&cyl, ShapeType::Face)[0].clone();
        let edges = explore(&lateral, ShapeType::Edge);
        let (bot, seam, top) = (edges[0].clone(), edges[1].clone(), edges[2].clone());
        let (vb, vt) = edge_vertices(&seam).unwrap();
        let vm = make_vertex(Point3::new(1.0, 0.0, 1.0), 1e-7);
        let (s1, s2) = (seg(&vb, &vm), seg(&vm, &vt));
        let c: CurveRef = Arc::new(Circle3d::new(Point3::new(0.0, 0.0, 1.0), 1.0));
        let ring = make_edge(c, 0.0, 2.0 * PI, &vm, &vm, 1e-7).unwrap();

        let mut wes = WireEdgeSet::new(&lateral).unwrap();
        for e in [bot, s1.clone(), s2.clone(), top, s2.reversed(), s1.reversed()] {
            wes.add_start_element(&e);
        }
        wes.add_section_element(&ring);
        let report = Report::new();
        let faces = FaceBuilder::new(&wes, 1e-7).build(&report).unwrap();
        assert_eq!(faces.len(), 2);
        for f in &faces {
            assert_eq!(nb_wires_with_seam(f), 1);
            assert_eq!(explore(f, ShapeType::Edge).len(), 4);
        }
        assert!(report.alerts().is_empty());
    }
}
