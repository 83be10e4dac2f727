//! Splitting the operands: vertices on DS points, edge parts between
//! paves, section edges on DS curves and face parts.

use rayon::prelude::*;

use opbrep_algo::uv::UvPosition;
use opbrep_algo::{compute_vv, is_micro_edge, AlertKind};
use opbrep_ds::CurveId;
use opbrep_geom::CurveRef;
use opbrep_topo::builder::{make_edge, make_vertex};
use opbrep_topo::tool::{edge_curve, edge_mid_point, edge_range, edge_tangent, edge_vertices};
use opbrep_topo::{explore, Orientation, Shape, ShapeType, State, TopoError};

use super::{point_state, Builder};
use crate::error::BuildError;
use crate::face_builder::FaceBuilder;
use crate::pave::PaveSet;
use crate::shape_set::WireEdgeSet;

/// Parameter gap under which a curve piece is empty.
const PARAM_TOL: f64 = 1e-9;

fn pool_key(v1: &Shape, v2: &Shape) -> (usize, usize) {
    let (a, b) = (v1.entity_id(), v2.entity_id());
    (a.min(b), a.max(b))
}

impl Builder {
    /// Vertex standing for `v` in the result: the coincident vertex of the
    /// first operand for vertices of the second, else `v`.
    pub(super) fn vertex_image(&self, v: &Shape) -> Shape {
        self.session
            .vertex_images
            .get(v)
            .cloned()
            .unwrap_or_else(|| v.oriented(Orientation::Forward))
    }

    /// Unify coincident operand vertices and give every DS point a vertex.
    pub(crate) fn build_vertices(&mut self) {
        let v1s = self.ds.shapes_of(ShapeType::Vertex, 1);
        for v2 in self.ds.shapes_of(ShapeType::Vertex, 2) {
            if let Some(v1) = v1s.iter().find(|v1| compute_vv(v1, &v2, self.config.fuzzy) == 0) {
                self.session.vertex_images.insert(v2.clone(), v1.oriented(Orientation::Forward));
            }
        }

        let mut built = Vec::new();
        for (id, p) in self.ds.points() {
            let origin = p
                .origins
                .iter()
                .find(|o| self.ds.rank(o) == 1)
                .or_else(|| p.origins.first());
            let v = match origin {
                Some(o) => self.vertex_image(o),
                None => make_vertex(p.position, p.tolerance),
            };
            built.push((id, v));
        }
        for (id, v) in built {
            self.session.vertices.insert(id, v);
        }
        debug_bool!("vertices: {} DS points", self.session.vertices.len());
    }

    /// Pave set of `edge` with its end vertices replaced by their images.
    /// The flag is true when an end vertex changed.
    fn pave_set(&self, edge: &Shape) -> Option<(PaveSet, bool)> {
        let mut ps = PaveSet::new(edge)?;
        let (v1, v2) = edge_vertices(edge)?;
        let (i1, i2) = (self.vertex_image(&v1), self.vertex_image(&v2));
        let moved = !i1.is_same(&v1) || !i2.is_same(&v2);
        ps.set_end_vertex(true, &i1);
        ps.set_end_vertex(false, &i2);
        for (t, point) in self.ds.edge_paves(edge) {
            if let Some(v) = self.session.vertices.get(point) {
                ps.append(t, v);
            }
        }
        ps.sort_and_merge();
        Some((ps, moved))
    }

    /// Split every operand edge at its paves and classify the parts
    /// against the other operand.
    pub(crate) fn build_edges(&mut self) -> Result<(), BuildError> {
        for rank in [1u8, 2] {
            let mut parts: Vec<(Shape, Shape)> = Vec::new();
            for e in self.ds.shapes_of(ShapeType::Edge, rank) {
                self.check()?;
                let e = e.oriented(Orientation::Forward);
                let Some((ps, moved)) = self.pave_set(&e) else {
                    tracing::warn!(?e, "edge without curve or vertices skipped");
                    continue;
                };
                let pieces = if ps.is_unsplit() && !moved {
                    self.register_edge(&e);
                    vec![e.clone()]
                } else {
                    self.make_edges(&ps)?
                };
                for p in pieces {
                    if is_micro_edge(&p) {
                        self.report
                            .add_warning(AlertKind::DegeneratedSplit, "edge part smaller than its tolerance", vec![p]);
                        continue;
                    }
                    parts.push((e.clone(), p));
                }
            }
            let states = self.classify_edge_parts(&parts, Self::other_rank(rank));
            for ((e, p), st) in parts.into_iter().zip(states) {
                self.add_split(&e, st, p);
            }
        }
        Ok(())
    }

    fn classify_edge_parts(&self, parts: &[(Shape, Shape)], other_rank: u8) -> Vec<State> {
        let Some(other) = self.ds.operand(other_rank) else {
            return vec![State::Unknown; parts.len()];
        };
        let classifier = self.session.classifier;
        let ctx = &self.ctx;
        let tol = self.config.tolerance();
        let state = |item: &(Shape, Shape)| match edge_mid_point(&item.1) {
            Some(m) => point_state(&classifier, ctx, &m, other, tol.max(item.1.tolerance())),
            None => State::Unknown,
        };
        let states: Vec<State> = if self.config.parallel {
            parts.par_iter().map(&state).collect()
        } else {
            parts.iter().map(&state).collect()
        };
        states
            .into_iter()
            .zip(parts)
            .map(|(st, (_, p))| self.known_state(st, p))
            .collect()
    }

    /// `st`, or `Out` with a warning when unknown.
    pub(super) fn known_state(&self, st: State, part: &Shape) -> State {
        if st == State::Unknown {
            self.report
                .add_warning(AlertKind::UnableToClassify, "part classified Out", vec![part.clone()]);
            State::Out
        } else {
            st
        }
    }

    fn register_edge(&mut self, e: &Shape) {
        let Some((v1, v2)) = edge_vertices(e) else {
            return;
        };
        let list = self.session.edge_pool.entry(pool_key(&v1, &v2)).or_default();
        if !list.iter().any(|x| x.is_same(e)) {
            list.push(e.oriented(Orientation::Forward));
        }
    }

    /// Edge on `curve` from `v1` at `t1` to `v2` at `t2`. An edge already
    /// built between the same vertices through the same middle point is
    /// reused, oriented along the curve.
    pub(super) fn pooled_edge(&mut self, curve: &CurveRef, t1: f64, t2: f64, v1: &Shape, v2: &Shape, tol: f64) -> Result<Shape, TopoError> {
        let key = pool_key(v1, v2);
        let tm = 0.5 * (t1 + t2);
        let (mid, dir) = (curve.evaluate(tm), curve.tangent(tm));
        if let Some(list) = self.session.edge_pool.get(&key) {
            for e in list {
                let Some(m) = edge_mid_point(e) else {
                    continue;
                };
                if (m - mid).norm() > tol + e.tolerance() {
                    continue;
                }
                let along = if v1.is_same(v2) {
                    edge_range(e)
                        .and_then(|(f, l)| edge_tangent(e, 0.5 * (f + l)))
                        .is_some_and(|d| d.dot(&dir) > 0.0)
                } else {
                    edge_vertices(e).is_some_and(|(a, _)| a.is_same(v1))
                };
                return Ok(if along { e.clone() } else { e.reversed() });
            }
        }
        let e = make_edge(curve.clone(), t1, t2, v1, v2, tol)?;
        self.session.edge_pool.entry(key).or_default().push(e.clone());
        Ok(e)
    }

    /// Edges between consecutive paves of `ps`, relative to its edge taken
    /// Forward.
    pub fn make_edges(&mut self, ps: &PaveSet) -> Result<Vec<Shape>, BuildError> {
        let Some((curve, _, _)) = edge_curve(ps.edge()) else {
            return Ok(Vec::new());
        };
        let tol = ps.edge().tolerance();
        let mut out = Vec::new();
        for (a, b) in ps.intervals() {
            out.push(self.pooled_edge(&curve, a.parameter, b.parameter, &a.vertex, &b.vertex, tol)?);
        }
        Ok(out)
    }

    /// Section edges between consecutive points of every DS curve.
    pub(crate) fn build_curve_edges(&mut self) -> Result<(), BuildError> {
        let ids: Vec<CurveId> = self.ds.curves().map(|(id, _)| id).collect();
        for id in ids {
            self.check()?;
            let Some(c) = self.ds.curve(id).cloned() else {
                continue;
            };
            let mut edges = Vec::new();
            for w in c.points.windows(2) {
                let ((ta, pa), (tb, pb)) = (w[0], w[1]);
                if tb - ta <= PARAM_TOL {
                    continue;
                }
                let (Some(va), Some(vb)) = (self.session.vertices.get(pa).cloned(), self.session.vertices.get(pb).cloned())
                else {
                    continue;
                };
                let e = self.pooled_edge(&c.curve, ta, tb, &va, &vb, c.tolerance)?;
                if is_micro_edge(&e) {
                    continue;
                }
                edges.push(e);
            }
            debug_bool!("curve {:?}: {} section edges", id, edges.len());
            self.session.curve_edges.insert(id, edges);
        }
        Ok(())
    }

    // ==== faces ====

    /// All parts of `edge`, composed with its orientation.
    pub(super) fn edge_parts(&self, edge: &Shape) -> Vec<Shape> {
        let o = edge.orientation();
        self.all_splits(edge).iter().map(|p| p.composed(o)).collect()
    }

    pub(super) fn is_edge_modified(&self, edge: &Shape) -> bool {
        let parts = self.all_splits(edge);
        !(parts.len() == 1 && parts[0].is_equal(&edge.oriented(Orientation::Forward)))
    }

    /// Split `face` along its section edges and classify the parts against
    /// the other operand. Faces split already are skipped.
    pub fn make_faces(&mut self, face: &Shape) -> Result<(), BuildError> {
        let f = face.oriented(Orientation::Forward);
        if self.session.splits.contains(&f) {
            return Ok(());
        }
        let tol = self.config.tolerance().max(f.tolerance());
        let curves = self.ds.face_curves(&f);
        let boundary = explore(&f, ShapeType::Edge);
        let modified = boundary.iter().any(|e| self.is_edge_modified(e));

        let parts = if curves.is_empty() && !modified {
            vec![f.clone()]
        } else {
            let Some(mut wes) = WireEdgeSet::new(&f) else {
                tracing::warn!(?f, "face without surface skipped");
                return Ok(());
            };
            for e in &boundary {
                for p in self.edge_parts(e) {
                    wes.add_start_element(&p);
                }
            }
            for id in curves {
                for ce in self.new_edges(id) {
                    let on_boundary = !boundary.iter().any(|b| b.is_same(ce))
                        && edge_mid_point(ce).is_some_and(|m| self.ctx.position_in_face(&m, &f, tol) == UvPosition::Boundary);
                    if !on_boundary {
                        wes.add_section_element(ce);
                    }
                }
            }
            FaceBuilder::new(&wes, f.tolerance()).build(&self.report)?
        };

        let rank = self.ds.rank(face);
        let other = self.ds.operand(Self::other_rank(rank)).cloned();
        for p in parts {
            let st = match (&other, self.ctx.point_in_face(&p)) {
                (Some(o), Some((_, q))) => point_state(&self.session.classifier, &self.ctx, &q, o, tol),
                _ => State::Unknown,
            };
            let st = self.known_state(st, &p);
            debug_bool!("  face part of {:?}: {:?}", f, st);
            self.add_split(&f, st, p);
        }
        Ok(())
    }

    /// Split every face of both operands.
    pub(crate) fn split_faces(&mut self) -> Result<(), BuildError> {
        if self.session.faces_split {
            return Ok(());
        }
        for rank in [1u8, 2] {
            for f in self.ds.shapes_of(ShapeType::Face, rank) {
                self.check()?;
                self.make_faces(&f)?;
            }
        }
        self.session.faces_split = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BuildConfig;
    use approx::assert_relative_eq;
    use opbrep_algo::Context;
    use opbrep_ds::{DataStructure, Filler};
    use opbrep_math::Point3;
    use opbrep_primitives::make_box;
    use opbrep_topo::tool::edge_length;

    fn performed(s1: &Shape, s2: &Shape) -> Builder {
        let mut b = Builder::new(BuildConfig::default());
        let mut ds = DataStructure::new();
        Filler::new(b.context()).perform(&mut ds, s1, s2).unwrap();
        b.perform(ds, s1, s2).unwrap();
        b
    }

    #[test]
    fn test_edge_parts_cover_the_edge() {
        let a = make_box(Point3::origin(), 1.0, 1.0, 1.0).unwrap();
        let b = make_box(Point3::new(0.5, 0.25, 0.25), 1.0, 0.5, 0.5).unwrap();
        let builder = performed(&a, &b);
        let mut split_any = false;
        for e in builder.data_structure().shapes_of(ShapeType::Edge, 2) {
            let parts = builder.all_splits(&e);
            assert!(!parts.is_empty());
            split_any |= parts.len() > 1;
            let total: f64 = parts.iter().map(edge_length).sum();
            assert_relative_eq!(total, edge_length(&e), epsilon = 1e-9);
        }
        assert!(split_any);
    }

    #[test]
    fn test_coincident_vertices_are_unified() {
        let a = make_box(Point3::origin(), 1.0, 1.0, 1.0).unwrap();
        let b = make_box(Point3::new(1.0, 0.0, 0.0), 1.0, 1.0, 1.0).unwrap();
        let builder = performed(&a, &b);
        let shared = builder
            .data_structure()
            .shapes_of(ShapeType::Vertex, 2)
            .iter()
            .filter(|v| !builder.vertex_image(v).is_same(v))
            .count();
        assert_eq!(shared, 4);
    }

    #[test]
    fn test_face_parts_are_classified() {
        let a = make_box(Point3::origin(), 1.0, 1.0, 1.0).unwrap();
        let b = make_box(Point3::new(0.5, -1.0, -1.0), 2.0, 3.0, 3.0).unwrap();
        let mut builder = performed(&a, &b);
        builder.split_faces().unwrap();
        let ctx = Context::new();
        let mut ins = 0;
        let mut outs = 0;
        for f in builder.data_structure().shapes_of(ShapeType::Face, 1) {
            for p in builder.splits(&f, State::In) {
                let (_, q) = ctx.point_in_face(p).unwrap();
                assert!(q.x > 0.5);
                ins += 1;
            }
            for p in builder.splits(&f, State::Out) {
                let (_, q) = ctx.point_in_face(p).unwrap();
                assert!(q.x < 0.5);
                outs += 1;
            }
        }
        // Four side faces split in two, plus the two end faces.
        assert_eq!(ins, 5);
        assert_eq!(outs, 5);
    }
}
