//! Special configurations merged without splitting faces.
//!
//! Detectors run once per `perform`, in the order kole, koletge, disj,
//! fafa, soso. The first hit is cached in the session.

use opbrep_algo::is_hole;
use opbrep_algo::uv::{edge_polyline, UvPosition};
use opbrep_ds::fds_sdm_faces;
use opbrep_math::Point3;
use opbrep_topo::builder::make_face;
use opbrep_topo::tool::{face_normal, face_surface};
use opbrep_topo::{explore, Orientation, Shape, ShapeType, State};

use super::{top_dimension, Builder};
use crate::classifier::{representative_point, Classifier};
use crate::error::BuildError;
use crate::gtopo::GTopo;
use crate::kpart::KPart;
use crate::shape_set::ShellFaceSet;

fn single_solid(s: &Shape) -> Option<Shape> {
    match explore(s, ShapeType::Solid).as_slice() {
        [solid] => Some(solid.clone()),
        _ => None,
    }
}

impl Builder {
    /// Detect the special case of the operands, once per `perform`.
    pub fn find_is_kpart(&mut self) -> Option<KPart> {
        if let Some(k) = self.session.kpart {
            return k;
        }
        let k = if !self.config.use_kparts {
            None
        } else if self.kp_is_kole() {
            Some(KPart::IsKole)
        } else if self.kp_is_koletge() {
            Some(KPart::IsKoletge)
        } else if self.kp_is_disj() {
            Some(KPart::IsDisj)
        } else if self.kp_is_fafa() {
            Some(KPart::IsFafa)
        } else if self.kp_is_soso() {
            Some(KPart::IsSoso)
        } else {
            None
        };
        self.session.kpart = Some(k);
        k
    }

    /// Special case found by the last `perform`.
    pub fn is_kpart(&self) -> Option<KPart> {
        self.session.kpart.flatten()
    }

    /// State of the solid `a` relative to the solid `b`.
    pub fn kp_clas_ss(&self, a: &Shape, b: &Shape) -> State {
        let Some(p) = representative_point(a, &self.ctx) else {
            return State::Unknown;
        };
        self.session.classifier.classify_point(&p, b, self.config.tolerance(), &self.ctx)
    }

    fn no_interference(&self) -> bool {
        self.ds.nb_points() == 0
            && self.ds.nb_curves() == 0
            && self
                .ds
                .shapes_of(ShapeType::Face, 1)
                .iter()
                .all(|f| !self.has_same_domain_3d(f))
    }

    fn operand_solids(&self) -> Option<(Shape, Shape)> {
        let s1 = single_solid(self.ds.operand(1)?)?;
        let s2 = single_solid(self.ds.operand(2)?)?;
        Some((s1, s2))
    }

    /// One solid strictly inside the other.
    pub fn kp_is_kole(&self) -> bool {
        let Some((s1, s2)) = self.operand_solids() else {
            return false;
        };
        self.no_interference() && (self.kp_clas_ss(&s1, &s2) == State::In || self.kp_clas_ss(&s2, &s1) == State::In)
    }

    /// One solid touching the other through a single face lying inside a
    /// face of the other.
    pub fn kp_is_koletge(&self) -> bool {
        self.koletge_faces().is_some()
    }

    /// Host and guest faces of a koletge configuration.
    fn koletge_faces(&self) -> Option<(Shape, Shape)> {
        let (s1, s2) = self.operand_solids()?;
        let mut pairs = Vec::new();
        for f in explore(&s1, ShapeType::Face) {
            let partners: Vec<Shape> = fds_sdm_faces(&self.ds, &f)
                .into_iter()
                .filter(|x| self.ds.rank(x) == 2)
                .collect();
            if let [p] = partners.as_slice() {
                pairs.push((f.clone(), p.clone()));
            } else if !partners.is_empty() {
                return None;
            }
        }
        let [(f1, f2)] = pairs.as_slice() else {
            return None;
        };
        let (host, guest, host_solid, guest_solid) = if self.face_in_face(f2, f1) {
            (f1, f2, &s1, &s2)
        } else if self.face_in_face(f1, f2) {
            (f2, f1, &s2, &s1)
        } else {
            return None;
        };

        let tol = self.config.tolerance();
        let curves_on_guest = self.ds.curves().all(|(_, c)| {
            let m = c.curve.evaluate(0.5 * (c.first + c.last));
            self.ctx.position_in_face(&m, guest, tol) == UvPosition::Boundary
        });
        if !curves_on_guest {
            return None;
        }
        let host_rest_out = explore(host_solid, ShapeType::Face)
            .iter()
            .filter(|f| !f.is_same(host))
            .all(|f| self.kp_clas_ss(f, guest_solid) == State::Out);
        let guest_states: Vec<State> = explore(guest_solid, ShapeType::Face)
            .iter()
            .filter(|f| !f.is_same(guest))
            .map(|f| self.kp_clas_ss(f, host_solid))
            .collect();
        let uniform = guest_states
            .first()
            .is_some_and(|s| matches!(s, State::In | State::Out) && guest_states.iter().all(|x| x == s));
        (host_rest_out && uniform).then(|| (host.clone(), guest.clone()))
    }

    /// True when `inner` lies inside `outer` without touching its
    /// boundary, so that `outer` minus `inner` is a ring of positive area.
    fn face_in_face(&self, inner: &Shape, outer: &Shape) -> bool {
        let tol = self.config.tolerance();
        let samples: Vec<Point3> = explore(inner, ShapeType::Edge).iter().flat_map(edge_polyline).collect();
        !samples.is_empty()
            && samples
                .iter()
                .all(|p| self.ctx.position_in_face(p, outer, tol) == UvPosition::Inside)
    }

    /// Disjoint operands.
    pub fn kp_is_disj(&self) -> bool {
        let (Some(s1), Some(s2)) = (self.ds.operand(1), self.ds.operand(2)) else {
            return false;
        };
        if top_dimension(s1) != 3 || top_dimension(s2) != 3 || !self.no_interference() {
            return false;
        }
        let out_of = |a: &Shape, b: &Shape| {
            explore(a, ShapeType::Solid)
                .iter()
                .all(|x| explore(b, ShapeType::Solid).iter().all(|y| self.kp_clas_ss(x, y) == State::Out))
        };
        out_of(s1, s2) && out_of(s2, s1)
    }

    fn fafa_faces(&self) -> Option<(Shape, Shape)> {
        let f1 = match explore(self.ds.operand(1)?, ShapeType::Face).as_slice() {
            [f] => f.clone(),
            _ => return None,
        };
        let f2 = match explore(self.ds.operand(2)?, ShapeType::Face).as_slice() {
            [f] => f.clone(),
            _ => return None,
        };
        if top_dimension(self.ds.operand(1)?) != 2 || top_dimension(self.ds.operand(2)?) != 2 {
            return None;
        }
        if !fds_sdm_faces(&self.ds, &f1).iter().any(|x| x.is_same(&f2)) {
            return None;
        }
        Some((f1, f2))
    }

    /// Two coplanar faces, one inside the other.
    pub fn kp_is_fafa(&self) -> bool {
        self.fafa_faces()
            .is_some_and(|(f1, f2)| self.face_in_face(&f1, &f2) || self.face_in_face(&f2, &f1))
    }

    /// Two solids bounded by the same faces.
    pub fn kp_is_soso(&self) -> bool {
        let Some((s1, s2)) = self.operand_solids() else {
            return false;
        };
        if self.ds.nb_curves() != 0 {
            return false;
        }
        let (l1, l2) = (explore(&s1, ShapeType::Face), explore(&s2, ShapeType::Face));
        l1.len() == l2.len() && l1.iter().chain(l2.iter()).all(|f| self.has_same_domain_3d(f))
    }

    // ==== merge ====

    /// Build the result of the special case for the states `tb1`, `tb2`.
    pub fn merge_kpart(&mut self, tb1: State, tb2: State) -> Result<(), BuildError> {
        let g = self.gtopo(tb1, tb2)?;
        let (s1, s2) = (self.operand(1)?, self.operand(2)?);
        tracing::debug!(kpart = ?self.is_kpart(), ?tb1, ?tb2, "special case merge");
        match self.is_kpart() {
            Some(KPart::IsKole) => self.merge_kpart_is_kole(&s1, tb1, &s2, tb2, &g),
            Some(KPart::IsKoletge) => self.merge_kpart_is_koletge(&s1, tb1, &s2, tb2, &g),
            Some(KPart::IsDisj) => {
                self.merge_kpart_is_disj(&s1, tb1, &s2, tb2);
                Ok(())
            }
            Some(KPart::IsFafa) => self.merge_kpart_is_fafa(&s1, tb1, &s2, tb2),
            Some(KPart::IsSoso) => {
                self.merge_kpart_is_soso(&s1, tb1, &s2, tb2, &g);
                Ok(())
            }
            None => self.merge_solids(&s1, tb1, &s2, tb2, &g),
        }
    }

    /// Keep each solid whose state matches its requested state. A kept
    /// solid that is reversed becomes a void of the other.
    pub fn merge_kpart_is_kole(&mut self, s1: &Shape, tb1: State, s2: &Shape, tb2: State, g: &GTopo) -> Result<(), BuildError> {
        let st1 = self.kp_clas_ss(s1, s2);
        let st2 = self.kp_clas_ss(s2, s1);
        let mut sfs = ShellFaceSet::new();
        for (s, st, tb, rank) in [(s1, st1, tb1, 1u8), (s2, st2, tb2, 2u8)] {
            if st != tb {
                continue;
            }
            let rev = g.is_to_reverse(rank);
            for f in explore(s, ShapeType::Face) {
                sfs.add_face(&f.oriented(Self::orient(f.orientation(), rev)));
            }
        }
        let solids = self.make_solids(&sfs)?;
        self.store_merged(s1, tb1, s2, tb2, solids);
        Ok(())
    }

    /// Split the host face into a ring around the guest and a patch on the
    /// guest, then merge the solids.
    pub fn merge_kpart_is_koletge(&mut self, s1: &Shape, tb1: State, s2: &Shape, tb2: State, g: &GTopo) -> Result<(), BuildError> {
        let Some((host, guest)) = self.koletge_faces() else {
            return self.merge_solids(s1, tb1, s2, tb2, g);
        };
        let host_fwd = host.oriented(Orientation::Forward);
        if !self.session.splits.contains(&host_fwd) {
            let ring = self.kp_make_face(&host_fwd, std::slice::from_ref(&guest))?;
            let patch = self.align_face(&guest, &host_fwd);
            self.add_split(&host, State::Out, ring);
            self.add_split(&host, State::On, patch);
            self.add_split(&guest, State::On, guest.oriented(Orientation::Forward));
        }
        self.merge_solids(s1, tb1, s2, tb2, g)
    }

    /// `face` oriented so its normal agrees with the normal of `reference`.
    fn align_face(&self, face: &Shape, reference: &Shape) -> Shape {
        let aligned = self.ctx.point_in_face(face).and_then(|(uv, p)| {
            let n = face_normal(face, uv)?;
            let ruv = face_surface(reference)?.project(&p)?;
            let rn = face_normal(reference, ruv)?;
            Some(n.dot(&rn) >= 0.0)
        });
        match aligned {
            Some(false) => face.reversed(),
            _ => face.clone(),
        }
    }

    /// Keep the operands whose requested state is `Out`, unchanged.
    pub fn merge_kpart_is_disj(&mut self, s1: &Shape, tb1: State, s2: &Shape, tb2: State) {
        let mut kept = Vec::new();
        for (s, tb) in [(s1, tb1), (s2, tb2)] {
            if tb == State::Out {
                kept.extend(explore(s, ShapeType::Solid));
            }
        }
        self.store_merged(s1, tb1, s2, tb2, kept);
    }

    /// Nested coplanar faces: the guest, the host, or the host with a hole.
    pub fn merge_kpart_is_fafa(&mut self, s1: &Shape, tb1: State, s2: &Shape, tb2: State) -> Result<(), BuildError> {
        let Some((f1, f2)) = self.fafa_faces() else {
            self.store_merged(s1, tb1, s2, tb2, Vec::new());
            return Ok(());
        };
        // rank of the larger face
        let host_rank = if self.face_in_face(&f2, &f1) { 1u8 } else { 2 };
        let (host, guest) = if host_rank == 1 { (&f1, &f2) } else { (&f2, &f1) };
        let result = match (tb1, tb2) {
            (State::In, State::In) => vec![guest.clone()],
            (State::Out, State::Out) => vec![host.clone()],
            // the first operand minus the second
            (State::Out, State::In) if host_rank == 1 => vec![self.kp_make_face(host, std::slice::from_ref(guest))?],
            (State::In, State::Out) if host_rank == 2 => vec![self.kp_make_face(host, std::slice::from_ref(guest))?],
            _ => Vec::new(),
        };
        self.store_merged(s1, tb1, s2, tb2, result);
        Ok(())
    }

    /// Identical boundaries: the first operand when coincident parts
    /// oriented alike are kept, nothing otherwise.
    pub fn merge_kpart_is_soso(&mut self, s1: &Shape, tb1: State, s2: &Shape, tb2: State, g: &GTopo) {
        let kept = if self.session.classifier.take_same_oriented(g) {
            explore(s1, ShapeType::Solid)
        } else {
            Vec::new()
        };
        self.store_merged(s1, tb1, s2, tb2, kept);
    }

    /// `face` with the outer wire of each of `holes` added as a hole.
    pub fn kp_make_face(&self, face: &Shape, holes: &[Shape]) -> Result<Shape, BuildError> {
        let o = face.orientation();
        let f = face.oriented(Orientation::Forward);
        let surface = face_surface(&f).ok_or(BuildError::MissingGeometry(ShapeType::Face))?;
        let mut wires: Vec<Shape> = f.children().collect();
        for h in holes {
            let Some(w) = h.children().next() else {
                continue;
            };
            wires.push(if is_hole(&w, &f) { w } else { w.reversed() });
        }
        Ok(make_face(surface, &wires, f.tolerance())?.oriented(o))
    }
}
