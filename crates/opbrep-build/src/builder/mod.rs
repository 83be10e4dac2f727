//! The Boolean topological builder.
//!
//! [`Builder::perform`] reads a filled [`DataStructure`]: it splits the
//! edges of both operands at the intersection points, builds the section
//! edges lying on the intersection curves and looks for a special case
//! with a direct result ([`KPart`]). [`Builder::merge_shapes`] then splits
//! the faces, keeps the parts a [`GTopo`] selects and assembles the result,
//! read back with [`Builder::merged`]. [`Builder::end`] finalizes
//! tolerances.
//!
//! Split parts are stored relative to their original taken Forward. Every
//! transient map lives in a session value that [`Builder::clear`] drops.

mod kpart;
mod merge;
mod regularize;
mod section;
mod split;

use std::collections::HashMap;

use opbrep_algo::{correct_tolerances, dimensions, Context, ProgressRange, Report};
use opbrep_ds::{fds_config_3d, fds_has_same_domain_3d, Config, CurveId, DataStructure, PointId, SurfaceId};
use opbrep_math::{precision, Point3};
use opbrep_topo::builder::update_tolerance;
use opbrep_topo::tool::edge_point;
use opbrep_topo::{explore, IndexedShapeMap, Orientation, Shape, ShapeType, State};
use slotmap::SecondaryMap;

use crate::classifier::{representative_point, select_classifier, Classifier, TopologyClassifier};
use crate::config::BuildConfig;
use crate::error::BuildError;
use crate::gtopo::{self, GTopo};
use crate::kpart::KPart;

/// Shapes grouped by state.
#[derive(Debug, Clone, Default)]
pub(crate) struct StateLists([Vec<Shape>; 3]);

impl StateLists {
    fn slot(state: State) -> Option<usize> {
        match state {
            State::In => Some(0),
            State::On => Some(1),
            State::Out => Some(2),
            State::Unknown => None,
        }
    }

    pub(crate) fn get(&self, state: State) -> &[Shape] {
        Self::slot(state).map_or(&[][..], |i| self.0[i].as_slice())
    }

    /// Add `shape` unless an equal one is present.
    pub(crate) fn push(&mut self, state: State, shape: Shape) {
        if let Some(i) = Self::slot(state) {
            if !self.0[i].iter().any(|s| s.is_equal(&shape)) {
                self.0[i].push(shape);
            }
        }
    }

    pub(crate) fn set(&mut self, state: State, shapes: Vec<Shape>) {
        if let Some(i) = Self::slot(state) {
            self.0[i] = shapes;
        }
    }

    pub(crate) fn all(&self) -> impl Iterator<Item = &Shape> {
        self.0.iter().flatten()
    }
}

/// Maps of one `perform`.
#[derive(Debug, Default)]
struct Session {
    performed: bool,
    ended: bool,
    kpart: Option<Option<KPart>>,
    classifier: TopologyClassifier,
    states: Option<(State, State)>,
    splits: IndexedShapeMap<StateLists>,
    // split part -> original
    origins: IndexedShapeMap<Shape>,
    faces_split: bool,
    merged: IndexedShapeMap<StateLists>,
    vertices: SecondaryMap<PointId, Shape>,
    vertex_images: IndexedShapeMap<Shape>,
    // edges keyed by the entity ids of their end vertices
    edge_pool: HashMap<(usize, usize), Vec<Shape>>,
    curve_edges: SecondaryMap<CurveId, Vec<Shape>>,
    section: Vec<Shape>,
}

/// Builds the result shapes of Boolean operations from a filled data
/// structure.
#[derive(Debug)]
pub struct Builder {
    config: BuildConfig,
    ctx: Context,
    report: Report,
    progress: Option<ProgressRange>,
    ds: DataStructure,
    session: Session,
}

impl Default for Builder {
    fn default() -> Self {
        Self::new(BuildConfig::default())
    }
}

impl Builder {
    /// Builder with the given options.
    pub fn new(config: BuildConfig) -> Self {
        Self {
            config,
            ctx: Context::new(),
            report: Report::new(),
            progress: None,
            ds: DataStructure::new(),
            session: Session::default(),
        }
    }

    /// Poll `progress` for cancellation.
    pub fn with_progress(mut self, progress: ProgressRange) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Options of the builder.
    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    /// Cache of derived shape data, shared with the intersection pass.
    pub fn context(&self) -> &Context {
        &self.ctx
    }

    /// Warnings recorded so far.
    pub fn report(&self) -> &Report {
        &self.report
    }

    /// Progress handle, if any.
    pub fn progress(&self) -> Option<&ProgressRange> {
        self.progress.as_ref()
    }

    // ==== perform ====

    /// Take `ds`, filled from `s1` and `s2`, and split the operands.
    pub fn perform(&mut self, ds: DataStructure, s1: &Shape, s2: &Shape) -> Result<(), BuildError> {
        for (s, expected) in [(s1, 1u8), (s2, 2u8)] {
            let found = ds.rank(s);
            if found != expected {
                return Err(BuildError::RankMismatch { expected, found });
            }
        }
        self.perform_ds(ds)
    }

    /// Take `ds` and split the operands it holds.
    pub fn perform_ds(&mut self, ds: DataStructure) -> Result<(), BuildError> {
        if self.session.ended {
            return Err(BuildError::Ended);
        }
        let s1 = ds.shape1().cloned().ok_or(BuildError::MissingOperand(1))?;
        let s2 = ds.shape2().cloned().ok_or(BuildError::MissingOperand(2))?;
        self.ds = ds;
        self.session = Session {
            classifier: select_classifier(&s1, &s2, &self.config, &self.ctx),
            ..Session::default()
        };
        debug_bool!("\n========== BUILDER PERFORM ==========");
        debug_bool!("classifier: {:?}", self.session.classifier);

        let result = self.split_operands();
        if result.is_err() {
            self.session = Session::default();
        }
        result?;

        let kpart = self.find_is_kpart();
        self.session.performed = true;
        tracing::debug!(
            ?kpart,
            vertices = self.session.vertices.len(),
            curve_edges = self.session.curve_edges.len(),
            "operands split"
        );
        Ok(())
    }

    fn split_operands(&mut self) -> Result<(), BuildError> {
        self.build_vertices();
        self.build_edges()?;
        self.build_curve_edges()?;
        self.init_section();
        Ok(())
    }

    /// The data structure taken by the last `perform`.
    pub fn data_structure(&self) -> &DataStructure {
        &self.ds
    }

    /// Drop the session. The data structure is kept.
    pub fn clear(&mut self) {
        self.session = Session::default();
        self.ctx.clear();
    }

    /// Drop the merge results so another operation can be merged from the
    /// same split parts.
    pub fn clear_maps(&mut self) {
        self.session.merged.clear();
        self.session.states = None;
    }

    /// Raise the tolerances of the new vertices to cover the points merged
    /// into them, correct the tolerances of the result shapes and lock the
    /// session until [`clear`](Self::clear).
    pub fn end(&mut self) -> Result<(), BuildError> {
        if self.session.ended {
            return Err(BuildError::Ended);
        }
        for (id, v) in self.session.vertices.iter() {
            if let Some(p) = self.ds.point(id) {
                update_tolerance(v, p.spread() + precision::DTOLERANCE);
            }
        }
        for (_, lists) in self.session.merged.iter() {
            for s in lists.all() {
                correct_tolerances(s, self.config.tol_max, self.config.parallel);
            }
        }
        self.session.ended = true;
        tracing::debug!(alerts = self.report.alerts().len(), "builder session ended");
        Ok(())
    }

    fn check(&self) -> Result<(), BuildError> {
        match &self.progress {
            Some(p) if !p.step() => Err(BuildError::Cancelled),
            _ => Ok(()),
        }
    }

    fn check_open(&self) -> Result<(), BuildError> {
        if self.session.ended {
            return Err(BuildError::Ended);
        }
        if !self.session.performed {
            return Err(BuildError::NotPerformed);
        }
        Ok(())
    }

    fn operand(&self, rank: u8) -> Result<Shape, BuildError> {
        self.ds.operand(rank).cloned().ok_or(BuildError::MissingOperand(rank))
    }

    /// Rank of the operand a part of rank `rank` is classified against.
    fn other_rank(rank: u8) -> u8 {
        if rank == 2 {
            1
        } else {
            2
        }
    }

    fn gtopo(&self, tb1: State, tb2: State) -> Result<GTopo, BuildError> {
        self.session
            .classifier
            .gtopo(tb1, tb2)
            .ok_or(BuildError::InvalidStates { tb1, tb2 })
    }

    // ==== splits and results ====

    fn add_split(&mut self, original: &Shape, state: State, part: Shape) {
        if !self.session.origins.contains(&part) {
            self.session.origins.insert(part.clone(), original.oriented(Orientation::Forward));
        }
        self.session
            .splits
            .entry(&original.oriented(Orientation::Forward))
            .push(state, part);
    }

    fn store_merged(&mut self, s1: &Shape, tb1: State, s2: &Shape, tb2: State, shapes: Vec<Shape>) {
        self.session.merged.entry(s1).set(tb1, shapes.clone());
        self.session.merged.entry(s2).set(tb2, shapes);
    }

    /// Parts of `s` in `state`, relative to `s` taken Forward.
    pub fn splits(&self, s: &Shape, state: State) -> &[Shape] {
        self.session.splits.get(s).map_or(&[][..], |l| l.get(state))
    }

    /// True when `s` has parts in `state`.
    pub fn is_split(&self, s: &Shape, state: State) -> bool {
        !self.splits(s, state).is_empty()
    }

    /// Every part of `s`, whatever its state.
    pub fn all_splits(&self, s: &Shape) -> Vec<Shape> {
        self.session
            .splits
            .get(s)
            .map(|l| l.all().cloned().collect())
            .unwrap_or_default()
    }

    /// Result shapes stored for `s` and `state` by the last merge.
    pub fn merged(&self, s: &Shape, state: State) -> &[Shape] {
        self.session.merged.get(s).map_or(&[][..], |l| l.get(state))
    }

    /// True when a merge stored results for `s` and `state`.
    pub fn is_merged(&self, s: &Shape, state: State) -> bool {
        self.session.merged.get(s).is_some_and(|l| !l.get(state).is_empty())
    }

    /// Vertex built on a DS point.
    pub fn new_vertex(&self, point: PointId) -> Option<&Shape> {
        self.session.vertices.get(point)
    }

    /// Edges built on a DS curve.
    pub fn new_edges(&self, curve: CurveId) -> &[Shape] {
        self.session.curve_edges.get(curve).map_or(&[][..], |v| v.as_slice())
    }

    /// Face parts built on a surface shared by same-domain faces.
    pub fn new_faces(&self, surface: SurfaceId) -> Vec<Shape> {
        let Some(group) = self.ds.surface(surface) else {
            return Vec::new();
        };
        let mut out: Vec<Shape> = Vec::new();
        for f in &group.faces {
            for part in self.all_splits(f) {
                if !out.iter().any(|x| x.is_same(&part)) {
                    out.push(part);
                }
            }
        }
        out
    }

    /// Rank of `s`, or of the original `s` was split from; 0 when unknown.
    pub fn shape_rank(&self, s: &Shape) -> u8 {
        match self.ds.rank(s) {
            0 => self.session.origins.get(s).map_or(0, |o| self.ds.rank(o)),
            r => r,
        }
    }

    /// True when `s` belongs to the operand of `rank`.
    pub fn is_shape_of(&self, s: &Shape, rank: u8) -> bool {
        self.shape_rank(s) == rank
    }

    /// Same-domain shapes of `s`: those of its own operand (`s` included)
    /// and those of the other.
    pub fn find_same_domain(&self, s: &Shape) -> (Vec<Shape>, Vec<Shape>) {
        let rank = self.ds.rank(s);
        let mut same = vec![s.clone()];
        let mut other = Vec::new();
        for x in self.ds.same_domain(s) {
            if self.ds.rank(x) == rank {
                if !same.iter().any(|y| y.is_same(x)) {
                    same.push(x.clone());
                }
            } else {
                other.push(x.clone());
            }
        }
        (same, other)
    }

    /// Like [`find_same_domain`](Self::find_same_domain), keeping only the
    /// shapes oriented like `s`.
    pub fn find_same_domain_same_orientation(&self, s: &Shape) -> (Vec<Shape>, Vec<Shape>) {
        let (same, other) = self.find_same_domain(s);
        let alike = |x: &Shape| x.is_same(s) || fds_config_3d(&self.ds, s, x) == Some(Config::SameOriented);
        (
            same.into_iter().filter(|x| alike(x)).collect(),
            other.into_iter().filter(|x| alike(x)).collect(),
        )
    }

    /// True when `s` has a same-domain shape in the other operand.
    pub fn has_same_domain_3d(&self, s: &Shape) -> bool {
        fds_has_same_domain_3d(&self.ds, s)
    }

    /// State of `s` relative to `others`: the first state that is not
    /// `Out`, else `Out`.
    pub fn shape_position(&self, s: &Shape, others: &[Shape]) -> State {
        let Some(p) = representative_point(s, &self.ctx) else {
            return State::Unknown;
        };
        let tol = self.config.tolerance().max(s.tolerance());
        let mut state = State::Out;
        for o in others {
            match point_state(&self.session.classifier, &self.ctx, &p, o, tol) {
                State::Out => {}
                st => {
                    state = st;
                    break;
                }
            }
        }
        state
    }

    /// True when `s` lies in state `tb` relative to the operand it does not
    /// belong to.
    pub fn keep_shape(&self, s: &Shape, tb: State) -> bool {
        let Some(other) = self.ds.operand(Self::other_rank(self.shape_rank(s))) else {
            return false;
        };
        self.shape_position(s, std::slice::from_ref(other)) == tb
    }

    /// The last merge was the difference `S1 - S2`.
    pub fn opec12(&self) -> bool {
        self.session.states == Some((State::Out, State::In))
    }

    /// The last merge was the difference `S2 - S1`.
    pub fn opec21(&self) -> bool {
        self.session.states == Some((State::In, State::Out))
    }

    /// The last merge was the intersection.
    pub fn opecom(&self) -> bool {
        self.session.states == Some((State::In, State::In))
    }

    /// The last merge was the union.
    pub fn opefus(&self) -> bool {
        self.session.states == Some((State::Out, State::Out))
    }

    /// Most complex type inside `s`, looking through compounds. `None` for
    /// an empty compound.
    pub fn top_type(s: &Shape) -> Option<ShapeType> {
        if s.shape_type() != ShapeType::Compound {
            return Some(s.shape_type());
        }
        s.children().filter_map(|c| Self::top_type(&c)).min()
    }

    /// True when `l` holds `s`.
    pub fn contains(s: &Shape, l: &[Shape]) -> bool {
        l.iter().any(|x| x.is_same(s))
    }

    /// True when parts kept with states `(t1, t2)` change orientation.
    pub fn reverse(t1: State, t2: State) -> bool {
        gtopo::reverse(t1, t2)
    }

    /// `o`, complemented when `r`.
    pub fn orient(o: Orientation, r: bool) -> Orientation {
        if r {
            o.complement()
        } else {
            o
        }
    }
}

/// Largest dimension of the shapes inside `s`.
fn top_dimension(s: &Shape) -> i32 {
    dimensions(s).1
}

/// State of `p` relative to `other`. Solids of `other` are classified
/// with `classifier`; lower dimensional shapes give `On` or `Out`.
pub(crate) fn point_state(classifier: &TopologyClassifier, ctx: &Context, p: &Point3, other: &Shape, tol: f64) -> State {
    let solids = explore(other, ShapeType::Solid);
    if !solids.is_empty() {
        let mut state = State::Out;
        for s in &solids {
            match classifier.classify_point(p, s, tol, ctx) {
                State::In => return State::In,
                State::On => state = State::On,
                State::Unknown if state == State::Out => state = State::Unknown,
                _ => {}
            }
        }
        return state;
    }
    if explore(other, ShapeType::Face)
        .iter()
        .any(|f| ctx.is_valid_point_for_face(p, f, tol))
    {
        return State::On;
    }
    let on_edge = explore(other, ShapeType::Edge).iter().any(|e| {
        ctx.project_point_on_edge(p, e)
            .and_then(|t| edge_point(e, t))
            .is_some_and(|q| (q - p).norm() <= tol + e.tolerance())
    });
    if on_edge {
        State::On
    } else {
        State::Out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opbrep_ds::Filler;
    use opbrep_primitives::make_box;
    use opbrep_topo::tool::vertex_point;

    fn performed(s1: &Shape, s2: &Shape) -> Builder {
        let mut b = Builder::default();
        let mut ds = DataStructure::new();
        Filler::new(b.context()).perform(&mut ds, s1, s2).unwrap();
        b.perform(ds, s1, s2).unwrap();
        b
    }

    /// The face of `solid` whose vertices all have `coord` equal to `value`.
    fn face_at(solid: &Shape, coord: usize, value: f64) -> Shape {
        explore(solid, ShapeType::Face)
            .into_iter()
            .find(|f| {
                explore(f, ShapeType::Vertex)
                    .iter()
                    .all(|v| vertex_point(v).is_some_and(|p| (p[coord] - value).abs() < 1e-9))
            })
            .unwrap()
    }

    #[test]
    fn test_same_domain_of_overlapping_boxes() {
        let a = make_box(Point3::origin(), 1.0, 1.0, 1.0).unwrap();
        let c = make_box(Point3::new(0.5, 0.0, 0.0), 1.0, 1.0, 1.0).unwrap();
        let b = performed(&a, &c);
        let bottom = face_at(&a, 2, 0.0);
        let (same, other) = b.find_same_domain(&bottom);
        assert_eq!(same.len(), 1);
        assert!(same[0].is_same(&bottom));
        assert_eq!(other.len(), 1);
        assert!(other[0].is_same(&face_at(&c, 2, 0.0)));
        assert!(b.has_same_domain_3d(&bottom));

        let (same, other) = b.find_same_domain_same_orientation(&bottom);
        assert_eq!((same.len(), other.len()), (1, 1));

        let left = face_at(&a, 0, 0.0);
        let (same, other) = b.find_same_domain(&left);
        assert_eq!((same.len(), other.len()), (1, 0));
    }

    #[test]
    fn test_same_domain_of_stacked_boxes_differ_in_orientation() {
        let a = make_box(Point3::origin(), 1.0, 1.0, 1.0).unwrap();
        let c = make_box(Point3::new(0.0, 0.0, 1.0), 1.0, 1.0, 1.0).unwrap();
        let b = performed(&a, &c);
        let top = face_at(&a, 2, 1.0);
        assert_eq!(b.find_same_domain(&top).1.len(), 1);
        assert!(b.find_same_domain_same_orientation(&top).1.is_empty());
    }

    #[test]
    fn test_keep_shape_against_other_operand() {
        let a = make_box(Point3::origin(), 1.0, 1.0, 1.0).unwrap();
        let c = make_box(Point3::new(0.5, 0.0, 0.0), 1.0, 1.0, 1.0).unwrap();
        let b = performed(&a, &c);
        let outside = face_at(&a, 0, 0.0);
        assert!(b.keep_shape(&outside, State::Out));
        assert!(!b.keep_shape(&outside, State::In));
        let inside = face_at(&c, 0, 0.5);
        assert!(b.keep_shape(&inside, State::In));
        assert_eq!(b.shape_position(&inside, &[a.clone()]), State::In);
    }

    #[test]
    fn test_new_faces_cover_same_domain_groups() {
        let a = make_box(Point3::origin(), 1.0, 1.0, 1.0).unwrap();
        let c = make_box(Point3::new(0.5, 0.0, 0.0), 1.0, 1.0, 1.0).unwrap();
        let mut b = performed(&a, &c);
        b.merge_shapes(&a, State::Out, &c, State::Out).unwrap();
        let groups: Vec<(SurfaceId, usize)> = b.data_structure().surfaces().map(|(id, s)| (id, s.faces.len())).collect();
        assert!(!groups.is_empty());
        for (id, nb_faces) in groups {
            let parts = b.new_faces(id);
            assert!(parts.len() >= nb_faces);
            assert!(parts.iter().all(|p| p.shape_type() == ShapeType::Face));
        }
    }

    #[test]
    fn test_faces_touching_edge() {
        let a = make_box(Point3::origin(), 1.0, 1.0, 1.0).unwrap();
        let c = make_box(Point3::new(0.5, 0.0, 0.0), 1.0, 1.0, 1.0).unwrap();
        let mut b = performed(&a, &c);
        b.merge_shapes(&a, State::Out, &c, State::Out).unwrap();
        let left = face_at(&a, 0, 0.0);
        let edge = explore(&left, ShapeType::Edge)[0].clone();
        let touching = b.find_faces_touching_edge(&left, &edge, &[]);
        assert_eq!(touching.len(), 1);
        assert!(!touching[0].is_same(&left));
        assert!(b.find_faces_touching_edge(&left, &edge, &touching).is_empty());
    }
}
