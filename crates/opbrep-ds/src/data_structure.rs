//! The intersection data structure.
//!
//! Holds the two operands, the ranks of their sub-shapes, the new geometry
//! produced by intersecting them (points, curves, shared surfaces) and the
//! interferences linking that geometry to the shapes it touches. New
//! geometry lives in slot maps and is referenced by typed keys.

use opbrep_geom::{CurveRef, SurfaceRef};
use opbrep_math::Point3;
use opbrep_topo::tool::face_surface;
use opbrep_topo::{explore, IndexedShapeMap, Shape, ShapeType};
use serde::{Deserialize, Serialize};
use slotmap::{new_key_type, SlotMap};

use crate::interference::{Interference, Transition};

new_key_type! {
    /// Key of a DS point.
    pub struct PointId;

    /// Key of a DS curve.
    pub struct CurveId;

    /// Key of a surface shared by same-domain faces.
    pub struct SurfaceId;
}

/// Relative orientation of a same-domain shape and its reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Config {
    /// No same-domain partner.
    #[default]
    Unshgeometry,
    /// Same geometric orientation as the reference.
    SameOriented,
    /// Opposite geometric orientation.
    DiffOriented,
}

impl Config {
    /// Configuration relative to a reference reached through `self`.
    pub fn compose(self, other: Config) -> Config {
        match (self, other) {
            (Config::Unshgeometry, c) | (c, Config::Unshgeometry) => c,
            (a, b) if a == b => Config::SameOriented,
            _ => Config::DiffOriented,
        }
    }
}

/// An intersection point.
#[derive(Debug, Clone)]
pub struct DsPoint {
    /// Representative position.
    pub position: Point3,
    /// Tolerance of the point.
    pub tolerance: f64,
    /// Every position merged into this point.
    pub samples: Vec<Point3>,
    /// Vertices of the operands lying on this point.
    pub origins: Vec<Shape>,
}

impl DsPoint {
    /// Largest distance from the position to a merged sample.
    pub fn spread(&self) -> f64 {
        self.samples
            .iter()
            .map(|q| (q - self.position).norm())
            .fold(0.0, f64::max)
    }
}

/// An intersection curve between two faces, with its split points.
#[derive(Debug, Clone)]
pub struct DsCurve {
    /// Geometry.
    pub curve: CurveRef,
    /// Start parameter.
    pub first: f64,
    /// End parameter.
    pub last: f64,
    /// True for a full periodic curve.
    pub closed: bool,
    /// Tolerance of the curve.
    pub tolerance: f64,
    /// The two faces whose intersection produced the curve.
    pub faces: [Shape; 2],
    /// Points on the curve, sorted by parameter. Both ends are included.
    pub points: Vec<(f64, PointId)>,
}

/// A surface shared by a group of same-domain faces.
#[derive(Debug, Clone)]
pub struct DsSurface {
    /// The common geometry, taken from the first face of the group.
    pub surface: SurfaceRef,
    /// Faces of the group.
    pub faces: Vec<Shape>,
}

#[derive(Debug, Clone, Default)]
struct ShapeData {
    rank: u8,
    interferences: Vec<Interference>,
    same_domain: Vec<Shape>,
    reference: Option<Shape>,
    config: Config,
    surface: Option<SurfaceId>,
}

/// Operands, new geometry and interferences of one Boolean operation.
#[derive(Debug, Default)]
pub struct DataStructure {
    operands: [Option<Shape>; 2],
    shapes: IndexedShapeMap<ShapeData>,
    points: SlotMap<PointId, DsPoint>,
    curves: SlotMap<CurveId, DsCurve>,
    surfaces: SlotMap<SurfaceId, DsSurface>,
}

impl DataStructure {
    /// Empty data structure.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset and store the operands. Every sub-shape of `s1` gets rank 1;
    /// sub-shapes of `s2` not shared with `s1` get rank 2.
    pub fn init(&mut self, s1: &Shape, s2: &Shape) {
        self.clear();
        self.operands = [Some(s1.clone()), Some(s2.clone())];
        for (shape, rank) in [(s1, 1), (s2, 2)] {
            self.add_shape(shape, rank);
            for kind in [ShapeType::Solid, ShapeType::Shell, ShapeType::Face, ShapeType::Wire, ShapeType::Edge, ShapeType::Vertex] {
                for sub in explore(shape, kind) {
                    self.add_shape(&sub, rank);
                }
            }
        }
    }

    /// Register `shape` with `rank` unless it is known already.
    pub fn add_shape(&mut self, shape: &Shape, rank: u8) -> usize {
        if let Some(i) = self.shapes.find_index(shape) {
            return i;
        }
        self.shapes.insert(
            shape.clone(),
            ShapeData {
                rank,
                ..ShapeData::default()
            },
        )
    }

    /// First operand.
    pub fn shape1(&self) -> Option<&Shape> {
        self.operands[0].as_ref()
    }

    /// Second operand.
    pub fn shape2(&self) -> Option<&Shape> {
        self.operands[1].as_ref()
    }

    /// Operand of rank 1 or 2.
    pub fn operand(&self, rank: u8) -> Option<&Shape> {
        match rank {
            1 => self.shape1(),
            2 => self.shape2(),
            _ => None,
        }
    }

    /// Rank of `shape`: 1 or 2, 0 when unknown.
    pub fn rank(&self, shape: &Shape) -> u8 {
        self.shapes.get(shape).map_or(0, |d| d.rank)
    }

    /// True when `shape` is registered.
    pub fn has_shape(&self, shape: &Shape) -> bool {
        self.shapes.contains(shape)
    }

    /// Registered shapes of a type and rank, in registration order.
    pub fn shapes_of(&self, kind: ShapeType, rank: u8) -> Vec<Shape> {
        self.shapes
            .iter()
            .filter(|(s, d)| s.shape_type() == kind && d.rank == rank)
            .map(|(s, _)| s.clone())
            .collect()
    }

    // ==== points ====

    /// Add a point, merging it into an existing point when their
    /// tolerance spheres touch.
    pub fn add_point(&mut self, position: Point3, tolerance: f64) -> PointId {
        let hit = self
            .points
            .iter()
            .find(|(_, p)| (p.position - position).norm() <= p.tolerance + tolerance)
            .map(|(id, _)| id);
        if let Some(id) = hit {
            let p = &mut self.points[id];
            p.samples.push(position);
            p.tolerance = p.tolerance.max(tolerance);
            return id;
        }
        self.points.insert(DsPoint {
            position,
            tolerance,
            samples: vec![position],
            origins: Vec::new(),
        })
    }

    /// A point by key.
    pub fn point(&self, id: PointId) -> Option<&DsPoint> {
        self.points.get(id)
    }

    /// Mutable access to a point.
    pub fn point_mut(&mut self, id: PointId) -> Option<&mut DsPoint> {
        self.points.get_mut(id)
    }

    /// All points.
    pub fn points(&self) -> impl Iterator<Item = (PointId, &DsPoint)> {
        self.points.iter()
    }

    /// Number of points.
    pub fn nb_points(&self) -> usize {
        self.points.len()
    }

    // ==== curves ====

    /// Add a curve and record it as a face curve on both of its faces.
    pub fn add_curve(&mut self, curve: DsCurve, transitions: [Option<Transition>; 2]) -> CurveId {
        let faces = curve.faces.clone();
        let id = self.curves.insert(curve);
        for (face, transition) in faces.iter().zip(transitions) {
            if let Some(transition) = transition {
                self.add_interference(face, Interference::FaceCurve { curve: id, transition });
            }
        }
        id
    }

    /// A curve by key.
    pub fn curve(&self, id: CurveId) -> Option<&DsCurve> {
        self.curves.get(id)
    }

    /// Mutable access to a curve.
    pub fn curve_mut(&mut self, id: CurveId) -> Option<&mut DsCurve> {
        self.curves.get_mut(id)
    }

    /// All curves.
    pub fn curves(&self) -> impl Iterator<Item = (CurveId, &DsCurve)> {
        self.curves.iter()
    }

    /// Number of curves.
    pub fn nb_curves(&self) -> usize {
        self.curves.len()
    }

    // ==== interferences ====

    /// Attach an interference to `shape`, registering the shape if needed.
    pub fn add_interference(&mut self, shape: &Shape, interference: Interference) {
        if !self.shapes.contains(shape) {
            self.add_shape(shape, 0);
        }
        if let Some(d) = self.shapes.get_mut(shape) {
            d.interferences.push(interference);
        }
    }

    /// Interferences of `shape`.
    pub fn interferences(&self, shape: &Shape) -> &[Interference] {
        self.shapes.get(shape).map_or(&[][..], |d| d.interferences.as_slice())
    }

    /// True when `shape` carries interferences.
    pub fn has_geometry(&self, shape: &Shape) -> bool {
        !self.interferences(shape).is_empty()
    }

    /// Curves lying on `face`.
    pub fn face_curves(&self, face: &Shape) -> Vec<CurveId> {
        let mut out: Vec<CurveId> = Vec::new();
        for c in self.interferences(face).iter().filter_map(Interference::curve) {
            if !out.contains(&c) {
                out.push(c);
            }
        }
        out
    }

    /// Paves of `edge`, sorted by parameter, one per point.
    pub fn edge_paves(&self, edge: &Shape) -> Vec<(f64, PointId)> {
        let mut out: Vec<(f64, PointId)> = Vec::new();
        for i in self.interferences(edge) {
            if let Interference::EdgePave { point, parameter, .. } = i {
                if !out.iter().any(|(_, p)| p == point) {
                    out.push((*parameter, *point));
                }
            }
        }
        out.sort_by(|a, b| a.0.total_cmp(&b.0));
        out
    }

    // ==== same domain ====

    /// Record `s2` as same-domain with `s1`, `config` being the orientation
    /// of `s2` relative to `s1`.
    pub fn add_same_domain(&mut self, s1: &Shape, s2: &Shape, config: Config) {
        for s in [s1, s2] {
            if !self.shapes.contains(s) {
                self.add_shape(s, 0);
            }
        }
        let reference = self.reference(s1).cloned().unwrap_or_else(|| s1.clone());
        let c1 = if reference.is_same(s1) {
            Config::SameOriented
        } else {
            self.config(s1)
        };
        if let Some(d) = self.shapes.get_mut(s1) {
            if !d.same_domain.iter().any(|x| x.is_same(s2)) {
                d.same_domain.push(s2.clone());
            }
            if d.reference.is_none() {
                d.reference = Some(reference.clone());
                d.config = c1;
            }
        }
        if let Some(d) = self.shapes.get_mut(s2) {
            if !d.same_domain.iter().any(|x| x.is_same(s1)) {
                d.same_domain.push(s1.clone());
            }
            if d.reference.is_none() {
                d.reference = Some(reference);
                d.config = c1.compose(config);
            }
        }
        if s1.shape_type() == ShapeType::Face {
            self.join_surface(s1, s2);
        }
    }

    fn join_surface(&mut self, s1: &Shape, s2: &Shape) {
        let existing = self.surface_of(s1).or_else(|| self.surface_of(s2));
        let id = match existing {
            Some(id) => id,
            None => {
                let Some(surface) = face_surface(s1) else {
                    return;
                };
                self.surfaces.insert(DsSurface {
                    surface,
                    faces: Vec::new(),
                })
            }
        };
        for s in [s1, s2] {
            if let Some(d) = self.shapes.get_mut(s) {
                d.surface = Some(id);
            }
            let group = &mut self.surfaces[id].faces;
            if !group.iter().any(|x| x.is_same(s)) {
                group.push(s.clone());
            }
        }
    }

    /// Shapes recorded as same-domain with `shape`.
    pub fn same_domain(&self, shape: &Shape) -> &[Shape] {
        self.shapes.get(shape).map_or(&[][..], |d| d.same_domain.as_slice())
    }

    /// True when `shape` has a same-domain partner.
    pub fn has_same_domain(&self, shape: &Shape) -> bool {
        !self.same_domain(shape).is_empty()
    }

    /// Reference of the same-domain group of `shape`.
    pub fn reference(&self, shape: &Shape) -> Option<&Shape> {
        self.shapes.get(shape).and_then(|d| d.reference.as_ref())
    }

    /// Orientation of `shape` relative to its reference.
    pub fn config(&self, shape: &Shape) -> Config {
        self.shapes.get(shape).map_or(Config::Unshgeometry, |d| d.config)
    }

    /// Shared surface of the same-domain group of `face`.
    pub fn surface_of(&self, face: &Shape) -> Option<SurfaceId> {
        self.shapes.get(face).and_then(|d| d.surface)
    }

    /// A shared surface by key.
    pub fn surface(&self, id: SurfaceId) -> Option<&DsSurface> {
        self.surfaces.get(id)
    }

    /// All shared surfaces.
    pub fn surfaces(&self) -> impl Iterator<Item = (SurfaceId, &DsSurface)> {
        self.surfaces.iter()
    }

    /// Drop operands, geometry and interferences.
    pub fn clear(&mut self) {
        self.operands = [None, None];
        self.shapes.clear();
        self.points.clear();
        self.curves.clear();
        self.surfaces.clear();
    }
}
