//! Shape handles over shared topological entities.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use opbrep_geom::{CurveRef, SurfaceRef};
use opbrep_math::{Point3, Transform};

use crate::{Orientation, ShapeType};

/// Geometric payload attached to a topological entity.
#[derive(Debug, Clone)]
pub enum Geometry {
    /// Containers (wire, shell, solid, compound) carry no geometry.
    None,
    /// Vertex position.
    Point(Point3),
    /// Edge curve restricted to `[first, last]`.
    Curve {
        /// Supporting curve.
        curve: CurveRef,
        /// Parameter of the start vertex.
        first: f64,
        /// Parameter of the end vertex.
        last: f64,
    },
    /// Face supporting surface.
    Surface(SurfaceRef),
}

/// A shared topological entity.
///
/// The child list and geometry are fixed at construction. Only the
/// tolerance may change afterwards and it can only grow.
pub struct TShape {
    kind: ShapeType,
    geometry: Geometry,
    tolerance: AtomicU64,
    children: Vec<Shape>,
}

impl TShape {
    pub(crate) fn new(kind: ShapeType, geometry: Geometry, tolerance: f64, children: Vec<Shape>) -> Self {
        Self {
            kind,
            geometry,
            tolerance: AtomicU64::new(tolerance.max(0.0).to_bits()),
            children,
        }
    }

    /// Type of the entity.
    pub fn kind(&self) -> ShapeType {
        self.kind
    }

    /// Geometry payload, expressed in the entity's own frame.
    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    /// Children as stored (orientation and location relative to this entity).
    pub fn children(&self) -> &[Shape] {
        &self.children
    }

    /// Current tolerance.
    pub fn tolerance(&self) -> f64 {
        f64::from_bits(self.tolerance.load(Ordering::Acquire))
    }

    /// Raise the tolerance to `tol` if it is larger; returns the resulting value.
    ///
    /// Non-negative IEEE doubles order like their bit patterns, so an
    /// atomic max on the bits is an atomic max on the values.
    pub fn raise_tolerance(&self, tol: f64) -> f64 {
        if tol.is_nan() || tol <= 0.0 {
            return self.tolerance();
        }
        let prev = self.tolerance.fetch_max(tol.to_bits(), Ordering::AcqRel);
        f64::from_bits(prev).max(tol)
    }
}

impl fmt::Debug for TShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TShape")
            .field("kind", &self.kind)
            .field("tolerance", &self.tolerance())
            .field("children", &self.children.len())
            .finish()
    }
}

/// Placement of a shape: a rigid transform applied over the entity geometry.
#[derive(Debug, Clone, Default)]
pub struct Location {
    transform: Option<Arc<Transform>>,
}

impl Location {
    /// The identity placement.
    pub fn identity() -> Self {
        Self { transform: None }
    }

    /// Placement from a transform.
    pub fn new(t: Transform) -> Self {
        if t.is_identity() {
            Self::identity()
        } else {
            Self {
                transform: Some(Arc::new(t)),
            }
        }
    }

    /// True for the identity placement.
    pub fn is_identity(&self) -> bool {
        self.transform.is_none()
    }

    /// The transform, `None` for identity.
    pub fn transform(&self) -> Option<&Transform> {
        self.transform.as_deref()
    }

    /// `self` applied after `inner`.
    pub fn compose(&self, inner: &Location) -> Location {
        match (&self.transform, &inner.transform) {
            (None, _) => inner.clone(),
            (_, None) => self.clone(),
            (Some(a), Some(b)) => Location::new(a.then(b)),
        }
    }

    /// Apply to a point.
    pub fn apply_point(&self, p: &Point3) -> Point3 {
        match &self.transform {
            Some(t) => t.apply_point(p),
            None => *p,
        }
    }
}

impl PartialEq for Location {
    fn eq(&self, other: &Self) -> bool {
        match (&self.transform, &other.transform) {
            (None, None) => true,
            (Some(a), Some(b)) => Arc::ptr_eq(a, b) || a == b,
            _ => false,
        }
    }
}

/// Value handle on a shared topological entity.
///
/// Equality and hashing are identity of entity and location
/// ([`Shape::is_same`]); orientation is ignored. Use [`Shape::is_equal`]
/// to also compare orientations.
#[derive(Clone)]
pub struct Shape {
    tshape: Arc<TShape>,
    location: Location,
    orientation: Orientation,
}

impl Shape {
    pub(crate) fn from_tshape(tshape: TShape) -> Self {
        Self {
            tshape: Arc::new(tshape),
            location: Location::identity(),
            orientation: Orientation::Forward,
        }
    }

    /// The underlying entity.
    pub fn tshape(&self) -> &Arc<TShape> {
        &self.tshape
    }

    /// Topological type.
    pub fn shape_type(&self) -> ShapeType {
        self.tshape.kind
    }

    /// Orientation of this handle.
    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    /// Placement of this handle.
    pub fn location(&self) -> &Location {
        &self.location
    }

    /// Stable address of the entity, usable as a map key or for debug output.
    pub fn entity_id(&self) -> usize {
        Arc::as_ptr(&self.tshape) as *const () as usize
    }

    /// Same entity and same location.
    pub fn is_same(&self, other: &Shape) -> bool {
        Arc::ptr_eq(&self.tshape, &other.tshape) && self.location == other.location
    }

    /// Same entity, location and orientation.
    pub fn is_equal(&self, other: &Shape) -> bool {
        self.is_same(other) && self.orientation == other.orientation
    }

    /// Same entity, whatever the location and orientation.
    pub fn is_partner(&self, other: &Shape) -> bool {
        Arc::ptr_eq(&self.tshape, &other.tshape)
    }

    /// Copy with the given orientation.
    pub fn oriented(&self, orientation: Orientation) -> Shape {
        Shape {
            tshape: self.tshape.clone(),
            location: self.location.clone(),
            orientation,
        }
    }

    /// Copy with Forward/Reversed swapped.
    pub fn reversed(&self) -> Shape {
        self.oriented(self.orientation.reverse())
    }

    /// Copy with the complemented orientation.
    pub fn complemented(&self) -> Shape {
        self.oriented(self.orientation.complement())
    }

    /// Copy with the orientation composed by `o`.
    pub fn composed(&self, o: Orientation) -> Shape {
        self.oriented(o.compose(self.orientation))
    }

    /// Copy moved by `loc` (applied after the current placement).
    pub fn moved(&self, loc: &Location) -> Shape {
        Shape {
            tshape: self.tshape.clone(),
            location: loc.compose(&self.location),
            orientation: self.orientation,
        }
    }

    /// Number of direct children.
    pub fn nb_children(&self) -> usize {
        self.tshape.children.len()
    }

    /// Direct children with orientation and location composed with this handle.
    pub fn children(&self) -> impl Iterator<Item = Shape> + '_ {
        self.tshape.children.iter().map(move |c| Shape {
            tshape: c.tshape.clone(),
            location: self.location.compose(&c.location),
            orientation: self.orientation.compose(c.orientation),
        })
    }

    /// Tolerance of the entity.
    pub fn tolerance(&self) -> f64 {
        self.tshape.tolerance()
    }

    /// Raise the entity tolerance (never lowers it).
    pub fn raise_tolerance(&self, tol: f64) -> f64 {
        self.tshape.raise_tolerance(tol)
    }
}

impl PartialEq for Shape {
    fn eq(&self, other: &Self) -> bool {
        self.is_same(other)
    }
}

impl Eq for Shape {}

impl Hash for Shape {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.entity_id().hash(state);
    }
}

impl fmt::Debug for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?}#{:x}({:?})",
            self.shape_type(),
            self.entity_id() & 0xffff_ff,
            self.orientation
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::make_vertex;

    #[test]
    fn test_identity_vs_orientation() {
        let v = make_vertex(Point3::origin(), 1e-7);
        let r = v.reversed();
        assert_eq!(v, r);
        assert!(v.is_same(&r));
        assert!(!v.is_equal(&r));
        assert!(v.is_equal(&r.reversed()));
        let other = make_vertex(Point3::origin(), 1e-7);
        assert_ne!(v, other);
    }

    #[test]
    fn test_location_distinguishes_same() {
        let v = make_vertex(Point3::origin(), 1e-7);
        let moved = v.moved(&Location::new(Transform::translation(1.0, 0.0, 0.0)));
        assert!(!v.is_same(&moved));
        assert!(v.is_partner(&moved));
    }

    #[test]
    fn test_tolerance_only_grows() {
        let v = make_vertex(Point3::origin(), 1e-3);
        assert_eq!(v.raise_tolerance(1e-5), 1e-3);
        assert_eq!(v.tolerance(), 1e-3);
        assert_eq!(v.raise_tolerance(2e-3), 2e-3);
        assert_eq!(v.tolerance(), 2e-3);
        v.raise_tolerance(f64::NAN);
        assert_eq!(v.tolerance(), 2e-3);
    }
}
