#![warn(missing_docs)]

//! Boolean operations on B-rep solids.
//!
//! Provides the [`Solid`] type, a thin handle over a B-rep shape that can
//! be combined with union, difference and intersection. The lower level
//! crates are re-exported for callers that drive the builder directly.
//!
//! # Example
//!
//! ```
//! use opbrep::Solid;
//!
//! let a = Solid::cube([0.0, 0.0, 0.0], 1.0, 1.0, 1.0).unwrap();
//! let b = Solid::cube([0.5, 0.0, 0.0], 1.0, 1.0, 1.0).unwrap();
//! let u = a.union(&b).unwrap();
//! assert_eq!(u.num_solids(), 1);
//! ```

pub use opbrep_algo;
pub use opbrep_build;
pub use opbrep_ds;
pub use opbrep_geom;
pub use opbrep_math;
pub use opbrep_primitives;
pub use opbrep_topo;

pub use opbrep_build::{BooleanOp, BuildConfig, BuildError, KPart};

use opbrep_algo::Context;
use opbrep_build::boolean_op;
use opbrep_math::Point3;
use opbrep_topo::builder::make_compound;
use opbrep_topo::{explore, Shape, ShapeType, TopoError};

/// A solid, or a set of solids, built from primitives and Boolean
/// operations.
#[derive(Debug, Clone)]
pub struct Solid {
    shape: Shape,
    config: BuildConfig,
}

impl Solid {
    // =========================================================================
    // Constructors
    // =========================================================================

    /// Create an empty solid.
    pub fn empty() -> Self {
        Self::from_shape(make_compound(&[]))
    }

    /// Wrap an existing shape.
    pub fn from_shape(shape: Shape) -> Self {
        Self {
            shape,
            config: BuildConfig::default(),
        }
    }

    /// Create a box with its minimum corner at `min` and dimensions `(sx, sy, sz)`.
    pub fn cube(min: [f64; 3], sx: f64, sy: f64, sz: f64) -> Result<Self, TopoError> {
        let p = Point3::new(min[0], min[1], min[2]);
        Ok(Self::from_shape(opbrep_primitives::make_box(p, sx, sy, sz)?))
    }

    /// Create a cylinder along Z with its base center at `base`.
    pub fn cylinder(base: [f64; 3], radius: f64, height: f64) -> Result<Self, TopoError> {
        let p = Point3::new(base[0], base[1], base[2]);
        Ok(Self::from_shape(opbrep_primitives::make_cylinder(p, radius, height)?))
    }

    /// Use `config` for the Boolean operations started from this solid.
    pub fn with_config(mut self, config: BuildConfig) -> Self {
        self.config = config;
        self
    }

    // =========================================================================
    // Boolean operations
    // =========================================================================

    /// Boolean union (self ∪ other).
    pub fn union(&self, other: &Solid) -> Result<Solid, BuildError> {
        self.boolean(other, BooleanOp::Fuse)
    }

    /// Boolean difference (self − other).
    pub fn difference(&self, other: &Solid) -> Result<Solid, BuildError> {
        self.boolean(other, BooleanOp::Cut)
    }

    /// Boolean intersection (self ∩ other).
    pub fn intersection(&self, other: &Solid) -> Result<Solid, BuildError> {
        self.boolean(other, BooleanOp::Common)
    }

    fn boolean(&self, other: &Solid, op: BooleanOp) -> Result<Solid, BuildError> {
        match (self.is_empty(), other.is_empty()) {
            (true, _) => Ok(match op {
                BooleanOp::Fuse => other.clone(),
                BooleanOp::Cut | BooleanOp::Common => Solid::empty(),
            }),
            (_, true) => Ok(match op {
                BooleanOp::Fuse | BooleanOp::Cut => self.clone(),
                BooleanOp::Common => Solid::empty(),
            }),
            _ => {
                let r = boolean_op(&self.shape, &other.shape, op, &self.config)?;
                Ok(Solid {
                    shape: r.shape,
                    config: self.config.clone(),
                })
            }
        }
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// The underlying shape.
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// True when the solid holds no solid.
    pub fn is_empty(&self) -> bool {
        self.num_solids() == 0
    }

    /// Number of solids.
    pub fn num_solids(&self) -> usize {
        explore(&self.shape, ShapeType::Solid).len()
    }

    /// Number of faces.
    pub fn num_faces(&self) -> usize {
        explore(&self.shape, ShapeType::Face).len()
    }

    /// Axis-aligned bounding box as `(min, max)`, enlarged by tolerances.
    pub fn bounding_box(&self) -> ([f64; 3], [f64; 3]) {
        let b = Context::new().shape_box(&self.shape);
        ([b.min.x, b.min.y, b.min.z], [b.max.x, b.max.y, b.max.z])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty() {
        let empty = Solid::empty();
        assert!(empty.is_empty());
        let cube = Solid::cube([0.0; 3], 1.0, 1.0, 1.0).unwrap();
        assert!(!cube.is_empty());
        assert_eq!(empty.union(&cube).unwrap().num_faces(), 6);
        assert!(cube.intersection(&empty).unwrap().is_empty());
        assert_eq!(cube.difference(&empty).unwrap().num_faces(), 6);
    }

    #[test]
    fn test_difference() {
        let a = Solid::cube([0.0; 3], 1.0, 1.0, 1.0).unwrap();
        let b = Solid::cube([0.5, 0.0, 0.0], 1.0, 1.0, 1.0).unwrap();
        let d = a.difference(&b).unwrap();
        let (min, max) = d.bounding_box();
        assert!(min[0].abs() < 1e-4);
        assert!((max[0] - 0.5).abs() < 1e-4);
    }

    #[test]
    fn test_regularized_union() {
        let config = BuildConfig {
            regularize: true,
            ..BuildConfig::default()
        };
        let a = Solid::cube([0.0; 3], 1.0, 1.0, 1.0).unwrap().with_config(config);
        let b = Solid::cube([0.5, 0.0, 0.0], 1.0, 1.0, 1.0).unwrap();
        let u = a.union(&b).unwrap();
        assert_eq!(u.num_solids(), 1);
        assert_eq!(u.num_faces(), 6);
    }

    #[test]
    fn test_disjoint_union_keeps_both() {
        let a = Solid::cube([0.0; 3], 1.0, 1.0, 1.0).unwrap();
        let b = Solid::cylinder([5.0, 0.0, 0.0], 1.0, 2.0).unwrap();
        let u = a.union(&b).unwrap();
        assert_eq!(u.num_solids(), 2);
        assert_eq!(u.num_faces(), 9);
    }
}
