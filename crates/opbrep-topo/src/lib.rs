#![warn(missing_docs)]

//! Shape graph for the opbrep kernel.
//!
//! A [`Shape`] is a cheap value handle over a shared [`TShape`] entity,
//! carrying an [`Orientation`] and a [`Location`]. Entities hold their
//! children and an `Arc`-shared geometry payload; they are never
//! structurally mutated once built. Modifying a shape means building a new
//! entity that reuses sub-entities.

pub mod builder;
mod error;
pub mod explorer;
mod orientation;
mod shape;
pub mod tool;

pub use error::TopoError;
pub use explorer::{explore, explore_avoid, map_shapes, map_shapes_and_ancestors, IndexedShapeMap, IndexedShapeSet};
pub use orientation::{Orientation, ShapeType, State};
pub use shape::{Geometry, Location, Shape, TShape};
