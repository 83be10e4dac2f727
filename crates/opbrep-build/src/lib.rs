#![warn(missing_docs)]

//! Boolean operations on B-rep shapes for the opbrep kernel.
//!
//! Builds the result of a union, difference or intersection from the
//! intersection data filled by `opbrep-ds`. The build has 4 stages:
//! 1. **Split**: vertices are unified, edges are cut at their paves and
//!    section edges are built on the intersection curves
//! 2. **Special cases**: configurations with a direct result ([`KPart`])
//!    skip the general merge
//! 3. **Classify**: faces are rebuilt from their edge parts and each part
//!    is labelled In, On or Out of the other operand
//! 4. **Assemble**: the parts a [`GTopo`] keeps are sewn into shells and
//!    solids, optionally merging pieces lying on one surface
//!
//! [`boolean_op`] runs the whole pipeline; [`Builder`] exposes each stage.

/// Debug logging macro - only prints when debug-boolean feature is enabled
#[allow(unused_macros)]
#[cfg(feature = "debug-boolean")]
macro_rules! debug_bool {
    ($($arg:tt)*) => {
        eprintln!($($arg)*)
    };
}

/// No-op version when debug-boolean feature is disabled
#[allow(unused_macros)]
#[cfg(not(feature = "debug-boolean"))]
macro_rules! debug_bool {
    ($($arg:tt)*) => {};
}

mod api;
mod builder;
mod classifier;
mod config;
mod error;
mod face_builder;
mod gtopo;
mod kpart;
mod pave;
mod shape_set;
mod solid_builder;

pub use api::{boolean_op, boolean_op_with_progress, BooleanOp, BooleanResult};
pub use builder::Builder;
pub use classifier::{
    is_convex_quadric_solid, representative_point, select_classifier, Classifier, QuadricClassifier, RayClassifier,
    TopologyClassifier,
};
pub use config::{BuildConfig, ClassifierTag};
pub use error::BuildError;
pub use face_builder::FaceBuilder;
pub use gtopo::{reverse, GTopo};
pub use kpart::KPart;
pub use pave::{Pave, PaveSet};
pub use shape_set::{ShellFaceSet, WireEdgeSet};
pub use solid_builder::SolidBuilder;

