#![warn(missing_docs)]

//! Intersection data structure for the opbrep Boolean builder.
//!
//! [`Filler`] intersects two solids and records the result in a
//! [`DataStructure`]: points splitting edges, curves lying on pairs of
//! faces and groups of coplanar overlapping faces. Each piece of geometry
//! is linked to the shapes it touches by an [`Interference`] carrying the
//! state transition across it. The `fds_*` queries read this data back
//! while building result shapes.

mod data_structure;
mod error;
mod export;
mod filler;
mod interference;
pub mod intersect;

pub use data_structure::{Config, CurveId, DataStructure, DsCurve, DsPoint, DsSurface, PointId, SurfaceId};
pub use error::FillError;
pub use export::{
    fds_are_same_domain, fds_config_3d, fds_edge_has_paves, fds_has_same_domain_3d, fds_interferences_on_point,
    fds_is_section_point_on_edge, fds_parameter, fds_point, fds_scan_interferences, fds_sdm_faces,
    InterferenceGroups,
};
pub use filler::Filler;
pub use interference::{Interference, Transition};
