#![warn(missing_docs)]

//! Algorithmic tools for the opbrep Boolean builder.
//!
//! Free functions classifying shapes against solids, grouping shapes into
//! connexity blocks, comparing orientations of split parts with their
//! originals and correcting tolerances. Derived data is cached in an
//! explicit [`Context`] owned by the calling operation; warnings go to a
//! [`Report`]; long loops poll a [`ProgressRange`].

mod classify;
mod connexity;
mod context;
mod orient;
mod progress;
mod report;
mod shape_tools;
mod tolerance;
pub mod uv;

pub use classify::{
    compute_state_by_one_point, compute_state_edge, compute_state_face, compute_state_for_face, compute_state_point,
    compute_state_vertex, compute_vv, compute_vv_point,
};
pub use connexity::{make_connexity_block, make_connexity_blocks, make_connexity_blocks_list, ConnexityBlock};
pub use context::{Context, FaceUv};
pub use opbrep_topo::tool::is_closed_on_face;
pub use orient::{
    are_faces_same_domain, get_edge_off, get_edge_on_face, get_face_off, is_hole, is_internal_face,
    is_internal_face_in_solid, is_split_to_reverse, is_split_to_reverse_edge, is_split_to_reverse_face,
    is_split_to_reverse_with_warn, orient_edges_on_wire, orient_faces_on_shell, sense, InternalFace, ReverseError,
};
pub use progress::ProgressRange;
pub use report::{Alert, AlertKind, Gravity, Report};
pub use shape_tools::{
    correct_range, dimension, dimensions, has_seam, is_inverted_solid, is_micro_edge, is_open_shell, make_container,
    make_vertex, nb_solids_with_voids, nb_wires_with_seam, treat_compound,
};
pub use tolerance::{correct_curve_on_surface, correct_point_on_curve, correct_tolerances};
