//! Errors of the topological builder.

use opbrep_ds::FillError;
use opbrep_topo::{ShapeType, State, TopoError};
use thiserror::Error;

/// Failure of a builder operation.
///
/// Geometric failures on single entities are logged and the entity is
/// dropped; only inconsistencies of the data structure or the shape graph
/// end the operation.
#[derive(Debug, Error)]
pub enum BuildError {
    /// The data structure holds no operand of the given rank.
    #[error("no operand of rank {0} in the data structure")]
    MissingOperand(u8),
    /// An operand is not registered with the expected rank.
    #[error("operand registered with rank {found}, expected {expected}")]
    RankMismatch {
        /// Rank the caller passed the shape as.
        expected: u8,
        /// Rank found in the data structure.
        found: u8,
    },
    /// The caller cancelled the operation.
    #[error("operation cancelled")]
    Cancelled,
    /// The session was ended; call `clear` before reusing the builder.
    #[error("builder session already ended")]
    Ended,
    /// `merge_shapes` was called before `perform`.
    #[error("no intersection data; call perform first")]
    NotPerformed,
    /// The requested states select no Boolean operation.
    #[error("no operation keeps parts in states {tb1:?} and {tb2:?}")]
    InvalidStates {
        /// State kept for parts of the first operand.
        tb1: State,
        /// State kept for parts of the second operand.
        tb2: State,
    },
    /// A shape carries no geometry.
    #[error("{0:?} without geometry")]
    MissingGeometry(ShapeType),
    /// The intersection pass failed.
    #[error(transparent)]
    Fill(#[from] FillError),
    /// A shape could not be assembled.
    #[error(transparent)]
    Topo(#[from] TopoError),
}
