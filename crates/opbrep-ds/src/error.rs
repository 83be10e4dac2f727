//! Errors raised while filling the data structure.

use opbrep_geom::SurfaceKind;
use thiserror::Error;

/// Failure of the intersection pass.
#[derive(Debug, Error)]
pub enum FillError {
    /// Two overlapping faces whose surfaces have no supported intersection.
    #[error("intersection of {first:?} and {second:?} surfaces is not supported")]
    UnsupportedSurfaces {
        /// Surface of the face of the first operand.
        first: SurfaceKind,
        /// Surface of the face of the second operand.
        second: SurfaceKind,
    },
    /// A face or edge without geometry.
    #[error("{0} without geometry")]
    MissingGeometry(&'static str),
    /// The caller cancelled the operation.
    #[error("intersection cancelled")]
    Cancelled,
}
