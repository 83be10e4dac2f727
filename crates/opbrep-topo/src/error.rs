//! Errors raised while assembling shapes.

use thiserror::Error;

use crate::ShapeType;

/// Structural errors of the shape graph.
#[derive(Debug, Error)]
pub enum TopoError {
    /// A child of the wrong type was given to a constructor.
    #[error("a {parent:?} cannot contain a {child:?}")]
    IncompatibleChild {
        /// Type of the shape being built.
        parent: ShapeType,
        /// Type of the rejected child.
        child: ShapeType,
    },

    /// A shape was expected to have a given type.
    #[error("expected a {expected:?}, got a {found:?}")]
    UnexpectedType {
        /// Required type.
        expected: ShapeType,
        /// Actual type.
        found: ShapeType,
    },

    /// An edge range is empty or not finite.
    #[error("invalid edge range [{first}, {last}]")]
    InvalidRange {
        /// Start parameter.
        first: f64,
        /// End parameter.
        last: f64,
    },
}

impl TopoError {
    /// Helper to build an [`TopoError::UnexpectedType`].
    pub fn expect_type(expected: ShapeType, found: ShapeType) -> Result<(), Self> {
        if expected == found {
            Ok(())
        } else {
            Err(Self::UnexpectedType { expected, found })
        }
    }
}
