//! Interferences: intersection geometry attached to the shapes it touches.

use opbrep_topo::{Orientation, ShapeType, State};
use serde::{Deserialize, Serialize};

use crate::data_structure::{CurveId, PointId};

/// States on both sides of an interference, seen from the shape carrying it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Transition {
    /// State before the crossing.
    pub before: State,
    /// State after the crossing.
    pub after: State,
    /// Type of the shape the states refer to.
    pub index: ShapeType,
}

impl Transition {
    /// A transition with the same state on both sides.
    pub fn uniform(state: State, index: ShapeType) -> Self {
        Self {
            before: state,
            after: state,
            index,
        }
    }

    /// The transition seen when travelling the other way.
    pub fn complement(self) -> Self {
        Self {
            before: self.after,
            after: self.before,
            index: self.index,
        }
    }

    /// Entering gives Forward, leaving Reversed; staying inside or on the
    /// boundary is Internal, staying out is External.
    pub fn orientation(self) -> Orientation {
        match (self.before, self.after) {
            (State::Out, State::In) => Orientation::Forward,
            (State::In, State::Out) => Orientation::Reversed,
            (State::Out, State::Out) => Orientation::External,
            _ => Orientation::Internal,
        }
    }

    /// True when a side is unknown.
    pub fn has_unknown(self) -> bool {
        self.before == State::Unknown || self.after == State::Unknown
    }
}

/// A piece of intersection geometry recorded on a shape.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Interference {
    /// A DS point splitting an edge at `parameter` of its curve.
    EdgePave {
        /// The split point.
        point: PointId,
        /// Curve parameter on the edge.
        parameter: f64,
        /// Crossing of the other operand along the edge.
        transition: Transition,
    },
    /// A DS curve lying on a face.
    FaceCurve {
        /// The section curve.
        curve: CurveId,
        /// Crossing of the other face across the curve, from its right to its left.
        transition: Transition,
    },
}

impl Interference {
    /// Transition of the interference.
    pub fn transition(&self) -> Transition {
        match self {
            Interference::EdgePave { transition, .. } | Interference::FaceCurve { transition, .. } => *transition,
        }
    }

    /// DS point of an edge pave.
    pub fn point(&self) -> Option<PointId> {
        match self {
            Interference::EdgePave { point, .. } => Some(*point),
            Interference::FaceCurve { .. } => None,
        }
    }

    /// DS curve of a face curve.
    pub fn curve(&self) -> Option<CurveId> {
        match self {
            Interference::FaceCurve { curve, .. } => Some(*curve),
            Interference::EdgePave { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_complement_swaps_sides() {
        let t = Transition {
            before: State::Out,
            after: State::In,
            index: ShapeType::Face,
        };
        assert_eq!(t.orientation(), Orientation::Forward);
        assert_eq!(t.complement().orientation(), Orientation::Reversed);
        assert_eq!(t.complement().complement(), t);
    }

    #[test]
    fn test_uniform_orientations() {
        assert_eq!(Transition::uniform(State::In, ShapeType::Face).orientation(), Orientation::Internal);
        assert_eq!(Transition::uniform(State::On, ShapeType::Edge).orientation(), Orientation::Internal);
        assert_eq!(Transition::uniform(State::Out, ShapeType::Face).orientation(), Orientation::External);
        assert!(Transition::uniform(State::Unknown, ShapeType::Face).has_unknown());
    }
}
