//! Shape kinds, orientations and classification states.

use serde::{Deserialize, Serialize};

/// Topological type of a shape, from the most complex to the simplest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ShapeType {
    /// Group of any shapes.
    Compound,
    /// Group of solids sharing faces.
    CompSolid,
    /// Volume bounded by shells.
    Solid,
    /// Set of faces connected through edges.
    Shell,
    /// Bounded portion of a surface.
    Face,
    /// Sequence of edges connected through vertices.
    Wire,
    /// Bounded portion of a curve.
    Edge,
    /// Point with a tolerance.
    Vertex,
}

impl ShapeType {
    /// Kind of the direct children a shape of this type may hold.
    pub fn child_type(self) -> Option<ShapeType> {
        match self {
            ShapeType::Compound => None,
            ShapeType::CompSolid => Some(ShapeType::Solid),
            ShapeType::Solid => Some(ShapeType::Shell),
            ShapeType::Shell => Some(ShapeType::Face),
            ShapeType::Face => Some(ShapeType::Wire),
            ShapeType::Wire => Some(ShapeType::Edge),
            ShapeType::Edge => Some(ShapeType::Vertex),
            ShapeType::Vertex => None,
        }
    }

    /// Topological dimension (compounds report the dimension of a solid).
    pub fn dimension(self) -> i32 {
        match self {
            ShapeType::Compound | ShapeType::CompSolid | ShapeType::Solid => 3,
            ShapeType::Shell | ShapeType::Face => 2,
            ShapeType::Wire | ShapeType::Edge => 1,
            ShapeType::Vertex => 0,
        }
    }
}

/// Orientation of a shape relative to its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Orientation {
    /// Same sense as the underlying geometry.
    Forward,
    /// Opposite sense.
    Reversed,
    /// Matter on both sides.
    Internal,
    /// Matter on neither side.
    External,
}

impl Orientation {
    /// Orientation of a child of orientation `child` inside a parent of orientation `self`.
    pub fn compose(self, child: Orientation) -> Orientation {
        match self {
            Orientation::Forward => child,
            Orientation::Reversed => child.reverse(),
            Orientation::Internal => Orientation::Internal,
            Orientation::External => Orientation::External,
        }
    }

    /// Forward and Reversed are swapped; Internal and External are unchanged.
    pub fn reverse(self) -> Orientation {
        match self {
            Orientation::Forward => Orientation::Reversed,
            Orientation::Reversed => Orientation::Forward,
            o => o,
        }
    }

    /// Forward/Reversed and Internal/External are swapped.
    pub fn complement(self) -> Orientation {
        match self {
            Orientation::Forward => Orientation::Reversed,
            Orientation::Reversed => Orientation::Forward,
            Orientation::Internal => Orientation::External,
            Orientation::External => Orientation::Internal,
        }
    }
}

/// Position of a shape relative to a reference region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum State {
    /// Inside the region.
    In,
    /// Outside the region.
    Out,
    /// On the boundary of the region.
    On,
    /// Could not be decided.
    Unknown,
}

impl State {
    /// In and Out are swapped; On and Unknown are unchanged.
    pub fn reverse(self) -> State {
        match self {
            State::In => State::Out,
            State::Out => State::In,
            s => s,
        }
    }

    /// The three states a split map is kept for.
    pub const SPLIT_STATES: [State; 3] = [State::In, State::On, State::Out];
}
