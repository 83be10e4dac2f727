//! Public API types and entry point for Boolean operations.

use opbrep_algo::{Alert, ProgressRange};
use opbrep_ds::{DataStructure, FillError, Filler};
use opbrep_topo::builder::make_compound;
use opbrep_topo::{Shape, ShapeType, State};
use serde::{Deserialize, Serialize};

use crate::builder::Builder;
use crate::config::BuildConfig;
use crate::error::BuildError;
use crate::kpart::KPart;

/// Boolean operation type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BooleanOp {
    /// Union: combine both operands.
    Fuse,
    /// Difference: subtract the second operand from the first.
    Cut,
    /// Intersection: keep only the overlapping region.
    Common,
}

impl BooleanOp {
    /// States kept for parts of the first and second operand.
    pub fn states(self) -> (State, State) {
        match self {
            BooleanOp::Fuse => (State::Out, State::Out),
            BooleanOp::Cut => (State::Out, State::In),
            BooleanOp::Common => (State::In, State::In),
        }
    }
}

/// Result of a Boolean operation.
#[derive(Debug, Clone)]
pub struct BooleanResult {
    /// A single solid, or a compound holding every result shape (possibly
    /// none).
    pub shape: Shape,
    /// Special case the operation was merged with, if any.
    pub kpart: Option<KPart>,
    /// Warnings recorded while building.
    pub alerts: Vec<Alert>,
}

impl BooleanResult {
    /// True when the result holds no shape.
    pub fn is_empty(&self) -> bool {
        self.shape.shape_type() == ShapeType::Compound && self.shape.nb_children() == 0
    }
}

/// Perform a Boolean operation between `s1` and `s2`.
///
/// Runs the intersection pass, splits both operands, merges the kept
/// parts and finalizes tolerances.
///
/// ```
/// use opbrep_build::{boolean_op, BooleanOp, BuildConfig, KPart};
/// use opbrep_math::Point3;
/// use opbrep_primitives::make_box;
///
/// let a = make_box(Point3::origin(), 1.0, 1.0, 1.0).unwrap();
/// let b = make_box(Point3::new(3.0, 0.0, 0.0), 1.0, 1.0, 1.0).unwrap();
/// let r = boolean_op(&a, &b, BooleanOp::Fuse, &BuildConfig::default()).unwrap();
/// assert_eq!(r.kpart, Some(KPart::IsDisj));
/// ```
pub fn boolean_op(s1: &Shape, s2: &Shape, op: BooleanOp, config: &BuildConfig) -> Result<BooleanResult, BuildError> {
    run(s1, s2, op, Builder::new(config.clone()))
}

/// Like [`boolean_op`], polling `progress` for cancellation.
pub fn boolean_op_with_progress(
    s1: &Shape,
    s2: &Shape,
    op: BooleanOp,
    config: &BuildConfig,
    progress: &ProgressRange,
) -> Result<BooleanResult, BuildError> {
    run(s1, s2, op, Builder::new(config.clone()).with_progress(progress.clone()))
}

fn run(s1: &Shape, s2: &Shape, op: BooleanOp, mut builder: Builder) -> Result<BooleanResult, BuildError> {
    let mut ds = DataStructure::new();
    {
        let mut filler = Filler::new(builder.context()).with_fuzzy(builder.config().fuzzy);
        if let Some(p) = builder.progress() {
            filler = filler.with_progress(p);
        }
        filler.perform(&mut ds, s1, s2).map_err(|e| match e {
            FillError::Cancelled => BuildError::Cancelled,
            e => e.into(),
        })?;
    }
    tracing::debug!(?op, points = ds.nb_points(), curves = ds.nb_curves(), "intersection done");

    builder.perform(ds, s1, s2)?;
    let (tb1, tb2) = op.states();
    builder.merge_shapes(s1, tb1, s2, tb2)?;
    let shapes = builder.merged(s1, tb1).to_vec();
    builder.end()?;

    let shape = match shapes.as_slice() {
        [single] => single.clone(),
        _ => make_compound(&shapes),
    };
    Ok(BooleanResult {
        shape,
        kpart: builder.is_kpart(),
        alerts: builder.report().alerts(),
    })
}
