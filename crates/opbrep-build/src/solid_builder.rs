//! Assembling shells and solids from a [`ShellFaceSet`].

use opbrep_algo::{is_inverted_solid, make_connexity_blocks_list, AlertKind, Context, Report};
use opbrep_math::precision;
use opbrep_topo::builder::{make_shell, make_solid};
use opbrep_topo::{Shape, ShapeType, State, TopoError};

use crate::classifier::{representative_point, Classifier};
use crate::shape_set::ShellFaceSet;

/// Builds the solids bounded by the faces of a [`ShellFaceSet`].
///
/// Faces connected through shared edges form one shell. Shells facing
/// inwards are voids and go to the smallest solid containing them.
#[derive(Debug)]
pub struct SolidBuilder<'a> {
    sfs: &'a ShellFaceSet,
}

struct Outer {
    shell: Shape,
    solid: Shape,
    size: f64,
    voids: Vec<Shape>,
}

impl<'a> SolidBuilder<'a> {
    /// Builder over `sfs`.
    pub fn new(sfs: &'a ShellFaceSet) -> Self {
        Self { sfs }
    }

    /// One shell per connected group of faces.
    pub fn make_shells(&self) -> Result<Vec<Shape>, TopoError> {
        make_connexity_blocks_list(self.sfs.faces(), ShapeType::Edge, ShapeType::Face)
            .into_iter()
            .filter(|b| !b.shapes.is_empty())
            .map(|b| make_shell(&b.shapes))
            .collect()
    }

    /// Solids with their voids.
    pub fn make_solids<C: Classifier>(&self, classifier: &C, ctx: &Context, report: &Report) -> Result<Vec<Shape>, TopoError> {
        let mut outers: Vec<Outer> = Vec::new();
        let mut voids: Vec<Shape> = Vec::new();
        for shell in self.make_shells()? {
            let solid = make_solid(std::slice::from_ref(&shell))?;
            if is_inverted_solid(&solid, ctx) {
                voids.push(shell);
            } else {
                let size = ctx.shape_box(&solid).diagonal();
                outers.push(Outer {
                    shell,
                    solid,
                    size,
                    voids: Vec::new(),
                });
            }
        }
        outers.sort_by(|a, b| a.size.total_cmp(&b.size));

        let mut lonely = Vec::new();
        for void in voids {
            let host = representative_point(&void, ctx).and_then(|p| {
                outers
                    .iter_mut()
                    .find(|o| classifier.classify_point(&p, &o.solid, precision::CONFUSION, ctx) == State::In)
            });
            match host {
                Some(o) => o.voids.push(void),
                None => {
                    report.add_warning(AlertKind::UnableToOrientTheShape, "void shell outside every solid", vec![void.clone()]);
                    lonely.push(void);
                }
            }
        }

        let mut solids = Vec::with_capacity(outers.len() + lonely.len());
        for o in outers {
            let mut shells = vec![o.shell];
            shells.extend(o.voids);
            solids.push(make_solid(&shells)?);
        }
        for void in lonely {
            solids.push(make_solid(&[void])?);
        }
        tracing::trace!(solids = solids.len(), "solids assembled");
        Ok(solids)
    }
}
