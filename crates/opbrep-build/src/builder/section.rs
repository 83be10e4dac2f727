//! Section edges: the intersection of the operand boundaries.

use opbrep_topo::{Shape, ShapeType, State};

use super::Builder;

impl Builder {
    pub(super) fn init_section(&mut self) {
        self.session.section = self.section_edges();
    }

    /// Parts of the operand edges lying on the boundary of the other
    /// operand.
    pub fn split_section_edges(&self) -> Vec<Shape> {
        let mut out: Vec<Shape> = Vec::new();
        for rank in [1u8, 2] {
            for e in self.ds.shapes_of(ShapeType::Edge, rank) {
                for p in self.splits(&e, State::On) {
                    if !Self::contains(p, &out) {
                        out.push(p.clone());
                    }
                }
            }
        }
        out
    }

    /// Edges built on the intersection curves.
    pub fn section_curves(&self) -> Vec<Shape> {
        let mut out: Vec<Shape> = Vec::new();
        for (_, edges) in self.session.curve_edges.iter() {
            for e in edges {
                if !Self::contains(e, &out) {
                    out.push(e.clone());
                }
            }
        }
        out
    }

    /// Every section edge, each once.
    pub fn section_edges(&self) -> Vec<Shape> {
        let mut out = self.split_section_edges();
        for e in self.section_curves() {
            if !Self::contains(&e, &out) {
                out.push(e);
            }
        }
        out
    }

    /// Section edges computed by `perform`.
    pub fn section(&self) -> &[Shape] {
        &self.session.section
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::{Classifier, RayClassifier};
    use crate::config::BuildConfig;
    use opbrep_algo::Context;
    use opbrep_ds::{DataStructure, Filler};
    use opbrep_math::Point3;
    use opbrep_primitives::make_box;
    use opbrep_topo::tool::edge_mid_point;

    #[test]
    fn test_section_lies_on_both_boundaries() {
        let a = make_box(Point3::origin(), 1.0, 1.0, 1.0).unwrap();
        let c = make_box(Point3::new(0.5, 0.25, 0.25), 1.0, 0.5, 0.5).unwrap();
        let mut b = Builder::new(BuildConfig::default());
        let mut ds = DataStructure::new();
        Filler::new(b.context()).perform(&mut ds, &a, &c).unwrap();
        b.perform(ds, &a, &c).unwrap();

        let section = b.section().to_vec();
        assert!(!section.is_empty());
        assert_eq!(section.len(), b.section_edges().len());
        let ctx = Context::new();
        for e in &section {
            let m = edge_mid_point(e).unwrap();
            assert_eq!(RayClassifier.classify_point(&m, &a, 1e-6, &ctx), State::On);
            assert_eq!(RayClassifier.classify_point(&m, &c, 1e-6, &ctx), State::On);
        }
    }

    #[test]
    fn test_no_section_without_perform() {
        let b = Builder::default();
        assert!(b.section().is_empty());
        assert!(b.section_curves().is_empty());
    }
}
