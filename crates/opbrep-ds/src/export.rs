//! Queries on the filled data structure used when building result shapes.

use opbrep_math::Point3;
use opbrep_topo::tool::edge_vertices;
use opbrep_topo::{Orientation, Shape};

use crate::data_structure::{Config, DataStructure, PointId};
use crate::interference::Interference;

/// Interferences split by the orientation of their transition.
#[derive(Debug, Clone, Default)]
pub struct InterferenceGroups {
    /// Entering transitions.
    pub forward: Vec<Interference>,
    /// Leaving transitions.
    pub reversed: Vec<Interference>,
    /// Transitions staying inside or on the boundary.
    pub internal: Vec<Interference>,
}

/// True when `s1` and `s2` belong to the same same-domain group.
pub fn fds_are_same_domain(ds: &DataStructure, s1: &Shape, s2: &Shape) -> bool {
    if s1.is_same(s2) {
        return ds.has_same_domain(s1);
    }
    match (ds.reference(s1), ds.reference(s2)) {
        (Some(r1), Some(r2)) => r1.is_same(r2),
        _ => ds.same_domain(s1).iter().any(|x| x.is_same(s2)),
    }
}

/// True when `s` has a same-domain partner of the other operand.
pub fn fds_has_same_domain_3d(ds: &DataStructure, s: &Shape) -> bool {
    let rank = ds.rank(s);
    ds.same_domain(s).iter().any(|x| ds.rank(x) != rank)
}

/// Orientation of `s2` relative to `s1` when they share a domain.
pub fn fds_config_3d(ds: &DataStructure, s1: &Shape, s2: &Shape) -> Option<Config> {
    if !fds_are_same_domain(ds, s1, s2) {
        return None;
    }
    Some(ds.config(s1).compose(ds.config(s2)))
}

/// Curve parameter of an edge pave.
pub fn fds_parameter(interference: &Interference) -> Option<f64> {
    match interference {
        Interference::EdgePave { parameter, .. } => Some(*parameter),
        Interference::FaceCurve { .. } => None,
    }
}

/// Split interferences by transition orientation. External ones are dropped.
pub fn fds_scan_interferences(interferences: &[Interference]) -> InterferenceGroups {
    let mut groups = InterferenceGroups::default();
    for i in interferences {
        match i.transition().orientation() {
            Orientation::Forward => groups.forward.push(*i),
            Orientation::Reversed => groups.reversed.push(*i),
            Orientation::Internal => groups.internal.push(*i),
            Orientation::External => {}
        }
    }
    groups
}

/// True when `point` is a pave of `edge` or coincides with one of its vertices.
pub fn fds_is_section_point_on_edge(ds: &DataStructure, point: PointId, edge: &Shape) -> bool {
    if ds.edge_paves(edge).iter().any(|(_, p)| *p == point) {
        return true;
    }
    let Some(p) = ds.point(point) else {
        return false;
    };
    let Some((v1, v2)) = edge_vertices(edge) else {
        return false;
    };
    p.origins.iter().any(|o| o.is_same(&v1) || o.is_same(&v2))
}

/// Interferences of `shape` involving `point`.
pub fn fds_interferences_on_point(ds: &DataStructure, shape: &Shape, point: PointId) -> Vec<Interference> {
    ds.interferences(shape)
        .iter()
        .filter(|i| match i {
            Interference::EdgePave { point: p, .. } => *p == point,
            Interference::FaceCurve { curve, .. } => ds
                .curve(*curve)
                .is_some_and(|c| c.points.iter().any(|(_, p)| *p == point)),
        })
        .copied()
        .collect()
}

/// True when `edge` is split by at least one pave.
pub fn fds_edge_has_paves(ds: &DataStructure, edge: &Shape) -> bool {
    !ds.edge_paves(edge).is_empty()
}

/// Faces sharing the surface of `face`, `face` excluded.
pub fn fds_sdm_faces(ds: &DataStructure, face: &Shape) -> Vec<Shape> {
    match ds.surface_of(face).and_then(|id| ds.surface(id)) {
        Some(group) => group.faces.iter().filter(|f| !f.is_same(face)).cloned().collect(),
        None => ds.same_domain(face).to_vec(),
    }
}

/// Position of a DS point, if it exists.
pub fn fds_point(ds: &DataStructure, point: PointId) -> Option<Point3> {
    ds.point(point).map(|p| p.position)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interference::Transition;
    use opbrep_math::Point3;
    use opbrep_primitives::make_box;
    use opbrep_topo::{explore, ShapeType, State};

    fn faces(s: &Shape) -> Vec<Shape> {
        explore(s, ShapeType::Face)
    }

    #[test]
    fn test_same_domain_groups() {
        let a = make_box(Point3::origin(), 1.0, 1.0, 1.0).unwrap();
        let b = make_box(Point3::new(0.5, 0.0, 0.0), 1.0, 1.0, 1.0).unwrap();
        let mut ds = DataStructure::new();
        ds.init(&a, &b);
        let (fa, fb) = (faces(&a), faces(&b));
        ds.add_same_domain(&fa[0], &fb[0], Config::DiffOriented);
        assert!(fds_are_same_domain(&ds, &fa[0], &fb[0]));
        assert!(!fds_are_same_domain(&ds, &fa[0], &fb[1]));
        assert!(fds_has_same_domain_3d(&ds, &fa[0]));
        assert_eq!(fds_config_3d(&ds, &fa[0], &fb[0]), Some(Config::DiffOriented));
        assert_eq!(fds_config_3d(&ds, &fa[1], &fb[0]), None);
        let sdm = fds_sdm_faces(&ds, &fa[0]);
        assert_eq!(sdm.len(), 1);
        assert!(sdm[0].is_same(&fb[0]));
    }

    #[test]
    fn test_scan_interferences_drops_external() {
        let mut ds = DataStructure::new();
        let p = ds.add_point(Point3::origin(), 1e-7);
        let pave = |before, after| Interference::EdgePave {
            point: p,
            parameter: 0.0,
            transition: Transition {
                before,
                after,
                index: ShapeType::Face,
            },
        };
        let all = [
            pave(State::Out, State::In),
            pave(State::In, State::Out),
            pave(State::On, State::On),
            pave(State::Out, State::Out),
        ];
        let groups = fds_scan_interferences(&all);
        assert_eq!(groups.forward.len(), 1);
        assert_eq!(groups.reversed.len(), 1);
        assert_eq!(groups.internal.len(), 1);
        assert_eq!(fds_parameter(&all[0]), Some(0.0));
    }

    #[test]
    fn test_section_point_on_edge() {
        let a = make_box(Point3::origin(), 1.0, 1.0, 1.0).unwrap();
        let mut ds = DataStructure::new();
        ds.init(&a, &a);
        let e = explore(&a, ShapeType::Edge)[0].clone();
        let p = ds.add_point(Point3::new(9.0, 9.0, 9.0), 1e-7);
        assert!(!fds_is_section_point_on_edge(&ds, p, &e));
        assert!(!fds_edge_has_paves(&ds, &e));
        ds.add_interference(
            &e,
            Interference::EdgePave {
                point: p,
                parameter: 0.25,
                transition: Transition::uniform(State::On, ShapeType::Edge),
            },
        );
        assert!(fds_is_section_point_on_edge(&ds, p, &e));
        assert!(fds_edge_has_paves(&ds, &e));
        assert_eq!(fds_interferences_on_point(&ds, &e, p).len(), 1);
        assert_eq!(fds_point(&ds, p), Some(Point3::new(9.0, 9.0, 9.0)));
    }
}
