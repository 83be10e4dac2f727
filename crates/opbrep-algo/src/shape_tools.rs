//! Small queries and constructors on shapes.

use opbrep_math::{precision, Point3, Vec3};
use opbrep_topo::builder::{make_container as topo_make_container, make_vertex as topo_make_vertex};
use opbrep_topo::tool::{edge_curve, face_normal, is_closed_on_face, vertex_point};
use opbrep_topo::{explore, map_shapes, IndexedShapeMap, IndexedShapeSet, Orientation, Shape, ShapeType, State, TopoError};

use crate::classify::compute_state_point;
use crate::context::Context;

/// Shrink `[first, last]` of `edge` by the parameter length its end vertex
/// tolerances cover on the curve.
pub fn correct_range(edge: &Shape, first: f64, last: f64) -> (f64, f64) {
    let Some((curve, _, _)) = edge_curve(edge) else {
        return (first, last);
    };
    let (mut t1, mut t2) = (0.0, 0.0);
    if let Some((v1, v2)) = opbrep_topo::tool::edge_vertices(edge) {
        let d1 = curve.tangent(first).norm();
        let d2 = curve.tangent(last).norm();
        if d1 > precision::DTOLERANCE {
            t1 = v1.tolerance() / d1;
        }
        if d2 > precision::DTOLERANCE {
            t2 = v2.tolerance() / d2;
        }
    }
    (first + t1, last - t2)
}

/// True when the vertex tolerances swallow the whole edge.
pub fn is_micro_edge(edge: &Shape) -> bool {
    let Some((_, first, last)) = edge_curve(edge) else {
        return false;
    };
    let (f, l) = correct_range(edge, first, last);
    f >= l
}

/// A vertex covering all `vertices`: their centroid, with a tolerance
/// reaching every tolerance sphere.
pub fn make_vertex(vertices: &[Shape]) -> Option<Shape> {
    match vertices {
        [] => None,
        [v] => Some(v.clone()),
        _ => {
            let pts: Vec<(Point3, f64)> = vertices
                .iter()
                .filter_map(|v| vertex_point(v).map(|p| (p, v.tolerance())))
                .collect();
            if pts.is_empty() {
                return None;
            }
            let sum: Vec3 = pts.iter().map(|(p, _)| p.coords).sum();
            let center = Point3::from(sum / pts.len() as f64);
            let tol = pts
                .iter()
                .map(|(p, t)| (p - center).norm() + t)
                .fold(precision::CONFUSION, f64::max);
            Some(topo_make_vertex(center, tol))
        }
    }
}

/// Non-compound shapes reached through nested compounds, each once.
pub fn treat_compound(shape: &Shape) -> Vec<Shape> {
    let mut out = IndexedShapeSet::new();
    let mut stack = vec![shape.clone()];
    while let Some(s) = stack.pop() {
        if s.shape_type() == ShapeType::Compound {
            let mut kids: Vec<Shape> = s.children().collect();
            kids.reverse();
            stack.extend(kids);
        } else {
            out.insert(s, ());
        }
    }
    out.keys().to_vec()
}

/// Smallest and largest dimension of the shapes inside `shape`;
/// `(-1, -1)` for an empty compound.
pub fn dimensions(shape: &Shape) -> (i32, i32) {
    let leaves = treat_compound(shape);
    let dims = leaves.iter().map(|s| s.shape_type().dimension());
    match (dims.clone().min(), dims.max()) {
        (Some(lo), Some(hi)) => (lo, hi),
        _ => (-1, -1),
    }
}

/// Dimension of `shape`; -1 for empty or mixed-dimension compounds.
pub fn dimension(shape: &Shape) -> i32 {
    match dimensions(shape) {
        (lo, hi) if lo == hi => lo,
        _ => -1,
    }
}

/// Empty container of the given type, or one holding `children`.
pub fn make_container(kind: ShapeType, children: &[Shape]) -> Result<Shape, TopoError> {
    topo_make_container(kind, children)
}

/// True when some edge of `face` is a seam of it.
pub fn has_seam(face: &Shape) -> bool {
    explore(face, ShapeType::Edge).iter().any(|e| is_closed_on_face(e, face))
}

/// Number of wires of `shape` that use one of their edges in both directions.
pub fn nb_wires_with_seam(shape: &Shape) -> usize {
    map_shapes(shape, ShapeType::Wire)
        .keys()
        .iter()
        .filter(|w| {
            let edges = explore(w, ShapeType::Edge);
            edges.iter().any(|e| {
                e.orientation() == Orientation::Forward
                    && edges
                        .iter()
                        .any(|x| x.is_same(e) && x.orientation() == Orientation::Reversed)
            })
        })
        .count()
}

/// Number of solids of `shape` having more than one shell.
pub fn nb_solids_with_voids(shape: &Shape) -> usize {
    map_shapes(shape, ShapeType::Solid)
        .keys()
        .iter()
        .filter(|s| s.nb_children() > 1)
        .count()
}

/// True when some edge of `shell` bounds only one of its faces.
pub fn is_open_shell(shell: &Shape) -> bool {
    let mut uses: IndexedShapeMap<usize> = IndexedShapeMap::new();
    for e in explore(shell, ShapeType::Edge) {
        if matches!(e.orientation(), Orientation::Forward | Orientation::Reversed) {
            *uses.entry(&e) += 1;
        }
    }
    let open = uses.iter().any(|(_, n)| *n == 1);
    open
}

/// True when the faces of `solid` point inwards.
///
/// A point slightly off a face along its normal must be outside a
/// correctly oriented solid.
pub fn is_inverted_solid(solid: &Shape, ctx: &Context) -> bool {
    let step = (ctx.shape_box(solid).diagonal() * 1e-4).max(1e3 * precision::CONFUSION);
    for f in ctx.solid_faces(solid).iter() {
        let Some((uv, p)) = ctx.point_in_face(f) else {
            continue;
        };
        let Some(n) = face_normal(f, uv) else {
            continue;
        };
        match compute_state_point(&(p + step * n), solid, precision::CONFUSION, ctx) {
            State::In => return true,
            State::Out => return false,
            _ => {}
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use opbrep_primitives::{make_box, make_cylinder};
    use opbrep_topo::builder::{make_compound, make_shell, make_solid};

    #[test]
    fn test_dimensions_of_mixed_compound() {
        let b = make_box(Point3::origin(), 1.0, 1.0, 1.0).unwrap();
        let f = explore(&b, ShapeType::Face)[0].clone();
        let c = make_compound(&[b.clone(), make_compound(&[f.clone()])]);
        assert_eq!(dimensions(&c), (2, 3));
        assert_eq!(dimension(&c), -1);
        assert_eq!(dimension(&b), 3);
        assert_eq!(treat_compound(&c).len(), 2);
        assert_eq!(dimension(&make_compound(&[])), -1);
    }

    #[test]
    fn test_seams_and_voids() {
        let c = make_cylinder(Point3::origin(), 1.0, 2.0).unwrap();
        assert_eq!(nb_wires_with_seam(&c), 1);
        assert_eq!(explore(&c, ShapeType::Face).iter().filter(|f| has_seam(f)).count(), 1);
        assert_eq!(nb_solids_with_voids(&c), 0);
    }

    #[test]
    fn test_open_and_inverted() {
        let ctx = Context::new();
        let b = make_box(Point3::origin(), 1.0, 1.0, 1.0).unwrap();
        let shell = explore(&b, ShapeType::Shell)[0].clone();
        assert!(!is_open_shell(&shell));
        let faces = explore(&b, ShapeType::Face);
        assert!(is_open_shell(&make_shell(&faces[..5]).unwrap()));
        assert!(!is_inverted_solid(&b, &ctx));
        let inverted = make_solid(&[shell.reversed()]).unwrap();
        assert!(is_inverted_solid(&inverted, &ctx));
    }

    #[test]
    fn test_make_vertex_covers_inputs() {
        let a = topo_make_vertex(Point3::origin(), 1e-3);
        let b = topo_make_vertex(Point3::new(0.01, 0.0, 0.0), 1e-3);
        let v = make_vertex(&[a, b]).unwrap();
        assert!((v.tolerance() - 0.006).abs() < 1e-12);
        assert!(make_vertex(&[]).is_none());
    }

    #[test]
    fn test_micro_edge() {
        let b = make_box(Point3::origin(), 1.0, 1.0, 1.0).unwrap();
        let e = explore(&b, ShapeType::Edge)[0].clone();
        assert!(!is_micro_edge(&e));
        for v in explore(&e, ShapeType::Vertex) {
            v.raise_tolerance(0.6);
        }
        assert!(is_micro_edge(&e));
    }
}
