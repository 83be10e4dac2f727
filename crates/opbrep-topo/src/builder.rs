//! Construction of shapes, bottom-up.
//!
//! Every constructor creates a fresh entity. Children keep the
//! orientation and location of the handles passed in.

use opbrep_geom::{CurveRef, SurfaceRef};
use opbrep_math::Point3;

use crate::shape::{Geometry, TShape};
use crate::{Orientation, Shape, ShapeType, TopoError};

fn check_children(parent: ShapeType, children: &[Shape]) -> Result<(), TopoError> {
    for c in children {
        let ok = match parent {
            ShapeType::Compound => true,
            _ => parent.child_type() == Some(c.shape_type()),
        };
        if !ok {
            return Err(TopoError::IncompatibleChild {
                parent,
                child: c.shape_type(),
            });
        }
    }
    Ok(())
}

/// Create a vertex at `point` with tolerance `tol`.
pub fn make_vertex(point: Point3, tol: f64) -> Shape {
    Shape::from_tshape(TShape::new(ShapeType::Vertex, Geometry::Point(point), tol, Vec::new()))
}

/// Create an edge on `curve` between parameters `first` and `last`.
///
/// `v1` bounds the edge at `first`, `v2` at `last`; pass the same vertex
/// twice for a closed edge.
pub fn make_edge(
    curve: CurveRef,
    first: f64,
    last: f64,
    v1: &Shape,
    v2: &Shape,
    tol: f64,
) -> Result<Shape, TopoError> {
    TopoError::expect_type(ShapeType::Vertex, v1.shape_type())?;
    TopoError::expect_type(ShapeType::Vertex, v2.shape_type())?;
    if !(first.is_finite() && last.is_finite()) || last <= first {
        return Err(TopoError::InvalidRange { first, last });
    }
    let children = vec![v1.oriented(Orientation::Forward), v2.oriented(Orientation::Reversed)];
    Ok(Shape::from_tshape(TShape::new(
        ShapeType::Edge,
        Geometry::Curve { curve, first, last },
        tol,
        children,
    )))
}

/// Create a wire from oriented edges.
pub fn make_wire(edges: &[Shape]) -> Result<Shape, TopoError> {
    make_container(ShapeType::Wire, edges)
}

/// Create a face on `surface` bounded by `wires` (outer wire first).
pub fn make_face(surface: SurfaceRef, wires: &[Shape], tol: f64) -> Result<Shape, TopoError> {
    check_children(ShapeType::Face, wires)?;
    Ok(Shape::from_tshape(TShape::new(
        ShapeType::Face,
        Geometry::Surface(surface),
        tol,
        wires.to_vec(),
    )))
}

/// Create a shell from oriented faces.
pub fn make_shell(faces: &[Shape]) -> Result<Shape, TopoError> {
    make_container(ShapeType::Shell, faces)
}

/// Create a solid from shells (outer shell first, then voids).
pub fn make_solid(shells: &[Shape]) -> Result<Shape, TopoError> {
    make_container(ShapeType::Solid, shells)
}

/// Create a compound of arbitrary shapes.
pub fn make_compound(shapes: &[Shape]) -> Shape {
    Shape::from_tshape(TShape::new(ShapeType::Compound, Geometry::None, 0.0, shapes.to_vec()))
}

/// Create a geometry-less container of the given type.
pub fn make_container(kind: ShapeType, children: &[Shape]) -> Result<Shape, TopoError> {
    if matches!(kind, ShapeType::Vertex | ShapeType::Edge | ShapeType::Face) {
        return Err(TopoError::IncompatibleChild {
            parent: kind,
            child: children.first().map(Shape::shape_type).unwrap_or(kind),
        });
    }
    check_children(kind, children)?;
    Ok(Shape::from_tshape(TShape::new(kind, Geometry::None, 0.0, children.to_vec())))
}

/// Raise the tolerance of a vertex, edge or face. Never lowers it.
pub fn update_tolerance(shape: &Shape, tol: f64) -> f64 {
    shape.raise_tolerance(tol)
}

#[cfg(test)]
mod tests {
    use super::*;
    use opbrep_geom::{Line3d, Plane};
    use std::sync::Arc;

    #[test]
    fn test_make_edge_rejects_empty_range() {
        let v = make_vertex(Point3::origin(), 1e-7);
        let line: CurveRef = Arc::new(Line3d::from_points(Point3::origin(), Point3::new(1.0, 0.0, 0.0)));
        assert!(make_edge(line.clone(), 1.0, 1.0, &v, &v, 1e-7).is_err());
        assert!(make_edge(line, 0.0, 1.0, &v, &v, 1e-7).is_ok());
    }

    #[test]
    fn test_container_type_checks() {
        let v = make_vertex(Point3::origin(), 1e-7);
        assert!(matches!(
            make_wire(&[v.clone()]),
            Err(TopoError::IncompatibleChild { .. })
        ));
        let surface: SurfaceRef = Arc::new(Plane::xy());
        assert!(make_face(surface, &[v.clone()], 1e-7).is_err());
        let c = make_compound(&[v]);
        assert_eq!(c.nb_children(), 1);
    }

    #[test]
    fn test_edge_vertex_orientations() {
        let a = make_vertex(Point3::origin(), 1e-7);
        let b = make_vertex(Point3::new(1.0, 0.0, 0.0), 1e-7);
        let line: CurveRef = Arc::new(Line3d::from_points(Point3::origin(), Point3::new(1.0, 0.0, 0.0)));
        let e = make_edge(line, 0.0, 1.0, &a, &b, 1e-7).unwrap();
        let kids: Vec<Shape> = e.children().collect();
        assert_eq!(kids[0].orientation(), Orientation::Forward);
        assert_eq!(kids[1].orientation(), Orientation::Reversed);
        let rk: Vec<Shape> = e.reversed().children().collect();
        assert_eq!(rk[0].orientation(), Orientation::Reversed);
    }
}
