#![warn(missing_docs)]

//! B-rep primitive solid construction for the opbrep kernel.
//!
//! Builds closed solids with shared edges and vertices: boxes and right
//! circular cylinders. Faces carry outward normals and Forward orientation.

use std::collections::HashMap;
use std::f64::consts::PI;
use std::sync::Arc;

use opbrep_geom::{Circle3d, CurveRef, CylinderSurface, Line3d, Plane, SurfaceRef};
use opbrep_math::{precision, Point3, Vec3};
use opbrep_topo::builder::{make_edge, make_face, make_shell, make_solid, make_vertex, make_wire};
use opbrep_topo::{Orientation, Shape, TopoError};

/// Default tolerance given to primitive vertices, edges and faces.
pub const PRIMITIVE_TOLERANCE: f64 = precision::CONFUSION;

/// Build a box with minimum corner `min` and extents `(sx, sy, sz)`.
///
/// The box has 6 planar faces, 12 edges, and 8 vertices.
/// Vertex layout:
/// ```text
///     v4----v5
///    /|    /|
///   v7----v6|    z
///   | v0--|-v1   | y
///   |/    |/     |/
///   v3----v2     +---x
/// ```
pub fn make_box(min: Point3, sx: f64, sy: f64, sz: f64) -> Result<Shape, TopoError> {
    let corners = [
        Vec3::new(0.0, 0.0, 0.0),
        Vec3::new(sx, 0.0, 0.0),
        Vec3::new(sx, sy, 0.0),
        Vec3::new(0.0, sy, 0.0),
        Vec3::new(0.0, 0.0, sz),
        Vec3::new(sx, 0.0, sz),
        Vec3::new(sx, sy, sz),
        Vec3::new(0.0, sy, sz),
    ];
    let points: Vec<Point3> = corners.iter().map(|c| min + c).collect();
    let vertices: Vec<Shape> = points.iter().map(|p| make_vertex(*p, PRIMITIVE_TOLERANCE)).collect();

    // Outward normals: plane normal = x_dir × y_dir, loops CCW seen from outside.
    let face_defs: [([usize; 4], Vec3, Vec3); 6] = [
        ([0, 3, 2, 1], Vec3::y(), Vec3::x()),
        ([4, 5, 6, 7], Vec3::x(), Vec3::y()),
        ([0, 1, 5, 4], Vec3::x(), Vec3::z()),
        ([2, 3, 7, 6], Vec3::z(), Vec3::x()),
        ([0, 4, 7, 3], Vec3::z(), Vec3::y()),
        ([1, 2, 6, 5], Vec3::y(), Vec3::z()),
    ];

    let mut edges: HashMap<(usize, usize), Shape> = HashMap::new();
    let mut faces = Vec::with_capacity(6);
    for (quad, x_dir, y_dir) in face_defs.iter() {
        let mut wire_edges = Vec::with_capacity(4);
        for j in 0..4 {
            let (a, b) = (quad[j], quad[(j + 1) % 4]);
            let key = (a.min(b), a.max(b));
            let edge = match edges.get(&key) {
                Some(e) => e.clone(),
                None => {
                    let curve: CurveRef = Arc::new(Line3d::from_points(points[key.0], points[key.1]));
                    let e = make_edge(curve, 0.0, 1.0, &vertices[key.0], &vertices[key.1], PRIMITIVE_TOLERANCE)?;
                    edges.insert(key, e.clone());
                    e
                }
            };
            let o = if a < b { Orientation::Forward } else { Orientation::Reversed };
            wire_edges.push(edge.oriented(o));
        }
        let wire = make_wire(&wire_edges)?;
        let surface: SurfaceRef = Arc::new(Plane::new(points[quad[0]], *x_dir, *y_dir));
        faces.push(make_face(surface, &[wire], PRIMITIVE_TOLERANCE)?);
    }

    let shell = make_shell(&faces)?;
    make_solid(&[shell])
}

/// Build a cylinder of the given radius and height, axis along +Z from `base`.
///
/// The cylinder has:
/// - 1 cylindrical lateral face, with a seam edge at `u = 0`
/// - 2 planar cap faces
/// - 2 closed circular edges
pub fn make_cylinder(base: Point3, radius: f64, height: f64) -> Result<Shape, TopoError> {
    let top_center = base + height * Vec3::z();
    let v_bot = make_vertex(base + radius * Vec3::x(), PRIMITIVE_TOLERANCE);
    let v_top = make_vertex(top_center + radius * Vec3::x(), PRIMITIVE_TOLERANCE);

    let bot_circle: CurveRef = Arc::new(Circle3d::new(base, radius));
    let top_circle: CurveRef = Arc::new(Circle3d::new(top_center, radius));
    let seam_line: CurveRef = Arc::new(Line3d::from_points(
        base + radius * Vec3::x(),
        top_center + radius * Vec3::x(),
    ));

    let bot = make_edge(bot_circle, 0.0, 2.0 * PI, &v_bot, &v_bot, PRIMITIVE_TOLERANCE)?;
    let top = make_edge(top_circle, 0.0, 2.0 * PI, &v_top, &v_top, PRIMITIVE_TOLERANCE)?;
    let seam = make_edge(seam_line, 0.0, 1.0, &v_bot, &v_top, PRIMITIVE_TOLERANCE)?;

    // Lateral loop, counter-clockwise in (u, v): up the seam at u = 2π, down at u = 0.
    let lateral_wire = make_wire(&[bot.clone(), seam.clone(), top.reversed(), seam.reversed()])?;
    let lateral_surface: SurfaceRef = Arc::new(CylinderSurface::with_axis(base, Vec3::z(), radius));
    let lateral = make_face(lateral_surface, &[lateral_wire], PRIMITIVE_TOLERANCE)?;

    let bot_surface: SurfaceRef = Arc::new(Plane::new(base, Vec3::x(), -Vec3::y()));
    let bot_face = make_face(bot_surface, &[make_wire(&[bot.reversed()])?], PRIMITIVE_TOLERANCE)?;

    let top_surface: SurfaceRef = Arc::new(Plane::new(top_center, Vec3::x(), Vec3::y()));
    let top_face = make_face(top_surface, &[make_wire(&[top])?], PRIMITIVE_TOLERANCE)?;

    let shell = make_shell(&[lateral, bot_face, top_face])?;
    make_solid(&[shell])
}

#[cfg(test)]
mod tests {
    use super::*;
    use opbrep_topo::{explore, map_shapes, map_shapes_and_ancestors, ShapeType};

    fn assert_closed(solid: &Shape) {
        for shell in explore(solid, ShapeType::Shell) {
            let uses = explore(&shell, ShapeType::Edge);
            for e in map_shapes(&shell, ShapeType::Edge).keys() {
                let fwd = uses
                    .iter()
                    .filter(|u| u.is_same(e) && u.orientation() == Orientation::Forward)
                    .count();
                let rev = uses
                    .iter()
                    .filter(|u| u.is_same(e) && u.orientation() == Orientation::Reversed)
                    .count();
                assert_eq!((fwd, rev), (1, 1), "edge {:?} is not used once each way", e);
            }
        }
    }

    #[test]
    fn test_box_counts() {
        let b = make_box(Point3::origin(), 1.0, 2.0, 3.0).unwrap();
        assert_eq!(b.shape_type(), ShapeType::Solid);
        assert_eq!(map_shapes(&b, ShapeType::Face).len(), 6);
        assert_eq!(map_shapes(&b, ShapeType::Edge).len(), 12);
        assert_eq!(map_shapes(&b, ShapeType::Vertex).len(), 8);
        assert_closed(&b);
    }

    #[test]
    fn test_box_faces_share_edges() {
        let b = make_box(Point3::origin(), 1.0, 1.0, 1.0).unwrap();
        let anc = map_shapes_and_ancestors(&b, ShapeType::Edge, ShapeType::Face);
        for (_, faces) in anc.iter() {
            assert_eq!(faces.len(), 2);
        }
    }

    #[test]
    fn test_cylinder_counts() {
        let c = make_cylinder(Point3::origin(), 1.0, 2.0).unwrap();
        assert_eq!(map_shapes(&c, ShapeType::Face).len(), 3);
        assert_eq!(map_shapes(&c, ShapeType::Edge).len(), 3);
        assert_eq!(map_shapes(&c, ShapeType::Vertex).len(), 2);
        assert_closed(&c);
    }
}
