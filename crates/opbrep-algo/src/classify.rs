//! Classification of points and shapes against solids, and vertex coincidence.

use opbrep_math::{precision, Point3, Vec3};
use opbrep_topo::tool::{edge_curve, face_surface, vertex_point};
use opbrep_topo::{explore, IndexedShapeSet, Shape, ShapeType, State};

use crate::context::Context;
use crate::uv::UvPosition;

/// Tilted ray directions; none is parallel to a coordinate plane.
const RAY_DIRS: [[f64; 3]; 3] = [
    [1.0, 0.2371, 0.1173],
    [-0.1913, 1.0, 0.3377],
    [0.2719, -0.1531, 1.0],
];

/// Parameter tolerance used when a ray hit is tested against face loops.
const RAY_UV_TOL: f64 = 1e-9;

/// State of `p` relative to `solid`.
///
/// `On` when `p` lies within `tol` of a face of the solid. Otherwise three
/// rays are cast; a ray grazing a face boundary abstains, and the
/// remaining rays vote by crossing parity.
pub fn compute_state_point(p: &Point3, solid: &Shape, tol: f64, ctx: &Context) -> State {
    let faces = ctx.solid_faces(solid);
    if faces.is_empty() {
        return State::Unknown;
    }
    let mut bx = ctx.shape_box(solid);
    bx.expand(tol);
    if !bx.contains_point(p) {
        return State::Out;
    }
    if faces.iter().any(|f| ctx.is_valid_point_for_face(p, f, tol + f.tolerance())) {
        return State::On;
    }

    let (mut ins, mut outs) = (0, 0);
    for d in RAY_DIRS {
        let dir = Vec3::new(d[0], d[1], d[2]).normalize();
        match ray_parity(p, &dir, &faces, ctx) {
            Some(true) => ins += 1,
            Some(false) => outs += 1,
            None => {}
        }
    }
    match (ins, outs) {
        (0, 0) => State::Unknown,
        _ if ins > outs => State::In,
        _ => State::Out,
    }
}

fn ray_parity(p: &Point3, dir: &Vec3, faces: &[Shape], ctx: &Context) -> Option<bool> {
    let mut crossings = 0usize;
    for f in faces {
        let surface = face_surface(f)?;
        for (_, uv) in surface.intersect_ray(p, dir) {
            match ctx.classify_uv(f, uv, RAY_UV_TOL) {
                UvPosition::Inside => crossings += 1,
                UvPosition::Boundary => return None,
                UvPosition::Outside => {}
            }
        }
    }
    Some(crossings % 2 == 1)
}

/// State of a vertex relative to `solid`.
pub fn compute_state_vertex(v: &Shape, solid: &Shape, tol: f64, ctx: &Context) -> State {
    match vertex_point(v) {
        Some(p) => compute_state_point(&p, solid, tol, ctx),
        None => State::Unknown,
    }
}

/// State of an edge relative to `solid`, decided by the middle of its range.
pub fn compute_state_edge(e: &Shape, solid: &Shape, tol: f64, ctx: &Context) -> State {
    match edge_curve(e) {
        Some((c, first, last)) => compute_state_point(&c.evaluate(0.5 * (first + last)), solid, tol, ctx),
        None => explore(e, ShapeType::Vertex)
            .first()
            .map_or(State::Unknown, |v| compute_state_vertex(v, solid, tol, ctx)),
    }
}

/// State of a face relative to `solid`.
///
/// The first edge of the face that is not one of `bounds` (the edges of
/// the solid) decides. When every edge is shared with the solid, a point
/// inside the face decides.
pub fn compute_state_face(face: &Shape, solid: &Shape, tol: f64, bounds: &IndexedShapeSet, ctx: &Context) -> State {
    for e in explore(face, ShapeType::Edge) {
        if !bounds.contains(&e) {
            return compute_state_edge(&e, solid, tol, ctx);
        }
    }
    compute_state_for_face(face, solid, tol, ctx)
}

/// State of a point inside `face` relative to `solid`.
pub fn compute_state_for_face(face: &Shape, solid: &Shape, tol: f64, ctx: &Context) -> State {
    match ctx.point_in_face(face) {
        Some((_, p)) => compute_state_point(&p, solid, tol, ctx),
        None => State::Unknown,
    }
}

/// State of any shape, from one representative point.
pub fn compute_state_by_one_point(s: &Shape, solid: &Shape, tol: f64, ctx: &Context) -> State {
    match s.shape_type() {
        ShapeType::Vertex => compute_state_vertex(s, solid, tol, ctx),
        ShapeType::Edge => compute_state_edge(s, solid, tol, ctx),
        ShapeType::Face => {
            let bounds = opbrep_topo::map_shapes(solid, ShapeType::Edge);
            compute_state_face(s, solid, tol, &bounds, ctx)
        }
        _ => s
            .children()
            .next()
            .map_or(State::Unknown, |c| compute_state_by_one_point(&c, solid, tol, ctx)),
    }
}

/// Coincidence of two vertices: 0 when their tolerance spheres, enlarged
/// by `fuzz`, touch; 1 otherwise.
pub fn compute_vv(v1: &Shape, v2: &Shape, fuzz: f64) -> i32 {
    match vertex_point(v2) {
        Some(p2) => compute_vv_point(v1, &p2, v2.tolerance(), fuzz),
        None => 1,
    }
}

/// Coincidence of a vertex with a point of tolerance `tol`.
pub fn compute_vv_point(v: &Shape, p: &Point3, tol: f64, fuzz: f64) -> i32 {
    let Some(pv) = vertex_point(v) else {
        return 1;
    };
    let tol_sum = v.tolerance() + tol + fuzz.max(precision::CONFUSION);
    if (pv - p).norm_squared() <= tol_sum * tol_sum {
        0
    } else {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opbrep_primitives::{make_box, make_cylinder};
    use opbrep_topo::builder::make_vertex;
    use proptest::prelude::*;

    #[test]
    fn test_box_states() {
        let ctx = Context::new();
        let b = make_box(Point3::origin(), 1.0, 1.0, 1.0).unwrap();
        assert_eq!(compute_state_point(&Point3::new(0.5, 0.5, 0.5), &b, 1e-7, &ctx), State::In);
        assert_eq!(compute_state_point(&Point3::new(1.5, 0.5, 0.5), &b, 1e-7, &ctx), State::Out);
        assert_eq!(compute_state_point(&Point3::new(1.0, 0.5, 0.5), &b, 1e-7, &ctx), State::On);
        assert_eq!(compute_state_point(&Point3::new(1.0, 1.0, 0.5), &b, 1e-7, &ctx), State::On);
    }

    #[test]
    fn test_cylinder_states() {
        let ctx = Context::new();
        let c = make_cylinder(Point3::origin(), 1.0, 2.0).unwrap();
        assert_eq!(compute_state_point(&Point3::new(0.0, 0.0, 1.0), &c, 1e-7, &ctx), State::In);
        assert_eq!(compute_state_point(&Point3::new(0.9, 0.0, 1.0), &c, 1e-7, &ctx), State::In);
        assert_eq!(compute_state_point(&Point3::new(0.8, 0.8, 1.0), &c, 1e-7, &ctx), State::Out);
        assert_eq!(compute_state_point(&Point3::new(0.0, 1.0, 1.0), &c, 1e-7, &ctx), State::On);
        assert_eq!(compute_state_point(&Point3::new(0.0, 0.0, 2.0), &c, 1e-7, &ctx), State::On);
    }

    #[test]
    fn test_face_state_uses_foreign_edge() {
        let ctx = Context::new();
        let big = make_box(Point3::origin(), 2.0, 2.0, 2.0).unwrap();
        let small = make_box(Point3::new(0.5, 0.5, 0.5), 1.0, 1.0, 1.0).unwrap();
        let bounds = opbrep_topo::map_shapes(&big, ShapeType::Edge);
        for f in explore(&small, ShapeType::Face) {
            assert_eq!(compute_state_face(&f, &big, 1e-7, &bounds, &ctx), State::In);
        }
        let own = opbrep_topo::map_shapes(&small, ShapeType::Edge);
        let f = explore(&small, ShapeType::Face)[0].clone();
        assert_eq!(compute_state_face(&f, &small, 1e-7, &own, &ctx), State::On);
    }

    #[test]
    fn test_compute_vv_boundary_is_inclusive() {
        let v1 = make_vertex(Point3::origin(), 0.25);
        let v2 = make_vertex(Point3::new(0.5, 0.0, 0.0), 0.25);
        assert_eq!(compute_vv(&v1, &v2, 0.0), 0);
        let v3 = make_vertex(Point3::new(0.5 + 1e-3, 0.0, 0.0), 0.25);
        assert_eq!(compute_vv(&v1, &v3, 0.0), 1);
        assert_eq!(compute_vv(&v1, &v3, 1e-2), 0);
    }

    proptest! {
        #[test]
        fn prop_interior_in_exterior_out(
            x in 0.05f64..0.95, y in 0.05f64..0.95, z in 0.05f64..0.95,
            d in 0.05f64..3.0,
        ) {
            let ctx = Context::new();
            let b = make_box(Point3::origin(), 1.0, 1.0, 1.0).unwrap();
            prop_assert_eq!(compute_state_point(&Point3::new(x, y, z), &b, 1e-7, &ctx), State::In);
            prop_assert_eq!(compute_state_point(&Point3::new(1.0 + d, y, z), &b, 1e-7, &ctx), State::Out);
            prop_assert_eq!(compute_state_point(&Point3::new(x, -d, z), &b, 1e-7, &ctx), State::Out);
        }
    }
}
