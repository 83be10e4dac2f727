//! Relative orientation of faces and edges.

use std::f64::consts::PI;
use std::sync::Arc;

use opbrep_math::{angle_with_ref, precision, Point3, Vec3};
use opbrep_topo::builder::{make_shell, make_wire};
use opbrep_topo::tool::{edge_curve, edge_tangent, edge_vertices_oriented, face_surface, is_closed_on_face};
use opbrep_topo::{explore, Geometry, IndexedShapeMap, IndexedShapeSet, Orientation, Shape, ShapeType, TopoError};
use thiserror::Error;

use crate::classify::compute_state_face;
use crate::context::Context;
use crate::report::{AlertKind, Report};
use crate::uv::{signed_area, wire_uv_loop};

/// Why the orientation of a split could not be compared to its original.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ReverseError {
    /// No point could be found on the split.
    #[error("no representative point on the split")]
    NoRepresentativePoint,
    /// The normal or tangent of the split is undefined.
    #[error("no direction on the split")]
    NoSplitDirection,
    /// The split point does not project onto the original.
    #[error("projection onto the original failed")]
    ProjectionFailed,
    /// The normal or tangent of the original is undefined.
    #[error("no direction on the original")]
    NoOriginalDirection,
}

impl ReverseError {
    /// Numeric code, 1 to 4.
    pub fn code(self) -> i32 {
        match self {
            ReverseError::NoRepresentativePoint => 1,
            ReverseError::NoSplitDirection => 2,
            ReverseError::ProjectionFailed => 3,
            ReverseError::NoOriginalDirection => 4,
        }
    }
}

/// Answer of the angle test deciding whether a face lies inside a solid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InternalFace {
    /// The face is not inside.
    Out = 0,
    /// The face is inside.
    In = 1,
    /// The angle test was not conclusive.
    Undetermined = 2,
}

/// The occurrence of `edge` inside `face`, with its orientation there.
pub fn get_edge_on_face(edge: &Shape, face: &Shape) -> Option<Shape> {
    explore(face, ShapeType::Edge).into_iter().find(|e| e.is_same(edge))
}

/// The occurrence of `edge` in `face` whose orientation is opposite to `edge`'s.
pub fn get_edge_off(edge: &Shape, face: &Shape) -> Option<Shape> {
    let wanted = edge.orientation().reverse();
    explore(face, ShapeType::Edge)
        .into_iter()
        .find(|e| e.is_same(edge) && e.orientation() == wanted)
}

/// Oriented normal of `face` at the point of its surface closest to `p`.
fn face_normal_at(face: &Shape, p: &Point3) -> Option<Vec3> {
    let surface = face_surface(face)?;
    let uv = surface.project(p)?;
    let n = surface.d_du(uv).cross(&surface.d_dv(uv));
    if n.norm() < precision::DTOLERANCE {
        return None;
    }
    let n = n.normalize();
    Some(if face.orientation() == Orientation::Reversed { -n } else { n })
}

/// Normal and inward bi-normal of `face` at `p` for the edge tangent `tangent`.
fn face_dir(face: &Shape, p: &Point3, tangent: &Vec3) -> Option<(Vec3, Vec3)> {
    let n = face_normal_at(face, p)?;
    let b = n.cross(tangent);
    if b.norm() < precision::DTOLERANCE {
        return None;
    }
    Some((n, b.normalize()))
}

/// Middle point and unit tangent of `edge` as oriented.
fn edge_mid_frame(edge: &Shape) -> Option<(Point3, Vec3)> {
    let (c, first, last) = edge_curve(edge)?;
    let t = 0.5 * (first + last);
    let d = edge_tangent(edge, t)?;
    if d.norm() < precision::DTOLERANCE {
        return None;
    }
    Some((c.evaluate(t), d.normalize()))
}

/// Among `(edge, face)` couples, the face met first when turning around
/// `e1` from `f1`. The flag is false when the smallest angle is ambiguous.
fn face_off(e1: &Shape, f1: &Shape, couples: &[(Shape, Shape)]) -> (Option<Shape>, bool) {
    let Some((px, tgt)) = edge_mid_frame(e1) else {
        return (None, false);
    };
    let Some((n1, b1)) = face_dir(f1, &px, &tgt) else {
        return (None, false);
    };
    let reference = n1.cross(&b1);
    let criteria = precision::CONFUSION;

    let mut ok = true;
    let mut angle_min = 100.0;
    let mut best = None;
    for (e2, f2) in couples {
        let tgt2 = if e2.orientation() == e1.orientation() { tgt } else { -tgt };
        let Some((_, b2)) = face_dir(f2, &px, &tgt2) else {
            ok = false;
            continue;
        };
        let mut angle = angle_with_ref(&b1, &b2, &reference);
        if angle.abs() < precision::ANGULAR {
            if f2.is_equal(f1) {
                angle = PI;
            } else if f2.is_same(f1) {
                angle = 2.0 * PI;
            }
        }
        if angle.abs() < criteria || (angle - angle_min).abs() < criteria {
            ok = false;
        }
        if angle < 0.0 {
            angle += 2.0 * PI;
        }
        if angle < angle_min {
            angle_min = angle;
            best = Some(f2.clone());
        }
    }
    (best, ok)
}

/// The face of `candidates` met first when turning around `edge` from `face`.
///
/// Angles are measured between the inward bi-normals of the faces around
/// the edge tangent. `None` when no candidate contains `edge`.
pub fn get_face_off(edge: &Shape, face: &Shape, candidates: &[Shape], _ctx: &Context) -> Option<Shape> {
    let e1 = get_edge_on_face(edge, face).unwrap_or_else(|| edge.clone());
    let couples: Vec<(Shape, Shape)> = candidates
        .iter()
        .filter(|f| !f.is_equal(face))
        .filter_map(|f| get_edge_on_face(edge, f).map(|e| (e, f.clone())))
        .collect();
    if couples.is_empty() {
        return None;
    }
    face_off(&e1, face, &couples).0
}

/// Whether `face`, sharing `edge` with `face1` and `face2` of a solid,
/// lies inside that solid.
pub fn is_internal_face(face: &Shape, edge: &Shape, face1: &Shape, face2: &Shape, _ctx: &Context) -> InternalFace {
    let Some(mut e1) = get_edge_on_face(edge, face1) else {
        return InternalFace::Undetermined;
    };
    let e2 = if e1.orientation() == Orientation::Internal || face1.is_same(face2) {
        let e2 = e1.oriented(Orientation::Reversed);
        e1 = e1.oriented(Orientation::Forward);
        e2
    } else {
        match get_edge_on_face(edge, face2) {
            Some(e) => e,
            None => return InternalFace::Undetermined,
        }
    };
    let couples = [(edge.clone(), face.clone()), (e2, face2.clone())];
    match face_off(&e1, face1, &couples) {
        (_, false) | (None, _) => InternalFace::Undetermined,
        (Some(off), true) if off.is_equal(face) => InternalFace::In,
        _ => InternalFace::Out,
    }
}

/// Whether `face` lies inside `solid`.
///
/// `edge_faces` maps edges of the solid to their faces. The first shared
/// edge with a conclusive angle test decides; otherwise the face is
/// classified by a point.
pub fn is_internal_face_in_solid(
    face: &Shape,
    solid: &Shape,
    edge_faces: &IndexedShapeMap<Vec<Shape>>,
    tol: f64,
    ctx: &Context,
) -> bool {
    for e in explore(face, ShapeType::Edge) {
        let Some(faces) = edge_faces.get(&e) else {
            continue;
        };
        if e.orientation() == Orientation::Internal {
            continue;
        }
        let answer = match faces.len() {
            1 => {
                let on = get_edge_on_face(&e, &faces[0]);
                if on.map(|x| x.orientation()) != Some(Orientation::Internal) {
                    continue;
                }
                is_internal_face(face, &e, &faces[0], &faces[0], ctx)
            }
            2 => is_internal_face(face, &e, &faces[0], &faces[1], ctx),
            _ => continue,
        };
        if answer != InternalFace::Undetermined {
            return answer == InternalFace::In;
        }
    }
    let bounds: IndexedShapeSet = opbrep_topo::map_shapes(solid, ShapeType::Edge);
    compute_state_face(face, solid, tol, &bounds, ctx) == opbrep_topo::State::In
}

fn same_surface(a: &Shape, b: &Shape) -> bool {
    match (a.tshape().geometry(), b.tshape().geometry()) {
        (Geometry::Surface(s1), Geometry::Surface(s2)) => Arc::ptr_eq(s1, s2) && a.location() == b.location(),
        _ => false,
    }
}

fn same_curve(a: &Shape, b: &Shape) -> bool {
    match (a.tshape().geometry(), b.tshape().geometry()) {
        (Geometry::Curve { curve: c1, .. }, Geometry::Curve { curve: c2, .. }) => {
            Arc::ptr_eq(c1, c2) && a.location() == b.location()
        }
        _ => false,
    }
}

/// True when the split face `split` is oriented opposite to its original.
pub fn is_split_to_reverse_face(split: &Shape, original: &Shape, ctx: &Context) -> Result<bool, ReverseError> {
    if same_surface(split, original) {
        return Ok(split.orientation() != original.orientation());
    }
    let (_, p) = ctx
        .point_in_face(split)
        .ok_or(ReverseError::NoRepresentativePoint)?;
    let n_split = face_normal_at(split, &p).ok_or(ReverseError::NoSplitDirection)?;
    let surface = face_surface(original).ok_or(ReverseError::ProjectionFailed)?;
    let uv = surface.project(&p).ok_or(ReverseError::ProjectionFailed)?;
    let n = surface.d_du(uv).cross(&surface.d_dv(uv));
    if n.norm() < precision::DTOLERANCE {
        return Err(ReverseError::NoOriginalDirection);
    }
    let n_orig = if original.orientation() == Orientation::Reversed { -n } else { n };
    Ok(n_split.dot(&n_orig) < 0.0)
}

/// True when the split edge `split` runs opposite to its original.
///
/// Tangents are compared at the first of ten interior sample points where
/// both are defined.
pub fn is_split_to_reverse_edge(split: &Shape, original: &Shape, ctx: &Context) -> Result<bool, ReverseError> {
    if same_curve(split, original) {
        return Ok(split.orientation() != original.orientation());
    }
    let (c, first, last) = edge_curve(split).ok_or(ReverseError::NoRepresentativePoint)?;
    edge_curve(original).ok_or(ReverseError::NoRepresentativePoint)?;
    let (f, l) = crate::shape_tools::correct_range(split, first, last);
    let (f, l) = if f < l { (f, l) } else { (first, last) };

    const NB_SAMPLES: usize = 11;
    let dt = (l - f) / NB_SAMPLES as f64;
    let mut err = ReverseError::NoRepresentativePoint;
    for i in 1..NB_SAMPLES {
        let t = f + i as f64 * dt;
        let Some(d_split) = edge_tangent(split, t).filter(|d| d.norm() > precision::DTOLERANCE) else {
            err = ReverseError::NoSplitDirection;
            continue;
        };
        let Some(t_orig) = ctx.project_point_on_edge(&c.evaluate(t), original) else {
            err = ReverseError::ProjectionFailed;
            continue;
        };
        let Some(d_orig) = edge_tangent(original, t_orig).filter(|d| d.norm() > precision::DTOLERANCE) else {
            err = ReverseError::NoOriginalDirection;
            continue;
        };
        return Ok(d_split.dot(&d_orig) < 0.0);
    }
    Err(err)
}

/// Dispatch on the type of `split`. Shapes other than faces and edges are
/// never reversed.
pub fn is_split_to_reverse(split: &Shape, original: &Shape, ctx: &Context) -> Result<bool, ReverseError> {
    match split.shape_type() {
        ShapeType::Face => is_split_to_reverse_face(split, original, ctx),
        ShapeType::Edge => is_split_to_reverse_edge(split, original, ctx),
        _ => Ok(false),
    }
}

/// Like [`is_split_to_reverse`], recording a warning and answering `false`
/// when the check fails.
pub fn is_split_to_reverse_with_warn(split: &Shape, original: &Shape, ctx: &Context, report: &Report) -> bool {
    match is_split_to_reverse(split, original, ctx) {
        Ok(r) => r,
        Err(e) => {
            report.add_warning(
                AlertKind::UnableToOrientTheShape,
                format!("{e} (code {})", e.code()),
                vec![split.clone(), original.clone()],
            );
            false
        }
    }
}

/// Relative sense of two faces sharing an edge: 1 when their normals
/// along that edge agree, -1 when they oppose, 0 when no edge is shared
/// or the normals are not parallel.
pub fn sense(f1: &Shape, f2: &Shape, _ctx: &Context) -> i32 {
    let Some(e1) = explore(f1, ShapeType::Edge)
        .into_iter()
        .find(|e| !is_closed_on_face(e, f1))
    else {
        return 0;
    };
    let Some(e2) = explore(f2, ShapeType::Edge)
        .into_iter()
        .find(|e| !is_closed_on_face(e, f2) && e.is_same(&e1))
    else {
        return 0;
    };
    let (Some((p1, _)), Some((p2, _))) = (edge_mid_frame(&e1), edge_mid_frame(&e2)) else {
        return 0;
    };
    match (face_normal_at(f1, &p1), face_normal_at(f2, &p2)) {
        (Some(n1), Some(n2)) if n1.cross(&n2).norm() <= precision::ANGULAR.max(1e-10) => {
            if n1.dot(&n2) < 0.0 {
                -1
            } else {
                1
            }
        }
        _ => 0,
    }
}

/// True when a point inside `f1` is also a valid point of `f2`.
pub fn are_faces_same_domain(f1: &Shape, f2: &Shape, ctx: &Context, fuzz: f64) -> bool {
    let Some((_, p)) = ctx.point_in_face(f1) else {
        return false;
    };
    let tol_e = explore(f1, ShapeType::Edge)
        .iter()
        .map(Shape::tolerance)
        .fold(0.0, f64::max);
    let tol = f1.tolerance().max(tol_e) + f2.tolerance().max(tol_e) + fuzz.max(precision::CONFUSION);
    ctx.is_valid_point_for_face(&p, f2, tol)
}

/// True when `wire` bounds a hole of `face` (clockwise in the face parameters).
pub fn is_hole(wire: &Shape, face: &Shape) -> bool {
    let Some(surface) = face_surface(face) else {
        return false;
    };
    let area = signed_area(&wire_uv_loop(&surface, wire));
    if face.orientation() == Orientation::Reversed {
        area > 0.0
    } else {
        area < 0.0
    }
}

/// Rebuild `wire` with its edges chained and oriented head to tail.
///
/// Edges that cannot be chained are appended unchanged.
pub fn orient_edges_on_wire(wire: &Shape) -> Result<Shape, TopoError> {
    let mut pending = explore(wire, ShapeType::Edge);
    if pending.len() < 2 {
        return Ok(wire.clone());
    }
    let mut chain = vec![pending.remove(0)];
    while !pending.is_empty() {
        let Some((_, tail)) = chain.last().and_then(edge_vertices_oriented) else {
            break;
        };
        let found = pending.iter().position(|e| {
            edge_vertices_oriented(e).is_some_and(|(a, b)| a.is_same(&tail) || b.is_same(&tail))
        });
        let Some(i) = found else {
            break;
        };
        let e = pending.remove(i);
        let starts_at_tail = edge_vertices_oriented(&e).is_some_and(|(a, _)| a.is_same(&tail));
        chain.push(if starts_at_tail { e } else { e.reversed() });
    }
    chain.extend(pending);
    make_wire(&chain)
}

/// Rebuild `shell` with its faces oriented consistently with the first one.
///
/// Two faces sharing an edge are consistent when they use it with opposite
/// orientations.
pub fn orient_faces_on_shell(shell: &Shape) -> Result<Shape, TopoError> {
    let faces = explore(shell, ShapeType::Face);
    if faces.is_empty() {
        return Ok(shell.clone());
    }
    let edge_faces = opbrep_topo::map_shapes_and_ancestors(shell, ShapeType::Edge, ShapeType::Face);
    let mut oriented: IndexedShapeMap<Shape> = IndexedShapeMap::new();
    let mut result = Vec::with_capacity(faces.len());
    for seed in &faces {
        if oriented.contains(seed) {
            continue;
        }
        oriented.insert(seed.clone(), seed.clone());
        let mut queue = vec![seed.clone()];
        while let Some(f) = queue.pop() {
            result.push(f.clone());
            for e in explore(&f, ShapeType::Edge) {
                if is_closed_on_face(&e, &f) {
                    continue;
                }
                let Some(neighbours) = edge_faces.get(&e) else {
                    continue;
                };
                for g in neighbours {
                    if g.is_same(&f) || oriented.contains(g) {
                        continue;
                    }
                    let Some(eg) = get_edge_on_face(&e, g) else {
                        continue;
                    };
                    let g = if eg.orientation() == e.orientation() { g.reversed() } else { g.clone() };
                    oriented.insert(g.clone(), g.clone());
                    queue.push(g);
                }
            }
        }
    }
    make_shell(&result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use opbrep_primitives::make_box;
    use opbrep_topo::builder::make_face;
    use opbrep_topo::map_shapes_and_ancestors;

    #[test]
    fn test_reverse_error_codes() {
        assert_eq!(ReverseError::NoRepresentativePoint.code(), 1);
        assert_eq!(ReverseError::NoSplitDirection.code(), 2);
        assert_eq!(ReverseError::ProjectionFailed.code(), 3);
        assert_eq!(ReverseError::NoOriginalDirection.code(), 4);
    }

    #[test]
    fn test_split_to_reverse_same_surface() {
        let ctx = Context::new();
        let b = make_box(Point3::origin(), 1.0, 1.0, 1.0).unwrap();
        let f = explore(&b, ShapeType::Face)[0].clone();
        assert_eq!(is_split_to_reverse(&f, &f, &ctx), Ok(false));
        assert_eq!(is_split_to_reverse(&f.reversed(), &f, &ctx), Ok(true));
    }

    #[test]
    fn test_split_to_reverse_other_surface() {
        let ctx = Context::new();
        let b = make_box(Point3::origin(), 1.0, 1.0, 1.0).unwrap();
        let f = explore(&b, ShapeType::Face)[1].clone();
        let surface = face_surface(&f).unwrap();
        let wires = explore(&f, ShapeType::Wire);
        let flipped: opbrep_geom::SurfaceRef = Arc::new(opbrep_geom::Plane::from_normal(
            Point3::new(0.0, 0.0, 1.0),
            -surface.normal(opbrep_math::Point2::origin()).into_inner(),
        ));
        let copy = make_face(flipped, &[wires[0].reversed()], 1e-7).unwrap();
        assert_eq!(is_split_to_reverse_face(&copy, &f, &ctx), Ok(true));
        assert_eq!(is_split_to_reverse_face(&copy.reversed(), &f, &ctx), Ok(false));
    }

    #[test]
    fn test_split_to_reverse_with_warn_records_alert() {
        let ctx = Context::new();
        let report = Report::new();
        let b = make_box(Point3::origin(), 1.0, 1.0, 1.0).unwrap();
        let f = explore(&b, ShapeType::Face)[0].clone();
        let bare = make_face(face_surface(&f).unwrap(), &[], 1e-7).unwrap();
        let other = explore(&b, ShapeType::Face)[1].clone();
        assert!(!is_split_to_reverse_with_warn(&bare, &other, &ctx, &report));
        assert!(report.has_alert(AlertKind::UnableToOrientTheShape));
    }

    #[test]
    fn test_face_off_and_internal_face() {
        let ctx = Context::new();
        let b = make_box(Point3::origin(), 1.0, 1.0, 1.0).unwrap();
        let anc = map_shapes_and_ancestors(&b, ShapeType::Edge, ShapeType::Face);
        let (e, faces) = anc.iter().next().unwrap();
        let (f1, f2) = (faces[0].clone(), faces[1].clone());
        let off = get_face_off(e, &f1, &[f1.clone(), f2.clone()], &ctx).unwrap();
        assert!(off.is_same(&f2));
        assert_eq!(sense(&f1, &f2, &ctx), 0);
        assert_eq!(sense(&f1, &f1, &ctx), 1);
        assert_eq!(sense(&f1, &f1.reversed(), &ctx), -1);
        assert!(are_faces_same_domain(&f1, &f1, &ctx, 0.0));
        assert!(!are_faces_same_domain(&f1, &f2, &ctx, 0.0));
    }

    #[test]
    fn test_internal_face_without_shared_edges_uses_a_point() {
        let ctx = Context::new();
        let b = make_box(Point3::origin(), 1.0, 1.0, 1.0).unwrap();
        let edge_faces = map_shapes_and_ancestors(&b, ShapeType::Edge, ShapeType::Face);
        let inner = make_box(Point3::new(0.25, 0.25, 0.25), 0.5, 0.5, 0.5).unwrap();
        let far = make_box(Point3::new(3.0, 0.0, 0.0), 1.0, 1.0, 1.0).unwrap();
        for f in explore(&inner, ShapeType::Face) {
            assert!(is_internal_face_in_solid(&f, &b, &edge_faces, 1e-7, &ctx));
        }
        for f in explore(&far, ShapeType::Face) {
            assert!(!is_internal_face_in_solid(&f, &b, &edge_faces, 1e-7, &ctx));
        }
    }

    #[test]
    fn test_orient_faces_on_shell_repairs_flipped_face() {
        let b = make_box(Point3::origin(), 1.0, 1.0, 1.0).unwrap();
        let mut faces = explore(&b, ShapeType::Face);
        faces[3] = faces[3].reversed();
        let shell = make_shell(&faces).unwrap();
        let fixed = orient_faces_on_shell(&shell).unwrap();
        let out = explore(&fixed, ShapeType::Face);
        assert_eq!(out.len(), 6);
        assert!(out.iter().all(|f| f.orientation() == Orientation::Forward));
    }

    #[test]
    fn test_is_hole_follows_orientation() {
        let b = make_box(Point3::origin(), 1.0, 1.0, 1.0).unwrap();
        let f = explore(&b, ShapeType::Face)[0].clone();
        let w = explore(&f, ShapeType::Wire)[0].clone();
        assert!(!is_hole(&w, &f));
        assert!(is_hole(&w.reversed(), &f));
        let rewired = orient_edges_on_wire(&w).unwrap();
        assert_eq!(explore(&rewired, ShapeType::Edge).len(), 4);
    }
}
