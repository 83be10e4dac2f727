//! Point classifiers used to decide the state of split parts.
//!
//! [`TopologyClassifier`] is the closed set the builder dispatches on. The
//! general variant casts rays and works for any closed solid; the quadric
//! variant evaluates the bounding half-spaces of convex solids made of
//! planes and cylinders in closed form.

use opbrep_algo::uv::edge_polyline;
use opbrep_algo::{compute_state_point, Context};
use opbrep_ds::Config;
use opbrep_geom::{CylinderSurface, Plane};
use opbrep_math::{precision, Point3};
use opbrep_topo::tool::{edge_mid_point, face_surface, vertex_point};
use opbrep_topo::{explore, Orientation, Shape, ShapeType, State};

use crate::config::{BuildConfig, ClassifierTag};
use crate::gtopo::GTopo;

/// Classifies points against solids and answers the keep questions of an
/// operation.
pub trait Classifier {
    /// State of `p` relative to `solid`.
    fn classify_point(&self, p: &Point3, solid: &Shape, tol: f64, ctx: &Context) -> State;

    /// State of `shape` relative to `solid`, from one representative point.
    fn classify_shape(&self, shape: &Shape, solid: &Shape, tol: f64, ctx: &Context) -> State {
        match representative_point(shape, ctx) {
            Some(p) => self.classify_point(&p, solid, tol, ctx),
            None => State::Unknown,
        }
    }

    /// True when coincident parts oriented alike are kept by `g`.
    fn take_same_oriented(&self, g: &GTopo) -> bool {
        g.take_common_of_same()
    }

    /// True when coincident parts oriented oppositely are kept by `g`.
    fn take_diff_oriented(&self, g: &GTopo) -> bool {
        g.take_common_of_diff()
    }

    /// Keep matrix for parts kept in states `tb1` and `tb2`.
    fn gtopo(&self, tb1: State, tb2: State) -> Option<GTopo> {
        GTopo::for_states(tb1, tb2, Config::Unshgeometry)
    }
}

/// A point of `shape`: the vertex, the middle of the edge, a point inside
/// the face, or the point of its first child.
pub fn representative_point(shape: &Shape, ctx: &Context) -> Option<Point3> {
    match shape.shape_type() {
        ShapeType::Vertex => vertex_point(shape),
        ShapeType::Edge => edge_mid_point(shape),
        ShapeType::Face => ctx.point_in_face(shape).map(|(_, p)| p),
        _ => shape.children().find_map(|c| representative_point(&c, ctx)),
    }
}

/// Ray casting classifier.
#[derive(Debug, Clone, Copy, Default)]
pub struct RayClassifier;

impl Classifier for RayClassifier {
    fn classify_point(&self, p: &Point3, solid: &Shape, tol: f64, ctx: &Context) -> State {
        compute_state_point(p, solid, tol, ctx)
    }
}

/// Classifier for convex solids bounded by planes and cylinders.
///
/// A point is outside as soon as it is outside one bounding half-space.
/// Solids with other faces fall back to ray casting.
#[derive(Debug, Clone, Copy, Default)]
pub struct QuadricClassifier;

impl QuadricClassifier {
    /// Largest signed distance from `p` to the faces of `solid`, positive
    /// outside. `None` when a face is neither a plane nor a cylinder.
    fn max_distance(p: &Point3, solid: &Shape, ctx: &Context) -> Option<f64> {
        let mut dmax = f64::NEG_INFINITY;
        for f in ctx.solid_faces(solid).iter() {
            let d = face_distance(p, f)?;
            dmax = dmax.max(d);
        }
        dmax.is_finite().then_some(dmax)
    }
}

impl Classifier for QuadricClassifier {
    fn classify_point(&self, p: &Point3, solid: &Shape, tol: f64, ctx: &Context) -> State {
        match Self::max_distance(p, solid, ctx) {
            Some(d) if d > tol => State::Out,
            Some(d) if d >= -tol => State::On,
            Some(_) => State::In,
            None => compute_state_point(p, solid, tol, ctx),
        }
    }
}

/// Signed distance from `p` to the surface of `face`, positive on the side
/// the face normal points to.
fn face_distance(p: &Point3, face: &Shape) -> Option<f64> {
    let surface = face_surface(face)?;
    let any = surface.as_any();
    let d = if let Some(plane) = any.downcast_ref::<Plane>() {
        plane.signed_distance(p)
    } else if let Some(cyl) = any.downcast_ref::<CylinderSurface>() {
        cyl.axis_distance(p) - cyl.radius
    } else {
        return None;
    };
    Some(if face.orientation() == Orientation::Reversed { -d } else { d })
}

/// The classifiers the builder can use.
#[derive(Debug, Clone, Copy)]
pub enum TopologyClassifier {
    /// Ray casting.
    General(RayClassifier),
    /// Closed-form half-space tests.
    Quadric(QuadricClassifier),
}

impl Default for TopologyClassifier {
    fn default() -> Self {
        TopologyClassifier::General(RayClassifier)
    }
}

impl Classifier for TopologyClassifier {
    fn classify_point(&self, p: &Point3, solid: &Shape, tol: f64, ctx: &Context) -> State {
        match self {
            TopologyClassifier::General(c) => c.classify_point(p, solid, tol, ctx),
            TopologyClassifier::Quadric(c) => c.classify_point(p, solid, tol, ctx),
        }
    }
}

/// Classifier for an operation between `s1` and `s2`.
///
/// With [`ClassifierTag::Auto`] the quadric classifier is chosen when both
/// operands are convex solids bounded by planes and cylinders.
pub fn select_classifier(s1: &Shape, s2: &Shape, config: &BuildConfig, ctx: &Context) -> TopologyClassifier {
    match config.classifier {
        ClassifierTag::General => TopologyClassifier::General(RayClassifier),
        ClassifierTag::Quadric => TopologyClassifier::Quadric(QuadricClassifier),
        ClassifierTag::Auto => {
            if is_convex_quadric_solid(s1, ctx) && is_convex_quadric_solid(s2, ctx) {
                TopologyClassifier::Quadric(QuadricClassifier)
            } else {
                TopologyClassifier::General(RayClassifier)
            }
        }
    }
}

/// True when `shape` is a single-shell solid whose faces are planes or
/// cylinders and whose boundary lies behind every face.
pub fn is_convex_quadric_solid(shape: &Shape, ctx: &Context) -> bool {
    let solids = explore(shape, ShapeType::Solid);
    let [solid] = solids.as_slice() else {
        return false;
    };
    if solid.nb_children() != 1 {
        return false;
    }
    let faces = ctx.solid_faces(solid);
    if faces.is_empty() {
        return false;
    }
    let mut samples: Vec<Point3> = Vec::new();
    for e in explore(solid, ShapeType::Edge) {
        samples.extend(edge_polyline(&e));
    }
    let tol = 10.0 * precision::CONFUSION;
    faces.iter().all(|f| {
        samples
            .iter()
            .all(|p| face_distance(p, f).is_some_and(|d| d <= tol + f.tolerance()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use opbrep_primitives::{make_box, make_cylinder};
    use proptest::prelude::*;

    #[test]
    fn test_quadric_box_states() {
        let ctx = Context::new();
        let b = make_box(Point3::origin(), 2.0, 2.0, 2.0).unwrap();
        let c = QuadricClassifier;
        assert_eq!(c.classify_point(&Point3::new(1.0, 1.0, 1.0), &b, 1e-7, &ctx), State::In);
        assert_eq!(c.classify_point(&Point3::new(1.0, 1.0, 2.0), &b, 1e-7, &ctx), State::On);
        assert_eq!(c.classify_point(&Point3::new(3.0, 1.0, 1.0), &b, 1e-7, &ctx), State::Out);
    }

    #[test]
    fn test_quadric_cylinder_states() {
        let ctx = Context::new();
        let cyl = make_cylinder(Point3::origin(), 1.0, 2.0).unwrap();
        let c = QuadricClassifier;
        assert_eq!(c.classify_point(&Point3::new(0.5, 0.0, 1.0), &cyl, 1e-7, &ctx), State::In);
        assert_eq!(c.classify_point(&Point3::new(0.0, 1.0, 1.0), &cyl, 1e-7, &ctx), State::On);
        assert_eq!(c.classify_point(&Point3::new(0.9, 0.9, 1.0), &cyl, 1e-7, &ctx), State::Out);
    }

    #[test]
    fn test_auto_selection() {
        let ctx = Context::new();
        let b = make_box(Point3::origin(), 1.0, 1.0, 1.0).unwrap();
        let cyl = make_cylinder(Point3::origin(), 1.0, 2.0).unwrap();
        assert!(is_convex_quadric_solid(&b, &ctx));
        assert!(is_convex_quadric_solid(&cyl, &ctx));
        let cfg = BuildConfig::default();
        assert!(matches!(select_classifier(&b, &cyl, &cfg, &ctx), TopologyClassifier::Quadric(_)));
        let forced = BuildConfig {
            classifier: ClassifierTag::General,
            ..BuildConfig::default()
        };
        assert!(matches!(select_classifier(&b, &cyl, &forced, &ctx), TopologyClassifier::General(_)));
        let face = explore(&b, ShapeType::Face)[0].clone();
        assert!(!is_convex_quadric_solid(&face, &ctx));
    }

    #[test]
    fn test_classify_shape_uses_face_interior() {
        let ctx = Context::new();
        let big = make_box(Point3::origin(), 4.0, 4.0, 4.0).unwrap();
        let small = make_box(Point3::new(1.0, 1.0, 1.0), 1.0, 1.0, 1.0).unwrap();
        let f = explore(&small, ShapeType::Face)[0].clone();
        let c = TopologyClassifier::default();
        assert_eq!(c.classify_shape(&f, &big, 1e-7, &ctx), State::In);
        assert_eq!(c.classify_shape(&small, &big, 1e-7, &ctx), State::In);
    }

    proptest! {
        #[test]
        fn prop_classifiers_agree_off_boundary(x in -1.0f64..3.0, y in -1.0f64..3.0, z in -1.0f64..3.0) {
            let ctx = Context::new();
            let b = make_box(Point3::origin(), 2.0, 2.0, 2.0).unwrap();
            let p = Point3::new(x, y, z);
            let near = [x, y, z].iter().any(|c| c.abs() < 1e-3 || (c - 2.0).abs() < 1e-3);
            prop_assume!(!near);
            let inside = [x, y, z].iter().all(|c| *c > 0.0 && *c < 2.0);
            let expected = if inside { State::In } else { State::Out };
            prop_assert_eq!(QuadricClassifier.classify_point(&p, &b, 1e-7, &ctx), expected);
            prop_assert_eq!(RayClassifier.classify_point(&p, &b, 1e-7, &ctx), expected);
        }
    }
}
