//! Merging result pieces split only by the operation.

use std::collections::HashMap;

use opbrep_topo::tool::{edge_mid_point, face_surface};
use opbrep_topo::{explore, Orientation, Shape, ShapeType};

use super::Builder;
use crate::error::BuildError;
use crate::face_builder::FaceBuilder;
use crate::shape_set::{ShellFaceSet, WireEdgeSet};
use crate::solid_builder::SolidBuilder;

/// Disjoint sets over indices.
struct Groups(Vec<usize>);

impl Groups {
    fn new(n: usize) -> Self {
        Self((0..n).collect())
    }

    fn find(&mut self, i: usize) -> usize {
        let mut r = i;
        while self.0[r] != r {
            r = self.0[r];
        }
        let mut i = i;
        while self.0[i] != r {
            let next = self.0[i];
            self.0[i] = r;
            i = next;
        }
        r
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            self.0[rb.max(ra)] = ra.min(rb);
        }
    }

    fn sets(mut self) -> Vec<Vec<usize>> {
        let mut by_root: Vec<Vec<usize>> = vec![Vec::new(); self.0.len()];
        for i in 0..self.0.len() {
            let r = self.find(i);
            by_root[r].push(i);
        }
        by_root.into_iter().filter(|s| !s.is_empty()).collect()
    }
}

/// Pairs of shapes in `shapes` sharing a sub-shape of type `kind`, with
/// the shared sub-shape.
fn shared(shapes: &[Shape], kind: ShapeType) -> Vec<(usize, usize, Shape)> {
    let mut owners: HashMap<usize, Vec<usize>> = HashMap::new();
    let mut subs: HashMap<usize, Shape> = HashMap::new();
    for (i, s) in shapes.iter().enumerate() {
        for x in explore(s, kind) {
            let list = owners.entry(x.entity_id()).or_default();
            if !list.contains(&i) {
                list.push(i);
            }
            subs.entry(x.entity_id()).or_insert(x);
        }
    }
    let mut out = Vec::new();
    for (id, list) in owners {
        for w in list.windows(2) {
            if let Some(x) = subs.get(&id) {
                out.push((w[0], w[1], x.clone()));
            }
        }
    }
    out
}

impl Builder {
    /// True when `f1` and `f2` lie on one surface, on the same side, near
    /// their common edge `e`.
    fn is_smooth_pair(&self, f1: &Shape, f2: &Shape, e: &Shape) -> bool {
        if f1.orientation() != f2.orientation() {
            return false;
        }
        let (Some(s1), Some(s2)) = (face_surface(f1), face_surface(f2)) else {
            return false;
        };
        if !s1.same_locus(s2.as_ref(), self.config.tolerance()) {
            return false;
        }
        let Some(p) = edge_mid_point(e) else {
            return false;
        };
        match (s1.project(&p), s2.project(&p)) {
            (Some(uv1), Some(uv2)) => s1.normal(uv1).into_inner().dot(&s2.normal(uv2).into_inner()) > 0.0,
            _ => false,
        }
    }

    /// Merge the faces in `faces` that share an edge on a common surface.
    /// Faces that cannot be rebuilt are returned unchanged.
    pub fn regularize_faces(&self, faces: &[Shape]) -> Result<Vec<Shape>, BuildError> {
        let mut groups = Groups::new(faces.len());
        for (i, j, e) in shared(faces, ShapeType::Edge) {
            if self.is_smooth_pair(&faces[i], &faces[j], &e) {
                groups.union(i, j);
            }
        }
        let mut out = Vec::with_capacity(faces.len());
        for set in groups.sets() {
            let members: Vec<Shape> = set.iter().map(|&i| faces[i].clone()).collect();
            if members.len() == 1 {
                out.extend(members);
                continue;
            }
            match self.merge_face_group(&members)? {
                Some(f) => out.push(f),
                None => out.extend(members),
            }
        }
        Ok(out)
    }

    fn merge_face_group(&self, members: &[Shape]) -> Result<Option<Shape>, BuildError> {
        let o = members[0].orientation();
        // edges of the group, in the orientation of the faces taken Forward
        let mut edges: Vec<(usize, Shape)> = Vec::new();
        for (k, f) in members.iter().enumerate() {
            for e in explore(&f.oriented(Orientation::Forward), ShapeType::Edge) {
                edges.push((k, e));
            }
        }
        // shared by two faces of the group
        let inner = |e: &Shape| {
            let mut owners = edges.iter().filter(|(_, x)| x.is_same(e)).map(|(k, _)| *k);
            owners.next().is_some_and(|k| owners.any(|j| j != k))
        };
        let Some(mut wes) = WireEdgeSet::new(&members[0].oriented(Orientation::Forward)) else {
            return Ok(None);
        };
        for (_, e) in &edges {
            if !inner(e) {
                wes.add_start_element(e);
            }
        }
        let tol = members.iter().map(Shape::tolerance).fold(0.0, f64::max);
        let built = FaceBuilder::new(&wes, tol).build(&self.report)?;
        debug_bool!("regularize: {} faces -> {}", members.len(), built.len());
        match built.as_slice() {
            [f] => Ok(Some(f.oriented(o))),
            _ => Ok(None),
        }
    }

    /// `solid` with the faces split only by the operation merged.
    pub fn regularize_face(&self, solid: &Shape) -> Result<Shape, BuildError> {
        let faces = explore(solid, ShapeType::Face);
        let merged = self.regularize_faces(&faces)?;
        if merged.len() == faces.len() {
            return Ok(solid.clone());
        }
        let mut sfs = ShellFaceSet::new();
        for f in &merged {
            sfs.add_face(f);
        }
        let solids = SolidBuilder::new(&sfs).make_solids(&self.session.classifier, &self.ctx, &self.report)?;
        Ok(match solids.as_slice() {
            [s] => s.clone(),
            _ => solid.clone(),
        })
    }

    /// Merge the solids of `solids` that share a face; shared faces are
    /// dropped.
    pub fn regularize_solid(&self, solids: &[Shape]) -> Result<Vec<Shape>, BuildError> {
        let mut groups = Groups::new(solids.len());
        for (i, j, _) in shared(solids, ShapeType::Face) {
            groups.union(i, j);
        }
        let mut out = Vec::with_capacity(solids.len());
        for set in groups.sets() {
            if set.len() == 1 {
                out.push(solids[set[0]].clone());
                continue;
            }
            let faces: Vec<Shape> = set.iter().flat_map(|&i| explore(&solids[i], ShapeType::Face)).collect();
            let mut sfs = ShellFaceSet::new();
            for f in &faces {
                if faces.iter().filter(|x| x.is_same(f)).count() == 1 {
                    sfs.add_face(f);
                }
            }
            out.extend(SolidBuilder::new(&sfs).make_solids(&self.session.classifier, &self.ctx, &self.report)?);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opbrep_geom::{Line3d, Plane};
    use opbrep_math::Point3;
    use opbrep_topo::builder::{make_edge, make_face, make_vertex, make_wire};
    use std::sync::Arc;

    fn seg(a: &Shape, b: &Shape, pa: Point3, pb: Point3) -> Shape {
        make_edge(Arc::new(Line3d::from_points(pa, pb)), 0.0, 1.0, a, b, 1e-7).unwrap()
    }

    /// Two unit squares side by side on the XY plane sharing the edge x = 1.
    fn two_squares() -> (Shape, Shape) {
        let p = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
            Point3::new(2.0, 1.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        let v: Vec<Shape> = p.iter().map(|x| make_vertex(*x, 1e-7)).collect();
        let mid = seg(&v[1], &v[4], p[1], p[4]);
        let left = make_wire(&[
            seg(&v[0], &v[1], p[0], p[1]),
            mid.clone(),
            seg(&v[4], &v[5], p[4], p[5]),
            seg(&v[5], &v[0], p[5], p[0]),
        ])
        .unwrap();
        let right = make_wire(&[
            seg(&v[1], &v[2], p[1], p[2]),
            seg(&v[2], &v[3], p[2], p[3]),
            seg(&v[3], &v[4], p[3], p[4]),
            mid.reversed(),
        ])
        .unwrap();
        let plane: Arc<Plane> = Arc::new(Plane::xy());
        (
            make_face(plane.clone(), &[left], 1e-7).unwrap(),
            make_face(plane, &[right], 1e-7).unwrap(),
        )
    }

    #[test]
    fn test_adjacent_coplanar_faces_merge() {
        let (a, b) = two_squares();
        let builder = Builder::default();
        let merged = builder.regularize_faces(&[a, b]).unwrap();
        assert_eq!(merged.len(), 1);
        assert_eq!(explore(&merged[0], ShapeType::Edge).len(), 6);

        // idempotent
        let again = builder.regularize_faces(&merged).unwrap();
        assert_eq!(again.len(), 1);
        assert!(again[0].is_equal(&merged[0]));
    }

    #[test]
    fn test_opposite_faces_stay_apart() {
        let (a, b) = two_squares();
        let merged = Builder::default().regularize_faces(&[a, b.reversed()]).unwrap();
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn test_groups_union_find() {
        let mut g = Groups::new(5);
        g.union(0, 3);
        g.union(3, 4);
        let sets = g.sets();
        assert_eq!(sets, vec![vec![0, 3, 4], vec![1], vec![2]]);
    }
}
