//! Element sets accumulated while filling a result shape.

use opbrep_geom::SurfaceRef;
use opbrep_topo::tool::face_surface;
use opbrep_topo::{Orientation, Shape};

/// Oriented edges bounding the pieces of one face.
///
/// The reference face is taken Forward: edges are oriented so that the
/// material lies on their left when looking against the surface normal.
#[derive(Debug, Clone)]
pub struct WireEdgeSet {
    face: Shape,
    surface: SurfaceRef,
    edges: Vec<Shape>,
    section: Vec<bool>,
}

impl WireEdgeSet {
    /// Empty set for `face`. `None` when the face has no surface.
    pub fn new(face: &Shape) -> Option<Self> {
        let face = face.oriented(Orientation::Forward);
        let surface = face_surface(&face)?;
        Some(Self {
            face,
            surface,
            edges: Vec::new(),
            section: Vec::new(),
        })
    }

    /// The reference face, Forward.
    pub fn face(&self) -> &Shape {
        &self.face
    }

    /// Surface of the reference face.
    pub fn surface(&self) -> &SurfaceRef {
        &self.surface
    }

    /// Add a piece of the face boundary. An edge already present with the
    /// same orientation is skipped.
    pub fn add_start_element(&mut self, edge: &Shape) {
        self.push(edge, false);
    }

    /// Add a section edge in both orientations, unless the face boundary
    /// already uses it.
    pub fn add_section_element(&mut self, edge: &Shape) {
        if self.edges.iter().zip(&self.section).any(|(e, s)| !s && e.is_same(edge)) {
            return;
        }
        let fwd = edge.oriented(Orientation::Forward);
        self.push(&fwd, true);
        self.push(&fwd.reversed(), true);
    }

    fn push(&mut self, edge: &Shape, section: bool) {
        if self.edges.iter().any(|e| e.is_equal(edge)) {
            return;
        }
        self.edges.push(edge.clone());
        self.section.push(section);
    }

    /// All oriented edges.
    pub fn edges(&self) -> &[Shape] {
        &self.edges
    }

    /// True when some section edge was added.
    pub fn has_section_edges(&self) -> bool {
        self.section.iter().any(|s| *s)
    }

    /// Number of oriented edges.
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    /// True when empty.
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

/// Oriented faces bounding the pieces of a result solid.
#[derive(Debug, Clone, Default)]
pub struct ShellFaceSet {
    faces: Vec<Shape>,
}

impl ShellFaceSet {
    /// Empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a face. A face already present with the same orientation is skipped.
    pub fn add_face(&mut self, face: &Shape) {
        if !self.faces.iter().any(|f| f.is_equal(face)) {
            self.faces.push(face.clone());
        }
    }

    /// All faces.
    pub fn faces(&self) -> &[Shape] {
        &self.faces
    }

    /// Number of faces.
    pub fn len(&self) -> usize {
        self.faces.len()
    }

    /// True when empty.
    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opbrep_math::Point3;
    use opbrep_primitives::make_box;
    use opbrep_topo::{explore, ShapeType};

    #[test]
    fn test_section_edges_skip_boundary() {
        let b = make_box(Point3::origin(), 1.0, 1.0, 1.0).unwrap();
        let faces = explore(&b, ShapeType::Face);
        let mut wes = WireEdgeSet::new(&faces[0].reversed()).unwrap();
        assert_eq!(wes.face().orientation(), Orientation::Forward);
        let edges = explore(&faces[0], ShapeType::Edge);
        for e in &edges {
            wes.add_start_element(e);
        }
        wes.add_start_element(&edges[0]);
        assert_eq!(wes.len(), 4);
        wes.add_section_element(&edges[1]);
        assert_eq!(wes.len(), 4);
        assert!(!wes.has_section_edges());
        let other = explore(&faces[1], ShapeType::Edge)[0].clone();
        wes.add_section_element(&other);
        assert_eq!(wes.len(), 6);
        assert!(wes.has_section_edges());
    }

    #[test]
    fn test_shell_face_set_dedup() {
        let b = make_box(Point3::origin(), 1.0, 1.0, 1.0).unwrap();
        let f = explore(&b, ShapeType::Face)[0].clone();
        let mut sfs = ShellFaceSet::new();
        sfs.add_face(&f);
        sfs.add_face(&f);
        sfs.add_face(&f.reversed());
        assert_eq!(sfs.len(), 2);
    }
}
