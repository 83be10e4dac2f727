//! Traversal of the shape graph and insertion-ordered shape maps.

use std::collections::HashMap;

use crate::{Shape, ShapeType};

/// All sub-shapes of type `find` reached from `shape`, depth first.
///
/// Orientations and locations are composed along the path. A sub-shape
/// shared by several parents is returned once per path, as a shell
/// returns each inner edge twice.
pub fn explore(shape: &Shape, find: ShapeType) -> Vec<Shape> {
    explore_avoid(shape, find, None)
}

/// Like [`explore`], without descending into shapes of type `avoid`.
pub fn explore_avoid(shape: &Shape, find: ShapeType, avoid: Option<ShapeType>) -> Vec<Shape> {
    let mut out = Vec::new();
    walk(shape, find, avoid, &mut out);
    out
}

fn walk(shape: &Shape, find: ShapeType, avoid: Option<ShapeType>, out: &mut Vec<Shape>) {
    if shape.shape_type() == find {
        out.push(shape.clone());
        return;
    }
    if Some(shape.shape_type()) == avoid || shape.shape_type() > find && shape.shape_type() != ShapeType::Compound {
        return;
    }
    for child in shape.children() {
        walk(&child, find, avoid, out);
    }
}

/// Insertion-ordered map keyed by shape identity.
#[derive(Debug, Clone)]
pub struct IndexedShapeMap<V> {
    keys: Vec<Shape>,
    values: Vec<V>,
    index: HashMap<Shape, usize>,
}

/// Insertion-ordered set of shapes.
pub type IndexedShapeSet = IndexedShapeMap<()>;

impl<V> Default for IndexedShapeMap<V> {
    fn default() -> Self {
        Self {
            keys: Vec::new(),
            values: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<V> IndexedShapeMap<V> {
    /// Empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `key` if absent; returns its index. An existing value is kept.
    pub fn insert(&mut self, key: Shape, value: V) -> usize {
        if let Some(&i) = self.index.get(&key) {
            return i;
        }
        let i = self.keys.len();
        self.index.insert(key.clone(), i);
        self.keys.push(key);
        self.values.push(value);
        i
    }

    /// Index of `key`.
    pub fn find_index(&self, key: &Shape) -> Option<usize> {
        self.index.get(key).copied()
    }

    /// True if `key` is present.
    pub fn contains(&self, key: &Shape) -> bool {
        self.index.contains_key(key)
    }

    /// Value stored for `key`.
    pub fn get(&self, key: &Shape) -> Option<&V> {
        self.find_index(key).map(|i| &self.values[i])
    }

    /// Mutable value stored for `key`.
    pub fn get_mut(&mut self, key: &Shape) -> Option<&mut V> {
        match self.find_index(key) {
            Some(i) => Some(&mut self.values[i]),
            None => None,
        }
    }

    /// Key at `index`.
    pub fn key(&self, index: usize) -> Option<&Shape> {
        self.keys.get(index)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// True if empty.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Keys in insertion order.
    pub fn keys(&self) -> &[Shape] {
        &self.keys
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&Shape, &V)> {
        self.keys.iter().zip(self.values.iter())
    }

    /// Remove everything.
    pub fn clear(&mut self) {
        self.keys.clear();
        self.values.clear();
        self.index.clear();
    }
}

impl<V: Default> IndexedShapeMap<V> {
    /// Value for `key`, inserting the default first if absent.
    pub fn entry(&mut self, key: &Shape) -> &mut V {
        let i = match self.find_index(key) {
            Some(i) => i,
            None => self.insert(key.clone(), V::default()),
        };
        &mut self.values[i]
    }
}

/// Unique sub-shapes of type `find` in traversal order.
pub fn map_shapes(shape: &Shape, find: ShapeType) -> IndexedShapeSet {
    let mut m = IndexedShapeSet::new();
    for s in explore(shape, find) {
        m.insert(s, ());
    }
    m
}

/// For every sub-shape of type `sub`, the distinct ancestors of type `anc` containing it.
pub fn map_shapes_and_ancestors(shape: &Shape, sub: ShapeType, anc: ShapeType) -> IndexedShapeMap<Vec<Shape>> {
    let mut m: IndexedShapeMap<Vec<Shape>> = IndexedShapeMap::new();
    for a in explore(shape, anc) {
        for s in explore(&a, sub) {
            let list = m.entry(&s);
            if !list.iter().any(|x| x.is_same(&a)) {
                list.push(a.clone());
            }
        }
    }
    m
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{make_compound, make_vertex};
    use opbrep_math::Point3;

    #[test]
    fn test_indexed_map_keeps_first() {
        let a = make_vertex(Point3::origin(), 1e-7);
        let mut m = IndexedShapeMap::new();
        assert_eq!(m.insert(a.clone(), 1), 0);
        assert_eq!(m.insert(a.reversed(), 2), 0);
        assert_eq!(m.get(&a), Some(&1));
        *m.entry(&a) += 5;
        assert_eq!(m.get(&a), Some(&6));
        assert_eq!(m.len(), 1);
    }

    #[test]
    fn test_explore_through_compound() {
        let a = make_vertex(Point3::origin(), 1e-7);
        let b = make_vertex(Point3::new(1.0, 0.0, 0.0), 1e-7);
        let inner = make_compound(&[a.clone(), b.clone()]);
        let outer = make_compound(&[inner, a.reversed()]);
        let found = explore(&outer, ShapeType::Vertex);
        assert_eq!(found.len(), 3);
        assert_eq!(map_shapes(&outer, ShapeType::Vertex).len(), 2);
    }
}
