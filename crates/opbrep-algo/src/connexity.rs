//! Connexity blocks: groups of elements connected through shared sub-shapes.

use opbrep_topo::builder::make_compound;
use opbrep_topo::{explore, map_shapes_and_ancestors, IndexedShapeMap, IndexedShapeSet, Orientation, Shape, ShapeType};

/// A group of connected elements.
#[derive(Debug, Clone, Default)]
pub struct ConnexityBlock {
    /// Elements of the block. An element given twice in the input is
    /// stored once Forward and once Reversed.
    pub shapes: Vec<Shape>,
    /// True when every connection element of the block touches exactly two
    /// block elements and no element was given twice.
    pub regular: bool,
}

/// The block of `shapes` connected to the first one.
///
/// Connections go through shared sub-shapes of type `connection`; those in
/// `avoid` do not connect.
pub fn make_connexity_block(
    shapes: &[Shape],
    avoid: &IndexedShapeSet,
    connection: ShapeType,
    element: ShapeType,
) -> Vec<Shape> {
    let Some(first) = shapes.first() else {
        return Vec::new();
    };
    let mut ancestors: IndexedShapeMap<Vec<Shape>> = IndexedShapeMap::new();
    for s in shapes {
        for sub in explore(s, connection) {
            let list = ancestors.entry(&sub);
            if !list.iter().any(|x| x.is_same(s)) {
                list.push(s.clone());
            }
        }
    }

    let mut block = IndexedShapeSet::new();
    block.insert(first.clone(), ());
    let mut i = 0;
    while let Some(s) = block.key(i).cloned() {
        i += 1;
        if s.shape_type() != element {
            continue;
        }
        for sub in explore(&s, connection) {
            if avoid.contains(&sub) {
                continue;
            }
            if let Some(list) = ancestors.get(&sub) {
                for other in list {
                    block.insert(other.clone(), ());
                }
            }
        }
    }
    block.keys().to_vec()
}

fn blocks_of(shape: &Shape, connection: ShapeType, element: ShapeType) -> (Vec<Vec<Shape>>, IndexedShapeMap<Vec<Shape>>) {
    let cmap = map_shapes_and_ancestors(shape, connection, element);
    let mut fence = IndexedShapeSet::new();
    let mut blocks = Vec::new();
    for s in explore(shape, element) {
        if fence.contains(&s) {
            continue;
        }
        fence.insert(s.clone(), ());
        let mut block = vec![s];
        let mut i = 0;
        while i < block.len() {
            let s1 = block[i].clone();
            i += 1;
            for sub in explore(&s1, connection) {
                let Some(list) = cmap.get(&sub) else {
                    continue;
                };
                for s2 in list {
                    if !fence.contains(s2) {
                        fence.insert(s2.clone(), ());
                        block.push(s2.clone());
                    }
                }
            }
        }
        blocks.push(block);
    }
    (blocks, cmap)
}

/// Connexity blocks of the `element` sub-shapes of `shape`, one compound per block.
pub fn make_connexity_blocks(shape: &Shape, connection: ShapeType, element: ShapeType) -> Vec<Shape> {
    blocks_of(shape, connection, element)
        .0
        .iter()
        .map(|b| make_compound(b))
        .collect()
}

/// Connexity blocks of a list of elements, with their regularity.
pub fn make_connexity_blocks_list(shapes: &[Shape], connection: ShapeType, element: ShapeType) -> Vec<ConnexityBlock> {
    let mut fence = IndexedShapeSet::new();
    let mut non_regular = IndexedShapeSet::new();
    let mut start = Vec::new();
    for s in shapes {
        if fence.contains(s) {
            non_regular.insert(s.clone(), ());
        } else {
            fence.insert(s.clone(), ());
            start.push(s.clone());
        }
    }

    let (blocks, cmap) = blocks_of(&make_compound(&start), connection, element);
    blocks
        .into_iter()
        .map(|block| {
            let mut cb = ConnexityBlock {
                shapes: Vec::with_capacity(block.len()),
                regular: true,
            };
            for s in block {
                if non_regular.contains(&s) {
                    cb.regular = false;
                    cb.shapes.push(s.oriented(Orientation::Forward));
                    cb.shapes.push(s.oriented(Orientation::Reversed));
                    continue;
                }
                if cb.regular {
                    cb.regular = explore(&s, connection)
                        .iter()
                        .all(|sub| cmap.get(sub).is_some_and(|l| l.len() == 2));
                }
                cb.shapes.push(s);
            }
            cb
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use opbrep_math::Point3;
    use opbrep_primitives::make_box;
    use opbrep_topo::map_shapes;

    #[test]
    fn test_closed_shell_is_one_regular_block() {
        let b = make_box(Point3::origin(), 1.0, 1.0, 1.0).unwrap();
        let blocks = make_connexity_blocks(&b, ShapeType::Edge, ShapeType::Face);
        assert_eq!(blocks.len(), 1);
        let faces = explore(&b, ShapeType::Face);
        let list = make_connexity_blocks_list(&faces, ShapeType::Edge, ShapeType::Face);
        assert_eq!(list.len(), 1);
        assert!(list[0].regular);
        assert_eq!(list[0].shapes.len(), 6);
    }

    #[test]
    fn test_avoided_edges_split_blocks() {
        let b = make_box(Point3::origin(), 1.0, 1.0, 1.0).unwrap();
        let faces = explore(&b, ShapeType::Face);
        // Cut the shell along the four edges of the bottom face.
        let avoid = map_shapes(&faces[0], ShapeType::Edge);
        let block = make_connexity_block(&faces, &avoid, ShapeType::Edge, ShapeType::Face);
        assert_eq!(block.len(), 1);
        let rest: Vec<Shape> = faces[1..].to_vec();
        let block = make_connexity_block(&rest, &avoid, ShapeType::Edge, ShapeType::Face);
        assert_eq!(block.len(), 5);
    }

    #[test]
    fn test_duplicate_face_breaks_regularity() {
        let b = make_box(Point3::origin(), 1.0, 1.0, 1.0).unwrap();
        let mut faces = explore(&b, ShapeType::Face);
        let open: Vec<Shape> = faces[..5].to_vec();
        let list = make_connexity_blocks_list(&open, ShapeType::Edge, ShapeType::Face);
        assert_eq!(list.len(), 1);
        assert!(!list[0].regular);
        faces.push(faces[0].clone());
        let list = make_connexity_blocks_list(&faces, ShapeType::Edge, ShapeType::Face);
        assert!(!list[0].regular);
        assert_eq!(list[0].shapes.len(), 7);
    }
}
