//! Paves: the vertices splitting an edge, ordered by curve parameter.

use opbrep_topo::tool::{edge_range, edge_vertices, is_closed_edge};
use opbrep_topo::{Orientation, Shape};

/// Parameter gap under which two paves are merged.
const PAVE_TOL: f64 = 1e-9;

/// A vertex at a parameter of an edge curve.
#[derive(Debug, Clone)]
pub struct Pave {
    /// Curve parameter.
    pub parameter: f64,
    /// Vertex at that parameter.
    pub vertex: Shape,
}

/// Paves of one edge. The edge end vertices are always paves.
#[derive(Debug, Clone)]
pub struct PaveSet {
    edge: Shape,
    paves: Vec<Pave>,
    closed: bool,
}

impl PaveSet {
    /// Pave set holding the end vertices of `edge`.
    pub fn new(edge: &Shape) -> Option<Self> {
        let edge = edge.oriented(Orientation::Forward);
        let (first, last) = edge_range(&edge)?;
        let (v1, v2) = edge_vertices(&edge)?;
        let closed = is_closed_edge(&edge);
        Some(Self {
            paves: vec![
                Pave {
                    parameter: first,
                    vertex: v1.oriented(Orientation::Forward),
                },
                Pave {
                    parameter: last,
                    vertex: v2.oriented(Orientation::Forward),
                },
            ],
            edge,
            closed,
        })
    }

    /// The edge, Forward.
    pub fn edge(&self) -> &Shape {
        &self.edge
    }

    /// True when the edge starts and ends on the same vertex.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Add an inner pave. Paves outside the open edge range are ignored.
    pub fn append(&mut self, parameter: f64, vertex: &Shape) {
        let (first, last) = (self.first().parameter, self.last().parameter);
        if parameter <= first + PAVE_TOL || parameter >= last - PAVE_TOL {
            return;
        }
        // the end pave stays last
        let at = self.paves.len() - 1;
        self.paves.insert(
            at,
            Pave {
                parameter,
                vertex: vertex.oriented(Orientation::Forward),
            },
        );
    }

    /// Replace the vertex at an end of the edge.
    pub fn set_end_vertex(&mut self, at_start: bool, vertex: &Shape) {
        let i = if at_start { 0 } else { self.paves.len() - 1 };
        self.paves[i].vertex = vertex.oriented(Orientation::Forward);
    }

    fn first(&self) -> &Pave {
        &self.paves[0]
    }

    fn last(&self) -> &Pave {
        &self.paves[self.paves.len() - 1]
    }

    /// Sort inner paves and merge those sharing a parameter or a vertex.
    pub fn sort_and_merge(&mut self) {
        let last = self.paves.len() - 1;
        let end = self.paves.remove(last);
        let start = self.paves.remove(0);
        self.paves.sort_by(|a, b| a.parameter.total_cmp(&b.parameter));
        let mut merged: Vec<Pave> = vec![start];
        for p in self.paves.drain(..) {
            let prev = &merged[merged.len() - 1];
            if p.parameter - prev.parameter <= PAVE_TOL || p.vertex.is_same(&prev.vertex) {
                continue;
            }
            merged.push(p);
        }
        while merged.len() > 1 {
            let prev = &merged[merged.len() - 1];
            if end.parameter - prev.parameter <= PAVE_TOL || end.vertex.is_same(&prev.vertex) {
                merged.pop();
            } else {
                break;
            }
        }
        merged.push(end);
        self.paves = merged;
    }

    /// Paves in parameter order.
    pub fn paves(&self) -> &[Pave] {
        &self.paves
    }

    /// True when no inner pave splits the edge.
    pub fn is_unsplit(&self) -> bool {
        self.paves.len() == 2
    }

    /// Consecutive pave pairs bounding the pieces of the edge.
    pub fn intervals(&self) -> impl Iterator<Item = (&Pave, &Pave)> {
        self.paves.windows(2).map(|w| (&w[0], &w[1]))
    }
}
