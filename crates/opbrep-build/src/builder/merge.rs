//! Selecting the kept parts and assembling them into result shapes.

use opbrep_ds::{fds_config_3d, fds_sdm_faces, Config};
use opbrep_topo::{explore, explore_avoid, Shape, ShapeType, State};

use super::{top_dimension, Builder};
use crate::error::BuildError;
use crate::gtopo::GTopo;
use crate::shape_set::ShellFaceSet;
use crate::solid_builder::SolidBuilder;

/// True when a part of a lower dimensional operand is kept. `overlap`
/// marks parts lying on the other operand.
fn keep_part(rank: u8, state: State, tb1: State, tb2: State, other_is_solid: bool) -> bool {
    let tb = if rank == 2 { tb2 } else { tb1 };
    if other_is_solid {
        return state == tb;
    }
    match state {
        State::On => rank == 1 && tb1 == tb2,
        State::Out => tb == State::Out,
        _ => false,
    }
}

impl Builder {
    /// Merge the parts of `s1` in state `tb1` relative to `s2` with the
    /// parts of `s2` in state `tb2` relative to `s1`. The result is read
    /// with [`merged`](Self::merged) for either operand and its state.
    pub fn merge_shapes(&mut self, s1: &Shape, tb1: State, s2: &Shape, tb2: State) -> Result<(), BuildError> {
        self.check_open()?;
        let result = self.merge_dispatch(s1, tb1, s2, tb2);
        if matches!(result, Err(BuildError::Cancelled)) {
            self.clear_maps();
        }
        result
    }

    fn merge_dispatch(&mut self, s1: &Shape, tb1: State, s2: &Shape, tb2: State) -> Result<(), BuildError> {
        let g = self.gtopo(tb1, tb2)?;
        self.session.states = Some((tb1, tb2));
        if self.is_kpart().is_some() {
            return self.merge_kpart(tb1, tb2);
        }
        let (d1, d2) = (top_dimension(s1), top_dimension(s2));
        tracing::debug!(?tb1, ?tb2, d1, d2, "general merge");
        if d1 == 3 && d2 == 3 {
            return self.merge_solids(s1, tb1, s2, tb2, &g);
        }
        self.split_faces()?;
        let shapes = if d1 == 2 || d2 == 2 {
            let faces = |s: &Shape, d: i32| if d == 2 { explore(s, ShapeType::Face) } else { Vec::new() };
            let (l1, l2) = (faces(s1, d1), faces(s2, d2));
            self.merge_faces(&l1, tb1, &l2, tb2)?
        } else {
            let edges = |s: &Shape, d: i32| if d == 1 { vec![s.clone()] } else { Vec::new() };
            let (l1, l2) = (edges(s1, d1), edges(s2, d2));
            self.merge_edges(&l1, tb1, &l2, tb2)?
        };
        self.store_merged(s1, tb1, s2, tb2, shapes);
        Ok(())
    }

    /// Merge two solid operands with the keep matrix `g`.
    pub fn merge_solids(&mut self, s1: &Shape, tb1: State, s2: &Shape, tb2: State, g: &GTopo) -> Result<(), BuildError> {
        self.split_faces()?;
        let mut sfs = ShellFaceSet::new();
        self.merge_solid(s1, 1, g, &mut sfs)?;
        self.merge_solid(s2, 2, g, &mut sfs)?;
        self.add_on_patches_sfs(s1, g, &mut sfs);
        debug_bool!("merge_solids: {} faces kept", sfs.len());
        let mut solids = self.make_solids(&sfs)?;
        if self.config.regularize {
            solids = self.regularize_solid(&solids)?;
            let mut faced = Vec::with_capacity(solids.len());
            for s in &solids {
                faced.push(self.regularize_face(s)?);
            }
            solids = faced;
        }
        self.store_merged(s1, tb1, s2, tb2, solids);
        Ok(())
    }

    /// Add the kept parts of the faces of `s`, operand of `rank`.
    pub fn merge_solid(&self, s: &Shape, rank: u8, g: &GTopo, sfs: &mut ShellFaceSet) -> Result<(), BuildError> {
        for solid in explore(s, ShapeType::Solid) {
            self.check()?;
            self.fill_solid(&solid, rank, g, sfs)?;
        }
        Ok(())
    }

    /// Add the kept parts of the faces of `solid`.
    pub fn fill_solid(&self, solid: &Shape, rank: u8, g: &GTopo, sfs: &mut ShellFaceSet) -> Result<(), BuildError> {
        for shell in solid.children() {
            self.fill_shell(&shell, rank, g, sfs)?;
        }
        Ok(())
    }

    /// Add the kept parts of the faces of `shell`.
    pub fn fill_shell(&self, shell: &Shape, rank: u8, g: &GTopo, sfs: &mut ShellFaceSet) -> Result<(), BuildError> {
        for face in shell.children() {
            self.check()?;
            self.fill_face(&face, rank, g, sfs);
        }
        Ok(())
    }

    /// Add the parts of `face` lying inside or outside the other operand
    /// that `g` keeps, oriented for the result.
    pub fn fill_face(&self, face: &Shape, rank: u8, g: &GTopo, sfs: &mut ShellFaceSet) {
        let o = face.orientation();
        let rev = g.is_to_reverse(rank);
        for st in [State::In, State::Out] {
            let keep = if rank == 2 { g.value(st, State::On) } else { g.value(State::On, st) };
            if !keep {
                continue;
            }
            for p in self.splits(face, st) {
                let p = p.composed(o);
                sfs.add_face(&p.oriented(Self::orient(p.orientation(), rev)));
            }
        }
    }

    /// Dispatch on the type of `shape`.
    pub fn fill_shape(&self, shape: &Shape, rank: u8, g: &GTopo, sfs: &mut ShellFaceSet) -> Result<(), BuildError> {
        match shape.shape_type() {
            ShapeType::Solid => self.fill_solid(shape, rank, g, sfs),
            ShapeType::Shell => self.fill_shell(shape, rank, g, sfs),
            ShapeType::Face => {
                self.fill_face(shape, rank, g, sfs);
                Ok(())
            }
            _ => {
                for c in shape.children() {
                    self.fill_shape(&c, rank, g, sfs)?;
                }
                Ok(())
            }
        }
    }

    // ==== coincident parts ====

    /// Orientation of `face` relative to its same-domain face in the other
    /// operand.
    fn on_config(&self, face: &Shape) -> Config {
        let rank = self.ds.rank(face);
        fds_sdm_faces(&self.ds, face)
            .iter()
            .find(|x| self.ds.rank(x) != rank)
            .and_then(|x| fds_config_3d(&self.ds, face, x))
            .unwrap_or(Config::Unshgeometry)
    }

    /// Add the coincident parts of every face of `s1`. Coincident parts
    /// are taken from the first operand only.
    pub fn add_on_patches_sfs(&self, s1: &Shape, g: &GTopo, sfs: &mut ShellFaceSet) {
        for face in explore(s1, ShapeType::Face) {
            self.fill_on_patches(&face, g, sfs);
        }
    }

    /// Add the coincident parts of `face` when `g`, adjusted to the
    /// orientation of the coincident faces, keeps them.
    pub fn fill_on_patches(&self, face: &Shape, g: &GTopo, sfs: &mut ShellFaceSet) {
        let on = self.splits(face, State::On);
        if on.is_empty() {
            return;
        }
        let config = self.on_config(face);
        let gc = g.with_config(config);
        debug_bool!("  on patches of {:?}: {:?} kept={}", face, config, gc.value(State::On, State::On));
        if !gc.value(State::On, State::On) {
            return;
        }
        let o = face.orientation();
        let rev = gc.is_to_reverse1();
        for p in on {
            let p = p.composed(o);
            sfs.add_face(&p.oriented(Self::orient(p.orientation(), rev)));
        }
    }

    /// Parts of the faces of both operands, other than `face` and those in
    /// `avoid`, bounded by `edge`.
    pub fn find_faces_touching_edge(&self, face: &Shape, edge: &Shape, avoid: &[Shape]) -> Vec<Shape> {
        let mut out: Vec<Shape> = Vec::new();
        for (_, lists) in self.session.splits.iter() {
            for p in lists.all() {
                if p.shape_type() != ShapeType::Face || p.is_same(face) || Self::contains(p, avoid) {
                    continue;
                }
                if explore(p, ShapeType::Edge).iter().any(|e| e.is_same(edge)) && !Self::contains(p, &out) {
                    out.push(p.clone());
                }
            }
        }
        out
    }

    // ==== assembly ====

    /// Shells of the faces in `sfs`.
    pub fn make_shells(&self, sfs: &ShellFaceSet) -> Result<Vec<Shape>, BuildError> {
        Ok(SolidBuilder::new(sfs).make_shells()?)
    }

    /// Solids of the faces in `sfs`.
    pub fn make_solids(&self, sfs: &ShellFaceSet) -> Result<Vec<Shape>, BuildError> {
        Ok(SolidBuilder::new(sfs).make_solids(&self.session.classifier, &self.ctx, &self.report)?)
    }

    // ==== lower dimensions ====

    /// Merge face operands, or the faces of a face operand cut by a solid.
    pub fn merge_faces(&mut self, l1: &[Shape], tb1: State, l2: &[Shape], tb2: State) -> Result<Vec<Shape>, BuildError> {
        let mut kept: Vec<Shape> = Vec::new();
        for (list, rank) in [(l1, 1u8), (l2, 2u8)] {
            let other_is_solid = self
                .ds
                .operand(Self::other_rank(rank))
                .is_some_and(|o| top_dimension(o) == 3);
            for face in list {
                self.check()?;
                let o = face.orientation();
                for st in [State::In, State::On, State::Out] {
                    if !keep_part(rank, st, tb1, tb2, other_is_solid) {
                        continue;
                    }
                    for p in self.splits(face, st) {
                        let p = p.composed(o);
                        if !kept.iter().any(|k| k.is_same(&p)) {
                            kept.push(p);
                        }
                    }
                }
            }
        }
        if self.config.regularize {
            kept = self.regularize_faces(&kept)?;
        }
        Ok(kept)
    }

    /// Merge edge operands.
    pub fn merge_edges(&mut self, l1: &[Shape], tb1: State, l2: &[Shape], tb2: State) -> Result<Vec<Shape>, BuildError> {
        let mut kept: Vec<Shape> = Vec::new();
        for (list, rank) in [(l1, 1u8), (l2, 2u8)] {
            let other_is_solid = self
                .ds
                .operand(Self::other_rank(rank))
                .is_some_and(|o| top_dimension(o) == 3);
            for s in list {
                self.check()?;
                for wire in explore(s, ShapeType::Wire) {
                    self.fill_wire(&wire, rank, (tb1, tb2), other_is_solid, &mut kept);
                }
                for edge in explore_avoid(s, ShapeType::Edge, Some(ShapeType::Wire)) {
                    self.fill_edge(&edge, rank, (tb1, tb2), other_is_solid, &mut kept);
                }
            }
        }
        Ok(kept)
    }

    /// Add the kept parts of the edges of `wire`.
    pub fn fill_wire(&self, wire: &Shape, rank: u8, states: (State, State), other_is_solid: bool, out: &mut Vec<Shape>) {
        for edge in wire.children() {
            self.fill_edge(&edge, rank, states, other_is_solid, out);
        }
    }

    /// Add the kept parts of `edge`, with its orientation.
    pub fn fill_edge(&self, edge: &Shape, rank: u8, states: (State, State), other_is_solid: bool, out: &mut Vec<Shape>) {
        let (tb1, tb2) = states;
        let o = edge.orientation();
        for st in [State::In, State::On, State::Out] {
            if !keep_part(rank, st, tb1, tb2, other_is_solid) {
                continue;
            }
            for p in self.splits(edge, st) {
                let p = p.composed(o);
                if !out.iter().any(|k| k.is_same(&p)) {
                    out.push(p);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lower_dimension_keep_rules() {
        let (i, n, o) = (State::In, State::On, State::Out);
        // union keeps outside parts of both and the overlap once
        assert!(keep_part(1, o, o, o, false) && keep_part(2, o, o, o, false));
        assert!(keep_part(1, n, o, o, false) && !keep_part(2, n, o, o, false));
        // intersection keeps the overlap only
        assert!(keep_part(1, n, i, i, false) && !keep_part(1, o, i, i, false));
        // difference keeps the outside of the first operand
        assert!(keep_part(1, o, o, i, false) && !keep_part(1, n, o, i, false) && !keep_part(2, o, o, i, false));
        // against a solid the state decides
        assert!(keep_part(1, i, i, i, true) && !keep_part(1, o, i, i, true));
    }
}
