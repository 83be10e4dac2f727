//! Keep matrices of the Boolean operations.
//!
//! A [`GTopo`] answers, for a part lying on the boundary of one operand,
//! whether it belongs to the result given its state relative to each
//! operand. Rows are the state relative to the first operand, columns the
//! state relative to the second, both in the order `In`, `On`, `Out`.

use opbrep_ds::Config;
use opbrep_topo::{ShapeType, State};
use serde::{Deserialize, Serialize};

fn index(s: State) -> Option<usize> {
    match s {
        State::In => Some(0),
        State::On => Some(1),
        State::Out => Some(2),
        State::Unknown => None,
    }
}

const STATES: [State; 3] = [State::In, State::On, State::Out];

/// Keep matrix of a Boolean operation between two shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GTopo {
    table: [[bool; 3]; 3],
    types: (ShapeType, ShapeType),
    configs: (Config, Config),
}

impl GTopo {
    /// Matrix from its nine entries, in the order ii, in, io, ni, nn, no, oi, on, oo.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        ii: bool,
        in_: bool,
        io: bool,
        ni: bool,
        nn: bool,
        no: bool,
        oi: bool,
        on: bool,
        oo: bool,
        configs: (Config, Config),
    ) -> Self {
        Self {
            table: [[ii, in_, io], [ni, nn, no], [oi, on, oo]],
            types: (ShapeType::Solid, ShapeType::Solid),
            configs,
        }
    }

    /// Same matrix for operands of the given types.
    pub fn with_types(mut self, t1: ShapeType, t2: ShapeType) -> Self {
        self.types = (t1, t2);
        self
    }

    /// Union: parts outside the other operand.
    pub fn fuse(config: Config) -> Self {
        use Config::*;
        match config {
            Unshgeometry => Self::new(false, false, false, false, false, true, false, true, false, (Unshgeometry, Unshgeometry)),
            SameOriented => Self::new(false, false, false, false, true, true, false, true, false, (SameOriented, SameOriented)),
            DiffOriented => Self::new(false, false, false, false, false, true, false, true, false, (DiffOriented, SameOriented)),
        }
    }

    /// Difference: parts of the first operand outside the second, parts of
    /// the second inside the first.
    pub fn cut(config: Config) -> Self {
        use Config::*;
        match config {
            Unshgeometry => Self::new(false, true, false, false, false, true, false, false, false, (Unshgeometry, Unshgeometry)),
            SameOriented => Self::new(false, true, false, false, false, true, false, false, false, (SameOriented, SameOriented)),
            DiffOriented => Self::new(false, true, false, false, true, true, false, false, false, (DiffOriented, SameOriented)),
        }
    }

    /// Intersection: parts inside the other operand.
    pub fn common(config: Config) -> Self {
        use Config::*;
        match config {
            Unshgeometry => Self::new(false, true, false, true, false, false, false, false, false, (Unshgeometry, Unshgeometry)),
            SameOriented => Self::new(false, true, false, true, true, false, false, false, false, (SameOriented, SameOriented)),
            DiffOriented => Self::new(false, true, false, true, false, false, false, false, false, (DiffOriented, SameOriented)),
        }
    }

    /// Matrix of the operation keeping parts of the first operand in state
    /// `tb1` relative to the second, and parts of the second in state `tb2`.
    pub fn for_states(tb1: State, tb2: State, config: Config) -> Option<Self> {
        match (tb1, tb2) {
            (State::Out, State::Out) => Some(Self::fuse(config)),
            (State::Out, State::In) => Some(Self::cut(config)),
            (State::In, State::In) => Some(Self::common(config)),
            (State::In, State::Out) => Some(Self::cut(config).copy_permuted()),
            _ => None,
        }
    }

    /// Same operation for another same-domain configuration.
    pub fn with_config(&self, config: Config) -> Self {
        let (tb1, tb2) = self.states_on();
        Self::for_states(tb1, tb2, config)
            .map(|g| g.with_types(self.types.0, self.types.1))
            .unwrap_or(*self)
    }

    /// True when a part in state `s1` relative to the first operand and
    /// `s2` relative to the second is kept.
    pub fn value(&self, s1: State, s2: State) -> bool {
        match (index(s1), index(s2)) {
            (Some(i), Some(j)) => self.table[i][j],
            _ => false,
        }
    }

    /// Overwrite one entry.
    pub fn change_value(&mut self, s1: State, s2: State, b: bool) {
        if let (Some(i), Some(j)) = (index(s1), index(s2)) {
            self.table[i][j] = b;
        }
    }

    /// States relative to the other operand of the parts kept from each
    /// operand's boundary.
    pub fn states_on(&self) -> (State, State) {
        let tb1 = [State::In, State::Out]
            .into_iter()
            .find(|s| self.value(State::On, *s))
            .unwrap_or(State::Unknown);
        let tb2 = [State::In, State::Out]
            .into_iter()
            .find(|s| self.value(*s, State::On))
            .unwrap_or(State::Unknown);
        (tb1, tb2)
    }

    /// True when kept parts of the first operand change orientation.
    pub fn is_to_reverse1(&self) -> bool {
        let (tb1, tb2) = self.states_on();
        reverse(tb1, tb2) && tb1 == State::In
    }

    /// True when kept parts of the second operand change orientation.
    pub fn is_to_reverse2(&self) -> bool {
        let (tb1, tb2) = self.states_on();
        reverse(tb1, tb2) && tb2 == State::In
    }

    /// Reversal flag for parts of the operand of `rank`.
    pub fn is_to_reverse(&self, rank: u8) -> bool {
        if rank == 2 {
            self.is_to_reverse2()
        } else {
            self.is_to_reverse1()
        }
    }

    /// The same operation with the operands swapped.
    pub fn copy_permuted(&self) -> Self {
        let mut table = [[false; 3]; 3];
        for (i, row) in self.table.iter().enumerate() {
            for (j, v) in row.iter().enumerate() {
                table[j][i] = *v;
            }
        }
        Self {
            table,
            types: (self.types.1, self.types.0),
            configs: (self.configs.1, self.configs.0),
        }
    }

    /// True when coincident parts oriented alike are kept.
    pub fn take_common_of_same(&self) -> bool {
        matches!(self.states_on(), (State::Out, State::Out) | (State::In, State::In))
    }

    /// True when coincident parts oriented oppositely are kept.
    pub fn take_common_of_diff(&self) -> bool {
        matches!(self.states_on(), (State::Out, State::In) | (State::In, State::Out))
    }

    /// Types of the operands.
    pub fn types(&self) -> (ShapeType, ShapeType) {
        self.types
    }

    /// Same-domain configurations of the operands.
    pub fn configs(&self) -> (Config, Config) {
        self.configs
    }

    /// Kept (state1, state2) pairs.
    pub fn kept(&self) -> Vec<(State, State)> {
        let mut out = Vec::new();
        for s1 in STATES {
            for s2 in STATES {
                if self.value(s1, s2) {
                    out.push((s1, s2));
                }
            }
        }
        out
    }
}

/// True when parts kept with states `(t1, t2)` change orientation.
pub fn reverse(t1: State, t2: State) -> bool {
    if t1 == State::On && t2 == State::On {
        return false;
    }
    t1 != t2
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fuse_keeps_outside_parts() {
        let g = GTopo::fuse(Config::Unshgeometry);
        assert_eq!(g.kept(), vec![(State::On, State::Out), (State::Out, State::On)]);
        assert_eq!(g.states_on(), (State::Out, State::Out));
        assert!(!g.is_to_reverse1() && !g.is_to_reverse2());
        assert!(g.take_common_of_same());
        assert!(!g.take_common_of_diff());
    }

    #[test]
    fn test_cut_reverses_second() {
        let g = GTopo::cut(Config::Unshgeometry);
        assert_eq!(g.states_on(), (State::Out, State::In));
        assert!(!g.is_to_reverse1());
        assert!(g.is_to_reverse2());
        assert!(g.take_common_of_diff());
        let p = g.copy_permuted();
        assert_eq!(p.states_on(), (State::In, State::Out));
        assert!(p.is_to_reverse1());
        assert!(!p.is_to_reverse2());
        assert_eq!(p.copy_permuted(), g);
    }

    #[test]
    fn test_coincident_entries_follow_take_common() {
        for (tb1, tb2) in [
            (State::Out, State::Out),
            (State::Out, State::In),
            (State::In, State::In),
            (State::In, State::Out),
        ] {
            let base = GTopo::for_states(tb1, tb2, Config::Unshgeometry).unwrap();
            let same = GTopo::for_states(tb1, tb2, Config::SameOriented).unwrap();
            let diff = GTopo::for_states(tb1, tb2, Config::DiffOriented).unwrap();
            assert!(!base.value(State::On, State::On));
            assert_eq!(same.value(State::On, State::On), base.take_common_of_same());
            assert_eq!(diff.value(State::On, State::On), base.take_common_of_diff());
            assert_eq!(base.with_config(Config::SameOriented).kept(), same.kept());
        }
    }

    #[test]
    fn test_common_matrix() {
        let mut g = GTopo::common(Config::SameOriented);
        assert_eq!(g.kept(), vec![(State::In, State::On), (State::On, State::In), (State::On, State::On)]);
        g.change_value(State::On, State::On, false);
        assert!(!g.value(State::On, State::On));
        assert!(!g.value(State::Unknown, State::In));
    }

    #[test]
    fn test_reverse_rule() {
        assert!(!reverse(State::On, State::On));
        assert!(!reverse(State::Out, State::Out));
        assert!(reverse(State::Out, State::In));
        assert!(reverse(State::In, State::On));
    }
}
