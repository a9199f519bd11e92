//! Parse tables: the only artifact the runtime needs from the generator.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use smartstring::alias::String;
use std::collections::BTreeMap;

/// Symbol id of the synthetic start nonterminal.
pub const ACCEPT: usize = 0;
/// Symbol id of the end-of-input terminal.
pub const END: usize = 1;
/// Symbol id of the error-recovery terminal.
pub const ERROR: usize = 2;

/// One action table cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Action {
    Accept,
    Shift(usize),
    Reduce(usize),
    Goto(usize),
    /// Index into [`ParseTables::ambigs`]; a cell left with several
    /// candidates.
    Ambig(usize),
}

/// Lhs symbol and handle length of a production.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    pub lhs: usize,
    pub arity: usize,
}

/// Symbol id to action, for one state.
pub type Row = BTreeMap<usize, Action>;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseTables {
    pub table: Vec<Row>,
    pub ambigs: Vec<Vec<Action>>,
    pub default_actions: BTreeMap<usize, Action>,
    /// Indexed by production id; entry 0 is `$accept -> start $end`.
    pub productions: Vec<Rule>,
    pub symbols: IndexMap<String, usize>,
    pub terminals: BTreeMap<usize, String>,
}

impl ParseTables {
    /// Assembles tables from the constants of an emitted parser module.
    pub fn from_static(
        table: &[&[(usize, Action)]],
        ambigs: &[&[Action]],
        default_actions: &[(usize, Action)],
        productions: &[Rule],
        symbols: &[(&str, usize)],
        terminals: &[(usize, &str)],
    ) -> Self {
        Self {
            table: table.iter().map(|row| row.iter().copied().collect()).collect(),
            ambigs: ambigs.iter().map(|cell| cell.to_vec()).collect(),
            default_actions: default_actions.iter().copied().collect(),
            productions: productions.to_vec(),
            symbols: symbols.iter().map(|&(name, id)| (name.into(), id)).collect(),
            terminals: terminals.iter().map(|&(id, name)| (id, name.into())).collect(),
        }
    }

    #[inline]
    pub fn lookup(&self, state: usize, symbol: usize) -> Option<Action> {
        self.table.get(state)?.get(&symbol).copied()
    }

    #[inline]
    pub fn default_action(&self, state: usize) -> Option<Action> {
        self.default_actions.get(&state).copied()
    }

    pub fn ambiguity(&self, id: usize) -> &[Action] {
        self.ambigs.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn symbol_id(&self, name: &str) -> Option<usize> {
        self.symbols.get(name).copied()
    }

    pub fn terminal_name(&self, id: usize) -> Option<&str> {
        self.terminals.get(&id).map(|name| name.as_str())
    }

    pub fn state_count(&self) -> usize {
        self.table.len()
    }

    /// Names of the terminals `state` has an action for, `error` and
    /// `$end` excluded.
    pub fn expected(&self, state: usize) -> Vec<String> {
        let Some(row) = self.table.get(state) else {
            return Vec::new();
        };
        row.keys()
            .filter(|&&symbol| symbol > ERROR)
            .filter_map(|symbol| self.terminals.get(symbol).cloned())
            .collect()
    }

    pub fn to_json(&self) -> serde_json::Result<std::string::String> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ParseTables {
        const ROW_0: &[(usize, Action)] = &[(3, Action::Goto(1)), (4, Action::Shift(2))];
        const ROW_1: &[(usize, Action)] = &[(1, Action::Accept)];
        const ROW_2: &[(usize, Action)] = &[(1, Action::Reduce(1))];
        ParseTables::from_static(
            &[ROW_0, ROW_1, ROW_2],
            &[],
            &[(2, Action::Reduce(1))],
            &[Rule { lhs: 0, arity: 2 }, Rule { lhs: 3, arity: 1 }],
            &[("$accept", 0), ("$end", 1), ("error", 2), ("S", 3), ("x", 4)],
            &[(1, "$end"), (2, "error"), (4, "x")],
        )
    }

    #[test]
    fn lookup_and_defaults() {
        let tables = sample();
        assert_eq!(tables.state_count(), 3);
        assert_eq!(tables.lookup(0, 4), Some(Action::Shift(2)));
        assert_eq!(tables.lookup(0, 1), None);
        assert_eq!(tables.lookup(9, 1), None);
        assert_eq!(tables.default_action(2), Some(Action::Reduce(1)));
        assert_eq!(tables.symbol_id("x"), Some(4));
        assert_eq!(tables.terminal_name(1), Some("$end"));
        assert_eq!(tables.expected(0), vec![String::from("x")]);
        assert!(tables.ambiguity(0).is_empty());
    }

    #[test]
    fn json_round_trip() {
        let tables = sample();
        let json = tables.to_json().unwrap();
        let back = ParseTables::from_json(&json).unwrap();
        assert_eq!(back, tables);
        assert_eq!(back.symbols.get_index(3).map(|(k, _)| k.as_str()), Some("S"));
    }
}
