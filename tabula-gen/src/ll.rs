//! LL(1) prediction table.

use crate::grammar::{Grammar, SymbolId};
use crate::lookahead::union_into;
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::BTreeMap;

/// For every nonterminal, the productions predicted by each lookahead
/// terminal. Cells listing more than one production are conflicts; they
/// are counted and left as they are.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LlTable {
    pub rows: IndexMap<SymbolId, BTreeMap<SymbolId, Vec<usize>>>,
    pub conflicts: usize,
}

impl LlTable {
    pub fn build(grammar: &Grammar) -> Self {
        let mut table = LlTable::default();
        for production in grammar.productions() {
            let mut tokens = production.first.clone();
            if grammar.nullable(&production.handle) {
                if let Some(nt) = grammar.nonterminal(production.lhs) {
                    union_into(&mut tokens, &nt.follows);
                }
            }
            let row = table.rows.entry(production.lhs).or_default();
            for token in tokens {
                let cell = row.entry(token).or_default();
                if !cell.is_empty() {
                    table.conflicts += 1;
                    log::warn!(
                        "LL(1) conflict on {} for {}: productions {:?} and {}",
                        grammar.symbol_name(token),
                        grammar.symbol_name(production.lhs),
                        cell,
                        production.id
                    );
                }
                cell.push(production.id);
            }
        }
        log::debug!("LL(1): {} rows, {} conflicts", table.rows.len(), table.conflicts);
        table
    }

    pub fn predict(&self, nonterminal: SymbolId, token: SymbolId) -> &[usize] {
        self.rows
            .get(&nonterminal)
            .and_then(|row| row.get(&token))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}
