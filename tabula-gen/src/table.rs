//! Action/goto table construction and conflict resolution.
//!
//! Cells are built as candidate lists. A collision between a proposed
//! reduction and what the cell already holds goes through
//! [`resolve_conflict`]; the cell then keeps the chosen action, disappears
//! (nonassoc), or, with `no_default_resolve`, keeps every candidate and is
//! emitted as an [`Action::Ambig`] entry.

use crate::automaton::CanonicalCollection;
use crate::grammar::{Assoc, END, Grammar, SymbolId};
use crate::variant::Variant;
use std::collections::{BTreeMap, BTreeSet};
use tabula::{Action, Row};

/// Outcome of one collision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Solution {
    /// The surviving action; `None` when the cell is removed.
    pub action: Option<Action>,
    pub reduce: Action,
    /// The action that was already in the cell.
    pub shift: Action,
    /// No precedence decided the collision; counts as a conflict.
    pub by_default: bool,
    pub message: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub state: usize,
    pub token: SymbolId,
    pub solution: Solution,
}

#[derive(Debug, Clone, Default)]
pub struct TableBuild {
    pub table: Vec<Row>,
    pub ambigs: Vec<Vec<Action>>,
    pub conflicts: usize,
    pub resolutions: Vec<Resolution>,
    pub conflicted_states: BTreeSet<usize>,
    /// States where a nonassoc operator left an explicit error cell.
    pub error_cells: BTreeSet<usize>,
}

/// Decides between a proposed `reduce` by `production` and the `existing`
/// action on lookahead `token`.
pub fn resolve_conflict(
    grammar: &Grammar,
    production: usize,
    token: SymbolId,
    reduce: Action,
    existing: Action,
) -> Solution {
    let mut solution = Solution {
        action: None,
        reduce,
        shift: existing,
        by_default: false,
        message: "",
    };

    if let Action::Reduce(other) = existing {
        solution.by_default = true;
        solution.message = "Resolved R/R conflict (use first production declared in grammar.)";
        solution.action = Some(Action::Reduce(other.min(production)));
        return solution;
    }

    let precedence = grammar.production(production).precedence;
    let operator = match grammar.operator(token) {
        Some(operator) if precedence != 0 => operator,
        _ => {
            solution.by_default = true;
            solution.message = "Resolved S/R conflict (shift by default.)";
            solution.action = Some(existing);
            return solution;
        }
    };

    if precedence < operator.precedence {
        solution.message = "Resolved S/R conflict (shift for higher precedent operator.)";
        solution.action = Some(existing);
    } else if precedence == operator.precedence {
        match operator.assoc {
            Assoc::Right => {
                solution.message = "Resolved S/R conflict (shift for right associative operator.)";
                solution.action = Some(existing);
            }
            Assoc::Left => {
                solution.message = "Resolved S/R conflict (reduce for left associative operator.)";
                solution.action = Some(reduce);
            }
            Assoc::NonAssoc => {
                solution.message = "Break conflict (nonassoc.)";
                solution.action = None;
            }
        }
    } else {
        solution.message = "Resolved conflict (reduce for higher precedent production.)";
        solution.action = Some(reduce);
    }
    solution
}

/// Builds the action/goto table of an automaton whose lookaheads come from
/// `variant`.
pub fn parse_table(
    grammar: &Grammar,
    states: &CanonicalCollection,
    variant: &dyn Variant,
    no_default_resolve: bool,
) -> TableBuild {
    let mut build = TableBuild::default();
    let mut cells: Vec<BTreeMap<SymbolId, Vec<Action>>> = Vec::with_capacity(states.len());

    for (k, state) in states.iter().enumerate() {
        let mut row: BTreeMap<SymbolId, Vec<Action>> = BTreeMap::new();
        for (&symbol, &target) in &state.edges {
            let action = if grammar.is_nonterminal(symbol) {
                Action::Goto(target)
            } else {
                Action::Shift(target)
            };
            row.insert(symbol, vec![action]);
        }
        if state
            .items()
            .iter()
            .any(|item| item.marked_symbol(grammar) == Some(END))
        {
            row.insert(END, vec![Action::Accept]);
        }

        for &r in &state.reductions {
            let item = &state.items()[r];
            let production = item.production;
            let reduce = Action::Reduce(production);
            for &token in variant.lookaheads(grammar, state, item).iter() {
                let Some(candidates) = row.get_mut(&token) else {
                    row.insert(token, vec![reduce]);
                    continue;
                };
                if candidates.contains(&reduce) {
                    continue;
                }
                let solution = resolve_conflict(grammar, production, token, reduce, candidates[0]);
                if solution.by_default {
                    build.conflicts += 1;
                    build.conflicted_states.insert(k);
                    log::warn!(
                        "Conflict: state {} token {}\n - {}\n - {}",
                        k,
                        grammar.symbol_name(token),
                        describe_action(grammar, solution.reduce),
                        describe_action(grammar, solution.shift)
                    );
                    if no_default_resolve {
                        candidates.push(reduce);
                    } else if let Some(action) = solution.action {
                        *candidates = vec![action];
                    }
                } else {
                    match solution.action {
                        Some(action) => *candidates = vec![action],
                        None => {
                            row.remove(&token);
                            build.error_cells.insert(k);
                        }
                    }
                }
                build.resolutions.push(Resolution {
                    state: k,
                    token,
                    solution,
                });
            }
        }
        cells.push(row);
    }

    if build.conflicts > 0 {
        log::warn!("States with conflicts:");
        for &k in &build.conflicted_states {
            log::warn!(" State {}", k);
            for item in states.states()[k].items() {
                log::warn!("   {}", item.display(grammar));
            }
        }
    }

    for row in cells {
        let mut out = Row::new();
        for (symbol, mut candidates) in row {
            let action = if candidates.len() == 1 {
                candidates.remove(0)
            } else {
                build.ambigs.push(candidates);
                Action::Ambig(build.ambigs.len() - 1)
            };
            out.insert(symbol, action);
        }
        build.table.push(out);
    }
    build
}

/// States whose whole row reduces by a single production. States listed
/// in `error_cells` keep reporting errors on the removed cells and get no
/// default.
pub fn find_defaults(table: &[Row], error_cells: &BTreeSet<usize>) -> BTreeMap<usize, Action> {
    let mut defaults = BTreeMap::new();
    for (state, row) in table.iter().enumerate() {
        if error_cells.contains(&state) {
            continue;
        }
        let mut actions = row.values();
        let Some(&first) = actions.next() else {
            continue;
        };
        if matches!(first, Action::Reduce(_)) && actions.all(|&a| a == first) {
            defaults.insert(state, first);
        }
    }
    defaults
}

pub fn describe_action(grammar: &Grammar, action: Action) -> String {
    match action {
        Action::Shift(state) => format!("shift token (then go to state {})", state),
        Action::Reduce(production) => {
            format!("reduce by rule: {}", grammar.display_production(production))
        }
        Action::Accept => "accept".to_owned(),
        Action::Goto(state) => format!("go to state {}", state),
        Action::Ambig(id) => format!("ambiguous (candidates #{})", id),
    }
}
