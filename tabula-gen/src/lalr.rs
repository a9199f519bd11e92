//! LALR(1) lookaheads by way of an auxiliary grammar.
//!
//! After the LR(0) automaton is built, every dot-0 item `A -> . X Y` of
//! state `q` becomes a production `q:A -> q:X r:Y` of a new grammar, where
//! each pseudo-symbol names the state the handle walk is in when it reads
//! the symbol. FOLLOW sets of that grammar, mapped back from pseudo
//! terminals to real ones, are exactly the LALR(1) lookaheads of the
//! matching reductions: the `q:A` pseudo-nonterminals that reduce in state
//! `s` by production `p` are listed in `goes[p]` of `s`.

use crate::automaton::{CanonicalCollection, Item, ItemIdentity, ItemSet, core_closure};
use crate::grammar::{Grammar, SymbolId};
use crate::lookahead::union_into;
use crate::variant::Variant;
use std::borrow::Cow;
use std::collections::HashMap;

/// The derived grammar with the map from its symbols back to the real ones.
#[derive(Debug, Clone)]
pub struct AuxiliaryGrammar {
    pub grammar: Grammar,
    pub originals: HashMap<SymbolId, SymbolId>,
}

impl AuxiliaryGrammar {
    /// Follows each state's dot-0 items along the automaton and records the
    /// resulting productions.
    pub fn build(grammar: &Grammar, states: &mut CanonicalCollection) -> Self {
        let mut aux = Grammar::unaugmented();
        let mut originals = HashMap::new();

        for (q, state) in states.iter().enumerate() {
            for item in state.items().iter().filter(|item| item.dot == 0) {
                let lhs = grammar.production(item.production).lhs;
                let id = aux.intern(&pseudo_name(grammar, q, lhs));
                aux.declare_nonterminal(id);
                originals.insert(id, lhs);
            }
        }

        for q in 0..states.len() {
            let seeds: Vec<usize> = states.states()[q]
                .items()
                .iter()
                .filter(|item| item.dot == 0)
                .map(|item| item.production)
                .collect();
            for production in seeds {
                let lhs = grammar.production(production).lhs;
                let Some(aux_lhs) = aux.symbol_id(&pseudo_name(grammar, q, lhs)) else {
                    continue;
                };
                let mut path = Vec::new();
                let mut at = q;
                for &symbol in &grammar.production(production).handle {
                    let id = aux.intern(&pseudo_name(grammar, at, symbol));
                    originals.insert(id, symbol);
                    path.push(id);
                    at = states.states()[at].edges.get(&symbol).copied().unwrap_or(at);
                }
                aux.push_production(aux_lhs, path);
                states.states_mut()[at]
                    .goes
                    .entry(production)
                    .or_default()
                    .push(aux_lhs);
            }
        }

        log::debug!(
            "auxiliary grammar: {} symbols, {} productions",
            aux.symbols().len(),
            aux.productions().len()
        );
        Self {
            grammar: aux,
            originals,
        }
    }

    /// Real terminals following pseudo-nonterminal `symbol`.
    pub fn follows(&self, symbol: SymbolId) -> Vec<SymbolId> {
        self.grammar
            .nonterminal(symbol)
            .map(|nt| {
                nt.follows
                    .iter()
                    .filter_map(|f| self.originals.get(f).copied())
                    .collect()
            })
            .unwrap_or_default()
    }
}

fn pseudo_name(grammar: &Grammar, state: usize, symbol: SymbolId) -> String {
    format!("{}:{}", state, grammar.symbol_name(symbol))
}

/// LALR(1), optionally computing lookaheads only where LR(0) is not enough.
pub struct Lalr {
    on_demand: bool,
    auxiliary: Option<AuxiliaryGrammar>,
}

impl Lalr {
    pub fn new(on_demand: bool) -> Self {
        Self {
            on_demand,
            auxiliary: None,
        }
    }

    pub fn auxiliary(&self) -> Option<&AuxiliaryGrammar> {
        self.auxiliary.as_ref()
    }

    fn union_lookaheads(&self, aux: &AuxiliaryGrammar, state: &mut ItemSet) {
        for r in state.reductions.clone() {
            let production = state.items()[r].production;
            let Some(sources) = state.goes.get(&production).cloned() else {
                continue;
            };
            let mut follows = state.items()[r].follows.clone();
            for source in sources {
                union_into(&mut follows, &aux.follows(source));
            }
            state.items_mut()[r].follows = follows;
        }
    }
}

impl Variant for Lalr {
    fn name(&self) -> &'static str {
        "LALR(1)"
    }

    fn closure(&self, grammar: &Grammar, kernel: Vec<Item>) -> ItemSet {
        core_closure(grammar, kernel, ItemIdentity::Core)
    }

    fn lookaheads<'a>(
        &'a self,
        grammar: &'a Grammar,
        state: &'a ItemSet,
        item: &'a Item,
    ) -> Cow<'a, [SymbolId]> {
        if self.on_demand && !state.inadequate {
            Cow::Owned(grammar.terminals())
        } else {
            Cow::Borrowed(item.follows.as_slice())
        }
    }

    fn after_collection(&mut self, grammar: &Grammar, states: &mut CanonicalCollection) {
        let mut aux = AuxiliaryGrammar::build(grammar, states);
        aux.grammar.compute_lookaheads();
        for state in states.states_mut() {
            if self.on_demand && !state.inadequate {
                continue;
            }
            self.union_lookaheads(&aux, state);
        }
        self.auxiliary = Some(aux);
    }
}
