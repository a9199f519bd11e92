//! LR items, item sets and the canonical collection.
//!
//! An [`Item`] is a production with a dot marking how much of its handle has
//! been recognized, plus the lookahead terminals it may be reduced on. Item
//! sets are the states of the LR automaton. The collection is built
//! breadth-first from the closure of `$accept -> . start $end`, so state
//! numbering only depends on the grammar.
//!
//! The closure itself is supplied by a [`Variant`]; this module provides the
//! two closure flavors variants pick from ([`core_closure`] and
//! [`lookahead_closure`]).

use crate::grammar::{END, Grammar, SymbolId};
use crate::lookahead::union_into;
use crate::variant::Variant;
use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};
use std::io::{self, Write};

/// How items are told apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemIdentity {
    /// Production and dot position (LR(0), SLR(1), LALR(1)).
    Core,
    /// Production, dot position and sorted lookahead set (canonical LR(1)).
    Lookahead,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemKey {
    pub production: usize,
    pub dot: usize,
    pub lookahead: Vec<SymbolId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub production: usize,
    pub dot: usize,
    pub follows: Vec<SymbolId>,
    /// Index of the item this one was advanced from, in the predecessor
    /// state.
    pub predecessor: Option<usize>,
}

impl Item {
    pub fn new(production: usize, dot: usize, follows: Vec<SymbolId>) -> Self {
        Self {
            production,
            dot,
            follows,
            predecessor: None,
        }
    }

    /// The symbol right after the dot, `None` for a completed item.
    #[inline]
    pub fn marked_symbol(&self, grammar: &Grammar) -> Option<SymbolId> {
        grammar.production(self.production).handle.get(self.dot).copied()
    }

    /// Handle symbols after the marked symbol.
    pub fn remaining_handle<'g>(&self, grammar: &'g Grammar) -> &'g [SymbolId] {
        let handle = &grammar.production(self.production).handle;
        handle.get(self.dot + 1..).unwrap_or(&[])
    }

    pub fn key(&self, identity: ItemIdentity) -> ItemKey {
        let lookahead = match identity {
            ItemIdentity::Core => Vec::new(),
            ItemIdentity::Lookahead => {
                let mut sorted = self.follows.clone();
                sorted.sort_unstable();
                sorted.dedup();
                sorted
            }
        };
        ItemKey {
            production: self.production,
            dot: self.dot,
            lookahead,
        }
    }

    /// `A -> b . c #lookaheads= x y`
    pub fn display(&self, grammar: &Grammar) -> String {
        let production = grammar.production(self.production);
        let mut out = format!("{} ->", grammar.symbol_name(production.lhs));
        for (i, &symbol) in production.handle.iter().enumerate() {
            if i == self.dot {
                out.push_str(" .");
            }
            out.push(' ');
            out.push_str(grammar.symbol_name(symbol));
        }
        if self.dot == production.handle.len() {
            out.push_str(" .");
        }
        if !self.follows.is_empty() {
            out.push_str(" #lookaheads=");
            for &f in &self.follows {
                out.push(' ');
                out.push_str(grammar.symbol_name(f));
            }
        }
        out
    }
}

/// An automaton state.
#[derive(Debug, Clone)]
pub struct ItemSet {
    identity: ItemIdentity,
    items: Vec<Item>,
    index: HashSet<ItemKey>,
    /// Indices of the completed items.
    pub reductions: Vec<usize>,
    /// Some item has a terminal after its dot.
    pub shifts: bool,
    /// Two reductions, or a reduction next to a shift.
    pub inadequate: bool,
    /// Successor state per symbol.
    pub edges: IndexMap<SymbolId, usize>,
    /// LALR bookkeeping: auxiliary nonterminals reducing here, per
    /// production id.
    pub goes: IndexMap<usize, Vec<SymbolId>>,
    /// States with an edge into this one, per symbol.
    pub predecessors: IndexMap<SymbolId, Vec<usize>>,
}

impl ItemSet {
    pub fn new(identity: ItemIdentity) -> Self {
        Self {
            identity,
            items: Vec::new(),
            index: HashSet::new(),
            reductions: Vec::new(),
            shifts: false,
            inadequate: false,
            edges: IndexMap::new(),
            goes: IndexMap::new(),
            predecessors: IndexMap::new(),
        }
    }

    pub fn contains(&self, item: &Item) -> bool {
        self.index.contains(&item.key(self.identity))
    }

    pub fn contains_key(&self, key: &ItemKey) -> bool {
        self.index.contains(key)
    }

    /// Adds `item` unless an identical one is present; returns whether it
    /// was added.
    pub fn push(&mut self, item: Item, grammar: &Grammar) -> bool {
        if !self.index.insert(item.key(self.identity)) {
            return false;
        }
        match item.marked_symbol(grammar) {
            None => self.reductions.push(self.items.len()),
            Some(symbol) if !grammar.is_nonterminal(symbol) => self.shifts = true,
            Some(_) => {}
        }
        self.inadequate =
            self.reductions.len() > 1 || (self.shifts && !self.reductions.is_empty());
        self.items.push(item);
        true
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    /// Lookahead sets may be extended in place; identities must not change.
    pub fn items_mut(&mut self) -> &mut [Item] {
        &mut self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Order-independent identity of the whole set.
    pub fn canonical_key(&self) -> Vec<ItemKey> {
        let mut keys: Vec<ItemKey> = self.index.iter().cloned().collect();
        keys.sort_unstable();
        keys
    }
}

/// Closure over item cores: dot-0 items carry no lookahead.
pub fn core_closure(grammar: &Grammar, kernel: Vec<Item>, identity: ItemIdentity) -> ItemSet {
    let mut set = ItemSet::new(identity);
    let mut expanded: HashSet<SymbolId> = HashSet::new();
    let mut frontier = kernel;
    while !frontier.is_empty() {
        let mut next = Vec::new();
        let mut queued = HashSet::new();
        for item in &frontier {
            set.push(item.clone(), grammar);
        }
        for item in &frontier {
            let Some(symbol) = item.marked_symbol(grammar) else {
                continue;
            };
            let Some(nt) = grammar.nonterminal(symbol) else {
                continue;
            };
            if !expanded.insert(symbol) {
                continue;
            }
            for &p in &nt.productions {
                let fresh = Item::new(p, 0, Vec::new());
                let key = fresh.key(identity);
                if !set.contains_key(&key) && queued.insert(key) {
                    next.push(fresh);
                }
            }
        }
        frontier = next;
    }
    set
}

/// Closure computing a lookahead per item: FIRST of what follows the
/// marked nonterminal, plus the parent's lookahead when that remainder can
/// vanish.
pub fn lookahead_closure(grammar: &Grammar, kernel: Vec<Item>) -> ItemSet {
    let identity = ItemIdentity::Lookahead;
    let mut set = ItemSet::new(identity);
    let mut frontier = kernel;
    while !frontier.is_empty() {
        let mut next = Vec::new();
        let mut queued = HashSet::new();
        for item in &frontier {
            set.push(item.clone(), grammar);
        }
        for item in &frontier {
            let Some(symbol) = item.marked_symbol(grammar) else {
                continue;
            };
            let Some(nt) = grammar.nonterminal(symbol) else {
                continue;
            };
            let rest = item.remaining_handle(grammar);
            let mut lookahead = grammar.first(rest);
            if lookahead.is_empty() || grammar.nullable(rest) {
                union_into(&mut lookahead, &item.follows);
            }
            for &p in &nt.productions {
                let fresh = Item::new(p, 0, lookahead.clone());
                let key = fresh.key(identity);
                if !set.contains_key(&key) && queued.insert(key) {
                    next.push(fresh);
                }
            }
        }
        frontier = next;
    }
    set
}

/// Advances the dot over `symbol` and closes the result.
pub fn goto(grammar: &Grammar, variant: &dyn Variant, state: &ItemSet, symbol: SymbolId) -> ItemSet {
    let kernel: Vec<Item> = state
        .items()
        .iter()
        .enumerate()
        .filter(|(_, item)| item.marked_symbol(grammar) == Some(symbol))
        .map(|(i, item)| Item {
            production: item.production,
            dot: item.dot + 1,
            follows: item.follows.clone(),
            predecessor: Some(i),
        })
        .collect();
    if kernel.is_empty() {
        return ItemSet::new(variant.identity());
    }
    variant.closure(grammar, kernel)
}

/// The states of the LR automaton, numbered in discovery order.
#[derive(Debug, Clone)]
pub struct CanonicalCollection {
    states: Vec<ItemSet>,
    index: HashMap<Vec<ItemKey>, usize>,
}

impl CanonicalCollection {
    pub fn build(grammar: &Grammar, variant: &dyn Variant) -> Self {
        let start = variant.closure(grammar, vec![Item::new(0, 0, vec![END])]);
        let mut collection = Self {
            index: HashMap::from([(start.canonical_key(), 0)]),
            states: vec![start],
        };

        let mut marked = 0;
        while marked < collection.states.len() {
            let mut symbols: Vec<SymbolId> = Vec::new();
            for item in collection.states[marked].items() {
                if let Some(symbol) = item.marked_symbol(grammar) {
                    if symbol != END && !symbols.contains(&symbol) {
                        symbols.push(symbol);
                    }
                }
            }
            for symbol in symbols {
                let next = goto(grammar, variant, &collection.states[marked], symbol);
                if next.is_empty() {
                    continue;
                }
                collection.link(marked, symbol, next);
            }
            marked += 1;
        }
        log::debug!("{}: {} states", variant.name(), collection.states.len());
        collection
    }

    fn link(&mut self, from: usize, symbol: SymbolId, next: ItemSet) {
        let key = next.canonical_key();
        let target = match self.index.get(&key) {
            Some(&existing) => existing,
            None => {
                let id = self.states.len();
                self.index.insert(key, id);
                self.states.push(next);
                id
            }
        };
        self.states[from].edges.insert(symbol, target);
        self.states[target]
            .predecessors
            .entry(symbol)
            .or_default()
            .push(from);
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn states(&self) -> &[ItemSet] {
        &self.states
    }

    pub fn get(&self, state: usize) -> Option<&ItemSet> {
        self.states.get(state)
    }

    pub(crate) fn states_mut(&mut self) -> &mut [ItemSet] {
        &mut self.states
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ItemSet> {
        self.states.iter()
    }
}

/// Writes every state with its items and edges.
///
/// # Output Format
/// ```text
/// CS,<number of states>
///
/// C,<state>,<lhs> -> <handle with dot> [#lookaheads= ...]
/// E,<state>,<symbol>,<successor>
/// ```
pub fn write_states<W: Write>(
    out: &mut W,
    collection: &CanonicalCollection,
    grammar: &Grammar,
) -> io::Result<()> {
    writeln!(out, "CS,{}\n", collection.len())?;
    for (i, state) in collection.iter().enumerate() {
        for item in state.items() {
            writeln!(out, "C,{},{}", i, item.display(grammar))?;
        }
        for (&symbol, &target) in &state.edges {
            writeln!(out, "E,{},{},{}", i, grammar.symbol_name(symbol), target)?;
        }
        writeln!(out)?;
    }
    Ok(())
}
