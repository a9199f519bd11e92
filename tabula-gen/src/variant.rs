//! Algorithm variants: closure and lookahead policies over the shared
//! automaton builder.

use crate::automaton::{
    CanonicalCollection, Item, ItemIdentity, ItemSet, core_closure, lookahead_closure,
};
use crate::generator::{Algorithm, GeneratorOptions};
use crate::grammar::{Grammar, SymbolId};
use crate::lalr::Lalr;
use std::borrow::Cow;

pub trait Variant {
    fn name(&self) -> &'static str;

    fn identity(&self) -> ItemIdentity {
        ItemIdentity::Core
    }

    fn closure(&self, grammar: &Grammar, kernel: Vec<Item>) -> ItemSet;

    /// Terminals on which the completed `item` of `state` reduces.
    fn lookaheads<'a>(
        &'a self,
        grammar: &'a Grammar,
        state: &'a ItemSet,
        item: &'a Item,
    ) -> Cow<'a, [SymbolId]>;

    /// Runs once the canonical collection is complete.
    fn after_collection(&mut self, grammar: &Grammar, states: &mut CanonicalCollection) {
        let _ = (grammar, states);
    }
}

impl<V: Variant + ?Sized> Variant for Box<V> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn identity(&self) -> ItemIdentity {
        (**self).identity()
    }

    fn closure(&self, grammar: &Grammar, kernel: Vec<Item>) -> ItemSet {
        (**self).closure(grammar, kernel)
    }

    fn lookaheads<'a>(
        &'a self,
        grammar: &'a Grammar,
        state: &'a ItemSet,
        item: &'a Item,
    ) -> Cow<'a, [SymbolId]> {
        (**self).lookaheads(grammar, state, item)
    }

    fn after_collection(&mut self, grammar: &Grammar, states: &mut CanonicalCollection) {
        (**self).after_collection(grammar, states)
    }
}

/// Reduces on every terminal.
pub struct Lr0;

impl Variant for Lr0 {
    fn name(&self) -> &'static str {
        "LR(0)"
    }

    fn closure(&self, grammar: &Grammar, kernel: Vec<Item>) -> ItemSet {
        core_closure(grammar, kernel, ItemIdentity::Core)
    }

    fn lookaheads<'a>(
        &'a self,
        grammar: &'a Grammar,
        _state: &'a ItemSet,
        _item: &'a Item,
    ) -> Cow<'a, [SymbolId]> {
        Cow::Owned(grammar.terminals())
    }
}

/// Reduces on FOLLOW of the production's lhs.
pub struct Slr;

impl Variant for Slr {
    fn name(&self) -> &'static str {
        "SLR(1)"
    }

    fn closure(&self, grammar: &Grammar, kernel: Vec<Item>) -> ItemSet {
        core_closure(grammar, kernel, ItemIdentity::Core)
    }

    fn lookaheads<'a>(
        &'a self,
        grammar: &'a Grammar,
        _state: &'a ItemSet,
        item: &'a Item,
    ) -> Cow<'a, [SymbolId]> {
        let lhs = grammar.production(item.production).lhs;
        match grammar.nonterminal(lhs) {
            Some(nt) => Cow::Borrowed(nt.follows.as_slice()),
            None => Cow::Owned(Vec::new()),
        }
    }
}

/// Canonical LR(1): items carry and are distinguished by their lookahead.
pub struct Lr1;

impl Variant for Lr1 {
    fn name(&self) -> &'static str {
        "Canonical LR(1)"
    }

    fn identity(&self) -> ItemIdentity {
        ItemIdentity::Lookahead
    }

    fn closure(&self, grammar: &Grammar, kernel: Vec<Item>) -> ItemSet {
        lookahead_closure(grammar, kernel)
    }

    fn lookaheads<'a>(
        &'a self,
        _grammar: &'a Grammar,
        _state: &'a ItemSet,
        item: &'a Item,
    ) -> Cow<'a, [SymbolId]> {
        Cow::Borrowed(item.follows.as_slice())
    }
}

/// Logs every closure and lookahead query of the wrapped variant.
pub struct Traced<V> {
    inner: V,
}

impl<V: Variant> Traced<V> {
    pub fn new(inner: V) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> V {
        self.inner
    }
}

impl<V: Variant> Variant for Traced<V> {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    fn identity(&self) -> ItemIdentity {
        self.inner.identity()
    }

    fn closure(&self, grammar: &Grammar, kernel: Vec<Item>) -> ItemSet {
        let kernel_len = kernel.len();
        let set = self.inner.closure(grammar, kernel);
        log::trace!(
            "{} closure: {} kernel items -> {} items, {} reductions{}",
            self.inner.name(),
            kernel_len,
            set.len(),
            set.reductions.len(),
            if set.inadequate { ", inadequate" } else { "" }
        );
        set
    }

    fn lookaheads<'a>(
        &'a self,
        grammar: &'a Grammar,
        state: &'a ItemSet,
        item: &'a Item,
    ) -> Cow<'a, [SymbolId]> {
        let terms = self.inner.lookaheads(grammar, state, item);
        if log::log_enabled!(log::Level::Trace) {
            let names: Vec<&str> = terms.iter().map(|&t| grammar.symbol_name(t)).collect();
            log::trace!("lookaheads of [{}]: {:?}", item.display(grammar), names);
        }
        terms
    }

    fn after_collection(&mut self, grammar: &Grammar, states: &mut CanonicalCollection) {
        log::trace!("{} post-construction over {} states", self.inner.name(), states.len());
        self.inner.after_collection(grammar, states)
    }
}

/// The variant implementing an LR algorithm, wrapped in [`Traced`] when
/// debugging. Returns `None` for LL(1), which builds no automaton.
pub fn variant_for(options: &GeneratorOptions) -> Option<Box<dyn Variant>> {
    let variant: Box<dyn Variant> = match options.algorithm {
        Algorithm::Lr0 => Box::new(Lr0),
        Algorithm::Slr => Box::new(Slr),
        Algorithm::Lalr => Box::new(Lalr::new(options.on_demand_lookahead)),
        Algorithm::Lr => Box::new(Lr1),
        Algorithm::Ll => return None,
    };
    Some(if options.debug {
        Box::new(Traced::new(variant))
    } else {
        variant
    })
}
