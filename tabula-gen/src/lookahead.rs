//! Nullability, FIRST and FOLLOW.
//!
//! All three are monotone fixed points: each pass over the productions may
//! only set flags or append symbols, and iteration stops after a pass that
//! changes nothing. Sets are ordered vectors without duplicates, grown in
//! the order symbols are discovered.

use crate::grammar::{END, Grammar, SymbolId};

/// Appends the members of `src` missing from `dst`; returns whether `dst`
/// grew.
pub(crate) fn union_into(dst: &mut Vec<SymbolId>, src: &[SymbolId]) -> bool {
    let before = dst.len();
    for &symbol in src {
        if !dst.contains(&symbol) {
            dst.push(symbol);
        }
    }
    dst.len() != before
}

impl Grammar {
    /// Fills in `nullable`, `first` and `follows` of every production and
    /// nonterminal.
    pub fn compute_lookaheads(&mut self) {
        self.nullable_sets();
        self.first_sets();
        self.follow_sets();
        log::trace!("lookaheads computed for {} nonterminals", self.nonterminals.len());
    }

    fn nullable_sets(&mut self) {
        let mut changed = true;
        while changed {
            changed = false;
            for p in 0..self.productions.len() {
                if self.productions[p].nullable {
                    continue;
                }
                if self.productions[p]
                    .handle
                    .iter()
                    .all(|&s| self.symbol_nullable(s))
                {
                    self.productions[p].nullable = true;
                    changed = true;
                }
            }
            for nt in self.nonterminals.values_mut() {
                if !nt.nullable
                    && nt
                        .productions
                        .iter()
                        .any(|&p| self.productions[p].nullable)
                {
                    nt.nullable = true;
                    changed = true;
                }
            }
        }
    }

    fn first_sets(&mut self) {
        let mut changed = true;
        while changed {
            changed = false;
            for p in 0..self.productions.len() {
                let first = self.first(&self.productions[p].handle);
                if union_into(&mut self.productions[p].first, &first) {
                    changed = true;
                }
            }
            for i in 0..self.nonterminals.len() {
                let mut first = Vec::new();
                for &p in &self.nonterminals[i].productions {
                    union_into(&mut first, &self.productions[p].first);
                }
                if union_into(&mut self.nonterminals[i].first, &first) {
                    changed = true;
                }
            }
        }
    }

    fn follow_sets(&mut self) {
        if let Some(start) = self.start {
            if let Some(nt) = self.nonterminals.get_mut(&start) {
                union_into(&mut nt.follows, &[END]);
            }
        }
        let mut changed = true;
        while changed {
            changed = false;
            for p in 0..self.productions.len() {
                let lhs = self.productions[p].lhs;
                for i in 0..self.productions[p].handle.len() {
                    let symbol = self.productions[p].handle[i];
                    if !self.is_nonterminal(symbol) {
                        continue;
                    }
                    let rest = &self.productions[p].handle[i + 1..];
                    let mut set = self.first(rest);
                    if self.nullable(rest) {
                        if let Some(parent) = self.nonterminals.get(&lhs) {
                            union_into(&mut set, &parent.follows);
                        }
                    }
                    if let Some(nt) = self.nonterminals.get_mut(&symbol) {
                        if union_into(&mut nt.follows, &set) {
                            changed = true;
                        }
                    }
                }
            }
        }
    }

    fn symbol_nullable(&self, symbol: SymbolId) -> bool {
        self.nonterminals.get(&symbol).is_some_and(|nt| nt.nullable)
    }

    /// Whether every symbol of `sequence` derives the empty string.
    pub fn nullable(&self, sequence: &[SymbolId]) -> bool {
        sequence.iter().all(|&s| self.symbol_nullable(s))
    }

    /// FIRST of a symbol sequence.
    pub fn first(&self, sequence: &[SymbolId]) -> Vec<SymbolId> {
        let mut first = Vec::new();
        for &symbol in sequence {
            match self.nonterminals.get(&symbol) {
                Some(nt) => {
                    union_into(&mut first, &nt.first);
                    if !nt.nullable {
                        break;
                    }
                }
                None => {
                    union_into(&mut first, &[symbol]);
                    break;
                }
            }
        }
        first
    }
}

#[cfg(test)]
mod tests {
    use crate::grammar::{END, Grammar};
    use crate::spec::GrammarSpec;

    fn analyzed(spec: &GrammarSpec) -> Grammar {
        let mut g = Grammar::from_spec(spec).unwrap();
        g.compute_lookaheads();
        g
    }

    fn names(g: &Grammar, set: &[usize]) -> Vec<String> {
        let mut out: Vec<String> = set.iter().map(|&s| g.symbol_name(s).to_owned()).collect();
        out.sort();
        out
    }

    #[test]
    fn nullable_chain() {
        // S -> A; A -> B A | ; B -> | x
        let spec = GrammarSpec::new()
            .rule("S", "A")
            .rule("A", "B A | ")
            .rule("B", " | x");
        let g = analyzed(&spec);
        for name in ["S", "A", "B"] {
            let id = g.symbol_id(name).unwrap();
            assert!(g.nonterminal(id).unwrap().nullable, "{} nullable", name);
        }
        let a = g.symbol_id("A").unwrap();
        assert_eq!(names(&g, &g.nonterminal(a).unwrap().first), ["x"]);
        assert_eq!(names(&g, &g.nonterminal(a).unwrap().follows), ["$end"]);
        let b = g.symbol_id("B").unwrap();
        assert_eq!(names(&g, &g.nonterminal(b).unwrap().follows), ["$end", "x"]);
        assert!(g.nullable(&[]));
        assert!(!g.production(0).nullable);
    }

    #[test]
    fn expression_sets() {
        let spec = GrammarSpec::new()
            .rule("E", "E + T | T")
            .rule("T", "T * F | F")
            .rule("F", "( E ) | id");
        let g = analyzed(&spec);
        let id = |n: &str| g.symbol_id(n).unwrap();
        for n in ["E", "T", "F"] {
            assert_eq!(names(&g, &g.nonterminal(id(n)).unwrap().first), ["(", "id"]);
            assert!(!g.nonterminal(id(n)).unwrap().nullable);
        }
        assert_eq!(names(&g, &g.nonterminal(id("E")).unwrap().follows), ["$end", ")", "+"]);
        assert_eq!(
            names(&g, &g.nonterminal(id("F")).unwrap().follows),
            ["$end", ")", "*", "+"]
        );
        assert_eq!(g.first(&[id("+"), id("E")]), vec![id("+")]);
        assert!(g.nonterminal(id("E")).unwrap().follows.contains(&END));
    }

    #[test]
    fn nullable_production_only_grows_first() {
        let base = GrammarSpec::new().rule("S", "A b").rule("A", "a");
        let g = analyzed(&base);
        let s = g.symbol_id("S").unwrap();
        let before = names(&g, &g.nonterminal(s).unwrap().first);

        let g = analyzed(&base.rule("A", ""));
        let s = g.symbol_id("S").unwrap();
        let after = names(&g, &g.nonterminal(s).unwrap().first);
        assert!(before.iter().all(|n| after.contains(n)));
        assert_eq!(after, ["a", "b"]);
    }

    #[test]
    fn analysis_is_idempotent() {
        let spec = GrammarSpec::new().rule("A", "A x | ");
        let mut g = analyzed(&spec);
        let a = g.symbol_id("A").unwrap();
        let follows = g.nonterminal(a).unwrap().follows.clone();
        g.compute_lookaheads();
        assert_eq!(g.nonterminal(a).unwrap().follows, follows);
        assert_eq!(names(&g, &follows), ["$end", "x"]);
    }
}
