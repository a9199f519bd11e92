//! The normalized grammar: interned symbols, productions and nonterminals.
//!
//! [`Grammar::from_spec`] turns a [`GrammarSpec`] into productions over
//! integer symbol ids and augments it with `$accept -> start $end` as
//! production 0. Ids 0, 1 and 2 always belong to `$accept`, `$end` and
//! `error`; every other symbol gets the next id the first time it is seen,
//! walking the rules in declaration order (lhs first, then handle symbols).
//!
//! Nullability, FIRST and FOLLOW are filled in later by
//! [`Grammar::compute_lookaheads`](crate::lookahead).

use crate::actions::{self, ActionGroups, HandleSymbol};
use crate::error::GrammarError;
use crate::spec::GrammarSpec;
use crate::symtab::Symtab;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use smartstring::alias::String;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

pub use tabula::{ACCEPT, END, ERROR};

pub type SymbolId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Assoc {
    Left,
    Right,
    NonAssoc,
}

impl FromStr for Assoc {
    type Err = GrammarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "left" => Ok(Assoc::Left),
            "right" => Ok(Assoc::Right),
            "nonassoc" => Ok(Assoc::NonAssoc),
            other => Err(GrammarError::UnknownAssoc(other.into())),
        }
    }
}

impl fmt::Display for Assoc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Assoc::Left => "left",
            Assoc::Right => "right",
            Assoc::NonAssoc => "nonassoc",
        })
    }
}

/// Precedence level (1 = loosest) and associativity of an operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Operator {
    pub precedence: u32,
    pub assoc: Assoc,
}

#[derive(Debug, Clone)]
pub struct Production {
    pub id: usize,
    pub lhs: SymbolId,
    pub handle: Vec<SymbolId>,
    pub nullable: bool,
    pub first: Vec<SymbolId>,
    /// 0 when the production has no precedence.
    pub precedence: u32,
    /// Index of the production's action group, if it has an action.
    pub action: Option<usize>,
}

impl Production {
    fn new(id: usize, lhs: SymbolId, handle: Vec<SymbolId>) -> Self {
        Self {
            id,
            lhs,
            handle,
            nullable: false,
            first: Vec::new(),
            precedence: 0,
            action: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Nonterminal {
    pub symbol: SymbolId,
    /// Ids of the productions headed by this nonterminal.
    pub productions: Vec<usize>,
    pub first: Vec<SymbolId>,
    pub follows: Vec<SymbolId>,
    pub nullable: bool,
}

impl Nonterminal {
    fn new(symbol: SymbolId) -> Self {
        Self {
            symbol,
            productions: Vec::new(),
            first: Vec::new(),
            follows: Vec::new(),
            nullable: false,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Grammar {
    pub(crate) symbols: Symtab,
    pub(crate) nonterminals: IndexMap<SymbolId, Nonterminal>,
    pub(crate) productions: Vec<Production>,
    /// User start symbol; `None` for grammars that are not augmented.
    pub(crate) start: Option<SymbolId>,
    pub(crate) operators: HashMap<SymbolId, Operator>,
    pub(crate) actions: ActionGroups,
    pub(crate) has_error_recovery: bool,
    pub(crate) lex: Option<serde_json::Value>,
    pub(crate) action_include: Option<std::string::String>,
    pub(crate) module_include: Option<std::string::String>,
    pub(crate) parse_params: Vec<String>,
}

impl Grammar {
    /// Normalizes and augments a grammar specification.
    pub fn from_spec(spec: &GrammarSpec) -> Result<Self, GrammarError> {
        let mut grammar = Grammar::default();
        for reserved in ["$accept", "$end", "error"] {
            grammar.symbols.add(reserved);
        }

        let mut by_name: HashMap<String, Operator> = HashMap::new();
        for (i, group) in spec.operators.iter().enumerate() {
            let Some((assoc, names)) = group.split_first() else {
                return Err(GrammarError::EmptyOperatorGroup(i));
            };
            let operator = Operator {
                precedence: i as u32 + 1,
                assoc: assoc.parse()?,
            };
            for name in names {
                by_name.insert(name.clone(), operator);
            }
        }

        let nonterminal_names: HashSet<&str> = spec.bnf.keys().map(|k| k.as_str()).collect();
        let mut productions = Vec::new();
        for (lhs_name, rules) in &spec.bnf {
            let lhs = grammar.symbols.add(lhs_name);
            grammar
                .nonterminals
                .entry(lhs)
                .or_insert_with(|| Nonterminal::new(lhs));
            for alternative in rules.alternatives() {
                let tagged: Vec<HandleSymbol> = alternative
                    .handle
                    .symbols()
                    .iter()
                    .map(|token| HandleSymbol::parse(token))
                    .collect();
                let mut handle = Vec::with_capacity(tagged.len());
                for symbol in &tagged {
                    if symbol.name == "$accept" || symbol.name == "$end" {
                        return Err(GrammarError::MalformedAlternative {
                            lhs: lhs_name.clone(),
                            reason: format!("reserved symbol '{}' in handle", symbol.name)
                                .as_str()
                                .into(),
                        });
                    }
                    if symbol.name == "error" {
                        grammar.has_error_recovery = true;
                    }
                    handle.push(grammar.symbols.add(&symbol.name));
                }

                let id = productions.len() + 1;
                let mut production = Production::new(id, lhs, handle);
                production.precedence = alternative
                    .prec
                    .as_ref()
                    .and_then(|op| by_name.get(op))
                    .or_else(|| {
                        tagged
                            .iter()
                            .rev()
                            .filter(|s| !nonterminal_names.contains(s.name.as_str()))
                            .find_map(|s| by_name.get(&s.name))
                    })
                    .map_or(0, |o| o.precedence);
                if let Some(source) = &alternative.action {
                    let rewritten = actions::rewrite(source, &tagged);
                    production.action = Some(grammar.actions.insert(rewritten, id));
                }
                if let Some(nt) = grammar.nonterminals.get_mut(&lhs) {
                    nt.productions.push(id);
                }
                productions.push(production);
            }
        }

        let Some(first) = productions.first() else {
            return Err(GrammarError::NoProductions);
        };
        let start_name: String = match &spec.start {
            Some(name) => name.clone(),
            None => grammar.symbol_name(first.lhs).into(),
        };
        let start = match grammar.symbols.idx(&start_name) {
            Some(id) if grammar.nonterminals.contains_key(&id) => id,
            _ => return Err(GrammarError::UnknownStart(start_name)),
        };

        for (name, operator) in by_name {
            if let Some(id) = grammar.symbols.idx(&name) {
                grammar.operators.insert(id, operator);
            }
        }

        let mut accept = Nonterminal::new(ACCEPT);
        accept.productions.push(0);
        grammar.nonterminals.insert(ACCEPT, accept);
        productions.insert(0, Production::new(0, ACCEPT, vec![start, END]));
        grammar.productions = productions;
        grammar.start = Some(start);

        grammar.lex = spec.lex.clone();
        grammar.action_include = spec.action_include.clone();
        grammar.module_include = spec.module_include.clone();
        grammar.parse_params = spec.parse_params.clone();

        log::debug!(
            "grammar: {} symbols, {} nonterminals, {} productions",
            grammar.symbols.len(),
            grammar.nonterminals.len(),
            grammar.productions.len()
        );
        Ok(grammar)
    }

    /// An empty grammar with no reserved symbols and no start symbol,
    /// assembled with [`intern`](Self::intern),
    /// [`declare_nonterminal`](Self::declare_nonterminal) and
    /// [`push_production`](Self::push_production).
    pub(crate) fn unaugmented() -> Self {
        Self::default()
    }

    pub(crate) fn intern(&mut self, name: &str) -> SymbolId {
        self.symbols.add(name)
    }

    pub(crate) fn declare_nonterminal(&mut self, symbol: SymbolId) {
        self.nonterminals
            .entry(symbol)
            .or_insert_with(|| Nonterminal::new(symbol));
    }

    pub(crate) fn push_production(&mut self, lhs: SymbolId, handle: Vec<SymbolId>) -> usize {
        let id = self.productions.len();
        self.productions.push(Production::new(id, lhs, handle));
        self.declare_nonterminal(lhs);
        if let Some(nt) = self.nonterminals.get_mut(&lhs) {
            nt.productions.push(id);
        }
        id
    }

    pub fn symbols(&self) -> &Symtab {
        &self.symbols
    }

    pub fn symbol_name(&self, id: SymbolId) -> &str {
        self.symbols.sym(id).unwrap_or("?")
    }

    pub fn symbol_id(&self, name: &str) -> Option<SymbolId> {
        self.symbols.idx(name)
    }

    #[inline]
    pub fn is_nonterminal(&self, id: SymbolId) -> bool {
        self.nonterminals.contains_key(&id)
    }

    /// Every symbol that heads no production, in id order.
    pub fn terminals(&self) -> Vec<SymbolId> {
        (0..self.symbols.len())
            .filter(|id| !self.is_nonterminal(*id))
            .collect()
    }

    pub fn nonterminal(&self, id: SymbolId) -> Option<&Nonterminal> {
        self.nonterminals.get(&id)
    }

    pub fn nonterminals(&self) -> impl Iterator<Item = &Nonterminal> {
        self.nonterminals.values()
    }

    pub fn productions(&self) -> &[Production] {
        &self.productions
    }

    pub fn production(&self, id: usize) -> &Production {
        &self.productions[id]
    }

    pub fn start(&self) -> Option<SymbolId> {
        self.start
    }

    pub fn operator(&self, symbol: SymbolId) -> Option<&Operator> {
        self.operators.get(&symbol)
    }

    pub fn action_groups(&self) -> &ActionGroups {
        &self.actions
    }

    pub fn has_error_recovery(&self) -> bool {
        self.has_error_recovery
    }

    pub fn lex(&self) -> Option<&serde_json::Value> {
        self.lex.as_ref()
    }

    pub fn action_include(&self) -> Option<&str> {
        self.action_include.as_deref()
    }

    pub fn module_include(&self) -> Option<&str> {
        self.module_include.as_deref()
    }

    pub fn parse_params(&self) -> &[String] {
        &self.parse_params
    }

    /// `lhs -> a b c`, or `lhs -> ` for an empty handle.
    pub fn display_production(&self, id: usize) -> std::string::String {
        let production = self.production(id);
        let mut out = format!("{} ->", self.symbol_name(production.lhs));
        for &symbol in &production.handle {
            out.push(' ');
            out.push_str(self.symbol_name(symbol));
        }
        out
    }
}
