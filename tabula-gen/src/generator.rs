//! Generator façade: picks the algorithm, runs the analysis pipeline and
//! hands out the resulting tables and diagnostics.

use crate::automaton::CanonicalCollection;
use crate::error::GrammarError;
use crate::grammar::Grammar;
use crate::ll::LlTable;
use crate::spec::GrammarSpec;
use crate::table::{self, Resolution, TableBuild};
use crate::variant::{Variant, variant_for};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tabula::{Actions, Lexer, ParseTables, Parser, Rule};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum Algorithm {
    Lr0,
    Slr,
    #[default]
    Lalr,
    Lr,
    Ll,
}

impl Algorithm {
    pub fn name(self) -> &'static str {
        match self {
            Algorithm::Lr0 => "LR(0)",
            Algorithm::Slr => "SLR(1)",
            Algorithm::Lalr => "LALR(1)",
            Algorithm::Lr => "Canonical LR(1)",
            Algorithm::Ll => "LL(1)",
        }
    }
}

/// Options read from a grammar's `options` object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GeneratorOptions {
    #[serde(rename = "type")]
    pub algorithm: Algorithm,
    /// LALR(1) only: refine lookaheads of inadequate states only.
    pub on_demand_lookahead: bool,
    /// Keep every candidate of an unresolved conflict.
    pub no_default_resolve: bool,
    pub debug: bool,
}

/// An LR generator run: automaton, table and diagnostics.
pub struct LrGenerator {
    grammar: Grammar,
    options: GeneratorOptions,
    variant: Box<dyn Variant>,
    states: CanonicalCollection,
    build: TableBuild,
    tables: Arc<ParseTables>,
}

impl LrGenerator {
    pub fn new(spec: &GrammarSpec, options: GeneratorOptions) -> Result<Self, GrammarError> {
        let mut variant = variant_for(&options)
            .ok_or(GrammarError::NotAnLrAlgorithm(options.algorithm.name()))?;
        let mut grammar = Grammar::from_spec(spec)?;
        grammar.compute_lookaheads();
        if options.debug {
            for production in grammar.productions() {
                log::debug!("{}: {}", production.id, grammar.display_production(production.id));
            }
        }

        let mut states = CanonicalCollection::build(&grammar, variant.as_ref());
        variant.after_collection(&grammar, &mut states);
        let build = table::parse_table(
            &grammar,
            &states,
            variant.as_ref(),
            options.no_default_resolve,
        );
        let default_actions = table::find_defaults(&build.table, &build.error_cells);
        log::debug!(
            "{}: {} states, {} conflicts, {} default actions",
            variant.name(),
            states.len(),
            build.conflicts,
            default_actions.len()
        );

        let tables = ParseTables {
            table: build.table.clone(),
            ambigs: build.ambigs.clone(),
            default_actions,
            productions: grammar
                .productions()
                .iter()
                .map(|p| Rule {
                    lhs: p.lhs,
                    arity: p.handle.len(),
                })
                .collect(),
            symbols: grammar
                .symbols()
                .iter()
                .enumerate()
                .map(|(id, name)| (name.clone(), id))
                .collect(),
            terminals: grammar
                .terminals()
                .into_iter()
                .map(|id| (id, grammar.symbol_name(id).into()))
                .collect(),
        };

        Ok(Self {
            grammar,
            options,
            variant,
            states,
            build,
            tables: Arc::new(tables),
        })
    }

    pub fn name(&self) -> &'static str {
        self.variant.name()
    }

    pub fn options(&self) -> &GeneratorOptions {
        &self.options
    }

    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    pub fn variant(&self) -> &dyn Variant {
        self.variant.as_ref()
    }

    pub fn states(&self) -> &CanonicalCollection {
        &self.states
    }

    pub fn tables(&self) -> &Arc<ParseTables> {
        &self.tables
    }

    pub fn conflicts(&self) -> usize {
        self.build.conflicts
    }

    pub fn resolutions(&self) -> &[Resolution] {
        &self.build.resolutions
    }

    pub fn conflicted_states(&self) -> impl Iterator<Item = usize> + '_ {
        self.build.conflicted_states.iter().copied()
    }

    /// A parser sharing this generator's tables.
    pub fn create_parser<L: Lexer, A: Actions>(&self, lexer: L, actions: A) -> Parser<L, A> {
        Parser::new(Arc::clone(&self.tables), lexer, actions)
    }
}

/// An LL(1) generator run.
pub struct LlGenerator {
    grammar: Grammar,
    table: LlTable,
}

impl LlGenerator {
    pub fn new(spec: &GrammarSpec) -> Result<Self, GrammarError> {
        let mut grammar = Grammar::from_spec(spec)?;
        grammar.compute_lookaheads();
        let table = LlTable::build(&grammar);
        Ok(Self { grammar, table })
    }

    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    pub fn table(&self) -> &LlTable {
        &self.table
    }

    pub fn conflicts(&self) -> usize {
        self.table.conflicts
    }
}

pub enum Generator {
    Lr(LrGenerator),
    Ll(LlGenerator),
}

impl Generator {
    pub fn new(spec: &GrammarSpec, options: GeneratorOptions) -> Result<Self, GrammarError> {
        log::debug!("generating {} tables", options.algorithm.name());
        match options.algorithm {
            Algorithm::Ll => Ok(Generator::Ll(LlGenerator::new(spec)?)),
            _ => Ok(Generator::Lr(LrGenerator::new(spec, options)?)),
        }
    }

    /// Uses the options embedded in the grammar, or the defaults.
    pub fn from_spec(spec: &GrammarSpec) -> Result<Self, GrammarError> {
        Self::new(spec, spec.options.clone().unwrap_or_default())
    }

    pub fn name(&self) -> &'static str {
        match self {
            Generator::Lr(lr) => lr.name(),
            Generator::Ll(_) => Algorithm::Ll.name(),
        }
    }

    pub fn grammar(&self) -> &Grammar {
        match self {
            Generator::Lr(lr) => lr.grammar(),
            Generator::Ll(ll) => ll.grammar(),
        }
    }

    pub fn conflicts(&self) -> usize {
        match self {
            Generator::Lr(lr) => lr.conflicts(),
            Generator::Ll(ll) => ll.conflicts(),
        }
    }

    pub fn as_lr(&self) -> Option<&LrGenerator> {
        match self {
            Generator::Lr(lr) => Some(lr),
            Generator::Ll(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabula::{Action, END, WordLexer};

    struct Silent;

    impl Actions for Silent {
        type Value = ();

        fn shift_value(&mut self, _text: &str) {}
    }

    fn expr() -> GrammarSpec {
        GrammarSpec::new().rule("E", "E + T | T").rule("T", "NUMBER")
    }

    #[test]
    fn options_deserialize_from_grammar() {
        let spec = GrammarSpec::from_json(
            r#"{"bnf": {"S": "x"}, "options": {"type": "lr", "noDefaultResolve": true}}"#,
        )
        .unwrap();
        let options = spec.options.clone().unwrap();
        assert_eq!(options.algorithm, Algorithm::Lr);
        assert!(options.no_default_resolve);
        assert!(!options.on_demand_lookahead);
        let generator = Generator::from_spec(&spec).unwrap();
        assert_eq!(generator.name(), "Canonical LR(1)");
    }

    #[test]
    fn tables_describe_the_grammar() {
        let generator = LrGenerator::new(&expr(), GeneratorOptions::default()).unwrap();
        assert_eq!(generator.conflicts(), 0);
        let tables = generator.tables();
        assert_eq!(tables.productions[0], Rule { lhs: 0, arity: 2 });
        assert_eq!(tables.symbol_id("$end"), Some(END));
        assert_eq!(tables.terminal_name(END), Some("$end"));
        assert_eq!(tables.terminal_name(tables.symbol_id("E").unwrap()), None);
        assert_eq!(tables.state_count(), generator.states().len());
        assert!(
            tables
                .default_actions
                .values()
                .all(|a| matches!(a, Action::Reduce(_)))
        );
    }

    #[test]
    fn builds_are_deterministic() {
        for algorithm in [Algorithm::Lr0, Algorithm::Slr, Algorithm::Lalr, Algorithm::Lr] {
            let options = GeneratorOptions {
                algorithm,
                ..Default::default()
            };
            let a = LrGenerator::new(&expr(), options.clone()).unwrap();
            let b = LrGenerator::new(&expr(), options).unwrap();
            assert_eq!(a.tables(), b.tables());
            assert_eq!(a.conflicts(), b.conflicts());
        }
    }

    #[test]
    fn ll_has_no_automaton() {
        let options = GeneratorOptions {
            algorithm: Algorithm::Ll,
            ..Default::default()
        };
        assert_eq!(
            LrGenerator::new(&expr(), options.clone()).err(),
            Some(GrammarError::NotAnLrAlgorithm("LL(1)"))
        );
        let generator = Generator::new(&expr(), options).unwrap();
        assert!(generator.as_lr().is_none());
        assert_eq!(generator.conflicts(), 1);
    }

    #[test]
    fn created_parser_shares_tables() {
        let generator = LrGenerator::new(&expr(), GeneratorOptions::default()).unwrap();
        let mut parser = generator.create_parser(WordLexer::new(), Silent);
        assert!(std::ptr::eq(parser.tables(), generator.tables().as_ref()));
        parser.parse("NUMBER + NUMBER").unwrap();
        assert!(parser.parse("NUMBER +").is_err());
    }
}
