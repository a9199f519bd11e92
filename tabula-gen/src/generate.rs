//! Emitter: writes generated tables as a Rust module and as JSON.

use crate::automaton;
use crate::generator::{Algorithm, Generator, GeneratorOptions, LlGenerator, LrGenerator};
use crate::grammar::Grammar;
use crate::spec::GrammarSpec;
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::io::{self, Write};
use std::path::Path;
use tabula::Action;

/// Command-line adjustments applied on top of a grammar's own options.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub algorithm: Option<Algorithm>,
    pub on_demand_lookahead: bool,
    pub no_default_resolve: bool,
    pub debug: bool,
}

impl Overrides {
    pub fn apply(&self, options: &mut GeneratorOptions) {
        if let Some(algorithm) = self.algorithm {
            options.algorithm = algorithm;
        }
        options.on_demand_lookahead |= self.on_demand_lookahead;
        options.no_default_resolve |= self.no_default_resolve;
        options.debug |= self.debug;
    }
}

/// Reads a JSON grammar and writes `<name>.rs` and `<name>.json` into
/// `out_dir`. Conflicts are reported through `log` only.
pub fn generate<P: AsRef<Path>, Q: AsRef<Path>>(
    grammar_path: P,
    out_dir: Q,
    name: &str,
    overrides: &Overrides,
) -> Result<()> {
    let grammar_path = grammar_path.as_ref();
    let text = std::fs::read_to_string(grammar_path)
        .with_context(|| format!("reading grammar {}", grammar_path.display()))?;
    let spec = GrammarSpec::from_json(&text)
        .with_context(|| format!("parsing grammar {}", grammar_path.display()))?;
    let mut options = spec.options.clone().unwrap_or_default();
    overrides.apply(&mut options);

    let generator = Generator::new(&spec, options)
        .with_context(|| format!("building tables for {}", grammar_path.display()))?;
    if generator.conflicts() > 0 {
        log::warn!(
            "{}: {} conflicts ({})",
            grammar_path.display(),
            generator.conflicts(),
            generator.name()
        );
    }

    let out_dir = out_dir.as_ref();
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("creating {}", out_dir.display()))?;
    let rs_path = out_dir.join(format!("{}.rs", name));
    let json_path = out_dir.join(format!("{}.json", name));

    let mut out = std::fs::File::create(&rs_path)
        .with_context(|| format!("creating {}", rs_path.display()))?;
    let json = match &generator {
        Generator::Lr(lr) => {
            write_module(&mut out, lr)?;
            lr.tables().to_json()?
        }
        Generator::Ll(ll) => {
            write_ll_module(&mut out, ll)?;
            serde_json::to_string(ll.table())?
        }
    };
    std::fs::write(&json_path, json)
        .with_context(|| format!("writing {}", json_path.display()))?;
    log::info!("wrote {} and {}", rs_path.display(), json_path.display());
    Ok(())
}

/// Hands out one constant name per distinct row body.
struct NameAllocator {
    prefix: &'static str,
    names: HashMap<String, String>,
}

impl NameAllocator {
    fn new(prefix: &'static str) -> Self {
        Self {
            prefix,
            names: HashMap::new(),
        }
    }

    /// The name for `body` and whether it was just allocated.
    fn name_for(&mut self, body: &str) -> (String, bool) {
        if let Some(name) = self.names.get(body) {
            return (name.clone(), false);
        }
        let name = format!("{}_{}", self.prefix, self.names.len());
        self.names.insert(body.to_owned(), name.clone());
        (name, true)
    }
}

fn action_literal(action: Action) -> String {
    format!("Action::{:?}", action)
}

fn write_header<W: Write>(out: &mut W, algorithm: &str, grammar: &Grammar) -> io::Result<()> {
    writeln!(out, "/*")?;
    writeln!(out, "Produced by parser generator tabula-gen ({})", algorithm)?;
    writeln!(
        out,
        "Copyright (c) 2005-2025 IKH Software, Inc. <support@ikhsoftware.com>"
    )?;
    writeln!(out, "\n")?;
    write_prods(out, grammar)?;
    writeln!(out)?;
    write_lookaheads(out, grammar)?;
    writeln!(out)
}

/// Writes the LR tables of `generator` as a Rust module.
pub fn write_module<W: Write>(out: &mut W, generator: &LrGenerator) -> io::Result<()> {
    let grammar = generator.grammar();
    let tables = generator.tables();

    write_header(out, generator.name(), grammar)?;
    automaton::write_states(out, generator.states(), grammar)?;
    writeln!(out, "*/\n")?;
    writeln!(out, "use tabula::{{Action, ParseError, ParseTables, Reduction, Rule}};\n")?;

    writeln!(out, "pub const N_STATES: usize = {};", tables.state_count())?;
    writeln!(out, "pub const CONFLICTS: usize = {};\n", generator.conflicts())?;

    writeln!(out, "pub const SYMBOLS: &[(&str, usize)] = &[")?;
    for (name, id) in &tables.symbols {
        writeln!(out, "    ({:?}, {}),", name.as_str(), id)?;
    }
    writeln!(out, "];\n")?;

    writeln!(out, "pub const TERMINALS: &[(usize, &str)] = &[")?;
    for (id, name) in &tables.terminals {
        writeln!(out, "    ({}, {:?}),", id, name.as_str())?;
    }
    writeln!(out, "];\n")?;

    writeln!(out, "pub const PRODUCTIONS: &[Rule] = &[")?;
    for (i, rule) in tables.productions.iter().enumerate() {
        writeln!(
            out,
            "    Rule {{ lhs: {}, arity: {} }}, // {}: {}",
            rule.lhs,
            rule.arity,
            i,
            grammar.display_production(i)
        )?;
    }
    writeln!(out, "];\n")?;

    let mut rows = NameAllocator::new("ROW");
    let mut row_names = Vec::with_capacity(tables.table.len());
    for row in &tables.table {
        let body = row
            .iter()
            .map(|(&symbol, &action)| format!("({}, {})", symbol, action_literal(action)))
            .collect::<Vec<_>>()
            .join(", ");
        let (name, fresh) = rows.name_for(&body);
        if fresh {
            writeln!(out, "const {}: &[(usize, Action)] = &[{}];", name, body)?;
        }
        row_names.push(name);
    }
    writeln!(out)?;

    writeln!(out, "pub const TABLE: &[&[(usize, Action)]] = &[")?;
    for (state, name) in row_names.iter().enumerate() {
        writeln!(out, "    {}, // {}", name, state)?;
    }
    writeln!(out, "];\n")?;

    writeln!(out, "pub const AMBIGS: &[&[Action]] = &[")?;
    for (i, candidates) in tables.ambigs.iter().enumerate() {
        let body = candidates
            .iter()
            .map(|&a| action_literal(a))
            .collect::<Vec<_>>()
            .join(", ");
        writeln!(out, "    &[{}], // {}", body, i)?;
    }
    writeln!(out, "];\n")?;

    writeln!(out, "pub const DEFAULT_ACTIONS: &[(usize, Action)] = &[")?;
    for (state, &action) in &tables.default_actions {
        writeln!(out, "    ({}, {}),", state, action_literal(action))?;
    }
    writeln!(out, "];\n")?;

    writeln!(out, "pub const PARSE_PARAMS: &[&str] = &[")?;
    for param in grammar.parse_params() {
        writeln!(out, "    {:?},", param.as_str())?;
    }
    writeln!(out, "];\n")?;

    if let Some(lex) = grammar.lex() {
        writeln!(out, "pub const LEX: &str = {:?};\n", lex.to_string())?;
    }

    writeln!(out, "pub fn tables() -> ParseTables {{")?;
    writeln!(
        out,
        "    ParseTables::from_static(TABLE, AMBIGS, DEFAULT_ACTIONS, PRODUCTIONS, SYMBOLS, TERMINALS)"
    )?;
    writeln!(out, "}}\n")?;

    write_perform_action(out, grammar)?;

    if let Some(include) = grammar.module_include() {
        writeln!(out, "\n{}", include)?;
    }
    Ok(())
}

fn write_perform_action<W: Write>(out: &mut W, grammar: &Grammar) -> io::Result<()> {
    writeln!(out, "#[allow(unused_variables)]")?;
    writeln!(
        out,
        "pub fn perform_action<V: Clone>(production: usize, reduction: &mut Reduction<'_, V>) -> Result<(), ParseError> {{"
    )?;
    if let Some(include) = grammar.action_include() {
        writeln!(out, "{}", include)?;
    }
    writeln!(out, "    match production {{")?;
    for group in grammar.action_groups().iter() {
        let arms = group
            .productions
            .iter()
            .map(|p| p.to_string())
            .collect::<Vec<_>>()
            .join(" | ");
        writeln!(out, "        {} => {{", arms)?;
        for line in group.source.lines() {
            writeln!(out, "            // {}", line)?;
        }
        writeln!(out, "        }}")?;
    }
    writeln!(out, "        _ => {{}}")?;
    writeln!(out, "    }}")?;
    writeln!(out, "    Ok(())")?;
    writeln!(out, "}}")
}

/// Writes the LL(1) prediction table as a Rust module.
pub fn write_ll_module<W: Write>(out: &mut W, generator: &LlGenerator) -> io::Result<()> {
    let grammar = generator.grammar();
    write_header(out, "LL(1)", grammar)?;
    writeln!(out, "*/\n")?;
    writeln!(out, "pub const CONFLICTS: usize = {};\n", generator.conflicts())?;
    writeln!(out, "/// (nonterminal, lookahead, predicted productions)")?;
    writeln!(out, "pub const PREDICT: &[(usize, usize, &[usize])] = &[")?;
    for (&nonterminal, row) in &generator.table().rows {
        for (&token, productions) in row {
            writeln!(
                out,
                "    ({}, {}, &{:?}), // {} on {}",
                nonterminal,
                token,
                productions,
                grammar.symbol_name(nonterminal),
                grammar.symbol_name(token)
            )?;
        }
    }
    writeln!(out, "];")
}

/// Writes the productions of `grammar`.
///
/// # Output Format
/// ```text
/// PS,<number of productions>
///
/// P,<index>,<lhs> -> <handle>
/// ```
pub fn write_prods<W: Write>(out: &mut W, grammar: &Grammar) -> io::Result<()> {
    writeln!(out, "PS,{}\n", grammar.productions().len())?;
    for production in grammar.productions() {
        writeln!(out, "P,{},{}", production.id, grammar.display_production(production.id))?;
    }
    Ok(())
}

/// Writes FIRST and FOLLOW of every nonterminal; nullable ones list
/// `` `empty' `` in their FIRST set.
pub fn write_lookaheads<W: Write>(out: &mut W, grammar: &Grammar) -> io::Result<()> {
    for nt in grammar.nonterminals() {
        write!(out, "FIRST,{},{{", grammar.symbol_name(nt.symbol))?;
        if nt.nullable {
            write!(out, "`empty', ")?;
        }
        for &t in &nt.first {
            write!(out, "{}, ", grammar.symbol_name(t))?;
        }
        writeln!(out, "}}")?;
    }
    for nt in grammar.nonterminals() {
        write!(out, "FOLLOW,{},{{", grammar.symbol_name(nt.symbol))?;
        for &t in &nt.follows {
            write!(out, "{}, ", grammar.symbol_name(t))?;
        }
        writeln!(out, "}}")?;
    }
    Ok(())
}
