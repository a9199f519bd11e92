//! The table-driven LR parse engine.
//!
//! [`Parser`] executes a [`ParseTables`] against a [`Lexer`] with three
//! parallel stacks (states, semantic values, locations). Semantic values are
//! produced by a host [`Actions`] implementation: [`Actions::shift_value`]
//! turns token text into a value and [`Actions::reduce`] runs once per
//! reduction with the values of the handle being reduced.
//!
//! Syntax errors go through [`Actions::parse_error`]. When the grammar has
//! `error` productions the engine pops back to the nearest state that can
//! shift `error`, shifts it, and resumes. Errors within the next few shifts
//! recover again without being reported; see
//! [`ParserOptions::recovery_shifts`].
//!
//! # Example
//!
//! ```rust
//! use std::collections::BTreeMap;
//! use tabula::{Action, Actions, ParseTables, Parser, Rule, WordLexer};
//!
//! // S -> x
//! let tables = ParseTables {
//!     table: vec![
//!         BTreeMap::from([(3, Action::Goto(1)), (4, Action::Shift(2))]),
//!         BTreeMap::from([(1, Action::Accept)]),
//!         BTreeMap::from([(1, Action::Reduce(1))]),
//!     ],
//!     productions: vec![Rule { lhs: 0, arity: 2 }, Rule { lhs: 3, arity: 1 }],
//!     symbols: [("$accept", 0), ("$end", 1), ("error", 2), ("S", 3), ("x", 4)]
//!         .into_iter()
//!         .map(|(k, v)| (k.into(), v))
//!         .collect(),
//!     terminals: [(1, "$end"), (2, "error"), (4, "x")]
//!         .into_iter()
//!         .map(|(k, v)| (k, v.into()))
//!         .collect(),
//!     ..Default::default()
//! };
//!
//! struct Echo;
//! impl Actions for Echo {
//!     type Value = String;
//!     fn shift_value(&mut self, text: &str) -> String {
//!         text.to_owned()
//!     }
//! }
//!
//! let mut parser = Parser::new(tables, WordLexer::new(), Echo);
//! assert_eq!(parser.parse("x").unwrap(), "x");
//! assert!(parser.parse("x x").is_err());
//! ```

use crate::error::{ParseError, ParseErrorKind, Span};
use crate::lexer::{Lexer, TokenRef};
use crate::table::{Action, END, ERROR, ParseTables};
use smartstring::alias::String;
use std::fmt::Debug;
use std::sync::Arc;

const UNKNOWN: usize = usize::MAX;

/// The handle being reduced, as seen by [`Actions::reduce`].
///
/// `value` and `location` start as the defaults (`$1`, or `Default` for an
/// empty handle, and the span of the whole handle) and are pushed as the
/// result of the reduction.
pub struct Reduction<'a, V> {
    pub values: &'a [V],
    pub locations: &'a [Span],
    pub value: V,
    pub location: Span,
    /// Text, length and line of the last shifted token.
    pub text: &'a str,
    pub length: usize,
    pub line: usize,
}

impl<'a, V> Reduction<'a, V> {
    /// The value of handle symbol `k`, counted from 1.
    pub fn value(&self, k: usize) -> Option<&V> {
        k.checked_sub(1).and_then(|i| self.values.get(i))
    }

    /// The location of handle symbol `k`, counted from 1.
    pub fn location(&self, k: usize) -> Option<&Span> {
        k.checked_sub(1).and_then(|i| self.locations.get(i))
    }

    pub fn arity(&self) -> usize {
        self.values.len()
    }
}

/// Host hooks invoked by the parse engine.
pub trait Actions {
    type Value: Clone + Default + Debug;

    /// The semantic value of a shifted token.
    fn shift_value(&mut self, text: &str) -> Self::Value;

    /// Semantic action of `production`.
    fn reduce(
        &mut self,
        production: usize,
        reduction: &mut Reduction<'_, Self::Value>,
    ) -> Result<(), ParseError> {
        let _ = (production, reduction);
        Ok(())
    }

    /// Called for every syntax error. Returning `Err` aborts the parse.
    /// The default aborts unless an `error` production can recover.
    fn parse_error(&mut self, error: &ParseError) -> Result<(), ParseError> {
        if error.recoverable {
            log::warn!("{}", error.message);
            Ok(())
        } else {
            Err(error.clone())
        }
    }

    /// Picks one of the candidates of an ambiguity cell.
    fn resolve_ambiguity(
        &mut self,
        state: usize,
        token: usize,
        candidates: &[Action],
    ) -> Result<Action, ParseError> {
        Err(ParseError::internal(&format!(
            "unresolved ambiguity in state {} on symbol {}: {:?}",
            state, token, candidates
        )))
    }
}

#[derive(Debug, Clone)]
pub struct ParserOptions {
    /// Clean shifts required after shifting `error` before a new syntax
    /// error is reported to [`Actions::parse_error`].
    pub recovery_shifts: usize,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self { recovery_shifts: 3 }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ParserStats {
    pub tokens: usize,
    pub shifts: usize,
    pub reductions: usize,
    pub ambigs: usize,
    pub recoveries: usize,
}

#[derive(Debug, Clone)]
struct Lookahead {
    id: usize,
    name: String,
}

impl Lookahead {
    fn end() -> Self {
        Self {
            id: END,
            name: "$end".into(),
        }
    }

    fn error() -> Self {
        Self {
            id: ERROR,
            name: "error".into(),
        }
    }
}

/// Stacks of one in-flight parse.
///
/// `states` interleaves symbols and states, starting with the start state.
/// `locations` holds one more entry than `values`: the lexer's position
/// before the first token.
struct Stacks<V> {
    states: Vec<usize>,
    values: Vec<V>,
    locations: Vec<Span>,
}

impl<V: Debug> Stacks<V> {
    fn new(initial: Span) -> Self {
        Self {
            states: vec![0],
            values: Vec::new(),
            locations: vec![initial],
        }
    }

    #[inline]
    fn top_state(&self) -> usize {
        self.states.last().copied().unwrap_or(0)
    }

    fn push(&mut self, symbol: usize, state: usize, value: V, location: Span) {
        self.states.push(symbol);
        self.states.push(state);
        self.values.push(value);
        self.locations.push(location);
    }

    fn pop(&mut self, n: usize) -> Result<(), ParseError> {
        if n > self.values.len() {
            return Err(ParseError::internal("stack underflow"));
        }
        self.states.truncate(self.states.len() - 2 * n);
        self.values.truncate(self.values.len() - n);
        self.locations.truncate(self.locations.len() - n);
        Ok(())
    }

    /// Location covering the top `n` entries; an empty handle takes the
    /// location of whatever precedes it.
    fn merged_location(&self, n: usize, ranges: bool) -> Span {
        let len = self.locations.len();
        let first = self.locations[len - n.max(1)];
        let span = first.merge(&self.locations[len - 1]);
        if ranges {
            span
        } else {
            Span { range: None, ..span }
        }
    }

    /// Number of frames to pop to reach a state with an action on `error`.
    fn error_depth(&self, tables: &ParseTables) -> Option<usize> {
        let mut top = self.states.len() - 1;
        let mut depth = 0;
        loop {
            if tables.lookup(self.states[top], ERROR).is_some() {
                return Some(depth);
            }
            if top < 2 {
                return None;
            }
            top -= 2;
            depth += 1;
        }
    }

    fn dump(&self, incoming: &str) {
        let mut output = std::string::String::new();
        for pair in self.states.chunks(2) {
            match pair {
                [state, symbol] => output.push_str(&format!("<{}> {} ", state, symbol)),
                [state] => output.push_str(&format!("<{}> <- {} ", state, incoming)),
                _ => {}
            }
        }
        log::trace!("{}| {:?}", output, self.values);
    }
}

/// Executes parse tables against a lexer.
pub struct Parser<L, A>
where
    L: Lexer,
    A: Actions,
{
    tables: Arc<ParseTables>,
    lexer: L,
    actions: A,
    options: ParserOptions,
    stats: ParserStats,
}

impl<L, A> Parser<L, A>
where
    L: Lexer,
    A: Actions,
{
    pub fn new(tables: impl Into<Arc<ParseTables>>, lexer: L, actions: A) -> Self {
        Self {
            tables: tables.into(),
            lexer,
            actions,
            options: ParserOptions::default(),
            stats: ParserStats::default(),
        }
    }

    pub fn with_options(mut self, options: ParserOptions) -> Self {
        self.options = options;
        self
    }

    /// Replaces the tables, for instance with ones reloaded from JSON.
    pub fn init(&mut self, tables: impl Into<Arc<ParseTables>>) {
        self.tables = tables.into();
    }

    pub fn tables(&self) -> &ParseTables {
        &self.tables
    }

    pub fn lexer(&self) -> &L {
        &self.lexer
    }

    pub fn lexer_mut(&mut self) -> &mut L {
        &mut self.lexer
    }

    pub fn actions(&self) -> &A {
        &self.actions
    }

    pub fn actions_mut(&mut self) -> &mut A {
        &mut self.actions
    }

    pub fn into_actions(self) -> A {
        self.actions
    }

    pub fn stats(&self) -> ParserStats {
        self.stats.clone()
    }

    fn lex(&mut self, tables: &ParseTables) -> Result<Lookahead, ParseError> {
        self.stats.tokens += 1;
        Ok(match self.lexer.lex()? {
            None => Lookahead::end(),
            Some(TokenRef::Name(name)) => Lookahead {
                id: tables
                    .symbol_id(&name)
                    .filter(|&id| tables.terminal_name(id).is_some())
                    .unwrap_or(UNKNOWN),
                name,
            },
            Some(TokenRef::Id(id)) => match tables.terminal_name(id) {
                Some(name) => Lookahead {
                    id,
                    name: name.into(),
                },
                None => Lookahead {
                    id: UNKNOWN,
                    name: id.to_string().into(),
                },
            },
        })
    }

    fn syntax_error(
        &self,
        tables: &ParseTables,
        state: usize,
        lookahead: &Lookahead,
        line: usize,
        recoverable: bool,
    ) -> ParseError {
        let expected: Vec<String> = tables.expected(state);
        let quoted: Vec<std::string::String> =
            expected.iter().map(|name| format!("'{}'", name)).collect();
        let message = match self.lexer.show_position() {
            Some(position) => format!(
                "Parse error on line {}:\n{}\nExpecting {}, got '{}'",
                line + 1,
                position,
                quoted.join(", "),
                lookahead.name
            ),
            None if lookahead.id == END => {
                format!("Parse error on line {}: Unexpected end of input", line + 1)
            }
            None => format!(
                "Parse error on line {}: Unexpected '{}'",
                line + 1,
                lookahead.name
            ),
        };
        ParseError {
            kind: ParseErrorKind::Syntax,
            message: message.as_str().into(),
            recoverable,
            expected,
            token: Some(lookahead.name.clone()),
            line,
            span: Some(self.lexer.location()),
        }
    }

    /// An error that interrupts a recovery already in progress.
    fn halted(
        &mut self,
        tables: &ParseTables,
        state: usize,
        lookahead: &Lookahead,
        line: usize,
    ) -> Result<A::Value, ParseError> {
        let mut error = self.syntax_error(tables, state, lookahead, line, false);
        error.message = format!(
            "Parsing halted while starting to recover from another error.\n{}",
            error.message
        )
        .as_str()
        .into();
        self.fatal(error)
    }

    /// Reports an error no recovery can absorb.
    fn fatal(&mut self, error: ParseError) -> Result<A::Value, ParseError> {
        self.actions.parse_error(&error)?;
        Err(error)
    }

    /// Parses `input` and returns the value of the start symbol.
    pub fn parse(&mut self, input: &str) -> Result<A::Value, ParseError> {
        let tables = Arc::clone(&self.tables);
        self.lexer.set_input(input);
        let mut stacks: Stacks<A::Value> = Stacks::new(self.lexer.location());

        let mut lookahead: Option<Lookahead> = None;
        let mut pre_error: Option<Lookahead> = None;
        let window = self.options.recovery_shifts.max(1);
        let mut recovering = 0;
        let mut discarded = false;

        let mut text = std::string::String::new();
        let mut line = 0;

        loop {
            let state = stacks.top_state();
            let mut action = match tables.default_action(state) {
                Some(action) => Some(action),
                None => {
                    if lookahead.is_none() {
                        lookahead = Some(self.lex(&tables)?);
                    }
                    lookahead.as_ref().and_then(|la| tables.lookup(state, la.id))
                }
            };

            if let Some(Action::Ambig(id)) = action {
                let token = lookahead.as_ref().map_or(UNKNOWN, |la| la.id);
                log::trace!("Ambig {} in state {}", id, state);
                self.stats.ambigs += 1;
                action = Some(
                    self.actions
                        .resolve_ambiguity(state, token, tables.ambiguity(id))?,
                );
            }

            let action = match action {
                Some(action) => action,
                None => {
                    let Some(la) = lookahead.clone() else {
                        return Err(ParseError::internal("no lookahead at error"));
                    };
                    if recovering == 0 {
                        let depth = stacks.error_depth(&tables);
                        let error = self.syntax_error(&tables, state, &la, line, depth.is_some());
                        let Some(depth) = depth else {
                            return self.fatal(error);
                        };
                        self.actions.parse_error(&error)?;
                        self.stats.recoveries += 1;
                        log::debug!("recovering from '{}' by popping {} frames", la.name, depth);
                        stacks.pop(depth)?;
                        pre_error = if la.id == ERROR { None } else { Some(la) };
                        discarded = false;
                    } else if recovering == window {
                        if discarded || la.id == END {
                            return self.halted(&tables, state, &la, line);
                        }
                        log::debug!("discarding '{}' while recovering", la.name);
                        discarded = true;
                        lookahead = Some(self.lex(&tables)?);
                        continue;
                    } else {
                        // Inside the window: recover again without reporting.
                        let depth = match la.id {
                            END => None,
                            _ => stacks.error_depth(&tables),
                        };
                        let Some(depth) = depth else {
                            return self.halted(&tables, state, &la, line);
                        };
                        self.stats.recoveries += 1;
                        log::debug!(
                            "recovering again at '{}' by popping {} frames",
                            la.name,
                            depth
                        );
                        stacks.pop(depth)?;
                        pre_error = if la.id == ERROR { None } else { Some(la) };
                        discarded = false;
                    }
                    lookahead = Some(Lookahead::error());
                    recovering = window;
                    let state = stacks.top_state();
                    match tables.lookup(state, ERROR) {
                        Some(action) => action,
                        None => return Err(ParseError::internal("missing action on error")),
                    }
                }
            };

            match action {
                Action::Shift(next) => {
                    let Some(la) = lookahead.take() else {
                        return Err(ParseError::internal("shift without lookahead"));
                    };
                    log::trace!("Shift {} -> {}", la.name, next);
                    let value = self.actions.shift_value(self.lexer.text());
                    stacks.push(la.id, next, value, self.lexer.location());
                    self.stats.shifts += 1;
                    match pre_error.take() {
                        Some(pending) if la.id == ERROR => lookahead = Some(pending),
                        pending => {
                            pre_error = pending;
                            text.clear();
                            text.push_str(self.lexer.text());
                            line = self.lexer.line_number();
                            recovering = recovering.saturating_sub(1);
                        }
                    }
                }

                Action::Reduce(production) => {
                    let Some(rule) = tables.productions.get(production).copied() else {
                        return Err(ParseError::internal(&format!(
                            "unknown production {}",
                            production
                        )));
                    };
                    log::trace!("Reduce {}", production);
                    let n = rule.arity;
                    if n > stacks.values.len() {
                        return Err(ParseError::internal("stack underflow"));
                    }
                    let location = stacks.merged_location(n, self.lexer.ranges());
                    let base = stacks.values.len() - n;
                    let mut reduction = Reduction {
                        values: &stacks.values[base..],
                        locations: &stacks.locations[stacks.locations.len() - n..],
                        value: stacks.values.get(base).cloned().unwrap_or_default(),
                        location,
                        text: &text,
                        length: text.len(),
                        line,
                    };
                    self.actions.reduce(production, &mut reduction)?;
                    let Reduction {
                        value, location, ..
                    } = reduction;
                    stacks.pop(n)?;
                    let from = stacks.top_state();
                    let Some(Action::Goto(next)) = tables.lookup(from, rule.lhs) else {
                        return Err(ParseError::internal(&format!(
                            "missing goto from state {} on symbol {}",
                            from, rule.lhs
                        )));
                    };
                    stacks.push(rule.lhs, next, value, location);
                    self.stats.reductions += 1;
                }

                Action::Accept => {
                    log::trace!("Accept");
                    return Ok(stacks.values.pop().unwrap_or_default());
                }

                Action::Goto(_) | Action::Ambig(_) => {
                    return Err(ParseError::internal(&format!(
                        "unexpected {:?} in state {}",
                        action, state
                    )));
                }
            }

            if log::log_enabled!(log::Level::Trace) {
                let incoming = lookahead.as_ref().map_or("", |la| la.name.as_str());
                stacks.dump(incoming);
            }
        }
    }
}
