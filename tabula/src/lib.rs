//! Copyright (c) 2005–2025 IKH Software, Inc.
//!
//! Released under the terms of the GNU Lesser General Public License, version 3.0
//! or (at your option) any later version (LGPL-3.0-or-later).
//!
//! Runtime for table-driven LR parsers.
//!
//! `tabula` executes the [`ParseTables`] built by `tabula-gen` (LR(0),
//! SLR(1), LALR(1) or canonical LR(1)) against any token source that
//! implements [`Lexer`]. Semantic values are computed by a host
//! [`Actions`] implementation; syntax errors can be absorbed by `error`
//! productions in the grammar.
//!
//! Tables are plain data: they can be embedded as constants of a generated
//! Rust module ([`ParseTables::from_static`]), or persisted as JSON
//! ([`ParseTables::to_json`], [`ParseTables::from_json`]) and swapped into a
//! running [`Parser`] with [`Parser::init`].

mod error;
mod lexer;
mod parser;
mod table;

pub use crate::error::{ParseError, ParseErrorKind, Position, Span};
pub use crate::lexer::{Lexer, LexerStats, TokenRef, WordLexer};
pub use crate::parser::{Actions, Parser, ParserOptions, ParserStats, Reduction};
pub use crate::table::{ACCEPT, Action, END, ERROR, ParseTables, Row, Rule};
