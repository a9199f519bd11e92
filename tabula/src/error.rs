//! Source locations and the runtime parse error.
//!
//! Lexers report where each token sits with a [`Span`]; the parse engine
//! merges spans as it reduces and attaches them to every [`ParseError`].
//!
//! # Examples
//!
//! ```rust
//! # use tabula::{ParseError, ParseErrorKind, Position, Span};
//! let sp = Span::new(Position::new(3, 5), Position::new(3, 10));
//!
//! let err = ParseError::lexical("unrecognized character '#'", Some(sp));
//! assert_eq!(err.kind, ParseErrorKind::Lexical);
//! assert!(err.to_string().contains("unrecognized"));
//! ```

use serde::{Deserialize, Serialize};
use smartstring::alias::String;
use thiserror::Error;

/// A 0-based line/column position in source text.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Position {
    /// 0-based line number.
    pub line: usize,
    /// 0-based column number.
    pub column: usize,
}

impl Position {
    #[inline]
    pub const fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

/// A half-open source range `[start, end)`, optionally with byte offsets.
///
/// `range` is only filled in by lexers that report
/// [`Lexer::ranges`](crate::Lexer::ranges).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: Position,
    pub end: Position,
    pub range: Option<(usize, usize)>,
}

impl Span {
    #[inline]
    pub const fn new(start: Position, end: Position) -> Self {
        Self {
            start,
            end,
            range: None,
        }
    }

    /// Attaches byte offsets to the span.
    #[inline]
    pub const fn with_range(mut self, start: usize, end: usize) -> Self {
        self.range = Some((start, end));
        self
    }

    /// Merge with another span by covering both. Byte ranges are merged
    /// only when both spans carry one.
    pub fn merge(&self, other: &Span) -> Span {
        let start = if self.start <= other.start {
            self.start
        } else {
            other.start
        };
        let end = if self.end >= other.end {
            self.end
        } else {
            other.end
        };
        let range = match (self.range, other.range) {
            (Some((a, b)), Some((c, d))) => Some((a.min(c), b.max(d))),
            _ => None,
        };
        Span { start, end, range }
    }
}

/// What went wrong during a parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParseErrorKind {
    /// The token stream does not fit the grammar.
    Syntax,
    /// The lexer could not produce a token.
    Lexical,
    /// The tables or the stacks are inconsistent: an unresolved ambiguity
    /// cell, a missing goto, a stack underflow.
    InternalInvariant,
    /// A semantic action failed.
    Action,
}

/// Error raised by the parse engine, the lexer, or a semantic action.
///
/// Syntax errors carry the offending token, the terminals the current state
/// would have accepted, and whether an `error` production can absorb them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub message: String,
    pub recoverable: bool,
    pub expected: Vec<String>,
    pub token: Option<String>,
    /// 0-based line of the last shifted token.
    pub line: usize,
    pub span: Option<Span>,
}

impl ParseError {
    fn new(kind: ParseErrorKind, message: &str) -> Self {
        Self {
            kind,
            message: message.into(),
            recoverable: false,
            expected: Vec::new(),
            token: None,
            line: 0,
            span: None,
        }
    }

    pub fn lexical(message: &str, span: Option<Span>) -> Self {
        let mut err = Self::new(ParseErrorKind::Lexical, message);
        err.span = span;
        err
    }

    pub fn internal(message: &str) -> Self {
        Self::new(ParseErrorKind::InternalInvariant, message)
    }

    pub fn action(message: &str) -> Self {
        Self::new(ParseErrorKind::Action, message)
    }
}
