//! The contract between a token source and the parse engine.

use crate::error::{ParseError, Position, Span};
use smartstring::alias::String;

/// A token as reported by a lexer: either a grammar symbol name or a
/// numeric symbol id from [`ParseTables::symbols`](crate::ParseTables).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TokenRef {
    Name(String),
    Id(usize),
}

impl From<&str> for TokenRef {
    fn from(name: &str) -> Self {
        TokenRef::Name(name.into())
    }
}

impl From<usize> for TokenRef {
    fn from(id: usize) -> Self {
        TokenRef::Id(id)
    }
}

/// A token source driven by [`Parser`](crate::Parser).
///
/// `text`, `line_number` and `location` describe the token most recently
/// returned by [`lex`](Lexer::lex).
pub trait Lexer {
    fn set_input(&mut self, input: &str);

    /// Returns the next token, or `None` at end of input.
    fn lex(&mut self) -> Result<Option<TokenRef>, ParseError>;

    fn text(&self) -> &str;

    fn length(&self) -> usize {
        self.text().len()
    }

    /// 0-based line of the last token.
    fn line_number(&self) -> usize;

    fn location(&self) -> Span;

    /// An excerpt of the input pointing at the last token, used in syntax
    /// error messages when available.
    fn show_position(&self) -> Option<std::string::String> {
        None
    }

    /// Whether [`location`](Lexer::location) carries byte ranges.
    fn ranges(&self) -> bool {
        false
    }
}

#[derive(Debug, Clone, Default)]
pub struct LexerStats {
    pub tokens: usize,
    pub lines: usize,
}

/// Splits the input on whitespace and reports each word as a token.
///
/// By default a word is its own token name; a classifier maps words to
/// other names (for instance every run of digits to `NUMBER`).
pub struct WordLexer {
    input: std::string::String,
    offset: usize,
    line: usize,
    column: usize,
    text: std::string::String,
    location: Span,
    classify: fn(&str) -> TokenRef,
    stats: LexerStats,
}

impl WordLexer {
    pub fn new() -> Self {
        Self::with_classifier(|word| TokenRef::Name(word.into()))
    }

    pub fn with_classifier(classify: fn(&str) -> TokenRef) -> Self {
        Self {
            input: std::string::String::new(),
            offset: 0,
            line: 0,
            column: 0,
            text: std::string::String::new(),
            location: Span::default().with_range(0, 0),
            classify,
            stats: LexerStats::default(),
        }
    }

    pub fn stats(&self) -> LexerStats {
        self.stats.clone()
    }

    fn advance(&mut self, ch: char) {
        self.offset += ch.len_utf8();
        if ch == '\n' {
            self.line += 1;
            self.column = 0;
            self.stats.lines += 1;
        } else {
            self.column += 1;
        }
    }
}

impl Default for WordLexer {
    fn default() -> Self {
        Self::new()
    }
}

impl Lexer for WordLexer {
    fn set_input(&mut self, input: &str) {
        self.input = input.to_owned();
        self.offset = 0;
        self.line = 0;
        self.column = 0;
        self.text.clear();
        self.location = Span::default().with_range(0, 0);
    }

    fn lex(&mut self) -> Result<Option<TokenRef>, ParseError> {
        while let Some(ch) = self.input[self.offset..].chars().next() {
            if !ch.is_whitespace() {
                break;
            }
            self.advance(ch);
        }
        if self.offset >= self.input.len() {
            self.text.clear();
            let end = Position::new(self.line, self.column);
            self.location = Span::new(end, end).with_range(self.offset, self.offset);
            return Ok(None);
        }
        let start_offset = self.offset;
        let start = Position::new(self.line, self.column);
        while let Some(ch) = self.input[self.offset..].chars().next() {
            if ch.is_whitespace() {
                break;
            }
            self.advance(ch);
        }
        self.text = self.input[start_offset..self.offset].to_owned();
        self.location = Span::new(start, Position::new(self.line, self.column))
            .with_range(start_offset, self.offset);
        self.stats.tokens += 1;
        Ok(Some((self.classify)(&self.text)))
    }

    fn text(&self) -> &str {
        &self.text
    }

    fn line_number(&self) -> usize {
        self.location.start.line
    }

    fn location(&self) -> Span {
        self.location
    }

    fn show_position(&self) -> Option<std::string::String> {
        let line = self.input.lines().nth(self.location.start.line)?;
        let width = (self.location.end.column.saturating_sub(self.location.start.column)).max(1);
        Some(format!(
            "{}\n{}{}",
            line,
            "-".repeat(self.location.start.column),
            "^".repeat(width)
        ))
    }

    fn ranges(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn words_become_tokens() {
        let mut lexer = WordLexer::new();
        lexer.set_input("a bb\n  c");
        assert_eq!(lexer.lex().unwrap(), Some(TokenRef::from("a")));
        assert_eq!(lexer.lex().unwrap(), Some(TokenRef::from("bb")));
        assert_eq!(lexer.text(), "bb");
        assert_eq!(lexer.location().range, Some((2, 4)));
        assert_eq!(lexer.lex().unwrap(), Some(TokenRef::from("c")));
        assert_eq!(lexer.line_number(), 1);
        assert_eq!(lexer.location().start, Position::new(1, 2));
        assert_eq!(lexer.lex().unwrap(), None);
        assert_eq!(lexer.stats().tokens, 3);
    }

    #[test]
    fn classifier_renames_words() {
        let mut lexer = WordLexer::with_classifier(|w| {
            if w.chars().all(|c| c.is_ascii_digit()) {
                TokenRef::from("NUMBER")
            } else {
                TokenRef::from(w)
            }
        });
        lexer.set_input("12 + 3");
        assert_eq!(lexer.lex().unwrap(), Some(TokenRef::from("NUMBER")));
        assert_eq!(lexer.text(), "12");
        assert_eq!(lexer.length(), 2);
        assert_eq!(lexer.lex().unwrap(), Some(TokenRef::from("+")));
    }

    #[test]
    fn show_position_points_at_token() {
        let mut lexer = WordLexer::new();
        lexer.set_input("x yy z");
        lexer.lex().unwrap();
        lexer.lex().unwrap();
        assert_eq!(lexer.show_position().unwrap(), "x yy z\n--^^");
    }
}
