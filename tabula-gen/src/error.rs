use smartstring::alias::String;
use thiserror::Error;

/// Errors detected while normalizing a grammar specification.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GrammarError {
    #[error("grammar has no productions")]
    NoProductions,
    #[error("start symbol '{0}' is not a nonterminal of the grammar")]
    UnknownStart(String),
    #[error("malformed alternative of '{lhs}': {reason}")]
    MalformedAlternative { lhs: String, reason: String },
    #[error("unknown associativity '{0}' (expected left, right or nonassoc)")]
    UnknownAssoc(String),
    #[error("operator group {0} is empty")]
    EmptyOperatorGroup(usize),
    #[error("{0} does not build an LR automaton")]
    NotAnLrAlgorithm(&'static str),
}
