//! Grammar specifications, as read from JSON or assembled in code.
//!
//! ```json
//! {
//!   "start": "expr",
//!   "operators": [["left", "+", "-"], ["left", "*"]],
//!   "bnf": {
//!     "expr": [
//!       ["expr + expr", "$$ = $1 + $3"],
//!       ["expr * expr", "$$ = $1 * $3"],
//!       ["- expr", "$$ = -$2", {"prec": "*"}],
//!       "NUMBER"
//!     ]
//!   }
//! }
//! ```
//!
//! A rule body is either one string of `|`-separated alternatives or an
//! array of alternatives. An alternative is a handle string, or an array
//! `[handle, action?, {"prec": op}?]` where the handle may also be an array
//! of symbol names.

use crate::generator::GeneratorOptions;
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use smartstring::alias::String;

static ALTERNATION: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*\|\s*").unwrap());

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrammarSpec {
    #[serde(default, alias = "startSymbol")]
    pub start: Option<String>,
    #[serde(default)]
    pub bnf: IndexMap<String, Rules>,
    #[serde(default)]
    pub operators: Vec<Vec<String>>,
    /// Lexer description, carried through untouched.
    #[serde(default)]
    pub lex: Option<serde_json::Value>,
    #[serde(default)]
    pub action_include: Option<std::string::String>,
    #[serde(default)]
    pub module_include: Option<std::string::String>,
    #[serde(default)]
    pub parse_params: Vec<String>,
    #[serde(default)]
    pub options: Option<GeneratorOptions>,
}

/// The body of one rule.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Rules {
    Alternation(std::string::String),
    List(Vec<Alternative>),
}

impl Rules {
    pub fn alternatives(&self) -> Vec<Alternative> {
        match self {
            Rules::Alternation(text) => ALTERNATION
                .split(text.trim())
                .map(Alternative::new)
                .collect(),
            Rules::List(list) => list.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Handle {
    /// Whitespace-separated symbols, possibly with `name[alias]` tags.
    Text(std::string::String),
    Symbols(Vec<String>),
}

impl Handle {
    pub fn symbols(&self) -> Vec<String> {
        match self {
            Handle::Text(text) => text.split_whitespace().map(String::from).collect(),
            Handle::Symbols(symbols) => symbols.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawAlternative")]
pub struct Alternative {
    pub handle: Handle,
    pub action: Option<std::string::String>,
    pub prec: Option<String>,
}

impl Alternative {
    pub fn new(handle: &str) -> Self {
        Self {
            handle: Handle::Text(handle.trim().to_owned()),
            action: None,
            prec: None,
        }
    }

    pub fn action(mut self, source: &str) -> Self {
        self.action = Some(source.to_owned());
        self
    }

    pub fn prec(mut self, operator: &str) -> Self {
        self.prec = Some(operator.into());
        self
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawAlternative {
    Text(std::string::String),
    Tuple(Vec<serde_json::Value>),
}

fn prec_of(value: &serde_json::Value) -> Result<Option<String>, std::string::String> {
    match value.get("prec") {
        Some(serde_json::Value::String(name)) => Ok(Some(name.as_str().into())),
        Some(other) => Err(format!("prec must name an operator, got {}", other)),
        None => Ok(None),
    }
}

impl TryFrom<RawAlternative> for Alternative {
    type Error = std::string::String;

    fn try_from(raw: RawAlternative) -> Result<Self, Self::Error> {
        let parts = match raw {
            RawAlternative::Text(text) => return Ok(Alternative::new(&text)),
            RawAlternative::Tuple(parts) => parts,
        };
        let handle = match parts.first() {
            Some(serde_json::Value::String(text)) => Handle::Text(text.trim().to_owned()),
            Some(serde_json::Value::Array(items)) => Handle::Symbols(
                items
                    .iter()
                    .map(|item| match item {
                        serde_json::Value::String(name) => Ok(String::from(name.as_str())),
                        other => Err(format!("handle symbol must be a string, got {}", other)),
                    })
                    .collect::<Result<_, _>>()?,
            ),
            Some(other) => return Err(format!("handle must be a string or array, got {}", other)),
            None => return Err("empty alternative".to_owned()),
        };
        let (action, prec) = match (parts.get(1), parts.get(2)) {
            (None, _) => (None, None),
            (Some(serde_json::Value::String(source)), third) => {
                (Some(source.clone()), third.map(prec_of).transpose()?.flatten())
            }
            (Some(serde_json::Value::Null), third) => {
                (None, third.map(prec_of).transpose()?.flatten())
            }
            (Some(second @ serde_json::Value::Object(_)), None) => (None, prec_of(second)?),
            (Some(other), _) => {
                return Err(format!("action must be a string, got {}", other));
            }
        };
        Ok(Alternative {
            handle,
            action,
            prec,
        })
    }
}

impl GrammarSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn start(mut self, symbol: &str) -> Self {
        self.start = Some(symbol.into());
        self
    }

    /// Appends the `|`-separated alternatives of `body` to the rules of `lhs`.
    pub fn rule(self, lhs: &str, body: &str) -> Self {
        let alternatives = Rules::Alternation(body.to_owned()).alternatives();
        self.alternatives(lhs, alternatives)
    }

    pub fn alternatives(mut self, lhs: &str, alternatives: Vec<Alternative>) -> Self {
        let entry = self
            .bnf
            .entry(lhs.into())
            .or_insert_with(|| Rules::List(Vec::new()));
        let mut list = entry.alternatives();
        list.extend(alternatives);
        *entry = Rules::List(list);
        self
    }

    /// Declares one precedence level; later calls bind tighter.
    pub fn operator(mut self, assoc: &str, symbols: &[&str]) -> Self {
        let mut group = vec![String::from(assoc)];
        group.extend(symbols.iter().map(|s| String::from(*s)));
        self.operators.push(group);
        self
    }

    pub fn options(mut self, options: GeneratorOptions) -> Self {
        self.options = Some(options);
        self
    }
}
