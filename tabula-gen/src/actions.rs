//! Semantic action source rewriting and grouping.
//!
//! Action bodies are opaque host code. The generator only rewrites symbolic
//! references into positional ones (`$expr` to `$1`, `@expr` to `@1`), maps
//! the output references `$$`, `@$` and `@0` to [`OUTPUT_VALUE`] and
//! [`OUTPUT_LOCATION`], and merges productions whose rewritten bodies are
//! identical into one dispatch group.

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use smartstring::alias::String;
use std::collections::HashMap;

pub const OUTPUT_VALUE: &str = "yyval";
pub const OUTPUT_LOCATION: &str = "yyloc";

static NAMED_VALUE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$([A-Za-z][A-Za-z0-9_]*)").unwrap());
static NAMED_LOCATION: Lazy<Regex> = Lazy::new(|| Regex::new(r"@([A-Za-z][A-Za-z0-9_]*)").unwrap());
static OUTPUT_VALUE_REF: Lazy<Regex> = Lazy::new(|| Regex::new(r#"(^|[^'"])\$\$"#).unwrap());
static OUTPUT_LOCATION_REF: Lazy<Regex> = Lazy::new(|| Regex::new(r"@[0$]").unwrap());
static ALIAS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(.*)\[([A-Za-z][A-Za-z0-9_-]*)\]$").unwrap());

/// One handle symbol with its optional `[alias]` tag removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandleSymbol {
    pub name: String,
    pub alias: Option<String>,
}

impl HandleSymbol {
    pub fn parse(token: &str) -> Self {
        match ALIAS.captures(token) {
            Some(caps) if !caps[1].is_empty() => Self {
                name: caps[1].into(),
                alias: Some(caps[2].into()),
            },
            _ => Self {
                name: token.into(),
                alias: None,
            },
        }
    }
}

/// Maps every name a handle position can be referred to by onto its
/// 1-based position. A name used `k` times is also reachable as
/// `name1` .. `namek`; the bare name refers to its first occurrence.
fn positions(handle: &[HandleSymbol]) -> HashMap<std::string::String, usize> {
    let mut names = HashMap::new();
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for (i, symbol) in handle.iter().enumerate() {
        let key = symbol.alias.as_ref().unwrap_or(&symbol.name).as_str();
        let count = counts.entry(key).or_insert(0);
        *count += 1;
        if *count == 1 {
            names.insert(key.to_owned(), i + 1);
        }
        names.insert(format!("{}{}", key, count), i + 1);
    }
    names
}

fn replace_named(
    pattern: &Regex,
    source: &str,
    sigil: char,
    names: &HashMap<std::string::String, usize>,
) -> std::string::String {
    pattern
        .replace_all(source, |caps: &Captures| match names.get(&caps[1]) {
            Some(pos) => format!("{}{}", sigil, pos),
            None => caps[0].to_owned(),
        })
        .into_owned()
}

/// Rewrites the symbolic references of an action body.
pub fn rewrite(source: &str, handle: &[HandleSymbol]) -> std::string::String {
    let names = positions(handle);
    let source = replace_named(&NAMED_VALUE, source, '$', &names);
    let source = replace_named(&NAMED_LOCATION, &source, '@', &names);
    let source = OUTPUT_VALUE_REF.replace_all(&source, format!("${{1}}{}", OUTPUT_VALUE));
    OUTPUT_LOCATION_REF
        .replace_all(&source, OUTPUT_LOCATION)
        .into_owned()
}

/// A rewritten action body and the productions that share it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionGroup {
    pub source: std::string::String,
    pub productions: Vec<usize>,
}

/// Deduplicates action bodies in order of first appearance.
#[derive(Debug, Clone, Default)]
pub struct ActionGroups {
    groups: IndexMap<std::string::String, Vec<usize>>,
}

impl ActionGroups {
    /// Registers `production` under `source`, returning the group index.
    pub fn insert(&mut self, source: std::string::String, production: usize) -> usize {
        let entry = self.groups.entry(source);
        let index = entry.index();
        entry.or_default().push(production);
        index
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = ActionGroup> + '_ {
        self.groups.iter().map(|(source, productions)| ActionGroup {
            source: source.clone(),
            productions: productions.clone(),
        })
    }

    pub fn get(&self, index: usize) -> Option<ActionGroup> {
        self.groups
            .get_index(index)
            .map(|(source, productions)| ActionGroup {
                source: source.clone(),
                productions: productions.clone(),
            })
    }
}
