//! Synonym directive compilation.
//!
//! Each directive is a single-entry map from a scope tag to one rule, e.g.
//!
//! ```json
//! [
//!   { "search": "foo => bar" },
//!   { "index": "baz, qux" },
//!   { "both": "uk, united kingdom" }
//! ]
//! ```
//!
//! A rule is either a comma separated list of equivalent terms or
//! `terms => replacements`. Only the terms left of `=>` take part in the
//! uniqueness check.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use crate::errors::SchemaError;

/// Scope tag of a synonym directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SynonymScope {
    Index,
    Search,
    Both,
}

impl SynonymScope {
    pub const VALID_KEYS: [&'static str; 3] = ["both", "search", "index"];

    fn applies_to_index(self) -> bool {
        matches!(self, Self::Index | Self::Both)
    }

    fn applies_to_search(self) -> bool {
        matches!(self, Self::Search | Self::Both)
    }
}

impl FromStr for SynonymScope {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "index" => Ok(Self::Index),
            "search" => Ok(Self::Search),
            "both" => Ok(Self::Both),
            other => Err(SchemaError::invalid_synonyms(format!(
                "Unknown synonym key '{}'. Expected one of: {}",
                other,
                Self::VALID_KEYS.join(", ")
            ))),
        }
    }
}

/// One raw configuration entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SynonymDirective(pub BTreeMap<String, String>);

impl SynonymDirective {
    pub fn new(scope: impl Into<String>, rule: impl Into<String>) -> Self {
        let mut entries = BTreeMap::new();
        entries.insert(scope.into(), rule.into());
        Self(entries)
    }

    /// The single scope/rule pair this directive holds.
    fn single_rule(&self) -> Result<(SynonymScope, &str), SchemaError> {
        let mut entries = self.0.iter();
        let (key, rule) = match (entries.next(), entries.next()) {
            (Some(entry), None) => entry,
            (None, _) => {
                return Err(SchemaError::invalid_synonyms(
                    "Empty synonym entry. Each item should define exactly one rule",
                ))
            }
            (Some(_), Some(_)) => {
                return Err(SchemaError::invalid_synonyms(format!(
                    "More than one term defined together: {}. Each synonym should be defined \
                     as a separate item, e.g. `- search: 'foo => bar'` and `- index: 'baz, qux'`",
                    self
                )))
            }
        };

        Ok((key.parse()?, rule.as_str()))
    }
}

impl fmt::Display for SynonymDirective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pairs: Vec<String> = self
            .0
            .iter()
            .map(|(k, v)| format!("{}: '{}'", k, v))
            .collect();
        write!(f, "{{{}}}", pairs.join(", "))
    }
}

/// Which analysis phase a compiled set belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisPhase {
    Index,
    Search,
}

impl fmt::Display for AnalysisPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index => write!(f, "index"),
            Self::Search => write!(f, "search"),
        }
    }
}

/// Synonym rules applied during one analysis phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynonymSet {
    phase: AnalysisPhase,
    rules: Vec<String>,
}

impl SynonymSet {
    fn new(phase: AnalysisPhase) -> Self {
        Self {
            phase,
            rules: Vec::new(),
        }
    }

    pub fn phase(&self) -> AnalysisPhase {
        self.phase
    }

    pub fn rules(&self) -> &[String] {
        &self.rules
    }

    pub fn contains_rule(&self, rule: &str) -> bool {
        self.rules.iter().any(|r| r == rule)
    }

    /// Definition of a token filter applying these synonyms, to be placed
    /// under `settings.analysis.filter.<name>`.
    pub fn filter_config(&self) -> Value {
        json!({
            "type": "synonym",
            "synonyms": self.rules,
        })
    }

    /// Add a rule, recording its terms in `seen`.
    fn add_rule(&mut self, rule: &str, seen: &mut HashSet<String>) -> Result<(), SchemaError> {
        // Terms are claimed one at a time, so a term repeated inside the
        // rule itself is rejected too.
        for term in rule_terms(rule) {
            if !seen.insert(term.to_string()) {
                return Err(SchemaError::invalid_synonyms(format!(
                    "Synonym '{}' already defined for '{}'",
                    term, self.phase
                )));
            }
        }

        self.rules.push(rule.to_string());
        Ok(())
    }
}

/// The index-time and search-time synonym sets for one configuration load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledSynonyms {
    pub index: SynonymSet,
    pub search: SynonymSet,
}

impl Default for CompiledSynonyms {
    fn default() -> Self {
        Self {
            index: SynonymSet::new(AnalysisPhase::Index),
            search: SynonymSet::new(AnalysisPhase::Search),
        }
    }
}

/// Compile synonym directives into index-time and search-time sets.
///
/// # Errors
///
/// Returns [`SchemaError::InvalidSynonymConfig`] if a directive holds zero or
/// several rules, names an unknown scope, or reuses a term already claimed by
/// another rule in the same set.
pub fn compile_synonyms(directives: &[SynonymDirective]) -> Result<CompiledSynonyms, SchemaError> {
    let mut compiled = CompiledSynonyms::default();
    let mut index_terms = HashSet::new();
    let mut search_terms = HashSet::new();

    for directive in directives {
        let (scope, rule) = directive.single_rule()?;

        if scope.applies_to_search() {
            compiled.search.add_rule(rule, &mut search_terms)?;
        }
        if scope.applies_to_index() {
            compiled.index.add_rule(rule, &mut index_terms)?;
        }
    }

    debug!(
        index_rules = compiled.index.rules.len(),
        search_rules = compiled.search.rules.len(),
        "Compiled synonym directives"
    );

    Ok(compiled)
}

fn rule_terms(rule: &str) -> Vec<&str> {
    let lhs = rule.split("=>").next().unwrap_or_default();
    lhs.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect()
}
