//! Exercise-specific structural rules

use anyhow::{Context, Result};
use regex::Regex;
use serde::Deserialize;

/// A rule as written in the catalog
#[derive(Debug, Deserialize)]
pub struct RawRule {
    /// The rule applies only when all of these match the comment-stripped source
    #[serde(default)]
    pub when: Vec<String>,
    #[serde(default)]
    pub all_of: Vec<String>,
    #[serde(default)]
    pub any_of: Vec<String>,
    /// Match `all_of`/`any_of` against the source as written (comments included)
    #[serde(default)]
    pub raw: bool,
    pub message: String,
    /// Longer terminal explanation
    #[serde(default)]
    pub detail: Option<String>,
}

/// Compiled structural rule
#[derive(Debug, Clone)]
pub struct Rule {
    when: Vec<Regex>,
    all_of: Vec<Regex>,
    any_of: Vec<Regex>,
    raw: bool,
    pub message: String,
    pub detail: Option<String>,
}

fn compile(patterns: &[String]) -> Result<Vec<Regex>> {
    patterns
        .iter()
        .map(|p| Regex::new(p).with_context(|| format!("Invalid rule pattern: {}", p)))
        .collect()
}

impl Rule {
    pub fn compile(raw: RawRule) -> Result<Self> {
        if raw.all_of.is_empty() && raw.any_of.is_empty() {
            anyhow::bail!("Rule \"{}\" has no patterns", raw.message);
        }
        Ok(Self {
            when: compile(&raw.when)?,
            all_of: compile(&raw.all_of)?,
            any_of: compile(&raw.any_of)?,
            raw: raw.raw,
            message: raw.message,
            detail: raw.detail,
        })
    }

    /// Whether the rule is satisfied (inapplicable rules are satisfied)
    pub fn is_met(&self, clean_source: &str, source: &str) -> bool {
        if !self.when.iter().all(|p| p.is_match(clean_source)) {
            return true;
        }
        let text = if self.raw { source } else { clean_source };
        self.all_of.iter().all(|p| p.is_match(text))
            && (self.any_of.is_empty() || self.any_of.iter().any(|p| p.is_match(text)))
    }
}
