//! Language configuration for remote execution and source inspection

use std::collections::HashMap;
use std::sync::OnceLock;

use anyhow::Context;
use regex::Regex;
use serde::Deserialize;

const EMBEDDED_LANGUAGES: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/files/languages.toml"));

/// Configuration for a supported programming language
#[derive(Debug, Clone)]
pub struct LanguageConfig {
    /// Canonical language name (e.g., "csharp")
    pub name: String,
    /// Judge0 language id
    pub language_id: u32,
    /// Qualified spellings of the "read one line of stdin" call, without parentheses
    pub read_calls: Vec<String>,
    /// Spellings of the console write calls, without parentheses
    pub write_calls: Vec<String>,
    /// Runtime error texts that mean the program parsed an input it never received
    pub input_format_errors: Vec<String>,
    /// Matches any read call site, longest spelling first, tolerant of inner whitespace
    pub read_call_pattern: Regex,
}

impl LanguageConfig {
    /// Whether the source contains at least one read call
    pub fn reads_input(&self, source: &str) -> bool {
        self.read_calls.iter().any(|call| source.contains(call.as_str()))
    }

    /// Whether the source contains at least one write call
    pub fn writes_output(&self, source: &str) -> bool {
        self.write_calls.iter().any(|call| source.contains(call.as_str()))
    }

    /// Whether stderr reports a parse failure on missing input
    pub fn is_input_format_error(&self, stderr: &str) -> bool {
        self.input_format_errors
            .iter()
            .any(|marker| stderr.contains(marker.as_str()))
    }
}

/// Raw TOML configuration for a language
#[derive(Debug, Deserialize)]
struct RawLanguageConfig {
    language_id: u32,
    read_calls: Vec<String>,
    write_calls: Vec<String>,
    #[serde(default)]
    input_format_errors: Vec<String>,
    #[serde(default)]
    aliases: Vec<String>,
}

/// Global language configurations
static LANGUAGES: OnceLock<HashMap<String, LanguageConfig>> = OnceLock::new();

/// Parse language configurations from TOML content, keyed by lowercase name and alias
pub fn parse_languages(content: &str) -> anyhow::Result<HashMap<String, LanguageConfig>> {
    let raw_configs: HashMap<String, RawLanguageConfig> =
        toml::from_str(content).context("Invalid languages.toml")?;

    let mut languages = HashMap::new();

    for (name, raw) in raw_configs {
        if raw.read_calls.is_empty() {
            anyhow::bail!("Language {} declares no read calls", name);
        }
        if raw.write_calls.is_empty() {
            anyhow::bail!("Language {} declares no write calls", name);
        }

        let read_call_pattern = build_read_call_pattern(&raw.read_calls)
            .with_context(|| format!("Invalid read calls for {}", name))?;

        let config = LanguageConfig {
            name: name.to_lowercase(),
            language_id: raw.language_id,
            read_call_pattern,
            read_calls: raw.read_calls,
            write_calls: raw.write_calls,
            input_format_errors: raw.input_format_errors,
        };

        languages.insert(name.to_lowercase(), config.clone());

        for alias in raw.aliases {
            languages.insert(alias.to_lowercase(), config.clone());
        }
    }

    Ok(languages)
}

/// `(?:A|B)\s*\(\s*\)` over the escaped spellings
fn build_read_call_pattern(calls: &[String]) -> Result<Regex, regex::Error> {
    let mut calls: Vec<&str> = calls.iter().map(String::as_str).collect();
    calls.sort_by_key(|call| std::cmp::Reverse(call.len()));
    let alternation = calls
        .iter()
        .map(|call| regex::escape(call))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"(?:{})\s*\(\s*\)", alternation))
}

/// Initialize language configurations from the embedded TOML file
pub fn init_languages() -> anyhow::Result<()> {
    let languages = parse_languages(EMBEDDED_LANGUAGES)?;

    LANGUAGES
        .set(languages)
        .map_err(|_| anyhow::anyhow!("Languages already initialized"))?;

    Ok(())
}

/// Get language configuration by language name
pub fn get_language_config(language: &str) -> Option<LanguageConfig> {
    LANGUAGES.get()?.get(&language.to_lowercase()).cloned()
}

/// Get all supported language names
pub fn get_supported_languages() -> Vec<String> {
    LANGUAGES
        .get()
        .map(|langs| langs.keys().cloned().collect())
        .unwrap_or_default()
}

/// C# configuration parsed from the embedded file, for unit tests
#[cfg(test)]
pub fn csharp() -> LanguageConfig {
    parse_languages(EMBEDDED_LANGUAGES).unwrap()["csharp"].clone()
}
