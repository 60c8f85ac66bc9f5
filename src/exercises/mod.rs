//! Exercise catalog
//!
//! Exercises are static content loaded once at startup, from the embedded
//! `files/exercises.toml` or from the file named by `EXERCISES_PATH`.

pub mod reference;
pub mod rules;

use std::collections::HashSet;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use self::reference::ExpectedOutput;
use self::rules::{RawRule, Rule};

const EMBEDDED_EXERCISES: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/files/exercises.toml"));

/// Default rewards when the catalog omits them
pub const DEFAULT_XP_REWARD: u32 = 20;
pub const DEFAULT_COIN_REWARD: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

/// One machine problem
#[derive(Debug, Clone)]
pub struct Exercise {
    pub id: String,
    pub module: u32,
    pub title: String,
    pub prompt: String,
    pub hint: String,
    pub starter: String,
    /// Display only, never executed
    pub solution: String,
    pub difficulty: Option<Difficulty>,
    pub xp_reward: u32,
    pub coin_reward: u32,
    pub target_minutes: Option<f64>,
    /// Exempt from the generic "performs a computation" check
    pub skip_formula_gate: bool,
    /// Each entry is a whole stdin blob, lines joined by `\n`
    pub test_inputs: Vec<String>,
    pub expected: Option<ExpectedOutput>,
    pub rules: Vec<Rule>,
}

#[derive(Debug, Deserialize)]
struct RawCatalog {
    #[serde(default)]
    exercise: Vec<RawExercise>,
}

#[derive(Debug, Deserialize)]
struct RawExercise {
    id: String,
    module: u32,
    title: String,
    prompt: String,
    #[serde(default)]
    hint: String,
    starter: String,
    #[serde(default)]
    solution: String,
    difficulty: Option<Difficulty>,
    xp_reward: Option<u32>,
    coin_reward: Option<u32>,
    target_minutes: Option<f64>,
    #[serde(default)]
    skip_formula_gate: bool,
    #[serde(default)]
    test_inputs: Vec<String>,
    expected: Option<String>,
    #[serde(default, rename = "rule")]
    rules: Vec<RawRule>,
}

impl RawExercise {
    fn compile(self) -> Result<Exercise> {
        let expected = match self.expected.as_deref() {
            Some(name) => {
                let found = reference::lookup(name);
                if found.is_none() {
                    error!(
                        "Exercise {} names unknown expected output '{}'; it cannot be verified",
                        self.id, name
                    );
                }
                found
            }
            None => None,
        };

        let rules = self
            .rules
            .into_iter()
            .map(Rule::compile)
            .collect::<Result<Vec<_>>>()
            .with_context(|| format!("Invalid rules for exercise {}", self.id))?;

        Ok(Exercise {
            id: self.id,
            module: self.module,
            title: self.title,
            prompt: self.prompt,
            hint: self.hint,
            starter: self.starter,
            solution: self.solution,
            difficulty: self.difficulty,
            xp_reward: self.xp_reward.unwrap_or(DEFAULT_XP_REWARD),
            coin_reward: self.coin_reward.unwrap_or(DEFAULT_COIN_REWARD),
            target_minutes: self.target_minutes,
            skip_formula_gate: self.skip_formula_gate,
            test_inputs: self.test_inputs,
            expected,
            rules,
        })
    }
}

/// All exercises in catalog order
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    exercises: Vec<Exercise>,
}

impl Catalog {
    pub fn get(&self, id: &str) -> Option<&Exercise> {
        self.exercises.iter().find(|e| e.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Exercise> {
        self.exercises.iter()
    }

    pub fn len(&self) -> usize {
        self.exercises.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exercises.is_empty()
    }
}

/// Parse and compile a catalog from TOML content
pub fn parse_catalog(content: &str) -> Result<Catalog> {
    let raw: RawCatalog = toml::from_str(content).context("Invalid exercise catalog")?;

    let mut seen = HashSet::new();
    let mut exercises = Vec::with_capacity(raw.exercise.len());
    for exercise in raw.exercise {
        if !seen.insert(exercise.id.clone()) {
            anyhow::bail!("Duplicate exercise id {}", exercise.id);
        }
        exercises.push(exercise.compile()?);
    }

    Ok(Catalog { exercises })
}

/// Load the catalog from `path`, or the embedded one when `None`
pub fn load_catalog(path: Option<&str>) -> Result<Catalog> {
    let catalog = match path {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read exercise catalog {}", path))?;
            parse_catalog(&content)?
        }
        None => parse_catalog(EMBEDDED_EXERCISES)?,
    };

    if catalog.is_empty() {
        anyhow::bail!("Exercise catalog {} is empty", path.unwrap_or("embedded"));
    }
    for exercise in catalog
        .iter()
        .filter(|e| e.test_inputs.is_empty() || e.expected.is_none())
    {
        warn!(
            "Exercise {} has no test inputs or expected output; submissions will fail closed",
            exercise.id
        );
    }

    info!(
        "Loaded {} exercises ({})",
        catalog.len(),
        path.unwrap_or("embedded")
    );
    Ok(catalog)
}

/// The embedded catalog, for unit tests
#[cfg(test)]
pub fn embedded() -> Catalog {
    parse_catalog(EMBEDDED_EXERCISES).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_embedded_catalog_is_complete() {
        let catalog = embedded();
        assert_eq!(catalog.len(), 10);
        for exercise in catalog.iter() {
            assert!(!exercise.test_inputs.is_empty(), "{} has no inputs", exercise.id);
            assert!(exercise.expected.is_some(), "{} has no expected output", exercise.id);
            assert!(!exercise.starter.is_empty());
        }
        let conversion = catalog.get("1.7").unwrap();
        assert!(conversion.skip_formula_gate);
        assert_eq!(catalog.get("1.9").unwrap().difficulty, Some(Difficulty::Hard));
    }

    #[test]
    fn test_defaults_for_rewards() {
        let catalog = parse_catalog(
            r#"
[[exercise]]
id = "x.1"
module = 9
title = "Echo"
prompt = "Print it"
starter = "class P {}"
"#,
        )
        .unwrap();
        let exercise = catalog.get("x.1").unwrap();
        assert_eq!(exercise.xp_reward, DEFAULT_XP_REWARD);
        assert_eq!(exercise.coin_reward, DEFAULT_COIN_REWARD);
        assert!(exercise.expected.is_none());
        assert!(exercise.rules.is_empty());
    }

    #[test]
    fn test_duplicate_ids_are_rejected() {
        let entry = "[[exercise]]\nid = \"a\"\nmodule = 1\ntitle = \"t\"\nprompt = \"p\"\nstarter = \"s\"\n";
        assert!(parse_catalog(&format!("{}{}", entry, entry)).is_err());
    }

    #[test]
    fn test_unknown_expected_name_fails_closed() {
        let catalog = parse_catalog(
            "[[exercise]]\nid = \"a\"\nmodule = 1\ntitle = \"t\"\nprompt = \"p\"\nstarter = \"s\"\nexpected = \"nope\"\n",
        )
        .unwrap();
        assert!(catalog.get("a").unwrap().expected.is_none());
    }

    #[test]
    fn test_load_catalog_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
[[exercise]]
id = "2.1"
module = 2
title = "Sphere again"
prompt = "p"
starter = "s"
difficulty = "medium"
test_inputs = ["5"]
expected = "sphere_volume"

[[exercise.rule]]
all_of = ['Math\.PI']
message = "Use Math.PI"
"#
        )
        .unwrap();

        let catalog = load_catalog(file.path().to_str()).unwrap();
        let exercise = catalog.get("2.1").unwrap();
        assert_eq!(exercise.difficulty, Some(Difficulty::Medium));
        assert_eq!(exercise.rules.len(), 1);
        assert!(load_catalog(Some("/nonexistent/exercises.toml")).is_err());
    }
}
