//! Structural gate
//!
//! Cheap source checks that run before anything is executed.

use std::sync::OnceLock;

use regex::Regex;

use crate::core::Verdict;
use crate::exercises::Exercise;
use crate::languages::LanguageConfig;

/// A structural rejection, with the terminal explanation block
#[derive(Debug, Clone, PartialEq)]
pub struct Rejection {
    pub verdict: Verdict,
    pub feedback: String,
    pub detail: Option<String>,
}

fn formula_token() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"[+\-*/%]|Math\.|\bif\s*\(|\bswitch\b|\bfor\b|\bforeach\b|\bwhile\b|\bdo\b")
            .expect("valid formula pattern")
    })
}

/// Titled terminal block (`HEADING`, a dashed rule, then the body)
pub fn detail_block(heading: &str, body: &str) -> String {
    format!(
        "\n{}\n{}\n{}\n",
        heading,
        "-".repeat(heading.chars().count().max(18)),
        body.trim_end()
    )
}

/// Check for a read call, a write call and some computation on `clean_source`
pub fn gate(exercise: &Exercise, language: &LanguageConfig, clean_source: &str) -> Option<Rejection> {
    if !language.reads_input(clean_source) {
        return Some(Rejection {
            verdict: Verdict::MissingInput,
            feedback: "Missing Input: You need to get data from the user.".into(),
            detail: Some(detail_block(
                "MISSING INPUT",
                "Your code needs to read input from the user.\nTip: Use `Console.ReadLine()`.\nExample: string data = Console.ReadLine();",
            )),
        });
    }

    if !language.writes_output(clean_source) {
        return Some(Rejection {
            verdict: Verdict::MissingOutput,
            feedback: "Missing Output: You need to show the result.".into(),
            detail: Some(detail_block(
                "MISSING RESULT",
                "Your program logic is good, but it doesn't show the answer.\nTip: Use `Console.WriteLine()` to print the result.",
            )),
        });
    }

    if !exercise.skip_formula_gate && !formula_token().is_match(clean_source) {
        return Some(Rejection {
            verdict: Verdict::MissingFormula,
            feedback: "Missing Formula: No calculations found.".into(),
            detail: Some(detail_block(
                "MISSING LOGIC OR FORMULA",
                "You have the Input and Output, but where is the formula?\nYour code needs to calculate the answer.\nTip: Look at the problem description for the formula (using +, -, *, /).",
            )),
        });
    }

    None
}

/// First unmet exercise rule, if any
pub fn check_rules(exercise: &Exercise, clean_source: &str, source: &str) -> Option<Rejection> {
    let rule = exercise
        .rules
        .iter()
        .find(|rule| !rule.is_met(clean_source, source))?;

    let detail = rule.detail.as_deref().map(|body| {
        let heading = rule
            .message
            .split(':')
            .next()
            .unwrap_or(&rule.message)
            .trim()
            .to_uppercase();
        detail_block(&heading, body)
    });

    Some(Rejection {
        verdict: Verdict::RuleViolation,
        feedback: rule.message.clone(),
        detail,
    })
}
