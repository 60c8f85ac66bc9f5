use serde::{Deserialize, Serialize};
use std::fmt;

/// Verdict from verifying a submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Accepted,
    /// No console read call in the source
    MissingInput,
    /// No console write call in the source
    MissingOutput,
    /// No arithmetic, math call, conditional or loop in the source
    MissingFormula,
    /// An exercise-specific structural rule was not met
    RuleViolation,
    CompileError,
    RuntimeError,
    /// The program ran but printed nothing
    NoOutput,
    /// Expected a computed number, found none (or only input echoes)
    MissingResult,
    /// Right number, missing the surrounding text
    MissingText,
    WrongAnswer,
    /// The exercise cannot be verified (no test inputs or no expected output)
    MissingVerificationData,
    /// Execution service failure
    SystemError,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Verdict::Accepted => "accepted",
            Verdict::MissingInput => "missing_input",
            Verdict::MissingOutput => "missing_output",
            Verdict::MissingFormula => "missing_formula",
            Verdict::RuleViolation => "rule_violation",
            Verdict::CompileError => "compile_error",
            Verdict::RuntimeError => "runtime_error",
            Verdict::NoOutput => "no_output",
            Verdict::MissingResult => "missing_result",
            Verdict::MissingText => "missing_text",
            Verdict::WrongAnswer => "wrong_answer",
            Verdict::MissingVerificationData => "missing_verification_data",
            Verdict::SystemError => "system_error",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_matches_serde_name() {
        for verdict in [
            Verdict::Accepted,
            Verdict::MissingFormula,
            Verdict::MissingVerificationData,
            Verdict::WrongAnswer,
        ] {
            let json = serde_json::to_string(&verdict).unwrap();
            assert_eq!(json, format!("\"{}\"", verdict));
        }
    }
}
