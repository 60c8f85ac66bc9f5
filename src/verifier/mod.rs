//! Verification engine
//!
//! Decides whether a submitted program solves an exercise. The pipeline
//! short-circuits on the first failure:
//! 1. structural gate and exercise rules on the comment-stripped source
//! 2. one echo-only execution per canonical test input
//! 3. output comparison against the expected transcript
//! 4. time-based grading once every input passes
//!
//! Verification executes independently of any live interactive session.

pub mod compare;
pub mod structure;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use self::compare::{compare, normalize, Comparison};
use self::structure::{detail_block, Rejection};
use crate::core::Verdict;
use crate::diagnostics::strip_comments;
use crate::engine::Engine;
use crate::exercises::Exercise;
use crate::grading;
use crate::runner::RunStatus;
use crate::shim::{shim, ShimMode};

pub const MISSING_DATA_FEEDBACK: &str =
    "Configuration Error: This challenge is missing verification tests. Please report this to the developer.";

/// Result of verifying one submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationOutcome {
    pub correct: bool,
    /// 0 when incorrect
    pub stars: u8,
    pub verdict: Verdict,
    pub feedback: String,
    /// Solving time; 0 when incorrect
    pub elapsed_ms: u64,
}

impl VerificationOutcome {
    fn failed(verdict: Verdict, feedback: impl Into<String>) -> Self {
        Self {
            correct: false,
            stars: 0,
            verdict,
            feedback: feedback.into(),
            elapsed_ms: 0,
        }
    }
}

/// Outcome plus the terminal text produced while verifying
#[derive(Debug, Clone, PartialEq)]
pub struct Verification {
    pub outcome: VerificationOutcome,
    /// Appended to the session transcript as-is
    pub log: String,
}

impl Verification {
    fn fail(mut log: String, outcome: VerificationOutcome, detail: Option<&str>) -> Self {
        if let Some(detail) = detail {
            log.push_str(detail);
        }
        log.push_str("\n\n");
        log.push_str(&outcome.feedback);
        Self { outcome, log }
    }

    fn rejected(rejection: Rejection) -> Self {
        let outcome = VerificationOutcome::failed(rejection.verdict, rejection.feedback);
        Self::fail(String::new(), outcome, rejection.detail.as_deref())
    }
}

/// Verify `source` against `exercise`, grading with `elapsed_ms` on success
pub async fn verify(
    engine: &Engine,
    exercise: &Exercise,
    source: &str,
    elapsed_ms: u64,
) -> Verification {
    let clean = strip_comments(source);

    if let Some(rejection) = structure::gate(exercise, engine.language(), &clean)
        .or_else(|| structure::check_rules(exercise, &clean, source))
    {
        info!(
            "Exercise {} rejected before execution: {}",
            exercise.id, rejection.verdict
        );
        return Verification::rejected(rejection);
    }

    let Some(expected_output) = exercise.expected.filter(|_| !exercise.test_inputs.is_empty())
    else {
        error!(
            "Exercise {} has no test inputs or expected output; refusing to verify",
            exercise.id
        );
        return Verification::fail(
            String::new(),
            VerificationOutcome::failed(Verdict::MissingVerificationData, MISSING_DATA_FEEDBACK),
            None,
        );
    };

    let shimmed = shim(source, engine.language(), ShimMode::EchoOnly);
    let mut log = String::from("Verifying solution...\n");

    for (idx, input) in exercise.test_inputs.iter().enumerate() {
        let run = match engine.execute(&shimmed, input).await {
            Ok(run) => run,
            Err(e) => {
                warn!("Verification run {} of {} failed: {}", idx + 1, exercise.id, e);
                let outcome = VerificationOutcome::failed(
                    Verdict::SystemError,
                    format!("System Error during verification: {}", e),
                );
                return Verification::fail(log, outcome, None);
            }
        };

        if !run.stderr.trim().is_empty() {
            let verdict = match run.status {
                RunStatus::CompileError => Verdict::CompileError,
                _ => Verdict::RuntimeError,
            };
            let outcome = VerificationOutcome::failed(
                verdict,
                format!("Compilation/Runtime Error:\n{}", run.stderr),
            );
            return Verification::fail(log, outcome, None);
        }

        let printed = if run.stdout.is_empty() {
            "(no output)"
        } else {
            run.stdout.as_str()
        };
        log.push_str(&format!(
            "\nTest Input: {}\nOutput:\n{}\n",
            input.replace('\n', " "),
            printed
        ));

        let Some(expected) = expected_output.expected(input, &clean, &run.stdout) else {
            error!(
                "Exercise {} produced no expected output for input {:?}",
                exercise.id, input
            );
            let outcome = VerificationOutcome::failed(
                Verdict::MissingVerificationData,
                MISSING_DATA_FEEDBACK,
            );
            return Verification::fail(log, outcome, None);
        };

        let comparison = compare(input, &expected, &run.stdout);
        debug!(
            "Exercise {} input {}: {:?}",
            exercise.id,
            idx + 1,
            comparison
        );
        if comparison.is_pass() {
            continue;
        }
        if let Some((outcome, detail)) = explain(comparison, input, &expected, &run.stdout) {
            return Verification::fail(log, outcome, detail.as_deref());
        }
    }

    log.push_str("\nValidation Passed! All tests correct.\n");

    let stars = grading::grade(exercise, elapsed_ms);
    let feedback = format!(
        "All tests passed!\n{}",
        grading::time_summary(exercise, elapsed_ms)
    );
    log.push_str(&format!("\n\n{}\nYou earned {} Stars!", feedback, stars));

    info!("Exercise {} accepted with {} stars", exercise.id, stars);
    Verification {
        outcome: VerificationOutcome {
            correct: true,
            stars,
            verdict: Verdict::Accepted,
            feedback,
            elapsed_ms,
        },
        log,
    }
}

/// Feedback line and terminal block for a failed comparison; `None` when it passed
fn explain(
    comparison: Comparison,
    input: &str,
    expected: &str,
    actual: &str,
) -> Option<(VerificationOutcome, Option<String>)> {
    let norm_expected = normalize(expected);
    let norm_actual = normalize(actual);

    let explained = match comparison {
        Comparison::Contains | Comparison::NumericMatch => return None,
        Comparison::NoOutput => (
            VerificationOutcome::failed(
                Verdict::NoOutput,
                "Missing Output: Your code didn't print anything.",
            ),
            Some(detail_block(
                "MISSING OUTPUT",
                "Your code ran successfully, but it didn't show any results.\nYou need to print the answer to the screen.\nTip: Use `Console.WriteLine()`.\nExample: Console.WriteLine(\"The volume is: \" + volume);",
            )),
        ),
        Comparison::NoDigits => (
            VerificationOutcome::failed(
                Verdict::MissingResult,
                "Your code ran, but I don't see the answer in the output. Did you forget to print the result using `Console.WriteLine()`?",
            ),
            None,
        ),
        Comparison::MissingText => {
            let preview: String = norm_expected.chars().take(30).collect();
            (
                VerificationOutcome::failed(
                    Verdict::MissingText,
                    "Missing Text: You printed the correct number, but missing the descriptive text or prompts.",
                ),
                Some(detail_block(
                    "MISSING TEXT/PROMPTS",
                    &format!(
                        "Your calculated answer is correct, but the output format is too simple.\nExpected something like: {}...\nActual: {}\nTip: Include the text prompts as asked in the problem.",
                        preview, norm_actual
                    ),
                )),
            )
        }
        Comparison::EchoOnly => (
            VerificationOutcome::failed(
                Verdict::MissingResult,
                "Missing Output: You didn't print the answer.",
            ),
            Some(detail_block(
                "MISSING RESULT",
                "You printed the input (or prompt), but I don't see the calculated answer.\nYou need to print the result using `Console.WriteLine()`.\nExample: Console.WriteLine(result);",
            )),
        ),
        Comparison::Mismatch { closest_line } => {
            let mut feedback = format!("Test Failed. Expected: \"{}\"", norm_expected);
            if let Some(line) = &closest_line {
                feedback.push_str(&format!("\nClosest line: \"{}\"", line));
            }
            (
                VerificationOutcome::failed(Verdict::WrongAnswer, feedback),
                Some(detail_block(
                    "WRONG OUTPUT",
                    &format!(
                        "INPUT:    {}\nEXPECTED: \"{}\"\nACTUAL:   \"{}\"",
                        input.replace('\n', " "),
                        norm_expected,
                        norm_actual
                    ),
                )),
            )
        }
    };
    Some(explained)
}
