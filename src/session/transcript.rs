//! Transcript reconciliation for replayed runs

use crate::shim::INPUT_MARKER;

pub const SUCCESS_FOOTER: &str = "\n\nCode Execution Successful.";

pub const NO_OUTPUT_HINT: &str = "Code executed successfully but produced no output.\nHint: Use Console.WriteLine() to print to the console.";

/// How a replayed run ended
#[derive(Debug, Clone, PartialEq)]
pub enum RunEnd {
    /// The program asked for more input than the history holds
    AwaitingInput,
    /// The program failed; carries the error text shown to the learner
    Failed(String),
    Finished,
}

/// Turn raw shimmed stdout into what the terminal shows.
///
/// Echoed inputs are pulled onto their prompt line and marker bytes removed.
/// While awaiting input the trailing newlines go, so the cursor stays on the prompt.
pub fn reconcile(stdout: &str, end: &RunEnd) -> String {
    let mut out = stdout.replace("\r\n", "\n");

    if *end == RunEnd::AwaitingInput {
        let kept = out.trim_end_matches(['\r', '\n']).len();
        out.truncate(kept);
    }

    let marked_line = format!("\n{}", INPUT_MARKER);
    let mut out = out.replace(&marked_line, "").replace(INPUT_MARKER, "");

    match end {
        RunEnd::AwaitingInput => {}
        RunEnd::Failed(error) => {
            out.push_str("\nError:\n");
            out.push_str(error);
        }
        RunEnd::Finished => {
            if out.trim().is_empty() {
                out = NO_OUTPUT_HINT.to_string();
            } else {
                out.push_str(SUCCESS_FOOTER);
            }
        }
    }
    out
}

/// Transcript for a run that never reached the execution service
pub fn system_error(message: &str) -> String {
    format!("System Error: {}", message)
}
