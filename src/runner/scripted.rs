//! Scripted runner for tests
//!
//! Answers every request from a closure and records what was sent, so session and
//! verification logic can be exercised without a network.

use std::sync::Mutex;

use async_trait::async_trait;

use super::{ExecutionError, RunOutcome, RunRequest, RunStatus, Runner};
use crate::shim::{INPUT_MARKER, INPUT_SENTINEL};

type Script = dyn Fn(&RunRequest) -> Result<RunOutcome, ExecutionError> + Send + Sync;

/// Runner whose behaviour is a plain function of the request
pub struct ScriptedRunner {
    script: Box<Script>,
    requests: Mutex<Vec<RunRequest>>,
}

impl ScriptedRunner {
    pub fn new(
        script: impl Fn(&RunRequest) -> Result<RunOutcome, ExecutionError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            script: Box::new(script),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Emulates a shimmed console program.
    ///
    /// Each prompt is written, then one input line is consumed. With the interactive
    /// shim, missing input fails with the sentinel and consumed values are echoed behind
    /// the marker byte; with the echo-only shim they are echoed plainly and missing
    /// input reads as an empty line. `finish` renders the rest of stdout from the inputs.
    pub fn console_program(
        prompts: &'static [&'static str],
        finish: fn(&[String]) -> String,
    ) -> Self {
        Self::new(move |request| {
            let interactive = request.source.contains(INPUT_SENTINEL);
            let mut lines = request.stdin.lines().map(str::to_string);
            let mut stdout = String::new();
            let mut consumed = Vec::new();

            for prompt in prompts {
                stdout.push_str(prompt);
                match lines.next() {
                    Some(value) => {
                        if interactive {
                            stdout.push(INPUT_MARKER);
                        }
                        stdout.push_str(&value);
                        stdout.push('\n');
                        consumed.push(value);
                    }
                    None if interactive => {
                        return Ok(RunOutcome {
                            stdout,
                            stderr: format!(
                                "Unhandled Exception:\nSystem.Exception: {}\n  at _InputShim.ReadLine ()",
                                INPUT_SENTINEL
                            ),
                            status: RunStatus::RuntimeError,
                        });
                    }
                    None => consumed.push(String::new()),
                }
            }

            stdout.push_str(&finish(&consumed));
            Ok(RunOutcome {
                stdout,
                stderr: String::new(),
                status: RunStatus::Accepted,
            })
        })
    }

    /// Runner that always prints the same stdout
    pub fn fixed_stdout(stdout: &'static str) -> Self {
        Self::new(move |_| {
            Ok(RunOutcome {
                stdout: stdout.to_string(),
                stderr: String::new(),
                status: RunStatus::Accepted,
            })
        })
    }

    /// Requests received so far
    pub fn requests(&self) -> Vec<RunRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl Runner for ScriptedRunner {
    async fn run(&self, request: &RunRequest) -> Result<RunOutcome, ExecutionError> {
        self.requests.lock().unwrap().push(request.clone());
        (self.script)(request)
    }
}
