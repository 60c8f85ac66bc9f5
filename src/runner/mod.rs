//! Runner module - Remote execution abstraction layer
//!
//! This module provides a unified interface for running programs:
//! - `Judge0Runner`: submits source + stdin to a Judge0 instance and waits for the result
//! - `ScriptedRunner` (tests only): answers from a closure instead of the network
//!
//! The runner module does NOT:
//! - Rewrite sources or inject input shims
//! - Compare outputs or determine verdicts
//! - Know about sessions or exercises

pub mod judge0;
#[cfg(test)]
pub mod scripted;

use async_trait::async_trait;
use thiserror::Error;

/// One complete program run request
#[derive(Debug, Clone)]
pub struct RunRequest {
    /// Judge0 language id
    pub language_id: u32,
    /// Full program source
    pub source: String,
    /// Entire stdin for the run
    pub stdin: String,
}

impl RunRequest {
    pub fn new(language_id: u32, source: impl Into<String>) -> Self {
        Self {
            language_id,
            source: source.into(),
            stdin: String::new(),
        }
    }

    pub fn with_stdin(mut self, stdin: impl Into<String>) -> Self {
        self.stdin = stdin.into();
        self
    }
}

/// Execution status (raw, no verdict interpretation)
#[derive(Debug, Clone, PartialEq)]
pub enum RunStatus {
    /// Program ran to completion
    Accepted,
    /// Source did not compile
    CompileError,
    /// Time limit exceeded on the remote side
    TimeLimitExceeded,
    /// Program crashed (non-zero exit, signal, exception)
    RuntimeError,
    /// Remote service internal error or unexpected state
    SystemError,
}

/// Outcome of running a program
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// Stdout content
    pub stdout: String,
    /// Stderr, compiler output and service message joined by newlines
    pub stderr: String,
    /// Execution status
    pub status: RunStatus,
}

/// Failures reaching or talking to the execution service
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("Configuration Error: {0}")]
    Configuration(String),
    #[error("Failed to connect to compiler service: {0}")]
    Http(String),
    #[error("Execution failed: {status} - {body}")]
    Service { status: u16, body: String },
    #[error("Malformed execution response: {0}")]
    Malformed(String),
}

/// Runner trait for executing programs
#[async_trait]
pub trait Runner: Send + Sync {
    /// Run the program once to completion or failure
    async fn run(&self, request: &RunRequest) -> Result<RunOutcome, ExecutionError>;
}

pub use judge0::Judge0Runner;
#[cfg(test)]
pub use scripted::ScriptedRunner;
