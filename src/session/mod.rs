//! Interactive sessions
//!
//! A session is one learner's attempt at one exercise. Its state is a single
//! owned value; the functions in [`controller`] are the only writers.

pub mod controller;
pub mod transcript;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::diagnostics::Diagnostic;
use crate::verifier::VerificationOutcome;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Idle,
    Running,
    AwaitingInput,
    Finished,
    Failed,
}

#[derive(Debug, Error, PartialEq)]
pub enum SessionError {
    #[error("Session is not waiting for input")]
    NotAwaitingInput,
    #[error("Exercise is in review mode; retry to edit it again")]
    ReviewMode,
    #[error("Unknown exercise: {0}")]
    UnknownExercise(String),
    #[error("Unknown session: {0}")]
    UnknownSession(String),
}

/// Mutable state of one attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub session_id: String,
    pub learner_id: String,
    pub exercise_id: String,
    pub source: String,
    pub transcript: String,
    pub diagnostics: Vec<Diagnostic>,
    /// Every value entered since the last run, in order
    pub inputs: Vec<String>,
    pub phase: SessionPhase,
    /// Set by the first correct submission; editing is frozen until retry
    pub review_mode: bool,
    /// Attempt start (ms since epoch)
    pub started_at_ms: u64,
    pub last_stars: u8,
    /// Best stars known for this learner and exercise
    pub best_stars: u8,
    pub completed: bool,
    pub previous_source: Option<String>,
    pub previous_elapsed_ms: Option<u64>,
    pub outcome: Option<VerificationOutcome>,
}

impl SessionState {
    pub fn awaiting_input(&self) -> bool {
        self.phase == SessionPhase::AwaitingInput
    }
}
