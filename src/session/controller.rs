//! Session controller
//!
//! Simulates an interactive terminal on top of a batch execution service: every
//! learner input re-runs the whole shimmed program with the full input history
//! as stdin. A run with n inputs therefore costs n + 1 executions in total.

use tracing::{debug, info, warn};

use super::transcript::{self, RunEnd};
use super::{SessionError, SessionPhase, SessionState};
use crate::diagnostics::{lint, parse_compiler_output, syntax_error_report};
use crate::engine::Engine;
use crate::exercises::Exercise;
use crate::progress::StoredProgress;
use crate::shim::{shim, ShimMode, INPUT_SENTINEL};
use crate::verifier::{self, Verification};

/// Fresh session for `exercise`; a completed exercise opens in review mode
pub fn open(
    exercise: &Exercise,
    session_id: &str,
    learner_id: &str,
    stored: Option<&StoredProgress>,
    now_ms: u64,
) -> SessionState {
    let completed = stored.is_some_and(|p| p.completed);
    let previous_source = stored.and_then(|p| p.last_source.clone());

    let source = match (&previous_source, completed) {
        (Some(source), true) => source.clone(),
        _ => exercise.starter.clone(),
    };

    SessionState {
        session_id: session_id.to_string(),
        learner_id: learner_id.to_string(),
        exercise_id: exercise.id.clone(),
        source,
        transcript: String::new(),
        diagnostics: Vec::new(),
        inputs: Vec::new(),
        phase: SessionPhase::Idle,
        review_mode: completed,
        started_at_ms: now_ms,
        last_stars: 0,
        best_stars: stored.map_or(0, |p| p.best_stars),
        completed,
        previous_source,
        previous_elapsed_ms: stored.and_then(|p| p.last_elapsed_ms),
        outcome: None,
    }
}

/// Replace the source
pub fn edit(state: &mut SessionState, source: &str) -> Result<(), SessionError> {
    if state.review_mode {
        return Err(SessionError::ReviewMode);
    }
    state.source = source.to_string();
    Ok(())
}

/// Leave review mode and start over from the starter source
pub fn retry(state: &mut SessionState, exercise: &Exercise, now_ms: u64) {
    state.review_mode = false;
    state.source = exercise.starter.clone();
    state.transcript.clear();
    state.diagnostics.clear();
    state.inputs.clear();
    state.phase = SessionPhase::Idle;
    state.started_at_ms = now_ms;
    state.outcome = None;
}

/// Start a run with no input; blocked by lint errors
pub async fn run(engine: &Engine, state: &mut SessionState) {
    let findings = lint(&state.source);
    if !findings.is_empty() {
        info!(
            "Session {}: run blocked by {} syntax finding(s)",
            state.session_id,
            findings.len()
        );
        state.transcript = syntax_error_report(&findings);
        state.diagnostics = findings;
        state.inputs.clear();
        state.phase = SessionPhase::Failed;
        return;
    }

    state.diagnostics.clear();
    state.inputs.clear();
    state.phase = SessionPhase::Running;
    execute_with_history(engine, state).await;
}

/// Answer the pending read and replay the program with the longer history
pub async fn submit_input(
    engine: &Engine,
    state: &mut SessionState,
    value: &str,
) -> Result<(), SessionError> {
    if !state.awaiting_input() {
        return Err(SessionError::NotAwaitingInput);
    }
    state.inputs.push(value.to_string());
    state.phase = SessionPhase::Running;
    execute_with_history(engine, state).await;
    Ok(())
}

async fn execute_with_history(engine: &Engine, state: &mut SessionState) {
    let shimmed = shim(&state.source, engine.language(), ShimMode::Interactive);
    let stdin = state.inputs.join("\n");

    let run = match engine.execute(&shimmed, &stdin).await {
        Ok(run) => run,
        Err(e) => {
            warn!("Session {}: execution failed: {}", state.session_id, e);
            state.transcript = transcript::system_error(&e.to_string());
            state.phase = SessionPhase::Failed;
            return;
        }
    };

    let needs_input = run.stderr.contains(INPUT_SENTINEL)
        || engine.language().is_input_format_error(&run.stderr);

    let end = if needs_input {
        RunEnd::AwaitingInput
    } else if !run.stderr.is_empty() {
        state.diagnostics = parse_compiler_output(&run.stderr);
        RunEnd::Failed(run.stderr.clone())
    } else {
        RunEnd::Finished
    };

    state.transcript = transcript::reconcile(&run.stdout, &end);
    state.phase = match end {
        RunEnd::AwaitingInput => SessionPhase::AwaitingInput,
        RunEnd::Failed(_) => SessionPhase::Failed,
        RunEnd::Finished => SessionPhase::Finished,
    };

    debug!(
        "Session {}: {} input(s) replayed, phase {:?}",
        state.session_id,
        state.inputs.len(),
        state.phase
    );
}

/// Verify the current source; the first correct submission enters review mode
pub async fn submit(
    engine: &Engine,
    exercise: &Exercise,
    state: &mut SessionState,
    now_ms: u64,
) -> Result<Verification, SessionError> {
    if state.review_mode {
        return Err(SessionError::ReviewMode);
    }

    let elapsed_ms = now_ms.saturating_sub(state.started_at_ms);
    let verification = verifier::verify(engine, exercise, &state.source, elapsed_ms).await;
    let outcome = &verification.outcome;

    state.transcript = verification.log.clone();
    state.inputs.clear();
    state.outcome = Some(outcome.clone());

    if outcome.correct {
        state.phase = SessionPhase::Finished;
        state.last_stars = outcome.stars;
        state.best_stars = state.best_stars.max(outcome.stars);
        state.completed = true;
        state.review_mode = true;
        state.previous_source = Some(state.source.clone());
        state.previous_elapsed_ms = Some(elapsed_ms);
    } else {
        state.phase = SessionPhase::Failed;
    }

    Ok(verification)
}
