//! Worker jobs
//!
//! Every job names a session and a result key. The session is loaded from the
//! store, changed by one controller call, saved again, and a snapshot is
//! answered on the result key.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::diagnostics::Diagnostic;
use crate::engine::Engine;
use crate::exercises::{Difficulty, Exercise};
use crate::grading;
use crate::progress::{self, ProgressRecord, ProgressStore};
use crate::session::{controller, SessionError, SessionPhase, SessionState};
use crate::store::SessionStore;
use crate::verifier::VerificationOutcome;

/// Worker job enum - represents different types of jobs the worker can process
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "job_type")]
pub enum WorkerJob {
    /// Start an attempt at an exercise
    #[serde(rename = "open")]
    Open(OpenJob),
    /// Replace the session's source
    #[serde(rename = "edit")]
    Edit(EditJob),
    /// Run from the start with no input
    #[serde(rename = "run")]
    Run(SessionJob),
    /// Answer the pending read
    #[serde(rename = "input")]
    Input(InputJob),
    /// Verify and grade the current source
    #[serde(rename = "submit")]
    Submit(SessionJob),
    /// Leave review mode and start over
    #[serde(rename = "retry")]
    Retry(SessionJob),
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OpenJob {
    pub session_id: String,
    pub learner_id: String,
    pub exercise_id: String,
    pub result_key: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EditJob {
    pub session_id: String,
    pub source: String,
    pub result_key: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct InputJob {
    pub session_id: String,
    pub value: String,
    pub result_key: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionJob {
    pub session_id: String,
    pub result_key: String,
}

impl WorkerJob {
    pub fn session_id(&self) -> &str {
        match self {
            WorkerJob::Open(job) => &job.session_id,
            WorkerJob::Edit(job) => &job.session_id,
            WorkerJob::Input(job) => &job.session_id,
            WorkerJob::Run(job) | WorkerJob::Submit(job) | WorkerJob::Retry(job) => {
                &job.session_id
            }
        }
    }

    pub fn result_key(&self) -> &str {
        match self {
            WorkerJob::Open(job) => &job.result_key,
            WorkerJob::Edit(job) => &job.result_key,
            WorkerJob::Input(job) => &job.result_key,
            WorkerJob::Run(job) | WorkerJob::Submit(job) | WorkerJob::Retry(job) => {
                &job.result_key
            }
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            WorkerJob::Open(_) => "open",
            WorkerJob::Edit(_) => "edit",
            WorkerJob::Run(_) => "run",
            WorkerJob::Input(_) => "input",
            WorkerJob::Submit(_) => "submit",
            WorkerJob::Retry(_) => "retry",
        }
    }
}

/// What the UI needs to render a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub session_id: String,
    pub exercise_id: String,
    pub source: String,
    pub transcript: String,
    pub diagnostics: Vec<Diagnostic>,
    pub awaiting_input: bool,
    pub phase: SessionPhase,
    pub review_mode: bool,
    pub last_stars: u8,
    pub best_stars: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_elapsed_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<VerificationOutcome>,
}

impl From<&SessionState> for SessionSnapshot {
    fn from(state: &SessionState) -> Self {
        Self {
            session_id: state.session_id.clone(),
            exercise_id: state.exercise_id.clone(),
            source: state.source.clone(),
            transcript: state.transcript.clone(),
            diagnostics: state.diagnostics.clone(),
            awaiting_input: state.awaiting_input(),
            phase: state.phase,
            review_mode: state.review_mode,
            last_stars: state.last_stars,
            best_stars: state.best_stars,
            previous_elapsed_ms: state.previous_elapsed_ms,
            outcome: state.outcome.clone(),
        }
    }
}

/// Exercise content sent with the answer to an open job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseInfo {
    pub id: String,
    pub module: u32,
    pub title: String,
    pub prompt: String,
    pub hint: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<Difficulty>,
    pub xp_reward: u32,
    pub coin_reward: u32,
    pub target_minutes: f64,
    /// Only revealed once the exercise is completed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub solution: Option<String>,
}

impl ExerciseInfo {
    fn new(exercise: &Exercise, completed: bool) -> Self {
        Self {
            id: exercise.id.clone(),
            module: exercise.module,
            title: exercise.title.clone(),
            prompt: exercise.prompt.clone(),
            hint: exercise.hint.clone(),
            difficulty: exercise.difficulty,
            xp_reward: exercise.xp_reward,
            coin_reward: exercise.coin_reward,
            target_minutes: grading::target_minutes(exercise),
            solution: completed.then(|| exercise.solution.clone()),
        }
    }
}

/// Answer pushed to a job's result key
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobResult {
    pub session_id: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<SessionSnapshot>,
    /// Present for open jobs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exercise: Option<ExerciseInfo>,
    /// Present when a correct submission was recorded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<ProgressRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl JobResult {
    fn completed(handled: Handled) -> Self {
        Self {
            session_id: handled.state.session_id.clone(),
            success: true,
            snapshot: Some((&handled.state).into()),
            exercise: handled.exercise,
            progress: handled.progress,
            error_message: None,
        }
    }

    pub fn failed(session_id: &str, message: impl Into<String>) -> Self {
        Self {
            session_id: session_id.to_string(),
            success: false,
            snapshot: None,
            exercise: None,
            progress: None,
            error_message: Some(message.into()),
        }
    }
}

/// Process one job against the stores.
///
/// Rejections such as input outside `awaiting_input` become failed results;
/// store failures are returned as errors.
pub async fn process_job<S>(
    engine: &Engine,
    store: &mut S,
    job: &WorkerJob,
    now_ms: u64,
) -> Result<JobResult>
where
    S: SessionStore + ProgressStore,
{
    match handle(engine, store, job, now_ms).await {
        Ok(handled) => {
            info!(
                "Job summary: kind={}, session_id={}, phase={:?}, review_mode={}",
                job.kind(),
                handled.state.session_id,
                handled.state.phase,
                handled.state.review_mode
            );
            Ok(JobResult::completed(handled))
        }
        Err(e) => match e.downcast_ref::<SessionError>() {
            Some(rejection) => {
                info!(
                    "Job rejected: kind={}, session_id={}: {}",
                    job.kind(),
                    job.session_id(),
                    rejection
                );
                Ok(JobResult::failed(job.session_id(), rejection.to_string()))
            }
            None => Err(e),
        },
    }
}

/// Session after a job, with what else the answer carries
struct Handled {
    state: SessionState,
    exercise: Option<ExerciseInfo>,
    progress: Option<ProgressRecord>,
}

async fn handle<S>(
    engine: &Engine,
    store: &mut S,
    job: &WorkerJob,
    now_ms: u64,
) -> Result<Handled>
where
    S: SessionStore + ProgressStore,
{
    let mut progress = None;
    let mut info = None;

    let state = match job {
        WorkerJob::Open(job) => {
            let exercise = find_exercise(engine, &job.exercise_id)?;
            let stored = store
                .load_progress(&job.learner_id, &exercise.id)
                .await?;
            let state = controller::open(
                exercise,
                &job.session_id,
                &job.learner_id,
                stored.as_ref(),
                now_ms,
            );
            info = Some(ExerciseInfo::new(exercise, state.completed));
            state
        }
        WorkerJob::Edit(job) => {
            let mut state = load_session(store, &job.session_id).await?;
            controller::edit(&mut state, &job.source)?;
            state
        }
        WorkerJob::Run(job) => {
            let mut state = load_session(store, &job.session_id).await?;
            controller::run(engine, &mut state).await;
            state
        }
        WorkerJob::Input(job) => {
            let mut state = load_session(store, &job.session_id).await?;
            controller::submit_input(engine, &mut state, &job.value).await?;
            state
        }
        WorkerJob::Submit(job) => {
            let mut state = load_session(store, &job.session_id).await?;
            let exercise = find_exercise(engine, &state.exercise_id)?;
            let verification = controller::submit(engine, exercise, &mut state, now_ms).await?;

            let stored = store
                .load_progress(&state.learner_id, &exercise.id)
                .await?;
            if let Some(record) = progress::award(
                exercise,
                &state.learner_id,
                stored.as_ref(),
                &state.source,
                &verification.outcome,
            ) {
                store.save_progress(&record).await?;
                state.best_stars = record.best_stars;
                info!(
                    "Progress saved: learner={}, exercise={}, stars={}, best={}, xp={}, coins={}",
                    record.learner_id,
                    record.exercise_id,
                    record.stars,
                    record.best_stars,
                    record.xp,
                    record.coins
                );
                progress = Some(record);
            }
            state
        }
        WorkerJob::Retry(job) => {
            let mut state = load_session(store, &job.session_id).await?;
            let exercise = find_exercise(engine, &state.exercise_id)?;
            controller::retry(&mut state, exercise, now_ms);
            state
        }
    };

    store.save_session(&state).await?;
    Ok(Handled {
        state,
        exercise: info,
        progress,
    })
}

fn find_exercise<'a>(engine: &'a Engine, exercise_id: &str) -> Result<&'a Exercise> {
    engine.catalog().get(exercise_id).ok_or_else(|| {
        error!("Job names unknown exercise {}", exercise_id);
        SessionError::UnknownExercise(exercise_id.to_string()).into()
    })
}

async fn load_session<S: SessionStore>(store: &mut S, session_id: &str) -> Result<SessionState> {
    store
        .load_session(session_id)
        .await?
        .ok_or_else(|| SessionError::UnknownSession(session_id.to_string()).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::core::Verdict;
    use crate::engine;
    use crate::runner::ScriptedRunner;
    use crate::store::MemoryStore;

    const MINUTE: u64 = 60_000;
    const T0: u64 = 1_700_000_000_000;

    fn sphere(inputs: &[String]) -> String {
        let r: f64 = inputs[0].parse().unwrap_or(0.0);
        format!(
            "The volume of a sphere with radius {} is {:.2} cubic units.\n",
            r,
            4.0 / 3.0 * std::f64::consts::PI * r.powi(3)
        )
    }

    fn sphere_engine() -> Engine {
        engine::scripted(Arc::new(ScriptedRunner::console_program(
            &["Enter the radius of the sphere: "],
            sphere,
        )))
    }

    fn session_job(session_id: &str) -> SessionJob {
        SessionJob {
            session_id: session_id.into(),
            result_key: format!("mp:result:{}", session_id),
        }
    }

    fn open_job(session_id: &str) -> WorkerJob {
        WorkerJob::Open(OpenJob {
            session_id: session_id.into(),
            learner_id: "alice".into(),
            exercise_id: "1.1".into(),
            result_key: format!("mp:result:{}", session_id),
        })
    }

    fn edit_job(session_id: &str, source: &str) -> WorkerJob {
        WorkerJob::Edit(EditJob {
            session_id: session_id.into(),
            source: source.into(),
            result_key: format!("mp:result:{}", session_id),
        })
    }

    fn snapshot(result: &JobResult) -> &SessionSnapshot {
        result.snapshot.as_ref().unwrap()
    }

    #[test]
    fn test_job_json_shape() {
        let job: WorkerJob = serde_json::from_str(
            r#"{"job_type":"input","session_id":"s1","value":"5","result_key":"mp:result:s1"}"#,
        )
        .unwrap();
        assert_eq!(job.kind(), "input");
        assert_eq!(job.session_id(), "s1");
        assert_eq!(job.result_key(), "mp:result:s1");

        assert!(serde_json::from_str::<WorkerJob>(r#"{"job_type":"judge"}"#).is_err());
    }

    #[tokio::test]
    async fn test_open_run_input_flow() {
        let engine = sphere_engine();
        let mut store = MemoryStore::default();
        let solution = engine.catalog().get("1.1").unwrap().solution.clone();

        let opened = process_job(&engine, &mut store, &open_job("s1"), T0).await.unwrap();
        assert!(opened.success);
        assert_eq!(snapshot(&opened).phase, SessionPhase::Idle);
        let info = opened.exercise.as_ref().unwrap();
        assert_eq!(info.title, "Volume of Sphere");
        assert_eq!(info.target_minutes, 5.0);
        assert!(info.solution.is_none());

        process_job(&engine, &mut store, &edit_job("s1", &solution), T0)
            .await
            .unwrap();
        let ran = process_job(&engine, &mut store, &WorkerJob::Run(session_job("s1")), T0)
            .await
            .unwrap();
        assert!(snapshot(&ran).awaiting_input);
        assert_eq!(snapshot(&ran).transcript, "Enter the radius of the sphere: ");

        let input = WorkerJob::Input(InputJob {
            session_id: "s1".into(),
            value: "5".into(),
            result_key: "mp:result:s1".into(),
        });
        let answered = process_job(&engine, &mut store, &input, T0).await.unwrap();
        let snap = snapshot(&answered);
        assert_eq!(snap.phase, SessionPhase::Finished);
        assert!(snap.transcript.starts_with(
            "Enter the radius of the sphere: 5\nThe volume of a sphere with radius 5 is 523.60 cubic units."
        ));

        let again = process_job(&engine, &mut store, &input, T0).await.unwrap();
        assert!(!again.success);
        assert_eq!(
            again.error_message.as_deref(),
            Some("Session is not waiting for input")
        );
    }

    #[tokio::test]
    async fn test_unknown_session_and_exercise() {
        let engine = sphere_engine();
        let mut store = MemoryStore::default();

        let result = process_job(&engine, &mut store, &WorkerJob::Run(session_job("nope")), T0)
            .await
            .unwrap();
        assert!(!result.success);
        assert_eq!(result.error_message.as_deref(), Some("Unknown session: nope"));

        let job = WorkerJob::Open(OpenJob {
            session_id: "s1".into(),
            learner_id: "alice".into(),
            exercise_id: "9.9".into(),
            result_key: "k".into(),
        });
        let result = process_job(&engine, &mut store, &job, T0).await.unwrap();
        assert_eq!(result.error_message.as_deref(), Some("Unknown exercise: 9.9"));
    }

    #[tokio::test]
    async fn test_submit_records_progress_and_best_stars_hold() {
        let engine = sphere_engine();
        let mut store = MemoryStore::default();
        let solution = engine.catalog().get("1.1").unwrap().solution.clone();

        process_job(&engine, &mut store, &open_job("s1"), T0).await.unwrap();
        process_job(&engine, &mut store, &edit_job("s1", &solution), T0)
            .await
            .unwrap();
        let submitted = process_job(
            &engine,
            &mut store,
            &WorkerJob::Submit(session_job("s1")),
            T0 + 2 * MINUTE,
        )
        .await
        .unwrap();

        let record = submitted.progress.as_ref().unwrap();
        assert_eq!(record.stars, 3);
        assert!(record.first_completion);
        assert_eq!(record.xp, 20);
        let snap = snapshot(&submitted);
        assert!(snap.review_mode);
        assert_eq!(snap.outcome.as_ref().unwrap().verdict, Verdict::Accepted);

        let frozen = process_job(&engine, &mut store, &edit_job("s1", "x"), T0)
            .await
            .unwrap();
        assert!(!frozen.success);

        let t1 = T0 + 60 * MINUTE;
        process_job(&engine, &mut store, &WorkerJob::Retry(session_job("s1")), t1)
            .await
            .unwrap();
        process_job(&engine, &mut store, &edit_job("s1", &solution), t1)
            .await
            .unwrap();
        let slow = process_job(
            &engine,
            &mut store,
            &WorkerJob::Submit(session_job("s1")),
            t1 + 12 * MINUTE,
        )
        .await
        .unwrap();

        let record = slow.progress.as_ref().unwrap();
        assert_eq!(record.stars, 1);
        assert_eq!(record.best_stars, 3);
        assert_eq!(record.stars_to_add, 0);
        assert!(!record.first_completion);
        assert_eq!(snapshot(&slow).best_stars, 3);
        assert_eq!(snapshot(&slow).last_stars, 1);

        let stored = store.load_progress("alice", "1.1").await.unwrap().unwrap();
        assert_eq!(stored.best_stars, 3);
        assert_eq!(stored.last_elapsed_ms, Some(12 * MINUTE));

        let totals = store.totals("alice");
        assert_eq!(totals.stars, 3);
        assert_eq!(totals.xp, 20);
        assert_eq!(totals.coins, 5);

        let reopened = process_job(&engine, &mut store, &open_job("s2"), t1 + 20 * MINUTE)
            .await
            .unwrap();
        let snap = snapshot(&reopened);
        assert!(snap.review_mode);
        assert_eq!(
            reopened.exercise.as_ref().unwrap().solution.as_deref(),
            Some(solution.as_str())
        );
        assert_eq!(snap.source, solution);
        assert_eq!(snap.previous_elapsed_ms, Some(12 * MINUTE));
    }

    #[tokio::test]
    async fn test_wrong_submission_records_nothing() {
        let engine = sphere_engine();
        let mut store = MemoryStore::default();

        process_job(&engine, &mut store, &open_job("s1"), T0).await.unwrap();
        let submitted = process_job(
            &engine,
            &mut store,
            &WorkerJob::Submit(session_job("s1")),
            T0 + MINUTE,
        )
        .await
        .unwrap();

        assert!(submitted.success);
        assert!(submitted.progress.is_none());
        let outcome = snapshot(&submitted).outcome.clone().unwrap();
        assert!(!outcome.correct);
        assert_eq!(outcome.verdict, Verdict::MissingInput);
        assert!(store.load_progress("alice", "1.1").await.unwrap().is_none());
        assert_eq!(store.totals("alice"), Default::default());
    }
}
