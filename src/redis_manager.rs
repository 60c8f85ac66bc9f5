//! Redis Manager - Centralized Redis connection and operations
//!
//! This module handles all Redis-related operations including:
//! - Job queue operations (BLPOP)
//! - Job results (RPUSH to the job's result key)
//! - Session state between jobs
//! - Learner progress and running totals

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use tracing::{info, warn};

use crate::jobs::{JobResult, WorkerJob};
use crate::progress::{ProgressRecord, ProgressStore, StoredProgress};
use crate::session::SessionState;
use crate::store::SessionStore;

/// Redis key constants
pub mod keys {
    /// Job queue key
    pub const JOB_QUEUE: &str = "mp:queue";

    /// Session state key prefix (`mp:session:<session_id>`)
    pub const SESSION_PREFIX: &str = "mp:session:";

    /// Per-exercise progress key prefix (`mp:progress:<learner_id>:<exercise_id>`)
    pub const PROGRESS_PREFIX: &str = "mp:progress:";

    /// Learner totals hash prefix (`mp:learner:<learner_id>`)
    pub const LEARNER_PREFIX: &str = "mp:learner:";

    pub fn session(session_id: &str) -> String {
        format!("{}{}", SESSION_PREFIX, session_id)
    }

    pub fn progress(learner_id: &str, exercise_id: &str) -> String {
        format!("{}{}:{}", PROGRESS_PREFIX, learner_id, exercise_id)
    }

    pub fn learner(learner_id: &str) -> String {
        format!("{}{}", LEARNER_PREFIX, learner_id)
    }
}

/// Configuration constants
const RESULT_EXPIRY_SECS: i64 = 300; // 5 minutes
const SESSION_EXPIRY_SECS: u64 = 24 * 3600;

/// Centralized Redis manager for all Redis operations
pub struct RedisManager {
    client: redis::Client,
    conn: MultiplexedConnection,
}

impl RedisManager {
    /// Connect to Redis, retrying until it is reachable
    pub async fn connect(redis_url: &str) -> Result<Self> {
        let client = redis::Client::open(redis_url).context("Failed to create Redis client")?;

        let conn = get_connection_with_retry(&client).await?;
        info!("Connected to Redis at {}", redis_url);

        Ok(Self { client, conn })
    }

    /// Block and wait for the next job from the queue.
    ///
    /// This uses BLPOP to efficiently wait for jobs without polling.
    /// Automatically reconnects on connection failure; malformed jobs are skipped.
    pub async fn pop_job(&mut self) -> Result<WorkerJob> {
        loop {
            let result: Option<(String, String)> =
                match self.conn.blpop(keys::JOB_QUEUE, 0.0).await {
                    Ok(res) => res,
                    Err(e) => {
                        warn!("Redis BLPOP failed: {}. Reconnecting...", e);
                        self.reconnect().await?;
                        continue;
                    }
                };

            if let Some((_, job_data)) = result {
                match serde_json::from_str::<WorkerJob>(&job_data) {
                    Ok(job) => return Ok(job),
                    Err(e) => {
                        warn!("Failed to parse job data: {}. Data: {}", e, job_data);
                        continue;
                    }
                }
            }
        }
    }

    /// Push a job result to `key` for the client's BLPOP.
    ///
    /// The key expires after 5 minutes so it does not linger if the client went away.
    pub async fn push_result(&mut self, key: &str, result: &JobResult) -> Result<()> {
        let json = serde_json::to_string(result)?;

        if let Err(e) = self.conn.rpush::<_, _, ()>(key, &json).await {
            warn!("Failed to push job result: {}. Reconnecting...", e);
            self.reconnect().await?;
            self.conn.rpush::<_, _, ()>(key, &json).await?;
        }

        if let Err(e) = self.conn.expire::<_, ()>(key, RESULT_EXPIRY_SECS).await {
            warn!("Failed to set expiry on {}: {}", key, e);
        }

        Ok(())
    }

    /// Reconnect to Redis
    async fn reconnect(&mut self) -> Result<()> {
        self.conn = get_connection_with_retry(&self.client).await?;
        Ok(())
    }
}

#[async_trait]
impl SessionStore for RedisManager {
    async fn load_session(&mut self, session_id: &str) -> Result<Option<SessionState>> {
        let json: Option<String> = self
            .conn
            .get(keys::session(session_id))
            .await
            .with_context(|| format!("Failed to load session {}", session_id))?;

        json.map(|json| {
            serde_json::from_str(&json)
                .with_context(|| format!("Corrupt session state for {}", session_id))
        })
        .transpose()
    }

    async fn save_session(&mut self, session: &SessionState) -> Result<()> {
        let key = keys::session(&session.session_id);
        let json = serde_json::to_string(session)?;

        if let Err(e) = self
            .conn
            .set_ex::<_, _, ()>(&key, &json, SESSION_EXPIRY_SECS)
            .await
        {
            warn!("Failed to store session: {}. Reconnecting...", e);
            self.reconnect().await?;
            self.conn
                .set_ex::<_, _, ()>(&key, &json, SESSION_EXPIRY_SECS)
                .await?;
        }
        Ok(())
    }
}

#[async_trait]
impl ProgressStore for RedisManager {
    async fn load_progress(
        &mut self,
        learner_id: &str,
        exercise_id: &str,
    ) -> Result<Option<StoredProgress>> {
        let json: Option<String> = self
            .conn
            .get(keys::progress(learner_id, exercise_id))
            .await
            .context("Failed to load progress")?;

        json.map(|json| serde_json::from_str(&json).context("Corrupt progress record"))
            .transpose()
    }

    /// Read-modify-write; jobs are processed one at a time by a worker
    async fn save_progress(&mut self, record: &ProgressRecord) -> Result<()> {
        let mut stored = self
            .load_progress(&record.learner_id, &record.exercise_id)
            .await?
            .unwrap_or_default();
        stored.apply(record);

        let key = keys::progress(&record.learner_id, &record.exercise_id);
        self.conn
            .set::<_, _, ()>(&key, serde_json::to_string(&stored)?)
            .await
            .context("Failed to store progress")?;

        let learner = keys::learner(&record.learner_id);
        let delta = record.totals_delta();
        for (field, delta) in [
            ("stars", delta.stars),
            ("xp", delta.xp),
            ("coins", delta.coins),
        ] {
            if delta > 0 {
                self.conn
                    .hincr::<_, _, _, ()>(&learner, field, delta)
                    .await
                    .with_context(|| format!("Failed to update learner {}", field))?;
            }
        }
        Ok(())
    }
}

/// Get a Redis connection with retry logic
async fn get_connection_with_retry(client: &redis::Client) -> Result<MultiplexedConnection> {
    loop {
        match client.get_multiplexed_async_connection().await {
            Ok(conn) => return Ok(conn),
            Err(e) => {
                warn!(
                    "Failed to connect to Redis: {}. Retrying in 3 seconds...",
                    e
                );
                tokio::time::sleep(Duration::from_secs(3)).await;
            }
        }
    }
}
