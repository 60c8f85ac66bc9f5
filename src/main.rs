mod config;
mod core;
mod diagnostics;
mod engine;
mod exercises;
mod grading;
mod jobs;
mod languages;
mod progress;
mod redis_manager;
mod runner;
mod session;
mod shim;
mod store;
mod verifier;

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use tracing::{error, info, warn};

use crate::engine::Engine;
use crate::jobs::{process_job, JobResult};
use crate::redis_manager::RedisManager;
use crate::runner::Judge0Runner;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("mp_judge=info".parse()?),
        )
        .init();

    dotenvy::dotenv().ok();

    let config = config::init_config()?;

    languages::init_languages()?;
    let language = languages::get_language_config(&config.language).with_context(|| {
        format!(
            "Unsupported language: {} (supported: {:?})",
            config.language,
            languages::get_supported_languages()
        )
    })?;
    info!(
        "Language {} (Judge0 id {})",
        language.name, language.language_id
    );

    let catalog = exercises::load_catalog(config.exercises_path.as_deref())?;

    if !config.has_execution_service() {
        warn!("JUDGE0_API_URL or JUDGE0_API_KEY is not set; every run will report a configuration error");
    }
    let runner = Judge0Runner::new(config).context("Failed to build Judge0 client")?;
    let engine = Engine::new(Arc::new(runner), language, catalog);

    info!("Starting Machine Problem Judge Worker...");
    let mut redis = RedisManager::connect(&config.redis_url).await?;

    info!("Waiting for jobs...");

    loop {
        let job = redis.pop_job().await?;
        info!(
            "Received {} job: session_id={}",
            job.kind(),
            job.session_id()
        );

        let result = match process_job(&engine, &mut redis, &job, now_millis()).await {
            Ok(result) => result,
            Err(e) => {
                error!(
                    "Failed to process {} job for session {}: {:#}",
                    job.kind(),
                    job.session_id(),
                    e
                );
                JobResult::failed(job.session_id(), format!("{:#}", e))
            }
        };

        if let Err(e) = redis.push_result(job.result_key(), &result).await {
            error!(
                "Failed to push result for session {}: {}",
                job.session_id(),
                e
            );
        }
    }
}

/// Milliseconds since the Unix epoch
fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
