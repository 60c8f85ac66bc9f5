//! Engine - everything a job needs to execute and judge programs
//!
//! Bundles the remote runner, the active language and the exercise catalog so
//! the session controller and the verifier share one handle.

use std::sync::Arc;

use tracing::debug;

use crate::exercises::Catalog;
use crate::languages::LanguageConfig;
use crate::runner::{ExecutionError, RunOutcome, RunRequest, Runner};

#[derive(Clone)]
pub struct Engine {
    runner: Arc<dyn Runner>,
    language: LanguageConfig,
    catalog: Arc<Catalog>,
}

impl Engine {
    pub fn new(runner: Arc<dyn Runner>, language: LanguageConfig, catalog: Catalog) -> Self {
        Self {
            runner,
            language,
            catalog: Arc::new(catalog),
        }
    }

    pub fn language(&self) -> &LanguageConfig {
        &self.language
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Run an already prepared source once with the given stdin
    pub async fn execute(&self, source: &str, stdin: &str) -> Result<RunOutcome, ExecutionError> {
        let request = RunRequest::new(self.language.language_id, source).with_stdin(stdin);
        let outcome = self.runner.run(&request).await?;

        debug!(
            "Execution finished: status={:?}, stdout_len={}, stderr_len={}",
            outcome.status,
            outcome.stdout.len(),
            outcome.stderr.len()
        );
        Ok(outcome)
    }
}

/// Engine over a scripted runner and the embedded catalog, for unit tests
#[cfg(test)]
pub fn scripted(runner: Arc<crate::runner::ScriptedRunner>) -> Engine {
    Engine::new(
        runner,
        crate::languages::csharp(),
        crate::exercises::embedded(),
    )
}
