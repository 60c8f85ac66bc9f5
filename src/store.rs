//! Session storage between jobs, plus an in-memory store for tests

use anyhow::Result;
use async_trait::async_trait;

use crate::session::SessionState;

#[async_trait]
pub trait SessionStore: Send {
    async fn load_session(&mut self, session_id: &str) -> Result<Option<SessionState>>;
    async fn save_session(&mut self, session: &SessionState) -> Result<()>;
}

#[cfg(test)]
pub use memory::MemoryStore;
