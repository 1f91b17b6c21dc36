// src/core/collaborators.rs

use async_trait::async_trait;
use serde_json::Value;

use crate::core::events::ScanLog;

/// An optional report enricher that runs after the threat model has been applied.
///
/// Whatever `run` returns is stored verbatim in the report under `name()`. The
/// scanner never interprets it, and a collaborator cannot change the score.
#[async_trait]
pub trait Collaborator: Send + Sync {
    /// The top-level report key the blob is stored under.
    fn name(&self) -> &str;

    async fn run(&self, target: &str, log: &ScanLog) -> Value;
}
