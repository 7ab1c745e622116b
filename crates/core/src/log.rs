//! ConsultationLog trait: the durable record of past exchanges.
//!
//! The orchestrator appends one record per successful consultation and
//! reads session windows back to reconstruct history. The tool surface
//! exposes paged queries over the same store.

use async_trait::async_trait;

use crate::consultation::{ConsultationContext, ConsultationResult, LogFilter, LoggedExchange};
use crate::error::LogError;

/// Implementations: SQLite, in-memory (for tests and ephemeral runs).
#[async_trait]
pub trait ConsultationLog: Send + Sync {
    /// The backend name (e.g., "sqlite", "memory").
    fn name(&self) -> &str;

    /// Record one exchange and return its sequence id.
    async fn append(
        &self,
        prompt: &str,
        result: &ConsultationResult,
        context: Option<&ConsultationContext>,
    ) -> std::result::Result<i64, LogError>;

    /// Matching exchanges, newest first, paged by `limit`/`offset`.
    async fn query(&self, filter: &LogFilter) -> std::result::Result<Vec<LoggedExchange>, LogError>;

    /// Number of exchanges matching the filter, ignoring paging.
    async fn count(&self, filter: &LogFilter) -> std::result::Result<u64, LogError>;

    async fn get(&self, id: i64) -> std::result::Result<Option<LoggedExchange>, LogError>;
}
