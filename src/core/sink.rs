//! Sink abstraction for persisted rate rows

use crate::core::rate::StoredRate;
use anyhow::Result;
use async_trait::async_trait;

#[async_trait]
pub trait RateSink: Send + Sync {
    /// Inserts or overwrites rows keyed on (date, currency_pair).
    async fn upsert(&self, rows: &[StoredRate]) -> Result<()>;

    /// Bounded read of the most recent rows, newest first. A `limit` of 1
    /// doubles as a connectivity probe.
    async fn select_recent(&self, limit: usize) -> Result<Vec<StoredRate>>;
}
