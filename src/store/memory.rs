use anyhow::{Result, bail};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;
use tracing::debug;

use crate::core::rate::StoredRate;
use crate::core::sink::RateSink;

/// In-memory sink keyed on (date, currency_pair), with the same overwrite-on-
/// conflict semantics as the hosted store. Used by tests; writes can be
/// toggled to fail for batch-isolation scenarios.
#[derive(Default)]
pub struct MemorySink {
    rows: Mutex<HashMap<(String, String), StoredRate>>,
    reject_writes: AtomicBool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_reject_writes(&self, reject: bool) {
        self.reject_writes.store(reject, Ordering::SeqCst);
    }

    /// Snapshot of all stored rows, newest date first.
    pub async fn rows(&self) -> Vec<StoredRate> {
        let rows = self.rows.lock().await;
        let mut out: Vec<_> = rows.values().cloned().collect();
        out.sort_by(|a, b| {
            b.date
                .cmp(&a.date)
                .then_with(|| a.currency_pair.cmp(&b.currency_pair))
        });
        out
    }

    pub async fn len(&self) -> usize {
        self.rows.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.lock().await.is_empty()
    }
}

#[async_trait]
impl RateSink for MemorySink {
    async fn upsert(&self, rows: &[StoredRate]) -> Result<()> {
        if self.reject_writes.load(Ordering::SeqCst) {
            bail!("write rejected by sink");
        }
        let mut stored = self.rows.lock().await;
        for row in rows {
            stored.insert((row.date.clone(), row.currency_pair.clone()), row.clone());
        }
        debug!(rows = rows.len(), total = stored.len(), "memory upsert");
        Ok(())
    }

    async fn select_recent(&self, limit: usize) -> Result<Vec<StoredRate>> {
        let mut out = self.rows().await;
        out.truncate(limit);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(date: &str, pair: &str, rate: f64) -> StoredRate {
        let (base, target) = pair.split_once('/').unwrap();
        StoredRate {
            date: date.into(),
            currency_pair: pair.into(),
            rate,
            base_currency: base.into(),
            target_currency: target.into(),
        }
    }

    #[tokio::test]
    async fn upsert_overwrites_on_conflict_key() {
        let sink = MemorySink::new();
        sink.upsert(&[row("2024-01-15", "USD/GHS", 12.5)])
            .await
            .unwrap();
        sink.upsert(&[row("2024-01-15", "USD/GHS", 12.9)])
            .await
            .unwrap();

        let rows = sink.rows().await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].rate, 12.9);
    }

    #[tokio::test]
    async fn distinct_keys_coexist() {
        let sink = MemorySink::new();
        sink.upsert(&[
            row("2024-01-15", "USD/GHS", 12.5),
            row("2024-01-16", "USD/GHS", 12.6),
            row("2024-01-15", "EUR/GHS", 13.5),
        ])
        .await
        .unwrap();

        assert_eq!(sink.len().await, 3);
    }

    #[tokio::test]
    async fn select_recent_is_newest_first_and_bounded() {
        let sink = MemorySink::new();
        sink.upsert(&[
            row("2024-01-15", "USD/GHS", 12.5),
            row("2024-01-17", "USD/GHS", 12.7),
            row("2024-01-16", "USD/GHS", 12.6),
        ])
        .await
        .unwrap();

        let rows = sink.select_recent(2).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].date, "2024-01-17");
        assert_eq!(rows[1].date, "2024-01-16");
    }

    #[tokio::test]
    async fn rejected_writes_error() {
        let sink = MemorySink::new();
        sink.set_reject_writes(true);
        assert!(
            sink.upsert(&[row("2024-01-15", "USD/GHS", 12.5)])
                .await
                .is_err()
        );
        assert!(sink.is_empty().await);
    }
}
