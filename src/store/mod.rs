//! Load stage: batching loader over a pluggable sink

pub mod memory;
pub mod supabase;

pub use memory::MemorySink;
pub use supabase::SupabaseSink;

use anyhow::{Context, Result};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::core::config::AppConfig;
use crate::core::rate::{RawRate, StoredRate};
use crate::core::sink::RateSink;

/// Outcome of one `load_batch` call. `skipped` marks the unconfigured-sink
/// case, a neutral non-failure distinct from success and failure.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LoadReport {
    pub success_count: usize,
    pub error_count: usize,
    pub errors: Vec<String>,
    pub skipped: bool,
    pub total_records: usize,
}

/// Batches validated records and upserts them into the sink. Tolerates the
/// sink being unconfigured; isolates failures per batch.
pub struct Loader {
    sink: Option<Arc<dyn RateSink>>,
    batch_size: usize,
}

impl Loader {
    pub fn new(sink: Option<Arc<dyn RateSink>>, batch_size: usize) -> Self {
        Loader {
            sink,
            batch_size: batch_size.max(1),
        }
    }

    /// Builds the hosted sink when both credentials are present, otherwise an
    /// unconfigured loader whose load calls are skipped.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let sink = match (&config.supabase_url, &config.supabase_key) {
            (Some(url), Some(key)) => {
                let sink = SupabaseSink::new(url, key)?;
                Some(Arc::new(sink) as Arc<dyn RateSink>)
            }
            _ => {
                warn!("sink credentials not provided, load operations will be skipped");
                None
            }
        };
        Ok(Loader::new(sink, config.batch_size))
    }

    pub fn is_configured(&self) -> bool {
        self.sink.is_some()
    }

    /// Upserts records in fixed-size batches. A failing batch counts its
    /// records as errors and processing continues with the next batch.
    pub async fn load_batch(&self, records: &[RawRate], batch_size: Option<usize>) -> LoadReport {
        let Some(sink) = &self.sink else {
            warn!("sink not configured, skipping load");
            return LoadReport {
                success_count: 0,
                error_count: records.len(),
                errors: vec!["sink not configured".to_string()],
                skipped: true,
                total_records: records.len(),
            };
        };

        if records.is_empty() {
            warn!("no data provided for loading");
            return LoadReport::default();
        }

        let batch_size = batch_size.unwrap_or(self.batch_size).max(1);
        let prepared = prepare_rows(records);
        let total_batches = prepared.len().div_ceil(batch_size);
        info!(
            records = prepared.len(),
            batch_size, total_batches, "loading records"
        );

        let mut report = LoadReport {
            total_records: prepared.len(),
            ..LoadReport::default()
        };

        for (index, batch) in prepared.chunks(batch_size).enumerate() {
            let batch_num = index + 1;
            debug!(batch_num, total_batches, size = batch.len(), "processing batch");
            match sink.upsert(batch).await {
                Ok(()) => {
                    report.success_count += batch.len();
                    info!(batch_num, total_batches, records = batch.len(), "batch loaded");
                }
                Err(err) => {
                    let message = format!("error loading batch {batch_num}: {err:#}");
                    error!("{message}");
                    report.errors.push(message);
                    report.error_count += batch.len();
                }
            }
        }

        info!(
            success = report.success_count,
            failed = report.error_count,
            total = report.total_records,
            "load complete"
        );
        report
    }

    /// Connectivity probe: one trivial bounded read.
    pub async fn test_connection(&self) -> bool {
        let Some(sink) = &self.sink else {
            return false;
        };
        match sink.select_recent(1).await {
            Ok(_) => {
                info!("sink connection test successful");
                true
            }
            Err(err) => {
                error!(error = %err, "sink connection test failed");
                false
            }
        }
    }

    /// Dashboard read surface.
    pub async fn fetch_recent(&self, limit: usize) -> Result<Vec<StoredRate>> {
        let sink = self.sink.as_ref().context("sink not configured")?;
        sink.select_recent(limit).await
    }
}

/// Projects records down to exactly the persisted columns, discarding fetch
/// timestamps and any other metadata.
fn prepare_rows(records: &[RawRate]) -> Vec<StoredRate> {
    records
        .iter()
        .filter_map(|record| {
            let row = record.to_stored();
            if row.is_none() {
                warn!(?record, "dropping incomplete record at load");
            }
            row
        })
        .collect()
}
