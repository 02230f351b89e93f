use anyhow::{Context, Result};
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

use crate::core::rate::StoredRate;
use crate::core::sink::RateSink;

pub const TABLE_NAME: &str = "exchange_rates";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const SELECT_COLUMNS: &str = "date,currency_pair,rate,base_currency,target_currency";

/// PostgREST-backed sink. Upserts resolve conflicts on the
/// (date, currency_pair) unique constraint by overwriting the existing row.
pub struct SupabaseSink {
    base_url: String,
    api_key: String,
    table: String,
    client: reqwest::Client,
}

impl SupabaseSink {
    pub fn new(base_url: &str, api_key: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent("fxetl/0.1")
            .build()
            .context("failed to build sink http client")?;

        Ok(SupabaseSink {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            table: TABLE_NAME.to_string(),
            client,
        })
    }

    fn table_url(&self) -> String {
        format!("{}/rest/v1/{}", self.base_url, self.table)
    }

    fn authed(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }
}

#[async_trait]
impl RateSink for SupabaseSink {
    async fn upsert(&self, rows: &[StoredRate]) -> Result<()> {
        let response = self
            .authed(self.client.post(self.table_url()))
            .query(&[("on_conflict", "date,currency_pair")])
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(rows)
            .send()
            .await
            .context("sink upsert request failed")?
            .error_for_status()
            .context("sink rejected upsert")?;

        debug!(status = %response.status(), rows = rows.len(), "upsert acknowledged");
        Ok(())
    }

    async fn select_recent(&self, limit: usize) -> Result<Vec<StoredRate>> {
        let query = [
            ("select", SELECT_COLUMNS.to_string()),
            ("order", "date.desc".to_string()),
            ("limit", limit.to_string()),
        ];
        let rows = self
            .authed(self.client.get(self.table_url()))
            .query(&query)
            .send()
            .await
            .context("sink select request failed")?
            .error_for_status()
            .context("sink rejected select")?
            .json::<Vec<StoredRate>>()
            .await
            .context("failed to decode sink rows")?;

        Ok(rows)
    }
}
