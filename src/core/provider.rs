//! Rate provider abstraction

use crate::core::rate::RawRate;
use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;

#[async_trait]
pub trait RateProvider: Send + Sync {
    /// Fetches today's rates for every base currency against the target.
    async fn fetch_latest_rates(
        &self,
        base_currencies: &[String],
        target_currency: &str,
    ) -> Result<Vec<RawRate>>;

    /// Fetches one historical rate. Softer semantics than the batch path:
    /// lookups are opportunistic, so failures log and yield `None` instead of
    /// propagating.
    async fn fetch_historical_rate(
        &self,
        date: NaiveDate,
        base_currency: &str,
        target_currency: &str,
    ) -> Option<RawRate>;
}
