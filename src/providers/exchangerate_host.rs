use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use chrono::{Local, NaiveDate};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};

use crate::core::provider::RateProvider;
use crate::core::rate::RawRate;

/// Pivot currency for deriving cross-rates in a single request.
pub const ANCHOR_CURRENCY: &str = "USD";

const MAX_RETRIES: u32 = 3;
const RETRY_DELAY: Duration = Duration::from_secs(2);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for the exchangerate.host `/latest` and `/historical/{date}`
/// endpoints.
pub struct ExchangeRateHostProvider {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
    max_retries: u32,
    retry_delay: Duration,
}

#[derive(Debug, Deserialize)]
struct RatesResponse {
    success: Option<bool>,
    #[serde(default)]
    rates: HashMap<String, f64>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    info: Option<String>,
}

impl ExchangeRateHostProvider {
    pub fn new(base_url: &str, api_key: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent("fxetl/0.1")
            .build()
            .context("failed to build http client")?;

        Ok(ExchangeRateHostProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            client,
            max_retries: MAX_RETRIES,
            retry_delay: RETRY_DELAY,
        })
    }

    /// Overrides the retry policy. Tests use millisecond delays.
    pub fn with_retry(mut self, max_retries: u32, retry_delay: Duration) -> Self {
        self.max_retries = max_retries.max(1);
        self.retry_delay = retry_delay;
        self
    }

    /// Issues one GET with retry on transport and HTTP-status failures,
    /// sleeping `delay * attempt` between attempts (linear backoff). An
    /// application-level error body is deterministic and is raised
    /// immediately without retry. The `success` flag is not trusted when
    /// absent; callers validate the rate keys they expect.
    async fn request(&self, endpoint: &str, params: &[(&str, String)]) -> Result<RatesResponse> {
        let url = format!("{}/{}", self.base_url, endpoint.trim_start_matches('/'));
        let mut query: Vec<(&str, String)> = params.to_vec();
        query.push(("access_key", self.api_key.clone()));

        let mut attempt = 1u32;
        loop {
            debug!(attempt, %url, "api request");
            let sent = self
                .client
                .get(&url)
                .query(&query)
                .send()
                .await
                .and_then(|response| response.error_for_status());

            match sent {
                Ok(response) => {
                    let body: RatesResponse = response
                        .json()
                        .await
                        .context("failed to decode api response")?;
                    if body.success == Some(false) {
                        let info = body
                            .error
                            .and_then(|e| e.info)
                            .unwrap_or_else(|| "unknown api error".to_string());
                        bail!("api error: {info}");
                    }
                    return Ok(body);
                }
                Err(err) if attempt < self.max_retries => {
                    warn!(
                        attempt,
                        max_retries = self.max_retries,
                        error = %err,
                        "request failed, retrying"
                    );
                    tokio::time::sleep(self.retry_delay * attempt).await;
                    attempt += 1;
                }
                Err(err) => {
                    error!(error = %err, "all retry attempts failed");
                    return Err(err).with_context(|| format!("request to {url} failed"));
                }
            }
        }
    }
}

#[async_trait]
impl RateProvider for ExchangeRateHostProvider {
    /// One request anchored on USD covers every base currency: the anchor's
    /// rate is read directly, everything else is derived by cross-rate
    /// division `rate(anchor->target) / rate(anchor->base)`.
    #[instrument(name = "FetchLatestRates", skip(self))]
    async fn fetch_latest_rates(
        &self,
        base_currencies: &[String],
        target_currency: &str,
    ) -> Result<Vec<RawRate>> {
        info!(?base_currencies, target_currency, "fetching latest rates");

        let mut symbols = vec![target_currency];
        symbols.extend(
            base_currencies
                .iter()
                .map(String::as_str)
                .filter(|c| *c != ANCHOR_CURRENCY),
        );
        let params = [
            ("base", ANCHOR_CURRENCY.to_string()),
            ("symbols", symbols.join(",")),
        ];

        let body = self.request("latest", &params).await?;
        if body.rates.is_empty() {
            bail!("no rates returned from api");
        }

        let fetch_date = Local::now().date_naive().to_string();
        let fetched_at = Local::now().to_rfc3339();
        let mut result = Vec::with_capacity(base_currencies.len());

        for base in base_currencies {
            let rate = if base == ANCHOR_CURRENCY {
                body.rates.get(target_currency).copied()
            } else {
                let anchor_to_target = non_zero(body.rates.get(target_currency));
                let anchor_to_base = non_zero(body.rates.get(base.as_str()));
                match (anchor_to_target, anchor_to_base) {
                    (Some(target_rate), Some(base_rate)) => Some(target_rate / base_rate),
                    _ => {
                        warn!(base = %base, target_currency, "missing rate for pair, skipping");
                        continue;
                    }
                }
            };

            match rate.filter(|r| *r != 0.0) {
                Some(rate) => {
                    let mut record = RawRate::new(&fetch_date, base, target_currency, rate);
                    record.fetched_at = Some(fetched_at.clone());
                    result.push(record);
                }
                None => warn!(base = %base, target_currency, "missing rate for pair, skipping"),
            }
        }

        info!(count = result.len(), "fetched exchange rates");
        Ok(result)
    }

    async fn fetch_historical_rate(
        &self,
        date: NaiveDate,
        base_currency: &str,
        target_currency: &str,
    ) -> Option<RawRate> {
        debug!(%date, base_currency, target_currency, "fetching historical rate");

        let endpoint = format!("historical/{date}");
        let params = [
            ("base", base_currency.to_string()),
            ("symbols", target_currency.to_string()),
        ];

        match self.request(&endpoint, &params).await {
            Ok(body) => body
                .rates
                .get(target_currency)
                .copied()
                .filter(|rate| *rate != 0.0)
                .map(|rate| {
                    let mut record =
                        RawRate::new(&date.to_string(), base_currency, target_currency, rate);
                    record.fetched_at = Some(Local::now().to_rfc3339());
                    record
                }),
            Err(err) => {
                error!(error = %err, "historical rate lookup failed");
                None
            }
        }
    }
}

fn non_zero(rate: Option<&f64>) -> Option<f64> {
    rate.copied().filter(|r| *r != 0.0)
}
