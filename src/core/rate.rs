//! Exchange rate record types

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Currency codes accepted anywhere in the pipeline.
pub const VALID_CURRENCIES: [&str; 4] = ["USD", "EUR", "GBP", "GHS"];

/// One observed exchange rate as it travels through the pipeline.
///
/// Fields are loosely typed (`serde_json::Value`) on purpose: upstream data
/// may be missing, null, or mistyped, and the clean/validate passes need to
/// observe that rather than fail at the deserialization boundary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRate {
    pub date: Option<Value>,
    pub base_currency: Option<Value>,
    pub target_currency: Option<Value>,
    pub currency_pair: Option<Value>,
    pub rate: Option<Value>,
    /// Informational fetch timestamp, never part of record identity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fetched_at: Option<String>,
}

impl RawRate {
    /// Builds a fully-populated, well-typed record.
    pub fn new(date: &str, base_currency: &str, target_currency: &str, rate: f64) -> Self {
        RawRate {
            date: Some(Value::from(date)),
            base_currency: Some(Value::from(base_currency)),
            target_currency: Some(Value::from(target_currency)),
            currency_pair: Some(Value::from(format!("{base_currency}/{target_currency}"))),
            rate: Some(Value::from(rate)),
            fetched_at: None,
        }
    }

    pub fn date_str(&self) -> Option<&str> {
        self.date.as_ref().and_then(Value::as_str)
    }

    pub fn pair_str(&self) -> Option<&str> {
        self.currency_pair.as_ref().and_then(Value::as_str)
    }

    pub fn base_str(&self) -> Option<&str> {
        self.base_currency.as_ref().and_then(Value::as_str)
    }

    pub fn target_str(&self) -> Option<&str> {
        self.target_currency.as_ref().and_then(Value::as_str)
    }

    pub fn rate_f64(&self) -> Option<f64> {
        self.rate.as_ref().and_then(Value::as_f64)
    }

    /// A record is complete when all five semantic fields are present and
    /// non-null. `fetched_at` does not count.
    pub fn is_complete(&self) -> bool {
        [
            &self.date,
            &self.currency_pair,
            &self.rate,
            &self.base_currency,
            &self.target_currency,
        ]
        .iter()
        .all(|field| !matches!(field, None | Some(Value::Null)))
    }

    /// Projects down to the five persisted fields, or `None` when a field is
    /// missing or mistyped.
    pub fn to_stored(&self) -> Option<StoredRate> {
        Some(StoredRate {
            date: self.date_str()?.to_string(),
            currency_pair: self.pair_str()?.to_string(),
            rate: self.rate_f64()?,
            base_currency: self.base_str()?.to_string(),
            target_currency: self.target_str()?.to_string(),
        })
    }
}

/// The persisted projection of a rate record. Exactly the columns the sink
/// stores and the dashboard reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRate {
    pub date: String,
    pub currency_pair: String,
    pub rate: f64,
    pub base_currency: String,
    pub target_currency: String,
}
