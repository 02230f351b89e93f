//! Data cleaning pass: dedup, completeness, normalization, type coercion.
//!
//! Stateless free functions, applied in a fixed order. Dedup deliberately
//! runs before normalization, so two records differing only in currency-pair
//! casing are not deduplicated against each other. That ordering matches the
//! historical behavior this pipeline replaces and is kept intentionally.

use crate::core::rate::RawRate;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value;
use std::collections::HashSet;
use tracing::{info, warn};

/// Cleans a batch of raw records. Idempotent on already-clean input.
pub fn clean(records: Vec<RawRate>) -> Vec<RawRate> {
    if records.is_empty() {
        warn!("no data provided for cleaning");
        return records;
    }
    info!(records = records.len(), "cleaning records");

    let records = remove_duplicates(records);
    let records = drop_incomplete(records);
    let mut records = normalize_pairs(records);
    coerce_types(&mut records);

    // Coercion nulls unusable rates; drop those records last.
    let records: Vec<_> = records
        .into_iter()
        .filter(|r| r.rate_f64().is_some())
        .collect();

    info!(remaining = records.len(), "cleaning complete");
    records
}

/// Keeps the first occurrence per (date, currency_pair) key.
fn remove_duplicates(records: Vec<RawRate>) -> Vec<RawRate> {
    let mut seen = HashSet::new();
    let mut unique = Vec::with_capacity(records.len());
    let mut duplicates = 0usize;

    for record in records {
        let key = (
            record.date.as_ref().map(Value::to_string),
            record.currency_pair.as_ref().map(Value::to_string),
        );
        if seen.insert(key) {
            unique.push(record);
        } else {
            duplicates += 1;
        }
    }

    if duplicates > 0 {
        info!(duplicates, "removed duplicate records");
    }
    unique
}

/// Drops records missing any of the five required fields.
fn drop_incomplete(records: Vec<RawRate>) -> Vec<RawRate> {
    let before = records.len();
    let complete: Vec<_> = records
        .into_iter()
        .filter(|record| {
            let keep = record.is_complete();
            if !keep {
                warn!(?record, "removed record with missing values");
            }
            keep
        })
        .collect();

    let removed = before - complete.len();
    if removed > 0 {
        info!(removed, "removed records with missing values");
    }
    complete
}

/// Uppercases and trims the currency codes, then recomputes the pair from
/// them whenever both are non-empty.
fn normalize_pairs(mut records: Vec<RawRate>) -> Vec<RawRate> {
    for record in &mut records {
        let base = record.base_str().unwrap_or("").trim().to_uppercase();
        let target = record.target_str().unwrap_or("").trim().to_uppercase();

        if !base.is_empty() && !target.is_empty() {
            record.currency_pair = Some(Value::from(format!("{base}/{target}")));
            record.base_currency = Some(Value::from(base));
            record.target_currency = Some(Value::from(target));
        }
    }
    records
}

/// Forces `rate` to a float (nulling the field when coercion fails) and
/// `date` to an ISO calendar-date string. Unparseable date strings only log
/// a warning and keep their value.
fn coerce_types(records: &mut [RawRate]) {
    for record in records {
        if let Some(value) = &record.rate {
            let coerced = match value {
                Value::Number(n) => n.as_f64(),
                Value::String(s) => s.trim().parse::<f64>().ok(),
                _ => None,
            };
            if coerced.is_none() {
                warn!(rate = %value, "invalid rate value");
            }
            record.rate = coerced
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number);
        }

        if let Some(Value::String(s)) = &record.date {
            if let Some(date) = truncate_to_date(s) {
                record.date = Some(Value::from(date.to_string()));
            } else {
                warn!(date = %s, "invalid date format");
            }
        }
    }
}

fn truncate_to_date(s: &str) -> Option<NaiveDate> {
    if let Ok(date) = s.parse::<NaiveDate>() {
        return Some(date);
    }
    if let Ok(datetime) = s.parse::<NaiveDateTime>() {
        return Some(datetime.date());
    }
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.date_naive())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_records() -> Vec<RawRate> {
        vec![
            RawRate::new("2024-01-15", "USD", "GHS", 12.5),
            RawRate::new("2024-01-15", "EUR", "GHS", 13.5),
        ]
    }

    #[test]
    fn removes_duplicates_first_occurrence_wins() {
        let mut records = sample_records();
        let mut duplicate = records[0].clone();
        duplicate.rate = Some(json!(99.0));
        records.push(duplicate);

        let unique = remove_duplicates(records);
        assert_eq!(unique.len(), 2);
        let usd = unique.iter().find(|r| r.pair_str() == Some("USD/GHS"));
        assert_eq!(usd.unwrap().rate_f64(), Some(12.5));
    }

    #[test]
    fn dedup_is_idempotent() {
        let mut records = sample_records();
        records.push(records[0].clone());

        let once = remove_duplicates(records);
        let twice = remove_duplicates(once.clone());
        assert_eq!(once, twice);
        assert!(twice.len() <= 3);
    }

    #[test]
    fn dedup_runs_on_raw_casing() {
        // Pre-normalization casing differences are distinct keys by design.
        let mut records = vec![RawRate::new("2024-01-15", "USD", "GHS", 12.5)];
        let mut lowercase = records[0].clone();
        lowercase.currency_pair = Some(json!("usd/ghs"));
        records.push(lowercase);

        assert_eq!(remove_duplicates(records).len(), 2);
    }

    #[test]
    fn drops_records_with_missing_values() {
        let mut records = sample_records();
        let mut incomplete = RawRate::new("2024-01-16", "GBP", "GHS", 1.0);
        incomplete.rate = Some(Value::Null);
        records.push(incomplete);

        let complete = drop_incomplete(records);
        assert_eq!(complete.len(), 2);
        assert!(complete.iter().all(|r| r.rate_f64().is_some()));
    }

    #[test]
    fn normalizes_currency_pairs() {
        let mut record = RawRate::new("2024-01-15", "USD", "GHS", 12.5);
        record.base_currency = Some(json!(" usd "));
        record.target_currency = Some(json!("ghs"));
        record.currency_pair = Some(json!("USD-GHS"));

        let normalized = normalize_pairs(vec![record]);
        assert_eq!(normalized[0].base_str(), Some("USD"));
        assert_eq!(normalized[0].target_str(), Some("GHS"));
        assert_eq!(normalized[0].pair_str(), Some("USD/GHS"));
    }

    #[test]
    fn coerces_string_rate_and_datetime_date() {
        let mut record = RawRate::new("2024-01-15", "USD", "GHS", 12.5);
        record.rate = Some(json!("12.5"));
        record.date = Some(json!("2024-01-15T10:30:00"));

        let mut records = vec![record];
        coerce_types(&mut records);
        assert_eq!(records[0].rate_f64(), Some(12.5));
        assert_eq!(records[0].date_str(), Some("2024-01-15"));
    }

    #[test]
    fn unparseable_rate_is_nulled_and_bad_date_kept() {
        let mut record = RawRate::new("2024-01-15", "USD", "GHS", 12.5);
        record.rate = Some(json!("not-a-number"));
        record.date = Some(json!("15/01/2024"));

        let mut records = vec![record];
        coerce_types(&mut records);
        assert!(records[0].rate.is_none());
        assert_eq!(records[0].date_str(), Some("15/01/2024"));
    }

    #[test]
    fn clean_filters_messy_batch() {
        let mut records = sample_records();
        records.push(records[0].clone()); // duplicate
        records.push(RawRate {
            date: Some(json!("2024-01-16")),
            rate: Some(Value::Null),
            ..RawRate::default()
        }); // missing values
        let mut bad_rate = RawRate::new("2024-01-17", "GBP", "GHS", 1.0);
        bad_rate.rate = Some(json!("invalid"));
        records.push(bad_rate); // unusable rate

        let cleaned = clean(records);
        assert_eq!(cleaned.len(), 2);
        assert!(cleaned.iter().all(|r| r.rate_f64().is_some()));
    }

    #[test]
    fn clean_is_idempotent_on_clean_input() {
        let cleaned = clean(sample_records());
        assert_eq!(clean(cleaned.clone()), cleaned);
    }

    #[test]
    fn clean_of_empty_input_is_empty() {
        assert!(clean(Vec::new()).is_empty());
    }
}
