//! Two-pass validation: schema shape, then business rules, with aggregate
//! quality metrics. Records are filtered, never mutated; data defects are
//! never fatal.

use crate::core::rate::{RawRate, VALID_CURRENCIES};
use chrono::{Local, NaiveDate, NaiveDateTime};
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

pub const MIN_RATE: f64 = 0.0001;
pub const MAX_RATE: f64 = 1_000_000.0;

/// Maximum record age, in 365.25-day years.
const MAX_AGE_YEARS: f64 = 10.0;

const REQUIRED_FIELDS: [&str; 5] = [
    "date",
    "currency_pair",
    "rate",
    "base_currency",
    "target_currency",
];

/// Aggregate data-quality signal for one validation run. `total_records`
/// reflects the validator's own input size; `completeness` is the fraction
/// surviving both passes, defined as 0 for empty input.
#[derive(Debug, Clone, Default, Serialize)]
pub struct QualityMetrics {
    pub total_records: usize,
    pub valid_records: usize,
    pub invalid_records: usize,
    pub schema_errors: usize,
    pub business_rule_errors: usize,
    pub completeness: f64,
    pub all_errors: Vec<String>,
}

/// Runs both passes and computes quality metrics.
pub fn validate(records: Vec<RawRate>) -> (Vec<RawRate>, QualityMetrics) {
    let initial_count = records.len();

    let (schema_valid, schema_errors) = validate_schema(records);
    let (business_valid, business_errors) = validate_business_rules(schema_valid);

    let metrics = QualityMetrics {
        total_records: initial_count,
        valid_records: business_valid.len(),
        invalid_records: initial_count - business_valid.len(),
        schema_errors: schema_errors.len(),
        business_rule_errors: business_errors.len(),
        completeness: if initial_count > 0 {
            business_valid.len() as f64 / initial_count as f64
        } else {
            0.0
        },
        all_errors: [schema_errors, business_errors].concat(),
    };

    info!(
        valid = metrics.valid_records,
        total = metrics.total_records,
        completeness = %format!("{:.2}%", metrics.completeness * 100.0),
        "validation complete"
    );
    (business_valid, metrics)
}

/// Checks presence of all required fields and their type classes. A record
/// with any violation is excluded and contributes exactly one aggregated
/// error string.
pub fn validate_schema(records: Vec<RawRate>) -> (Vec<RawRate>, Vec<String>) {
    let input_count = records.len();
    let mut valid = Vec::with_capacity(input_count);
    let mut errors = Vec::new();

    for (idx, record) in records.into_iter().enumerate() {
        let mut violations = Vec::new();

        for name in REQUIRED_FIELDS {
            match field(&record, name) {
                None | Some(Value::Null) => {
                    violations.push(format!("missing required field: {name}"));
                }
                Some(value) => {
                    let expected = expected_type(name);
                    if type_name(value) != expected {
                        violations.push(format!(
                            "field {name} has wrong type: expected {expected}, got {}",
                            type_name(value)
                        ));
                    }
                }
            }
        }

        if violations.is_empty() {
            valid.push(record);
        } else {
            warn!(record = idx, ?violations, "schema validation failed");
            errors.push(format!("record {idx}: {}", violations.join("; ")));
        }
    }

    if !errors.is_empty() {
        info!(
            passed = valid.len(),
            total = input_count,
            "schema validation filtered records"
        );
    }
    (valid, errors)
}

/// Checks rate range, currency allow-list, and date recency. Violations
/// accumulate per record instead of short-circuiting.
pub fn validate_business_rules(records: Vec<RawRate>) -> (Vec<RawRate>, Vec<String>) {
    let input_count = records.len();
    let today = Local::now().date_naive();
    let mut valid = Vec::with_capacity(input_count);
    let mut errors = Vec::new();

    for (idx, record) in records.into_iter().enumerate() {
        let mut violations = Vec::new();

        if let Some(rate) = record.rate_f64() {
            if !(MIN_RATE..=MAX_RATE).contains(&rate) {
                violations.push(format!(
                    "rate {rate} outside valid range [{MIN_RATE}, {MAX_RATE}]"
                ));
            }
        }

        let base = record.base_str().unwrap_or("").to_uppercase();
        if !VALID_CURRENCIES.contains(&base.as_str()) {
            violations.push(format!("invalid base currency: {base}"));
        }
        let target = record.target_str().unwrap_or("").to_uppercase();
        if !VALID_CURRENCIES.contains(&target.as_str()) {
            violations.push(format!("invalid target currency: {target}"));
        }

        if let Some(date_str) = record.date_str().filter(|s| !s.is_empty()) {
            match parse_iso_date(date_str) {
                Some(date) => {
                    if date > today {
                        violations.push(format!("date {date_str} is in the future"));
                    }
                    let years_ago = (today - date).num_days() as f64 / 365.25;
                    if years_ago > MAX_AGE_YEARS {
                        violations.push(format!("date {date_str} is more than 10 years old"));
                    }
                }
                None => violations.push(format!("invalid date format: {date_str}")),
            }
        }

        if violations.is_empty() {
            valid.push(record);
        } else {
            warn!(record = idx, ?violations, "business rule validation failed");
            errors.push(format!("record {idx}: {}", violations.join("; ")));
        }
    }

    if !errors.is_empty() {
        info!(
            passed = valid.len(),
            total = input_count,
            "business rule validation filtered records"
        );
    }
    (valid, errors)
}

fn field<'a>(record: &'a RawRate, name: &str) -> &'a Option<Value> {
    match name {
        "date" => &record.date,
        "currency_pair" => &record.currency_pair,
        "rate" => &record.rate,
        "base_currency" => &record.base_currency,
        "target_currency" => &record.target_currency,
        _ => unreachable!("unknown field: {name}"),
    }
}

fn expected_type(name: &str) -> &'static str {
    if name == "rate" { "number" } else { "string" }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn parse_iso_date(s: &str) -> Option<NaiveDate> {
    s.parse::<NaiveDate>()
        .ok()
        .or_else(|| s.parse::<NaiveDateTime>().ok().map(|dt| dt.date()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;

    fn valid_record() -> RawRate {
        RawRate::new("2024-01-15", "USD", "GHS", 12.5)
    }

    #[test]
    fn schema_accepts_valid_record() {
        let (valid, errors) = validate_schema(vec![valid_record()]);
        assert_eq!(valid.len(), 1);
        assert!(errors.is_empty());
    }

    #[test]
    fn schema_rejects_missing_rate_with_one_error() {
        let mut record = valid_record();
        record.rate = None;

        let (valid, errors) = validate_schema(vec![record]);
        assert!(valid.is_empty());
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("missing required field: rate"));
    }

    #[test]
    fn schema_aggregates_violations_per_record() {
        let record = RawRate {
            date: Some(json!("2024-01-15")),
            ..RawRate::default()
        };

        let (valid, errors) = validate_schema(vec![record]);
        assert!(valid.is_empty());
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].matches("missing required field").count(), 4);
    }

    #[test]
    fn schema_rejects_wrong_type() {
        let mut record = valid_record();
        record.rate = Some(json!("not_a_number"));

        let (valid, errors) = validate_schema(vec![record]);
        assert!(valid.is_empty());
        assert!(errors[0].contains("expected number, got string"));
    }

    #[test]
    fn schema_accepts_integer_rate() {
        let mut record = valid_record();
        record.rate = Some(json!(12));

        let (valid, errors) = validate_schema(vec![record]);
        assert_eq!(valid.len(), 1);
        assert!(errors.is_empty());
    }

    #[test]
    fn business_rejects_out_of_range_rate() {
        let mut record = valid_record();
        record.rate = Some(json!(2_000_000.0));

        let (valid, errors) = validate_business_rules(vec![record]);
        assert!(valid.is_empty());
        assert!(errors[0].contains("outside valid range"));
    }

    #[test]
    fn business_accepts_lower_boundary_rate() {
        let mut record = valid_record();
        record.rate = Some(json!(0.0001));

        let (valid, errors) = validate_business_rules(vec![record]);
        assert_eq!(valid.len(), 1);
        assert!(errors.is_empty());
    }

    #[test]
    fn business_rejects_unknown_currency() {
        let mut record = valid_record();
        record.base_currency = Some(json!("XXX"));

        let (valid, errors) = validate_business_rules(vec![record]);
        assert!(valid.is_empty());
        assert!(errors[0].contains("invalid base currency: XXX"));
    }

    #[test]
    fn business_rejects_future_date() {
        let tomorrow = Local::now().date_naive() + Duration::days(1);
        let mut record = valid_record();
        record.date = Some(json!(tomorrow.to_string()));

        let (valid, errors) = validate_business_rules(vec![record]);
        assert!(valid.is_empty());
        assert!(errors[0].contains("is in the future"));
    }

    #[test]
    fn business_rejects_date_older_than_ten_years() {
        let ancient = Local::now().date_naive() - Duration::days(3700);
        let mut record = valid_record();
        record.date = Some(json!(ancient.to_string()));

        let (valid, errors) = validate_business_rules(vec![record]);
        assert!(valid.is_empty());
        assert!(errors[0].contains("more than 10 years old"));
    }

    #[test]
    fn business_accumulates_violations() {
        let mut record = valid_record();
        record.rate = Some(json!(2_000_000.0));
        record.base_currency = Some(json!("XXX"));

        let (valid, errors) = validate_business_rules(vec![record]);
        assert!(valid.is_empty());
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("outside valid range"));
        assert!(errors[0].contains("invalid base currency"));
    }

    #[test]
    fn validate_computes_quality_metrics() {
        let mut missing_rate = valid_record();
        missing_rate.rate = None;
        let mut bad_rate = valid_record();
        bad_rate.rate = Some(json!(2_000_000.0));

        let (valid, metrics) = validate(vec![valid_record(), missing_rate, bad_rate]);
        assert_eq!(valid.len(), 1);
        assert_eq!(metrics.total_records, 3);
        assert_eq!(metrics.valid_records, 1);
        assert_eq!(metrics.invalid_records, 2);
        assert_eq!(metrics.schema_errors, 1);
        assert_eq!(metrics.business_rule_errors, 1);
        assert_eq!(metrics.all_errors.len(), 2);
        assert!(metrics.completeness > 0.0 && metrics.completeness < 1.0);
    }

    #[test]
    fn completeness_is_bounded_and_defined_for_empty_input() {
        let (valid, metrics) = validate(Vec::new());
        assert!(valid.is_empty());
        assert_eq!(metrics.total_records, 0);
        assert_eq!(metrics.completeness, 0.0);

        let (_, metrics) = validate(vec![valid_record()]);
        assert!(metrics.completeness >= 0.0 && metrics.completeness <= 1.0);
    }
}
