//! Synthetic rate data for the dashboard when the sink is unconfigured.

use chrono::{Duration, Local};
use rand::Rng;

use crate::core::rate::StoredRate;

/// Approximate anchors per base currency against the cedi.
fn anchor_rate(currency: &str) -> f64 {
    match currency {
        "USD" => 12.0,
        "EUR" => 13.0,
        "GBP" => 15.0,
        _ => 12.0,
    }
}

/// Generates `days` days of random-walk rates per currency, oldest first.
pub fn generate_rates(days: u32, currencies: &[String], target: &str) -> Vec<StoredRate> {
    let mut rng = rand::thread_rng();
    let today = Local::now().date_naive();
    let mut rows = Vec::with_capacity(days as usize * currencies.len());

    for offset in 0..days {
        let date = today - Duration::days(offset as i64);
        for currency in currencies {
            let variation: f64 = rng.gen_range(-0.05..=0.05);
            let trend: f64 = rng.gen_range(-0.001..=0.001) * offset as f64;
            let rate = anchor_rate(currency) * (1.0 + variation + trend);
            let rate = (rate * 10_000.0).round() / 10_000.0;

            rows.push(StoredRate {
                date: date.to_string(),
                currency_pair: format!("{currency}/{target}"),
                rate,
                base_currency: currency.clone(),
                target_currency: target.to_string(),
            });
        }
    }

    rows.sort_by(|a, b| a.date.cmp(&b.date));
    rows
}
