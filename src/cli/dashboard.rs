//! Read-only terminal view over stored exchange rates.

use anyhow::Result;
use chrono::{Duration, Local, NaiveDate};
use comfy_table::Table;
use std::collections::BTreeMap;
use tracing::warn;

use crate::cli::sample;
use crate::cli::ui::{
    StyleType, header_cell, new_spinner, new_styled_table, print_separator, rate_cell, sparkline,
    style_text,
};
use crate::core::config::AppConfig;
use crate::core::rate::StoredRate;
use crate::store::Loader;

#[derive(Debug, Clone)]
pub struct DashboardArgs {
    /// Render synthetic data instead of reading the sink.
    pub sample: bool,
    /// Trailing window of days to display.
    pub days: u32,
    /// Only show rates for this base currency.
    pub currency: Option<String>,
    /// Maximum rows fetched from the sink.
    pub limit: usize,
}

pub async fn render(config: &AppConfig, args: &DashboardArgs) -> Result<()> {
    let loader = Loader::from_config(config)?;
    let (rows, source) = load_rows(&loader, config, args).await;
    let rows = apply_filters(rows, args);

    println!("{}", style_text("Exchange Rate Dashboard", StyleType::Title));
    println!(
        "{}",
        style_text(&format!("source: {source}"), StyleType::Subtle)
    );

    if rows.is_empty() {
        println!("{}", style_text("no data available to display", StyleType::Error));
        return Ok(());
    }

    print_metrics(&rows);
    println!("\n{}", style_text("Recent rates", StyleType::Label));
    println!("{}", rates_table(&rows));
    println!("\n{}", style_text("Statistics by currency pair", StyleType::Label));
    println!("{}", stats_table(&rows));
    print_separator();
    Ok(())
}

async fn load_rows(
    loader: &Loader,
    config: &AppConfig,
    args: &DashboardArgs,
) -> (Vec<StoredRate>, &'static str) {
    if args.sample || !loader.is_configured() {
        let rows = sample::generate_rates(args.days, &config.base_currencies, &config.target_currency);
        return (rows, "sample data");
    }

    let spinner = new_spinner("fetching stored rates...");
    let fetched = loader.fetch_recent(args.limit).await;
    spinner.finish_and_clear();

    match fetched {
        Ok(rows) if !rows.is_empty() => (rows, "sink"),
        Ok(_) => {
            warn!("sink returned no rows, falling back to sample data");
            let rows =
                sample::generate_rates(args.days, &config.base_currencies, &config.target_currency);
            (rows, "sample data (sink empty)")
        }
        Err(err) => {
            warn!(error = %err, "sink read failed, falling back to sample data");
            let rows =
                sample::generate_rates(args.days, &config.base_currencies, &config.target_currency);
            (rows, "sample data (fallback)")
        }
    }
}

/// Keeps rows inside the trailing date window and, when requested, a single
/// base currency. Result is sorted newest first.
fn apply_filters(rows: Vec<StoredRate>, args: &DashboardArgs) -> Vec<StoredRate> {
    let cutoff = Local::now().date_naive() - Duration::days(args.days as i64);
    let mut rows: Vec<_> = rows
        .into_iter()
        .filter(|row| match row.date.parse::<NaiveDate>() {
            Ok(date) => date >= cutoff,
            Err(_) => false,
        })
        .filter(|row| {
            args.currency
                .as_ref()
                .is_none_or(|c| row.base_currency.eq_ignore_ascii_case(c))
        })
        .collect();

    rows.sort_by(|a, b| {
        b.date
            .cmp(&a.date)
            .then_with(|| a.currency_pair.cmp(&b.currency_pair))
    });
    rows
}

fn print_metrics(rows: &[StoredRate]) {
    let latest = rows.iter().map(|r| r.date.as_str()).max().unwrap_or("-");
    let pairs: BTreeMap<&str, ()> = rows.iter().map(|r| (r.currency_pair.as_str(), ())).collect();
    let avg = rows.iter().map(|r| r.rate).sum::<f64>() / rows.len() as f64;

    println!(
        "{} {latest}   {} {}   {} {}   {} {avg:.4}",
        style_text("latest:", StyleType::Label),
        style_text("records:", StyleType::Label),
        rows.len(),
        style_text("pairs:", StyleType::Label),
        pairs.len(),
        style_text("avg rate:", StyleType::Label),
    );
}

fn rates_table(rows: &[StoredRate]) -> Table {
    let mut table = new_styled_table();
    table.set_header(vec![
        header_cell("Date"),
        header_cell("Pair"),
        header_cell("Rate"),
        header_cell("Base"),
        header_cell("Target"),
    ]);
    for row in rows {
        table.add_row(vec![
            comfy_table::Cell::new(&row.date),
            comfy_table::Cell::new(&row.currency_pair),
            rate_cell(row.rate),
            comfy_table::Cell::new(&row.base_currency),
            comfy_table::Cell::new(&row.target_currency),
        ]);
    }
    table
}

#[derive(Debug, PartialEq)]
struct PairStats {
    mean: f64,
    std_dev: f64,
    min: f64,
    max: f64,
    latest: f64,
}

/// Per-pair statistics over rows sorted oldest first.
fn pair_stats(rates: &[f64]) -> PairStats {
    let n = rates.len() as f64;
    let mean = rates.iter().sum::<f64>() / n;
    let std_dev = if rates.len() > 1 {
        (rates.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1.0)).sqrt()
    } else {
        0.0
    };
    PairStats {
        mean,
        std_dev,
        min: rates.iter().copied().fold(f64::INFINITY, f64::min),
        max: rates.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        latest: *rates.last().unwrap_or(&0.0),
    }
}

fn stats_table(rows: &[StoredRate]) -> Table {
    // Group by pair, oldest first within each series.
    let mut series: BTreeMap<&str, Vec<(&str, f64)>> = BTreeMap::new();
    for row in rows {
        series
            .entry(row.currency_pair.as_str())
            .or_default()
            .push((row.date.as_str(), row.rate));
    }

    let mut table = new_styled_table();
    table.set_header(vec![
        header_cell("Pair"),
        header_cell("Latest"),
        header_cell("Mean"),
        header_cell("Std Dev"),
        header_cell("Min"),
        header_cell("Max"),
        header_cell("Trend"),
    ]);

    for (pair, mut points) in series {
        points.sort_by(|a, b| a.0.cmp(b.0));
        let rates: Vec<f64> = points.iter().map(|(_, r)| *r).collect();
        let stats = pair_stats(&rates);
        table.add_row(vec![
            comfy_table::Cell::new(pair),
            rate_cell(stats.latest),
            rate_cell(stats.mean),
            rate_cell(stats.std_dev),
            rate_cell(stats.min),
            rate_cell(stats.max),
            comfy_table::Cell::new(sparkline(&rates)),
        ]);
    }
    table
}
