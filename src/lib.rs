pub mod cli;
pub mod core;
pub mod pipeline;
pub mod providers;
pub mod store;
pub mod transform;

pub use crate::core::config::AppConfig;

use anyhow::{Result, bail};
use std::sync::Arc;
use tracing::info;

use crate::cli::dashboard::DashboardArgs;
use crate::pipeline::EtlPipeline;
use crate::providers::ExchangeRateHostProvider;
use crate::store::Loader;

pub enum AppCommand {
    Run,
    Dashboard(DashboardArgs),
    Check,
}

pub async fn run_command(command: AppCommand, config: AppConfig) -> Result<()> {
    match command {
        AppCommand::Run => run_pipeline(config).await,
        AppCommand::Dashboard(args) => cli::dashboard::render(&config, &args).await,
        AppCommand::Check => check_sink(config).await,
    }
}

async fn run_pipeline(config: AppConfig) -> Result<()> {
    config.require_api_key()?;
    info!("exchange rate etl starting");

    let provider = Arc::new(ExchangeRateHostProvider::new(
        &config.api_base_url,
        &config.api_key,
    )?);
    let loader = Loader::from_config(&config)?;
    let pipeline = EtlPipeline::new(provider, loader, &config);

    let report = pipeline.run().await;
    cli::summary::print_run_summary(&report);

    if report.success {
        Ok(())
    } else {
        bail!(
            report
                .error
                .unwrap_or_else(|| "pipeline failed".to_string())
        )
    }
}

async fn check_sink(config: AppConfig) -> Result<()> {
    let loader = Loader::from_config(&config)?;
    if !loader.is_configured() {
        bail!("sink not configured: set SUPABASE_URL and SUPABASE_KEY");
    }
    if loader.test_connection().await {
        println!(
            "{}",
            cli::ui::style_text("sink reachable", cli::ui::StyleType::Good)
        );
        Ok(())
    } else {
        bail!("sink connection test failed")
    }
}
