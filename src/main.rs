use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use fxetl::cli::dashboard::DashboardArgs;
use fxetl::core::log::init_logging;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the ETL pipeline once
    Run,
    /// Display stored exchange rates in the terminal
    Dashboard {
        /// Render synthetic data instead of reading the sink
        #[arg(long)]
        sample: bool,
        /// Days of history to display
        #[arg(long, default_value_t = 30)]
        days: u32,
        /// Only show rates for this base currency
        #[arg(long)]
        currency: Option<String>,
        /// Maximum rows to fetch from the sink
        #[arg(long, default_value_t = 500)]
        limit: usize,
    },
    /// Probe sink connectivity
    Check,
}

impl From<Commands> for fxetl::AppCommand {
    fn from(cmd: Commands) -> fxetl::AppCommand {
        match cmd {
            Commands::Run => fxetl::AppCommand::Run,
            Commands::Dashboard {
                sample,
                days,
                currency,
                limit,
            } => fxetl::AppCommand::Dashboard(DashboardArgs {
                sample,
                days,
                currency,
                limit,
            }),
            Commands::Check => fxetl::AppCommand::Check,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = fxetl::AppConfig::from_env()?;
    init_logging(&config.log_level, cli.verbose);

    let result = match cli.command {
        Some(cmd) => fxetl::run_command(cmd.into(), config).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "application failed");
    }
    result
}
