use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Installs the global tracing subscriber. `RUST_LOG` wins when set;
/// otherwise the configured level applies, with `--verbose` forcing debug.
pub fn init_logging(level: &str, verbose: bool) {
    let default_level = if verbose { "debug" } else { level };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(env_filter)
        .init();
}
