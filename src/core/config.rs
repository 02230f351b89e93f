use anyhow::{Context, Result, bail};
use std::env;

pub const DEFAULT_API_BASE_URL: &str = "https://api.exchangerate.host";
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Process-wide settings, loaded once at startup and passed down to
/// constructors. Immutable thereafter.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_key: String,
    pub api_base_url: String,
    pub supabase_url: Option<String>,
    pub supabase_key: Option<String>,
    pub log_level: String,
    pub batch_size: usize,
    pub base_currencies: Vec<String>,
    pub target_currency: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            api_key: String::new(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            supabase_url: None,
            supabase_key: None,
            log_level: "info".to_string(),
            batch_size: DEFAULT_BATCH_SIZE,
            base_currencies: vec!["USD".into(), "EUR".into(), "GBP".into()],
            target_currency: "GHS".to_string(),
        }
    }
}

impl AppConfig {
    /// Reads configuration from the environment, after loading an optional
    /// `.env` file. The sink credentials default to unconfigured; everything
    /// else has a usable default. Fails only on unparseable values.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let mut config = AppConfig::default();
        if let Ok(key) = env::var("EXCHANGERATE_API_KEY") {
            config.api_key = key;
        }
        if let Ok(url) = env::var("EXCHANGERATE_BASE_URL") {
            config.api_base_url = url;
        }
        config.supabase_url = env::var("SUPABASE_URL").ok().filter(|v| !v.is_empty());
        config.supabase_key = env::var("SUPABASE_KEY").ok().filter(|v| !v.is_empty());
        if let Ok(level) = env::var("LOG_LEVEL") {
            config.log_level = level;
        }
        if let Ok(raw) = env::var("BATCH_SIZE") {
            config.batch_size = raw
                .trim()
                .parse()
                .with_context(|| format!("invalid BATCH_SIZE value: {raw}"))?;
        }
        Ok(config)
    }

    /// The API key is only mandatory for commands that talk to the rate API.
    pub fn require_api_key(&self) -> Result<&str> {
        if self.api_key.trim().is_empty() {
            bail!("EXCHANGERATE_API_KEY is required");
        }
        Ok(&self.api_key)
    }

    pub fn sink_configured(&self) -> bool {
        self.supabase_url.is_some() && self.supabase_key.is_some()
    }
}
