//! Core domain types and abstractions

pub mod config;
pub mod log;
pub mod provider;
pub mod rate;
pub mod sink;

// Re-export main types for cleaner imports
pub use config::AppConfig;
pub use provider::RateProvider;
pub use rate::{RawRate, StoredRate, VALID_CURRENCIES};
pub use sink::RateSink;
