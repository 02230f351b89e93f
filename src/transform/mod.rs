//! Transform stage: cleaning and validation passes over raw rate records

pub mod cleaner;
pub mod validator;

pub use validator::QualityMetrics;
