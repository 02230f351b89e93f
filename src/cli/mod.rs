//! Terminal output: dashboard, run summary, table helpers

pub mod dashboard;
pub mod sample;
pub mod summary;
pub mod ui;
