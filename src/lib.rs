//! Loan recovery dashboard: extracts records from the current-month and
//! last-month spreadsheet exports and aggregates them per branch and per
//! collection officer.

pub mod config;
pub mod error;
pub mod extractor;
pub mod loader;
pub mod metrics;
pub mod output;
pub mod store;
pub mod types;
pub mod util;
