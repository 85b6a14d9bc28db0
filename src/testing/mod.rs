//! Keyword suite runner
//!
//! Reads YAML keyword suites and runs them through a `ConnectorRegistry`,
//! asserting against structured keyword results.

mod config;
mod runner;

pub use config::*;
pub use runner::{load_suite, run_steps, run_suite, SuiteResult};
