//! Keyword suite configuration types
//!
//! Defines the data structures for deserializing YAML keyword suites.

use serde::Deserialize;
use serde_json::Value;
use std::path::PathBuf;

/// A keyword suite loaded from a YAML file
#[derive(Deserialize, Debug)]
pub struct Suite {
    /// Name of the suite
    pub name: String,
    /// Optional description of what the suite verifies
    pub description: Option<String>,
    /// Rendezvous file overriding the configured one, relative to the suite
    pub rendezvous: Option<PathBuf>,
    /// Shell commands to run before the first step
    #[serde(default)]
    pub setup: Vec<SetupStep>,
    /// Keywords to run, in order
    pub steps: Vec<KeywordStep>,
}

/// A setup step that runs before the suite
#[derive(Deserialize, Debug)]
pub struct SetupStep {
    /// Shell command to execute
    pub shell: String,
}

/// A single keyword call
#[derive(Deserialize, Debug)]
pub struct KeywordStep {
    /// Keyword name, local (e.g. "Start Application") or remote
    pub keyword: String,
    /// Positional arguments passed as-is
    #[serde(default)]
    pub args: Vec<Value>,
    /// Optional expectations for the keyword result
    pub expect: Option<Expectation>,
}

/// Expectations for a keyword result
#[derive(Deserialize, Debug)]
pub struct Expectation {
    /// Whether the keyword should succeed (default: true)
    pub success: Option<bool>,
    /// Expected return value (exact match)
    pub result: Option<Value>,
    /// Substring expected in the return value, or in the error when failure
    /// is expected
    pub result_contains: Option<String>,
}
