//! Common utilities shared between the host and the agent

pub mod config;
pub mod error;
pub mod logging;
pub mod paths;
pub mod timestr;

pub use error::{Error, Result};

/// Normalize a name for case-, space- and underscore-insensitive matching
///
/// `"Application Started"`, `"application_started"` and `"APPLICATIONSTARTED"`
/// all normalize to `"applicationstarted"`.
pub fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_whitespace() && *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}
