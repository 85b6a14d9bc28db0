//! Rendezvous, configuration and log locations
//!
//! The rendezvous file lives in the system temp directory so that a launched
//! process and the host agree on it without any prior channel.

use std::io;
use std::path::PathBuf;

/// Name used for project directories
const PROJECT_NAME: &str = "remote-apps";

/// File name of the shared rendezvous file
const RENDEZVOUS_FILE: &str = "remote-apps-launcher.txt";

/// Default rendezvous file path: `<temp dir>/remote-apps-launcher.txt`
pub fn default_rendezvous_path() -> PathBuf {
    std::env::temp_dir().join(RENDEZVOUS_FILE)
}

/// A fresh, unique rendezvous path for a single launched application
///
/// Used when one host launches one application and the shared file would
/// only get in the way.
pub fn private_rendezvous_path(application: &str) -> PathBuf {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or_default();
    std::env::temp_dir().join(format!(
        "{}-{}-{}-{}.txt",
        PROJECT_NAME,
        application,
        std::process::id(),
        nanos
    ))
}

/// Get the configuration directory path
///
/// Uses the directories crate for platform-appropriate locations:
/// - Linux: `~/.config/remote-apps/`
/// - macOS: `~/Library/Application Support/remote-apps/`
/// - Windows: `%APPDATA%\remote-apps\`
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", PROJECT_NAME)
        .map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the configuration file
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("config.toml"))
}

/// Get the path to the log directory
pub fn log_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", PROJECT_NAME)
        .map(|dirs| dirs.data_dir().join("logs"))
}

/// Ensure the configuration directory exists
pub fn ensure_config_dir() -> io::Result<Option<PathBuf>> {
    if let Some(dir) = config_dir() {
        if !dir.exists() {
            std::fs::create_dir_all(&dir)?;
        }
        Ok(Some(dir))
    } else {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_rendezvous_in_temp_dir() {
        let path = default_rendezvous_path();
        assert!(path.starts_with(std::env::temp_dir()));
        assert!(path.ends_with(RENDEZVOUS_FILE));
    }

    #[test]
    fn test_private_rendezvous_differs_from_shared() {
        let path = private_rendezvous_path("calc");
        assert_ne!(path, default_rendezvous_path());
        assert!(path.to_string_lossy().contains("calc"));
    }

    #[test]
    fn test_config_dir_is_valid() {
        let dir = config_dir();
        assert!(dir.is_some());
    }
}
