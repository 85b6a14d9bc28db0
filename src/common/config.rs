//! Configuration file handling

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use super::paths::{config_path, default_rendezvous_path};
use super::{timestr, Result};

/// Main configuration structure
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// Rendezvous file settings
    #[serde(default)]
    pub rendezvous: RendezvousConfig,

    /// Timeout settings
    #[serde(default)]
    pub timeouts: Timeouts,

    /// Agent settings
    #[serde(default)]
    pub agent: AgentConfig,
}

/// Where launched applications publish their importer URL
#[derive(Debug, Clone, Deserialize)]
pub struct RendezvousConfig {
    #[serde(default = "default_rendezvous_path")]
    pub path: PathBuf,
}

impl Default for RendezvousConfig {
    fn default() -> Self {
        Self {
            path: default_rendezvous_path(),
        }
    }
}

/// Timeout settings
#[derive(Debug, Clone, Deserialize)]
pub struct Timeouts {
    /// Connect timeout used when a keyword omits its timeout string
    #[serde(default = "default_connect")]
    pub connect: String,

    /// Pause between connection attempts
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            connect: default_connect(),
            poll_interval_ms: default_poll_interval(),
        }
    }
}

fn default_connect() -> String {
    timestr::DEFAULT_TIMEOUT.to_string()
}
fn default_poll_interval() -> u64 {
    2000
}

impl Timeouts {
    /// Backoff between connection attempts
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Resolve a keyword's timeout string, falling back to the configured default
    pub fn resolve(&self, timeout: Option<&str>) -> Result<Duration> {
        match timeout.map(str::trim) {
            Some(t) if !t.is_empty() => timestr::parse_timeout(t),
            _ => timestr::parse_timeout(&self.connect),
        }
    }
}

/// Agent (launched-process bootstrap) configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    /// Agent executable; defaults to the running executable
    pub path: Option<PathBuf>,

    /// Address published services listen on
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Host name written into published endpoint URLs
    #[serde(default = "default_advertised_host")]
    pub advertised_host: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            path: None,
            bind_address: default_bind_address(),
            advertised_host: default_advertised_host(),
        }
    }
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}
fn default_advertised_host() -> String {
    "localhost".to_string()
}

impl AgentConfig {
    /// Locate the agent executable
    ///
    /// Explicit configuration wins, then the running executable, then PATH.
    pub fn executable(&self) -> Result<PathBuf> {
        if let Some(path) = &self.path {
            return Ok(path.clone());
        }
        if let Ok(exe) = std::env::current_exe() {
            if exe.file_stem().is_some_and(|s| s == "remote-apps") {
                return Ok(exe);
            }
        }
        which::which("remote-apps").map_err(|e| {
            super::Error::LaunchFailed(format!("could not find the remote-apps agent: {}", e))
        })
    }
}

impl Config {
    /// Load configuration from the default config file
    ///
    /// Returns default configuration if file doesn't exist
    pub fn load() -> Result<Self> {
        if let Some(path) = config_path() {
            if path.exists() {
                let content = std::fs::read_to_string(&path).map_err(|e| {
                    super::Error::FileRead {
                        path: path.display().to_string(),
                        error: e.to_string(),
                    }
                })?;
                return Self::parse(&content);
            }
        }
        Ok(Self::default())
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| super::Error::ConfigParse(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.timeouts.poll_interval(), Duration::from_secs(2));
        assert_eq!(
            config.timeouts.resolve(None).unwrap(),
            Duration::from_secs(60)
        );
        assert_eq!(config.agent.advertised_host, "localhost");
    }

    #[test]
    fn test_parse_partial_file() {
        let config = Config::parse(
            r#"
[rendezvous]
path = "/tmp/custom.txt"

[timeouts]
connect = "5 seconds"
"#,
        )
        .unwrap();

        assert_eq!(config.rendezvous.path, PathBuf::from("/tmp/custom.txt"));
        assert_eq!(config.timeouts.resolve(Some("")).unwrap(), Duration::from_secs(5));
        assert_eq!(
            config.timeouts.resolve(Some("2 seconds")).unwrap(),
            Duration::from_secs(2)
        );
        assert_eq!(config.timeouts.poll_interval_ms, 2000);
        assert_eq!(config.agent.bind_address, "127.0.0.1");
    }

    #[test]
    fn test_parse_rejects_bad_toml() {
        assert!(matches!(
            Config::parse("timeouts = 3"),
            Err(crate::common::Error::ConfigParse(_))
        ));
    }
}
