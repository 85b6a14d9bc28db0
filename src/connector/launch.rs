//! Launching applications under the agent
//!
//! The host never starts an application directly: it spawns this binary's
//! hidden `agent` subcommand, which publishes the importer, records it in the
//! rendezvous file and then runs the application command.

use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use crate::common::config::{AgentConfig, Config};
use crate::common::{paths, Error, Result};
use crate::rendezvous::RendezvousStore;
use crate::rpc::protocol::{importer, LIBRARY_IMPORTER};
use crate::rpc::{EndpointUrl, RpcConnector, TcpConnector};

use super::remote_library::RemoteLibrary;

#[cfg(unix)]
const SHELL: [&str; 2] = ["sh", "-c"];
#[cfg(windows)]
const SHELL: [&str; 2] = ["cmd", "/C"];

/// Everything the agent needs to start one application
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchConfig {
    pub application: String,
    pub command: String,
    pub rendezvous: PathBuf,
    pub port: Option<u16>,
}

impl LaunchConfig {
    pub fn new(
        application: impl Into<String>,
        command: impl Into<String>,
        rendezvous: impl Into<PathBuf>,
    ) -> Self {
        Self {
            application: application.into(),
            command: command.into(),
            rendezvous: rendezvous.into(),
            port: None,
        }
    }

    pub fn with_port(mut self, port: Option<u16>) -> Self {
        self.port = port;
        self
    }

    /// Arguments for the agent executable
    pub fn agent_args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "agent".into(),
            self.rendezvous.clone().into(),
            self.application.clone().into(),
        ];
        if let Some(port) = self.port {
            args.push("--port".into());
            args.push(port.to_string().into());
        }
        args.push("--".into());
        args.extend(SHELL.iter().map(OsString::from));
        args.push(self.command.clone().into());
        args
    }
}

/// Starts applications; swapped out in tests
pub trait ProcessLauncher: Send + Sync {
    fn launch(&self, config: &LaunchConfig) -> Result<()>;
}

/// Spawns the agent as a detached process
pub struct AgentLauncher {
    agent: AgentConfig,
}

impl AgentLauncher {
    pub fn new(agent: AgentConfig) -> Self {
        Self { agent }
    }
}

impl ProcessLauncher for AgentLauncher {
    fn launch(&self, config: &LaunchConfig) -> Result<()> {
        let exe = self.agent.executable()?;
        tracing::debug!(
            agent = %exe.display(),
            application = %config.application,
            "Launching '{}'",
            config.command
        );

        let mut command = std::process::Command::new(&exe);
        command
            .args(config.agent_args())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        // The agent logs to its own file and must outlive our terminal
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }
        #[cfg(windows)]
        {
            use std::os::windows::process::CommandExt;
            const DETACHED_PROCESS: u32 = 0x00000008;
            const CREATE_NEW_PROCESS_GROUP: u32 = 0x00000200;
            command.creation_flags(DETACHED_PROCESS | CREATE_NEW_PROCESS_GROUP);
        }

        let child = command
            .spawn()
            .map_err(|e| Error::LaunchFailed(format!("{}: {}", exe.display(), e)))?;
        tracing::info!(pid = child.id(), application = %config.application, "Agent started");
        Ok(())
    }
}

/// Launches a single application and imports libraries from it
///
/// Uses a rendezvous file of its own, so nothing else publishing to the
/// shared file can interfere.
pub struct Launcher {
    application: String,
    store: RendezvousStore,
    process: Box<dyn ProcessLauncher>,
    connector: Arc<dyn RpcConnector>,
    poll_interval: Duration,
    timeout: Duration,
}

impl Launcher {
    pub fn new(application: impl Into<String>, config: &Config) -> Result<Self> {
        let application = application.into();
        let store = RendezvousStore::new(paths::private_rendezvous_path(&application));
        Ok(Self::with_parts(
            application,
            store,
            Box::new(AgentLauncher::new(config.agent.clone())),
            Arc::new(TcpConnector),
            config.timeouts.poll_interval(),
            config.timeouts.resolve(None)?,
        ))
    }

    pub fn with_parts(
        application: impl Into<String>,
        store: RendezvousStore,
        process: Box<dyn ProcessLauncher>,
        connector: Arc<dyn RpcConnector>,
        poll_interval: Duration,
        timeout: Duration,
    ) -> Self {
        Self {
            application: application.into(),
            store,
            process,
            connector,
            poll_interval,
            timeout,
        }
    }

    pub fn rendezvous(&self) -> &RendezvousStore {
        &self.store
    }

    pub fn start_application(&self, command: &str) -> Result<()> {
        let config = LaunchConfig::new(&self.application, command, self.store.path());
        self.process.launch(&config)
    }

    /// Wait for the application's importer and import one library from it
    pub async fn import_remote_library(&self, identifier: &str) -> Result<RemoteLibrary> {
        let url = self.importer_url().await?;
        let mut channel = self.connector.connect(&url, LIBRARY_IMPORTER).await?;
        let reply = channel
            .invoke(importer::IMPORT_LIBRARY, vec![Value::from(identifier)])
            .await;
        channel.close().await;

        let reply = reply?;
        let library_url: EndpointUrl = reply
            .as_str()
            .ok_or_else(|| Error::Internal(format!("importer returned {} for '{}'", reply, identifier)))?
            .parse()?;
        RemoteLibrary::open(self.connector.clone(), library_url).await
    }

    async fn importer_url(&self) -> Result<EndpointUrl> {
        let lookup = async {
            loop {
                let found = self
                    .store
                    .wait_and_retrieve(&self.application, self.poll_interval)
                    .await?;
                if let Some(url) = found {
                    return url.parse::<EndpointUrl>();
                }
                tokio::time::sleep(self.poll_interval).await;
            }
        };

        tokio::time::timeout(self.timeout, lookup)
            .await
            .map_err(|_| Error::could_not_connect(Some(&self.application)))?
    }
}
