//! Registry of connected applications
//!
//! Lifecycle keywords are handled here; every other keyword is forwarded to
//! the active application.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use crate::agent::bootstrap::importer_url;
use crate::common::config::{Config, Timeouts};
use crate::common::{normalize, Error, Result};
use crate::rendezvous::RendezvousStore;
use crate::rpc::{RpcConnector, TcpConnector};

use super::application::RemoteApplication;
use super::keywords::{KeywordSpec, LocalKeyword, LOCAL_KEYWORDS};
use super::launch::{AgentLauncher, LaunchConfig, ProcessLauncher};
use super::negotiator::Negotiator;

struct Entry {
    alias: String,
    application: RemoteApplication,
}

pub struct ConnectorRegistry {
    applications: BTreeMap<String, Entry>,
    active: Option<String>,
    negotiator: Negotiator,
    connector: Arc<dyn RpcConnector>,
    launcher: Box<dyn ProcessLauncher>,
    timeouts: Timeouts,
    agent_host: String,
}

impl ConnectorRegistry {
    /// Registry talking TCP and launching applications through the agent
    pub fn new(config: &Config) -> Self {
        Self::with_parts(
            config,
            Arc::new(TcpConnector),
            Box::new(AgentLauncher::new(config.agent.clone())),
        )
    }

    pub fn with_parts(
        config: &Config,
        connector: Arc<dyn RpcConnector>,
        launcher: Box<dyn ProcessLauncher>,
    ) -> Self {
        let negotiator = Negotiator::new(
            RendezvousStore::new(&config.rendezvous.path),
            connector.clone(),
            config.timeouts.poll_interval(),
        );
        Self {
            applications: BTreeMap::new(),
            active: None,
            negotiator,
            connector,
            launcher,
            timeouts: config.timeouts.clone(),
            agent_host: config.agent.advertised_host.clone(),
        }
    }

    /// Alias of the active application
    pub fn active_alias(&self) -> Option<&str> {
        let key = self.active.as_ref()?;
        self.applications.get(key).map(|entry| entry.alias.as_str())
    }

    /// Registered aliases as given by the user
    pub fn aliases(&self) -> Vec<&str> {
        self.applications.values().map(|e| e.alias.as_str()).collect()
    }

    /// Launch `command` under the agent and connect to it
    pub async fn start_application(
        &mut self,
        alias: &str,
        command: &str,
        timeout: Option<&str>,
        port: Option<u16>,
    ) -> Result<()> {
        self.check_alias_free(alias)?;
        let timeout = self.timeouts.resolve(timeout)?;

        let launch = LaunchConfig::new(alias, command, self.negotiator.store().path())
            .with_port(port);
        self.launcher.launch(&launch)?;

        let url = port
            .map(|port| importer_url(&self.agent_host, port))
            .transpose()?
            .map(|url| url.to_string());
        let connected = self.connect(alias, timeout, url.as_deref()).await;
        if let Err(e) = &connected {
            tracing::warn!(
                rendezvous = %launch.rendezvous.display(),
                "Application '{}' was launched but did not connect ({}); its agent may still be running",
                alias,
                e
            );
        }
        connected
    }

    /// Connect to an application started by other means
    pub async fn application_started(
        &mut self,
        alias: &str,
        timeout: Option<&str>,
        url: Option<&str>,
    ) -> Result<()> {
        self.check_alias_free(alias)?;
        let timeout = self.timeouts.resolve(timeout)?;
        self.connect(alias, timeout, url).await
    }

    pub fn switch_to_application(&mut self, alias: &str) -> Result<()> {
        let key = normalize(alias);
        if !self.applications.contains_key(&key) {
            return Err(Error::UnknownAlias(alias.to_string()));
        }
        tracing::debug!("Switched to application '{}'", alias);
        self.active = Some(key);
        Ok(())
    }

    pub async fn take_libraries_into_use(&mut self, identifiers: &[String]) -> Result<()> {
        self.active_application()?
            .take_libraries_into_use(identifiers)
            .await
    }

    pub async fn take_library_into_use(&mut self, identifier: &str) -> Result<Vec<String>> {
        self.active_application()?
            .take_library_into_use(identifier)
            .await
    }

    /// Close one application, the active one when `alias` is `None`
    ///
    /// The alias is released whether or not closing succeeds.
    pub async fn close_application(&mut self, alias: Option<&str>) -> Result<()> {
        let key = match alias {
            Some(alias) => normalize(alias),
            None => self.active.clone().ok_or(Error::NoActiveApplication)?,
        };
        let mut entry = self
            .applications
            .remove(&key)
            .ok_or_else(|| Error::UnknownAlias(alias.unwrap_or_default().to_string()))?;
        if self.active.as_ref() == Some(&key) {
            self.active = None;
        }

        tracing::info!("Closing application '{}'", entry.alias);
        entry.application.close_application().await
    }

    /// Close every application, logging failures instead of returning them
    pub async fn close_all_applications(&mut self) {
        let applications = std::mem::take(&mut self.applications);
        self.active = None;

        for (_, mut entry) in applications {
            if let Err(e) = entry.application.close_application().await {
                tracing::warn!("Could not close application '{}': {}", entry.alias, e);
            }
        }
    }

    /// Remote keywords of every application followed by the local keywords
    pub async fn keyword_names(&mut self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in self.applications.values_mut() {
            names.extend(entry.application.keyword_names().await?);
        }
        names.extend(LOCAL_KEYWORDS.iter().map(|spec| spec.name.to_string()));
        Ok(names)
    }

    pub fn keyword_arguments(&self, name: &str) -> Vec<String> {
        match KeywordSpec::find(name) {
            Some(spec) => spec.arguments(),
            None => vec!["*args".to_string()],
        }
    }

    pub fn keyword_documentation(&self, name: &str) -> String {
        KeywordSpec::find(name)
            .map(|spec| spec.doc.to_string())
            .unwrap_or_default()
    }

    /// Run a local lifecycle keyword or forward to the active application
    pub async fn run_keyword(&mut self, name: &str, args: Vec<Value>) -> Result<Value> {
        if let Some(spec) = KeywordSpec::find(name) {
            return self.run_local(spec, args).await;
        }

        let application = self.active_application()?;
        match application.run_keyword(name, args).await? {
            Some(result) => Ok(result),
            None => Err(Error::UnknownKeyword(name.to_string())),
        }
    }

    async fn run_local(&mut self, spec: &KeywordSpec, args: Vec<Value>) -> Result<Value> {
        let args = spec.bind(args)?;

        match spec.keyword {
            LocalKeyword::StartApplication => {
                let port = args
                    .get(3)
                    .map(|p| {
                        p.parse::<u16>().map_err(|_| {
                            Error::invalid_arguments(spec.name, format!("invalid port '{}'", p))
                        })
                    })
                    .transpose()?;
                self.start_application(args.required(0), args.required(1), args.get(2), port)
                    .await?;
            }
            LocalKeyword::ApplicationStarted => {
                self.application_started(args.required(0), args.get(1), args.get(2))
                    .await?;
            }
            LocalKeyword::SwitchToApplication => self.switch_to_application(args.required(0))?,
            LocalKeyword::CloseApplication => self.close_application(args.get(0)).await?,
            LocalKeyword::CloseAllApplications => self.close_all_applications().await,
            LocalKeyword::TakeLibrariesIntoUse => {
                self.take_libraries_into_use(args.rest()).await?;
            }
            LocalKeyword::TakeLibraryIntoUse => {
                let keywords = self.take_library_into_use(args.required(0)).await?;
                return Ok(Value::from(keywords));
            }
        }
        Ok(Value::Null)
    }

    async fn connect(&mut self, alias: &str, timeout: Duration, url: Option<&str>) -> Result<()> {
        let mut application = RemoteApplication::new(self.connector.clone());
        application
            .application_started(Some(alias), timeout, url, &self.negotiator)
            .await?;

        let key = normalize(alias);
        self.applications.insert(
            key.clone(),
            Entry {
                alias: alias.to_string(),
                application,
            },
        );
        self.active = Some(key);
        tracing::info!("Application '{}' connected", alias);
        Ok(())
    }

    fn check_alias_free(&self, alias: &str) -> Result<()> {
        if self.applications.contains_key(&normalize(alias)) {
            return Err(Error::AliasInUse(alias.to_string()));
        }
        Ok(())
    }

    fn active_application(&mut self) -> Result<&mut RemoteApplication> {
        let key = self.active.as_ref().ok_or(Error::NoActiveApplication)?;
        self.applications
            .get_mut(key)
            .map(|entry| &mut entry.application)
            .ok_or(Error::NoActiveApplication)
    }
}
