//! One connected application: its importer and the libraries taken into use

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use crate::common::{Error, Result};
use crate::rpc::protocol::importer;
use crate::rpc::{EndpointUrl, RpcChannel, RpcConnector};

use super::negotiator::Negotiator;
use super::remote_library::RemoteLibrary;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connected,
}

pub struct RemoteApplication {
    alias: Option<String>,
    connector: Arc<dyn RpcConnector>,
    importer: Option<Box<dyn RpcChannel>>,
    libraries: Vec<RemoteLibrary>,
}

impl RemoteApplication {
    pub fn new(connector: Arc<dyn RpcConnector>) -> Self {
        Self {
            alias: None,
            connector,
            importer: None,
            libraries: Vec::new(),
        }
    }

    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    pub fn state(&self) -> ConnectionState {
        if self.importer.is_some() {
            ConnectionState::Connected
        } else {
            ConnectionState::Disconnected
        }
    }

    pub fn libraries(&self) -> &[RemoteLibrary] {
        &self.libraries
    }

    /// Wait for the application's importer and connect to it
    pub async fn application_started(
        &mut self,
        alias: Option<&str>,
        timeout: Duration,
        url: Option<&str>,
        negotiator: &Negotiator,
    ) -> Result<()> {
        if self.importer.is_some() {
            return Err(Error::AlreadyConnected);
        }
        self.alias = alias.map(String::from);
        self.importer = Some(negotiator.connect(alias, timeout, url).await?);
        Ok(())
    }

    pub async fn take_libraries_into_use(&mut self, identifiers: &[String]) -> Result<()> {
        for identifier in identifiers {
            self.take_library_into_use(identifier).await?;
        }
        Ok(())
    }

    /// Import one library, returning the keyword names it brings
    pub async fn take_library_into_use(&mut self, identifier: &str) -> Result<Vec<String>> {
        let url = self.import_remote_library(identifier).await?;
        let mut library = RemoteLibrary::open(self.connector.clone(), url)
            .await
            .map_err(|e| self.connectivity_to_could_not_connect(e))?;
        let keywords = library.keyword_names().await?;

        tracing::info!(
            alias = self.alias().unwrap_or_default(),
            library = identifier,
            "Took library into use with {} keywords",
            keywords.len()
        );
        self.libraries.push(library);
        Ok(keywords)
    }

    /// Ask the application to close
    ///
    /// The application acknowledges by severing the connection, so a
    /// connectivity error is the success case. An ordinary reply means the
    /// application is still running.
    pub async fn close_application(&mut self) -> Result<()> {
        let channel = self.importer.as_mut().ok_or(Error::NotConnected)?;

        let reply = channel.invoke(importer::CLOSE_SERVICE, Vec::new()).await;
        match reply {
            Err(e) if e.is_connectivity() => {
                tracing::info!(alias = self.alias().unwrap_or_default(), "Application closed");
                self.release().await;
                Ok(())
            }
            Ok(_) => Err(Error::CloseFailed),
            Err(e) => Err(e),
        }
    }

    /// Keyword names of every library in import order, duplicates included
    pub async fn keyword_names(&mut self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for library in &mut self.libraries {
            names.extend(library.keyword_names().await?);
        }
        Ok(names)
    }

    /// Run a keyword in the first imported library that has it
    ///
    /// `Ok(None)` when no library claims the name.
    pub async fn run_keyword(&mut self, name: &str, args: Vec<Value>) -> Result<Option<Value>> {
        match self.libraries.iter_mut().find(|library| library.has_keyword(name)) {
            Some(library) => library.run_keyword(name, args).await.map(Some),
            None => Ok(None),
        }
    }

    async fn import_remote_library(&mut self, identifier: &str) -> Result<EndpointUrl> {
        let Some(channel) = self.importer.as_mut() else {
            return Err(Error::NotConnected);
        };

        let reply = channel
            .invoke(importer::IMPORT_LIBRARY, vec![Value::from(identifier)])
            .await;
        let value = reply.map_err(|e| self.connectivity_to_could_not_connect(e))?;

        value
            .as_str()
            .ok_or_else(|| Error::Internal(format!("importer returned {} for '{}'", value, identifier)))?
            .parse()
    }

    fn connectivity_to_could_not_connect(&self, error: Error) -> Error {
        if error.is_connectivity() {
            tracing::debug!("Import failed: {}", error);
            Error::could_not_connect(self.alias())
        } else {
            error
        }
    }

    async fn release(&mut self) {
        if let Some(mut channel) = self.importer.take() {
            channel.close().await;
        }
        for library in &mut self.libraries {
            library.close().await;
        }
        self.libraries.clear();
    }
}
