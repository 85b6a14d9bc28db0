//! Connection negotiation with a launched application
//!
//! Polls the rendezvous file (or an explicit URL) until the application's
//! importer answers, or the timeout runs out.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use crate::common::{Error, Result};
use crate::rendezvous::RendezvousStore;
use crate::rpc::protocol::LIBRARY_IMPORTER;
use crate::rpc::{EndpointUrl, RpcChannel, RpcConnector};

/// Name looked up in the rendezvous file when no alias is given
pub const DEFAULT_APPLICATION: &str = "application";

pub struct Negotiator {
    store: RendezvousStore,
    connector: Arc<dyn RpcConnector>,
    backoff: Duration,
}

impl Negotiator {
    pub fn new(store: RendezvousStore, connector: Arc<dyn RpcConnector>, backoff: Duration) -> Self {
        Self {
            store,
            connector,
            backoff,
        }
    }

    pub fn store(&self) -> &RendezvousStore {
        &self.store
    }

    /// Connect to the importer of `alias`
    ///
    /// Unreachable services and malformed URLs are retried every backoff
    /// interval until `timeout` has elapsed; an attempt still in flight at
    /// the deadline is abandoned. On success the rendezvous file is removed
    /// so stale records do not leak into later runs.
    pub async fn connect(
        &self,
        alias: Option<&str>,
        timeout: Duration,
        explicit_url: Option<&str>,
    ) -> Result<Box<dyn RpcChannel>> {
        let start = Instant::now();

        while start.elapsed() < timeout {
            // A single attempt may hang on a silent endpoint
            let remaining = timeout.saturating_sub(start.elapsed());
            let attempt = self.attempt(alias, explicit_url);
            let attempt = match tokio::time::timeout(remaining, attempt).await {
                Ok(attempt) => attempt,
                Err(_) => {
                    tracing::debug!("Connection attempt did not finish before the deadline");
                    break;
                }
            };

            match attempt {
                Ok(Some(channel)) => {
                    if let Err(e) = self.store.remove() {
                        tracing::debug!("Could not remove rendezvous file: {}", e);
                    }
                    tracing::info!(alias = alias.unwrap_or_default(), "Connected to {}", channel.url());
                    return Ok(channel);
                }
                Ok(None) => {}
                Err(e) if e.is_transient() => {
                    tracing::trace!("Application not ready yet: {}", e);
                }
                Err(e) => return Err(e),
            }
            tokio::time::sleep(self.backoff).await;
        }

        Err(Error::could_not_connect(alias))
    }

    async fn attempt(
        &self,
        alias: Option<&str>,
        explicit_url: Option<&str>,
    ) -> Result<Option<Box<dyn RpcChannel>>> {
        let Some(candidate) = self.candidate_url(alias, explicit_url)? else {
            return Ok(None);
        };

        tracing::trace!("Trying to connect to {}", candidate);
        let url: EndpointUrl = candidate.parse()?;
        let channel = self.connector.connect(&url, LIBRARY_IMPORTER).await?;
        Ok(Some(channel))
    }

    fn candidate_url(&self, alias: Option<&str>, explicit_url: Option<&str>) -> Result<Option<String>> {
        if let Some(url) = explicit_url {
            return Ok(Some(url.to_string()));
        }
        match self.store.retrieve(alias.unwrap_or(DEFAULT_APPLICATION)) {
            Ok(url) => Ok(url),
            Err(Error::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }
}
