//! Launched-process bootstrap
//!
//! Publishes the library importer, writes its URL to the rendezvous file and
//! then runs the application's own entry point until either the host closes
//! the importer or the entry point exits.

use std::process::Stdio;
use std::sync::Arc;

use tokio::process::Command;

use crate::common::{Error, Result};
use crate::rendezvous::RendezvousStore;
use crate::rpc::{EndpointUrl, ServiceExporter};

use super::importer::LibraryImporter;
use super::library::LibraryCatalog;

/// Well-known service name of the importer endpoint
pub const IMPORTER_SERVICE: &str = "robotrmiservice";

/// Importer URL for an agent started with a fixed port
pub fn importer_url(host: &str, port: u16) -> Result<EndpointUrl> {
    EndpointUrl::new(host, port, IMPORTER_SERVICE)
}

pub struct Bootstrap {
    store: RendezvousStore,
    application: String,
    port: Option<u16>,
    exporter: ServiceExporter,
    catalog: Arc<LibraryCatalog>,
}

impl Bootstrap {
    pub fn new(
        store: RendezvousStore,
        application: impl Into<String>,
        exporter: ServiceExporter,
        catalog: LibraryCatalog,
    ) -> Self {
        Self {
            store,
            application: application.into(),
            port: None,
            exporter,
            catalog: Arc::new(catalog),
        }
    }

    /// Publish the importer on a fixed port instead of a free one
    pub fn with_port(mut self, port: Option<u16>) -> Self {
        self.port = port;
        self
    }

    pub fn exporter(&self) -> &ServiceExporter {
        &self.exporter
    }

    /// Publish the importer and record its URL under the application name
    pub async fn publish(&self) -> Result<EndpointUrl> {
        let importer = Arc::new(LibraryImporter::new(
            self.catalog.clone(),
            self.exporter.clone(),
        ));

        let url = match self.port {
            Some(port) => {
                self.exporter
                    .publish_on(port, IMPORTER_SERVICE, importer)
                    .await?
            }
            None => self.exporter.publish(IMPORTER_SERVICE, importer).await?,
        };

        self.store.store(&self.application, &url.to_string())?;
        tracing::info!(
            application = %self.application,
            rendezvous = %self.store.path().display(),
            "Importer published at {}",
            url
        );
        Ok(url)
    }

    /// Publish, run the entry point and serve until closed
    ///
    /// `entry_point` is a program followed by its arguments; when empty the
    /// agent only serves its libraries.
    pub async fn run(self, entry_point: Vec<String>) -> Result<()> {
        self.publish().await?;

        let Some((program, args)) = entry_point.split_first() else {
            self.exporter.closed().await;
            tracing::info!("Importer closed, exiting");
            return Ok(());
        };

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::LaunchFailed(format!("{}: {}", program, e)))?;
        tracing::info!(program = %program, pid = ?child.id(), "Application started");

        let exited = tokio::select! {
            status = child.wait() => Some(status?),
            _ = self.exporter.closed() => None,
        };

        match exited {
            Some(status) => {
                tracing::info!("Application exited with {}", status);
                self.exporter.shutdown();
            }
            None => {
                tracing::info!("Importer closed, stopping application");
                if let Err(e) = child.kill().await {
                    tracing::warn!("Could not stop application: {}", e);
                }
            }
        }

        Ok(())
    }
}
