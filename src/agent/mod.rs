//! Agent mode - the bootstrap running inside a launched application
//!
//! Started with a rendezvous file path and an application name, the agent:
//! 1. Publishes a library importer on its own endpoint
//! 2. Appends the importer URL to the rendezvous file
//! 3. Runs the application's entry point, if one was given
//! 4. Serves library imports and keyword calls until the host closes it

pub mod bootstrap;
pub mod builtin;
pub mod importer;
pub mod library;

use std::path::PathBuf;

use crate::common::{config::Config, Result};
use crate::rendezvous::RendezvousStore;
use crate::rpc::ServiceExporter;

pub use bootstrap::{Bootstrap, IMPORTER_SERVICE};
pub use library::{Library, LibraryCatalog};

/// Run in agent mode with the built-in library catalog
pub async fn run(
    rendezvous: PathBuf,
    application: String,
    port: Option<u16>,
    entry_point: Vec<String>,
) -> Result<()> {
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        pid = std::process::id(),
        application = %application,
        "Starting remote-apps agent"
    );

    let config = Config::load()?;
    Bootstrap::new(
        RendezvousStore::new(rendezvous),
        application,
        ServiceExporter::from_config(&config.agent),
        LibraryCatalog::with_builtins(),
    )
    .with_port(port)
    .run(entry_point)
    .await
}
