//! remote-apps - remote keyword libraries for launched applications
//!
//! A host launches an application under a small agent, finds the agent's
//! library importer through a rendezvous file, imports keyword libraries from
//! it and runs their keywords over RPC.

pub mod agent;
pub mod cli;
pub mod commands;
pub mod common;
pub mod connector;
pub mod rendezvous;
pub mod rpc;
pub mod testing;

// Re-export commonly used types for tests
pub use common::{Error, Result};
pub use connector::ConnectorRegistry;
