//! Host side: connecting to launched applications and driving their keywords
//!
//! A [`ConnectorRegistry`] keeps the connected applications by alias. Each
//! [`RemoteApplication`] holds a connection to the application's importer and
//! the [`RemoteLibrary`] proxies of the libraries taken into use.

pub mod application;
pub mod keywords;
pub mod launch;
pub mod negotiator;
pub mod registry;
pub mod remote_library;

#[cfg(test)]
pub(crate) mod mock;

pub use application::{ConnectionState, RemoteApplication};
pub use launch::{LaunchConfig, Launcher};
pub use negotiator::Negotiator;
pub use registry::ConnectorRegistry;
pub use remote_library::RemoteLibrary;
