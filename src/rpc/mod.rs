//! RPC between the host and services published inside a launched application
//!
//! Plain TCP with length-prefixed JSON frames. Endpoints are addressed by
//! `rmi://host:port/serviceName` URLs.

pub mod client;
pub mod exporter;
pub mod protocol;
pub mod transport;
pub mod url;

pub use client::{RpcChannel, RpcConnector, TcpConnector};
pub use exporter::{Service, ServiceExporter};
pub use self::url::EndpointUrl;
