//! Endpoint URLs: `rmi://host:port/serviceName`

use std::fmt;
use std::str::FromStr;

use ::url::{Host, Url};

use crate::common::Error;

/// Scheme identifying the RPC transport
pub const SCHEME: &str = "rmi";

/// Address of a published service
///
/// Only constructed through validation, so holding one guarantees the scheme
/// is [`SCHEME`], the port is in `1..=65535` and the service name is non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EndpointUrl {
    host: String,
    port: u16,
    service: String,
}

impl EndpointUrl {
    /// Build an endpoint URL from its parts
    pub fn new(host: impl Into<String>, port: u16, service: impl Into<String>) -> Result<Self, Error> {
        let url = Self {
            host: host.into(),
            port,
            service: service.into(),
        };
        if url.host.is_empty() || url.port == 0 || url.service.is_empty() {
            return Err(Error::InvalidUrl(url.to_string()));
        }
        Ok(url)
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn service(&self) -> &str {
        &self.service
    }
}

impl FromStr for EndpointUrl {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || Error::InvalidUrl(s.to_string());
        let parsed = Url::parse(s.trim()).map_err(|_| invalid())?;

        if parsed.scheme() != SCHEME {
            return Err(invalid());
        }

        let host = match parsed.host().ok_or_else(invalid)? {
            Host::Domain(domain) => domain.to_string(),
            Host::Ipv4(addr) => addr.to_string(),
            Host::Ipv6(addr) => addr.to_string(),
        };
        let port = parsed.port().ok_or_else(invalid)?;
        let service = parsed.path().strip_prefix('/').unwrap_or_default();

        Self::new(host, port, service).map_err(|_| invalid())
    }
}

impl fmt::Display for EndpointUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "{}://[{}]:{}/{}", SCHEME, self.host, self.port, self.service)
        } else {
            write!(f, "{}://{}:{}/{}", SCHEME, self.host, self.port, self.service)
        }
    }
}
