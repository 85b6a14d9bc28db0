//! Host-side RPC client
//!
//! Host components talk to published services through [`RpcConnector`] and
//! [`RpcChannel`] only; [`TcpConnector`] is the production implementation.

use async_trait::async_trait;
use serde_json::Value;
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};

use crate::common::{Error, Result};

use super::protocol::{Request, Response, ServiceDescription, DESCRIBE};
use super::transport;
use super::url::EndpointUrl;

/// An open, prepared connection to one published service
#[async_trait]
pub trait RpcChannel: Send {
    /// Endpoint this channel is connected to
    fn url(&self) -> &EndpointUrl;

    /// Invoke a method with positional arguments
    ///
    /// Transport failures surface as connectivity errors
    /// ([`Error::is_connectivity`]); failures raised by the service itself
    /// surface as [`Error::Remote`].
    async fn invoke(&mut self, method: &str, args: Vec<Value>) -> Result<Value>;

    /// Release the connection
    async fn close(&mut self);
}

/// Builds prepared channels to published services
#[async_trait]
pub trait RpcConnector: Send + Sync {
    /// Connect to `url` and check that it serves `interface`
    ///
    /// Fails with [`Error::ServiceUnavailable`] when nothing answers at the
    /// endpoint or it serves something else.
    async fn connect(&self, url: &EndpointUrl, interface: &str) -> Result<Box<dyn RpcChannel>>;
}

/// Connector speaking length-prefixed JSON over TCP
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpConnector;

#[async_trait]
impl RpcConnector for TcpConnector {
    async fn connect(&self, url: &EndpointUrl, interface: &str) -> Result<Box<dyn RpcChannel>> {
        let mut channel = TcpChannel::open(url).await?;

        let description = channel
            .invoke(DESCRIBE, Vec::new())
            .await
            .map_err(|e| Error::unavailable(url, e))?;
        let description: ServiceDescription =
            serde_json::from_value(description).map_err(|e| Error::unavailable(url, e))?;

        if description.interface != interface {
            channel.close().await;
            return Err(Error::unavailable(
                url,
                format!(
                    "serves '{}', expected '{}'",
                    description.interface, interface
                ),
            ));
        }

        Ok(Box::new(channel))
    }
}

/// Client for one TCP endpoint
pub struct TcpChannel {
    url: EndpointUrl,
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
    next_id: u64,
}

impl TcpChannel {
    /// Open a raw connection without checking what the endpoint serves
    pub async fn open(url: &EndpointUrl) -> Result<Self> {
        let stream = transport::connect(url)
            .await
            .map_err(|e| Error::unavailable(url, e))?;
        let (reader, writer) = stream.into_split();

        Ok(Self {
            url: url.clone(),
            reader: BufReader::new(reader),
            writer,
            next_id: 1,
        })
    }
}

#[async_trait]
impl RpcChannel for TcpChannel {
    fn url(&self) -> &EndpointUrl {
        &self.url
    }

    async fn invoke(&mut self, method: &str, args: Vec<Value>) -> Result<Value> {
        let id = self.next_id;
        self.next_id += 1;

        let request = Request {
            id,
            service: self.url.service().to_string(),
            method: method.to_string(),
            args,
        };
        let json = serde_json::to_vec(&request)?;

        transport::send_message(&mut self.writer, &json)
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;

        let response_data = transport::recv_message(&mut self.reader)
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;

        let response: Response = serde_json::from_slice(&response_data)?;

        if response.id != id {
            return Err(Error::Transport(format!(
                "Response ID mismatch: expected {}, got {}",
                id, response.id
            )));
        }

        if response.success {
            Ok(response.result.unwrap_or(Value::Null))
        } else {
            let error = response.error.unwrap_or_else(|| crate::common::error::RemoteError {
                code: "UNKNOWN".to_string(),
                message: "Unknown error".to_string(),
            });
            Err(error.into())
        }
    }

    async fn close(&mut self) {
        if let Err(e) = self.writer.shutdown().await {
            tracing::trace!("Closing {} failed: {}", self.url, e);
        }
    }
}
