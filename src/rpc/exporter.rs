//! Service exporter - publishes in-process services as RPC endpoints
//!
//! Every published service gets its own listener on its own port. A service
//! that answers a call with [`Error::ServiceClosed`] severs the calling
//! connection without replying and shuts down every endpoint of the exporter.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::io::BufReader;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;

use crate::common::config::AgentConfig;
use crate::common::error::RemoteError;
use crate::common::{Error, Result};

use super::protocol::{Request, Response, ServiceDescription, DESCRIBE};
use super::transport;
use super::url::EndpointUrl;

/// An in-process object callable over RPC
#[async_trait]
pub trait Service: Send + Sync + 'static {
    /// Interface name checked by clients when they connect
    fn interface(&self) -> &'static str;

    /// Handle one call
    async fn call(&self, method: &str, args: Vec<Value>) -> Result<Value>;
}

/// Publishes services and owns their lifetime
#[derive(Clone)]
pub struct ServiceExporter {
    inner: Arc<ExporterInner>,
}

struct ExporterInner {
    bind_address: String,
    advertised_host: String,
    shutdown: watch::Sender<bool>,
}

/// One published service
struct Endpoint {
    name: String,
    service: Arc<dyn Service>,
}

impl ServiceExporter {
    /// Create an exporter binding on `bind_address` and advertising `advertised_host`
    pub fn new(bind_address: impl Into<String>, advertised_host: impl Into<String>) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            inner: Arc::new(ExporterInner {
                bind_address: bind_address.into(),
                advertised_host: advertised_host.into(),
                shutdown,
            }),
        }
    }

    /// Create an exporter from agent configuration
    pub fn from_config(config: &AgentConfig) -> Self {
        Self::new(&config.bind_address, &config.advertised_host)
    }

    /// Publish `service` under `name` on a freshly allocated port
    pub async fn publish(&self, name: &str, service: Arc<dyn Service>) -> Result<EndpointUrl> {
        let port = transport::find_free_port()?;
        self.publish_on(port, name, service).await
    }

    /// Publish `service` under `name` on a given port
    pub async fn publish_on(
        &self,
        port: u16,
        name: &str,
        service: Arc<dyn Service>,
    ) -> Result<EndpointUrl> {
        let listener = transport::bind(&self.inner.bind_address, port).await?;
        let port = listener.local_addr()?.port();
        let url = EndpointUrl::new(self.inner.advertised_host.as_str(), port, name)?;

        tracing::info!(
            service = name,
            interface = service.interface(),
            "Published {}",
            url
        );

        let endpoint = Arc::new(Endpoint {
            name: name.to_string(),
            service,
        });
        tokio::spawn(self.clone().serve(listener, endpoint));

        Ok(url)
    }

    /// Stop every endpoint published by this exporter
    pub fn shutdown(&self) {
        self.inner.shutdown.send_replace(true);
    }

    /// Whether [`Self::shutdown`] has been called
    pub fn is_shut_down(&self) -> bool {
        *self.inner.shutdown.borrow()
    }

    /// Wait until the exporter is shut down
    pub async fn closed(&self) {
        let mut shutdown = self.inner.shutdown.subscribe();
        let _ = shutdown.wait_for(|closed| *closed).await;
    }

    async fn serve(self, listener: TcpListener, endpoint: Arc<Endpoint>) {
        let mut shutdown = self.inner.shutdown.subscribe();

        loop {
            tokio::select! {
                _ = shutdown.wait_for(|closed| *closed) => break,
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        tracing::debug!(service = %endpoint.name, %peer, "Client connected");
                        tokio::spawn(self.clone().handle_client(stream, endpoint.clone()));
                    }
                    Err(e) => {
                        tracing::error!("Accept error: {}", e);
                    }
                }
            }
        }

        tracing::debug!(service = %endpoint.name, "Endpoint stopped");
    }

    /// Handle a single client connection
    async fn handle_client(self, stream: TcpStream, endpoint: Arc<Endpoint>) {
        let mut shutdown = self.inner.shutdown.subscribe();
        let (reader, mut writer) = stream.into_split();
        let mut reader = BufReader::new(reader);

        loop {
            let request_data = tokio::select! {
                _ = shutdown.wait_for(|closed| *closed) => break,
                result = transport::recv_message(&mut reader) => match result {
                    Ok(data) => data,
                    Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                        tracing::debug!("Client disconnected");
                        break;
                    }
                    Err(e) => {
                        tracing::error!("Error reading request: {}", e);
                        break;
                    }
                }
            };

            let response = match serde_json::from_slice::<Request>(&request_data) {
                Ok(request) => match self.dispatch(&endpoint, request).await {
                    Some(response) => response,
                    None => break,
                },
                Err(e) => {
                    tracing::error!("Invalid request: {}", e);
                    Response::error(
                        0,
                        RemoteError {
                            code: "INVALID_REQUEST".to_string(),
                            message: e.to_string(),
                        },
                    )
                }
            };

            let sent = match serde_json::to_vec(&response) {
                Ok(json) => transport::send_message(&mut writer, &json).await,
                Err(e) => {
                    tracing::error!("Could not encode response: {}", e);
                    break;
                }
            };
            if let Err(e) = sent {
                tracing::debug!("Could not send response: {}", e);
                break;
            }
        }
    }

    /// Run one request; `None` means the connection must be severed
    async fn dispatch(&self, endpoint: &Endpoint, request: Request) -> Option<Response> {
        if request.service != endpoint.name {
            return Some(Response::error(
                request.id,
                RemoteError {
                    code: "NO_SUCH_SERVICE".to_string(),
                    message: format!(
                        "No service '{}' at this endpoint (serving '{}')",
                        request.service, endpoint.name
                    ),
                },
            ));
        }

        if request.method == DESCRIBE {
            let description = ServiceDescription {
                service: endpoint.name.clone(),
                interface: endpoint.service.interface().to_string(),
            };
            return Some(match serde_json::to_value(description) {
                Ok(value) => Response::success(request.id, value),
                Err(e) => Response::error(request.id, RemoteError::from(&Error::from(e))),
            });
        }

        tracing::trace!(service = %endpoint.name, method = %request.method, "Call");

        match endpoint.service.call(&request.method, request.args).await {
            Ok(result) => Some(Response::success(request.id, result)),
            Err(Error::ServiceClosed) => {
                tracing::info!(service = %endpoint.name, "Service closed by client request");
                self.shutdown();
                None
            }
            Err(e) => Some(Response::error(request.id, RemoteError::from(&e))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::client::{RpcConnector, TcpChannel, TcpConnector};
    use crate::rpc::RpcChannel;
    use serde_json::json;

    struct Echo;

    #[async_trait]
    impl Service for Echo {
        fn interface(&self) -> &'static str {
            "echo"
        }

        async fn call(&self, method: &str, args: Vec<Value>) -> Result<Value> {
            match method {
                "echo" => Ok(Value::Array(args)),
                "stop" => Err(Error::ServiceClosed),
                other => Err(Error::NoSuchMethod {
                    service: "echo".to_string(),
                    method: other.to_string(),
                }),
            }
        }
    }

    fn exporter() -> ServiceExporter {
        ServiceExporter::new("127.0.0.1", "127.0.0.1")
    }

    #[tokio::test]
    async fn test_publish_and_call() {
        let exporter = exporter();
        let url = exporter.publish("echoservice", Arc::new(Echo)).await.unwrap();
        assert_eq!(url.service(), "echoservice");

        let mut channel = TcpConnector.connect(&url, "echo").await.unwrap();
        let result = channel.invoke("echo", vec![json!(1), json!("two")]).await.unwrap();
        assert_eq!(result, json!([1, "two"]));

        let err = channel.invoke("missing", vec![]).await.unwrap_err();
        assert!(matches!(err, Error::Remote { ref code, .. } if code == "NO_SUCH_METHOD"));
        exporter.shutdown();
    }

    #[tokio::test]
    async fn test_each_publish_gets_its_own_port() {
        let exporter = exporter();
        let a = exporter.publish("a", Arc::new(Echo)).await.unwrap();
        let b = exporter.publish("b", Arc::new(Echo)).await.unwrap();
        assert_ne!(a.port(), b.port());
        exporter.shutdown();
    }

    #[tokio::test]
    async fn test_interface_mismatch_is_unavailable() {
        let exporter = exporter();
        let url = exporter.publish("echoservice", Arc::new(Echo)).await.unwrap();

        let err = TcpConnector.connect(&url, "something-else").await.err().unwrap();
        assert!(matches!(err, Error::ServiceUnavailable { .. }));
        exporter.shutdown();
    }

    #[tokio::test]
    async fn test_wrong_service_name_is_unavailable() {
        let exporter = exporter();
        let url = exporter.publish("echoservice", Arc::new(Echo)).await.unwrap();
        let wrong = EndpointUrl::new(url.host(), url.port(), "other").unwrap();

        let err = TcpConnector.connect(&wrong, "echo").await.err().unwrap();
        assert!(matches!(err, Error::ServiceUnavailable { .. }));
        exporter.shutdown();
    }

    #[tokio::test]
    async fn test_service_closed_severs_connection() {
        let exporter = exporter();
        let url = exporter.publish("echoservice", Arc::new(Echo)).await.unwrap();

        let mut channel = TcpChannel::open(&url).await.unwrap();
        let err = channel.invoke("stop", vec![]).await.unwrap_err();
        assert!(err.is_connectivity(), "unexpected {err:?}");

        exporter.closed().await;
        assert!(exporter.is_shut_down());
    }
}
