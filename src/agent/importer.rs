//! Library importer - the first endpoint of every launched application
//!
//! The host asks the importer for a library by identifier; the importer
//! instantiates it, publishes it on a port of its own and answers with the
//! new endpoint's URL. Keyword calls then go straight to that endpoint.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::common::{Error, Result};
use crate::rpc::protocol::{importer, LIBRARY_IMPORTER};
use crate::rpc::{EndpointUrl, Service, ServiceExporter};

use super::library::{string_arg, KeywordService, LibraryCatalog};

/// Service name a library is published under
///
/// Derived from the identifier alone by dropping separators, so repeated
/// imports of one identifier share a name (each still gets its own port).
pub fn service_name(identifier: &str) -> String {
    identifier
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || *c == '-')
        .collect()
}

pub struct LibraryImporter {
    catalog: Arc<LibraryCatalog>,
    exporter: ServiceExporter,
}

impl LibraryImporter {
    pub fn new(catalog: Arc<LibraryCatalog>, exporter: ServiceExporter) -> Self {
        Self { catalog, exporter }
    }

    /// Instantiate and publish a library, returning its endpoint
    pub async fn import_library(&self, identifier: &str) -> Result<EndpointUrl> {
        let library = self.catalog.instantiate(identifier)?;
        let service = Arc::new(KeywordService::new(library));
        let url = self
            .exporter
            .publish(&service_name(identifier), service)
            .await?;

        tracing::info!(library = identifier, "Imported library at {}", url);
        Ok(url)
    }
}

#[async_trait]
impl Service for LibraryImporter {
    fn interface(&self) -> &'static str {
        LIBRARY_IMPORTER
    }

    async fn call(&self, method: &str, args: Vec<Value>) -> Result<Value> {
        match method {
            importer::IMPORT_LIBRARY => {
                let identifier = string_arg(method, &args, 0, "library")?;
                let url = self.import_library(&identifier).await?;
                Ok(Value::String(url.to_string()))
            }
            importer::CLOSE_SERVICE => Err(Error::ServiceClosed),
            other => Err(Error::NoSuchMethod {
                service: LIBRARY_IMPORTER.to_string(),
                method: other.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::builtin::BuiltinKeywords;
    use serde_json::json;

    #[test]
    fn test_service_name_drops_separators() {
        assert_eq!(service_name("org.example.Calculator"), "orgexampleCalculator");
        assert_eq!(service_name("my_lib::Keywords"), "my_libKeywords");
        assert_eq!(service_name("Plain"), "Plain");
    }

    #[tokio::test]
    async fn test_import_publishes_new_endpoint() {
        let exporter = ServiceExporter::new("127.0.0.1", "localhost");
        let service =
            LibraryImporter::new(Arc::new(LibraryCatalog::with_builtins()), exporter.clone());

        let first = service
            .call(importer::IMPORT_LIBRARY, vec![json!(BuiltinKeywords::IDENTIFIER)])
            .await
            .unwrap();
        let second = service
            .call(importer::IMPORT_LIBRARY, vec![json!(BuiltinKeywords::IDENTIFIER)])
            .await
            .unwrap();

        let first: EndpointUrl = first.as_str().unwrap().parse().unwrap();
        let second: EndpointUrl = second.as_str().unwrap().parse().unwrap();
        assert_eq!(first.service(), "remoteappsBuiltinKeywords");
        assert_eq!(first.service(), second.service());
        assert_ne!(first.port(), second.port());
        exporter.shutdown();
    }

    #[tokio::test]
    async fn test_unknown_library_and_close() {
        let exporter = ServiceExporter::new("127.0.0.1", "localhost");
        let service = LibraryImporter::new(Arc::new(LibraryCatalog::new()), exporter);

        let err = service
            .call(importer::IMPORT_LIBRARY, vec![json!("nowhere.Library")])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::LibraryNotFound(_)));

        let err = service.call(importer::CLOSE_SERVICE, vec![]).await.unwrap_err();
        assert!(matches!(err, Error::ServiceClosed));
    }
}
