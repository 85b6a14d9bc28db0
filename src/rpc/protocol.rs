//! RPC protocol message types
//!
//! Defines the request/response format spoken between the host and published
//! services. Uses the same length-prefixed JSON framing as [`super::transport`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::common::error::RemoteError;

/// Reserved method answered by every endpoint before any service method
pub const DESCRIBE: &str = "describe";

/// Interface served by a library importer endpoint
pub const LIBRARY_IMPORTER: &str = "library-importer";

/// Interface served by an imported keyword library endpoint
pub const KEYWORD_LIBRARY: &str = "keyword-library";

/// Importer methods
pub mod importer {
    pub const IMPORT_LIBRARY: &str = "import_library";
    pub const CLOSE_SERVICE: &str = "close_service";
}

/// Keyword library methods
pub mod library {
    pub const GET_KEYWORD_NAMES: &str = "get_keyword_names";
    pub const RUN_KEYWORD: &str = "run_keyword";
}

/// RPC request from host to a published service
#[derive(Debug, Serialize, Deserialize)]
pub struct Request {
    /// Request ID for matching responses
    pub id: u64,
    /// Name of the service the caller expects at this endpoint
    pub service: String,
    /// Method to invoke
    pub method: String,
    /// Positional arguments, passed through untouched
    #[serde(default)]
    pub args: Vec<Value>,
}

/// RPC response from a published service
#[derive(Debug, Serialize, Deserialize)]
pub struct Response {
    /// Request ID this response corresponds to
    pub id: u64,
    /// Whether the call succeeded
    pub success: bool,
    /// Result data on success
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Error information on failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RemoteError>,
}

impl Response {
    /// Create a success response
    pub fn success(id: u64, result: Value) -> Self {
        Self {
            id,
            success: true,
            result: Some(result),
            error: None,
        }
    }

    /// Create an error response
    pub fn error(id: u64, error: RemoteError) -> Self {
        Self {
            id,
            success: false,
            result: None,
            error: Some(error),
        }
    }
}

/// Answer to [`DESCRIBE`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceDescription {
    pub service: String,
    pub interface: String,
}
