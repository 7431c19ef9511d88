//! Client error types and the mapping from API error responses

use reqwest::{Response, StatusCode};
use serde::Deserialize;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, BlobError>;

/// Client errors
///
/// The first group of variants is the fixed taxonomy reported by the blob
/// API (plus client-side input validation). `Unknown` is the catch-all for
/// codes this client does not recognize, server failures and undecodable
/// bodies. Transport and stream failures are passed through untouched.
#[derive(Error, Debug)]
pub enum BlobError {
    /// No token could be resolved for the request
    #[error("No authentication token. Expected environment variable BLOB_READ_WRITE_TOKEN to contain a token")]
    NotAuthenticated,

    /// The server rejected the request
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Token is not valid for the resource
    #[error("Access denied, please provide a valid token for this resource")]
    Forbidden,

    /// The store does not exist
    #[error("The requested store does not exist")]
    StoreNotFound,

    /// The store has been suspended
    #[error("The requested store has been suspended")]
    StoreSuspended,

    /// The blob does not exist
    #[error("The requested blob does not exist")]
    BlobNotFound,

    /// A required argument was missing or malformed
    #[error("{0}")]
    InvalidInput(String),

    /// Unrecognized error code, server failure or undecodable response
    #[error("Unknown error, please visit https://vercel.com/help ({status}): {message}")]
    Unknown { status: u16, message: String },

    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Failure reading the upload stream
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Failed to encode a request payload
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    code: String,
    #[serde(default)]
    message: String,
}

impl BlobError {
    /// Error for a required argument that was empty
    pub fn required(field: &str) -> Self {
        Self::InvalidInput(format!("{} is required", field))
    }

    /// Build an unknown error from a status and message
    pub fn unknown(status: StatusCode, message: impl Into<String>) -> Self {
        Self::Unknown {
            status: status.as_u16(),
            message: message.into(),
        }
    }

    /// Map a non-success status and its body onto the error taxonomy
    pub fn from_api_response(status: StatusCode, body: &[u8]) -> Self {
        if status.is_server_error() {
            return Self::unknown(status, status.canonical_reason().unwrap_or_default());
        }

        let envelope: ApiErrorEnvelope = match serde_json::from_slice(body) {
            Ok(envelope) => envelope,
            Err(_) => {
                let text = String::from_utf8_lossy(body);
                let message = if text.trim().is_empty() {
                    status.canonical_reason().unwrap_or_default().to_string()
                } else {
                    text.into_owned()
                };
                return Self::unknown(status, message);
            }
        };

        let ApiErrorDetail { code, message } = envelope.error;
        match code.as_str() {
            "store_suspended" => Self::StoreSuspended,
            "forbidden" => Self::Forbidden,
            "not_found" => Self::BlobNotFound,
            "store_not_found" => Self::StoreNotFound,
            "bad_request" => Self::BadRequest(message),
            _ => Self::unknown(status, message),
        }
    }

    /// Consume a failed response and map it onto the error taxonomy
    ///
    /// Bodies of 5xx responses are never read.
    pub(crate) async fn from_response(response: Response) -> Self {
        let status = response.status();
        if status.is_server_error() {
            return Self::from_api_response(status, &[]);
        }
        match response.bytes().await {
            Ok(body) => Self::from_api_response(status, &body),
            Err(e) => Self::Http(e),
        }
    }

    /// Stable machine-readable code for this error
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotAuthenticated => "not_authenticated",
            Self::BadRequest(_) => "bad_request",
            Self::Forbidden => "forbidden",
            Self::StoreNotFound => "store_not_found",
            Self::StoreSuspended => "store_suspended",
            Self::BlobNotFound => "not_found",
            Self::InvalidInput(_) => "invalid_input",
            Self::Unknown { .. } => "unknown_error",
            Self::Http(_) => "http",
            Self::Io(_) => "io",
            Self::Config(_) => "config",
            Self::Serialization(_) => "serialization",
        }
    }

    /// HTTP status carried by an unknown error
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Unknown { status, .. } => Some(*status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::BlobNotFound | Self::StoreNotFound)
    }
}
