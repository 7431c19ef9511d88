//! Client configuration

use std::time::Duration;

/// Public endpoint of the blob API
pub const DEFAULT_BASE_URL: &str = "https://blob.vercel-storage.com";

/// API version sent in the `x-api-version` header
pub const DEFAULT_API_VERSION: &str = "9";

/// Payloads larger than this are uploaded with the multipart protocol (5 MiB).
/// It is also the size of every part except the last.
pub const MULTIPART_THRESHOLD: u64 = 5 * 1024 * 1024;

/// Environment variable holding the read-write token
pub const TOKEN_ENV_VAR: &str = "BLOB_READ_WRITE_TOKEN";

/// Environment variables overriding the base URL, in priority order
pub const BASE_URL_ENV_VARS: [&str; 2] = ["VERCEL_BLOB_API_URL", "NEXT_PUBLIC_VERCEL_BLOB_API_URL"];

/// Environment variable overriding the API version
pub const API_VERSION_ENV_VAR: &str = "VERCEL_BLOB_API_VERSION";

/// Client configuration
#[derive(Clone, Debug)]
pub struct Config {
    /// API base URL
    pub base_url: String,
    /// Value of the `x-api-version` header
    pub api_version: String,
    /// Explicit bearer token, used when no token provider is set
    pub access_token: Option<String>,
    /// Per-request deadline; `None` waits indefinitely
    pub timeout: Option<Duration>,
    /// User agent string
    pub user_agent: String,
    /// Multipart upload threshold and part size (bytes)
    pub multipart_threshold: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            access_token: None,
            timeout: None,
            user_agent: format!("vblob-client/{}", env!("CARGO_PKG_VERSION")),
            multipart_threshold: MULTIPART_THRESHOLD,
        }
    }
}

impl Config {
    /// Create a new config with the given base URL
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Defaults overridden by `VERCEL_BLOB_API_URL` (or
    /// `NEXT_PUBLIC_VERCEL_BLOB_API_URL`) and `VERCEL_BLOB_API_VERSION`
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(url) = BASE_URL_ENV_VARS
            .iter()
            .find_map(|var| std::env::var(var).ok())
        {
            config.base_url = url;
        }
        if let Ok(version) = std::env::var(API_VERSION_ENV_VAR) {
            config.api_version = version;
        }
        config
    }

    /// Set the access token
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    /// Set the API version
    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }

    /// Set timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the multipart threshold (also the part size)
    pub fn with_multipart_threshold(mut self, threshold: u64) -> Self {
        self.multipart_threshold = threshold;
        self
    }
}
