//! Token providers and client token generation
//!
//! Inside a Vercel function the read-write token is available in the
//! `BLOB_READ_WRITE_TOKEN` environment variable and nothing here is needed.
//! Applications running elsewhere (desktop tools, browsers via wasm, other
//! services) should not hold the root token. Instead they implement
//! [`TokenProvider`] to fetch a short-lived token from a route they control,
//! and that route mints the token with [`generate_client_token`].

use crate::{config::TOKEN_ENV_VAR, BlobError, Operation, Result};
use async_trait::async_trait;
use hmac::{Hmac, Mac};
use serde::Serialize;
use sha2::Sha256;
use std::fmt;

type HmacSha256 = Hmac<Sha256>;

/// Seconds a client token stays valid when no expiry is given
pub const DEFAULT_CLIENT_TOKEN_TTL_SECS: i64 = 60 * 60;

/// Supplies bearer tokens for API requests
///
/// The operation and pathname are provided in case fine-grained
/// authorization is required. For operations addressed by URL (download,
/// delete) the pathname is the URL; list has no pathname.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Obtain a token for `operation` on `pathname`
    async fn get_token(&self, operation: Operation, pathname: Option<&str>) -> Result<String>;
}

/// Token provider backed by an environment variable
///
/// Handy for tests and local tools; real applications should fetch scoped
/// tokens instead.
#[derive(Clone)]
pub struct EnvTokenProvider {
    token: String,
}

impl EnvTokenProvider {
    /// Read the token from `var` once, at construction
    pub fn new(var: &str) -> Result<Self> {
        let token = std::env::var(var).map_err(|_| BlobError::NotAuthenticated)?;
        Ok(Self { token })
    }
}

impl fmt::Debug for EnvTokenProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvTokenProvider").finish_non_exhaustive()
    }
}

#[async_trait]
impl TokenProvider for EnvTokenProvider {
    async fn get_token(&self, _operation: Operation, _pathname: Option<&str>) -> Result<String> {
        if !self.token.is_empty() {
            return Ok(self.token.clone());
        }
        env_token().ok_or(BlobError::NotAuthenticated)
    }
}

/// Token provider returning a fixed token
#[derive(Clone)]
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self { token: token.into() }
    }
}

impl fmt::Debug for StaticTokenProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticTokenProvider").finish_non_exhaustive()
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn get_token(&self, _operation: Operation, _pathname: Option<&str>) -> Result<String> {
        Ok(self.token.clone())
    }
}

fn env_token() -> Option<String> {
    std::env::var(TOKEN_ENV_VAR).ok().filter(|t| !t.is_empty())
}

/// Resolve the bearer token for one request
///
/// Order: provider, explicitly configured token, `BLOB_READ_WRITE_TOKEN`.
/// An empty token counts as missing.
pub(crate) async fn resolve_token(
    provider: Option<&dyn TokenProvider>,
    configured: Option<&str>,
    operation: Operation,
    pathname: Option<&str>,
) -> Result<String> {
    let token = match provider {
        Some(provider) => Some(provider.get_token(operation, pathname).await?),
        None => configured.map(str::to_string).or_else(env_token),
    };
    token
        .filter(|t| !t.is_empty())
        .ok_or(BlobError::NotAuthenticated)
}

/// Options for [`generate_client_token`]
#[derive(Clone, Debug)]
pub struct ClientTokenOptions {
    /// The operation to allow
    pub operation: Operation,
    /// The pathname or URL to allow
    pub pathname: Option<String>,
    /// Expiry as unix seconds; one hour from now when unset
    pub expires_at: Option<i64>,
}

impl ClientTokenOptions {
    pub fn new(operation: Operation) -> Self {
        Self {
            operation,
            pathname: None,
            expires_at: None,
        }
    }

    pub fn with_pathname(mut self, pathname: impl Into<String>) -> Self {
        self.pathname = Some(pathname.into());
        self
    }

    pub fn with_expires_at(mut self, expires_at: i64) -> Self {
        self.expires_at = Some(expires_at);
        self
    }
}

// Field order is part of the signed encoding.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ClientTokenPayload<'a> {
    operation: Operation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pathname: Option<&'a str>,
    expires_at: i64,
}

/// Generate a token a client (e.g. a browser) can use for one scoped operation
///
/// The token is `hex(payload) + "." + hex(hmac_sha256(secret, payload))`
/// where the payload is the compact JSON encoding of the options. Nothing is
/// sent over the network and the token is verified by the server only.
pub fn generate_client_token(secret: &str, options: &ClientTokenOptions) -> Result<String> {
    let expires_at = options
        .expires_at
        .unwrap_or_else(|| chrono::Utc::now().timestamp() + DEFAULT_CLIENT_TOKEN_TTL_SECS);

    let payload = serde_json::to_vec(&ClientTokenPayload {
        operation: options.operation,
        pathname: options.pathname.as_deref(),
        expires_at,
    })?;

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| BlobError::Config(format!("invalid signing key: {}", e)))?;
    mac.update(&payload);
    let signature = mac.finalize().into_bytes();

    Ok(format!("{}.{}", hex::encode(&payload), hex::encode(signature)))
}
