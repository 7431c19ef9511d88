//! # vblob client SDK
//!
//! A client SDK for the [Vercel Blob](https://vercel.com/docs/storage/vercel-blob)
//! storage API.
//!
//! ## Features
//!
//! - **Blob operations**: list, put, head, copy, download and delete
//! - **Large uploads**: payloads over 5 MiB go through the multipart protocol
//!   automatically, one sequential part at a time
//! - **Pluggable auth**: tokens come from a [`TokenProvider`], the config or
//!   the `BLOB_READ_WRITE_TOKEN` environment variable
//! - **Client tokens**: mint scoped, expiring tokens with [`generate_client_token`]
//!
//! ## Example
//!
//! ```rust,ignore
//! use vblob_client::{BlobClient, ListCommandOptions, PutCommandOptions};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     // Reads BLOB_READ_WRITE_TOKEN and the VERCEL_BLOB_API_* overrides
//!     let client = BlobClient::from_env()?;
//!
//!     // Upload a file
//!     let put = client
//!         .put("hello.txt", "Hello, World!", PutCommandOptions::new().with_content_type("text/plain"))
//!         .await?;
//!
//!     // Download it again
//!     let data = client.download(&put.url, Default::default()).await?;
//!     println!("Content: {}", String::from_utf8_lossy(&data));
//!
//!     // List everything
//!     for blob in client.list(ListCommandOptions::new()).await?.blobs {
//!         println!("{} ({} bytes)", blob.pathname, blob.size);
//!     }
//!
//!     client.delete(&[put.url]).await?;
//!     Ok(())
//! }
//! ```
//!
//! Outside a Vercel function, plug in a provider that fetches short-lived
//! tokens from your own backend:
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use async_trait::async_trait;
//! use vblob_client::{BlobClient, Config, Operation, Result, TokenProvider};
//!
//! struct MyAppTokenProvider {
//!     http: reqwest::Client,
//!     route: String,
//! }
//!
//! #[async_trait]
//! impl TokenProvider for MyAppTokenProvider {
//!     async fn get_token(&self, operation: Operation, pathname: Option<&str>) -> Result<String> {
//!         let response = self
//!             .http
//!             .post(&self.route)
//!             .json(&serde_json::json!({ "operation": operation, "pathname": pathname }))
//!             .send()
//!             .await?;
//!         Ok(response.text().await?)
//!     }
//! }
//!
//! let client = BlobClient::new(Config::default())?.with_token_provider(Arc::new(MyAppTokenProvider {
//!     http: reqwest::Client::new(),
//!     route: "http://localhost:3000/api/upload".to_string(),
//! }));
//! ```

mod auth;
mod body;
mod client;
mod config;
mod error;
mod multipart;
mod types;

pub use auth::{
    generate_client_token, ClientTokenOptions, EnvTokenProvider, StaticTokenProvider, TokenProvider,
    DEFAULT_CLIENT_TOKEN_TTL_SECS,
};
pub use body::PutBody;
pub use client::BlobClient;
pub use config::{
    Config, API_VERSION_ENV_VAR, BASE_URL_ENV_VARS, DEFAULT_API_VERSION, DEFAULT_BASE_URL,
    MULTIPART_THRESHOLD, TOKEN_ENV_VAR,
};
pub use error::{BlobError, Result};
pub use multipart::{MultipartUpload, Part, ProgressCallback, UploadProgress};
pub use types::*;
