//! Main client implementation

use crate::{
    auth::{resolve_token, TokenProvider},
    body::PutBody,
    multipart::{self, ProgressCallback},
    types::*,
    BlobError, Config, Result,
};
use bytes::Bytes;
use reqwest::{header, Client, Method, RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use std::io::Cursor;
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tracing::{debug, instrument};
use url::Url;

/// Request header names used by the blob API
pub(crate) mod headers {
    pub const API_VERSION: &str = "x-api-version";
    pub const ADD_RANDOM_SUFFIX: &str = "x-add-random-suffix";
    pub const CONTENT_TYPE: &str = "x-content-type";
    pub const CACHE_CONTROL_MAX_AGE: &str = "x-cache-control-max-age";
    pub const ACCESS: &str = "x-access";
    pub const MPU_ACTION: &str = "x-mpu-action";
    pub const MPU_UPLOAD_ID: &str = "x-mpu-upload-id";
    pub const MPU_KEY: &str = "x-mpu-key";
    pub const MPU_PART_NUMBER: &str = "x-mpu-part-number";
}

const DEFAULT_ACCESS: &str = "public";

/// Blob storage client
///
/// Cheap to clone; clones share the underlying connection pool and token
/// provider, so one client can serve many concurrent callers.
#[derive(Clone)]
pub struct BlobClient {
    config: Config,
    base_url: Url,
    http: Client,
    token_provider: Option<Arc<dyn TokenProvider>>,
}

impl std::fmt::Debug for BlobClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlobClient")
            .field("base_url", &self.base_url.as_str())
            .field("api_version", &self.config.api_version)
            .field("token_provider", &self.token_provider.is_some())
            .finish()
    }
}

impl BlobClient {
    /// Create a new client with the given configuration
    pub fn new(config: Config) -> Result<Self> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| BlobError::Config(format!("invalid base URL {:?}: {}", config.base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(BlobError::Config(format!("base URL {:?} cannot carry a path", config.base_url)));
        }
        if config.multipart_threshold == 0 {
            return Err(BlobError::Config("multipart threshold must be non-zero".to_string()));
        }

        let mut builder = Client::builder().user_agent(config.user_agent.clone());
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(BlobError::Http)?;

        Ok(Self {
            config,
            base_url,
            http,
            token_provider: None,
        })
    }

    /// Create a client configured from the environment
    ///
    /// This is all that is needed inside a Vercel function.
    pub fn from_env() -> Result<Self> {
        Self::new(Config::from_env())
    }

    /// Obtain tokens from `provider` instead of the configuration or environment
    pub fn with_token_provider(mut self, provider: Arc<dyn TokenProvider>) -> Self {
        self.token_provider = Some(provider);
        self
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    // ==================== Blob Operations ====================

    /// List blobs in the store
    ///
    /// Pass the returned cursor back in `options.cursor` to fetch the next page.
    #[instrument(skip(self))]
    pub async fn list(&self, options: ListCommandOptions) -> Result<ListBlobResult> {
        let mut query: Vec<(&str, String)> = Vec::new();
        if let Some(limit) = options.limit {
            query.push(("limit", limit.to_string()));
        }
        if let Some(prefix) = options.prefix {
            query.push(("prefix", prefix));
        }
        if let Some(cursor) = options.cursor {
            query.push(("cursor", cursor));
        }
        if let Some(mode) = options.mode {
            query.push(("mode", mode.as_str().to_string()));
        }

        let request = self
            .authorized(Method::GET, self.base_url.clone(), Operation::List, None)
            .await?
            .query(&query);
        let response = self.send(request).await?;
        decode_json(response).await
    }

    /// Upload a blob
    ///
    /// Payloads larger than the multipart threshold are uploaded in parts.
    pub async fn put(
        &self,
        pathname: &str,
        body: impl Into<PutBody>,
        options: PutCommandOptions,
    ) -> Result<PutBlobPutResult> {
        self.put_with_progress(pathname, body, options, None).await
    }

    /// Upload a blob, reporting progress after every multipart part
    #[instrument(skip(self, body, options, progress))]
    pub async fn put_with_progress(
        &self,
        pathname: &str,
        body: impl Into<PutBody>,
        options: PutCommandOptions,
        progress: Option<ProgressCallback>,
    ) -> Result<PutBlobPutResult> {
        if pathname.is_empty() {
            return Err(BlobError::required("pathname"));
        }
        let body = body.into();
        let threshold = self.config.multipart_threshold;
        let total = body.len();

        if let Some(len) = total.filter(|len| *len > threshold) {
            debug!(len, "payload above multipart threshold");
            return multipart::put_multipart(
                self,
                pathname,
                body.into_reader(),
                total,
                &options,
                progress.as_ref(),
            )
            .await;
        }

        // Unknown (or small) length: read one byte past the threshold to decide.
        let (prefix, rest) = body.read_prefix(threshold.saturating_add(1)).await?;
        if prefix.len() as u64 > threshold {
            debug!("stream exceeded multipart threshold");
            let reader = Cursor::new(prefix).chain(rest);
            return multipart::put_multipart(self, pathname, reader, total, &options, progress.as_ref())
                .await;
        }

        let request = self
            .authorized(Method::PUT, self.api_url(pathname), Operation::Put, Some(pathname))
            .await?;
        let request = apply_put_headers(request, &options).body(prefix);
        let response = self.send(request).await?;
        decode_json(response).await
    }

    /// Get a blob's metadata
    #[instrument(skip(self))]
    pub async fn head(&self, pathname: &str) -> Result<HeadBlobResult> {
        if pathname.is_empty() {
            return Err(BlobError::required("pathname"));
        }
        let request = self
            .authorized(Method::GET, self.api_url(pathname), Operation::Head, Some(pathname))
            .await?;
        let response = self.dispatch(request).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(BlobError::BlobNotFound);
        }
        let response = check_status(response).await?;
        decode_json(response).await
    }

    /// Delete blobs by URL
    ///
    /// Sends nothing when `urls` is empty.
    #[instrument(skip(self, urls), fields(count = urls.len()))]
    pub async fn delete<S: AsRef<str>>(&self, urls: &[S]) -> Result<()> {
        let urls: Vec<&str> = urls.iter().map(|url| url.as_ref()).collect();
        let Some(first) = urls.first().copied() else {
            return Ok(());
        };
        if urls.iter().any(|url| url.is_empty()) {
            return Err(BlobError::required("url"));
        }

        #[derive(Serialize)]
        struct DeleteRequest<'a> {
            urls: &'a [&'a str],
        }

        let request = self
            .authorized(Method::POST, self.api_url("/delete"), Operation::Delete, Some(first))
            .await?
            .header(header::CONTENT_TYPE, "application/json")
            .json(&DeleteRequest { urls: &urls });
        self.send(request).await?;
        Ok(())
    }

    /// Copy an existing blob to a new pathname
    #[instrument(skip(self, options))]
    pub async fn copy(
        &self,
        from_url: &str,
        to_pathname: &str,
        options: PutCommandOptions,
    ) -> Result<PutBlobPutResult> {
        if from_url.is_empty() {
            return Err(BlobError::required("fromUrl"));
        }
        if to_pathname.is_empty() {
            return Err(BlobError::required("toPathname"));
        }

        let request = self
            .authorized(Method::PUT, self.api_url(to_pathname), Operation::Copy, Some(to_pathname))
            .await?
            .query(&[("fromUrl", from_url)]);
        let request = apply_put_headers(request, &options);
        let response = self.send(request).await?;
        decode_json(response).await
    }

    /// Download a blob's content from its absolute URL
    #[instrument(skip(self, options))]
    pub async fn download(&self, url: &str, options: DownloadCommandOptions) -> Result<Bytes> {
        if url.is_empty() {
            return Err(BlobError::required("url"));
        }
        let target = Url::parse(url)
            .map_err(|e| BlobError::InvalidInput(format!("invalid url {:?}: {}", url, e)))?;

        let mut request = self
            .authorized(Method::GET, target, Operation::Download, Some(url))
            .await?;
        if let Some(range) = options.byte_range {
            request = request.header(header::RANGE, range.header_value());
        }

        // 206 Partial Content is a success status like 200.
        let response = self.send(request).await?;
        Ok(response.bytes().await?)
    }

    // ==================== Helper Methods ====================

    /// Absolute API URL for a store path
    ///
    /// Each segment is percent-encoded, `%` included, so the server decodes
    /// exactly the pathname that was given.
    pub(crate) fn api_url(&self, pathname: &str) -> Url {
        let mut url = self.base_url.clone();
        // `new` rejects bases that cannot carry a path.
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .clear()
                .extend(pathname.trim_start_matches('/').split('/'));
        }
        url
    }

    /// Start a request carrying the API version and bearer token
    ///
    /// Fails without building anything when no token can be resolved.
    pub(crate) async fn authorized(
        &self,
        method: Method,
        url: Url,
        operation: Operation,
        pathname: Option<&str>,
    ) -> Result<RequestBuilder> {
        let token = resolve_token(
            self.token_provider.as_deref(),
            self.config.access_token.as_deref(),
            operation,
            pathname,
        )
        .await?;

        Ok(self
            .http
            .request(method, url)
            .header(headers::API_VERSION, &self.config.api_version)
            .bearer_auth(token))
    }

    /// Send a request and map non-success statuses to errors
    pub(crate) async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = self.dispatch(request).await?;
        check_status(response).await
    }

    async fn dispatch(&self, request: RequestBuilder) -> Result<Response> {
        let request = request.build().map_err(|e| {
            if e.is_builder() {
                BlobError::Config(format!("invalid request: {}", e))
            } else {
                BlobError::Http(e)
            }
        })?;
        debug!("Sending {} request to {}", request.method(), request.url());
        Ok(self.http.execute(request).await?)
    }
}

/// Headers shared by single-shot put, copy and multipart create
pub(crate) fn apply_put_headers(mut request: RequestBuilder, options: &PutCommandOptions) -> RequestBuilder {
    if !options.add_random_suffix {
        request = request.header(headers::ADD_RANDOM_SUFFIX, "0");
    }
    if let Some(content_type) = options.content_type.as_deref().filter(|ct| !ct.is_empty()) {
        request = request.header(headers::CONTENT_TYPE, content_type);
    }
    if let Some(max_age) = options.cache_control_max_age.filter(|age| *age > 0) {
        request = request.header(headers::CACHE_CONTROL_MAX_AGE, max_age.to_string());
    }
    request.header(
        headers::ACCESS,
        options
            .access
            .as_deref()
            .filter(|access| !access.is_empty())
            .unwrap_or(DEFAULT_ACCESS),
    )
}

pub(crate) async fn check_status(response: Response) -> Result<Response> {
    if response.status().is_success() {
        Ok(response)
    } else {
        Err(BlobError::from_response(response).await)
    }
}

/// Decode a JSON success body; an undecodable body is an unknown error
pub(crate) async fn decode_json<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    let body = response.bytes().await?;
    serde_json::from_slice(&body)
        .map_err(|e| BlobError::unknown(status, format!("invalid response body: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_client(base: &str) -> BlobClient {
        BlobClient::new(Config::new(base).with_token("t")).unwrap()
    }

    #[test]
    fn test_api_url_replaces_path() {
        let client = test_client("https://blob.example.com");
        assert_eq!(client.api_url("foo/bar.txt").as_str(), "https://blob.example.com/foo/bar.txt");
        assert_eq!(client.api_url("/mpu").as_str(), "https://blob.example.com/mpu");

        let client = test_client("http://localhost:3000/api/");
        assert_eq!(client.api_url("/delete").as_str(), "http://localhost:3000/delete");
    }

    #[test]
    fn test_invalid_config_rejected() {
        let err = BlobClient::new(Config::new("not a url")).unwrap_err();
        assert!(matches!(err, BlobError::Config(_)));

        let err = BlobClient::new(Config::new("mailto:blob@example.com")).unwrap_err();
        assert!(matches!(err, BlobError::Config(_)));

        let err = BlobClient::new(Config::default().with_multipart_threshold(0)).unwrap_err();
        assert!(matches!(err, BlobError::Config(_)));
    }

    #[test]
    fn test_put_headers() {
        let http = Client::new();
        let request = apply_put_headers(http.put("http://x/a"), &PutCommandOptions::default())
            .build()
            .unwrap();
        let sent = request.headers();
        assert_eq!(sent[headers::ADD_RANDOM_SUFFIX], "0");
        assert_eq!(sent[headers::ACCESS], "public");
        assert!(sent.get(headers::CONTENT_TYPE).is_none());
        assert!(sent.get(headers::CACHE_CONTROL_MAX_AGE).is_none());

        let options = PutCommandOptions::new()
            .with_random_suffix(true)
            .with_content_type("image/png")
            .with_cache_control_max_age(3600)
            .with_access("private");
        let request = apply_put_headers(http.put("http://x/a"), &options).build().unwrap();
        let sent = request.headers();
        assert!(sent.get(headers::ADD_RANDOM_SUFFIX).is_none());
        assert_eq!(sent[headers::CONTENT_TYPE], "image/png");
        assert_eq!(sent[headers::CACHE_CONTROL_MAX_AGE], "3600");
        assert_eq!(sent[headers::ACCESS], "private");
    }

    #[test]
    fn test_empty_put_options_are_unset() {
        let options = PutCommandOptions::new().with_content_type("").with_access("");
        let request = apply_put_headers(Client::new().put("http://x/a"), &options)
            .build()
            .unwrap();
        let sent = request.headers();
        assert!(sent.get(headers::CONTENT_TYPE).is_none());
        assert_eq!(sent[headers::ACCESS], "public");
    }

    #[test]
    fn test_api_url_escapes_percent() {
        let client = test_client("https://blob.example.com");
        assert_eq!(client.api_url("r%41.txt").path(), "/r%2541.txt");
        assert_eq!(client.api_url("100%.txt").path(), "/100%25.txt");
        assert_eq!(client.api_url("dir/a b.txt").path(), "/dir/a%20b.txt");
    }

    #[tokio::test]
    async fn test_missing_pathname_is_invalid_input() {
        let client = test_client("http://localhost:1");
        let err = client.put("", "data", PutCommandOptions::default()).await.unwrap_err();
        assert_eq!(err.code(), "invalid_input");
        assert!(matches!(client.head("").await, Err(BlobError::InvalidInput(_))));
        assert!(matches!(
            client.copy("", "to.txt", PutCommandOptions::default()).await,
            Err(BlobError::InvalidInput(_))
        ));
        assert!(matches!(
            client.copy("https://x/a", "", PutCommandOptions::default()).await,
            Err(BlobError::InvalidInput(_))
        ));
        assert!(matches!(
            client.download("", DownloadCommandOptions::default()).await,
            Err(BlobError::InvalidInput(_))
        ));
        assert!(matches!(
            client.download("relative/path.txt", DownloadCommandOptions::default()).await,
            Err(BlobError::InvalidInput(_))
        ));
        assert!(matches!(client.delete(&["https://x/a", ""]).await, Err(BlobError::InvalidInput(_))));
    }
}
