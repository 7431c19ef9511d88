//! Multipart upload support for large blobs
//!
//! A multipart session is three phases against `/mpu`, all authorized as a
//! put of the target pathname:
//!
//! 1. `create` returns an upload id and storage key.
//! 2. `upload` sends each part with a 1-based part number and records the
//!    returned ETag. Parts go out one at a time, in order.
//! 3. `complete` sends the ordered `{etag, partNumber}` list and returns the
//!    same result as a single-shot put.
//!
//! Any failure ends the session. Nothing is rolled back and nothing can be
//! resumed; the caller starts over.

use crate::{
    client::{apply_put_headers, decode_json, headers},
    BlobClient, BlobError, Operation, PutBlobPutResult, PutCommandOptions, Result,
};
use bytes::{Bytes, BytesMut};
use reqwest::{header, Method};
use serde::{Deserialize, Serialize};
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::debug;

/// Progress callback type
pub type ProgressCallback = Box<dyn Fn(UploadProgress) + Send + Sync>;

/// Upload progress information, reported after each committed part
#[derive(Clone, Debug)]
pub struct UploadProgress {
    /// Bytes uploaded so far
    pub bytes_uploaded: u64,
    /// Total bytes to upload, when the payload length is known
    pub total_bytes: Option<u64>,
    /// Part just committed
    pub part_number: u32,
}

impl UploadProgress {
    /// Get percentage complete
    pub fn percentage(&self) -> Option<f64> {
        match self.total_bytes {
            Some(0) => Some(100.0),
            Some(total) => Some((self.bytes_uploaded as f64 / total as f64) * 100.0),
            None => None,
        }
    }
}

/// A committed part
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    pub etag: String,
    pub part_number: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateMultipartUploadResponse {
    upload_id: String,
    key: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CompleteMultipartUploadRequest<'a> {
    upload_id: &'a str,
    key: &'a str,
    parts: &'a [Part],
}

/// Multipart upload handle
///
/// Part numbers are assigned by the handle, starting at 1, in the order
/// [`upload_part`](Self::upload_part) is called.
#[derive(Debug)]
pub struct MultipartUpload<'a> {
    client: &'a BlobClient,
    pathname: String,
    upload_id: String,
    key: String,
    parts: Vec<Part>,
}

impl<'a> MultipartUpload<'a> {
    /// Start a new multipart upload
    pub async fn start(
        client: &'a BlobClient,
        pathname: &str,
        options: &PutCommandOptions,
    ) -> Result<Self> {
        if pathname.is_empty() {
            return Err(BlobError::required("pathname"));
        }

        let request = client
            .authorized(Method::POST, client.api_url("/mpu"), Operation::Put, Some(pathname))
            .await?;
        let request = apply_put_headers(request, options).header(headers::MPU_ACTION, "create");
        let response = client.send(request).await?;
        let created: CreateMultipartUploadResponse = decode_json(response).await?;
        debug!(upload_id = %created.upload_id, "multipart upload created");

        Ok(Self {
            client,
            pathname: pathname.to_string(),
            upload_id: created.upload_id,
            key: created.key,
            parts: Vec::new(),
        })
    }

    /// Upload the next part, returning it once committed
    pub async fn upload_part(&mut self, data: Bytes) -> Result<Part> {
        if data.is_empty() {
            return Err(BlobError::InvalidInput("part data is required".to_string()));
        }
        let part_number = u32::try_from(self.parts.len() + 1)
            .map_err(|_| BlobError::InvalidInput("too many parts".to_string()))?;
        let size = data.len();

        let request = self
            .client
            .authorized(Method::PUT, self.client.api_url("/mpu"), Operation::Put, Some(&self.pathname))
            .await?
            .header(headers::MPU_ACTION, "upload")
            .header(headers::MPU_UPLOAD_ID, &self.upload_id)
            .header(headers::MPU_KEY, &self.key)
            .header(headers::MPU_PART_NUMBER, part_number.to_string())
            .body(data);
        let response = self.client.send(request).await?;

        let status = response.status();
        let etag = response
            .headers()
            .get(header::ETAG)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| BlobError::unknown(status, format!("part {} response is missing an ETag", part_number)))?;
        debug!(part_number, size, "part uploaded");

        let part = Part { etag, part_number };
        self.parts.push(part.clone());
        Ok(part)
    }

    /// Complete the upload
    pub async fn complete(self) -> Result<PutBlobPutResult> {
        let request = self
            .client
            .authorized(Method::POST, self.client.api_url("/mpu"), Operation::Put, Some(&self.pathname))
            .await?
            .header(headers::MPU_ACTION, "complete")
            .json(&CompleteMultipartUploadRequest {
                upload_id: &self.upload_id,
                key: &self.key,
                parts: &self.parts,
            });
        let response = self.client.send(request).await?;
        decode_json(response).await
    }

    /// Get the upload ID
    pub fn upload_id(&self) -> &str {
        &self.upload_id
    }

    /// Get the storage key
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Parts committed so far, in upload order
    pub fn completed_parts(&self) -> &[Part] {
        &self.parts
    }
}

/// Fill `buf` from `reader`, stopping early only at end of stream
///
/// Returns the number of bytes read; anything less than `buf.len()` means the
/// stream is exhausted.
pub(crate) async fn read_chunk<R>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize>
where
    R: AsyncRead + Unpin,
{
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]).await {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Upload `reader` as a multipart session in chunks of the configured threshold
pub(crate) async fn put_multipart<R>(
    client: &BlobClient,
    pathname: &str,
    mut reader: R,
    total_bytes: Option<u64>,
    options: &PutCommandOptions,
    progress: Option<&ProgressCallback>,
) -> Result<PutBlobPutResult>
where
    R: AsyncRead + Unpin,
{
    let chunk_size = usize::try_from(client.config().multipart_threshold)
        .map_err(|_| BlobError::Config("multipart threshold does not fit in memory".to_string()))?;

    let mut upload = MultipartUpload::start(client, pathname, options).await?;
    let mut buffer = BytesMut::new();
    let mut bytes_uploaded = 0u64;

    loop {
        buffer.resize(chunk_size, 0);
        let n = read_chunk(&mut reader, &mut buffer).await?;
        if n == 0 {
            break;
        }

        // Hand the filled bytes to the request without copying them.
        buffer.truncate(n);
        let part_number = upload.upload_part(buffer.split().freeze()).await?.part_number;
        bytes_uploaded += n as u64;

        if let Some(cb) = progress {
            cb(UploadProgress {
                bytes_uploaded,
                total_bytes,
                part_number,
            });
        }

        if n < chunk_size {
            break;
        }
    }

    upload.complete().await
}
