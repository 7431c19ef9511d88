//! Common types for the client SDK

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Operation a token is requested or minted for
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    List,
    Put,
    Head,
    Delete,
    Copy,
    Download,
}

impl Operation {
    /// Wire name of the operation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::List => "list",
            Self::Put => "put",
            Self::Head => "head",
            Self::Delete => "delete",
            Self::Copy => "copy",
            Self::Download => "download",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Operation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "list" => Ok(Self::List),
            "put" => Ok(Self::Put),
            "head" => Ok(Self::Head),
            "delete" | "del" => Ok(Self::Delete),
            "copy" => Ok(Self::Copy),
            "download" => Ok(Self::Download),
            other => Err(format!("unknown operation: {}", other)),
        }
    }
}

/// A blob returned by the list operation
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListBlobResultBlob {
    /// Absolute URL of the blob
    pub url: String,
    /// Store-relative key
    pub pathname: String,
    /// Size in bytes
    pub size: u64,
    /// Upload time
    pub uploaded_at: DateTime<Utc>,
}

/// One page of a listing
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListBlobResult {
    /// Blobs on this page
    #[serde(default)]
    pub blobs: Vec<ListBlobResultBlob>,
    /// Folder names, only populated in folded mode
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub folders: Vec<String>,
    /// Opaque cursor for the next page
    #[serde(default)]
    pub cursor: Option<String>,
    /// Whether there are more results
    #[serde(default)]
    pub has_more: bool,
}

/// Listing mode
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListMode {
    /// Every blob under the prefix
    #[default]
    Expanded,
    /// Blobs directly under the prefix plus folder names
    Folded,
}

impl ListMode {
    /// Query parameter value
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Expanded => "expanded",
            Self::Folded => "folded",
        }
    }
}

/// Options for listing blobs
#[derive(Clone, Debug, Default)]
pub struct ListCommandOptions {
    /// Maximum blobs to return
    pub limit: Option<u64>,
    /// Filter by pathname prefix
    pub prefix: Option<String>,
    /// Cursor from a previous page, forwarded verbatim
    pub cursor: Option<String>,
    /// Listing mode
    pub mode: Option<ListMode>,
}

impl ListCommandOptions {
    /// Create empty options
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the page size
    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Set the prefix filter
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Continue from a cursor
    pub fn with_cursor(mut self, cursor: impl Into<String>) -> Self {
        self.cursor = Some(cursor.into());
        self
    }

    /// Set the listing mode
    pub fn with_mode(mut self, mode: ListMode) -> Self {
        self.mode = Some(mode);
        self
    }
}

/// Options for put and copy
#[derive(Clone, Debug, Default)]
pub struct PutCommandOptions {
    /// Let the server append a random suffix to the pathname
    pub add_random_suffix: bool,
    /// `max-age` for the blob's cache-control, in seconds
    pub cache_control_max_age: Option<u64>,
    /// Content type of the blob
    pub content_type: Option<String>,
    /// Access level, `public` when unset
    pub access: Option<String>,
}

impl PutCommandOptions {
    /// Create default options
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable the random suffix
    pub fn with_random_suffix(mut self, enabled: bool) -> Self {
        self.add_random_suffix = enabled;
        self
    }

    /// Set the cache max age
    pub fn with_cache_control_max_age(mut self, seconds: u64) -> Self {
        self.cache_control_max_age = Some(seconds);
        self
    }

    /// Set content type
    pub fn with_content_type(mut self, ct: impl Into<String>) -> Self {
        self.content_type = Some(ct.into());
        self
    }

    /// Set access level
    pub fn with_access(mut self, access: impl Into<String>) -> Self {
        self.access = Some(access.into());
        self
    }
}

/// Result of put, copy and multipart completion
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PutBlobPutResult {
    /// Absolute URL of the stored blob
    pub url: String,
    /// Final pathname (includes the random suffix, if any)
    pub pathname: String,
    #[serde(default)]
    pub content_type: String,
    #[serde(default)]
    pub content_disposition: String,
}

/// Blob metadata returned by head
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeadBlobResult {
    pub url: String,
    pub size: u64,
    pub uploaded_at: DateTime<Utc>,
    pub pathname: String,
    #[serde(default)]
    pub content_type: String,
    #[serde(default)]
    pub content_disposition: String,
    #[serde(default)]
    pub cache_control: String,
}

/// Inclusive byte range for downloads
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    /// Create a range covering `start..=end`
    pub fn new(start: u64, end: u64) -> Self {
        Self { start, end }
    }

    /// Value of the `Range` header
    pub fn header_value(&self) -> String {
        format!("bytes={}-{}", self.start, self.end)
    }
}

/// Options for download
#[derive(Clone, Debug, Default)]
pub struct DownloadCommandOptions {
    /// The range of bytes to download
    pub byte_range: Option<ByteRange>,
}

impl DownloadCommandOptions {
    /// Download only the given range
    pub fn range(start: u64, end: u64) -> Self {
        Self {
            byte_range: Some(ByteRange::new(start, end)),
        }
    }
}
