//! Upload payloads

use bytes::Bytes;
use std::fmt;
use std::io::Cursor;
use tokio::io::{AsyncRead, AsyncReadExt};

type BoxReader = Box<dyn AsyncRead + Send + Unpin>;

/// Payload of a put
///
/// Wraps any async reader together with its length when the length is known
/// up front. [`BlobClient::put`](crate::BlobClient::put) uses the length to
/// choose between a single request and a multipart upload; when it is
/// unknown the client reads ahead just far enough to decide.
pub struct PutBody {
    reader: BoxReader,
    len: Option<u64>,
}

impl PutBody {
    /// A stream of unknown length
    pub fn from_reader<R>(reader: R) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        Self {
            reader: Box::new(reader),
            len: None,
        }
    }

    /// A stream whose total length is known
    pub fn sized<R>(reader: R, len: u64) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        Self {
            reader: Box::new(reader),
            len: Some(len),
        }
    }

    /// Upload a file, probing its metadata for the length
    pub async fn from_file(file: tokio::fs::File) -> std::io::Result<Self> {
        let len = file.metadata().await?.len();
        Ok(Self::sized(file, len))
    }

    /// Length of the payload, if known
    pub fn len(&self) -> Option<u64> {
        self.len
    }

    /// Whether the payload is known to be empty
    pub fn is_empty(&self) -> bool {
        self.len == Some(0)
    }

    pub(crate) fn into_reader(self) -> BoxReader {
        self.reader
    }

    /// Read at most `limit` bytes, then hand back the rest of the stream
    pub(crate) async fn read_prefix(mut self, limit: u64) -> std::io::Result<(Vec<u8>, BoxReader)> {
        let mut prefix = Vec::new();
        (&mut self.reader).take(limit).read_to_end(&mut prefix).await?;
        Ok((prefix, self.reader))
    }
}

impl fmt::Debug for PutBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PutBody").field("len", &self.len).finish_non_exhaustive()
    }
}

impl From<Bytes> for PutBody {
    fn from(data: Bytes) -> Self {
        let len = data.len() as u64;
        Self::sized(Cursor::new(data), len)
    }
}

impl From<Vec<u8>> for PutBody {
    fn from(data: Vec<u8>) -> Self {
        Bytes::from(data).into()
    }
}

impl From<String> for PutBody {
    fn from(data: String) -> Self {
        Bytes::from(data).into()
    }
}

impl From<&'static [u8]> for PutBody {
    fn from(data: &'static [u8]) -> Self {
        Bytes::from_static(data).into()
    }
}

impl From<&'static str> for PutBody {
    fn from(data: &'static str) -> Self {
        Bytes::from_static(data.as_bytes()).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_memory_bodies_know_their_length() {
        assert_eq!(PutBody::from(Bytes::from_static(b"hello")).len(), Some(5));
        assert_eq!(PutBody::from(vec![0u8; 10]).len(), Some(10));
        assert_eq!(PutBody::from("abc").len(), Some(3));
        assert!(PutBody::from(Vec::new()).is_empty());
    }

    #[test]
    fn test_reader_length_unknown() {
        let body = PutBody::from_reader(Cursor::new(b"abc".to_vec()));
        assert_eq!(body.len(), None);
        assert!(!body.is_empty());
    }

    #[tokio::test]
    async fn test_from_file_probes_length() {
        use std::io::Write;

        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(&[7u8; 1234]).unwrap();
        let file = tokio::fs::File::open(tmp.path()).await.unwrap();

        let body = PutBody::from_file(file).await.unwrap();
        assert_eq!(body.len(), Some(1234));
    }

    #[tokio::test]
    async fn test_read_prefix_keeps_remainder() {
        let body = PutBody::from_reader(Cursor::new(b"0123456789".to_vec()));
        let (prefix, mut rest) = body.read_prefix(4).await.unwrap();
        assert_eq!(prefix, b"0123");

        let mut remainder = Vec::new();
        rest.read_to_end(&mut remainder).await.unwrap();
        assert_eq!(remainder, b"456789");
    }
}
