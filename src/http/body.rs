//! Response bodies: either a fixed byte buffer or a lazily produced chunk stream.

use std::fmt;
use std::pin::Pin;

use bytes::{Bytes, BytesMut};
use futures_util::stream::{Stream, StreamExt};
use thiserror::Error;

/// Errors a streamed body can yield instead of a chunk.
#[derive(Debug, Error)]
pub enum BodyError {
    #[error("the headers-sent notification was dropped before it fired")]
    HeadersNeverSent,

    #[error("failed to serialize body: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error while producing body: {0}")]
    Io(#[from] std::io::Error),
}

/// Boxed, `Send` stream of body chunks.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<Bytes, BodyError>> + Send + 'static>>;

/// The payload of a [`Response`](super::Response).
///
/// A `Full` body is written with a `Content-Length`; a `Stream` body is polled by the
/// transport after the head has been written and goes out with chunked encoding.
pub enum Body {
    Full(Bytes),
    Stream(ChunkStream),
}

impl Body {
    /// An empty, fixed-length body.
    pub fn empty() -> Self {
        Self::Full(Bytes::new())
    }

    /// Wraps a chunk stream.
    pub fn stream<S>(stream: S) -> Self
    where
        S: Stream<Item = Result<Bytes, BodyError>> + Send + 'static,
    {
        Self::Stream(Box::pin(stream))
    }

    /// Returns `true` if the body is produced lazily.
    pub fn is_stream(&self) -> bool {
        matches!(self, Self::Stream(_))
    }

    /// Returns the buffered bytes of a `Full` body.
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            Self::Full(bytes) => Some(bytes),
            Self::Stream(_) => None,
        }
    }

    /// Exact length when known up front.
    pub fn size_hint(&self) -> Option<usize> {
        self.as_bytes().map(Bytes::len)
    }

    /// Drains the body into a single buffer.
    ///
    /// # Errors
    ///
    /// Returns the first [`BodyError`] yielded by a streamed body.
    pub async fn collect(self) -> Result<Bytes, BodyError> {
        match self {
            Self::Full(bytes) => Ok(bytes),
            Self::Stream(mut stream) => {
                let mut buf = BytesMut::new();
                while let Some(chunk) = stream.next().await {
                    buf.extend_from_slice(&chunk?);
                }
                Ok(buf.freeze())
            }
        }
    }
}

impl Default for Body {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full(bytes) => f.debug_tuple("Full").field(bytes).finish(),
            Self::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

impl From<Bytes> for Body {
    fn from(bytes: Bytes) -> Self {
        Self::Full(bytes)
    }
}

impl From<Vec<u8>> for Body {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Full(Bytes::from(bytes))
    }
}

impl From<String> for Body {
    fn from(text: String) -> Self {
        Self::Full(Bytes::from(text))
    }
}

impl From<&'static str> for Body {
    fn from(text: &'static str) -> Self {
        Self::Full(Bytes::from_static(text.as_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;

    #[tokio::test]
    async fn collect_full() {
        let body = Body::from("hello");
        assert_eq!(body.size_hint(), Some(5));
        assert_eq!(body.collect().await.unwrap(), Bytes::from_static(b"hello"));
    }

    #[tokio::test]
    async fn collect_stream_concatenates_chunks() {
        let chunks = vec![Ok(Bytes::from_static(b"{")), Ok(Bytes::from_static(b"}"))];
        let body = Body::stream(stream::iter(chunks));
        assert!(body.is_stream());
        assert_eq!(body.size_hint(), None);
        assert_eq!(body.collect().await.unwrap(), Bytes::from_static(b"{}"));
    }

    #[tokio::test]
    async fn collect_stream_surfaces_errors() {
        let chunks = vec![Err(BodyError::HeadersNeverSent)];
        let body = Body::stream(stream::iter(chunks));
        assert!(matches!(body.collect().await, Err(BodyError::HeadersNeverSent)));
    }
}
