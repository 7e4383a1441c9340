//! Request/response body model
//!
//! A body is either absent, fully buffered, or a lazy chunk sequence. The
//! chunk sequence has a single-consumer contract: it is taken out of the
//! owning message exactly once per phase via [`Body::take`]. A buffered body
//! can be re-read; repeated reads return identical bytes.

use bytes::{Bytes, BytesMut};
use futures_util::stream::{self, Stream, StreamExt};
use std::fmt;
use std::pin::Pin;

/// Boxed error used across body streaming boundaries.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A lazy sequence of body chunks.
pub type BodyStream = Pin<Box<dyn Stream<Item = Result<Bytes, BoxError>> + Send + Sync>>;

/// Message body carried by gateway requests and responses.
pub enum Body {
    /// No body.
    Empty,
    /// Finite, restartable whole-body content.
    Full(Bytes),
    /// Lazy chunk sequence, logically consumed once.
    Stream(BodyStream),
}

impl Body {
    pub fn empty() -> Self {
        Body::Empty
    }

    pub fn full(bytes: impl Into<Bytes>) -> Self {
        Body::Full(bytes.into())
    }

    /// Build a streaming body from an in-memory chunk list.
    pub fn from_chunks(chunks: Vec<Bytes>) -> Self {
        Body::Stream(Box::pin(stream::iter(chunks.into_iter().map(Ok))))
    }

    pub fn from_stream<S>(s: S) -> Self
    where
        S: Stream<Item = Result<Bytes, BoxError>> + Send + Sync + 'static,
    {
        Body::Stream(Box::pin(s))
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Body::Empty)
    }

    /// Take the body out, leaving `Empty` behind. Enforces the
    /// single-consumer contract for streamed content.
    pub fn take(&mut self) -> Body {
        std::mem::replace(self, Body::Empty)
    }

    /// Turn the body into a chunk sequence. `Empty` yields no chunks,
    /// `Full` yields a single chunk.
    pub fn into_stream(self) -> BodyStream {
        match self {
            Body::Empty => Box::pin(stream::empty()),
            Body::Full(bytes) => {
                if bytes.is_empty() {
                    Box::pin(stream::empty())
                } else {
                    Box::pin(stream::once(async move { Ok(bytes) }))
                }
            }
            Body::Stream(s) => s,
        }
    }

    /// Collect the whole body into one buffer, preserving chunk order.
    pub async fn collect(self) -> Result<Bytes, BoxError> {
        match self {
            Body::Empty => Ok(Bytes::new()),
            Body::Full(bytes) => Ok(bytes),
            Body::Stream(mut s) => {
                let mut buf = BytesMut::new();
                while let Some(chunk) = s.next().await {
                    buf.extend_from_slice(&chunk?);
                }
                Ok(buf.freeze())
            }
        }
    }
}

impl Default for Body {
    fn default() -> Self {
        Body::Empty
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Body::Empty => f.write_str("Body::Empty"),
            Body::Full(bytes) => write!(f, "Body::Full({} bytes)", bytes.len()),
            Body::Stream(_) => f.write_str("Body::Stream(..)"),
        }
    }
}

impl From<Bytes> for Body {
    fn from(bytes: Bytes) -> Self {
        Body::Full(bytes)
    }
}

impl From<&'static str> for Body {
    fn from(s: &'static str) -> Self {
        Body::Full(Bytes::from_static(s.as_bytes()))
    }
}

impl From<String> for Body {
    fn from(s: String) -> Self {
        Body::Full(Bytes::from(s))
    }
}

/// Concatenate chunks into a single buffer, preserving byte order.
pub fn concat_chunks(chunks: &[Bytes]) -> Bytes {
    let total: usize = chunks.iter().map(Bytes::len).sum();
    let mut buf = BytesMut::with_capacity(total);
    for chunk in chunks {
        buf.extend_from_slice(chunk);
    }
    buf.freeze()
}
