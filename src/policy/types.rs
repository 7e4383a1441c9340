//! Legacy policy contract
//!
//! Policies were written against a synchronous chain-control API: a policy
//! either *executes* (runs once, then tells the chain to continue or fail)
//! or *streams* (transforms the body as it flows through). The adapter in
//! this module's sibling exposes both shapes under the asynchronous phase
//! contract.

use bytes::Bytes;
use http::StatusCode;
use thiserror::Error;

use crate::http::BoxError;
use crate::policy::chain::PolicyChain;

#[derive(Error, Debug)]
pub enum PolicyError {
    #[error("policy {policy} execution failed")]
    Execution {
        policy: String,
        #[source]
        source: BoxError,
    },

    #[error("policy {policy} streaming failed")]
    Stream {
        policy: String,
        #[source]
        source: BoxError,
    },

    #[error("cannot adapt legacy policy {policy} for async execution")]
    AsyncAdaptation { policy: String },

    #[error("invalid configuration for policy {policy}")]
    InvalidConfiguration {
        policy: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("policy {policy} returned without signalling its chain")]
    ChainDropped { policy: String },
}

/// Outcome a policy reports when short-circuiting the chain.
#[derive(Clone, Debug)]
pub struct PolicyResult {
    status: StatusCode,
    message: Option<String>,
    content_type: Option<String>,
}

impl PolicyResult {
    pub fn failure(status: StatusCode) -> Self {
        Self {
            status,
            message: None,
            content_type: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }
}

pub type ChunkHandler = Box<dyn FnMut(Bytes) + Send>;
pub type EndHandler = Box<dyn FnMut() + Send>;

/// Callback-style transform stream: the caller writes upstream chunks in and
/// signals `end`; the stream delivers its own output through the registered
/// handlers. Output may be produced chunk-by-chunk or all at once on `end`.
pub trait ReadWriteStream: Send {
    fn on_chunk(&mut self, handler: ChunkHandler);
    fn on_end(&mut self, handler: EndHandler);
    fn write(&mut self, chunk: Bytes);
    fn end(&mut self);
}

/// A legacy policy. `is_runnable`/`is_streamable` are capability checks
/// evaluated once per adapted policy.
pub trait Policy: Send + Sync {
    fn id(&self) -> &str;

    fn is_runnable(&self) -> bool {
        true
    }

    fn is_streamable(&self) -> bool {
        false
    }

    /// Synchronous execution. The policy must signal `chain` exactly once
    /// (`do_next` or `fail_with`) unless it returns an error.
    fn execute(&self, chain: &mut PolicyChain<'_>) -> Result<(), BoxError> {
        chain.do_next();
        Ok(())
    }

    /// Streaming execution: return the transform stream to wire, or `None`
    /// for a pass-through.
    fn stream(
        &self,
        chain: &mut PolicyChain<'_>,
    ) -> Result<Option<Box<dyn ReadWriteStream>>, BoxError> {
        let _ = chain;
        Ok(None)
    }
}

/// Buffering transform stream: collects everything written to it and, on
/// `end`, runs the transform over the whole input and emits the result as a
/// single chunk.
pub struct BufferedReadWriteStream {
    transform: Box<dyn FnMut(Bytes) -> Bytes + Send>,
    buffered: Vec<Bytes>,
    chunk_handler: Option<ChunkHandler>,
    end_handler: Option<EndHandler>,
}

impl BufferedReadWriteStream {
    pub fn new(transform: impl FnMut(Bytes) -> Bytes + Send + 'static) -> Self {
        Self {
            transform: Box::new(transform),
            buffered: Vec::new(),
            chunk_handler: None,
            end_handler: None,
        }
    }
}

impl ReadWriteStream for BufferedReadWriteStream {
    fn on_chunk(&mut self, handler: ChunkHandler) {
        self.chunk_handler = Some(handler);
    }

    fn on_end(&mut self, handler: EndHandler) {
        self.end_handler = Some(handler);
    }

    fn write(&mut self, chunk: Bytes) {
        self.buffered.push(chunk);
    }

    fn end(&mut self) {
        let input = crate::http::concat_chunks(&self.buffered);
        let output = (self.transform)(input);
        if let Some(handler) = &mut self.chunk_handler {
            handler(output);
        }
        if let Some(handler) = &mut self.end_handler {
            handler();
        }
    }
}
