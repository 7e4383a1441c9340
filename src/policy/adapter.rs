//! Adapter exposing one legacy policy under the async phase contract
//!
//! The synchronous `execute` path is bridged through the chain's one-shot
//! completion; the streaming path is an explicit little state machine: all
//! upstream chunks are written to the policy stream strictly before `end()`,
//! the policy's own output is accumulated, and the rebuilt body is installed
//! only once the policy signals its end, and never when the context was
//! interrupted in the meantime.

use bytes::Bytes;
use futures_util::StreamExt;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::{oneshot, Notify};

use crate::context::{ExecutionContext, ExecutionPhase};
use crate::http::{concat_chunks, Body};
use crate::policy::chain::PolicyChain;
use crate::policy::types::{Policy, PolicyError};

pub struct PolicyAdapter {
    policy: Arc<dyn Policy>,
}

#[derive(Default)]
struct StreamOutput {
    chunks: Vec<Bytes>,
    ended: bool,
}

impl PolicyAdapter {
    pub fn new(policy: Arc<dyn Policy>) -> Self {
        Self { policy }
    }

    pub async fn on_request(&self, ctx: &mut ExecutionContext) -> Result<(), PolicyError> {
        self.adapt(ctx, ExecutionPhase::Request).await
    }

    pub async fn on_response(&self, ctx: &mut ExecutionContext) -> Result<(), PolicyError> {
        self.adapt(ctx, ExecutionPhase::Response).await
    }

    /// Legacy policies only exist against the synchronous contract; the
    /// message-streaming contract cannot be adapted.
    pub async fn on_async_request(&self, _ctx: &mut ExecutionContext) -> Result<(), PolicyError> {
        Err(self.async_adaptation_error())
    }

    pub async fn on_async_response(&self, _ctx: &mut ExecutionContext) -> Result<(), PolicyError> {
        Err(self.async_adaptation_error())
    }

    fn async_adaptation_error(&self) -> PolicyError {
        PolicyError::AsyncAdaptation {
            policy: self.policy.id().to_string(),
        }
    }

    async fn adapt(
        &self,
        ctx: &mut ExecutionContext,
        phase: ExecutionPhase,
    ) -> Result<(), PolicyError> {
        ctx.set_phase(phase);
        if self.policy.is_runnable() {
            self.run(ctx).await
        } else if self.policy.is_streamable() {
            self.run_streaming(ctx, phase).await
        } else {
            Ok(())
        }
    }

    async fn run(&self, ctx: &mut ExecutionContext) -> Result<(), PolicyError> {
        let (tx, rx) = oneshot::channel();
        {
            let mut chain = PolicyChain::new(ctx, tx);
            self.policy
                .execute(&mut chain)
                .map_err(|source| PolicyError::Execution {
                    policy: self.policy.id().to_string(),
                    source,
                })?;
        }
        match rx.await {
            Ok(outcome) => outcome,
            Err(_) => Err(PolicyError::ChainDropped {
                policy: self.policy.id().to_string(),
            }),
        }
    }

    async fn run_streaming(
        &self,
        ctx: &mut ExecutionContext,
        phase: ExecutionPhase,
    ) -> Result<(), PolicyError> {
        let stream_error = |source| PolicyError::Stream {
            policy: self.policy.id().to_string(),
            source,
        };

        // The chain is only live for the duration of the stream() call.
        let (tx, _rx) = oneshot::channel();
        let maybe_stream = {
            let mut chain = PolicyChain::new(ctx, tx);
            self.policy.stream(&mut chain).map_err(stream_error)?
        };
        let mut stream = match maybe_stream {
            Some(stream) => stream,
            // No stream: pass-through.
            None => return Ok(()),
        };

        let output = Arc::new(Mutex::new(StreamOutput::default()));
        let end_signal = Arc::new(Notify::new());
        {
            let output = Arc::clone(&output);
            stream.on_chunk(Box::new(move |chunk| output.lock().chunks.push(chunk)));
        }
        {
            let output = Arc::clone(&output);
            let end_signal = Arc::clone(&end_signal);
            stream.on_end(Box::new(move || {
                output.lock().ended = true;
                end_signal.notify_one();
            }));
        }

        // Drain the phase body into the policy stream, preserving order.
        let body = match phase {
            ExecutionPhase::Request => ctx.request_mut().take_body(),
            ExecutionPhase::Response => ctx.response_mut().take_body(),
        };
        let mut upstream = body.into_stream();
        while let Some(chunk) = upstream.next().await {
            stream.write(chunk.map_err(stream_error)?);
        }

        // Interrupted mid-stream: the upstream is drained but the transform
        // is abandoned: no end(), no new body.
        if ctx.is_interrupted() {
            return Ok(());
        }
        stream.end();

        loop {
            let notified = end_signal.notified();
            if output.lock().ended {
                break;
            }
            notified.await;
        }

        if ctx.is_interrupted() {
            return Ok(());
        }
        let rebuilt = Body::Full(concat_chunks(&output.lock().chunks));
        match phase {
            ExecutionPhase::Request => ctx.request_mut().set_body(rebuilt),
            ExecutionPhase::Response => ctx.response_mut().set_body(rebuilt),
        }
        Ok(())
    }
}
