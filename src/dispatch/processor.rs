//! Platform processor chains surrounding handler execution
//!
//! A chain runs its processors in order against the context. Hooks observe
//! chain boundaries; a hook rejecting the chain is a chain failure, fired
//! through the error hooks like any processor failure.

use async_trait::async_trait;
use std::sync::Arc;

use crate::context::ExecutionContext;
use crate::dispatch::DispatchError;
use crate::http::BoxError;

#[async_trait]
pub trait Processor: Send + Sync {
    fn id(&self) -> &str;

    async fn process(&self, ctx: &mut ExecutionContext) -> Result<(), BoxError>;
}

/// Observes chain execution boundaries.
pub trait ChainHook: Send + Sync {
    fn id(&self) -> &str;

    fn pre(&self, chain: &str, ctx: &ExecutionContext) -> Result<(), BoxError> {
        let _ = (chain, ctx);
        Ok(())
    }

    fn post(&self, chain: &str, ctx: &ExecutionContext) -> Result<(), BoxError> {
        let _ = (chain, ctx);
        Ok(())
    }

    fn error(&self, chain: &str, ctx: &ExecutionContext, error: &DispatchError) {
        let _ = (chain, ctx, error);
    }
}

/// Hook that traces chain boundaries and failures.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingHook;

impl ChainHook for TracingHook {
    fn id(&self) -> &str {
        "tracing"
    }

    fn pre(&self, chain: &str, ctx: &ExecutionContext) -> Result<(), BoxError> {
        tracing::debug!(request_id = %ctx.request().id(), chain, "entering chain");
        Ok(())
    }

    fn post(&self, chain: &str, ctx: &ExecutionContext) -> Result<(), BoxError> {
        tracing::debug!(request_id = %ctx.request().id(), chain, "leaving chain");
        Ok(())
    }

    fn error(&self, chain: &str, ctx: &ExecutionContext, error: &DispatchError) {
        tracing::error!(request_id = %ctx.request().id(), chain, %error, "chain failed");
    }
}

pub struct ProcessorChain {
    id: String,
    processors: Vec<Arc<dyn Processor>>,
}

impl ProcessorChain {
    pub fn new(id: impl Into<String>, processors: Vec<Arc<dyn Processor>>) -> Self {
        Self {
            id: id.into(),
            processors,
        }
    }

    pub fn empty(id: impl Into<String>) -> Self {
        Self::new(id, Vec::new())
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Run every processor in order. The first failure stops the chain,
    /// fires the error hooks, and propagates.
    pub async fn execute(
        &self,
        ctx: &mut ExecutionContext,
        hooks: &[Arc<dyn ChainHook>],
    ) -> Result<(), DispatchError> {
        for hook in hooks {
            if let Err(source) = hook.pre(&self.id, ctx) {
                let error = DispatchError::Hook {
                    chain: self.id.clone(),
                    hook: hook.id().to_string(),
                    source,
                };
                self.fire_error(ctx, hooks, &error);
                return Err(error);
            }
        }

        for processor in &self.processors {
            if let Err(source) = processor.process(ctx).await {
                let error = DispatchError::Processor {
                    chain: self.id.clone(),
                    processor: processor.id().to_string(),
                    source,
                };
                self.fire_error(ctx, hooks, &error);
                return Err(error);
            }
        }

        for hook in hooks {
            if let Err(source) = hook.post(&self.id, ctx) {
                let error = DispatchError::Hook {
                    chain: self.id.clone(),
                    hook: hook.id().to_string(),
                    source,
                };
                self.fire_error(ctx, hooks, &error);
                return Err(error);
            }
        }
        Ok(())
    }

    fn fire_error(
        &self,
        ctx: &ExecutionContext,
        hooks: &[Arc<dyn ChainHook>],
        error: &DispatchError,
    ) {
        for hook in hooks {
            hook.error(&self.id, ctx, error);
        }
    }
}
