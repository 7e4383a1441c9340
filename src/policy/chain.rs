//! Chain-control handle passed to legacy policies
//!
//! One chain per policy invocation, bound to the request's context and a
//! single-fire completion signal. A policy short-circuiting the chain via
//! `fail_with` is *not* an error: the chain completes normally with the
//! interruption recorded as context state plus response status, and
//! downstream stages check the flag instead of catching anything.

use http::header::CONTENT_TYPE;
use http::HeaderValue;
use tokio::sync::oneshot;

use crate::context::ExecutionContext;
use crate::http::Body;
use crate::policy::types::{PolicyError, PolicyResult};

pub struct PolicyChain<'a> {
    ctx: &'a mut ExecutionContext,
    completion: Option<oneshot::Sender<Result<(), PolicyError>>>,
}

impl<'a> PolicyChain<'a> {
    pub(crate) fn new(
        ctx: &'a mut ExecutionContext,
        completion: oneshot::Sender<Result<(), PolicyError>>,
    ) -> Self {
        Self {
            ctx,
            completion: Some(completion),
        }
    }

    pub fn context(&self) -> &ExecutionContext {
        self.ctx
    }

    pub fn context_mut(&mut self) -> &mut ExecutionContext {
        self.ctx
    }

    /// Signal successful completion and hand control to the next stage.
    pub fn do_next(&mut self) {
        self.complete();
    }

    /// Short-circuit the remaining chain: record the policy's result on the
    /// response, mark the context interrupted, and complete normally.
    pub fn fail_with(&mut self, result: PolicyResult) {
        self.interrupt_with(result);
    }

    /// Same as [`PolicyChain::fail_with`], used while a streaming policy is
    /// active.
    pub fn stream_fail_with(&mut self, result: PolicyResult) {
        self.interrupt_with(result);
    }

    fn interrupt_with(&mut self, result: PolicyResult) {
        let response = self.ctx.response_mut();
        response.set_status(result.status());
        if let Some(message) = result.message() {
            if let Some(content_type) = result.content_type() {
                if let Ok(value) = HeaderValue::from_str(content_type) {
                    response.headers_mut().insert(CONTENT_TYPE, value);
                }
            }
            response.set_body(Body::from(message.to_string()));
        }
        self.ctx.interrupt();
        self.complete();
    }

    fn complete(&mut self) {
        match self.completion.take() {
            // The receiver may already be gone on abandoned invocations.
            Some(tx) => {
                let _ = tx.send(Ok(()));
            }
            None => tracing::debug!("policy chain signalled more than once"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::GatewayRequest;
    use http::{Method, StatusCode};

    fn ctx() -> ExecutionContext {
        ExecutionContext::new(GatewayRequest::new(Method::GET, "/"))
    }

    #[tokio::test]
    async fn do_next_completes_successfully() {
        let mut ctx = ctx();
        let (tx, rx) = oneshot::channel();
        let mut chain = PolicyChain::new(&mut ctx, tx);
        chain.do_next();
        assert!(rx.await.unwrap().is_ok());
        assert!(!ctx.is_interrupted());
    }

    #[tokio::test]
    async fn fail_with_interrupts_but_completes_successfully() {
        let mut ctx = ctx();
        let (tx, rx) = oneshot::channel();
        let mut chain = PolicyChain::new(&mut ctx, tx);
        chain.fail_with(
            PolicyResult::failure(StatusCode::TOO_MANY_REQUESTS)
                .with_message("quota exceeded")
                .with_content_type("text/plain"),
        );
        // Controlled interruption is a successful chain completion.
        assert!(rx.await.unwrap().is_ok());
        assert!(ctx.is_interrupted());
        assert_eq!(ctx.response().status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            ctx.response().headers().get(CONTENT_TYPE).unwrap(),
            "text/plain"
        );
    }

    #[tokio::test]
    async fn second_signal_is_ignored() {
        let mut ctx = ctx();
        let (tx, rx) = oneshot::channel();
        let mut chain = PolicyChain::new(&mut ctx, tx);
        chain.do_next();
        chain.do_next();
        assert!(rx.await.unwrap().is_ok());
    }
}
