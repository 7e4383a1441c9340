//! Top-level HTTP request dispatcher
//!
//! One call per exchange: classify the transport, resolve the acceptor,
//! run the platform chains around the handler, and complete the transport
//! response. Whatever happens inside (no acceptor, handler failure,
//! timeout) the transport response is ended exactly once.

use http::header::CONTENT_TYPE;
use http::{HeaderValue, StatusCode};
use std::sync::Arc;

use crate::config::Settings;
use crate::context::{ExecutionContext, ExecutionMode};
use crate::dispatch::acceptor::{Acceptor, AcceptorResolver, ApiType, HandlerKind};
use crate::dispatch::metrics::{Metrics, MetricsReporter, TracingMetricsReporter};
use crate::dispatch::processor::{ChainHook, ProcessorChain, TracingHook};
use crate::dispatch::timeout::TimeoutHandle;
use crate::dispatch::transport::{TransportKind, TransportRequest, TransportResponse};
use crate::dispatch::DispatchError;
use crate::http::{Body, GatewayRequest};

pub struct DefaultHttpRequestDispatcher {
    acceptors: Arc<dyn AcceptorResolver>,
    pre_chain: ProcessorChain,
    post_chain: ProcessorChain,
    not_found_chain: ProcessorChain,
    hooks: Vec<Arc<dyn ChainHook>>,
    reporter: Arc<dyn MetricsReporter>,
    settings: Settings,
}

impl DefaultHttpRequestDispatcher {
    pub fn new(acceptors: Arc<dyn AcceptorResolver>, settings: Settings) -> Self {
        Self {
            acceptors,
            pre_chain: ProcessorChain::empty("platform-pre"),
            post_chain: ProcessorChain::empty("platform-post"),
            not_found_chain: ProcessorChain::empty("not-found"),
            hooks: vec![Arc::new(TracingHook)],
            reporter: Arc::new(TracingMetricsReporter),
            settings,
        }
    }

    pub fn with_pre_chain(mut self, chain: ProcessorChain) -> Self {
        self.pre_chain = chain;
        self
    }

    pub fn with_post_chain(mut self, chain: ProcessorChain) -> Self {
        self.post_chain = chain;
        self
    }

    pub fn with_not_found_chain(mut self, chain: ProcessorChain) -> Self {
        self.not_found_chain = chain;
        self
    }

    pub fn with_hook(mut self, hook: Arc<dyn ChainHook>) -> Self {
        self.hooks.push(hook);
        self
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn MetricsReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Dispatch one exchange. The transport response is always ended by the
    /// time this returns (or, on timeout, by the timeout task).
    pub async fn dispatch(&self, transport: TransportRequest, response: Arc<dyn TransportResponse>) {
        let mut kind = TransportKind::classify(transport.version, &transport.headers);
        if kind == TransportKind::WebSocket && !self.settings.dispatch.websocket_enabled {
            // Upgrade support is off: handle the exchange as plain HTTP.
            kind = TransportKind::Http;
        }
        let request = transport.into_gateway_request();

        match self.acceptors.resolve(request.host(), request.path()) {
            None => self.dispatch_not_found(request, response).await,
            Some(acceptor) => {
                self.dispatch_accepted(acceptor, request, response, kind)
                    .await
            }
        }
    }

    async fn dispatch_not_found(
        &self,
        request: GatewayRequest,
        response: Arc<dyn TransportResponse>,
    ) {
        tracing::debug!(path = request.path(), "no handler for request");
        let unmatched = request.path().to_string();
        let mut ctx = ExecutionContext::new(request);
        if let Err(error) = self.pre_chain.execute(&mut ctx, &self.hooks).await {
            tracing::error!(%error, "platform pre chain failed on not-found path");
        }
        ctx.request_mut().set_path(unmatched);
        ctx.response_mut().set_status(StatusCode::NOT_FOUND);
        self.apply_not_found_body(&mut ctx);
        if let Err(error) = self.not_found_chain.execute(&mut ctx, &self.hooks).await {
            tracing::error!(%error, "not-found chain failed");
        }
        self.finish(ctx, &response).await;
    }

    fn apply_not_found_body(&self, ctx: &mut ExecutionContext) {
        let not_found = &self.settings.not_found;
        if let Ok(value) = HeaderValue::from_str(&not_found.content_type) {
            ctx.response_mut().headers_mut().insert(CONTENT_TYPE, value);
        }
        ctx.response_mut()
            .set_body(Body::from(not_found.message.clone()));
    }

    async fn dispatch_accepted(
        &self,
        acceptor: Acceptor,
        mut request: GatewayRequest,
        response: Arc<dyn TransportResponse>,
        kind: TransportKind,
    ) {
        let mode = match acceptor.api_type() {
            ApiType::Sync => ExecutionMode::Sync,
            ApiType::MessageAsync => ExecutionMode::Async,
            ApiType::Native => {
                let error = DispatchError::UnsupportedApiType {
                    api_type: acceptor.api_type(),
                };
                tracing::error!(%error, context_path = acceptor.context_path(), "dispatch refused");
                let mut ctx = ExecutionContext::new(request);
                ctx.response_mut()
                    .set_status(StatusCode::INTERNAL_SERVER_ERROR);
                self.finish(ctx, &response).await;
                return;
            }
        };

        let handler = match acceptor.handler().cloned() {
            Some(handler) => handler,
            // Acceptor without a deployed handler takes the not-found path.
            None => {
                self.dispatch_not_found(request, response).await;
                return;
            }
        };
        request.set_context_path(acceptor.context_path());

        let mut ctx = ExecutionContext::with_mode(request, mode);
        ctx.set_attribute("gateway.transport", serde_json::json!(format!("{kind:?}")));

        // Legacy handlers get the exchange deadline from the platform unless
        // the exchange is a websocket upgrade; reactive handlers own their
        // lifecycle end to end.
        let _timeout = match &handler {
            HandlerKind::Legacy(_) if kind != TransportKind::WebSocket => self
                .settings
                .dispatch
                .request_timeout()
                .map(|timeout| {
                    TimeoutHandle::arm(Arc::clone(&response), timeout, ctx.interruption())
                }),
            _ => None,
        };

        if let Err(error) = self.run_chained(&mut ctx, &handler).await {
            tracing::error!(%error, "handler pipeline failed");
            ctx.response_mut()
                .set_status(StatusCode::INTERNAL_SERVER_ERROR);
        }
        self.finish(ctx, &response).await;
    }

    async fn run_chained(
        &self,
        ctx: &mut ExecutionContext,
        handler: &HandlerKind,
    ) -> Result<(), DispatchError> {
        self.pre_chain.execute(ctx, &self.hooks).await?;
        match handler {
            HandlerKind::Reactive(handler) => handler.handle(ctx).await?,
            HandlerKind::Legacy(handler) => handler.handle(ctx).await?,
        }
        self.post_chain.execute(ctx, &self.hooks).await?;
        Ok(())
    }

    /// Write the gateway response out and end the exchange. A no-op when the
    /// timeout already answered; ending twice is absorbed by the transport.
    async fn finish(&self, mut ctx: ExecutionContext, response: &Arc<dyn TransportResponse>) {
        self.reporter.report(&Metrics::for_request(
            ctx.request(),
            self.settings.dispatch.tenant.clone(),
            self.settings.dispatch.zone.clone(),
        ));

        if response.is_ended() {
            return;
        }
        // A producer that already wrote the exchange out claims the response
        // ended; completion then only closes the transport.
        if ctx.response().is_ended() {
            response.end();
            return;
        }
        response.set_status(ctx.response().status());
        for (name, value) in ctx.response().headers().clone() {
            if let Some(name) = name {
                response.set_header(name, value);
            }
        }
        match ctx.response_mut().take_body().collect().await {
            Ok(bytes) if !bytes.is_empty() => response.write(bytes),
            Ok(_) => {}
            Err(error) => {
                tracing::error!(%error, "failed to read response body during completion");
            }
        }
        response.end();
    }
}
