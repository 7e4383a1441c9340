//! Request handlers that acceptors dispatch to
//!
//! Two handler families exist behind one seam: reactive handlers own their
//! whole lifecycle, while legacy handlers get the classification, timeout,
//! and completion plumbing from the dispatcher. [`FlowPolicyChainHandler`]
//! is the legacy handler that drives resolved flows through their policy
//! chains.

use async_trait::async_trait;
use std::sync::Arc;

use crate::context::{ExecutionContext, ExecutionPhase};
use crate::dispatch::DispatchError;
use crate::expression::{ExpressionEvaluator, SimpleExpressionEvaluator};
use crate::flow::condition::ConditionError;
use crate::flow::path;
use crate::flow::resolver::FlowResolver;
use crate::flow::types::Flow;
use crate::policy::{PolicyAdapter, PolicyFactory, PolicyMetadata, PolicyResolverRegistry};

/// A handler implementing the modern execution contract end to end.
#[async_trait]
pub trait ReactiveHandler: Send + Sync {
    async fn handle(&self, ctx: &mut ExecutionContext) -> Result<(), DispatchError>;
}

/// A handler driving the synchronous, adapter-bridged contract.
#[async_trait]
pub trait LegacyHandler: Send + Sync {
    async fn handle(&self, ctx: &mut ExecutionContext) -> Result<(), DispatchError>;
}

/// Runs resolved flows: binds path parameters, resolves each flow's policy
/// metadata, and executes enabled, condition-matching steps through the
/// policy adapter, phase by phase.
pub struct FlowPolicyChainHandler {
    flows: Arc<dyn FlowResolver>,
    factory: Arc<dyn PolicyFactory>,
    registry: Arc<PolicyResolverRegistry>,
    expressions: Arc<dyn ExpressionEvaluator>,
}

impl FlowPolicyChainHandler {
    pub fn new(flows: Arc<dyn FlowResolver>, factory: Arc<dyn PolicyFactory>) -> Self {
        Self {
            flows,
            factory,
            registry: Arc::new(PolicyResolverRegistry::new()),
            expressions: Arc::new(SimpleExpressionEvaluator::new()),
        }
    }

    pub fn with_expression_engine(mut self, engine: Arc<dyn ExpressionEvaluator>) -> Self {
        self.expressions = engine;
        self
    }

    fn bind_path_parameters(&self, flow: &Flow, ctx: &mut ExecutionContext) {
        let flow_path = match flow.path() {
            Some(p) => p.as_ref().to_string(),
            None => return,
        };
        let path_info = ctx.request().path_info().to_string();
        for (name, value) in path::extract_parameters(&flow_path, &path_info) {
            ctx.request_mut().path_parameters_mut().add(name, value);
        }
    }

    fn step_applies(
        &self,
        metadata: &PolicyMetadata,
        ctx: &ExecutionContext,
    ) -> Result<bool, DispatchError> {
        match metadata.condition().map(str::trim) {
            None | Some("") => Ok(true),
            Some(condition) => Ok(self
                .expressions
                .evaluate(condition, ctx)
                .map_err(ConditionError::from)?),
        }
    }

    async fn run_phase(
        &self,
        flow: &Arc<Flow>,
        phase: ExecutionPhase,
        ctx: &mut ExecutionContext,
    ) -> Result<(), DispatchError> {
        let resolver = self.registry.create(flow, &self.factory);
        for metadata in resolver.resolve(phase, ctx)? {
            if ctx.is_interrupted() {
                break;
            }
            if !self.step_applies(&metadata, ctx)? {
                continue;
            }
            let policy = resolver.create_policy(&metadata)?;
            let adapter = PolicyAdapter::new(policy);
            match phase {
                ExecutionPhase::Request => adapter.on_request(ctx).await?,
                ExecutionPhase::Response => adapter.on_response(ctx).await?,
            }
        }
        Ok(())
    }
}

#[async_trait]
impl LegacyHandler for FlowPolicyChainHandler {
    async fn handle(&self, ctx: &mut ExecutionContext) -> Result<(), DispatchError> {
        let flows = self.flows.resolve(ctx).await?;
        for flow in &flows {
            self.bind_path_parameters(flow, ctx);
        }
        for flow in &flows {
            if ctx.is_interrupted() {
                break;
            }
            self.run_phase(flow, ExecutionPhase::Request, ctx).await?;
        }
        // Response steps are skipped once a policy interrupted: the
        // short-circuit response is what goes back out.
        if !ctx.is_interrupted() {
            for flow in &flows {
                if ctx.is_interrupted() {
                    break;
                }
                self.run_phase(flow, ExecutionPhase::Response, ctx).await?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::condition::CompositeConditionEvaluator;
    use crate::flow::resolver::{BestMatchFlowResolver, ConditionalFlowResolver};
    use crate::flow::types::{PathOperator, Step};
    use crate::http::{BoxError, FlowPath, GatewayRequest, PolicyId};
    use crate::policy::{Policy, PolicyChain, PolicyError, PolicyResult};
    use http::{Method, StatusCode};
    use parking_lot::Mutex;

    fn policy_id(s: &str) -> PolicyId {
        PolicyId::try_new(s.to_string()).unwrap()
    }

    fn flow_path(s: &str) -> FlowPath {
        FlowPath::try_new(s.to_string()).unwrap()
    }

    /// Factory producing policies that record their invocations.
    struct RecordingFactory {
        log: Arc<Mutex<Vec<String>>>,
        deny: Option<String>,
    }

    struct RecordingPolicy {
        id: String,
        log: Arc<Mutex<Vec<String>>>,
        deny: bool,
    }

    impl Policy for RecordingPolicy {
        fn id(&self) -> &str {
            &self.id
        }

        fn execute(&self, chain: &mut PolicyChain<'_>) -> Result<(), BoxError> {
            let phase = chain.context().phase();
            self.log.lock().push(format!("{}:{phase:?}", self.id));
            if self.deny {
                chain.fail_with(PolicyResult::failure(StatusCode::FORBIDDEN));
            } else {
                chain.do_next();
            }
            Ok(())
        }
    }

    impl PolicyFactory for RecordingFactory {
        fn create(&self, metadata: &PolicyMetadata) -> Result<Arc<dyn Policy>, PolicyError> {
            let id = metadata.policy().to_string();
            Ok(Arc::new(RecordingPolicy {
                deny: self.deny.as_deref() == Some(&id),
                id,
                log: Arc::clone(&self.log),
            }))
        }
    }

    fn handler_for(
        flows: Vec<Arc<Flow>>,
        log: Arc<Mutex<Vec<String>>>,
        deny: Option<&str>,
    ) -> FlowPolicyChainHandler {
        let resolver = BestMatchFlowResolver::new(Arc::new(ConditionalFlowResolver::new(
            flows,
            CompositeConditionEvaluator::for_flows(Arc::new(SimpleExpressionEvaluator::new())),
        )));
        FlowPolicyChainHandler::new(
            Arc::new(resolver),
            Arc::new(RecordingFactory {
                log,
                deny: deny.map(str::to_string),
            }),
        )
    }

    #[tokio::test]
    async fn runs_pre_then_post_steps_of_the_best_match() {
        let flow = Arc::new(
            Flow::new()
                .named("products")
                .with_path(flow_path("/products"), PathOperator::StartsWith)
                .with_pre_step(Step::new(policy_id("auth")))
                .with_pre_step(Step::new(policy_id("rate-limit")))
                .with_post_step(Step::new(policy_id("transform"))),
        );
        let log = Arc::new(Mutex::new(Vec::new()));
        let handler = handler_for(vec![flow], Arc::clone(&log), None);

        let mut ctx = ExecutionContext::new(GatewayRequest::new(Method::GET, "/products/42"));
        handler.handle(&mut ctx).await.unwrap();

        assert_eq!(
            log.lock().as_slice(),
            &["auth:Request", "rate-limit:Request", "transform:Response"]
        );
    }

    #[tokio::test]
    async fn interruption_skips_remaining_and_response_steps() {
        let flow = Arc::new(
            Flow::new()
                .with_pre_step(Step::new(policy_id("auth")))
                .with_pre_step(Step::new(policy_id("rate-limit")))
                .with_post_step(Step::new(policy_id("transform"))),
        );
        let log = Arc::new(Mutex::new(Vec::new()));
        let handler = handler_for(vec![flow], Arc::clone(&log), Some("auth"));

        let mut ctx = ExecutionContext::new(GatewayRequest::new(Method::GET, "/anything"));
        handler.handle(&mut ctx).await.unwrap();

        assert_eq!(log.lock().as_slice(), &["auth:Request"]);
        assert!(ctx.is_interrupted());
        assert_eq!(ctx.response().status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn binds_path_parameters_from_the_matched_flow() {
        let flow = Arc::new(
            Flow::new()
                .with_path(flow_path("/products/:productId"), PathOperator::StartsWith)
                .with_pre_step(Step::new(policy_id("auth"))),
        );
        let log = Arc::new(Mutex::new(Vec::new()));
        let handler = handler_for(vec![flow], log, None);

        let mut ctx = ExecutionContext::new(GatewayRequest::new(Method::GET, "/products/42"));
        handler.handle(&mut ctx).await.unwrap();

        assert_eq!(ctx.request().path_parameters().get("productId"), Some("42"));
    }

    #[tokio::test]
    async fn step_condition_filters_execution() {
        let flow = Arc::new(
            Flow::new()
                .with_pre_step(
                    Step::new(policy_id("only-posts")).with_condition("request.method == 'POST'"),
                )
                .with_pre_step(Step::new(policy_id("always"))),
        );
        let log = Arc::new(Mutex::new(Vec::new()));
        let handler = handler_for(vec![flow], Arc::clone(&log), None);

        let mut ctx = ExecutionContext::new(GatewayRequest::new(Method::GET, "/x"));
        handler.handle(&mut ctx).await.unwrap();

        assert_eq!(log.lock().as_slice(), &["always:Request"]);
    }
}
