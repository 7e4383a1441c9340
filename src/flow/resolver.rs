//! Flow resolution: from deployed flows to the ones a request executes
//!
//! [`ConditionalFlowResolver`] filters the deployment's flow list through
//! the condition evaluators; [`BestMatchFlowResolver`] decorates any
//! resolver and narrows its result to the single most specific flow.

use async_trait::async_trait;
use std::sync::Arc;

use crate::context::ExecutionContext;
use crate::flow::condition::{CompositeConditionEvaluator, ConditionError, ConditionEvaluator};
use crate::flow::selector;
use crate::flow::types::Flow;

#[async_trait]
pub trait FlowResolver: Send + Sync {
    /// Flows applicable to the current request, in deployment order.
    async fn resolve(&self, ctx: &ExecutionContext) -> Result<Vec<Arc<Flow>>, ConditionError>;
}

/// Filters a deployed flow list through a composite condition evaluator.
pub struct ConditionalFlowResolver {
    flows: Vec<Arc<Flow>>,
    evaluator: CompositeConditionEvaluator<Flow>,
}

impl ConditionalFlowResolver {
    pub fn new(flows: Vec<Arc<Flow>>, evaluator: CompositeConditionEvaluator<Flow>) -> Self {
        Self { flows, evaluator }
    }
}

#[async_trait]
impl FlowResolver for ConditionalFlowResolver {
    async fn resolve(&self, ctx: &ExecutionContext) -> Result<Vec<Arc<Flow>>, ConditionError> {
        let mut matched = Vec::new();
        for flow in &self.flows {
            if self.evaluator.evaluate(ctx, flow)? {
                matched.push(Arc::clone(flow));
            }
        }
        Ok(matched)
    }
}

/// Decorates an upstream resolver and returns at most its single best match.
pub struct BestMatchFlowResolver {
    upstream: Arc<dyn FlowResolver>,
}

impl BestMatchFlowResolver {
    pub fn new(upstream: Arc<dyn FlowResolver>) -> Self {
        Self { upstream }
    }
}

#[async_trait]
impl FlowResolver for BestMatchFlowResolver {
    async fn resolve(&self, ctx: &ExecutionContext) -> Result<Vec<Arc<Flow>>, ConditionError> {
        let candidates = self.upstream.resolve(ctx).await?;
        Ok(selector::select(&candidates).into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::types::PathOperator;
    use crate::http::{FlowPath, GatewayRequest};
    use http::Method;

    fn ctx(uri: &str) -> ExecutionContext {
        ExecutionContext::new(GatewayRequest::new(Method::GET, uri))
    }

    fn flow(path: &str) -> Arc<Flow> {
        Arc::new(Flow::new().with_path(
            FlowPath::try_new(path.to_string()).unwrap(),
            PathOperator::StartsWith,
        ))
    }

    struct FixedResolver(Vec<Arc<Flow>>);

    #[async_trait]
    impl FlowResolver for FixedResolver {
        async fn resolve(&self, _: &ExecutionContext) -> Result<Vec<Arc<Flow>>, ConditionError> {
            Ok(self.0.clone())
        }
    }

    #[tokio::test]
    async fn conditional_resolver_filters_by_conditions() {
        let evaluator = CompositeConditionEvaluator::for_flows(Arc::new(
            crate::expression::SimpleExpressionEvaluator::new(),
        ));
        let resolver =
            ConditionalFlowResolver::new(vec![flow("/products"), flow("/orders")], evaluator);
        let matched = resolver.resolve(&ctx("/products/123")).await.unwrap();
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].effective_path(), "/products");
    }

    #[tokio::test]
    async fn best_match_narrows_to_single_flow() {
        let generic = flow("/products");
        let specific = flow("/products/:productId");
        let resolver = BestMatchFlowResolver::new(Arc::new(FixedResolver(vec![
            Arc::clone(&generic),
            Arc::clone(&specific),
        ])));
        let matched = resolver.resolve(&ctx("/products/123")).await.unwrap();
        assert_eq!(matched.len(), 1);
        assert!(Arc::ptr_eq(&matched[0], &specific));
    }

    #[tokio::test]
    async fn best_match_preserves_empty_upstream() {
        let resolver = BestMatchFlowResolver::new(Arc::new(FixedResolver(Vec::new())));
        assert!(resolver.resolve(&ctx("/products")).await.unwrap().is_empty());
    }
}
