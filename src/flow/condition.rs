//! Condition evaluators deciding whether a flow applies to a request
//!
//! Evaluators are stateless predicates over (context, flow). The composite
//! ANDs a set of them; an empty set is open-by-default. Method and path
//! evaluation cannot fail; expression evaluation failure is a hard error
//! surfaced to the caller, never a silent non-match.

use std::sync::Arc;
use thiserror::Error;

use crate::context::ExecutionContext;
use crate::expression::{ExpressionError, ExpressionEvaluator, SimpleExpressionEvaluator};
use crate::flow::path;
use crate::flow::types::Flow;

#[derive(Error, Debug)]
pub enum ConditionError {
    #[error("condition expression evaluation failed: {0}")]
    Expression(#[from] ExpressionError),
}

/// A stateless predicate over (context, value).
pub trait ConditionEvaluator<T: ?Sized>: Send + Sync {
    fn evaluate(&self, ctx: &ExecutionContext, value: &T) -> Result<bool, ConditionError>;
}

/// Matches when the flow declares no methods, or the request method is in
/// the declared set.
#[derive(Clone, Copy, Debug, Default)]
pub struct MethodConditionEvaluator;

impl ConditionEvaluator<Flow> for MethodConditionEvaluator {
    fn evaluate(&self, ctx: &ExecutionContext, flow: &Flow) -> Result<bool, ConditionError> {
        Ok(flow.methods().is_empty() || flow.methods().contains(ctx.request().method()))
    }
}

/// Matches the request path against the flow's path pattern under the flow's
/// operator. A flow without a declared path matches everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct PathConditionEvaluator;

impl ConditionEvaluator<Flow> for PathConditionEvaluator {
    fn evaluate(&self, ctx: &ExecutionContext, flow: &Flow) -> Result<bool, ConditionError> {
        let flow_path = match flow.path() {
            Some(p) => p.as_ref(),
            None => return Ok(true),
        };
        Ok(path::matches(
            ctx.request().path_info(),
            flow_path,
            flow.operator(),
        ))
    }
}

/// Matches when the flow declares no condition, or its expression evaluates
/// truthy. Evaluation failure propagates.
pub struct ExpressionConditionEvaluator {
    engine: Arc<dyn ExpressionEvaluator>,
}

impl ExpressionConditionEvaluator {
    pub fn new(engine: Arc<dyn ExpressionEvaluator>) -> Self {
        Self { engine }
    }
}

impl Default for ExpressionConditionEvaluator {
    fn default() -> Self {
        Self::new(Arc::new(SimpleExpressionEvaluator::new()))
    }
}

impl ConditionEvaluator<Flow> for ExpressionConditionEvaluator {
    fn evaluate(&self, ctx: &ExecutionContext, flow: &Flow) -> Result<bool, ConditionError> {
        match flow.condition().map(str::trim) {
            None | Some("") => Ok(true),
            Some(condition) => Ok(self.engine.evaluate(condition, ctx)?),
        }
    }
}

/// ANDs a set of evaluators; zero evaluators means always true.
/// Short-circuits on the first false.
pub struct CompositeConditionEvaluator<T: ?Sized> {
    evaluators: Vec<Box<dyn ConditionEvaluator<T>>>,
}

impl<T: ?Sized> CompositeConditionEvaluator<T> {
    pub fn new(evaluators: Vec<Box<dyn ConditionEvaluator<T>>>) -> Self {
        Self { evaluators }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }
}

impl CompositeConditionEvaluator<Flow> {
    /// The evaluator set the gateway wires for flow resolution: method,
    /// path, and condition expression.
    pub fn for_flows(engine: Arc<dyn ExpressionEvaluator>) -> Self {
        Self::new(vec![
            Box::new(MethodConditionEvaluator),
            Box::new(PathConditionEvaluator),
            Box::new(ExpressionConditionEvaluator::new(engine)),
        ])
    }
}

impl<T: ?Sized> ConditionEvaluator<T> for CompositeConditionEvaluator<T> {
    fn evaluate(&self, ctx: &ExecutionContext, value: &T) -> Result<bool, ConditionError> {
        for evaluator in &self.evaluators {
            if !evaluator.evaluate(ctx, value)? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::types::PathOperator;
    use crate::http::{FlowPath, GatewayRequest};
    use http::Method;

    fn ctx(method: Method, uri: &str) -> ExecutionContext {
        ExecutionContext::new(GatewayRequest::new(method, uri))
    }

    fn flow_with_path(p: &str, operator: PathOperator) -> Flow {
        Flow::new().with_path(FlowPath::try_new(p.to_string()).unwrap(), operator)
    }

    #[test]
    fn method_evaluator_open_when_no_methods_declared() {
        let flow = Flow::new();
        for method in [Method::GET, Method::POST, Method::DELETE] {
            let ctx = ctx(method, "/");
            assert!(MethodConditionEvaluator.evaluate(&ctx, &flow).unwrap());
        }
    }

    #[test]
    fn method_evaluator_checks_membership() {
        let flow = Flow::new().with_methods([Method::GET, Method::HEAD]);
        assert!(MethodConditionEvaluator
            .evaluate(&ctx(Method::GET, "/"), &flow)
            .unwrap());
        assert!(!MethodConditionEvaluator
            .evaluate(&ctx(Method::POST, "/"), &flow)
            .unwrap());
    }

    #[test]
    fn path_evaluator_uses_flow_operator() {
        let equals = flow_with_path("/products", PathOperator::Equals);
        let prefix = flow_with_path("/products", PathOperator::StartsWith);
        let ctx = ctx(Method::GET, "/products/123");
        assert!(!PathConditionEvaluator.evaluate(&ctx, &equals).unwrap());
        assert!(PathConditionEvaluator.evaluate(&ctx, &prefix).unwrap());
    }

    #[test]
    fn expression_evaluator_defaults_open_and_propagates_failure() {
        let evaluator = ExpressionConditionEvaluator::default();
        let ctx = ctx(Method::GET, "/");
        assert!(evaluator.evaluate(&ctx, &Flow::new()).unwrap());
        assert!(evaluator
            .evaluate(&ctx, &Flow::new().with_condition("  "))
            .unwrap());

        let broken = Flow::new().with_condition("not a condition");
        assert!(matches!(
            evaluator.evaluate(&ctx, &broken),
            Err(ConditionError::Expression(_))
        ));
    }

    struct Fixed(bool);

    impl ConditionEvaluator<Flow> for Fixed {
        fn evaluate(&self, _: &ExecutionContext, _: &Flow) -> Result<bool, ConditionError> {
            Ok(self.0)
        }
    }

    #[test]
    fn composite_is_open_by_default() {
        let composite = CompositeConditionEvaluator::<Flow>::empty();
        assert!(composite
            .evaluate(&ctx(Method::GET, "/"), &Flow::new())
            .unwrap());
    }

    #[test]
    fn composite_ands_all_evaluators() {
        let all_true = CompositeConditionEvaluator::new(vec![
            Box::new(Fixed(true)) as Box<dyn ConditionEvaluator<Flow>>,
            Box::new(Fixed(true)),
        ]);
        let one_false = CompositeConditionEvaluator::new(vec![
            Box::new(Fixed(true)) as Box<dyn ConditionEvaluator<Flow>>,
            Box::new(Fixed(false)),
            Box::new(Fixed(true)),
        ]);
        let ctx = ctx(Method::GET, "/");
        assert!(all_true.evaluate(&ctx, &Flow::new()).unwrap());
        assert!(!one_false.evaluate(&ctx, &Flow::new()).unwrap());
    }
}
