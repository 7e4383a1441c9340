//! Flow model, condition evaluation, and best-match resolution

pub mod condition;
pub mod path;
pub mod resolver;
pub mod selector;
pub mod types;

pub use condition::{
    CompositeConditionEvaluator, ConditionError, ConditionEvaluator, ExpressionConditionEvaluator,
    MethodConditionEvaluator, PathConditionEvaluator,
};
pub use resolver::{BestMatchFlowResolver, ConditionalFlowResolver, FlowResolver};
pub use types::{Flow, PathOperator, Step};
