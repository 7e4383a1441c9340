//! Condition expression evaluation
//!
//! Flows and steps may declare a boolean condition evaluated against the
//! current context. The engine sits behind [`ExpressionEvaluator`] so a
//! richer language can be injected; the built-in evaluator covers the
//! grammar the gateway's own conditions use: context selectors compared to
//! string literals, combined with boolean operators.
//!
//! ```text
//! request.method == 'GET' && (request.headers['x-debug'] != '' || request.params['debug'] == 'on')
//! request.path =~ '^/api/v[0-9]+/'
//! ```
//!
//! Evaluation failure (bad syntax, unknown selector, invalid regex) is a
//! hard error surfaced to the caller, never coerced to `false`.

mod parser;

use thiserror::Error;

use crate::context::ExecutionContext;
pub use parser::SimpleExpressionEvaluator;

#[derive(Error, Debug)]
pub enum ExpressionError {
    #[error("syntax error in condition expression: {0}")]
    Syntax(String),

    #[error("unknown selector in condition expression: {0}")]
    UnknownSelector(String),

    #[error("invalid regex {pattern:?} in condition expression: {source}")]
    InvalidRegex {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Seam for the condition-language engine.
pub trait ExpressionEvaluator: Send + Sync {
    /// Evaluate `expression` to a boolean against the current context.
    fn evaluate(
        &self,
        expression: &str,
        ctx: &ExecutionContext,
    ) -> Result<bool, ExpressionError>;
}
