use thiserror::Error;

/// Portcullis gateway error types
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Expression error: {0}")]
    Expression(#[from] crate::expression::ExpressionError),

    #[error("Condition error: {0}")]
    Condition(#[from] crate::flow::condition::ConditionError),

    #[error("Policy error: {0}")]
    Policy(#[from] crate::policy::PolicyError),

    #[error("Dispatch error: {0}")]
    Dispatch(#[from] crate::dispatch::DispatchError),
}

pub type Result<T> = std::result::Result<T, Error>;
