//! Portcullis - request routing core for an API gateway
//!
//! Routes incoming HTTP requests to deployed APIs: acceptor resolution,
//! condition-based flow selection, per-flow policy resolution with
//! identity-keyed caches, and a policy adapter bridging synchronous
//! policies into the async execution pipeline.

pub mod config;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod expression;
pub mod flow;
pub mod http;
pub mod policy;

pub use config::Settings;
pub use context::{ExecutionContext, ExecutionMode, ExecutionPhase, InterruptionState};
pub use dispatch::DefaultHttpRequestDispatcher;
pub use error::{Error, Result};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_type_composes_area_errors() {
        let parse_failure = serde_json::from_str::<serde_json::Value>("{")
            .expect_err("unterminated object must fail");
        let error: Error = parse_failure.into();
        assert!(matches!(error, Error::Serialization(_)));
    }
}
