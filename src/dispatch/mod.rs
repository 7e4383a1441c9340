//! Entrypoint dispatch: transport classification, acceptor resolution,
//! processor chains, and the top-level request dispatcher

pub mod acceptor;
pub mod dispatcher;
pub mod handler;
pub mod metrics;
pub mod processor;
pub mod timeout;
pub mod transport;

use thiserror::Error;

use crate::flow::condition::ConditionError;
use crate::http::BoxError;
use crate::policy::PolicyError;

pub use acceptor::{Acceptor, AcceptorResolver, ApiType, HandlerKind, StaticAcceptorResolver};
pub use dispatcher::DefaultHttpRequestDispatcher;
pub use handler::{FlowPolicyChainHandler, LegacyHandler, ReactiveHandler};
pub use metrics::{Metrics, MetricsReporter, TracingMetricsReporter};
pub use processor::{ChainHook, Processor, ProcessorChain, TracingHook};
pub use timeout::TimeoutHandle;
pub use transport::{InMemoryTransportResponse, TransportKind, TransportRequest, TransportResponse};

/// Failures surfaced while dispatching one request.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The acceptor's declared API type has no entrypoint dispatch path.
    #[error("api type {api_type:?} is not dispatchable at this entrypoint")]
    UnsupportedApiType { api_type: ApiType },

    #[error("processor {processor} in chain {chain} failed")]
    Processor {
        chain: String,
        processor: String,
        #[source]
        source: BoxError,
    },

    #[error("hook {hook} rejected chain {chain}")]
    Hook {
        chain: String,
        hook: String,
        #[source]
        source: BoxError,
    },

    #[error(transparent)]
    Policy(#[from] PolicyError),

    #[error(transparent)]
    Condition(#[from] ConditionError),
}
