//! Policy execution: chain control, per-flow resolution, legacy adaptation

pub mod adapter;
pub mod chain;
pub mod metadata;
pub mod resolver;
pub mod types;

pub use adapter::PolicyAdapter;
pub use chain::PolicyChain;
pub use metadata::PolicyMetadata;
pub use resolver::{FlowPolicyResolver, PolicyFactory, PolicyResolverRegistry};
pub use types::{
    BufferedReadWriteStream, ChunkHandler, EndHandler, Policy, PolicyError, PolicyResult,
    ReadWriteStream,
};
