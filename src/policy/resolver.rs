//! Per-flow policy resolution and its caches
//!
//! Two layers of caching, both keyed by *instance identity* (flows and
//! steps are shared `Arc`s living for the deployment's lifetime):
//!
//! - [`PolicyResolverRegistry`]: Flow → [`FlowPolicyResolver`], owned by the
//!   deployment (created on deploy, dropped on undeploy);
//! - [`FlowPolicyResolver`]: Step → [`PolicyMetadata`], additive-only for
//!   the flow's lifetime, no eviction.
//!
//! Both caches are shared across concurrent requests; first-time resolution
//! of the same key may race, so insertion is put-if-absent: the first
//! writer wins and every caller observes the same instance afterwards.

use dashmap::DashMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::context::{ExecutionContext, ExecutionPhase};
use crate::flow::types::{Flow, Step};
use crate::policy::metadata::PolicyMetadata;
use crate::policy::types::{Policy, PolicyError};

/// Instantiates executable policies from resolved metadata. Supplied by the
/// plugin layer; out of scope here beyond the seam.
pub trait PolicyFactory: Send + Sync {
    fn create(&self, metadata: &PolicyMetadata) -> Result<Arc<dyn Policy>, PolicyError>;
}

/// Cache key comparing by `Arc` pointer identity rather than value.
struct IdentityKey<T>(Arc<T>);

impl<T> Clone for IdentityKey<T> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<T> PartialEq for IdentityKey<T> {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl<T> Eq for IdentityKey<T> {}

impl<T> Hash for IdentityKey<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (Arc::as_ptr(&self.0) as usize).hash(state);
    }
}

/// Compiles one flow's steps into executable policy metadata, memoized per
/// step.
pub struct FlowPolicyResolver {
    flow: Arc<Flow>,
    factory: Arc<dyn PolicyFactory>,
    cache: DashMap<IdentityKey<Step>, Arc<PolicyMetadata>>,
}

impl FlowPolicyResolver {
    fn new(flow: Arc<Flow>, factory: Arc<dyn PolicyFactory>) -> Self {
        Self {
            flow,
            factory,
            cache: DashMap::new(),
        }
    }

    pub fn flow(&self) -> &Arc<Flow> {
        &self.flow
    }

    /// Instantiate the executable policy for resolved metadata, through the
    /// factory this resolver was memoized with.
    pub fn create_policy(&self, metadata: &PolicyMetadata) -> Result<Arc<dyn Policy>, PolicyError> {
        self.factory.create(metadata)
    }

    /// Metadata for the phase's enabled steps, in declaration order.
    /// Disabled steps are skipped entirely: never cached, never returned.
    pub fn resolve(
        &self,
        phase: ExecutionPhase,
        ctx: &ExecutionContext,
    ) -> Result<Vec<Arc<PolicyMetadata>>, PolicyError> {
        let steps = self.flow.steps(phase);
        let mut resolved = Vec::with_capacity(steps.len());
        for (order, step) in steps.iter().enumerate() {
            if !step.is_enabled() {
                continue;
            }
            let key = IdentityKey(Arc::clone(step));
            if let Some(hit) = self.cache.get(&key) {
                resolved.push(Arc::clone(hit.value()));
                continue;
            }
            let metadata = Arc::new(PolicyMetadata::from_step(step, order)?);
            let entry = self.cache.entry(key).or_insert(metadata);
            resolved.push(Arc::clone(entry.value()));
        }
        tracing::trace!(
            request_id = %ctx.request().id(),
            flow = self.flow.name().unwrap_or("<unnamed>"),
            phase = ?phase,
            policies = resolved.len(),
            "resolved flow policies"
        );
        Ok(resolved)
    }
}

/// Flow → resolver cache owned by one deployment.
#[derive(Default)]
pub struct PolicyResolverRegistry {
    resolvers: DashMap<IdentityKey<Flow>, Arc<FlowPolicyResolver>>,
}

impl PolicyResolverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolver for the given flow. The first call constructs it; later
    /// calls return the same instance no matter which factory is passed.
    pub fn create(
        &self,
        flow: &Arc<Flow>,
        factory: &Arc<dyn PolicyFactory>,
    ) -> Arc<FlowPolicyResolver> {
        let key = IdentityKey(Arc::clone(flow));
        if let Some(hit) = self.resolvers.get(&key) {
            return Arc::clone(hit.value());
        }
        let resolver = Arc::new(FlowPolicyResolver::new(
            Arc::clone(flow),
            Arc::clone(factory),
        ));
        let entry = self.resolvers.entry(key).or_insert(resolver);
        Arc::clone(entry.value())
    }

    pub fn len(&self) -> usize {
        self.resolvers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolvers.is_empty()
    }
}
