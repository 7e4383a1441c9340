//! Flow and step model
//!
//! Flows are created when an API is deployed and are shared read-only across
//! every request of that deployment; identity (the `Arc` pointer) is what the
//! resolution caches key on.

use http::Method;
use std::collections::HashSet;
use std::sync::Arc;

use crate::context::ExecutionPhase;
use crate::http::{FlowPath, PolicyId};

/// How a flow's declared path is matched against the request path.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PathOperator {
    Equals,
    StartsWith,
}

impl Default for PathOperator {
    fn default() -> Self {
        PathOperator::StartsWith
    }
}

/// One policy invocation declared inside a flow.
#[derive(Clone, Debug)]
pub struct Step {
    policy: PolicyId,
    configuration: Option<String>,
    enabled: bool,
    condition: Option<String>,
}

impl Step {
    pub fn new(policy: PolicyId) -> Self {
        Self {
            policy,
            configuration: None,
            enabled: true,
            condition: None,
        }
    }

    pub fn with_configuration(mut self, configuration: impl Into<String>) -> Self {
        self.configuration = Some(configuration.into());
        self
    }

    pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
        self.condition = Some(condition.into());
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn policy(&self) -> &PolicyId {
        &self.policy
    }

    /// Serialized JSON configuration, parsed once into policy metadata.
    pub fn configuration(&self) -> Option<&str> {
        self.configuration.as_deref()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn condition(&self) -> Option<&str> {
        self.condition.as_deref()
    }
}

/// A matchable routing unit: path + operator + methods + condition, plus the
/// ordered step lists executed on each phase.
///
/// Older deployments declared separate response and post step lists; both
/// run on the response phase in declaration order, so they are carried here
/// as the single `post` list. `pre` covers the request phase the same way.
#[derive(Clone, Debug, Default)]
pub struct Flow {
    name: Option<String>,
    path: Option<FlowPath>,
    operator: PathOperator,
    methods: HashSet<Method>,
    condition: Option<String>,
    pre: Vec<Arc<Step>>,
    post: Vec<Arc<Step>>,
}

impl Flow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_path(mut self, path: FlowPath, operator: PathOperator) -> Self {
        self.path = Some(path);
        self.operator = operator;
        self
    }

    pub fn with_methods(mut self, methods: impl IntoIterator<Item = Method>) -> Self {
        self.methods = methods.into_iter().collect();
        self
    }

    pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
        self.condition = Some(condition.into());
        self
    }

    pub fn with_pre_step(mut self, step: Step) -> Self {
        self.pre.push(Arc::new(step));
        self
    }

    pub fn with_post_step(mut self, step: Step) -> Self {
        self.post.push(Arc::new(step));
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn path(&self) -> Option<&FlowPath> {
        self.path.as_ref()
    }

    /// Path string used for specificity comparison; a flow without a path
    /// compares as the empty string.
    pub fn effective_path(&self) -> &str {
        self.path.as_ref().map(|p| p.as_ref()).unwrap_or("")
    }

    pub fn operator(&self) -> PathOperator {
        self.operator
    }

    /// Declared method set; empty means the flow applies to every method.
    pub fn methods(&self) -> &HashSet<Method> {
        &self.methods
    }

    pub fn condition(&self) -> Option<&str> {
        self.condition.as_deref()
    }

    /// The ordered step list for the given phase.
    pub fn steps(&self, phase: ExecutionPhase) -> &[Arc<Step>] {
        match phase {
            ExecutionPhase::Request => &self.pre,
            ExecutionPhase::Response => &self.post,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(s: &str) -> FlowPath {
        FlowPath::try_new(s.to_string()).unwrap()
    }

    #[test]
    fn effective_path_falls_back_to_empty() {
        assert_eq!(Flow::new().effective_path(), "");
        let flow = Flow::new().with_path(path("/products"), PathOperator::Equals);
        assert_eq!(flow.effective_path(), "/products");
    }

    #[test]
    fn steps_select_by_phase() {
        let flow = Flow::new()
            .with_pre_step(Step::new(PolicyId::try_new("a".to_string()).unwrap()))
            .with_post_step(Step::new(PolicyId::try_new("b".to_string()).unwrap()))
            .with_post_step(Step::new(PolicyId::try_new("c".to_string()).unwrap()));
        assert_eq!(flow.steps(ExecutionPhase::Request).len(), 1);
        assert_eq!(flow.steps(ExecutionPhase::Response).len(), 2);
    }
}
