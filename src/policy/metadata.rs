//! Resolved, cacheable form of a flow step

use crate::http::PolicyId;
use crate::flow::types::Step;
use crate::policy::types::PolicyError;

/// A step compiled into executable form: policy id plus parsed
/// configuration. Built at most once per step instance and shared from the
/// resolver cache thereafter.
#[derive(Clone, Debug)]
pub struct PolicyMetadata {
    policy: PolicyId,
    configuration: serde_json::Value,
    condition: Option<String>,
    order: usize,
}

impl PolicyMetadata {
    pub(crate) fn from_step(step: &Step, order: usize) -> Result<Self, PolicyError> {
        let configuration = match step.configuration() {
            Some(raw) => {
                serde_json::from_str(raw).map_err(|source| PolicyError::InvalidConfiguration {
                    policy: step.policy().to_string(),
                    source,
                })?
            }
            None => serde_json::Value::Null,
        };
        Ok(Self {
            policy: step.policy().clone(),
            configuration,
            condition: step.condition().map(str::to_string),
            order,
        })
    }

    pub fn policy(&self) -> &PolicyId {
        &self.policy
    }

    pub fn configuration(&self) -> &serde_json::Value {
        &self.configuration
    }

    pub fn condition(&self) -> Option<&str> {
        self.condition.as_deref()
    }

    /// Position of the originating step within its phase list.
    pub fn order(&self) -> usize {
        self.order
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy_id(s: &str) -> PolicyId {
        PolicyId::try_new(s.to_string()).unwrap()
    }

    #[test]
    fn parses_json_configuration() {
        let step = Step::new(policy_id("rate-limit")).with_configuration(r#"{"limit": 10}"#);
        let metadata = PolicyMetadata::from_step(&step, 0).unwrap();
        assert_eq!(metadata.configuration()["limit"], 10);
    }

    #[test]
    fn missing_configuration_is_null() {
        let step = Step::new(policy_id("noop"));
        let metadata = PolicyMetadata::from_step(&step, 3).unwrap();
        assert!(metadata.configuration().is_null());
        assert_eq!(metadata.order(), 3);
    }

    #[test]
    fn malformed_configuration_is_an_error() {
        let step = Step::new(policy_id("broken")).with_configuration("{not json");
        assert!(matches!(
            PolicyMetadata::from_step(&step, 0),
            Err(PolicyError::InvalidConfiguration { .. })
        ));
    }
}
