//! Type-safe wrappers for gateway identifiers and path values
//!
//! Newtypes keep validation at the boundary: once a value exists it is
//! known to be well-formed, so the routing core never re-checks it.

use nutype::nutype;
use uuid::Uuid;

/// Request ID for correlation across dispatch stages and reporting
#[nutype(
    derive(Clone, Copy, Debug, Display, PartialEq, Eq, Hash, Serialize, Deserialize, TryFrom, AsRef),
    validate(predicate = |id: &Uuid| id.get_version_num() == 7),
)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Create a new RequestId with a v7 UUID
    pub fn new() -> Self {
        Self::try_new(Uuid::now_v7()).expect("now_v7 always produces a v7 UUID")
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

/// A flow's declared path pattern (may contain `:name` parameter segments)
#[nutype(
    derive(Clone, Debug, Display, Hash, PartialEq, Eq, Serialize, Deserialize, TryFrom, AsRef),
    validate(predicate = |s: &str| s.starts_with('/')),
)]
pub struct FlowPath(String);

/// Identifier of a deployed policy plugin
#[nutype(
    derive(Clone, Debug, Display, Hash, PartialEq, Eq, Serialize, Deserialize, TryFrom, AsRef),
    validate(not_empty),
)]
pub struct PolicyId(String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_id_is_v7() {
        let id = RequestId::new();
        assert_eq!(id.as_ref().get_version_num(), 7);
    }

    #[test]
    fn flow_path_requires_leading_slash() {
        assert!(FlowPath::try_new("/products".to_string()).is_ok());
        assert!(FlowPath::try_new("products".to_string()).is_err());
    }

    #[test]
    fn policy_id_rejects_empty() {
        assert!(PolicyId::try_new("rate-limit".to_string()).is_ok());
        assert!(PolicyId::try_new(String::new()).is_err());
    }
}
