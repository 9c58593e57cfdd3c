//! Consumer identity as seen by a node.

use serde::{Deserialize, Serialize};

/// Request to look up a consumer on a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInput {
    /// Hex-encoded public key of the consumer's signing key.
    pub public_key: String,
}

/// A consumer record returned by a node's user endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeUser {
    /// Consumer id on the node, present once registered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Hex-encoded public key.
    pub public_key: String,
    /// Whether the node already knows this consumer.
    #[serde(default)]
    pub is_registered: bool,
}

impl NodeUser {
    /// The consumer id, if the node has assigned one.
    #[must_use]
    pub fn consumer_id(&self) -> Option<&str> {
        self.id.as_deref().filter(|id| !id.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unregistered_user_parses_without_id() {
        let user: NodeUser =
            serde_json::from_str(r#"{"public_key":"ab12","is_registered":false}"#).unwrap();
        assert!(!user.is_registered);
        assert_eq!(user.consumer_id(), None);
    }

    #[test]
    fn empty_id_is_not_a_consumer_id() {
        let user = NodeUser {
            id: Some(String::new()),
            public_key: "ab".into(),
            is_registered: true,
        };
        assert_eq!(user.consumer_id(), None);
    }
}
