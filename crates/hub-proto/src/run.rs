//! Run inputs and run records.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::deployment::ModuleDeployment;
use crate::module::ModuleKind;

/// Lifecycle state of a run.
///
/// `Created` and `Failed` use the node's wire names (`pending`, `error`) and
/// also accept `created`/`failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Accepted but not yet picked up.
    #[serde(rename = "pending", alias = "created")]
    Created,
    /// Picked up, preparing to execute.
    Processing,
    /// Executing.
    Running,
    /// Finished successfully.
    Completed,
    /// Finished with an error.
    #[serde(rename = "error", alias = "failed")]
    Failed,
}

impl RunStatus {
    /// Whether the run will not change state again.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Wire name of the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Created => "pending",
            Self::Processing => "processing",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "error",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A signed request to run a deployment. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunInput {
    consumer_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    inputs: Option<Value>,
    deployment: ModuleDeployment,
    signature: String,
}

impl RunInput {
    /// Build a run input.
    ///
    /// `signature` must be the consumer's signature over `consumer_id`.
    #[must_use]
    pub fn new(
        consumer_id: impl Into<String>,
        inputs: Option<Value>,
        deployment: ModuleDeployment,
        signature: impl Into<String>,
    ) -> Self {
        Self {
            consumer_id: consumer_id.into(),
            inputs,
            deployment,
            signature: signature.into(),
        }
    }

    /// Consumer the run is billed to.
    #[must_use]
    pub fn consumer_id(&self) -> &str {
        &self.consumer_id
    }

    /// Input parameters.
    #[must_use]
    pub const fn inputs(&self) -> Option<&Value> {
        self.inputs.as_ref()
    }

    /// Deployment to run.
    #[must_use]
    pub const fn deployment(&self) -> &ModuleDeployment {
        &self.deployment
    }

    /// Kind of the deployed module.
    #[must_use]
    pub const fn kind(&self) -> ModuleKind {
        self.deployment.kind()
    }

    /// Consumer signature.
    #[must_use]
    pub fn signature(&self) -> &str {
        &self.signature
    }
}

/// A run as tracked by the node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Run {
    /// Run id assigned by the node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Consumer the run belongs to.
    #[serde(default)]
    pub consumer_id: String,
    /// Input parameters.
    #[serde(default)]
    pub inputs: Option<Value>,
    /// Deployment as echoed by the node.
    #[serde(default)]
    pub deployment: Value,
    /// Current lifecycle state.
    pub status: RunStatus,
    /// Whether the run failed.
    #[serde(default)]
    pub error: bool,
    /// Failure description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Results produced so far.
    #[serde(default)]
    pub results: Vec<Value>,
    /// When the run was created.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_time: Option<String>,
    /// When processing began.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_processing_time: Option<String>,
    /// When the run finished.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_time: Option<String>,
    /// Duration in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    /// Consumer signature carried over from the input.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
}

impl Run {
    /// Whether the run has reached a terminal state.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Display label for the run id.
    #[must_use]
    pub fn id_or_unknown(&self) -> &str {
        self.id.as_deref().unwrap_or("<unassigned>")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::NodeAddress;
    use crate::deployment::Deployment;
    use test_case::test_case;

    #[test_case("pending", RunStatus::Created ; "pending")]
    #[test_case("created", RunStatus::Created ; "created alias")]
    #[test_case("processing", RunStatus::Processing ; "processing")]
    #[test_case("running", RunStatus::Running ; "running")]
    #[test_case("completed", RunStatus::Completed ; "completed")]
    #[test_case("error", RunStatus::Failed ; "error")]
    #[test_case("failed", RunStatus::Failed ; "failed alias")]
    fn status_parses(wire: &str, expected: RunStatus) {
        let status: RunStatus = serde_json::from_value(Value::String(wire.into())).unwrap();
        assert_eq!(status, expected);
    }

    #[test]
    fn only_completed_and_failed_are_terminal() {
        assert!(RunStatus::Completed.is_terminal());
        assert!(RunStatus::Failed.is_terminal());
        assert!(!RunStatus::Created.is_terminal());
        assert!(!RunStatus::Processing.is_terminal());
        assert!(!RunStatus::Running.is_terminal());
    }

    #[test]
    fn run_input_serialises_flat() {
        let node = NodeAddress::from_url("http://localhost:7001").unwrap();
        let input = RunInput::new(
            "user:abc",
            Some(serde_json::json!({"q": "hi"})),
            ModuleDeployment::Tool(Deployment::named("calc", node)),
            "deadbeef",
        );
        let json = serde_json::to_value(&input).unwrap();
        assert_eq!(json["consumer_id"], "user:abc");
        assert_eq!(json["inputs"]["q"], "hi");
        assert_eq!(json["deployment"]["name"], "calc");
        assert_eq!(json["signature"], "deadbeef");
        assert_eq!(input.kind(), ModuleKind::Tool);
    }

    #[test]
    fn run_parses_minimal_node_response() {
        let run: Run = serde_json::from_value(serde_json::json!({
            "id": "agent_run:1",
            "consumer_id": "user:abc",
            "status": "completed",
            "results": ["done"]
        }))
        .unwrap();
        assert!(run.is_terminal());
        assert_eq!(run.results, vec![Value::String("done".into())]);
    }
}
