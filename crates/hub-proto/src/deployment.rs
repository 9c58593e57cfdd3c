//! Deployments: a module bound to the node it runs on.
//!
//! Agents and orchestrators carry nested sub-deployments for the tools,
//! knowledge bases, memories, environments and agents they use. Each nested
//! deployment is scoped to its own node address only.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::address::NodeAddress;
use crate::module::{ModuleKind, ModuleRef};

/// Fields shared by every deployment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deployment {
    /// Deployment name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Module being deployed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<ModuleRef>,
    /// Node the module runs on.
    pub node: NodeAddress,
    /// Module-specific configuration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<Value>,
}

impl Deployment {
    /// A deployment that only names its node. Used for nested deployments.
    #[must_use]
    pub const fn at(node: NodeAddress) -> Self {
        Self {
            name: None,
            module: None,
            node,
            config: None,
        }
    }

    /// A deployment of a named module on `node`.
    #[must_use]
    pub fn named(name: impl Into<String>, node: NodeAddress) -> Self {
        let name = name.into();
        Self {
            module: Some(ModuleRef::named(name.clone())),
            name: Some(name),
            node,
            config: None,
        }
    }

    /// A deployment of `module` on `node`.
    #[must_use]
    pub fn of(module: ModuleRef, node: NodeAddress) -> Self {
        Self {
            name: None,
            module: Some(module),
            node,
            config: None,
        }
    }

    /// Attach a persona module to the deployment's configuration.
    #[must_use]
    pub fn with_persona(mut self, persona: &str) -> Self {
        self.config = Some(json!({ "persona_module": { "name": persona } }));
        self
    }
}

/// Agent deployment with its supporting sub-deployments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentDeployment {
    /// Shared deployment fields.
    #[serde(flatten)]
    pub base: Deployment,
    /// Tools the agent may call.
    #[serde(default)]
    pub tool_deployments: Vec<Deployment>,
    /// Knowledge bases the agent may query.
    #[serde(default)]
    pub kb_deployments: Vec<Deployment>,
    /// Memory modules the agent may use.
    #[serde(default)]
    pub memory_deployments: Vec<Deployment>,
    /// Environments the agent acts in.
    #[serde(default)]
    pub environment_deployments: Vec<Deployment>,
}

impl AgentDeployment {
    /// An agent deployment with no sub-deployments.
    #[must_use]
    pub const fn new(base: Deployment) -> Self {
        Self {
            base,
            tool_deployments: Vec::new(),
            kb_deployments: Vec::new(),
            memory_deployments: Vec::new(),
            environment_deployments: Vec::new(),
        }
    }
}

/// Orchestrator deployment with the agents and shared modules it coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrchestratorDeployment {
    /// Shared deployment fields.
    #[serde(flatten)]
    pub base: Deployment,
    /// Agents taking part in the run.
    #[serde(default)]
    pub agent_deployments: Vec<Deployment>,
    /// Environments shared by the agents.
    #[serde(default)]
    pub environment_deployments: Vec<Deployment>,
    /// Knowledge bases shared by the agents.
    #[serde(default)]
    pub kb_deployments: Vec<Deployment>,
    /// Memory modules shared by the agents.
    #[serde(default)]
    pub memory_deployments: Vec<Deployment>,
}

impl OrchestratorDeployment {
    /// An orchestrator deployment with no sub-deployments.
    #[must_use]
    pub const fn new(base: Deployment) -> Self {
        Self {
            base,
            agent_deployments: Vec::new(),
            environment_deployments: Vec::new(),
            kb_deployments: Vec::new(),
            memory_deployments: Vec::new(),
        }
    }
}

/// A deployment of any runnable module kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ModuleDeployment {
    /// Agent deployment.
    Agent(AgentDeployment),
    /// Tool deployment.
    Tool(Deployment),
    /// Orchestrator deployment.
    Orchestrator(OrchestratorDeployment),
    /// Environment deployment.
    Environment(Deployment),
    /// Knowledge base deployment.
    KnowledgeBase(Deployment),
    /// Memory module deployment.
    Memory(Deployment),
}

impl ModuleDeployment {
    /// Module kind of this deployment.
    #[must_use]
    pub const fn kind(&self) -> ModuleKind {
        match self {
            Self::Agent(_) => ModuleKind::Agent,
            Self::Tool(_) => ModuleKind::Tool,
            Self::Orchestrator(_) => ModuleKind::Orchestrator,
            Self::Environment(_) => ModuleKind::Environment,
            Self::KnowledgeBase(_) => ModuleKind::KnowledgeBase,
            Self::Memory(_) => ModuleKind::Memory,
        }
    }

    /// Shared deployment fields.
    #[must_use]
    pub const fn base(&self) -> &Deployment {
        match self {
            Self::Agent(d) => &d.base,
            Self::Orchestrator(d) => &d.base,
            Self::Tool(d) | Self::Environment(d) | Self::KnowledgeBase(d) | Self::Memory(d) => d,
        }
    }

    /// Node the top-level module runs on.
    #[must_use]
    pub const fn node(&self) -> &NodeAddress {
        &self.base().node
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(port: u16) -> NodeAddress {
        NodeAddress::from_url(&format!("http://localhost:{port}")).unwrap()
    }

    #[test]
    fn nested_deployment_only_carries_its_node() {
        let nested = Deployment::at(node(7002));
        let json = serde_json::to_value(&nested).unwrap();
        let keys: Vec<_> = json.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["node".to_string()]);
    }

    #[test]
    fn agent_deployment_flattens_base_fields() {
        let mut agent = AgentDeployment::new(Deployment::named("hello", node(7001)));
        agent.tool_deployments.push(Deployment::at(node(7003)));

        let json = serde_json::to_value(ModuleDeployment::Agent(agent)).unwrap();
        assert_eq!(json["name"], "hello");
        assert_eq!(json["module"]["name"], "hello");
        assert_eq!(json["node"]["url"], "http://localhost:7001");
        assert_eq!(json["tool_deployments"][0]["node"]["url"], "http://localhost:7003");
        assert_eq!(json["kb_deployments"], serde_json::json!([]));
    }

    #[test]
    fn persona_sets_config() {
        let deployment = Deployment::named("a", node(7001)).with_persona("interviewer");
        assert_eq!(
            deployment.config.unwrap()["persona_module"]["name"],
            "interviewer"
        );
    }

    #[test]
    fn kind_and_node_follow_variant() {
        let deployment = ModuleDeployment::Memory(Deployment::named("m", node(7005)));
        assert_eq!(deployment.kind(), ModuleKind::Memory);
        assert_eq!(deployment.node(), &node(7005));
    }
}
