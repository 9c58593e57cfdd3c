//! Deployment construction, one builder per module kind.

use hub_proto::{
    AgentDeployment, Deployment, ModuleDeployment, ModuleIdentifier, ModuleKind, ModuleRef,
    NodeAddress, OrchestratorDeployment,
};
use tracing::warn;

use crate::error::{ClientError, Result};

/// Node addresses for the nested deployments of a run, in caller order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubNodes {
    /// Nodes running the agents an orchestrator coordinates.
    pub agents: Vec<NodeAddress>,
    /// Nodes running tools an agent may call.
    pub tools: Vec<NodeAddress>,
    /// Nodes running environments.
    pub environments: Vec<NodeAddress>,
    /// Nodes running knowledge bases.
    pub kbs: Vec<NodeAddress>,
    /// Nodes running memory modules.
    pub memories: Vec<NodeAddress>,
}

impl SubNodes {
    /// Whether no sub-node was given.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
            && self.tools.is_empty()
            && self.environments.is_empty()
            && self.kbs.is_empty()
            && self.memories.is_empty()
    }
}

/// Parse a comma-separated list of node URLs. Entries are trimmed and blank
/// entries skipped; order is preserved.
pub fn parse_node_list(raw: &str) -> Result<Vec<NodeAddress>> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| NodeAddress::from_url(entry).map_err(ClientError::from))
        .collect()
}

/// Build the deployment for running `identifier` on `node`.
pub fn run_deployment(
    identifier: &ModuleIdentifier,
    node: NodeAddress,
    sub_nodes: &SubNodes,
    personas: &[String],
) -> Result<ModuleDeployment> {
    let kind = identifier.kind()?;
    let base = Deployment::of(ModuleRef::from_identifier(identifier, kind), node);

    match kind {
        ModuleKind::Agent => Ok(agent_deployment(base, sub_nodes, personas)),
        ModuleKind::Orchestrator => Ok(orchestrator_deployment(base, sub_nodes)),
        ModuleKind::Tool => Ok(ModuleDeployment::Tool(leaf(base, kind, sub_nodes))),
        ModuleKind::Environment => Ok(ModuleDeployment::Environment(leaf(base, kind, sub_nodes))),
        ModuleKind::KnowledgeBase => Ok(ModuleDeployment::KnowledgeBase(leaf(base, kind, sub_nodes))),
        ModuleKind::Memory => Ok(ModuleDeployment::Memory(leaf(base, kind, sub_nodes))),
        ModuleKind::Persona => Err(persona_unsupported()),
    }
}

/// Resolve the kind of a module that can be deployed on its own.
///
/// Personas only ride along on agent deployments.
pub fn deployable_kind(identifier: &ModuleIdentifier) -> Result<ModuleKind> {
    match identifier.kind()? {
        ModuleKind::Persona => Err(persona_unsupported()),
        kind => Ok(kind),
    }
}

/// Build the deployment for installing `identifier` on `node`.
///
/// Orchestrators get one named sub-deployment per `(module, node)` pair.
pub fn create_deployment(
    identifier: &ModuleIdentifier,
    node: NodeAddress,
    agents: &[(String, NodeAddress)],
    environments: &[(String, NodeAddress)],
) -> Result<ModuleDeployment> {
    let kind = identifier.kind()?;
    let base = Deployment::named(identifier.name(), node);

    match kind {
        ModuleKind::Agent => Ok(ModuleDeployment::Agent(AgentDeployment::new(base))),
        ModuleKind::Orchestrator => {
            let mut deployment = OrchestratorDeployment::new(base);
            deployment.agent_deployments = named_deployments(agents);
            deployment.environment_deployments = named_deployments(environments);
            Ok(ModuleDeployment::Orchestrator(deployment))
        }
        ModuleKind::Tool => Ok(ModuleDeployment::Tool(base)),
        ModuleKind::Environment => Ok(ModuleDeployment::Environment(base)),
        ModuleKind::KnowledgeBase => Ok(ModuleDeployment::KnowledgeBase(base)),
        ModuleKind::Memory => Ok(ModuleDeployment::Memory(base)),
        ModuleKind::Persona => Err(persona_unsupported()),
    }
}

fn agent_deployment(base: Deployment, sub_nodes: &SubNodes, personas: &[String]) -> ModuleDeployment {
    if !sub_nodes.agents.is_empty() {
        warn!("Agent sub-nodes are ignored when running an agent");
    }
    let base = match personas.first() {
        Some(persona) => base.with_persona(persona),
        None => base,
    };

    let mut deployment = AgentDeployment::new(base);
    deployment.tool_deployments = nested(&sub_nodes.tools);
    deployment.kb_deployments = nested(&sub_nodes.kbs);
    deployment.memory_deployments = nested(&sub_nodes.memories);
    deployment.environment_deployments = nested(&sub_nodes.environments);
    ModuleDeployment::Agent(deployment)
}

fn orchestrator_deployment(base: Deployment, sub_nodes: &SubNodes) -> ModuleDeployment {
    if !sub_nodes.tools.is_empty() {
        warn!("Tool sub-nodes are ignored when running an orchestrator");
    }

    let mut deployment = OrchestratorDeployment::new(base);
    deployment.agent_deployments = nested(&sub_nodes.agents);
    deployment.environment_deployments = nested(&sub_nodes.environments);
    deployment.kb_deployments = nested(&sub_nodes.kbs);
    deployment.memory_deployments = nested(&sub_nodes.memories);
    ModuleDeployment::Orchestrator(deployment)
}

fn leaf(base: Deployment, kind: ModuleKind, sub_nodes: &SubNodes) -> Deployment {
    if !sub_nodes.is_empty() {
        warn!(%kind, "Sub-nodes are ignored for this module type");
    }
    base
}

/// Nested deployments carry only their own node.
fn nested(nodes: &[NodeAddress]) -> Vec<Deployment> {
    nodes.iter().cloned().map(Deployment::at).collect()
}

fn named_deployments(pairs: &[(String, NodeAddress)]) -> Vec<Deployment> {
    pairs
        .iter()
        .map(|(name, node)| Deployment::named(name.clone(), node.clone()))
        .collect()
}

fn persona_unsupported() -> ClientError {
    ClientError::Unsupported(
        "persona modules cannot be deployed; attach one to an agent with --persona".into(),
    )
}
