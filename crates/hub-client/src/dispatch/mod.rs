//! Run dispatcher.
//!
//! Turns a module identifier and caller inputs into a signed run on a node:
//!
//! ```text
//! ModuleResolved -> UserVerified -> DeploymentBuilt -> Submitted -> Polling -> Completed | Failed
//! ```
//!
//! Each stage must finish before the next starts. Any error aborts the
//! dispatch; nothing is retried.

mod deployment;

use std::fmt;

use hub_proto::{ModuleDeployment, ModuleIdentifier, NodeAddress, Run, RunInput, RunStatus, UserInput};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::{ClientError, Result};
use crate::node::{NodeClient, PollPolicy};
use crate::signing::ConsumerKey;

pub use deployment::{SubNodes, create_deployment, deployable_kind, parse_node_list, run_deployment};

/// Stage of a dispatch, logged as it is entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchStage {
    /// The module type was read from the identifier.
    ModuleResolved,
    /// The consumer is known to the node.
    UserVerified,
    /// The deployment graph was built.
    DeploymentBuilt,
    /// The run was accepted by the node.
    Submitted,
    /// Waiting for a terminal status.
    Polling,
    /// The run finished successfully.
    Completed,
    /// The run finished with an error.
    Failed,
}

impl fmt::Display for DispatchStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ModuleResolved => "module-type resolved",
            Self::UserVerified => "user verified",
            Self::DeploymentBuilt => "deployment constructed",
            Self::Submitted => "run submitted",
            Self::Polling => "polling",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// A request to run a module.
#[derive(Debug, Clone, Default)]
pub struct RunRequest {
    /// `name` or `<type>:<name>`; a bare name runs an agent.
    pub module: String,
    /// Input parameters.
    pub inputs: Option<Value>,
    /// Nodes for nested deployments.
    pub sub_nodes: SubNodes,
    /// Persona modules; the first one is attached to agent runs.
    pub personas: Vec<String>,
}

/// A request to install a module on a node.
#[derive(Debug, Clone, Default)]
pub struct CreateRequest {
    /// `name` or `<type>:<name>`.
    pub module: String,
    /// Agent modules and the nodes they run on, for orchestrators.
    pub agents: Vec<(String, NodeAddress)>,
    /// Environment modules and the nodes they run on, for orchestrators.
    pub environments: Vec<(String, NodeAddress)>,
}

/// Drives runs and module installs against one node.
#[derive(Debug)]
pub struct Dispatcher<'a> {
    node: &'a NodeClient,
    key: &'a ConsumerKey,
    policy: PollPolicy,
}

impl<'a> Dispatcher<'a> {
    /// Dispatcher for `node`, signing with `key`.
    #[must_use]
    pub fn new(node: &'a NodeClient, key: &'a ConsumerKey) -> Self {
        Self {
            node,
            key,
            policy: PollPolicy::default(),
        }
    }

    /// Use a custom poll policy.
    #[must_use]
    pub const fn with_policy(mut self, policy: PollPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Make sure the consumer is registered with the node and return its id.
    ///
    /// Registers the consumer when the node does not know it yet.
    pub async fn verify_user(&self) -> Result<String> {
        let input = UserInput {
            public_key: self.key.public_key_hex(),
        };

        let user = self.node.check_user(&input).await?;
        let user = if user.is_registered {
            debug!(user = ?user.id, "Found user");
            user
        } else {
            info!("No user found on node, registering");
            self.node.register_user(&input).await?
        };

        user.consumer_id().map(str::to_string).ok_or_else(|| {
            ClientError::transport(
                "register-user",
                self.node.address().to_string(),
                "node returned no consumer id",
            )
        })
    }

    /// Run a module and wait for it to finish.
    pub async fn run(&self, request: &RunRequest) -> Result<Run> {
        let identifier = ModuleIdentifier::parse(&request.module);
        let kind = deployable_kind(&identifier)?;
        stage(DispatchStage::ModuleResolved, &identifier);

        let consumer_id = self.verify_user().await?;
        stage(DispatchStage::UserVerified, &identifier);

        let deployment = run_deployment(
            &identifier,
            self.node.address().clone(),
            &request.sub_nodes,
            &request.personas,
        )?;
        stage(DispatchStage::DeploymentBuilt, &identifier);

        let input = self.sign(consumer_id, request.inputs.clone(), deployment);
        let run = self.node.run(&input).await?;
        stage(DispatchStage::Submitted, &identifier);

        if !run.is_terminal() {
            stage(DispatchStage::Polling, &identifier);
        }
        let run = self.node.poll(kind, run, self.policy).await?;

        match run.status {
            RunStatus::Failed => {
                stage(DispatchStage::Failed, &identifier);
                warn!(
                    run_id = run.id_or_unknown(),
                    error = run.error_message.as_deref().unwrap_or("unknown error"),
                    "Run failed"
                );
            }
            _ => stage(DispatchStage::Completed, &identifier),
        }
        Ok(run)
    }

    /// Install a module on the node.
    pub async fn create(&self, request: &CreateRequest) -> Result<Value> {
        let identifier = ModuleIdentifier::parse(&request.module);
        deployable_kind(&identifier)?;
        stage(DispatchStage::ModuleResolved, &identifier);

        self.verify_user().await?;
        stage(DispatchStage::UserVerified, &identifier);

        let deployment = create_deployment(
            &identifier,
            self.node.address().clone(),
            &request.agents,
            &request.environments,
        )?;
        stage(DispatchStage::DeploymentBuilt, &identifier);

        let result = self.node.create_module(&deployment).await?;
        info!(module = %identifier, "Module created on node");
        Ok(result)
    }

    fn sign(&self, consumer_id: String, inputs: Option<Value>, deployment: ModuleDeployment) -> RunInput {
        let signature = self.key.sign_consumer_id(&consumer_id);
        RunInput::new(consumer_id, inputs, deployment, signature)
    }
}

fn stage(stage: DispatchStage, module: &ModuleIdentifier) {
    info!(%module, %stage, "Dispatch stage");
}
