//! Node client.
//!
//! [`NodeClient`] is the single facade callers use to talk to a node. The
//! transport behind it is chosen once, from the [`NodeAddress`], and every
//! call is delegated to it unchanged:
//!
//! - [`HttpTransport`]: direct request/response against the node's HTTP server
//! - [`RelayTransport`]: JSON frames routed through a WebSocket relay
//!
//! Both transports implement [`NodeTransport`] with the same request and
//! response types, so callers see identical semantics either way.

mod http;
mod relay;

#[cfg(test)]
pub(crate) mod fake;

use std::time::Duration;

use futures::future::BoxFuture;
use hub_proto::{
    ChatCompletionRequest, ModuleDeployment, ModuleKind, NodeAddress, NodeUser, Run, RunInput,
    StorageRequest, StorageResult, UserInput,
};
use serde_json::Value;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::error::{ClientError, Result};

pub use http::HttpTransport;
pub use relay::RelayTransport;

/// Default per-request timeout for node calls.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// The operations a node exposes, implemented once per wire form.
///
/// `token` is the session access token held by the [`NodeClient`], if any.
pub trait NodeTransport: Send + Sync {
    /// Address this transport talks to.
    fn address(&self) -> &NodeAddress;

    /// Look up a consumer by public key.
    fn check_user<'a>(
        &'a self,
        input: &'a UserInput,
        token: Option<&'a str>,
    ) -> BoxFuture<'a, Result<NodeUser>>;

    /// Register a consumer.
    fn register_user<'a>(
        &'a self,
        input: &'a UserInput,
        token: Option<&'a str>,
    ) -> BoxFuture<'a, Result<NodeUser>>;

    /// Submit a run for execution.
    fn run<'a>(&'a self, input: &'a RunInput, token: Option<&'a str>)
    -> BoxFuture<'a, Result<Run>>;

    /// Fetch the current state of a run.
    fn check_run<'a>(
        &'a self,
        kind: ModuleKind,
        run: &'a Run,
        token: Option<&'a str>,
    ) -> BoxFuture<'a, Result<Run>>;

    /// Record a run without executing it.
    fn create_run<'a>(
        &'a self,
        input: &'a RunInput,
        token: Option<&'a str>,
    ) -> BoxFuture<'a, Result<Run>>;

    /// Overwrite a run record.
    fn update_run<'a>(
        &'a self,
        kind: ModuleKind,
        run: &'a Run,
        token: Option<&'a str>,
    ) -> BoxFuture<'a, Result<Run>>;

    /// Install a module deployment on the node.
    fn create_module<'a>(
        &'a self,
        deployment: &'a ModuleDeployment,
        token: Option<&'a str>,
    ) -> BoxFuture<'a, Result<Value>>;

    /// Execute a storage request.
    fn storage<'a>(
        &'a self,
        request: &'a StorageRequest,
        token: Option<&'a str>,
    ) -> BoxFuture<'a, Result<StorageResult>>;

    /// Run a chat completion on the node's inference provider.
    fn inference<'a>(
        &'a self,
        request: &'a ChatCompletionRequest,
        token: Option<&'a str>,
    ) -> BoxFuture<'a, Result<Value>>;
}

/// Route names shared by both transports.
pub(crate) mod route {
    use hub_proto::{ModuleKind, StorageRequest};

    pub const CHECK_USER: &str = "user/check";
    pub const REGISTER_USER: &str = "user/register";
    pub const INFERENCE: &str = "inference/chat";

    pub fn run(kind: ModuleKind) -> String {
        format!("{kind}/run")
    }

    pub fn check_run(kind: ModuleKind) -> String {
        format!("{kind}/check")
    }

    pub fn create_run(kind: ModuleKind) -> String {
        format!("monitor/create_{kind}_run")
    }

    pub fn update_run(kind: ModuleKind) -> String {
        format!("monitor/update_{kind}_run")
    }

    pub fn create_module(kind: ModuleKind) -> String {
        format!("{kind}/create")
    }

    pub fn storage(request: &StorageRequest) -> String {
        format!(
            "storage/{}/{}/{}",
            request.storage_type(),
            request.operation(),
            request.path().trim_start_matches('/')
        )
    }
}

/// How run-and-poll waits for a run to finish.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Delay between status checks.
    pub interval: Duration,
    /// Give up after this long. `None` waits until a terminal state.
    pub timeout: Option<Duration>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            timeout: None,
        }
    }
}

/// Facade over one node, reached through the transport its address selects.
pub struct NodeClient {
    transport: Box<dyn NodeTransport>,
    access_token: Option<String>,
}

impl std::fmt::Debug for NodeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeClient")
            .field("address", self.transport.address())
            .field("has_token", &self.access_token.is_some())
            .finish()
    }
}

impl NodeClient {
    /// Build a client from raw address fields.
    ///
    /// Fails with a configuration error unless exactly one of a direct URL or
    /// an indirect pair is given.
    pub fn from_parts(
        node_url: Option<&str>,
        indirect_node_id: Option<&str>,
        routing_url: Option<&str>,
    ) -> Result<Self> {
        let address = NodeAddress::resolve(node_url, indirect_node_id, routing_url)?;
        if address.is_direct() && routing_url.is_some_and(|r| !r.trim().is_empty()) {
            tracing::warn!("ROUTING_URL is ignored when a direct node URL is set");
        }
        Self::connect(address)
    }

    /// Build a client for `address`, selecting its transport.
    pub fn connect(address: NodeAddress) -> Result<Self> {
        let transport: Box<dyn NodeTransport> = match &address {
            NodeAddress::Http { .. } => Box::new(HttpTransport::new(address.clone())?),
            NodeAddress::Relay { .. } => Box::new(RelayTransport::new(address.clone())?),
        };
        info!(
            transport = address.transport_name(),
            node = %address,
            "Using node transport"
        );
        Ok(Self::with_transport(transport))
    }

    /// Build a client over an existing transport.
    #[must_use]
    pub fn with_transport(transport: Box<dyn NodeTransport>) -> Self {
        Self {
            transport,
            access_token: None,
        }
    }

    /// Address of the node.
    #[must_use]
    pub fn address(&self) -> &NodeAddress {
        self.transport.address()
    }

    /// Hold an access token and attach it to subsequent calls.
    pub fn set_access_token(&mut self, token: impl Into<String>) {
        self.access_token = Some(token.into());
    }

    /// Drop the held access token.
    pub fn clear_access_token(&mut self) {
        self.access_token = None;
    }

    /// Currently held access token.
    #[must_use]
    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }

    /// Look up a consumer by public key.
    pub async fn check_user(&self, input: &UserInput) -> Result<NodeUser> {
        debug!(public_key = %input.public_key, "Checking user");
        self.transport.check_user(input, self.access_token()).await
    }

    /// Register a consumer.
    pub async fn register_user(&self, input: &UserInput) -> Result<NodeUser> {
        debug!(public_key = %input.public_key, "Registering user");
        self.transport.register_user(input, self.access_token()).await
    }

    /// Submit a run for execution. The module kind is taken from the deployment.
    pub async fn run(&self, input: &RunInput) -> Result<Run> {
        self.transport.run(input, self.access_token()).await
    }

    /// Fetch the current state of a run.
    pub async fn check_run(&self, kind: ModuleKind, run: &Run) -> Result<Run> {
        self.transport.check_run(kind, run, self.access_token()).await
    }

    /// Record a run on the node without executing it.
    pub async fn create_run(&self, input: &RunInput) -> Result<Run> {
        self.transport.create_run(input, self.access_token()).await
    }

    /// Overwrite a run record on the node.
    pub async fn update_run(&self, kind: ModuleKind, run: &Run) -> Result<Run> {
        self.transport.update_run(kind, run, self.access_token()).await
    }

    /// Install a module deployment on the node.
    pub async fn create_module(&self, deployment: &ModuleDeployment) -> Result<Value> {
        self.transport
            .create_module(deployment, self.access_token())
            .await
    }

    /// Execute a storage request.
    pub async fn storage(&self, request: &StorageRequest) -> Result<StorageResult> {
        self.transport.storage(request, self.access_token()).await
    }

    /// Run a chat completion.
    pub async fn inference(&self, request: &ChatCompletionRequest) -> Result<Value> {
        self.transport.inference(request, self.access_token()).await
    }

    /// Submit a run and poll until it completes or fails.
    pub async fn run_and_poll(&self, input: &RunInput, policy: PollPolicy) -> Result<Run> {
        let run = self.run(input).await?;
        info!(
            run_id = run.id_or_unknown(),
            kind = %input.kind(),
            status = %run.status,
            "Run submitted"
        );
        self.poll(input.kind(), run, policy).await
    }

    /// Poll `run` until it reaches a terminal state.
    ///
    /// A run that is already terminal is returned as is, without contacting
    /// the node. A transport error while polling ends the poll with that error.
    pub async fn poll(&self, kind: ModuleKind, mut run: Run, policy: PollPolicy) -> Result<Run> {
        let started = Instant::now();
        let mut last_status = run.status;

        while !run.is_terminal() {
            if let Some(limit) = policy.timeout {
                if started.elapsed() >= limit {
                    return Err(ClientError::RunTimeout {
                        run_id: run.id_or_unknown().to_string(),
                        elapsed: started.elapsed(),
                    });
                }
            }

            tokio::time::sleep(policy.interval).await;
            run = self.check_run(kind, &run).await?;

            if run.status != last_status {
                info!(run_id = run.id_or_unknown(), status = %run.status, "Run status changed");
                last_status = run.status;
            } else {
                debug!(run_id = run.id_or_unknown(), status = %run.status, "Run still in progress");
            }
        }

        Ok(run)
    }
}

/// Decode a JSON response body into `T`, naming the operation on failure.
pub(crate) fn decode<T: serde::de::DeserializeOwned>(
    operation: &str,
    target: &NodeAddress,
    body: Value,
) -> Result<T> {
    serde_json::from_value(body).map_err(|e| {
        ClientError::transport(operation, target.to_string(), format!("malformed response: {e}"))
    })
}
