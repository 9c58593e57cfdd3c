//! Hub client: session handling and registry record operations.
//!
//! The registry is reached through a [`Registry`] implementation and the
//! signed-in state lives in an explicit [`HubSession`]. Sign-in is the only
//! call that writes the session; everything else reads it.

mod registry;
mod session;
mod token;

use hub_proto::{AuctionRecord, ModuleKind, ModuleRecord, NodeRecord, ServerRecord, UserRecord};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{info, warn};

use crate::error::{ClientError, Result};

#[cfg(test)]
pub(crate) use registry::fake::FakeRegistry;
pub use registry::{DATABASE, INVITE_CODE, NAMESPACE, Registry, SurrealRegistry, USER_SCOPE};
pub use session::HubSession;
pub use token::decode_user_id;

/// Username and password for a hub account.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Login name.
    pub username: String,
    /// Password.
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Source of credentials for interactive sign-up.
pub trait CredentialPrompt {
    /// Ask for a username and password. `None` aborts sign-up.
    fn ask(&mut self) -> Option<Credentials>;

    /// Report a failed attempt before asking again.
    fn rejected(&mut self, reason: &str);
}

/// Client for the hub registry.
#[derive(Debug, Clone)]
pub struct HubClient<R> {
    registry: R,
}

impl HubClient<SurrealRegistry> {
    /// Client for the SurrealDB registry at `hub_url`.
    pub fn connect(hub_url: &str) -> Result<Self> {
        let registry = SurrealRegistry::new(hub_url)?;
        info!(hub = registry.base_url(), "Using hub registry");
        Ok(Self::new(registry))
    }
}

impl<R: Registry> HubClient<R> {
    /// Client over an existing registry.
    pub const fn new(registry: R) -> Self {
        Self { registry }
    }

    /// Underlying registry.
    pub const fn registry(&self) -> &R {
        &self.registry
    }

    /// Sign in and fill `session` with the token and decoded user id.
    ///
    /// On any failure `session` is left untouched and an authentication error
    /// is returned.
    pub async fn signin(
        &self,
        session: &mut HubSession,
        username: &str,
        password: &str,
    ) -> Result<String> {
        let token = self
            .registry
            .signin(username, password)
            .await
            .map_err(|e| match e {
                ClientError::Authentication(_) => e,
                other => ClientError::Authentication(other.to_string()),
            })?;
        let user_id = decode_user_id(&token)?;

        session.establish(token, user_id.clone());
        info!(%user_id, "Signed in to hub");
        Ok(user_id)
    }

    /// Create an account interactively, then sign in with it.
    ///
    /// Keeps asking `prompt` until sign-up succeeds; the prompt returning
    /// `None` aborts with an authentication error.
    pub async fn signup(
        &self,
        session: &mut HubSession,
        prompt: &mut impl CredentialPrompt,
    ) -> Result<Credentials> {
        loop {
            let Some(credentials) = prompt.ask() else {
                return Err(ClientError::Authentication("sign-up cancelled".into()));
            };
            if credentials.username.trim().is_empty() || credentials.password.is_empty() {
                prompt.rejected("username and password must not be empty");
                continue;
            }

            match self
                .registry
                .signup(&credentials.username, &credentials.password, INVITE_CODE)
                .await
            {
                Ok(_) => {
                    self.signin(session, &credentials.username, &credentials.password)
                        .await?;
                    return Ok(credentials);
                }
                Err(e) => {
                    warn!(error = %e, "Sign-up failed");
                    prompt.rejected(&e.to_string());
                }
            }
        }
    }

    /// Fetch a user record.
    pub async fn get_user(&self, session: &HubSession, user_id: &str) -> Result<UserRecord> {
        self.get_record(session, "user", user_id).await
    }

    /// Credit balance of the signed-in user.
    pub async fn get_credits(&self, session: &HubSession) -> Result<Value> {
        let (_, user_id) = session.credentials()?;
        Ok(self.get_user(session, user_id).await?.credits)
    }

    /// Fetch a node record.
    pub async fn get_node(&self, session: &HubSession, node_id: &str) -> Result<NodeRecord> {
        self.get_record(session, "node", node_id).await
    }

    /// All registered nodes.
    pub async fn list_nodes(&self, session: &HubSession) -> Result<Vec<NodeRecord>> {
        self.list_records(session, "node", &[]).await
    }

    /// All registered node servers.
    pub async fn list_servers(&self, session: &HubSession) -> Result<Vec<ServerRecord>> {
        self.list_records(session, "server", &[]).await
    }

    /// All modules of one kind.
    pub async fn list_modules(
        &self,
        session: &HubSession,
        kind: ModuleKind,
    ) -> Result<Vec<ModuleRecord>> {
        self.list_records(session, kind.as_str(), &[]).await
    }

    /// One module by name (`name` or `kind:name`).
    pub async fn get_module(
        &self,
        session: &HubSession,
        kind: ModuleKind,
        name: &str,
    ) -> Result<ModuleRecord> {
        let id = ModuleRecord::record_id(kind, name);
        self.get_record(session, "module", &id).await
    }

    /// Register a module. The record id defaults to `kind:name`.
    pub async fn create_module(
        &self,
        session: &HubSession,
        kind: ModuleKind,
        record: &ModuleRecord,
    ) -> Result<ModuleRecord> {
        let (token, _) = session.credentials()?;
        let id = record
            .id
            .clone()
            .unwrap_or_else(|| ModuleRecord::record_id(kind, &record.name));

        let mut content = serde_json::to_value(record)
            .map_err(|e| ClientError::Config(format!("cannot encode module record: {e}")))?;
        if let Value::Object(map) = &mut content {
            map.remove("id");
        }

        let created = self.registry.create(token, &id, &content).await?;
        info!(%id, "Created module");
        self.decode_record("create", created)
    }

    /// Delete a module (`name` or `kind:name`). Returns whether it existed.
    pub async fn delete_module(
        &self,
        session: &HubSession,
        kind: ModuleKind,
        name: &str,
    ) -> Result<bool> {
        let (token, _) = session.credentials()?;
        let id = ModuleRecord::record_id(kind, name);
        let deleted = self.registry.delete(token, &id).await?;
        if deleted {
            info!(%id, "Deleted module");
        } else {
            warn!(%id, "Module to delete does not exist");
        }
        Ok(deleted)
    }

    /// Open tasks (lots).
    pub async fn list_tasks(&self, session: &HubSession) -> Result<Vec<Value>> {
        self.list_records(session, "lot", &[]).await
    }

    /// Open requests for proposals.
    pub async fn list_rfps(&self, session: &HubSession) -> Result<Vec<AuctionRecord>> {
        self.list_records(session, "auction", &[]).await
    }

    /// Requests for proposals targeting one node.
    pub async fn list_rfps_from_consumer(
        &self,
        session: &HubSession,
        node_id: &str,
    ) -> Result<Vec<AuctionRecord>> {
        self.list_records(session, "auction", &[("node", node_id)])
            .await
    }

    /// Bid on an auction as the signed-in user.
    pub async fn submit_proposal(&self, session: &HubSession, auction_id: &str) -> Result<Value> {
        let (token, user_id) = session.credentials()?;
        self.registry
            .relate(
                token,
                user_id,
                "requests_to_bid_on",
                auction_id,
                &json!({ "amount": 1.0 }),
            )
            .await
    }

    /// Proposals the signed-in user has won, optionally for one plan only.
    pub async fn list_accepted_proposals(
        &self,
        session: &HubSession,
        plan_id: Option<&str>,
    ) -> Result<Vec<Value>> {
        let (_, user_id) = session.credentials()?;
        match plan_id {
            Some(plan) => {
                self.list_records(session, "wins", &[("in", user_id), ("out", plan)])
                    .await
            }
            None => self.list_records(session, "wins", &[("in", user_id)]).await,
        }
    }

    async fn get_record<T: DeserializeOwned>(
        &self,
        session: &HubSession,
        what: &'static str,
        id: &str,
    ) -> Result<T> {
        let (token, _) = session.credentials()?;
        let record = self
            .registry
            .select(token, id)
            .await?
            .ok_or_else(|| ClientError::NotFound {
                what,
                id: id.to_string(),
            })?;
        self.decode_record("select", record)
    }

    async fn list_records<T: DeserializeOwned>(
        &self,
        session: &HubSession,
        table: &str,
        filter: &[(&str, &str)],
    ) -> Result<Vec<T>> {
        let (token, _) = session.credentials()?;
        self.registry
            .list(token, table, filter)
            .await?
            .into_iter()
            .map(|record| self.decode_record("list", record))
            .collect()
    }

    fn decode_record<T: DeserializeOwned>(&self, operation: &str, record: Value) -> Result<T> {
        serde_json::from_value(record).map_err(|e| {
            ClientError::transport(operation, "hub", format!("malformed record: {e}"))
        })
    }
}
