//! Settings resolution.
//!
//! Values come from command-line flags or the process environment (handled by
//! clap), falling back to a `.env` file in the working directory. The `.env`
//! file is only read here, never loaded into the environment.

use std::collections::HashMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use hub_client::{ClientError, ConsumerKey, HubClient, HubSession, NodeClient, SurrealRegistry};
use tracing::{debug, info};

use crate::cli::GlobalArgs;
use crate::error::CliError;

/// Name of the fallback settings file.
pub const DOTENV_FILE: &str = ".env";

/// Key/value pairs from a `.env` file.
#[derive(Debug, Clone, Default)]
pub struct DotEnv {
    path: PathBuf,
    vars: HashMap<String, String>,
}

impl DotEnv {
    /// Read `path`. A missing file yields an empty set.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, CliError> {
        let path = path.into();
        if !path.exists() {
            return Ok(Self {
                path,
                vars: HashMap::new(),
            });
        }

        let display = path.display().to_string();
        let iter = dotenvy::from_path_iter(&path).map_err(|e| CliError::parse(&display, e))?;
        let vars = iter
            .collect::<Result<HashMap<_, _>, _>>()
            .map_err(|e| CliError::parse(&display, e))?;
        debug!(path = %path.display(), count = vars.len(), "Loaded settings file");
        Ok(Self { path, vars })
    }

    /// Value for `key`, if the file sets one.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    /// Append `pairs` to the file, creating it when missing.
    pub fn append(&mut self, pairs: &[(&str, &str)]) -> Result<(), CliError> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        for (key, value) in pairs {
            writeln!(file, "{key}={}", quote(value))?;
            self.vars.insert((*key).to_string(), (*value).to_string());
        }
        info!(path = %self.path.display(), "Saved settings");
        Ok(())
    }

    /// Location of the file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn quote(value: &str) -> String {
    if value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || "-_.:/@".contains(c))
    {
        value.to_string()
    } else {
        let escaped = value
            .replace('\\', "\\\\")
            .replace('"', "\\\"")
            .replace('$', "\\$");
        format!("\"{escaped}\"")
    }
}

/// Resolved addresses and credentials.
#[derive(Clone, Default)]
pub struct Settings {
    /// Hub registry URL.
    pub hub_url: Option<String>,
    /// Hub username.
    pub hub_username: Option<String>,
    /// Hub password.
    pub hub_password: Option<String>,
    /// Hex signing key.
    pub private_key: Option<String>,
    /// Direct node URL.
    pub node_url: Option<String>,
    /// Relay URL.
    pub routing_url: Option<String>,
    /// Node id behind the relay.
    pub indirect_node_id: Option<String>,
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("hub_url", &self.hub_url)
            .field("hub_username", &self.hub_username)
            .field("hub_password", &self.hub_password.as_ref().map(|_| "<redacted>"))
            .field("private_key", &self.private_key.as_ref().map(|_| "<redacted>"))
            .field("node_url", &self.node_url)
            .field("routing_url", &self.routing_url)
            .field("indirect_node_id", &self.indirect_node_id)
            .finish()
    }
}

impl Settings {
    /// Merge flags and environment with the `.env` fallback.
    pub fn resolve(args: &GlobalArgs, dotenv: &DotEnv) -> Self {
        let pick = |value: &Option<String>, key: &str| {
            value
                .clone()
                .filter(|v| !v.trim().is_empty())
                .or_else(|| dotenv.get(key).map(str::to_string))
                .filter(|v| !v.trim().is_empty())
        };

        Self {
            hub_url: pick(&args.hub_url, "HUB_URL"),
            hub_username: pick(&args.hub_username, "HUB_USERNAME"),
            hub_password: pick(&args.hub_password, "HUB_PASSWORD"),
            private_key: pick(&args.private_key, "PRIVATE_KEY"),
            node_url: pick(&args.node_url, "NODE_URL"),
            routing_url: pick(&args.routing_url, "ROUTING_URL"),
            indirect_node_id: pick(&args.indirect_node_id, "INDIRECT_NODE_ID"),
        }
    }

    /// Client for the configured hub.
    pub fn hub_client(&self) -> Result<HubClient<SurrealRegistry>, CliError> {
        let url = self
            .hub_url
            .as_deref()
            .ok_or_else(|| ClientError::Config("HUB_URL is not set".into()))?;
        Ok(HubClient::connect(url)?)
    }

    /// Username and password, if both are configured.
    pub fn hub_credentials(&self) -> Option<(&str, &str)> {
        Some((self.hub_username.as_deref()?, self.hub_password.as_deref()?))
    }

    /// Sign in to the hub with the configured credentials.
    pub async fn signed_in_hub(
        &self,
    ) -> Result<(HubClient<SurrealRegistry>, HubSession), CliError> {
        let (username, password) = self.hub_credentials().ok_or_else(|| {
            ClientError::Authentication("HUB_USERNAME and HUB_PASSWORD are not set".into())
        })?;
        let hub = self.hub_client()?;
        let mut session = HubSession::default();
        hub.signin(&mut session, username, password).await?;
        Ok((hub, session))
    }

    /// The consumer's signing key.
    pub fn consumer_key(&self) -> Result<ConsumerKey, CliError> {
        let hex = self
            .private_key
            .as_deref()
            .ok_or_else(|| ClientError::Config("PRIVATE_KEY is not set".into()))?;
        Ok(ConsumerKey::from_hex(hex)?)
    }

    /// Client for the configured node.
    ///
    /// When hub credentials are configured the session token is attached as
    /// the node access token.
    pub async fn node_client(&self) -> Result<NodeClient, CliError> {
        let mut node = NodeClient::from_parts(
            self.node_url.as_deref(),
            self.indirect_node_id.as_deref(),
            self.routing_url.as_deref(),
        )?;

        if self.hub_url.is_some() && self.hub_credentials().is_some() {
            let (_, session) = self.signed_in_hub().await?;
            if let Some(token) = session.token() {
                node.set_access_token(token);
            }
        } else {
            debug!("No hub credentials, calling the node without an access token");
        }
        Ok(node)
    }
}
