//! Registry records other than modules: nodes, servers, users and auctions.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A compute node registered with the hub.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeRecord {
    /// Record id.
    pub id: String,
    /// Public IP or hostname.
    pub ip: String,
    /// Owning user.
    pub owner: String,
    /// Operating system.
    pub os: String,
    /// CPU architecture.
    pub arch: String,
    /// Number of servers the node runs.
    pub num_servers: u32,
    /// Server flavour (`http`, `ws`, ...).
    pub server_type: String,
    /// HTTP port, when the node serves HTTP.
    pub http_port: Option<u16>,
    /// Models available on the node.
    pub models: Vec<String>,
    /// Number of GPUs.
    pub num_gpus: u32,
    /// Inference provider types.
    pub provider_types: Vec<String>,
}

/// A server process attached to a node.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerRecord {
    /// Record id.
    pub id: String,
    /// Server name.
    pub name: String,
    /// How to connect to the server.
    pub connection_string: String,
    /// Node the server belongs to.
    pub node_id: String,
}

/// A hub user account.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UserRecord {
    /// Record id, `user:<...>`.
    pub id: String,
    /// Login name.
    pub username: String,
    /// Display name.
    pub name: String,
    /// Credit balance.
    pub credits: Value,
}

/// An auction (request for proposals) or a proposal against one.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuctionRecord {
    /// Record id.
    pub id: String,
    /// Node the auction targets.
    pub node: Option<String>,
    /// Everything else the registry returns.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}
