//! Node addressing.
//!
//! A node is reached either directly over HTTP or indirectly through a relay
//! that forwards frames to a node identified by an opaque id. Exactly one of
//! the two forms is populated for any [`NodeAddress`].

use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::ProtoError;

/// Where a node can be reached.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "server_type", rename_all = "snake_case")]
pub enum NodeAddress {
    /// Direct request/response against the node's HTTP server.
    Http {
        /// Base URL of the node, without a trailing slash.
        url: String,
    },
    /// Frames routed through a relay to an indirectly reachable node.
    Relay {
        /// WebSocket URL of the relay.
        routing_url: String,
        /// Identifier the relay uses to find the node.
        node_id: String,
    },
}

impl NodeAddress {
    /// Select an address from the raw address fields.
    ///
    /// Blank strings count as absent. Exactly one of a direct URL or an
    /// indirect pair (node id plus routing URL) must be supplied. A routing
    /// URL given alongside a direct URL, with no indirect id, is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`ProtoError::InvalidAddress`] when neither form is given,
    /// when an indirect id has no routing URL, when both forms are given,
    /// or when a URL does not parse.
    pub fn resolve(
        node_url: Option<&str>,
        indirect_node_id: Option<&str>,
        routing_url: Option<&str>,
    ) -> Result<Self, ProtoError> {
        let node_url = non_blank(node_url);
        let indirect_node_id = non_blank(indirect_node_id);
        let routing_url = non_blank(routing_url);

        match (node_url, indirect_node_id, routing_url) {
            (None, None, _) => Err(ProtoError::InvalidAddress(
                "either a node URL or an indirect node id must be set".into(),
            )),
            (_, Some(_), None) => Err(ProtoError::InvalidAddress(
                "a routing URL must be set when an indirect node id is set".into(),
            )),
            (Some(_), Some(_), Some(_)) => Err(ProtoError::InvalidAddress(
                "a node URL and an indirect node id are mutually exclusive".into(),
            )),
            (Some(url), None, _) => Self::from_url(url),
            (None, Some(node_id), Some(routing)) => Self::relay(routing, node_id),
        }
    }

    /// Parse a direct node address.
    ///
    /// Accepts `http://host:port`, `https://host:port` or a bare `host:port`,
    /// which is treated as plain HTTP.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is malformed, has no host, or uses a
    /// scheme other than `http`/`https`.
    pub fn from_url(raw: &str) -> Result<Self, ProtoError> {
        let raw = raw.trim();
        let candidate = if raw.contains("://") {
            raw.to_string()
        } else {
            format!("http://{raw}")
        };

        let url = Url::parse(&candidate)
            .map_err(|e| ProtoError::InvalidAddress(format!("invalid node URL '{raw}': {e}")))?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(ProtoError::InvalidAddress(format!(
                "invalid node URL '{raw}': scheme must be http or https"
            )));
        }
        if url.host_str().is_none() {
            return Err(ProtoError::InvalidAddress(format!(
                "invalid node URL '{raw}': missing host"
            )));
        }

        Ok(Self::Http {
            url: url.as_str().trim_end_matches('/').to_string(),
        })
    }

    /// Build an indirect address reached through a relay.
    ///
    /// # Errors
    ///
    /// Returns an error if the node id is blank or the routing URL is not a
    /// `ws://`/`wss://` URL.
    pub fn relay(routing_url: &str, node_id: &str) -> Result<Self, ProtoError> {
        let node_id = node_id.trim();
        if node_id.is_empty() {
            return Err(ProtoError::InvalidAddress("indirect node id is empty".into()));
        }

        let url = Url::parse(routing_url.trim()).map_err(|e| {
            ProtoError::InvalidAddress(format!("invalid routing URL '{routing_url}': {e}"))
        })?;
        if !matches!(url.scheme(), "ws" | "wss") {
            return Err(ProtoError::InvalidAddress(format!(
                "invalid routing URL '{routing_url}': scheme must be ws or wss"
            )));
        }

        Ok(Self::Relay {
            routing_url: url.as_str().trim_end_matches('/').to_string(),
            node_id: node_id.to_string(),
        })
    }

    /// Short name of the transport this address selects.
    #[must_use]
    pub const fn transport_name(&self) -> &'static str {
        match self {
            Self::Http { .. } => "http",
            Self::Relay { .. } => "relay",
        }
    }

    /// Whether this is a direct HTTP address.
    #[must_use]
    pub const fn is_direct(&self) -> bool {
        matches!(self, Self::Http { .. })
    }
}

impl fmt::Display for NodeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http { url } => write!(f, "{url}"),
            Self::Relay {
                routing_url,
                node_id,
            } => write!(f, "{node_id} via {routing_url}"),
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
