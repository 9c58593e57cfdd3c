//! Relay transport.
//!
//! Each call opens a WebSocket to the relay, sends one request frame naming
//! the target node, and waits for the response frame carrying the same id.
//! Binary payloads travel base64-encoded in a `data_base64` field.

use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use futures::future::{BoxFuture, FutureExt};
use futures::{SinkExt, StreamExt};
use hub_proto::{
    ChatCompletionRequest, ModuleDeployment, ModuleKind, NodeAddress, NodeUser, Run, RunInput,
    StorageRequest, StorageResult, UserInput,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tokio::time::timeout;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, warn};
use uuid::Uuid;

use super::{DEFAULT_REQUEST_TIMEOUT, NodeTransport, decode, route};
use crate::error::{ClientError, Result};

/// Request frame sent to the relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelayRequest {
    /// Correlates the response with this request.
    pub id: String,
    /// Node the relay forwards to.
    pub target_node: String,
    /// Node route, e.g. `agent/run`.
    pub path: String,
    /// Request body.
    pub params: Value,
    /// Session access token, when one is held.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
}

/// Response frame returned by the relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelayResponse {
    /// Id of the request this answers.
    pub id: String,
    /// Successful result.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Failure reported by the relay or the node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RelayError>,
}

/// Error shape inside a [`RelayResponse`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayError {
    /// Status-like code; 404 means the resource was not found.
    pub code: i32,
    /// Human-readable message.
    pub message: String,
}

/// Reaches a node through a WebSocket relay.
#[derive(Debug, Clone)]
pub struct RelayTransport {
    address: NodeAddress,
    routing_url: String,
    node_id: String,
    timeout: Duration,
}

impl RelayTransport {
    /// Create a transport for an indirect address.
    pub fn new(address: NodeAddress) -> Result<Self> {
        Self::with_timeout(address, DEFAULT_REQUEST_TIMEOUT)
    }

    /// Create a transport with a custom per-call timeout.
    pub fn with_timeout(address: NodeAddress, timeout: Duration) -> Result<Self> {
        let NodeAddress::Relay {
            routing_url,
            node_id,
        } = &address
        else {
            return Err(ClientError::Config(format!(
                "relay transport needs an indirect node address, got {address}"
            )));
        };
        Ok(Self {
            routing_url: routing_url.clone(),
            node_id: node_id.clone(),
            address,
            timeout,
        })
    }

    /// Send one frame and wait for its response, within the call timeout.
    async fn call(
        &self,
        operation: &str,
        path: &str,
        params: Value,
        token: Option<&str>,
    ) -> Result<Value> {
        let request = RelayRequest {
            id: Uuid::new_v4().to_string(),
            target_node: self.node_id.clone(),
            path: path.to_string(),
            params,
            access_token: token.map(str::to_string),
        };

        match timeout(self.timeout, self.exchange(operation, &request)).await {
            Ok(result) => result,
            Err(_) => Err(self.fail(
                operation,
                format!("no response within {:?}", self.timeout),
            )),
        }
    }

    async fn exchange(&self, operation: &str, request: &RelayRequest) -> Result<Value> {
        debug!(operation, path = %request.path, relay = %self.routing_url, "Sending relay frame");

        let (mut ws, _) = connect_async(self.routing_url.as_str())
            .await
            .map_err(|e| self.fail(operation, e))?;

        let frame = serde_json::to_string(request).map_err(|e| self.fail(operation, e))?;
        ws.send(Message::Text(frame.into()))
            .await
            .map_err(|e| self.fail(operation, e))?;

        let response = loop {
            let message = ws
                .next()
                .await
                .ok_or_else(|| self.fail(operation, "relay closed the connection"))?
                .map_err(|e| self.fail(operation, e))?;

            let parsed: RelayResponse = match message {
                Message::Text(text) => serde_json::from_str::<RelayResponse>(text.as_str()),
                Message::Binary(bytes) => serde_json::from_slice::<RelayResponse>(&bytes),
                Message::Close(_) => {
                    return Err(self.fail(operation, "relay closed the connection"));
                }
                _ => continue,
            }
            .map_err(|e| self.fail(operation, format!("malformed frame: {e}")))?;

            if parsed.id == request.id {
                break parsed;
            }
            warn!(expected = %request.id, got = %parsed.id, "Ignoring relay frame for another request");
        };

        if let Err(e) = ws.close(None).await {
            debug!(error = %e, "Relay close failed");
        }

        match (response.result, response.error) {
            (_, Some(error)) if error.code == 404 => Err(ClientError::NotFound {
                what: "node resource",
                id: request.path.clone(),
            }),
            (_, Some(error)) => Err(self.fail(
                operation,
                format!("node error {}: {}", error.code, error.message),
            )),
            (Some(result), None) => Ok(result),
            (None, None) => Err(self.fail(operation, "response has neither result nor error")),
        }
    }

    async fn call_typed<B, T>(
        &self,
        operation: &str,
        path: &str,
        body: &B,
        token: Option<&str>,
    ) -> Result<T>
    where
        B: Serialize + Sync + ?Sized,
        T: DeserializeOwned,
    {
        let params = serde_json::to_value(body).map_err(|e| self.fail(operation, e))?;
        let value = self.call(operation, path, params, token).await?;
        decode(operation, &self.address, value)
    }

    async fn execute_storage(
        &self,
        request: &StorageRequest,
        token: Option<&str>,
    ) -> Result<StorageResult> {
        let result = self
            .call("storage", &route::storage(request), storage_params(request), token)
            .await?;

        match result.get("data_base64").and_then(Value::as_str) {
            Some(encoded) => {
                let bytes = BASE64
                    .decode(encoded)
                    .map_err(|e| self.fail("storage", format!("invalid base64 payload: {e}")))?;
                Ok(StorageResult::from_bytes(bytes))
            }
            None => Ok(StorageResult::from_json(result)),
        }
    }

    fn fail(&self, operation: &str, reason: impl ToString) -> ClientError {
        ClientError::transport(operation, self.address.to_string(), reason)
    }
}

/// Relay params for a storage request.
pub(crate) fn storage_params(request: &StorageRequest) -> Value {
    let mut params = Map::new();
    params.insert("storage_type".into(), json!(request.storage_type()));
    params.insert("operation".into(), json!(request.operation()));
    params.insert("path".into(), json!(request.path()));
    params.insert("options".into(), Value::Object(request.options().clone()));

    let key = match request.operation() {
        hub_proto::StorageOperation::Search => "query",
        _ => "data",
    };
    if let Some(body) = request.body() {
        params.insert(key.into(), body.clone());
    }
    if let Some((file_name, bytes)) = request.file() {
        params.insert("file_name".into(), json!(file_name));
        params.insert("data_base64".into(), json!(BASE64.encode(bytes)));
    }
    Value::Object(params)
}

impl NodeTransport for RelayTransport {
    fn address(&self) -> &NodeAddress {
        &self.address
    }

    fn check_user<'a>(
        &'a self,
        input: &'a UserInput,
        token: Option<&'a str>,
    ) -> BoxFuture<'a, Result<NodeUser>> {
        self.call_typed("check-user", route::CHECK_USER, input, token)
            .boxed()
    }

    fn register_user<'a>(
        &'a self,
        input: &'a UserInput,
        token: Option<&'a str>,
    ) -> BoxFuture<'a, Result<NodeUser>> {
        self.call_typed("register-user", route::REGISTER_USER, input, token)
            .boxed()
    }

    fn run<'a>(&'a self, input: &'a RunInput, token: Option<&'a str>) -> BoxFuture<'a, Result<Run>> {
        async move {
            let path = route::run(input.kind());
            self.call_typed("run", &path, input, token).await
        }
        .boxed()
    }

    fn check_run<'a>(
        &'a self,
        kind: ModuleKind,
        run: &'a Run,
        token: Option<&'a str>,
    ) -> BoxFuture<'a, Result<Run>> {
        async move {
            let path = route::check_run(kind);
            self.call_typed("check-run", &path, run, token).await
        }
        .boxed()
    }

    fn create_run<'a>(
        &'a self,
        input: &'a RunInput,
        token: Option<&'a str>,
    ) -> BoxFuture<'a, Result<Run>> {
        async move {
            let path = route::create_run(input.kind());
            self.call_typed("create-run", &path, input, token).await
        }
        .boxed()
    }

    fn update_run<'a>(
        &'a self,
        kind: ModuleKind,
        run: &'a Run,
        token: Option<&'a str>,
    ) -> BoxFuture<'a, Result<Run>> {
        async move {
            let path = route::update_run(kind);
            self.call_typed("update-run", &path, run, token).await
        }
        .boxed()
    }

    fn create_module<'a>(
        &'a self,
        deployment: &'a ModuleDeployment,
        token: Option<&'a str>,
    ) -> BoxFuture<'a, Result<Value>> {
        async move {
            let path = route::create_module(deployment.kind());
            self.call_typed("create-module", &path, deployment, token)
                .await
        }
        .boxed()
    }

    fn storage<'a>(
        &'a self,
        request: &'a StorageRequest,
        token: Option<&'a str>,
    ) -> BoxFuture<'a, Result<StorageResult>> {
        self.execute_storage(request, token).boxed()
    }

    fn inference<'a>(
        &'a self,
        request: &'a ChatCompletionRequest,
        token: Option<&'a str>,
    ) -> BoxFuture<'a, Result<Value>> {
        self.call_typed("inference", route::INFERENCE, request, token)
            .boxed()
    }
}
