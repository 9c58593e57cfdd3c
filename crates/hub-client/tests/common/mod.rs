//! Test helpers: an in-process node served over HTTP and behind a relay.
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::any;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use futures::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

/// Contents served for any filesystem read.
pub const FILE_CONTENTS: &[u8] = b"file contents\x00\x01";

/// Bind an ephemeral port.
pub async fn bind() -> (TcpListener, SocketAddr) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    (listener, addr)
}

/// A port nothing listens on.
pub async fn closed_port() -> u16 {
    let (listener, addr) = bind().await;
    drop(listener);
    addr.port()
}

/// What the node answers.
pub enum Reply {
    Json(Value),
    Bytes(Vec<u8>),
}

#[derive(Default)]
struct Inner {
    users: HashSet<String>,
    runs: HashMap<String, Value>,
    next_run: u32,
    tokens: Vec<Option<String>>,
}

/// Node behaviour shared by both servers.
#[derive(Clone, Default)]
pub struct NodeState {
    inner: Arc<Mutex<Inner>>,
}

impl NodeState {
    /// Tokens seen on run submissions, in order.
    pub fn run_tokens(&self) -> Vec<Option<String>> {
        self.inner.lock().unwrap().tokens.clone()
    }

    /// Handle one node call. Errors are `(status, message)`.
    pub fn handle(&self, path: &str, params: Value, token: Option<String>) -> Result<Reply, (u16, String)> {
        let mut inner = self.inner.lock().unwrap();
        let segments: Vec<&str> = path.trim_matches('/').split('/').collect();

        match segments.as_slice() {
            ["user", "check"] => {
                let public_key = params["public_key"].as_str().unwrap_or_default().to_string();
                let registered = inner.users.contains(&public_key);
                Ok(Reply::Json(user(&public_key, registered)))
            }
            ["user", "register"] => {
                let public_key = params["public_key"].as_str().unwrap_or_default().to_string();
                inner.users.insert(public_key.clone());
                Ok(Reply::Json(user(&public_key, true)))
            }
            [kind, "run"] => {
                inner.tokens.push(token);
                inner.next_run += 1;
                let id = format!("{kind}_run:{}", inner.next_run);
                let run = json!({
                    "id": id,
                    "consumer_id": params["consumer_id"],
                    "inputs": params["inputs"],
                    "deployment": params["deployment"],
                    "status": "pending",
                    "signature": params["signature"],
                });
                inner.runs.insert(id, run.clone());
                Ok(Reply::Json(run))
            }
            [_, "check"] => {
                let id = params["id"].as_str().unwrap_or_default().to_string();
                let run = inner
                    .runs
                    .get_mut(&id)
                    .ok_or((404, format!("run {id} not found")))?;
                let next = match run["status"].as_str() {
                    Some("pending") => "running",
                    _ => "completed",
                };
                run["status"] = json!(next);
                if next == "completed" {
                    let name = run["deployment"]["module"]["name"].clone();
                    run["results"] = json!([format!("done: {}", name.as_str().unwrap_or("?"))]);
                }
                Ok(Reply::Json(run.clone()))
            }
            ["monitor", action] => {
                if let Some(kind) = action.strip_prefix("create_").and_then(|a| a.strip_suffix("_run")) {
                    inner.next_run += 1;
                    let id = format!("{kind}_run:{}", inner.next_run);
                    let run = json!({
                        "id": id,
                        "consumer_id": params["consumer_id"],
                        "inputs": params["inputs"],
                        "deployment": params["deployment"],
                        "status": "pending",
                        "signature": params["signature"],
                    });
                    inner.runs.insert(id, run.clone());
                    Ok(Reply::Json(run))
                } else if action.starts_with("update_") && action.ends_with("_run") {
                    let id = params["id"].as_str().unwrap_or_default().to_string();
                    let run = inner
                        .runs
                        .get_mut(&id)
                        .ok_or((404, format!("run {id} not found")))?;
                    *run = params;
                    Ok(Reply::Json(run.clone()))
                } else {
                    Err((404, format!("no route {path}")))
                }
            }
            [kind, "create"] => Ok(Reply::Json(json!({"success": true, "module_type": kind, "name": params["name"]}))),
            ["inference", "chat"] => {
                let prompt = params["messages"][0]["content"].as_str().unwrap_or_default();
                Ok(Reply::Json(json!({
                    "choices": [{"message": {"role": "assistant", "content": format!("echo: {prompt}")}}]
                })))
            }
            ["storage", "fs", "read", ..] | ["storage", "ipfs", "read", ..] => {
                Ok(Reply::Bytes(FILE_CONTENTS.to_vec()))
            }
            ["storage", _, op, ..] => Ok(Reply::Json(json!({
                "success": true,
                "message": format!("{op} ok"),
                "data": params.get("data").or_else(|| params.get("query")).cloned().unwrap_or(Value::Null),
            }))),
            _ => Err((404, format!("no route {path}"))),
        }
    }
}

fn user(public_key: &str, registered: bool) -> Value {
    if registered {
        json!({"id": format!("user:{public_key}"), "public_key": public_key, "is_registered": true})
    } else {
        json!({"public_key": public_key, "is_registered": false})
    }
}

/// A server task that stops when dropped.
pub struct TestServer {
    pub addr: SocketAddr,
    handle: JoinHandle<()>,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

impl TestServer {
    /// Direct node URL.
    pub fn http_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Relay URL.
    pub fn ws_url(&self) -> String {
        format!("ws://{}", self.addr)
    }
}

/// Serve `state` as a node's HTTP server.
pub async fn start_http_node(state: NodeState) -> TestServer {
    let app = Router::new()
        .route("/{*path}", any(http_handler))
        .with_state(state);
    let (listener, addr) = bind().await;
    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    TestServer { addr, handle }
}

async fn http_handler(
    State(state): State<NodeState>,
    Path(path): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string);
    let params = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap_or(Value::Null)
    };

    match state.handle(&path, params, token) {
        Ok(Reply::Json(value)) => axum::Json(value).into_response(),
        Ok(Reply::Bytes(bytes)) => {
            ([(header::CONTENT_TYPE, "application/octet-stream")], bytes).into_response()
        }
        Err((code, message)) => {
            let status = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (status, message).into_response()
        }
    }
}

/// Serve `state` behind a relay that only forwards frames for `node_id`.
pub async fn start_relay(state: NodeState, node_id: &'static str) -> TestServer {
    let (listener, addr) = bind().await;
    let handle = tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let state = state.clone();
            tokio::spawn(async move {
                let Ok(mut ws) = accept_async(stream).await else {
                    return;
                };
                while let Some(Ok(message)) = ws.next().await {
                    let Message::Text(text) = message else {
                        continue;
                    };
                    let frame: Value = serde_json::from_str(text.as_str()).unwrap();
                    let reply = relay_reply(&state, node_id, &frame);
                    if ws.send(Message::Text(reply.to_string().into())).await.is_err() {
                        break;
                    }
                }
            });
        }
    });
    TestServer { addr, handle }
}

fn relay_reply(state: &NodeState, node_id: &str, frame: &Value) -> Value {
    let id = frame["id"].clone();
    if frame["target_node"] != node_id {
        return json!({"id": id, "error": {"code": 502, "message": "unknown node"}});
    }
    let path = frame["path"].as_str().unwrap_or_default();
    let token = frame["access_token"].as_str().map(str::to_string);

    match state.handle(path, frame["params"].clone(), token) {
        Ok(Reply::Json(result)) => json!({"id": id, "result": result}),
        Ok(Reply::Bytes(bytes)) => {
            json!({"id": id, "result": {"data_base64": BASE64.encode(bytes)}})
        }
        Err((code, message)) => json!({"id": id, "error": {"code": code, "message": message}}),
    }
}

/// Poll interval short enough for tests.
pub const FAST_POLL: Duration = Duration::from_millis(20);
