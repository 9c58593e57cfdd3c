//! Direct HTTP transport.

use std::time::Duration;

use futures::future::{BoxFuture, FutureExt};
use hub_proto::{
    ChatCompletionRequest, ModuleDeployment, ModuleKind, NodeAddress, NodeUser, Run, RunInput,
    StorageOperation, StorageRequest, StorageResult, UserInput,
};
use reqwest::header::CONTENT_TYPE;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use super::{DEFAULT_REQUEST_TIMEOUT, NodeTransport, decode, route};
use crate::error::{ClientError, Result};

/// Talks to a node's HTTP server.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    address: NodeAddress,
    base_url: String,
    http: Client,
}

impl HttpTransport {
    /// Create a transport for a direct address.
    pub fn new(address: NodeAddress) -> Result<Self> {
        Self::with_timeout(address, DEFAULT_REQUEST_TIMEOUT)
    }

    /// Create a transport with a custom per-request timeout.
    pub fn with_timeout(address: NodeAddress, timeout: Duration) -> Result<Self> {
        let NodeAddress::Http { url } = &address else {
            return Err(ClientError::Config(format!(
                "HTTP transport needs a direct node URL, got {address}"
            )));
        };
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            base_url: url.trim_end_matches('/').to_string(),
            address,
            http,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn request(&self, method: Method, path: &str, token: Option<&str>) -> RequestBuilder {
        let builder = self.http.request(method, self.url(path));
        match token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(&self, operation: &str, path: &str, builder: RequestBuilder) -> Result<Response> {
        debug!(operation, url = %self.url(path), "Sending node request");
        let response = builder
            .send()
            .await
            .map_err(|e| ClientError::transport(operation, self.url(path), e))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        if status == StatusCode::NOT_FOUND {
            return Err(ClientError::NotFound {
                what: "node resource",
                id: path.to_string(),
            });
        }
        Err(ClientError::transport(
            operation,
            self.url(path),
            format!("HTTP {status}: {body}"),
        ))
    }

    async fn json_body(&self, operation: &str, path: &str, response: Response) -> Result<Value> {
        response
            .json()
            .await
            .map_err(|e| ClientError::transport(operation, self.url(path), format!("malformed response: {e}")))
    }

    async fn post<B, T>(&self, operation: &str, path: &str, body: &B, token: Option<&str>) -> Result<T>
    where
        B: Serialize + Sync + ?Sized,
        T: DeserializeOwned,
    {
        let builder = self.request(Method::POST, path, token).json(body);
        let response = self.send(operation, path, builder).await?;
        let value = self.json_body(operation, path, response).await?;
        decode(operation, &self.address, value)
    }

    async fn execute_storage(
        &self,
        request: &StorageRequest,
        token: Option<&str>,
    ) -> Result<StorageResult> {
        let operation = "storage";
        let path = route::storage(request);
        let options = request.options();

        let builder = match request.operation() {
            StorageOperation::Create => match request.file() {
                Some((file_name, bytes)) => {
                    let part = Part::bytes(bytes.to_vec()).file_name(file_name.to_string());
                    let form = Form::new()
                        .part("file", part)
                        .text("options", Value::Object(options.clone()).to_string());
                    self.request(Method::POST, &path, token).multipart(form)
                }
                None => self
                    .request(Method::POST, &path, token)
                    .json(&storage_body("data", request.body(), options)),
            },
            StorageOperation::Update => self
                .request(Method::PUT, &path, token)
                .json(&storage_body("data", request.body(), options)),
            StorageOperation::Search => self
                .request(Method::POST, &path, token)
                .json(&storage_body("query", request.body(), options)),
            StorageOperation::Read | StorageOperation::List | StorageOperation::Delete => {
                let method = if request.operation() == StorageOperation::Delete {
                    Method::DELETE
                } else {
                    Method::GET
                };
                let builder = self.request(method, &path, token);
                if options.is_empty() {
                    builder
                } else {
                    builder.query(&[("options", Value::Object(options.clone()).to_string())])
                }
            }
        };

        let response = self.send(operation, &path, builder).await?;
        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with("application/json"));

        if is_json {
            let body = self.json_body(operation, &path, response).await?;
            Ok(StorageResult::from_json(body))
        } else {
            let bytes = response
                .bytes()
                .await
                .map_err(|e| ClientError::transport(operation, self.url(&path), e))?;
            Ok(StorageResult::from_bytes(bytes.to_vec()))
        }
    }
}

fn storage_body(key: &str, payload: Option<&Value>, options: &serde_json::Map<String, Value>) -> Value {
    let mut body = serde_json::Map::new();
    body.insert(key.to_string(), payload.cloned().unwrap_or(Value::Null));
    body.insert("options".into(), Value::Object(options.clone()));
    Value::Object(body)
}

impl NodeTransport for HttpTransport {
    fn address(&self) -> &NodeAddress {
        &self.address
    }

    fn check_user<'a>(
        &'a self,
        input: &'a UserInput,
        token: Option<&'a str>,
    ) -> BoxFuture<'a, Result<NodeUser>> {
        self.post("check-user", route::CHECK_USER, input, token).boxed()
    }

    fn register_user<'a>(
        &'a self,
        input: &'a UserInput,
        token: Option<&'a str>,
    ) -> BoxFuture<'a, Result<NodeUser>> {
        self.post("register-user", route::REGISTER_USER, input, token)
            .boxed()
    }

    fn run<'a>(&'a self, input: &'a RunInput, token: Option<&'a str>) -> BoxFuture<'a, Result<Run>> {
        async move {
            let path = route::run(input.kind());
            self.post("run", &path, input, token).await
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
            self.post("check-run", &path, run, token).await
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
            self.post("create-run", &path, input, token).await
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
            self.post("update-run", &path, run, token).await
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
            self.post("create-module", &path, deployment, token).await
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
        self.post("inference", route::INFERENCE, request, token)
            .boxed()
    }
}
