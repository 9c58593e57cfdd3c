//! Registry access.
//!
//! [`Registry`] is the narrow set of record operations the hub client needs.
//! [`SurrealRegistry`] implements it over SurrealDB's HTTP interface; tests
//! use the in-memory `FakeRegistry`.

use std::time::Duration;

use reqwest::{Client, IntoUrl, Method, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;
use url::Url;

use crate::error::{ClientError, Result};

/// Namespace and database every hub record lives in.
pub const NAMESPACE: &str = "naptha";
/// See [`NAMESPACE`].
pub const DATABASE: &str = "naptha";
/// Record-access scope for user accounts.
pub const USER_SCOPE: &str = "user";
/// Invite code sent with sign-up requests.
pub const INVITE_CODE: &str = "DZHA4ZTK";

/// Record operations against the hub registry.
///
/// `token` is the session token from a successful sign-in. Record ids have
/// the form `table:key`. List filters compare record-link fields against
/// record ids.
#[allow(async_fn_in_trait)]
pub trait Registry {
    /// Sign in and return a session token.
    async fn signin(&self, username: &str, password: &str) -> Result<String>;

    /// Create an account and return a session token.
    async fn signup(&self, username: &str, password: &str, invite: &str) -> Result<String>;

    /// Fetch one record.
    async fn select(&self, token: &str, record_id: &str) -> Result<Option<Value>>;

    /// List the records of `table` whose fields link to the given record ids.
    async fn list(&self, token: &str, table: &str, filter: &[(&str, &str)]) -> Result<Vec<Value>>;

    /// Create a record with the given id and content.
    async fn create(&self, token: &str, record_id: &str, content: &Value) -> Result<Value>;

    /// Delete a record. Returns whether anything was deleted.
    async fn delete(&self, token: &str, record_id: &str) -> Result<bool>;

    /// Create an `edge` relation from one record to another.
    async fn relate(
        &self,
        token: &str,
        from: &str,
        edge: &str,
        to: &str,
        content: &Value,
    ) -> Result<Value>;
}

/// One statement result in a SurrealDB response.
#[derive(Debug, Deserialize)]
struct StatementResult {
    status: String,
    #[serde(default)]
    result: Value,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: String,
}

/// Registry backed by a SurrealDB server.
#[derive(Debug, Clone)]
pub struct SurrealRegistry {
    base_url: String,
    http: Client,
}

impl SurrealRegistry {
    /// Connect to the registry at `hub_url`.
    ///
    /// `ws://` and `wss://` URLs are mapped to `http://` and `https://`, and a
    /// trailing `/rpc` path is dropped.
    pub fn new(hub_url: &str) -> Result<Self> {
        let base_url = http_base_url(hub_url)?;
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ClientError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { base_url, http })
    }

    /// Base URL requests are sent to.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str, token: Option<&str>) -> RequestBuilder {
        self.request_url(method, format!("{}/{}", self.base_url, path), token)
    }

    /// Request against one record, with the key percent-encoded as a single
    /// path segment.
    fn record_request(
        &self,
        method: Method,
        record_id: &str,
        token: Option<&str>,
    ) -> Result<RequestBuilder> {
        let (table, key) = split_record_id(record_id)?;
        let url = record_url(&self.base_url, table, key)?;
        Ok(self.request_url(method, url, token))
    }

    fn request_url(&self, method: Method, url: impl IntoUrl, token: Option<&str>) -> RequestBuilder {
        let builder = self
            .http
            .request(method, url)
            .header("Accept", "application/json")
            .header("surreal-ns", NAMESPACE)
            .header("surreal-db", DATABASE)
            .header("NS", NAMESPACE)
            .header("DB", DATABASE);
        match token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(&self, operation: &str, builder: RequestBuilder) -> Result<Value> {
        let response = builder
            .send()
            .await
            .map_err(|e| ClientError::transport(operation, &self.base_url, e))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Authentication(format!("{operation}: {body}")));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::transport(
                operation,
                &self.base_url,
                format!("HTTP {status}: {body}"),
            ));
        }

        response.json().await.map_err(|e| {
            ClientError::transport(operation, &self.base_url, format!("malformed response: {e}"))
        })
    }

    /// Run SurrealQL and return the result of the last statement.
    async fn sql(
        &self,
        operation: &str,
        token: &str,
        statement: String,
        vars: &[(&str, &str)],
    ) -> Result<Value> {
        debug!(operation, %statement, "Registry query");
        let builder = self
            .request(Method::POST, "sql", Some(token))
            .query(vars)
            .body(statement);
        let body = self.send(operation, builder).await?;
        self.last_statement(operation, body)
    }

    fn last_statement(&self, operation: &str, body: Value) -> Result<Value> {
        let statements: Vec<StatementResult> = serde_json::from_value(body).map_err(|e| {
            ClientError::transport(operation, &self.base_url, format!("malformed response: {e}"))
        })?;
        let last = statements.into_iter().last().ok_or_else(|| {
            ClientError::transport(operation, &self.base_url, "empty query response")
        })?;
        if last.status != "OK" {
            return Err(ClientError::transport(
                operation,
                &self.base_url,
                format!("query failed: {}", last.result),
            ));
        }
        Ok(last.result)
    }

    async fn authenticate(&self, operation: &str, path: &str, body: Value) -> Result<String> {
        let response = self
            .request(Method::POST, path, None)
            .json(&body)
            .send()
            .await
            .map_err(|e| ClientError::transport(operation, &self.base_url, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Authentication(format!(
                "{operation} rejected (HTTP {status}): {body}"
            )));
        }
        let token: TokenResponse = response.json().await.map_err(|e| {
            ClientError::transport(operation, &self.base_url, format!("malformed response: {e}"))
        })?;
        Ok(token.token)
    }
}

impl Registry for SurrealRegistry {
    async fn signin(&self, username: &str, password: &str) -> Result<String> {
        let body = json!({
            "ns": NAMESPACE,
            "db": DATABASE,
            "sc": USER_SCOPE,
            "username": username,
            "password": password,
        });
        self.authenticate("signin", "signin", body).await
    }

    async fn signup(&self, username: &str, password: &str, invite: &str) -> Result<String> {
        let body = json!({
            "ns": NAMESPACE,
            "db": DATABASE,
            "sc": USER_SCOPE,
            "name": username,
            "username": username,
            "password": password,
            "invite": invite,
        });
        self.authenticate("signup", "signup", body).await
    }

    async fn select(&self, token: &str, record_id: &str) -> Result<Option<Value>> {
        let builder = self.record_request(Method::GET, record_id, Some(token))?;
        let body = self.send("select", builder).await?;
        let result = self.last_statement("select", body)?;
        Ok(first_record(result))
    }

    async fn list(&self, token: &str, table: &str, filter: &[(&str, &str)]) -> Result<Vec<Value>> {
        let statement = list_statement(table, filter)?;
        let result = self.sql("list", token, statement, filter).await?;
        Ok(into_records(result))
    }

    async fn create(&self, token: &str, record_id: &str, content: &Value) -> Result<Value> {
        let builder = self
            .record_request(Method::POST, record_id, Some(token))?
            .json(content);
        let body = self.send("create", builder).await?;
        let result = self.last_statement("create", body)?;
        first_record(result).ok_or_else(|| {
            ClientError::transport("create", &self.base_url, "registry returned no record")
        })
    }

    async fn delete(&self, token: &str, record_id: &str) -> Result<bool> {
        if self.select(token, record_id).await?.is_none() {
            return Ok(false);
        }
        let builder = self.record_request(Method::DELETE, record_id, Some(token))?;
        let body = self.send("delete", builder).await?;
        self.last_statement("delete", body)?;
        Ok(true)
    }

    async fn relate(
        &self,
        token: &str,
        from: &str,
        edge: &str,
        to: &str,
        content: &Value,
    ) -> Result<Value> {
        ensure_identifier(edge)?;
        let statement = format!(
            "RELATE type::thing($from)->{edge}->type::thing($to) CONTENT {content};"
        );
        let result = self
            .sql("relate", token, statement, &[("from", from), ("to", to)])
            .await?;
        first_record(result).ok_or_else(|| {
            ClientError::transport("relate", &self.base_url, "registry returned no relation")
        })
    }
}

/// URL of `key/{table}/{key}` under `base_url`.
pub(crate) fn record_url(base_url: &str, table: &str, key: &str) -> Result<Url> {
    let mut url = Url::parse(base_url)
        .map_err(|e| ClientError::Config(format!("invalid registry URL '{base_url}': {e}")))?;
    url.path_segments_mut()
        .map_err(|()| ClientError::Config(format!("invalid registry URL '{base_url}'")))?
        .pop_if_empty()
        .extend(["key", table, key]);
    Ok(url)
}

/// Map a hub URL to the HTTP base URL of its SurrealDB server.
pub(crate) fn http_base_url(hub_url: &str) -> Result<String> {
    let mut url = Url::parse(hub_url.trim())
        .map_err(|e| ClientError::Config(format!("invalid HUB_URL '{hub_url}': {e}")))?;

    let scheme = match url.scheme() {
        "ws" | "http" => "http",
        "wss" | "https" => "https",
        other => {
            return Err(ClientError::Config(format!(
                "invalid HUB_URL '{hub_url}': unsupported scheme '{other}'"
            )));
        }
    };
    url.set_scheme(scheme)
        .map_err(|()| ClientError::Config(format!("invalid HUB_URL '{hub_url}'")))?;

    let path = url.path().trim_end_matches('/').trim_end_matches("/rpc").to_string();
    url.set_path(&path);
    Ok(url.as_str().trim_end_matches('/').to_string())
}

fn split_record_id(record_id: &str) -> Result<(&str, &str)> {
    match record_id.split_once(':') {
        Some((table, key)) if !table.is_empty() && !key.is_empty() => {
            ensure_identifier(table)?;
            Ok((table, key))
        }
        _ => Err(ClientError::Config(format!(
            "'{record_id}' is not a record id of the form table:key"
        ))),
    }
}

fn ensure_identifier(name: &str) -> Result<()> {
    if !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        Ok(())
    } else {
        Err(ClientError::Config(format!("'{name}' is not a valid table name")))
    }
}

fn list_statement(table: &str, filter: &[(&str, &str)]) -> Result<String> {
    ensure_identifier(table)?;
    let mut statement = format!("SELECT * FROM {table}");
    for (i, (field, _)) in filter.iter().enumerate() {
        ensure_identifier(field)?;
        statement.push_str(if i == 0 { " WHERE " } else { " AND " });
        statement.push_str(&format!("{field} = type::thing(${field})"));
    }
    statement.push(';');
    Ok(statement)
}

fn into_records(result: Value) -> Vec<Value> {
    match result {
        Value::Array(records) => records,
        Value::Null => Vec::new(),
        other => vec![other],
    }
}

fn first_record(result: Value) -> Option<Value> {
    into_records(result).into_iter().next()
}
