//! Typed storage requests and results.
//!
//! Nodes expose three storage backends (database, filesystem and a
//! content-addressed store) behind the same six operations.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ProtoError;

/// Storage backend kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StorageType {
    /// Relational/document database.
    #[serde(rename = "db")]
    Database,
    /// Node-local filesystem.
    #[serde(rename = "fs")]
    Filesystem,
    /// Content-addressed store.
    #[serde(rename = "ipfs")]
    Ipfs,
}

impl StorageType {
    /// Wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Database => "db",
            Self::Filesystem => "fs",
            Self::Ipfs => "ipfs",
        }
    }

    /// Whether the backend stores whole files.
    #[must_use]
    pub const fn is_file_backed(self) -> bool {
        matches!(self, Self::Filesystem | Self::Ipfs)
    }
}

impl fmt::Display for StorageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StorageType {
    type Err = ProtoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "db" => Ok(Self::Database),
            "fs" => Ok(Self::Filesystem),
            "ipfs" => Ok(Self::Ipfs),
            other => Err(ProtoError::UnsupportedStorage(format!(
                "unknown storage type '{other}'"
            ))),
        }
    }
}

/// Storage operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageOperation {
    /// Create a table, record or file.
    Create,
    /// Read a record or file.
    Read,
    /// Update records.
    Update,
    /// Delete records or files.
    Delete,
    /// List records or files.
    List,
    /// Query records.
    Search,
}

impl StorageOperation {
    /// Wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Read => "read",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::List => "list",
            Self::Search => "search",
        }
    }
}

impl fmt::Display for StorageOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StorageOperation {
    type Err = ProtoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(Self::Create),
            "read" => Ok(Self::Read),
            "update" => Ok(Self::Update),
            "delete" => Ok(Self::Delete),
            "list" => Ok(Self::List),
            "search" => Ok(Self::Search),
            other => Err(ProtoError::UnsupportedStorage(format!(
                "unknown storage operation '{other}'"
            ))),
        }
    }
}

/// Free-form per-request options.
pub type StorageOptions = Map<String, Value>;

/// What a create request writes.
#[derive(Debug, Clone, PartialEq)]
pub enum CreateContent {
    /// Structured data or a schema.
    Data(Value),
    /// A whole file, for file-backed storage.
    File {
        /// Base name of the uploaded file.
        file_name: String,
        /// File contents.
        bytes: Vec<u8>,
    },
}

/// A storage request against one backend.
#[derive(Debug, Clone, PartialEq)]
pub enum StorageRequest {
    /// Create a record, table or file.
    Create {
        /// Backend.
        storage_type: StorageType,
        /// Table name or file path.
        path: String,
        /// What to write.
        content: CreateContent,
        /// Options.
        options: StorageOptions,
    },
    /// Read a record or file.
    Read {
        /// Backend.
        storage_type: StorageType,
        /// Table name or file path.
        path: String,
        /// Options.
        options: StorageOptions,
    },
    /// Update records.
    Update {
        /// Backend.
        storage_type: StorageType,
        /// Table name or file path.
        path: String,
        /// New values.
        data: Value,
        /// Options.
        options: StorageOptions,
    },
    /// Delete records or files.
    Delete {
        /// Backend.
        storage_type: StorageType,
        /// Table name or file path.
        path: String,
        /// Options.
        options: StorageOptions,
    },
    /// List records or files.
    List {
        /// Backend.
        storage_type: StorageType,
        /// Table name or directory.
        path: String,
        /// Options.
        options: StorageOptions,
    },
    /// Query records.
    Search {
        /// Backend.
        storage_type: StorageType,
        /// Table name.
        path: String,
        /// Query body.
        query: Value,
        /// Options.
        options: StorageOptions,
    },
}

impl StorageRequest {
    /// Build a file upload.
    ///
    /// # Errors
    ///
    /// Returns [`ProtoError::UnsupportedStorage`] unless the backend is file-backed.
    pub fn upload(
        storage_type: StorageType,
        path: impl Into<String>,
        file_name: impl Into<String>,
        bytes: Vec<u8>,
        options: StorageOptions,
    ) -> Result<Self, ProtoError> {
        if !storage_type.is_file_backed() {
            return Err(ProtoError::UnsupportedStorage(format!(
                "file uploads are not supported by '{storage_type}' storage"
            )));
        }
        Ok(Self::Create {
            storage_type,
            path: path.into(),
            content: CreateContent::File {
                file_name: file_name.into(),
                bytes,
            },
            options,
        })
    }

    /// Backend this request targets.
    #[must_use]
    pub const fn storage_type(&self) -> StorageType {
        match self {
            Self::Create { storage_type, .. }
            | Self::Read { storage_type, .. }
            | Self::Update { storage_type, .. }
            | Self::Delete { storage_type, .. }
            | Self::List { storage_type, .. }
            | Self::Search { storage_type, .. } => *storage_type,
        }
    }

    /// Operation this request performs.
    #[must_use]
    pub const fn operation(&self) -> StorageOperation {
        match self {
            Self::Create { .. } => StorageOperation::Create,
            Self::Read { .. } => StorageOperation::Read,
            Self::Update { .. } => StorageOperation::Update,
            Self::Delete { .. } => StorageOperation::Delete,
            Self::List { .. } => StorageOperation::List,
            Self::Search { .. } => StorageOperation::Search,
        }
    }

    /// Table name or file path.
    #[must_use]
    pub fn path(&self) -> &str {
        match self {
            Self::Create { path, .. }
            | Self::Read { path, .. }
            | Self::Update { path, .. }
            | Self::Delete { path, .. }
            | Self::List { path, .. }
            | Self::Search { path, .. } => path,
        }
    }

    /// Request options.
    #[must_use]
    pub const fn options(&self) -> &StorageOptions {
        match self {
            Self::Create { options, .. }
            | Self::Read { options, .. }
            | Self::Update { options, .. }
            | Self::Delete { options, .. }
            | Self::List { options, .. }
            | Self::Search { options, .. } => options,
        }
    }

    /// JSON body carried by the request, if any. File uploads have none.
    #[must_use]
    pub const fn body(&self) -> Option<&Value> {
        match self {
            Self::Create {
                content: CreateContent::Data(data),
                ..
            }
            | Self::Update { data, .. } => Some(data),
            Self::Search { query, .. } => Some(query),
            _ => None,
        }
    }

    /// File upload carried by the request, if any.
    #[must_use]
    pub fn file(&self) -> Option<(&str, &[u8])> {
        match self {
            Self::Create {
                content: CreateContent::File { file_name, bytes },
                ..
            } => Some((file_name.as_str(), bytes.as_slice())),
            _ => None,
        }
    }
}

/// Data returned by a storage operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StoragePayload {
    /// Structured data.
    Json(Value),
    /// Raw file contents.
    Bytes(Vec<u8>),
}

/// Outcome of a storage operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StorageResult {
    /// Whether the node reported success.
    pub success: bool,
    /// Node message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Returned data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<StoragePayload>,
}

impl StorageResult {
    /// Interpret a JSON storage response body.
    ///
    /// Bodies of the form `{"success", "message", "data"}` are unpacked; any
    /// other JSON value is treated as successful data.
    #[must_use]
    pub fn from_json(body: Value) -> Self {
        match body {
            Value::Object(mut map) if map.contains_key("success") => {
                let success = map
                    .remove("success")
                    .and_then(|v| v.as_bool())
                    .unwrap_or(false);
                let message = map
                    .remove("message")
                    .and_then(|v| v.as_str().map(str::to_string));
                let data = map
                    .remove("data")
                    .filter(|v| !v.is_null())
                    .map(StoragePayload::Json);
                Self {
                    success,
                    message,
                    data,
                }
            }
            other => Self {
                success: true,
                message: None,
                data: Some(StoragePayload::Json(other)),
            },
        }
    }

    /// A successful result carrying raw bytes.
    #[must_use]
    pub const fn from_bytes(bytes: Vec<u8>) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(StoragePayload::Bytes(bytes)),
        }
    }

    /// Raw bytes, when the result carries a file.
    #[must_use]
    pub fn bytes(&self) -> Option<&[u8]> {
        match &self.data {
            Some(StoragePayload::Bytes(bytes)) => Some(bytes),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn upload_requires_file_backend() {
        let err = StorageRequest::upload(
            StorageType::Database,
            "t",
            "f.txt",
            vec![1],
            StorageOptions::new(),
        )
        .unwrap_err();
        assert!(matches!(err, ProtoError::UnsupportedStorage(_)));

        let ok = StorageRequest::upload(
            StorageType::Ipfs,
            "docs",
            "f.txt",
            b"hi".to_vec(),
            StorageOptions::new(),
        )
        .unwrap();
        assert_eq!(ok.file(), Some(("f.txt", &b"hi"[..])));
        assert_eq!(ok.body(), None);
    }

    #[test]
    fn accessors_follow_variant() {
        let request = StorageRequest::Search {
            storage_type: StorageType::Database,
            path: "docs".into(),
            query: json!({"title": "x"}),
            options: StorageOptions::new(),
        };
        assert_eq!(request.operation(), StorageOperation::Search);
        assert_eq!(request.storage_type(), StorageType::Database);
        assert_eq!(request.path(), "docs");
        assert_eq!(request.body(), Some(&json!({"title": "x"})));
    }

    #[test]
    fn result_unpacks_envelope() {
        let result = StorageResult::from_json(json!({
            "success": true,
            "message": "ok",
            "data": [{"id": 1}]
        }));
        assert!(result.success);
        assert_eq!(result.message.as_deref(), Some("ok"));
        assert_eq!(result.data, Some(StoragePayload::Json(json!([{"id": 1}]))));
    }

    #[test]
    fn result_wraps_bare_json() {
        let result = StorageResult::from_json(json!(["a", "b"]));
        assert!(result.success);
        assert!(result.bytes().is_none());
    }

    #[test]
    fn unknown_operation_is_unsupported() {
        assert!("truncate".parse::<StorageOperation>().is_err());
        assert!("s3".parse::<StorageType>().is_err());
    }
}
