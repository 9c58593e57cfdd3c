//! Storage provider.
//!
//! Thin layer over [`NodeClient::storage`] that persists file downloads: a
//! read against file-backed storage that returns bytes is written to the
//! output directory under the path's base name.

use std::path::{Path, PathBuf};

use hub_proto::{StorageOperation, StorageRequest, StorageResult};
use tracing::info;

use crate::error::{ClientError, Result};
use crate::node::NodeClient;

/// Default directory for downloaded files.
pub const DEFAULT_OUTPUT_DIR: &str = "./downloads";

/// Executes storage requests and saves downloaded files.
#[derive(Debug)]
pub struct StorageProvider<'a> {
    node: &'a NodeClient,
    output_dir: PathBuf,
}

/// Result of a storage request, plus where a download was saved.
#[derive(Debug, Clone, PartialEq)]
pub struct StorageOutcome {
    /// What the node returned.
    pub result: StorageResult,
    /// Local copy of a downloaded file.
    pub saved_to: Option<PathBuf>,
}

impl<'a> StorageProvider<'a> {
    /// Provider saving downloads to [`DEFAULT_OUTPUT_DIR`].
    #[must_use]
    pub fn new(node: &'a NodeClient) -> Self {
        Self::with_output_dir(node, DEFAULT_OUTPUT_DIR)
    }

    /// Provider saving downloads to `output_dir`.
    #[must_use]
    pub fn with_output_dir(node: &'a NodeClient, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            node,
            output_dir: output_dir.into(),
        }
    }

    /// Execute `request`, saving any downloaded file.
    pub async fn execute(&self, request: &StorageRequest) -> Result<StorageOutcome> {
        let result = self.node.storage(request).await?;

        let saved_to = match result.bytes() {
            Some(bytes)
                if request.operation() == StorageOperation::Read
                    && request.storage_type().is_file_backed() =>
            {
                Some(self.save(request.path(), bytes).await?)
            }
            _ => None,
        };

        Ok(StorageOutcome { result, saved_to })
    }

    async fn save(&self, path: &str, bytes: &[u8]) -> Result<PathBuf> {
        let file_name = Path::new(path).file_name().ok_or_else(|| {
            ClientError::Config(format!("cannot derive a file name from '{path}'"))
        })?;
        tokio::fs::create_dir_all(&self.output_dir).await?;
        let target = self.output_dir.join(file_name);
        tokio::fs::write(&target, bytes).await?;
        info!(path = %target.display(), bytes = bytes.len(), "File downloaded");
        Ok(target)
    }
}
