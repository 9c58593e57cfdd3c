//! Storage command implementation.

use std::io::Write;
use std::path::Path;

use hub_client::StorageProvider;
use hub_proto::{CreateContent, StorageOperation, StorageOptions, StorageRequest};
use serde_json::Value;
use tracing::warn;

use crate::cli::StorageArgs;
use crate::config::Settings;
use crate::error::CliError;
use crate::output::{OutputFormat, StorageReport};

/// Storage command executor.
pub struct StorageCommand<'a> {
    settings: &'a Settings,
}

impl<'a> StorageCommand<'a> {
    /// Create a new storage command.
    #[must_use]
    pub const fn new(settings: &'a Settings) -> Self {
        Self { settings }
    }

    /// Execute the storage operation, saving downloaded files.
    ///
    /// # Errors
    ///
    /// Returns an error if the arguments are invalid or the node call fails.
    pub async fn execute<W: Write>(
        &self,
        writer: &mut W,
        format: &OutputFormat,
        args: &StorageArgs,
    ) -> Result<(), CliError> {
        let request = storage_request(args).await?;
        let node = self.settings.node_client().await?;

        let outcome = StorageProvider::with_output_dir(&node, &args.output)
            .execute(&request)
            .await?;
        format.write(writer, &StorageReport::from(outcome))
    }
}

/// Build a storage request from command arguments.
///
/// Create needs `--data`, `--schema` or (for fs/ipfs) `--file`; update needs
/// `--data`; search takes its query from `--data`.
pub async fn storage_request(args: &StorageArgs) -> Result<StorageRequest, CliError> {
    let storage_type = args.storage_type;
    let path = args.path.clone();
    let options = parse_options(args.options.as_deref())?;

    if args.file.is_some() && args.operation != StorageOperation::Create {
        warn!(operation = %args.operation, "--file is only used by create, ignoring it");
    }

    let request = match args.operation {
        StorageOperation::Create => {
            if let Some(file) = args.file.as_deref() {
                let (file_name, bytes) = read_upload(file).await?;
                StorageRequest::upload(storage_type, path, file_name, bytes, options)?
            } else {
                let raw = args.schema.as_deref().or(args.data.as_deref()).ok_or_else(|| {
                    CliError::InvalidArgument(
                        "create requires --data or --schema".into(),
                    )
                })?;
                StorageRequest::Create {
                    storage_type,
                    path,
                    content: CreateContent::Data(parse_json("data", raw)?),
                    options,
                }
            }
        }
        StorageOperation::Read => StorageRequest::Read {
            storage_type,
            path,
            options,
        },
        StorageOperation::Update => {
            let raw = args.data.as_deref().ok_or_else(|| {
                CliError::InvalidArgument("update requires --data".into())
            })?;
            StorageRequest::Update {
                storage_type,
                path,
                data: parse_json("data", raw)?,
                options,
            }
        }
        StorageOperation::Delete => StorageRequest::Delete {
            storage_type,
            path,
            options,
        },
        StorageOperation::List => StorageRequest::List {
            storage_type,
            path,
            options,
        },
        StorageOperation::Search => {
            let raw = args.data.as_deref().ok_or_else(|| {
                CliError::InvalidArgument("search requires a query in --data".into())
            })?;
            StorageRequest::Search {
                storage_type,
                path,
                query: parse_json("query", raw)?,
                options,
            }
        }
    };
    Ok(request)
}

fn parse_json(what: &str, raw: &str) -> Result<Value, CliError> {
    serde_json::from_str(raw)
        .map_err(|e| CliError::InvalidArgument(format!("--{what} is not valid JSON: {e}")))
}

fn parse_options(raw: Option<&str>) -> Result<StorageOptions, CliError> {
    match raw {
        None => Ok(StorageOptions::new()),
        Some(raw) => match parse_json("options", raw)? {
            Value::Object(map) => Ok(map),
            other => Err(CliError::InvalidArgument(format!(
                "--options must be a JSON object, got {other}"
            ))),
        },
    }
}

async fn read_upload(file: &Path) -> Result<(String, Vec<u8>), CliError> {
    let file_name = file
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| {
            CliError::InvalidArgument(format!("'{}' is not a file", file.display()))
        })?;
    let bytes = tokio::fs::read(file).await?;
    Ok((file_name, bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use hub_client::ErrorKind;
    use hub_proto::StorageType;
    use serde_json::json;
    use std::path::PathBuf;

    fn args(storage_type: StorageType, operation: StorageOperation) -> StorageArgs {
        StorageArgs {
            storage_type,
            operation,
            path: "notes".into(),
            data: None,
            schema: None,
            options: None,
            file: None,
            output: PathBuf::from("./downloads"),
        }
    }

    #[tokio::test]
    async fn create_prefers_schema_over_data() {
        let request = storage_request(&StorageArgs {
            schema: Some(r#"{"title": {"type": "text"}}"#.into()),
            data: Some(r#"{"title": "ignored"}"#.into()),
            ..args(StorageType::Database, StorageOperation::Create)
        })
        .await
        .unwrap();

        assert_eq!(request.body(), Some(&json!({"title": {"type": "text"}})));
    }

    #[tokio::test]
    async fn create_without_content_is_rejected() {
        let err = storage_request(&args(StorageType::Database, StorageOperation::Create))
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid argument: create requires --data or --schema"
        );
    }

    #[tokio::test]
    async fn update_and_search_need_data() {
        for operation in [StorageOperation::Update, StorageOperation::Search] {
            let err = storage_request(&args(StorageType::Database, operation))
                .await
                .unwrap_err();
            assert!(matches!(err, CliError::InvalidArgument(_)));
        }
    }

    #[tokio::test]
    async fn search_carries_query_and_options() {
        let request = storage_request(&StorageArgs {
            data: Some(r#"{"title": "a"}"#.into()),
            options: Some(r#"{"limit": 5}"#.into()),
            ..args(StorageType::Database, StorageOperation::Search)
        })
        .await
        .unwrap();

        assert_eq!(request.operation(), StorageOperation::Search);
        assert_eq!(request.body(), Some(&json!({"title": "a"})));
        assert_eq!(request.options()["limit"], 5);
    }

    #[tokio::test]
    async fn options_must_be_an_object() {
        let err = storage_request(&StorageArgs {
            options: Some("[1]".into()),
            ..args(StorageType::Database, StorageOperation::List)
        })
        .await
        .unwrap_err();
        assert!(err.to_string().contains("--options must be a JSON object"));
    }

    #[tokio::test]
    async fn file_upload_reads_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("report.txt");
        std::fs::write(&file, b"quarterly").unwrap();

        let request = storage_request(&StorageArgs {
            path: "reports".into(),
            file: Some(file),
            ..args(StorageType::Filesystem, StorageOperation::Create)
        })
        .await
        .unwrap();

        assert_eq!(request.file(), Some(("report.txt", &b"quarterly"[..])));
    }

    #[tokio::test]
    async fn database_upload_is_unsupported() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("rows.csv");
        std::fs::write(&file, b"a,b").unwrap();

        let err = storage_request(&StorageArgs {
            file: Some(file),
            ..args(StorageType::Database, StorageOperation::Create)
        })
        .await
        .unwrap_err();

        match err {
            CliError::Client(inner) => assert_eq!(inner.kind(), ErrorKind::Unsupported),
            other => panic!("unexpected {other:?}"),
        }
    }
}
