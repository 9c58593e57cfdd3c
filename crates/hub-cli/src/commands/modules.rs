//! Registry module commands (`agents`, `tools`, `orchestrators`, ...).
//!
//! Provides, per module kind:
//! - Listing all modules
//! - Showing one module
//! - Registering a module from `key=value` metadata
//! - Deleting a module

use std::collections::HashMap;
use std::io::Write;

use hub_proto::{ModuleKind, ModuleRecord};
use serde_json::Value;

use super::split_pairs;
use crate::cli::ModuleArgs;
use crate::config::Settings;
use crate::error::CliError;
use crate::output::{Message, ModuleList, OutputFormat};

/// Metadata keys that must be supplied when registering a module.
pub const REQUIRED_METADATA: [&str; 3] = ["description", "parameters", "module_url"];

/// Registry module command executor.
pub struct ModulesCommand<'a> {
    settings: &'a Settings,
    kind: ModuleKind,
}

impl<'a> ModulesCommand<'a> {
    /// Create a new module command for `kind`.
    #[must_use]
    pub const fn new(settings: &'a Settings, kind: ModuleKind) -> Self {
        Self { settings, kind }
    }

    /// Execute the command.
    ///
    /// # Errors
    ///
    /// Returns an error if arguments are invalid or the hub call fails.
    pub async fn execute<W: Write>(
        &self,
        writer: &mut W,
        format: &OutputFormat,
        args: &ModuleArgs,
    ) -> Result<(), CliError> {
        let Some(name) = args.name.as_deref() else {
            let (hub, session) = self.settings.signed_in_hub().await?;
            let modules = hub.list_modules(&session, self.kind).await?;
            let list = ModuleList {
                label: plural(self.kind),
                modules,
            };
            return format.write(writer, &list);
        };

        if name.split_whitespace().count() != 1 {
            return Err(CliError::InvalidArgument(format!(
                "module name must be a single word, got '{name}'"
            )));
        }

        if args.delete {
            let (hub, session) = self.settings.signed_in_hub().await?;
            let id = ModuleRecord::record_id(self.kind, name);
            let message = if hub.delete_module(&session, self.kind, name).await? {
                Message::success(format!("Deleted {id}"))
            } else {
                Message::info(format!("{} {id} does not exist", self.kind.label()))
            };
            return format.write(writer, &message);
        }

        if let Some(metadata) = args.metadata.as_deref() {
            let public_key = self.settings.consumer_key()?.public_key_hex();
            let record = module_record_from_metadata(self.kind, name, metadata, &public_key)?;
            let (hub, session) = self.settings.signed_in_hub().await?;
            let created = hub.create_module(&session, self.kind, &record).await?;
            return format.write(writer, &created);
        }

        let (hub, session) = self.settings.signed_in_hub().await?;
        let record = hub.get_module(&session, self.kind, name).await?;
        format.write(writer, &record)
    }
}

/// Build a registry record from `key=value` metadata.
///
/// # Errors
///
/// Returns [`CliError::InvalidArgument`] when the metadata cannot be split or
/// a key from [`REQUIRED_METADATA`] is missing.
pub fn module_record_from_metadata(
    kind: ModuleKind,
    name: &str,
    metadata: &str,
    public_key: &str,
) -> Result<ModuleRecord, CliError> {
    let mut fields: HashMap<String, String> = split_pairs(metadata)?.into_iter().collect();

    let missing: Vec<&str> = REQUIRED_METADATA
        .into_iter()
        .filter(|key| !fields.contains_key(*key))
        .collect();
    if !missing.is_empty() {
        return Err(CliError::InvalidArgument(format!(
            "missing required metadata: {}",
            missing.join(", ")
        )));
    }

    let mut take = |key: &str, default: &str| fields.remove(key).unwrap_or_else(|| default.to_string());

    Ok(ModuleRecord {
        id: Some(ModuleRecord::record_id(kind, name)),
        name: name.to_string(),
        author: format!("user:{public_key}"),
        description: take("description", ""),
        parameters: Value::String(take("parameters", "")),
        module_url: take("module_url", ""),
        module_version: take("module_version", "0.1"),
        module_type: take("module_type", kind.as_str()),
        module_entrypoint: take("module_entrypoint", "run.py"),
        execution_type: take("execution_type", "package"),
    })
}

/// Plural label for listing headings.
pub fn plural(kind: ModuleKind) -> String {
    match kind {
        ModuleKind::KnowledgeBase => "knowledge bases".to_string(),
        ModuleKind::Memory => "memories".to_string(),
        other => format!("{}s", other.as_str()),
    }
}
