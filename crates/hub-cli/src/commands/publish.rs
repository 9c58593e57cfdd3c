//! Publish command: register a module manifest with the hub.
//!
//! The manifest is a YAML file describing one module and, optionally, the
//! modules it deploys alongside itself:
//!
//! ```yaml
//! name: debate
//! type: orchestrator
//! description: Two agents argue
//! parameters: "{topic: str}"
//! module_url: https://github.com/example/debate
//! subdeployments:
//!   - name: debater
//!     type: agent
//!     description: Argues one side
//!     parameters: "{side: str}"
//!     module_url: https://github.com/example/debater
//! ```

use std::io::Write;
use std::path::Path;

use hub_proto::{ModuleKind, ModuleRecord};
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use crate::cli::PublishArgs;
use crate::config::Settings;
use crate::error::CliError;
use crate::output::{ModuleList, OutputFormat};

/// One module entry in a manifest.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ManifestModule {
    /// Module name.
    pub name: String,
    /// Module kind; agents when omitted.
    #[serde(rename = "type", default = "default_kind")]
    pub kind: ModuleKind,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
    /// Parameter schema.
    #[serde(default)]
    pub parameters: Value,
    /// Where the module's code lives.
    #[serde(default)]
    pub module_url: Option<String>,
    /// Module version.
    #[serde(default = "default_version")]
    pub module_version: String,
    /// Entrypoint inside the module package.
    #[serde(default = "default_entrypoint")]
    pub module_entrypoint: String,
    /// How the node executes the module.
    #[serde(default = "default_execution_type")]
    pub execution_type: String,
}

/// A module manifest.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Manifest {
    /// The module being published.
    #[serde(flatten)]
    pub module: ManifestModule,
    /// Modules deployed with it.
    #[serde(default)]
    pub subdeployments: Vec<ManifestModule>,
}

const fn default_kind() -> ModuleKind {
    ModuleKind::Agent
}

fn default_version() -> String {
    "0.1".into()
}

fn default_entrypoint() -> String {
    "run.py".into()
}

fn default_execution_type() -> String {
    "package".into()
}

impl Manifest {
    /// Read and parse a manifest file.
    pub async fn load(path: &Path) -> Result<Self, CliError> {
        let text = tokio::fs::read_to_string(path).await.map_err(|e| {
            CliError::InvalidArgument(format!("cannot read {}: {e}", path.display()))
        })?;
        serde_yaml::from_str(&text).map_err(|e| CliError::parse(path.display().to_string(), e))
    }

    /// Registry records to create, main module first.
    ///
    /// `module_url` overrides the main module's URL. Sub-deployments are only
    /// included when `subdeployments` is set.
    pub fn records(
        &self,
        author: &str,
        module_url: Option<&str>,
        subdeployments: bool,
    ) -> Result<Vec<(ModuleKind, ModuleRecord)>, CliError> {
        let mut records = vec![to_record(&self.module, author, module_url)?];
        if subdeployments {
            for module in &self.subdeployments {
                records.push(to_record(module, author, None)?);
            }
        }
        Ok(records)
    }
}

fn to_record(
    module: &ManifestModule,
    author: &str,
    url_override: Option<&str>,
) -> Result<(ModuleKind, ModuleRecord), CliError> {
    let module_url = url_override
        .map(str::to_string)
        .or_else(|| module.module_url.clone())
        .ok_or_else(|| {
            CliError::InvalidArgument(format!(
                "module '{}' has no module_url; set it in the manifest or pass -r <URL>",
                module.name
            ))
        })?;

    let record = ModuleRecord {
        id: Some(ModuleRecord::record_id(module.kind, &module.name)),
        name: module.name.clone(),
        author: author.to_string(),
        description: module.description.clone(),
        parameters: module.parameters.clone(),
        module_url,
        module_version: module.module_version.clone(),
        module_type: module.kind.as_str().to_string(),
        module_entrypoint: module.module_entrypoint.clone(),
        execution_type: module.execution_type.clone(),
    };
    Ok((module.kind, record))
}

/// Publish command executor.
pub struct PublishCommand<'a> {
    settings: &'a Settings,
}

impl<'a> PublishCommand<'a> {
    /// Create a new publish command.
    #[must_use]
    pub const fn new(settings: &'a Settings) -> Self {
        Self { settings }
    }

    /// Register the manifest's modules with the hub.
    ///
    /// # Errors
    ///
    /// Returns an error if `-r` is missing, the manifest is invalid or a
    /// registry call fails.
    pub async fn execute<W: Write>(
        &self,
        writer: &mut W,
        format: &OutputFormat,
        args: &PublishArgs,
    ) -> Result<(), CliError> {
        let Some(url_override) = args.register.as_ref() else {
            return Err(CliError::InvalidArgument(
                "publish only registers modules with the hub; pass -r [URL]".into(),
            ));
        };

        let manifest = Manifest::load(&args.manifest).await?;
        let author = format!("user:{}", self.settings.consumer_key()?.public_key_hex());
        let records = manifest.records(&author, url_override.as_deref(), args.subdeployments)?;

        let (hub, session) = self.settings.signed_in_hub().await?;
        let mut published = Vec::with_capacity(records.len());
        for (kind, record) in &records {
            let created = hub.create_module(&session, *kind, record).await?;
            info!(module = %record.name, %kind, "Published module");
            published.push(created);
        }

        let list = ModuleList {
            label: "published modules".into(),
            modules: published,
        };
        format.write(writer, &list)
    }
}
