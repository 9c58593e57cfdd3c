//! Output formatting for CLI commands.
//!
//! Supports table (human-readable) and JSON output formats.

use std::io::Write;

use hub_client::StorageOutcome;
use hub_proto::{ModuleRecord, NodeRecord, Run, ServerRecord, StoragePayload};
use serde::Serialize;
use serde_json::Value;

use crate::cli::Format;
use crate::error::CliError;

/// Output formatter that handles both table and JSON output.
#[derive(Debug, Clone)]
pub struct OutputFormat {
    format: Format,
}

impl OutputFormat {
    /// Create a new output formatter.
    #[must_use]
    pub const fn new(format: Format) -> Self {
        Self { format }
    }

    /// Get the current format.
    #[must_use]
    pub const fn format(&self) -> Format {
        self.format
    }

    /// Check if JSON format is selected.
    #[must_use]
    pub const fn is_json(&self) -> bool {
        matches!(self.format, Format::Json)
    }

    /// Write a serializable value to the output.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write<W, T>(&self, writer: &mut W, value: &T) -> Result<(), CliError>
    where
        W: Write,
        T: Serialize + TableDisplay,
    {
        match self.format {
            Format::Json => {
                serde_json::to_writer_pretty(&mut *writer, value)
                    .map_err(|e| CliError::Format(format!("JSON serialization failed: {e}")))?;
                writeln!(writer)?;
            }
            Format::Table => {
                value.write_table(writer)?;
            }
        }
        Ok(())
    }

    /// Write a serializable value to a string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_string<T>(&self, value: &T) -> Result<String, CliError>
    where
        T: Serialize + TableDisplay,
    {
        let mut buf = Vec::new();
        self.write(&mut buf, value)?;
        String::from_utf8(buf).map_err(|e| CliError::Format(format!("UTF-8 error: {e}")))
    }
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self::new(Format::Table)
    }
}

/// Trait for types that can be displayed as a table.
pub trait TableDisplay {
    /// Write the value as a human-readable table.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError>;
}

/// Registry modules of one kind.
#[derive(Debug, Clone, Serialize)]
pub struct ModuleList {
    /// Plural label used in headings, e.g. `agents`.
    #[serde(skip)]
    pub label: String,
    /// Modules.
    pub modules: Vec<ModuleRecord>,
}

impl TableDisplay for ModuleList {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        if self.modules.is_empty() {
            writeln!(writer, "No {} found", self.label)?;
            return Ok(());
        }

        writeln!(
            writer,
            "{:<24}  {:<32}  {:<24}  {:<40}  {:<8}",
            "NAME", "ID", "AUTHOR", "DESCRIPTION", "VERSION"
        )?;
        writeln!(writer, "{}", "─".repeat(136))?;

        for module in &self.modules {
            writeln!(
                writer,
                "{:<24}  {:<32}  {:<24}  {:<40}  {:<8}",
                truncate(&module.name, 24),
                truncate(module.id.as_deref().unwrap_or("-"), 32),
                truncate(&module.author, 24),
                truncate(&module.description, 40),
                module.module_version,
            )?;
        }

        writeln!(writer)?;
        writeln!(writer, "Total {}: {}", self.label, self.modules.len())?;
        Ok(())
    }
}

impl TableDisplay for ModuleRecord {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(writer, "Module: {}", self.name)?;
        writeln!(writer, "══════════════════════════════════")?;
        writeln!(writer, "ID:           {}", self.id.as_deref().unwrap_or("-"))?;
        writeln!(writer, "Type:         {}", self.module_type)?;
        writeln!(writer, "Author:       {}", self.author)?;
        writeln!(writer, "Description:  {}", self.description)?;
        writeln!(writer, "Parameters:   {}", compact(&self.parameters))?;
        writeln!(writer, "Module URL:   {}", self.module_url)?;
        writeln!(writer, "Version:      {}", self.module_version)?;
        writeln!(writer, "Entrypoint:   {}", self.module_entrypoint)?;
        writeln!(writer, "Execution:    {}", self.execution_type)?;
        Ok(())
    }
}

/// Nodes registered with the hub.
#[derive(Debug, Clone, Serialize)]
pub struct NodeList {
    /// Nodes.
    pub nodes: Vec<NodeRecord>,
}

impl TableDisplay for NodeList {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        if self.nodes.is_empty() {
            writeln!(writer, "No nodes found")?;
            return Ok(());
        }

        writeln!(
            writer,
            "{:<28}  {:<16}  {:<20}  {:<8}  {:<8}  {:>7}  {:<8}  {:>9}  {:>4}  {}",
            "ID", "IP", "OWNER", "OS", "ARCH", "SERVERS", "TYPE", "HTTP PORT", "GPUS", "MODELS"
        )?;
        writeln!(writer, "{}", "─".repeat(140))?;

        for node in &self.nodes {
            let port = node
                .http_port
                .map_or_else(|| "-".to_string(), |p| p.to_string());
            writeln!(
                writer,
                "{:<28}  {:<16}  {:<20}  {:<8}  {:<8}  {:>7}  {:<8}  {:>9}  {:>4}  {}",
                truncate(&node.id, 28),
                truncate(&node.ip, 16),
                truncate(&node.owner, 20),
                truncate(&node.os, 8),
                truncate(&node.arch, 8),
                node.num_servers,
                truncate(&node.server_type, 8),
                port,
                node.num_gpus,
                node.models.join(","),
            )?;
        }

        writeln!(writer)?;
        writeln!(writer, "Total nodes: {}", self.nodes.len())?;
        Ok(())
    }
}

/// Servers attached to nodes.
#[derive(Debug, Clone, Serialize)]
pub struct ServerList {
    /// Servers.
    pub servers: Vec<ServerRecord>,
}

impl TableDisplay for ServerList {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        if self.servers.is_empty() {
            writeln!(writer, "No servers found")?;
            return Ok(());
        }

        writeln!(
            writer,
            "{:<28}  {:<20}  {:<40}  {}",
            "ID", "NAME", "CONNECTION", "NODE"
        )?;
        writeln!(writer, "{}", "─".repeat(110))?;
        for server in &self.servers {
            writeln!(
                writer,
                "{:<28}  {:<20}  {:<40}  {}",
                truncate(&server.id, 28),
                truncate(&server.name, 20),
                truncate(&server.connection_string, 40),
                server.node_id,
            )?;
        }

        writeln!(writer)?;
        writeln!(writer, "Total servers: {}", self.servers.len())?;
        Ok(())
    }
}

impl TableDisplay for Run {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(writer, "Run: {}", self.id_or_unknown())?;
        writeln!(writer, "══════════════════════════════════")?;
        writeln!(writer, "Status:       {}", self.status)?;
        writeln!(writer, "Consumer:     {}", self.consumer_id)?;
        if let Some(duration) = self.duration {
            writeln!(writer, "Duration:     {duration:.2}s")?;
        }
        if let Some(message) = &self.error_message {
            writeln!(writer, "Error:        {message}")?;
        }
        writeln!(writer)?;

        if self.results.is_empty() {
            writeln!(writer, "Results: None")?;
        } else {
            writeln!(writer, "Results ({}):", self.results.len())?;
            for result in &self.results {
                match result {
                    Value::String(text) => writeln!(writer, "  {text}")?,
                    other => writeln!(writer, "  {}", compact(other))?,
                }
            }
        }
        Ok(())
    }
}

/// Answer from the node's inference endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct InferenceReply {
    /// Model that answered.
    pub model: String,
    /// First choice's message content.
    pub content: Option<String>,
    /// Full response.
    pub response: Value,
}

impl TableDisplay for InferenceReply {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        match &self.content {
            Some(content) => writeln!(writer, "{content}")?,
            None => writeln!(writer, "{}", compact(&self.response))?,
        }
        Ok(())
    }
}

/// Result of a storage command.
#[derive(Debug, Clone, Serialize)]
pub struct StorageReport {
    /// Whether the node reported success.
    pub success: bool,
    /// Node message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Structured data returned.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// Size of a returned file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bytes: Option<usize>,
    /// Where a returned file was saved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub saved_to: Option<String>,
}

impl From<StorageOutcome> for StorageReport {
    fn from(outcome: StorageOutcome) -> Self {
        let (data, bytes) = match outcome.result.data {
            Some(StoragePayload::Json(value)) => (Some(value), None),
            Some(StoragePayload::Bytes(raw)) => (None, Some(raw.len())),
            None => (None, None),
        };
        Self {
            success: outcome.result.success,
            message: outcome.result.message,
            data,
            bytes,
            saved_to: outcome.saved_to.map(|p| p.display().to_string()),
        }
    }
}

impl TableDisplay for StorageReport {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        if self.success {
            writeln!(writer, "✓ {}", self.message.as_deref().unwrap_or("Storage operation succeeded"))?;
        } else {
            writeln!(writer, "✗ {}", self.message.as_deref().unwrap_or("Storage operation failed"))?;
        }
        if let Some(path) = &self.saved_to {
            writeln!(writer, "File downloaded to: {path}")?;
        } else if let Some(bytes) = self.bytes {
            writeln!(writer, "Received {bytes} bytes")?;
        }
        if let Some(data) = &self.data {
            let pretty = serde_json::to_string_pretty(data)
                .map_err(|e| CliError::Format(format!("JSON serialization failed: {e}")))?;
            writeln!(writer, "{pretty}")?;
        }
        Ok(())
    }
}

/// Raw JSON returned by a node.
#[derive(Debug, Clone, Serialize)]
#[serde(transparent)]
pub struct Raw(pub Value);

impl TableDisplay for Raw {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        let pretty = serde_json::to_string_pretty(&self.0)
            .map_err(|e| CliError::Format(format!("JSON serialization failed: {e}")))?;
        writeln!(writer, "{pretty}")?;
        Ok(())
    }
}

/// Simple message output.
#[derive(Debug, Clone, Serialize)]
pub struct Message {
    /// Message text.
    pub message: String,
    /// Whether this is a success message.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub success: bool,
}

impl Message {
    /// Create a success message.
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            success: true,
        }
    }

    /// Create an informational message.
    #[must_use]
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            success: false,
        }
    }
}

impl TableDisplay for Message {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        if self.success {
            writeln!(writer, "✓ {}", self.message)?;
        } else {
            writeln!(writer, "{}", self.message)?;
        }
        Ok(())
    }
}

fn compact(value: &Value) -> String {
    match value {
        Value::Null => "-".to_string(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Truncate a string to a maximum number of characters.
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len > 3 {
        let kept: String = s.chars().take(max_len - 3).collect();
        format!("{kept}...")
    } else {
        s.chars().take(max_len).collect()
    }
}
