//! Module kinds, identifiers and registry records.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ProtoError;

/// Kind of executable module hosted by the hub.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleKind {
    /// A single agent.
    Agent,
    /// A tool callable by agents.
    Tool,
    /// A multi-agent orchestrator.
    Orchestrator,
    /// A shared environment.
    Environment,
    /// A knowledge base.
    #[serde(rename = "kb")]
    KnowledgeBase,
    /// A memory module.
    Memory,
    /// A persona definition. Personas are registered but never run directly.
    Persona,
}

impl ModuleKind {
    /// Every kind, in registry listing order.
    pub const ALL: [Self; 7] = [
        Self::Agent,
        Self::Tool,
        Self::Orchestrator,
        Self::Environment,
        Self::KnowledgeBase,
        Self::Memory,
        Self::Persona,
    ];

    /// Wire name of the kind, also used as the registry table name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Agent => "agent",
            Self::Tool => "tool",
            Self::Orchestrator => "orchestrator",
            Self::Environment => "environment",
            Self::KnowledgeBase => "kb",
            Self::Memory => "memory",
            Self::Persona => "persona",
        }
    }

    /// Human-readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Agent => "Agent",
            Self::Tool => "Tool",
            Self::Orchestrator => "Orchestrator",
            Self::Environment => "Environment",
            Self::KnowledgeBase => "Knowledge Base",
            Self::Memory => "Memory Module",
            Self::Persona => "Persona",
        }
    }
}

impl fmt::Display for ModuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModuleKind {
    type Err = ProtoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| ProtoError::UnsupportedModuleType(s.to_string()))
    }
}

/// A module reference as typed by a user: `name` or `<type>:<name>`.
///
/// An identifier without a type prefix resolves to an agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleIdentifier {
    raw: String,
    type_name: String,
    name: String,
}

impl ModuleIdentifier {
    /// Type assumed for identifiers without a prefix.
    pub const DEFAULT_TYPE: &'static str = "agent";

    /// Split an identifier into its type and name.
    ///
    /// The type is everything before the first `:`, the name everything after
    /// the last `:`.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        let (type_name, name) = match raw.split_once(':') {
            Some((type_name, _)) => {
                let name = raw.rsplit(':').next().unwrap_or_default();
                (type_name, name)
            }
            None => (Self::DEFAULT_TYPE, raw),
        };

        Self {
            raw: raw.to_string(),
            type_name: type_name.to_string(),
            name: name.to_string(),
        }
    }

    /// The identifier exactly as given.
    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The resolved type string, which may not name a known kind.
    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// The module name without its type prefix.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Resolve the type string to a module kind.
    ///
    /// # Errors
    ///
    /// Returns [`ProtoError::UnsupportedModuleType`] for unknown types and
    /// [`ProtoError::MissingField`] when the name is empty (`agent:`).
    pub fn kind(&self) -> Result<ModuleKind, ProtoError> {
        let kind = self.type_name.parse()?;
        if self.name.is_empty() {
            return Err(ProtoError::MissingField("module name"));
        }
        Ok(kind)
    }
}

impl fmt::Display for ModuleIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Reference to a module embedded in a deployment.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ModuleRef {
    /// Registry id, e.g. `agent:hello_world`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Module name.
    pub name: String,
    /// Module kind.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module_type: Option<ModuleKind>,
}

impl ModuleRef {
    /// Reference a module by name only.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            module_type: None,
        }
    }

    /// Reference a module from a parsed identifier.
    #[must_use]
    pub fn from_identifier(identifier: &ModuleIdentifier, kind: ModuleKind) -> Self {
        Self {
            id: Some(identifier.raw().to_string()),
            name: identifier.name().to_string(),
            module_type: Some(kind),
        }
    }
}

/// A module entry stored in the hub registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleRecord {
    /// Record id, `<kind>:<name>`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Module name.
    pub name: String,
    /// Author, usually `user:<public key>`.
    #[serde(default)]
    pub author: String,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
    /// Parameter schema; stored as given by the publisher.
    #[serde(default)]
    pub parameters: Value,
    /// Where the module's code lives.
    #[serde(default)]
    pub module_url: String,
    /// Module version.
    #[serde(default)]
    pub module_version: String,
    /// Module type as recorded by the registry.
    #[serde(default)]
    pub module_type: String,
    /// Entrypoint inside the module package.
    #[serde(default)]
    pub module_entrypoint: String,
    /// How the node executes the module.
    #[serde(default)]
    pub execution_type: String,
}

impl ModuleRecord {
    /// Registry id for a module of `kind` named `name`.
    #[must_use]
    pub fn record_id(kind: ModuleKind, name: &str) -> String {
        if name.contains(':') {
            name.trim().to_string()
        } else {
            format!("{kind}:{}", name.trim())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use test_case::test_case;

    #[test_case("hello_world", "agent", "hello_world" ; "bare name defaults to agent")]
    #[test_case("tool:summarizer", "tool", "summarizer" ; "tool prefix")]
    #[test_case("kb:wiki", "kb", "wiki" ; "knowledge base prefix")]
    #[test_case("orchestrator:a:b", "orchestrator", "b" ; "name after last colon")]
    #[test_case("unknown:thing", "unknown", "thing" ; "unknown type kept verbatim")]
    fn parse_identifier(raw: &str, type_name: &str, name: &str) {
        let id = ModuleIdentifier::parse(raw);
        assert_eq!(id.type_name(), type_name);
        assert_eq!(id.name(), name);
        assert_eq!(id.raw(), raw);
    }

    #[test]
    fn unknown_type_is_unsupported() {
        let err = ModuleIdentifier::parse("widget:x").kind().unwrap_err();
        assert!(matches!(err, ProtoError::UnsupportedModuleType(t) if t == "widget"));
    }

    #[test_case("agent:" ; "empty after prefix")]
    #[test_case("tool:x:" ; "empty after last colon")]
    #[test_case("" ; "empty identifier")]
    fn empty_name_is_rejected(raw: &str) {
        let err = ModuleIdentifier::parse(raw).kind().unwrap_err();
        assert!(matches!(err, ProtoError::MissingField("module name")));
    }

    #[test]
    fn kind_round_trips_through_str() {
        for kind in ModuleKind::ALL {
            assert_eq!(kind.as_str().parse::<ModuleKind>().unwrap(), kind);
        }
    }

    #[test]
    fn knowledge_base_serialises_as_kb() {
        let json = serde_json::to_string(&ModuleKind::KnowledgeBase).unwrap();
        assert_eq!(json, "\"kb\"");
    }

    #[test]
    fn record_id_keeps_existing_prefix() {
        assert_eq!(ModuleRecord::record_id(ModuleKind::Tool, "calc"), "tool:calc");
        assert_eq!(ModuleRecord::record_id(ModuleKind::Tool, "tool:calc"), "tool:calc");
    }

    #[test]
    fn record_tolerates_missing_fields() {
        let record: ModuleRecord =
            serde_json::from_value(serde_json::json!({"name": "x", "id": "agent:x"})).unwrap();
        assert_eq!(record.name, "x");
        assert!(record.module_url.is_empty());
    }

    proptest! {
        #[test]
        fn colonless_names_are_agents(name in "[a-zA-Z0-9_-]{1,24}") {
            let id = ModuleIdentifier::parse(&name);
            prop_assert_eq!(id.kind().unwrap(), ModuleKind::Agent);
            prop_assert_eq!(id.name(), name.as_str());
        }

        #[test]
        fn prefixed_names_keep_their_type(
            kind in prop::sample::select(ModuleKind::ALL.to_vec()),
            name in "[a-z0-9_]{1,16}",
        ) {
            let id = ModuleIdentifier::parse(&format!("{kind}:{name}"));
            prop_assert_eq!(id.kind().unwrap(), kind);
            prop_assert_eq!(id.name(), name.as_str());
        }
    }
}
