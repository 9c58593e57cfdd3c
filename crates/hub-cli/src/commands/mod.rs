//! CLI command implementations.
//!
//! Each submodule implements a specific CLI command:
//! - [`modules`] - Registry modules of every kind (list, show, register, delete)
//! - [`nodes`] - Registered nodes and servers
//! - [`create`] - Install a module on a node
//! - [`run`] - Run a module and wait for the result
//! - [`inference`] - Chat completion on a node
//! - [`storage`] - Node storage
//! - [`signup`] - Hub account creation
//! - [`publish`] - Register a module manifest with the hub

pub mod create;
pub mod inference;
pub mod modules;
pub mod nodes;
pub mod publish;
pub mod run;
pub mod signup;
pub mod storage;

pub use create::CreateCommand;
pub use inference::InferenceCommand;
pub use modules::ModulesCommand;
pub use nodes::NodesCommand;
pub use publish::PublishCommand;
pub use run::RunCommand;
pub use signup::SignupCommand;
pub use storage::StorageCommand;

use serde_json::{Map, Value};

use crate::error::CliError;

/// Parse caller parameters given as a JSON object or as `key=value` pairs.
///
/// Pairs are split shell-style, so quoted values may contain spaces. A value
/// that looks like a JSON object is parsed as one; everything else stays a
/// string.
pub fn parse_parameters(raw: &str) -> Result<Map<String, Value>, CliError> {
    if let Ok(value) = serde_json::from_str::<Value>(raw) {
        return match value {
            Value::Object(map) => Ok(map),
            other => Err(CliError::InvalidArgument(format!(
                "parameters must be a JSON object, got {other}"
            ))),
        };
    }

    let mut parsed = Map::new();
    for (key, value) in split_pairs(raw)? {
        let value = if value.starts_with('{') && value.ends_with('}') {
            serde_json::from_str(&value).unwrap_or(Value::String(value))
        } else {
            Value::String(value)
        };
        parsed.insert(key, value);
    }
    Ok(parsed)
}

/// Split `key=value ...` into pairs, honouring shell quoting.
pub fn split_pairs(raw: &str) -> Result<Vec<(String, String)>, CliError> {
    let words = shell_words::split(raw)
        .map_err(|e| CliError::InvalidArgument(format!("cannot split '{raw}': {e}")))?;

    words
        .into_iter()
        .map(|word| {
            word.split_once('=')
                .map(|(key, value)| (key.trim().to_string(), value.to_string()))
                .filter(|(key, _)| !key.is_empty())
                .ok_or_else(|| {
                    CliError::InvalidArgument(format!("expected key=value, got '{word}'"))
                })
        })
        .collect()
}

/// Split a comma-separated list of names. Blank entries are skipped.
pub fn parse_names(raw: Option<&str>) -> Vec<String> {
    raw.map(|raw| {
        raw.split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use test_case::test_case;

    #[test]
    fn json_parameters() {
        let parsed = parse_parameters(r#"{"topic": "tabs", "rounds": 3}"#).unwrap();
        assert_eq!(parsed["topic"], "tabs");
        assert_eq!(parsed["rounds"], 3);
    }

    #[test]
    fn json_parameters_must_be_an_object() {
        assert!(matches!(
            parse_parameters("[1, 2]"),
            Err(CliError::InvalidArgument(_))
        ));
    }

    #[test]
    fn key_value_parameters() {
        let parsed = parse_parameters(r#"firstname=Ada surname="Lovelace King" config='{"a":1}'"#).unwrap();
        assert_eq!(parsed["firstname"], "Ada");
        assert_eq!(parsed["surname"], "Lovelace King");
        assert_eq!(parsed["config"], json!({"a": 1}));
    }

    #[test]
    fn brace_value_that_is_not_json_stays_a_string() {
        let parsed = parse_parameters("template={name}").unwrap();
        assert_eq!(parsed["template"], "{name}");
    }

    #[test]
    fn values_may_contain_equals() {
        let pairs = split_pairs("query=a=b").unwrap();
        assert_eq!(pairs, vec![("query".to_string(), "a=b".to_string())]);
    }

    #[test_case("novalue" ; "missing equals")]
    #[test_case("=x" ; "empty key")]
    #[test_case("a='unterminated" ; "bad quoting")]
    fn malformed_pairs_are_rejected(raw: &str) {
        assert!(matches!(split_pairs(raw), Err(CliError::InvalidArgument(_))));
    }

    #[test]
    fn names_are_trimmed() {
        assert_eq!(parse_names(Some(" a, ,b ")), vec!["a", "b"]);
        assert!(parse_names(None).is_empty());
    }
}
