//! Run command implementation.
//!
//! Resolves the module, registers the consumer with the node when needed,
//! submits a signed run and polls until it finishes.

use std::io::Write;
use std::path::Path;
use std::time::Duration;

use hub_client::{Dispatcher, PollPolicy, RunRequest, SubNodes, dispatch::parse_node_list};
use hub_proto::{NodeAddress, RunStatus};
use serde_json::Value;
use tracing::debug;

use super::{parse_names, parse_parameters};
use crate::cli::RunArgs;
use crate::config::Settings;
use crate::error::CliError;
use crate::output::OutputFormat;

/// Run command executor.
pub struct RunCommand<'a> {
    settings: &'a Settings,
}

impl<'a> RunCommand<'a> {
    /// Create a new run command.
    #[must_use]
    pub const fn new(settings: &'a Settings) -> Self {
        Self { settings }
    }

    /// Run the module and print the finished run.
    ///
    /// # Errors
    ///
    /// Returns an error if the arguments are invalid, the dispatch fails or
    /// the run finishes with an error status.
    pub async fn execute<W: Write>(
        &self,
        writer: &mut W,
        format: &OutputFormat,
        args: &RunArgs,
    ) -> Result<(), CliError> {
        let request = run_request(args).await?;
        let key = self.settings.consumer_key()?;
        let node = self.settings.node_client().await?;

        let run = Dispatcher::new(&node, &key)
            .with_policy(poll_policy(args))
            .run(&request)
            .await?;
        format.write(writer, &run)?;

        if run.status == RunStatus::Failed {
            return Err(CliError::RunFailed {
                run_id: run.id_or_unknown().to_string(),
                message: run
                    .error_message
                    .clone()
                    .unwrap_or_else(|| "unknown error".into()),
            });
        }
        Ok(())
    }
}

/// Poll policy from `--poll-interval-ms` and `--timeout-secs`.
pub fn poll_policy(args: &RunArgs) -> PollPolicy {
    PollPolicy {
        interval: Duration::from_millis(args.poll_interval_ms),
        timeout: args.timeout_secs.map(Duration::from_secs),
    }
}

/// Build the dispatcher request from run arguments.
pub async fn run_request(args: &RunArgs) -> Result<RunRequest, CliError> {
    let inputs = run_inputs(args.parameters.as_deref(), args.file.as_deref()).await?;
    debug!(?inputs, "Parsed run inputs");

    Ok(RunRequest {
        module: args.module.clone(),
        inputs,
        sub_nodes: SubNodes {
            agents: nodes(args.agent_nodes.as_deref())?,
            tools: nodes(args.tool_nodes.as_deref())?,
            environments: nodes(args.environment_nodes.as_deref())?,
            kbs: nodes(args.kb_nodes.as_deref())?,
            memories: nodes(args.memory_nodes.as_deref())?,
        },
        personas: parse_names(args.persona.as_deref()),
    })
}

/// Inputs from `-p` or from a YAML file. Giving both is an error.
pub async fn run_inputs(
    parameters: Option<&str>,
    file: Option<&Path>,
) -> Result<Option<Value>, CliError> {
    match (parameters, file) {
        (Some(_), Some(_)) => Err(CliError::InvalidArgument(
            "pass either --parameters or --file, not both".into(),
        )),
        (Some(raw), None) => Ok(Some(Value::Object(parse_parameters(raw)?))),
        (None, Some(path)) => {
            let text = tokio::fs::read_to_string(path).await?;
            let value: Value = serde_yaml::from_str(&text)
                .map_err(|e| CliError::parse(path.display().to_string(), e))?;
            Ok(Some(value))
        }
        (None, None) => Ok(None),
    }
}

fn nodes(raw: Option<&str>) -> Result<Vec<NodeAddress>, CliError> {
    Ok(raw.map(parse_node_list).transpose()?.unwrap_or_default())
}
