//! Install a module on the node.

use std::io::Write;

use hub_client::{CreateRequest, Dispatcher, dispatch::parse_node_list};
use hub_proto::NodeAddress;

use super::parse_names;
use crate::cli::CreateArgs;
use crate::config::Settings;
use crate::error::CliError;
use crate::output::{OutputFormat, Raw};

/// Create command executor.
pub struct CreateCommand<'a> {
    settings: &'a Settings,
}

impl<'a> CreateCommand<'a> {
    /// Create a new create command.
    #[must_use]
    pub const fn new(settings: &'a Settings) -> Self {
        Self { settings }
    }

    /// Build the deployment and submit it to the node.
    ///
    /// # Errors
    ///
    /// Returns an error if the arguments are invalid or the node call fails.
    pub async fn execute<W: Write>(
        &self,
        writer: &mut W,
        format: &OutputFormat,
        args: &CreateArgs,
    ) -> Result<(), CliError> {
        let request = create_request(args)?;
        let key = self.settings.consumer_key()?;
        let node = self.settings.node_client().await?;

        let result = Dispatcher::new(&node, &key).create(&request).await?;
        format.write(writer, &Raw(result))
    }
}

/// Turn create arguments into a request, pairing modules with their nodes.
pub fn create_request(args: &CreateArgs) -> Result<CreateRequest, CliError> {
    Ok(CreateRequest {
        module: args.module.clone(),
        agents: pair(
            "agent",
            args.agent_modules.as_deref(),
            args.agent_nodes.as_deref(),
        )?,
        environments: pair(
            "environment",
            args.environment_modules.as_deref(),
            args.environment_nodes.as_deref(),
        )?,
    })
}

fn pair(
    what: &str,
    modules: Option<&str>,
    nodes: Option<&str>,
) -> Result<Vec<(String, NodeAddress)>, CliError> {
    let modules = parse_names(modules);
    let nodes = nodes.map(parse_node_list).transpose()?.unwrap_or_default();

    if modules.len() != nodes.len() {
        return Err(CliError::InvalidArgument(format!(
            "got {} {what} module(s) but {} {what} node(s)",
            modules.len(),
            nodes.len()
        )));
    }
    Ok(modules.into_iter().zip(nodes).collect())
}
