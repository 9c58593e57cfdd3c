//! Node listing command.

use std::io::Write;

use crate::config::Settings;
use crate::error::CliError;
use crate::output::{NodeList, OutputFormat, ServerList};

/// Node command executor.
pub struct NodesCommand<'a> {
    settings: &'a Settings,
}

impl<'a> NodesCommand<'a> {
    /// Create a new nodes command.
    #[must_use]
    pub const fn new(settings: &'a Settings) -> Self {
        Self { settings }
    }

    /// List nodes, or their servers when `servers` is set.
    ///
    /// # Errors
    ///
    /// Returns an error if sign-in or the registry query fails.
    pub async fn execute<W: Write>(
        &self,
        writer: &mut W,
        format: &OutputFormat,
        servers: bool,
    ) -> Result<(), CliError> {
        let (hub, session) = self.settings.signed_in_hub().await?;

        if servers {
            let servers = hub.list_servers(&session).await?;
            format.write(writer, &ServerList { servers })
        } else {
            let nodes = hub.list_nodes(&session).await?;
            format.write(writer, &NodeList { nodes })
        }
    }
}
