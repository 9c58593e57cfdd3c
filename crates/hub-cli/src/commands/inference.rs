//! Inference command implementation.

use std::io::Write;

use hub_proto::ChatCompletionRequest;
use hub_proto::inference::first_choice_content;

use super::parse_parameters;
use crate::cli::InferenceArgs;
use crate::config::Settings;
use crate::error::CliError;
use crate::output::{InferenceReply, OutputFormat};

/// Inference command executor.
pub struct InferenceCommand<'a> {
    settings: &'a Settings,
}

impl<'a> InferenceCommand<'a> {
    /// Create a new inference command.
    #[must_use]
    pub const fn new(settings: &'a Settings) -> Self {
        Self { settings }
    }

    /// Send the prompt to the node and print the answer.
    ///
    /// # Errors
    ///
    /// Returns an error if the parameters are invalid or the node call fails.
    pub async fn execute<W: Write>(
        &self,
        writer: &mut W,
        format: &OutputFormat,
        args: &InferenceArgs,
    ) -> Result<(), CliError> {
        let request = chat_request(args)?;
        let node = self.settings.node_client().await?;

        let response = node.inference(&request).await?;
        let reply = InferenceReply {
            model: request.model,
            content: first_choice_content(&response).map(str::to_string),
            response,
        };
        format.write(writer, &reply)
    }
}

/// Build the chat request for a single prompt.
pub fn chat_request(args: &InferenceArgs) -> Result<ChatCompletionRequest, CliError> {
    let mut request = ChatCompletionRequest::prompt(&args.model, &args.prompt);
    if let Some(raw) = args.parameters.as_deref() {
        request.parameters = parse_parameters(raw)?;
    }
    Ok(request)
}
