//! Interactive hub sign-up.

use std::io::Write;

use dialoguer::{Input, Password};
use hub_client::{CredentialPrompt, Credentials, HubSession};

use crate::config::{DotEnv, Settings};
use crate::error::CliError;
use crate::output::{Message, OutputFormat};

/// Asks for credentials on the terminal.
#[derive(Debug, Default)]
pub struct TerminalPrompt;

impl CredentialPrompt for TerminalPrompt {
    fn ask(&mut self) -> Option<Credentials> {
        let username: String = Input::new()
            .with_prompt("Username")
            .interact_text()
            .ok()?;
        let password = Password::new()
            .with_prompt("Password")
            .with_confirmation("Confirm password", "Passwords do not match")
            .interact()
            .ok()?;
        Some(Credentials { username, password })
    }

    fn rejected(&mut self, reason: &str) {
        eprintln!("Sign-up failed: {reason}");
    }
}

/// Signup command executor.
pub struct SignupCommand<'a> {
    settings: &'a Settings,
}

impl<'a> SignupCommand<'a> {
    /// Create a new signup command.
    #[must_use]
    pub const fn new(settings: &'a Settings) -> Self {
        Self { settings }
    }

    /// Create an account, sign in with it and save the credentials to `dotenv`.
    ///
    /// # Errors
    ///
    /// Returns an error if the hub is not configured, sign-up is cancelled or
    /// the credentials cannot be saved.
    pub async fn execute<W: Write>(
        &self,
        writer: &mut W,
        format: &OutputFormat,
        prompt: &mut impl CredentialPrompt,
        dotenv: &mut DotEnv,
    ) -> Result<(), CliError> {
        let hub = self.settings.hub_client()?;
        let mut session = HubSession::new();
        let credentials = hub.signup(&mut session, prompt).await?;

        dotenv.append(&[
            ("HUB_USERNAME", credentials.username.as_str()),
            ("HUB_PASSWORD", credentials.password.as_str()),
        ])?;

        let message = Message::success(format!(
            "Signed up as {} ({}); credentials saved to {}",
            credentials.username,
            session.user_id().unwrap_or("unknown id"),
            dotenv.path().display()
        ));
        format.write(writer, &message)
    }
}
