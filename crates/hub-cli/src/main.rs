//! Agent hub CLI binary entrypoint.
//!
//! This is the main entry point for the `hub` command-line tool.

use std::error::Error as _;
use std::io;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use hub_cli::cli::{Cli, Commands};
use hub_cli::commands::{
    CreateCommand, InferenceCommand, ModulesCommand, NodesCommand, PublishCommand, RunCommand,
    SignupCommand, StorageCommand, signup::TerminalPrompt,
};
use hub_cli::config::{DOTENV_FILE, DotEnv, Settings};
use hub_cli::output::OutputFormat;

/// Directives added by `--verbose`.
const VERBOSE_DIRECTIVES: [&str; 3] = ["hub_cli=debug", "hub_client=debug", "hub_proto=debug"];

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            let mut source = e.source();
            while let Some(cause) = source {
                eprintln!("  caused by: {cause}");
                source = cause.source();
            }
            ExitCode::FAILURE
        }
    }
}

/// Log to stderr at `warn` unless `RUST_LOG` says otherwise.
fn init_tracing(verbose: bool) {
    let mut filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    if verbose {
        for directive in VERBOSE_DIRECTIVES {
            if let Ok(directive) = directive.parse() {
                filter = filter.add_directive(directive);
            }
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<(), hub_cli::CliError> {
    let mut dotenv = DotEnv::load(DOTENV_FILE)?;
    let settings = Settings::resolve(&cli.global, &dotenv);
    tracing::debug!(?settings, "Resolved settings");

    let format = OutputFormat::new(cli.format);
    let mut stdout = io::stdout().lock();

    match &cli.command {
        Commands::Nodes { servers } => {
            let cmd = NodesCommand::new(&settings);
            cmd.execute(&mut stdout, &format, *servers).await?;
        }
        Commands::Create(args) => {
            let cmd = CreateCommand::new(&settings);
            cmd.execute(&mut stdout, &format, args).await?;
        }
        Commands::Run(args) => {
            let cmd = RunCommand::new(&settings);
            cmd.execute(&mut stdout, &format, args).await?;
        }
        Commands::Inference(args) => {
            let cmd = InferenceCommand::new(&settings);
            cmd.execute(&mut stdout, &format, args).await?;
        }
        Commands::Storage(args) => {
            let cmd = StorageCommand::new(&settings);
            cmd.execute(&mut stdout, &format, args).await?;
        }
        Commands::Signup => {
            let cmd = SignupCommand::new(&settings);
            cmd.execute(&mut stdout, &format, &mut TerminalPrompt, &mut dotenv)
                .await?;
        }
        Commands::Publish(args) => {
            let cmd = PublishCommand::new(&settings);
            cmd.execute(&mut stdout, &format, args).await?;
        }
        Commands::Agents(_)
        | Commands::Tools(_)
        | Commands::Orchestrators(_)
        | Commands::Environments(_)
        | Commands::Personas(_)
        | Commands::Memories(_)
        | Commands::Kbs(_) => {
            if let Some((kind, args)) = cli.command.module_kind() {
                let cmd = ModulesCommand::new(&settings, kind);
                cmd.execute(&mut stdout, &format, args).await?;
            }
        }
    }

    Ok(())
}
