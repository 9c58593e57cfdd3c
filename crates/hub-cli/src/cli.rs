//! Command-line argument parsing with clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use hub_proto::{ModuleKind, StorageOperation, StorageType};

/// Agent hub CLI - publish, run and inspect agent modules.
#[derive(Parser, Debug, Clone)]
#[command(name = "hub")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Connection settings and credentials.
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Output format.
    #[arg(long, value_enum, default_value_t = Format::Table, global = true)]
    pub format: Format,

    /// Log debug output from the hub crates.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Addresses and credentials, usually supplied through the environment.
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Hub registry URL.
    #[arg(long, env = "HUB_URL", global = true)]
    pub hub_url: Option<String>,

    /// Hub username.
    #[arg(long, env = "HUB_USERNAME", global = true)]
    pub hub_username: Option<String>,

    /// Hub password.
    #[arg(long, env = "HUB_PASSWORD", global = true, hide_env_values = true)]
    pub hub_password: Option<String>,

    /// Hex-encoded ed25519 signing key.
    #[arg(long, env = "PRIVATE_KEY", global = true, hide_env_values = true)]
    pub private_key: Option<String>,

    /// URL of a directly reachable node.
    #[arg(long, env = "NODE_URL", global = true)]
    pub node_url: Option<String>,

    /// Relay URL for an indirectly reachable node.
    #[arg(long, env = "ROUTING_URL", global = true)]
    pub routing_url: Option<String>,

    /// Node id behind the relay.
    #[arg(long, env = "INDIRECT_NODE_ID", global = true)]
    pub indirect_node_id: Option<String>,
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum Format {
    /// Human-readable table format.
    #[default]
    Table,
    /// JSON output for scripting.
    Json,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// List nodes registered with the hub.
    Nodes {
        /// List servers instead of nodes.
        #[arg(short = 's', long)]
        servers: bool,
    },

    /// List, show, register or delete agents.
    Agents(ModuleArgs),

    /// List, show, register or delete tools.
    Tools(ModuleArgs),

    /// List, show, register or delete orchestrators.
    Orchestrators(ModuleArgs),

    /// List, show, register or delete environments.
    Environments(ModuleArgs),

    /// List, show, register or delete personas.
    Personas(ModuleArgs),

    /// List, show, register or delete memory modules.
    Memories(ModuleArgs),

    /// List, show, register or delete knowledge bases.
    Kbs(ModuleArgs),

    /// Install a module on the node.
    Create(CreateArgs),

    /// Run a module on the node and wait for the result.
    Run(RunArgs),

    /// Ask the node's model a question.
    Inference(InferenceArgs),

    /// Interact with node storage.
    Storage(StorageArgs),

    /// Create a hub account.
    Signup,

    /// Register the modules described by a manifest with the hub.
    Publish(PublishArgs),
}

impl Commands {
    /// Module kind handled by a registry module subcommand.
    #[must_use]
    pub const fn module_kind(&self) -> Option<(ModuleKind, &ModuleArgs)> {
        match self {
            Self::Agents(args) => Some((ModuleKind::Agent, args)),
            Self::Tools(args) => Some((ModuleKind::Tool, args)),
            Self::Orchestrators(args) => Some((ModuleKind::Orchestrator, args)),
            Self::Environments(args) => Some((ModuleKind::Environment, args)),
            Self::Personas(args) => Some((ModuleKind::Persona, args)),
            Self::Memories(args) => Some((ModuleKind::Memory, args)),
            Self::Kbs(args) => Some((ModuleKind::KnowledgeBase, args)),
            _ => None,
        }
    }
}

/// Arguments shared by the registry module subcommands.
///
/// Without a name the modules are listed. With a name and `-p` the module is
/// registered, with `-d` it is deleted, otherwise it is shown.
#[derive(Args, Debug, Clone, Default)]
pub struct ModuleArgs {
    /// Module name.
    pub name: Option<String>,

    /// Metadata for registration, as `key=value` pairs.
    #[arg(short = 'p', long, value_name = "KEY=VALUE ...")]
    pub metadata: Option<String>,

    /// Delete the named module.
    #[arg(short, long, conflicts_with = "metadata")]
    pub delete: bool,
}

/// Arguments for the create command.
#[derive(Args, Debug, Clone)]
pub struct CreateArgs {
    /// Module to install, as `name` or `<type>:<name>`.
    pub module: String,

    /// Agent modules for an orchestrator (comma-separated).
    #[arg(short = 'a', long)]
    pub agent_modules: Option<String>,

    /// Nodes the agent modules run on (comma-separated).
    #[arg(short = 'n', long)]
    pub agent_nodes: Option<String>,

    /// Environment modules for an orchestrator (comma-separated).
    #[arg(short = 'e', long)]
    pub environment_modules: Option<String>,

    /// Nodes the environment modules run on (comma-separated).
    #[arg(short = 'm', long)]
    pub environment_nodes: Option<String>,
}

/// Arguments for the run command.
#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Module to run, as `name` or `<type>:<name>`.
    pub module: String,

    /// Inputs as JSON or `key=value` pairs.
    #[arg(short = 'p', long, conflicts_with = "file")]
    pub parameters: Option<String>,

    /// YAML file with the inputs.
    #[arg(short = 'f', long)]
    pub file: Option<PathBuf>,

    /// Agent nodes (comma-separated).
    #[arg(short = 'n', long)]
    pub agent_nodes: Option<String>,

    /// Tool nodes (comma-separated).
    #[arg(short = 't', long)]
    pub tool_nodes: Option<String>,

    /// Environment nodes (comma-separated).
    #[arg(short = 'e', long)]
    pub environment_nodes: Option<String>,

    /// Knowledge base nodes (comma-separated).
    #[arg(short = 'k', long)]
    pub kb_nodes: Option<String>,

    /// Memory nodes (comma-separated).
    #[arg(short = 'm', long)]
    pub memory_nodes: Option<String>,

    /// Persona modules (comma-separated); the first is attached to agent runs.
    #[arg(long, alias = "persona-modules")]
    pub persona: Option<String>,

    /// Delay between status checks, in milliseconds.
    #[arg(long, default_value_t = 1000)]
    pub poll_interval_ms: u64,

    /// Give up waiting after this many seconds.
    #[arg(long)]
    pub timeout_secs: Option<u64>,
}

/// Arguments for the inference command.
#[derive(Args, Debug, Clone)]
pub struct InferenceArgs {
    /// Prompt for the model.
    pub prompt: String,

    /// Model to use.
    #[arg(short = 'm', long, default_value = hub_proto::inference::DEFAULT_MODEL)]
    pub model: String,

    /// Extra model parameters as JSON or `key=value` pairs.
    #[arg(short = 'p', long)]
    pub parameters: Option<String>,
}

/// Arguments for the storage command.
#[derive(Args, Debug, Clone)]
pub struct StorageArgs {
    /// Storage backend: db, fs or ipfs.
    pub storage_type: StorageType,

    /// Operation: create, read, update, delete, list or search.
    pub operation: StorageOperation,

    /// Table name or file path.
    pub path: String,

    /// JSON data to write, or the query for search.
    #[arg(short = 'd', long)]
    pub data: Option<String>,

    /// JSON schema to create a table with.
    #[arg(short = 's', long)]
    pub schema: Option<String>,

    /// JSON options.
    #[arg(short = 'o', long)]
    pub options: Option<String>,

    /// Local file to upload to fs or ipfs storage.
    #[arg(short = 'f', long)]
    pub file: Option<PathBuf>,

    /// Directory for downloaded files.
    #[arg(long, default_value = hub_client::storage::DEFAULT_OUTPUT_DIR)]
    pub output: PathBuf,
}

/// Arguments for the publish command.
#[derive(Args, Debug, Clone)]
pub struct PublishArgs {
    /// Register the modules with the hub, optionally overriding the module URL.
    #[arg(short = 'r', long, value_name = "URL", num_args = 0..=1)]
    pub register: Option<Option<String>>,

    /// Manifest describing the module.
    #[arg(long, default_value = "module.yaml")]
    pub manifest: PathBuf,

    /// Also register the sub-deployment modules.
    #[arg(short = 's', long)]
    pub subdeployments: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use test_case::test_case;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_nodes_servers() {
        let cli = Cli::parse_from(["hub", "nodes", "-s"]);
        assert!(matches!(cli.command, Commands::Nodes { servers: true }));
    }

    #[test_case("agents", ModuleKind::Agent)]
    #[test_case("tools", ModuleKind::Tool)]
    #[test_case("orchestrators", ModuleKind::Orchestrator)]
    #[test_case("environments", ModuleKind::Environment)]
    #[test_case("personas", ModuleKind::Persona)]
    #[test_case("memories", ModuleKind::Memory)]
    #[test_case("kbs", ModuleKind::KnowledgeBase)]
    fn module_subcommands_map_to_kinds(subcommand: &str, kind: ModuleKind) {
        let cli = Cli::parse_from(["hub", subcommand, "thing", "-d"]);
        let (parsed, args) = cli.command.module_kind().unwrap();
        assert_eq!(parsed, kind);
        assert_eq!(args.name.as_deref(), Some("thing"));
        assert!(args.delete);
    }

    #[test]
    fn delete_conflicts_with_metadata() {
        let result = Cli::try_parse_from(["hub", "tools", "t", "-d", "-p", "description=x"]);
        assert!(result.is_err());
    }

    #[test]
    fn run_parameters_conflict_with_file() {
        let result = Cli::try_parse_from(["hub", "run", "agent:a", "-p", "x=1", "-f", "in.yaml"]);
        assert!(result.is_err());
    }

    #[test]
    fn run_defaults() {
        let cli = Cli::parse_from(["hub", "run", "hello_world", "-n", "a:1,b:2"]);
        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.module, "hello_world");
        assert_eq!(args.agent_nodes.as_deref(), Some("a:1,b:2"));
        assert_eq!(args.poll_interval_ms, 1000);
        assert_eq!(args.timeout_secs, None);
    }

    #[test]
    fn storage_parses_type_and_operation() {
        let cli = Cli::parse_from(["hub", "storage", "fs", "read", "runs/1/out.txt"]);
        let Commands::Storage(args) = cli.command else {
            panic!("expected storage");
        };
        assert_eq!(args.storage_type, StorageType::Filesystem);
        assert_eq!(args.operation, StorageOperation::Read);
        assert_eq!(args.output, PathBuf::from("./downloads"));
    }

    #[test]
    fn storage_rejects_unknown_type() {
        assert!(Cli::try_parse_from(["hub", "storage", "s3", "read", "x"]).is_err());
    }

    #[test]
    fn publish_register_takes_optional_url() {
        let cli = Cli::parse_from(["hub", "publish", "-r"]);
        let Commands::Publish(args) = cli.command else {
            panic!("expected publish");
        };
        assert_eq!(args.register, Some(None));

        let cli = Cli::parse_from(["hub", "publish", "-r", "https://github.com/a/b", "-s"]);
        let Commands::Publish(args) = cli.command else {
            panic!("expected publish");
        };
        assert_eq!(args.register, Some(Some("https://github.com/a/b".into())));
        assert!(args.subdeployments);
    }

    #[test]
    fn format_and_addresses_are_global() {
        let cli = Cli::parse_from([
            "hub",
            "inference",
            "hi",
            "--format",
            "json",
            "--node-url",
            "localhost:7001",
        ]);
        assert_eq!(cli.format, Format::Json);
        assert_eq!(cli.global.node_url.as_deref(), Some("localhost:7001"));
    }
}
