use clap::{Args, Parser, Subcommand};
use devloop::runtime::{OutputMode, RuntimeKind};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "devloop", version)]
#[command(about = "Run a service and redeploy it while you edit its source")]
pub struct Cli {
    /// Config file path (defaults to the nearest devloop.yaml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Working directory (defaults to the current directory)
    #[arg(short, long, global = true)]
    pub workdir: Option<PathBuf>,

    /// Runtime the service runs on
    #[arg(long, global = true, value_enum, env = "DEVLOOP_RUNTIME")]
    pub runtime: Option<RuntimeKind>,

    /// Hide devloop's own status messages
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a service and redeploy it whenever its source changes
    Run(RunArgs),
}

#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Local directory (e.g. ./svc) or remote reference (repo[/folder][@ref])
    pub source: Option<String>,

    /// Override the entry command
    #[arg(long, env = "DEVLOOP_COMMAND")]
    pub command: Option<String>,

    /// Override the entry arguments
    #[arg(long, env = "DEVLOOP_ARGS", allow_hyphen_values = true)]
    pub args: Option<String>,

    /// Process type hint (local runtime: cargo, go, node, shell)
    #[arg(long = "type", value_name = "TYPE", env = "DEVLOOP_TYPE")]
    pub process_type: Option<String>,

    /// Number of attempts to start the service [default: 3]
    #[arg(long, env = "DEVLOOP_RETRIES")]
    pub retries: Option<u32>,

    /// Window for collapsing bursts of changes, e.g. 200ms (0 disables)
    #[arg(long, value_parser = parse_duration_arg, env = "DEVLOOP_DEBOUNCE")]
    pub debounce: Option<Duration>,

    /// Run without live reload
    #[arg(long)]
    pub no_watch: bool,

    /// Platform the service is built for; `windows` escapes drive colons
    #[arg(long, value_name = "OS", env = "DEVLOOP_TARGET_OS")]
    pub target_os: Option<String>,

    /// Base image for the docker runtime
    #[arg(long, env = "DEVLOOP_DOCKER_IMAGE")]
    pub image: Option<String>,

    /// Where the service's own output goes
    #[arg(long, value_enum, value_name = "MODE")]
    pub output: Option<OutputMode>,
}

fn parse_duration_arg(s: &str) -> Result<Duration, String> {
    devloop::config::parse_duration(s).map_err(|e| e.to_string())
}
