mod cli;
mod commands;
mod output;

use clap::{CommandFactory, Parser};
use cli::{Cli, Commands};
use devloop::Error as DevloopError;
use output::{CliOutput, QuietOutput, UserOutput};

/// Exit status for usage errors, matching clap's own.
const USAGE_EXIT_CODE: i32 = 2;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        if let Some(err) = e.downcast_ref::<DevloopError>() {
            eprintln!("Error: {}", err.with_suggestion());
        } else {
            eprintln!("Error: {:#}", e);
        }
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing()?;

    let out: &dyn UserOutput = if cli.quiet { &QuietOutput } else { &CliOutput };

    let work_dir = match cli.workdir {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };

    match cli.command {
        Commands::Run(args) => {
            let Some(source) = args.source.clone().filter(|s| !s.trim().is_empty()) else {
                print_run_help();
                std::process::exit(USAGE_EXIT_CODE);
            };
            commands::run_service(
                source,
                &work_dir,
                cli.config.as_deref(),
                cli.runtime,
                args,
                out,
            )
            .await
        }
    }
}

fn print_run_help() {
    let mut cmd = Cli::command();
    let help = match cmd.find_subcommand_mut("run") {
        Some(run) => run.render_help(),
        None => cmd.render_help(),
    };
    eprintln!("{}", help);
}

fn init_tracing() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialise logging: {}", e))
}
