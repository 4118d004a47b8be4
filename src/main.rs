//! # debuginfod CLI entry point
//!
//! Resolves a build-id to a local file, downloading it from the configured
//! symbol servers on a cache miss, and prints the path.

use clap::{Parser, Subcommand};
use debuginfod_client::error::Result;
use debuginfod_client::{ArtifactType, Client};
use debuginfod_config::ConfigLoader;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

const EXIT_NOT_FOUND: u8 = 1;
const EXIT_ERROR: u8 = 2;

/// Fetch debug info and executables by build-id.
#[derive(Parser, Debug)]
#[command(name = "debuginfod", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the path of the debug info for a build-id.
    Debuginfo { build_id: String },
    /// Print the path of the executable for a build-id.
    Executable { build_id: String },
    /// Delete every cached artifact.
    ClearCache,
    /// Print the cache directory.
    CachePath,
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).with_writer(std::io::stderr).init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let loader = ConfigLoader::new();

    let config = match loader.load() {
        Ok(config) => config,
        Err(err) => {
            init_tracing(cli.verbose);
            tracing::error!("{err:?}");
            return ExitCode::from(EXIT_ERROR);
        },
    };
    init_tracing(cli.verbose.max(u8::from(config.verbose)));

    let resolved = match loader.registry().and_then(|registry| config.resolve(&registry)) {
        Ok(resolved) => resolved,
        Err(err) => {
            tracing::error!("{err:?}");
            return ExitCode::from(EXIT_ERROR);
        },
    };
    let result = match Client::new(resolved) {
        Ok(client) => run(&client, cli.command).await,
        Err(err) => Err(err),
    };

    match result {
        Ok(code) => code,
        Err(err) => {
            tracing::error!("{err:?}");
            ExitCode::from(EXIT_ERROR)
        },
    }
}

async fn run(client: &Client, command: Commands) -> Result<ExitCode> {
    tracing::debug!(cache = %client.cache_root().display(), sources = ?client.sources().collect::<Vec<_>>(), "Starting");
    let (build_id, artifact) = match command {
        Commands::Debuginfo { build_id } => (build_id, ArtifactType::Debuginfo),
        Commands::Executable { build_id } => (build_id, ArtifactType::Executable),
        Commands::ClearCache => {
            client.clear_cache().await?;
            return Ok(ExitCode::SUCCESS);
        },
        Commands::CachePath => {
            println!("{}", client.cache_root().display());
            return Ok(ExitCode::SUCCESS);
        },
    };

    match client.resolve(&build_id, artifact).await?.into_path() {
        Some(path) => {
            println!("{}", path.display());
            Ok(ExitCode::SUCCESS)
        },
        None => {
            eprintln!("{artifact} for {build_id} not found on any server");
            Ok(ExitCode::from(EXIT_NOT_FOUND))
        },
    }
}
