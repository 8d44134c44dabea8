//! Carcade CLI - static site generator for nested content trees.
//!
//! Provides commands for:
//! - `init`: Scaffold a new project
//! - `build`: Render the site into the output directory
//! - `runserver`: Rebuild on change and serve the output
//! - `extract-messages`: Collect translatable strings from templates

mod commands;
mod error;
mod output;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{BuildArgs, ExtractMessagesArgs, InitArgs, RunserverArgs};
use output::Output;

/// Carcade - static site generator.
#[derive(Parser)]
#[command(name = "carcade", version, about)]
struct Cli {
    /// Path to configuration file (default: auto-discover carcade.toml).
    #[arg(short, long, global = true, env = "CARCADE_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new project directory.
    Init(InitArgs),
    /// Build the site.
    Build(BuildArgs),
    /// Serve the site, rebuilding on change.
    Runserver(RunserverArgs),
    /// Extract translatable messages from templates.
    ExtractMessages(ExtractMessagesArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let output = Output::new();

    // --verbose enables INFO level, otherwise use RUST_LOG or default to WARN
    let filter = if cli.verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = cli.config.as_deref();
    let result = match cli.command {
        Commands::Init(args) => args.execute(),
        Commands::Build(args) => args.execute(config),
        Commands::Runserver(args) => args.execute(config),
        Commands::ExtractMessages(args) => args.execute(config),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            output.error(&format!("Error: {err}"));
            let mut source = std::error::Error::source(&err);
            while let Some(cause) = source {
                output.error(&format!("  Caused by: {cause}"));
                source = cause.source();
            }
            ExitCode::FAILURE
        }
    }
}
