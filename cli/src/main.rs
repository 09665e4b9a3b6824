#![deny(missing_docs)]

//! # Opgen CLI
//!
//! Command Line Interface for scaffolding and configuring operator projects.
//!
//! Supported Commands:
//! - `config-gen`: Generates the deployment manifest from a `KubebuilderConfigGen` file.
//! - `create webhook`: Scaffolds and patches admission/conversion webhooks.
//! - `insert`: Inserts code fragments before the markers of a file.

use clap::{ArgAction, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::error::CliResult;
use crate::executor::ShellExecutor;

mod config_gen;
mod error;
mod executor;
mod insert;
mod webhook;

#[derive(Parser, Debug)]
#[clap(author, version, about = "Operator scaffolding toolchain")]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[clap(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate configuration for controller-runtime based projects.
    ConfigGen(config_gen::ConfigGenArgs),
    /// Scaffold new project components.
    #[clap(subcommand)]
    Create(CreateCommands),
    /// Insert code fragments before the markers of a file.
    Insert(insert::InsertArgs),
}

#[derive(Subcommand, Debug)]
enum CreateCommands {
    /// Scaffold a webhook for an API type.
    Webhook(webhook::WebhookArgs),
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| level.into()))
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> CliResult<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match &cli.command {
        Commands::ConfigGen(args) => {
            // controller-gen and openssl run as real processes
            config_gen::execute(args, &ShellExecutor)?;
        }
        Commands::Create(CreateCommands::Webhook(args)) => {
            webhook::execute(args)?;
        }
        Commands::Insert(args) => {
            insert::execute(args)?;
        }
    }

    Ok(())
}
