//! Gallerystream CLI - Command-line interface
//!
//! Manages the on-disk image cache and configuration, and can warm the
//! cache with a list of image URLs ahead of opening a gallery.

mod commands;
mod error;
mod runner;

use clap::{Parser, Subcommand};

use commands::cache::CacheAction;
use commands::config::ConfigCommands;
use commands::warm::WarmArgs;
use error::CliError;

#[derive(Debug, Parser)]
#[command(name = "gallerystream", version, about = "Multi-resolution image streaming for 3D galleries")]
struct Cli {
    /// Also print log output to the terminal
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Manage the image cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// View or change configuration settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Download images into the cache ahead of time
    Warm(WarmArgs),
}

fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Commands::Cache { action } => commands::cache::run(action),
        Commands::Config { command } => commands::config::run(command),
        Commands::Warm(args) => commands::warm::run(args, cli.verbose),
    }
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
