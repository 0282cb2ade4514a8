// SPDX-FileCopyrightText: 2026 Wahub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wahub - a multi-tenant WhatsApp gateway.
//!
//! This is the binary entry point for the gateway service.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod config_cmd;
mod serve;

/// Wahub - a multi-tenant WhatsApp gateway.
#[derive(Parser, Debug)]
#[command(name = "wahub", version, about, long_about = None)]
struct Cli {
    /// Explicit config file path (defaults to the XDG hierarchy).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the gateway service.
    Serve,
    /// Print the effective configuration with secrets redacted.
    Config,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Serve => serve::run_serve(config).await,
        Commands::Config => config_cmd::run_config(&config),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn load(
    path: Option<&std::path::Path>,
) -> Result<wahub_config::WahubConfig, wahub_core::WahubError> {
    let result = match path {
        Some(path) => wahub_config::load_config_from_path(path),
        None => wahub_config::load_config(),
    };
    result.map_err(|e| wahub_core::WahubError::Config(e.to_string()))
}
