// SPDX-FileCopyrightText: 2026 Claimline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Claimline - per-item FIFO claim queue service.
//!
//! This is the binary entry point for the claimline service.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod collaborators;
mod serve;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use claimline_config::ClaimlineConfig;

/// Claimline - per-item FIFO claim queue service.
#[derive(Parser, Debug)]
#[command(name = "claimline", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the XDG hierarchy.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the queue service (HTTP gateway, notifications, sweeper).
    Serve,
    /// Run a single expiry/reminder sweep and exit.
    Sweep,
    /// Print queue statistics for one item as JSON.
    Stats {
        /// Item identifier.
        item: String,
    },
    /// Validate the configuration and exit.
    CheckConfig,
}

fn load_config(path: Option<&std::path::Path>) -> ClaimlineConfig {
    let loaded = match path {
        Some(path) => claimline_config::load_and_validate_path(path),
        None => claimline_config::load_and_validate(),
    };
    match loaded {
        Ok(config) => config,
        Err(errors) => {
            claimline_config::render_errors(&errors);
            std::process::exit(1);
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Load and validate configuration at startup
    let config = load_config(cli.config.as_deref());

    let result = match cli.command {
        Some(Commands::Serve) => serve::run_serve(config).await,
        Some(Commands::Sweep) => serve::run_sweep(config).await,
        Some(Commands::Stats { item }) => serve::run_stats(config, item).await,
        Some(Commands::CheckConfig) => {
            eprintln!(
                "claimline: config ok (database={})",
                config.storage.database_path
            );
            Ok(())
        }
        None => {
            println!("claimline: use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(not(target_env = "msvc"))]
    fn jemalloc_is_active() {
        // Only jemalloc supports advancing the epoch.
        use tikv_jemalloc_ctl::{epoch, stats};
        epoch::advance().unwrap();
        let allocated = stats::allocated::read().unwrap();
        assert!(allocated > 0, "jemalloc should report non-zero allocation");
    }

    #[test]
    fn binary_loads_config_defaults() {
        let config = claimline_config::load_and_validate_str("")
            .expect("default config should be valid");
        assert_eq!(config.log.level, "info");
        assert!(config.gateway.enabled);
    }

    #[test]
    fn cli_parses_stats_with_global_config() {
        let cli = Cli::try_parse_from(["claimline", "stats", "item-7", "--config", "/tmp/c.toml"])
            .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/c.toml")));
        match cli.command {
            Some(Commands::Stats { item }) => assert_eq!(item, "item-7"),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn cli_parses_check_config() {
        let cli = Cli::try_parse_from(["claimline", "check-config"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::CheckConfig)));
    }
}
