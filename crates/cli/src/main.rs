//! libvirt-pool CLI - Main Entry Point
//!
//! Drives the storage pool resource lifecycle from JSON configuration and
//! state files.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::debug;

use libvirt_pool_provider::ProviderConfig;

mod commands;
mod output;

use commands::pool;

/// libvirt-pool CLI - Terraform-style libvirt storage pools
#[derive(Parser)]
#[command(name = "libvirt-pool")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Provider configuration file (TOML)
    #[arg(long, env = "LIBVIRT_POOL_CONFIG", default_value = "provider.toml", global = true)]
    provider_config: PathBuf,

    /// Libvirt connection URI, overrides the configuration file
    #[arg(long, global = true)]
    uri: Option<String>,

    /// Output format
    #[arg(long, default_value = "table", global = true)]
    format: output::OutputFormat,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage storage pools
    #[command(subcommand)]
    Pool(pool::PoolCommands),

    /// Show version information
    Version,
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    if let Err(e) = run(cli) {
        output::print_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Pool(cmd) => {
            let config = ProviderConfig::load(&cli.provider_config)?
                .with_env_overrides()
                .with_uri_override(cli.uri);
            debug!(uri = %config.uri, "Loaded provider configuration");
            pool::execute(cmd, &config, cli.format)?;
        }
        Commands::Version => {
            println!("libvirt-pool v{}", libvirt_pool_common::VERSION);
            println!(
                "libvirt support: {}",
                if libvirt_pool_provider::libvirt_available() { "enabled" } else { "disabled" }
            );
        }
    }

    Ok(())
}
