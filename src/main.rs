// src/main.rs

use anyhow::Result;
use clap::Parser;

mod cli;
mod commands;

use cli::{Cli, Commands};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let path = cli.path.as_str();
    match cli.command {
        Commands::Init => commands::cmd_init(path),
        Commands::SyncRepo => commands::cmd_sync_repo(path),
        Commands::Sync { filter, quiet } => commands::cmd_sync(path, &filter, quiet),
        Commands::RefreshSynced { quiet } => commands::cmd_refresh_synced(path, quiet),
        Commands::ValidateHash { output } => {
            if !commands::cmd_validate_hash(path, output)? {
                std::process::exit(1);
            }
            Ok(())
        }
        Commands::PurgePackage { publisher, yes } => {
            commands::cmd_purge_package(path, &publisher, yes)
        }
        Commands::PurgeAllPackages { yes } => commands::cmd_purge_all_packages(path, yes),
        Commands::Search { publisher } => commands::cmd_search(path, &publisher),
        Commands::PatchRepo {
            output_dir,
            server_url,
        } => commands::cmd_patch_repo(path, &output_dir, server_url.as_deref()),
    }
}
