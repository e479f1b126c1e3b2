// src/cli/mod.rs

//! CLI definitions for winget-mirror
//!
//! The command implementations live in the `commands` module.

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "winget-mirror")]
#[command(version)]
#[command(about = "Mirror winget manifests and installers with SHA-256 integrity tracking", long_about = None)]
pub struct Cli {
    /// Mirror project directory (holds config.json and state.json)
    #[arg(short, long, global = true, default_value = ".")]
    pub path: String,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a mirror project with default config and empty state
    Init,

    /// Clone or update the manifest repository at the configured revision
    SyncRepo,

    /// Download the latest installers of matching packages
    Sync {
        /// Publisher prefix, optionally followed by /Package prefix
        filter: String,

        /// Hide per-file progress bars
        #[arg(short, long)]
        quiet: bool,
    },

    /// Update every tracked package that has a newer version
    RefreshSynced {
        /// Hide per-file progress bars
        #[arg(short, long)]
        quiet: bool,
    },

    /// Verify recorded SHA-256 digests of all tracked downloads
    ValidateHash {
        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        output: OutputFormat,
    },

    /// Remove downloads and records of packages by publisher prefix
    PurgePackage {
        /// Publisher prefix (case-insensitive)
        publisher: String,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Remove every tracked package
    PurgeAllPackages {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Show mirror status of packages under matching publishers
    Search {
        /// Publisher prefix (case-insensitive)
        publisher: String,
    },

    /// Write manifests with installer URLs pointing at the mirror
    PatchRepo {
        /// Output directory for patched manifests
        #[arg(short, long)]
        output_dir: String,

        /// Base URL the downloads directory is served from
        #[arg(short, long)]
        server_url: Option<String>,
    },
}
