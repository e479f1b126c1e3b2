// src/commands/repo.rs

//! Project and manifest tree commands

use super::open_mirror;
use anyhow::Result;
use std::path::Path;
use tracing::info;
use winget_mirror::{init_project, InitOutcome};

/// Initialize a mirror project directory
pub fn cmd_init(path: &str) -> Result<()> {
    match init_project(Path::new(path))? {
        InitOutcome::Created(root) => {
            println!("Initialized winget mirror at {}", root.display());
            println!("Edit config.json to set repo_url, revision and server_url, then run sync-repo.");
        }
        InitOutcome::AlreadyInitialized(root) => {
            println!("Already initialized: {}", root.display());
        }
    }
    Ok(())
}

/// Clone or update the manifest repository
pub fn cmd_sync_repo(path: &str) -> Result<()> {
    let mirror = open_mirror(path)?;
    info!(
        "Syncing {} at {}",
        mirror.config().repo_url,
        mirror.config().revision
    );
    let head = mirror.sync_repo()?;
    println!(
        "Synced repository to {} ({}) at {}",
        mirror.config().revision,
        head,
        mirror.layout().mirror_dir().display()
    );
    Ok(())
}

/// Write manifests whose installer URLs point at the mirror
pub fn cmd_patch_repo(path: &str, output_dir: &str, server_url: Option<&str>) -> Result<()> {
    let mirror = open_mirror(path)?;
    if mirror.state().downloads.is_empty() {
        println!("No downloaded packages found in state.json");
        return Ok(());
    }

    let patched = mirror.patch_repo(Path::new(output_dir), server_url)?;
    println!("Successfully patched {} package(s) into {}", patched, output_dir);
    Ok(())
}
