// src/commands/mod.rs

//! Command handlers for the winget-mirror CLI

mod prompt;
mod purge;
mod repo;
mod search;
mod sync;
mod validate;

pub use purge::{cmd_purge_all_packages, cmd_purge_package};
pub use repo::{cmd_init, cmd_patch_repo, cmd_sync_repo};
pub use search::cmd_search;
pub use sync::{cmd_refresh_synced, cmd_sync};
pub use validate::cmd_validate_hash;

use anyhow::Result;
use std::path::Path;
use winget_mirror::Mirror;

/// Open the mirror project at `path`
fn open_mirror(path: &str) -> Result<Mirror> {
    Ok(Mirror::open(Path::new(path))?)
}
