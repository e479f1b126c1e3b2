// src/purge.rs

//! Removing a package's downloads and ledger entry

use crate::package::PackageIdentity;
use crate::paths::MirrorLayout;
use crate::state::MirrorState;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

/// Purge one tracked package
///
/// Deletes the recorded version's download directory, then the package and
/// publisher directories if they are left empty, then the ledger entry.
/// Filesystem failures are logged and never keep the entry in the ledger.
/// Returns `false` when the package was not tracked. The caller persists
/// the state.
pub fn purge_package(layout: &MirrorLayout, state: &mut MirrorState, id: &PackageIdentity) -> bool {
    let Some(record) = state.record(id) else {
        debug!("{} is not tracked; nothing to purge", id);
        return false;
    };

    let version_dir = layout.download_dir(id, &record.version);
    if version_dir.exists() {
        match fs::remove_dir_all(&version_dir) {
            Ok(()) => info!("Removed {}", version_dir.display()),
            Err(e) => warn!("Failed to remove {}: {}", version_dir.display(), e),
        }
    }

    remove_if_empty(&layout.package_download_dir(id));
    remove_if_empty(&layout.publisher_download_dir(id));

    state.remove_record(id);
    true
}

/// `rmdir`, swallowing every failure including "not empty"
fn remove_if_empty(dir: &Path) {
    if let Err(e) = fs::remove_dir(dir) {
        debug!("Leaving {} in place: {}", dir.display(), e);
    }
}
