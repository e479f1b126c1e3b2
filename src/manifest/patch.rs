// src/manifest/patch.rs

//! Rewriting installer URLs so manifests point at the mirror

use super::{filename_from_url, load_manifest, manifest_type};
use crate::error::{Error, Result};
use crate::package::PackageIdentity;
use crate::paths::mirror_url;
use serde_yaml::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Manifest types that carry an `Installers` list
const PATCHED_TYPES: &[&str] = &["installer", "singleton"];

/// Rewrite `InstallerUrl` of every installer to its mirror location
///
/// Only manifests of type `installer` or `singleton` are touched. Returns
/// the number of URLs rewritten.
pub fn patch_installer_urls(
    manifest: &mut Value,
    server_base: &str,
    id: &PackageIdentity,
    version: &str,
) -> usize {
    if !manifest_type(manifest).is_some_and(|t| PATCHED_TYPES.contains(&t)) {
        return 0;
    }
    let Some(installers) = manifest
        .get_mut("Installers")
        .and_then(Value::as_sequence_mut)
    else {
        return 0;
    };

    let mut patched = 0;
    for installer in installers.iter_mut() {
        let Some(url) = installer.get("InstallerUrl").and_then(Value::as_str) else {
            continue;
        };
        let Some(filename) = filename_from_url(url) else {
            continue;
        };
        let new_url = mirror_url(server_base, id, version, &filename);
        debug!("Patched {}: {} -> {}", id, url, new_url);
        if let Some(map) = installer.as_mapping_mut() {
            map.insert(Value::from("InstallerUrl"), Value::from(new_url));
            patched += 1;
        }
    }
    patched
}

/// Copy every `*.yaml` in `source_dir` to `target_dir`, patching URLs
///
/// Returns the number of files written.
pub fn patch_manifest_dir(
    source_dir: &Path,
    target_dir: &Path,
    server_base: &str,
    id: &PackageIdentity,
    version: &str,
) -> Result<usize> {
    fs::create_dir_all(target_dir).map_err(|e| {
        Error::IoError(format!("Failed to create {}: {}", target_dir.display(), e))
    })?;

    let mut written = 0;
    for source in yaml_files(source_dir)? {
        let Some(name) = source.file_name() else {
            continue;
        };
        let mut manifest = load_manifest(&source)?;
        let patched = patch_installer_urls(&mut manifest, server_base, id, version);

        let rendered = serde_yaml::to_string(&manifest).map_err(|e| {
            Error::ParseError(format!("Failed to serialize {}: {}", source.display(), e))
        })?;
        let target = target_dir.join(name);
        fs::write(&target, rendered)
            .map_err(|e| Error::IoError(format!("Failed to write {}: {}", target.display(), e)))?;

        if patched > 0 {
            info!("Patched {} installer URL(s) in {}", patched, target.display());
        }
        written += 1;
    }
    Ok(written)
}

fn yaml_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let pattern = format!("{}/*.yaml", glob::Pattern::escape(&dir.to_string_lossy()));
    let mut files: Vec<PathBuf> = glob::glob(&pattern)
        .map_err(|e| Error::ParseError(format!("Invalid glob pattern {}: {}", pattern, e)))?
        .filter_map(|entry| entry.ok())
        .filter(|path| path.is_file())
        .collect();
    files.sort();
    Ok(files)
}
