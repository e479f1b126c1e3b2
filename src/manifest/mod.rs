// src/manifest/mod.rs

//! Winget manifest loading and installer extraction
//!
//! Manifests are loaded as untyped YAML trees. Only two top-level keys
//! matter here:
//!
//! ```yaml
//! ManifestVersion: 1.6.0
//! Installers:
//!   - InstallerUrl: https://example.com/setup-x64.exe
//!     InstallerSha256: 9F2C...
//! ```
//!
//! Everything else is carried through untouched (see [`patch`]).

pub mod patch;
mod resolver;

pub use resolver::{is_supported_manifest_version, ManifestResolver, ResolvedPackage};

use crate::error::{Error, Result};
use serde_yaml::Value;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

/// Oldest manifest schema the mirror understands
pub const MIN_MANIFEST_VERSION: &str = "1.0.0";

/// Why a package could not be resolved
///
/// Every variant means "skip this package"; none of them abort a batch.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("Package directory not found for {0}")]
    PackageNotFound(String),

    #[error("No valid version directories for {0}")]
    NoVersions(String),

    #[error("Manifest not found: {}", .0.display())]
    ManifestMissing(PathBuf),

    #[error("Unsupported ManifestVersion {shown} for {id}", shown = .found.as_deref().unwrap_or("<missing>"))]
    UnsupportedManifestVersion { id: String, found: Option<String> },

    #[error("Failed to read {}: {reason}", .path.display())]
    Unreadable { path: PathBuf, reason: String },
}

/// One distributable file of a package version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallerEntry {
    pub url: String,
    pub expected_sha256: Option<String>,
}

impl InstallerEntry {
    pub fn new(url: impl Into<String>, expected_sha256: Option<String>) -> Self {
        Self {
            url: url.into(),
            expected_sha256,
        }
    }

    /// Target filename: the last path segment of the URL
    pub fn filename(&self) -> Option<String> {
        filename_from_url(&self.url)
    }
}

/// Load a manifest file as an untyped YAML tree
pub fn load_manifest(path: &Path) -> Result<Value> {
    let content = fs::read_to_string(path)
        .map_err(|e| Error::IoError(format!("Failed to read {}: {}", path.display(), e)))?;

    // Windows-authored manifests frequently carry a UTF-8 BOM
    let content = content.strip_prefix('\u{feff}').unwrap_or(&content);

    serde_yaml::from_str(content)
        .map_err(|e| Error::ParseError(format!("Invalid YAML in {}: {}", path.display(), e)))
}

/// `ManifestVersion` as a string, if present
///
/// An unquoted `ManifestVersion: 1.0` is read by YAML as a float, so numbers
/// are accepted and stringified.
pub fn manifest_version(manifest: &Value) -> Option<String> {
    match manifest.get("ManifestVersion")? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// `ManifestType` as a string, if present
pub fn manifest_type(manifest: &Value) -> Option<&str> {
    manifest.get("ManifestType").and_then(Value::as_str)
}

/// Extract the `Installers` list, in manifest order
///
/// A missing or non-sequence `Installers` key yields an empty list. Entries
/// without an `InstallerUrl` string are skipped.
pub fn installers(manifest: &Value) -> Vec<InstallerEntry> {
    let Some(entries) = manifest.get("Installers").and_then(Value::as_sequence) else {
        return Vec::new();
    };

    entries
        .iter()
        .filter_map(|entry| {
            let Some(url) = entry.get("InstallerUrl").and_then(Value::as_str) else {
                warn!("Skipping installer entry without InstallerUrl");
                return None;
            };
            let sha256 = entry
                .get("InstallerSha256")
                .and_then(Value::as_str)
                .map(str::to_string);
            Some(InstallerEntry::new(url, sha256))
        })
        .collect()
}

/// Last path segment of an installer URL
///
/// Query strings and fragments are not part of the filename. Returns `None`
/// when the URL ends in `/` or names a relative directory component.
pub fn filename_from_url(raw: &str) -> Option<String> {
    let segment = match url::Url::parse(raw) {
        Ok(parsed) => parsed
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .map(str::to_string),
        Err(_) => {
            let path = raw.split(['?', '#']).next().unwrap_or(raw);
            path.rsplit('/').next().map(str::to_string)
        }
    }?;

    match segment.as_str() {
        "" | "." | ".." => None,
        _ if segment.contains('\\') => None,
        _ => Some(segment),
    }
}
