// src/manifest/resolver.rs

//! Latest-version resolution over the mirrored manifest tree

use super::{installers, load_manifest, manifest_version, InstallerEntry, ResolveError};
use super::MIN_MANIFEST_VERSION;
use crate::package::{prefix_matches, PackageFilter, PackageIdentity};
use crate::paths::MirrorLayout;
use crate::version::{max_version, MirrorVersion, StandardVersion};
use std::fs;
use std::path::Path;
use tracing::debug;

/// Latest version of a package and its installer list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPackage {
    pub identity: PackageIdentity,
    pub version: String,
    pub installers: Vec<InstallerEntry>,
}

/// Read-only view of the manifest tree
pub struct ManifestResolver<'a> {
    layout: &'a MirrorLayout,
}

impl<'a> ManifestResolver<'a> {
    pub fn new(layout: &'a MirrorLayout) -> Self {
        Self { layout }
    }

    /// Publisher directories whose names start with `filter`, sorted
    ///
    /// Only the shard of the filter's first character is searched.
    pub fn matching_publishers(&self, filter: &str) -> Vec<String> {
        let shard = self.layout.shard_dir(filter);
        if filter.is_empty() || !shard.is_dir() {
            return Vec::new();
        }
        let mut publishers: Vec<String> = subdirectory_names(&shard)
            .into_iter()
            .filter(|name| prefix_matches(name, filter))
            .collect();
        publishers.sort();
        publishers
    }

    /// Packages under a publisher directory, sorted
    pub fn packages_of(&self, publisher: &str) -> Vec<PackageIdentity> {
        let mut packages: Vec<PackageIdentity> =
            subdirectory_names(&self.layout.publisher_manifest_dir(publisher))
                .into_iter()
                .map(|package| PackageIdentity::new(publisher, package))
                .collect();
        packages.sort();
        packages
    }

    /// All packages selected by a `Publisher[/Package]` filter
    pub fn matching_packages(&self, filter: &PackageFilter) -> Vec<PackageIdentity> {
        self.matching_publishers(&filter.publisher)
            .iter()
            .flat_map(|publisher| self.packages_of(publisher))
            .filter(|id| filter.package_matches(&id.package))
            .collect()
    }

    /// Version directory names of a package that parse as versions
    pub fn versions(&self, id: &PackageIdentity) -> Result<Vec<String>, ResolveError> {
        let package_dir = self.layout.package_manifest_dir(id);
        if !package_dir.is_dir() {
            return Err(ResolveError::PackageNotFound(id.id()));
        }

        let entries = fs::read_dir(&package_dir).map_err(|e| ResolveError::Unreadable {
            path: package_dir.clone(),
            reason: e.to_string(),
        })?;

        let mut versions = Vec::new();
        for entry in entries.flatten() {
            if !entry.path().is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if MirrorVersion::parse(&name).is_some() {
                versions.push(name);
            } else {
                debug!("Ignoring non-version directory {} under {}", name, id);
            }
        }
        Ok(versions)
    }

    /// The newest version directory of a package
    pub fn latest_version(&self, id: &PackageIdentity) -> Result<String, ResolveError> {
        let versions = self.versions(id)?;
        max_version(versions.iter().map(String::as_str))
            .map(str::to_string)
            .ok_or_else(|| ResolveError::NoVersions(id.id()))
    }

    /// Resolve the newest version and its installer list
    ///
    /// A sibling `<id>.installer.yaml` replaces the primary manifest's
    /// `Installers` entirely; the two lists are never merged.
    pub fn resolve(&self, id: &PackageIdentity) -> Result<ResolvedPackage, ResolveError> {
        let version = self.latest_version(id)?;

        let primary_path = self.layout.primary_manifest_path(id, &version);
        if !primary_path.is_file() {
            return Err(ResolveError::ManifestMissing(primary_path));
        }
        let primary = load_manifest(&primary_path).map_err(|e| ResolveError::Unreadable {
            path: primary_path.clone(),
            reason: e.to_string(),
        })?;

        let declared = manifest_version(&primary);
        if !is_supported_manifest_version(declared.as_deref()) {
            return Err(ResolveError::UnsupportedManifestVersion {
                id: id.id(),
                found: declared,
            });
        }

        let installer_path = self.layout.installer_manifest_path(id, &version);
        let installers = if installer_path.is_file() {
            debug!("Using split installer manifest {}", installer_path.display());
            let split = load_manifest(&installer_path).map_err(|e| ResolveError::Unreadable {
                path: installer_path.clone(),
                reason: e.to_string(),
            })?;
            installers(&split)
        } else {
            installers(&primary)
        };

        Ok(ResolvedPackage {
            identity: id.clone(),
            version,
            installers,
        })
    }
}

/// Whether a declared `ManifestVersion` is at least [`MIN_MANIFEST_VERSION`]
///
/// Uses the standard numeric comparison only; values that do not parse in
/// the standard form are unsupported.
pub fn is_supported_manifest_version(declared: Option<&str>) -> bool {
    let (Some(declared), Some(minimum)) = (
        declared.and_then(StandardVersion::parse),
        StandardVersion::parse(MIN_MANIFEST_VERSION),
    ) else {
        return false;
    };
    declared >= minimum
}

fn subdirectory_names(dir: &Path) -> Vec<String> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    entries
        .flatten()
        .filter(|entry| entry.path().is_dir())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .collect()
}
