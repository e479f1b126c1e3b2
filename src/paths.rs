// src/paths.rs

//! Centralized path derivation for the mirror's directories
//!
//! Nothing here touches the filesystem.

use crate::package::{shard_for, PackageIdentity};
use std::path::{Path, PathBuf};

/// Directory holding manifests inside the cloned tree
pub const MANIFESTS_DIR: &str = "manifests";

/// Directory holding fetched installers inside the project
pub const DOWNLOADS_DIR: &str = "downloads";

/// Suffix for in-flight downloads
pub const PARTIAL_SUFFIX: &str = ".part";

/// Directory layout of one mirror project
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorLayout {
    root: PathBuf,
    mirror_dir: PathBuf,
    downloads_dir: PathBuf,
}

impl MirrorLayout {
    /// Layout for a project rooted at `root` with the manifest clone in `mirror_dir_name`
    pub fn new(root: impl Into<PathBuf>, mirror_dir_name: &str) -> Self {
        let root = root.into();
        Self {
            mirror_dir: root.join(mirror_dir_name),
            downloads_dir: root.join(DOWNLOADS_DIR),
            root,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The git clone of the manifest repository
    pub fn mirror_dir(&self) -> &Path {
        &self.mirror_dir
    }

    pub fn downloads_dir(&self) -> &Path {
        &self.downloads_dir
    }

    /// `<mirror>/manifests`
    pub fn manifests_dir(&self) -> PathBuf {
        self.mirror_dir.join(MANIFESTS_DIR)
    }

    /// `<mirror>/manifests/<shard>` for a publisher name or filter
    pub fn shard_dir(&self, publisher: &str) -> PathBuf {
        self.manifests_dir().join(shard_for(publisher))
    }

    /// `<mirror>/manifests/<shard>/<publisher>`
    pub fn publisher_manifest_dir(&self, publisher: &str) -> PathBuf {
        self.shard_dir(publisher).join(publisher)
    }

    /// `<mirror>/manifests/<shard>/<publisher>/<package>`
    pub fn package_manifest_dir(&self, id: &PackageIdentity) -> PathBuf {
        self.publisher_manifest_dir(&id.publisher).join(&id.package)
    }

    /// `<mirror>/manifests/<shard>/<publisher>/<package>/<version>`
    pub fn version_manifest_dir(&self, id: &PackageIdentity, version: &str) -> PathBuf {
        self.package_manifest_dir(id).join(version)
    }

    /// Primary manifest `<Publisher>.<Package>.yaml`
    pub fn primary_manifest_path(&self, id: &PackageIdentity, version: &str) -> PathBuf {
        self.version_manifest_dir(id, version)
            .join(format!("{}.yaml", id.manifest_stem()))
    }

    /// Split installer manifest `<Publisher>.<Package>.installer.yaml`
    pub fn installer_manifest_path(&self, id: &PackageIdentity, version: &str) -> PathBuf {
        self.version_manifest_dir(id, version)
            .join(format!("{}.installer.yaml", id.manifest_stem()))
    }

    /// `downloads/<publisher>`
    pub fn publisher_download_dir(&self, id: &PackageIdentity) -> PathBuf {
        self.downloads_dir.join(&id.publisher)
    }

    /// `downloads/<publisher>/<package>`
    pub fn package_download_dir(&self, id: &PackageIdentity) -> PathBuf {
        self.publisher_download_dir(id).join(&id.package)
    }

    /// `downloads/<publisher>/<package>/<version>`
    pub fn download_dir(&self, id: &PackageIdentity, version: &str) -> PathBuf {
        self.package_download_dir(id).join(version)
    }

    /// Same relative manifest location re-rooted under `output`
    pub fn output_manifest_dir(output: &Path, id: &PackageIdentity, version: &str) -> PathBuf {
        output
            .join(MANIFESTS_DIR)
            .join(id.shard())
            .join(&id.publisher)
            .join(&id.package)
            .join(version)
    }
}

/// In-flight download path for a final destination
pub fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(PARTIAL_SUFFIX);
    dest.with_file_name(name)
}

/// URL under which the mirror serves a fetched installer
pub fn mirror_url(server_base: &str, id: &PackageIdentity, version: &str, filename: &str) -> String {
    format!(
        "{}/{}/{}/{}/{}/{}",
        server_base.trim_end_matches('/'),
        DOWNLOADS_DIR,
        id.publisher,
        id.package,
        version,
        filename
    )
}
