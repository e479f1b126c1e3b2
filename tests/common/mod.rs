// tests/common/mod.rs

//! Shared test utilities and helpers for integration tests.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use winget_mirror::{init_project, Error, Mirror, MirrorLayout, PackageIdentity, Result, Transfer};

/// Revision stamped on records created during tests
pub const TEST_REVISION: &str = "0123456789abcdef0123456789abcdef01234567";

/// Create an initialized mirror project.
///
/// Returns (TempDir, project path) - keep the TempDir alive to prevent cleanup.
pub fn setup_project() -> (TempDir, PathBuf) {
    let temp_dir = tempfile::tempdir().unwrap();
    let project = temp_dir.path().join("project");
    init_project(&project).unwrap();
    (temp_dir, project)
}

pub fn open(project: &Path) -> Mirror {
    Mirror::open(project).unwrap()
}

/// Writes version directories into a project's manifest tree
pub struct ManifestTree {
    layout: MirrorLayout,
}

impl ManifestTree {
    pub fn new(mirror: &Mirror) -> Self {
        Self {
            layout: mirror.layout().clone(),
        }
    }

    /// Primary manifest listing `installers` as (url, declared sha256)
    pub fn add_version(&self, id: &PackageIdentity, version: &str, installers: &[(&str, Option<&str>)]) {
        let mut manifest = format!(
            "PackageIdentifier: {}\nPackageVersion: {}\nManifestType: singleton\nManifestVersion: 1.6.0\nInstallers:\n",
            id, version
        );
        for (url, sha) in installers {
            manifest.push_str(&format!("  - InstallerUrl: {}\n", url));
            if let Some(sha) = sha {
                manifest.push_str(&format!("    InstallerSha256: {}\n", sha));
            }
        }
        if installers.is_empty() {
            manifest.push_str("  []\n");
        }
        self.write(self.layout.primary_manifest_path(id, version), &manifest);
    }

    pub fn write(&self, path: PathBuf, content: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }
}

/// In-memory transfer serving fixed bodies per URL
#[derive(Default)]
pub struct FakeTransfer {
    bodies: HashMap<String, Vec<u8>>,
    calls: RefCell<Vec<String>>,
}

impl FakeTransfer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn serve(mut self, url: &str, body: &[u8]) -> Self {
        self.bodies.insert(url.to_string(), body.to_vec());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }
}

impl Transfer for FakeTransfer {
    fn fetch(&self, url: &str, dest: &Path) -> Result<u64> {
        self.calls.borrow_mut().push(url.to_string());
        let body = self
            .bodies
            .get(url)
            .ok_or_else(|| Error::DownloadError(format!("HTTP 404 Not Found from {url}")))?;
        fs::write(dest, body)?;
        Ok(body.len() as u64)
    }
}
