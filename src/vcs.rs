// src/vcs.rs

//! Thin wrapper over the `git` command line for the manifest tree
//!
//! The manifest repository is cloned without a checkout, restricted to the
//! `manifests/` directory through sparse checkout, and then checked out at
//! the configured revision.

use crate::error::{Error, Result};
use crate::paths::MANIFESTS_DIR;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::{debug, info, warn};

/// A local clone of the manifest repository
pub struct ManifestRepo {
    dir: PathBuf,
}

impl ManifestRepo {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn exists(&self) -> bool {
        self.dir.join(".git").exists()
    }

    /// Clone or update the repository and check out `revision`
    ///
    /// Returns the checked-out commit.
    pub fn sync(&self, repo_url: &str, revision: &str) -> Result<String> {
        confirm_git_available()?;

        if self.exists() {
            info!("Updating repository at {}", self.dir.display());
            if self.sparse_checkout_enabled() {
                self.git(&["fetch", "origin"])?;
            } else {
                self.enable_sparse_checkout()?;
            }
        } else {
            warn!("Initial clone may take several minutes depending on your connection");
            info!("Cloning {} into {}", repo_url, self.dir.display());
            let target = self.dir.to_string_lossy().into_owned();
            run(Command::new("git").args(["clone", "--no-checkout", repo_url, &target]))?;
            self.enable_sparse_checkout()?;
        }

        self.git(&["checkout", revision])?;
        let head = self.current_revision()?;
        info!("Synced repository to {} ({})", revision, head);
        Ok(head)
    }

    /// Commit currently checked out
    pub fn current_revision(&self) -> Result<String> {
        let output = Command::new("git")
            .arg("-C")
            .arg(&self.dir)
            .args(["rev-parse", "HEAD"])
            .stderr(Stdio::null())
            .output()
            .map_err(|e| Error::VcsError(format!("Failed to run git: {e}")))?;
        if !output.status.success() {
            return Err(Error::VcsError(format!(
                "{} is not a git checkout (exit status: {})",
                self.dir.display(),
                output.status
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    fn sparse_checkout_enabled(&self) -> bool {
        Command::new("git")
            .arg("-C")
            .arg(&self.dir)
            .args(["config", "--get", "core.sparseCheckout"])
            .stderr(Stdio::null())
            .output()
            .map(|out| out.status.success() && String::from_utf8_lossy(&out.stdout).trim() == "true")
            .unwrap_or(false)
    }

    fn enable_sparse_checkout(&self) -> Result<()> {
        debug!("Enabling sparse checkout of {}/", MANIFESTS_DIR);
        self.git(&["config", "core.sparseCheckout", "true"])?;
        write_sparse_patterns(&self.dir)
    }

    fn git(&self, args: &[&str]) -> Result<()> {
        run(Command::new("git").arg("-C").arg(&self.dir).args(args))
    }
}

/// Check that a `git` binary is on the PATH
pub fn confirm_git_available() -> Result<()> {
    match Command::new("git").arg("--version").output() {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(Error::VcsError(
            "git was not found, confirm it is installed and on your PATH".to_string(),
        )),
        Err(e) => Err(Error::VcsError(format!(
            "Unexpected error checking for git: {e}"
        ))),
    }
}

fn write_sparse_patterns(repo_dir: &Path) -> Result<()> {
    let info_dir = repo_dir.join(".git").join("info");
    fs::create_dir_all(&info_dir)
        .map_err(|e| Error::IoError(format!("Failed to create {}: {}", info_dir.display(), e)))?;
    let file = info_dir.join("sparse-checkout");
    fs::write(&file, format!("{}/\n", MANIFESTS_DIR))
        .map_err(|e| Error::IoError(format!("Failed to write {}: {}", file.display(), e)))
}

fn run(cmd: &mut Command) -> Result<()> {
    debug!("Running {:?}", cmd);
    let status = cmd
        .stdout(Stdio::null())
        .status()
        .map_err(|e| Error::VcsError(format!("Failed to run git: {e}")))?;
    if !status.success() {
        return Err(Error::VcsError(format!(
            "{:?} failed | Exit status: {}",
            cmd, status
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_sparse_patterns() {
        let dir = tempfile::tempdir().unwrap();
        write_sparse_patterns(dir.path()).unwrap();
        let content =
            fs::read_to_string(dir.path().join(".git/info/sparse-checkout")).unwrap();
        assert_eq!(content, "manifests/\n");
    }

    #[test]
    fn test_plain_directory_is_not_a_clone() {
        let dir = tempfile::tempdir().unwrap();
        let repo = ManifestRepo::new(dir.path().join("mirror"));
        assert!(!repo.exists());
        assert!(repo.current_revision().is_err());
    }
}
