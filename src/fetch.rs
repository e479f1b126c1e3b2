// src/fetch.rs

//! Fetching the installers of a resolved package version
//!
//! [`fetch_package`] folds one resolved version into the package's ledger
//! record:
//!
//! - Files already on disk under their final name are hashed and adopted,
//!   never re-downloaded.
//! - Missing files go through the [`Transfer`] primitive. A transfer error
//!   aborts the package immediately and is returned to the caller.
//! - A digest that differs from the manifest's `InstallerSha256` is logged
//!   and recorded anyway. The mirror keeps what was actually served.
//!
//! When the resolved version is newer than the recorded one, the pass starts
//! from a fresh record stamped with the current tree revision. The old
//! version's directory is removed only once the new pass has succeeded. A
//! resolved version that is not newer than a different recorded one (the
//! tree is checked out at an older revision) is held back and the record
//! and its files stay as they are.

use crate::error::{Error, Result};
use crate::hash::{digest_matches, sha256_file};
use crate::manifest::ResolvedPackage;
use crate::package::PackageIdentity;
use crate::paths::MirrorLayout;
use crate::state::{current_timestamp, DownloadRecord, MirrorState};
use crate::transfer::Transfer;
use crate::version::is_newer;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

/// Outcome of one successful fetch pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchReport {
    pub identity: PackageIdentity,
    pub version: String,
    /// Files transferred during this pass
    pub downloaded: Vec<String>,
    /// Files found on disk and newly recorded
    pub adopted: Vec<String>,
    /// Downloaded files whose digest differs from the manifest
    pub mismatched: Vec<String>,
    /// Installer entries without a usable filename
    pub skipped: usize,
    /// Version the record held before this pass, if it changed
    pub previous_version: Option<String>,
    /// Resolved version left unfetched because the record holds a newer one
    pub held_back: Option<String>,
    /// Whether the record now holds at least one file
    pub has_files: bool,
}

impl FetchReport {
    /// Nothing had to be transferred
    pub fn is_up_to_date(&self) -> bool {
        self.downloaded.is_empty()
    }

    /// Something was added to the record
    pub fn changed(&self) -> bool {
        !self.downloaded.is_empty() || !self.adopted.is_empty()
    }
}

/// Fetch all missing installers of `resolved` and update its ledger record
///
/// `revision` is the manifest tree's checked-out revision, stamped on records
/// created by this pass. On error the ledger is left holding whatever was
/// recorded before the failing installer, except across a version change,
/// where the previous version's record is kept untouched.
pub fn fetch_package(
    layout: &MirrorLayout,
    state: &mut MirrorState,
    resolved: &ResolvedPackage,
    revision: &str,
    transfer: &dyn Transfer,
) -> Result<FetchReport> {
    let id = &resolved.identity;
    let existing = state.record(id).cloned();

    let (mut record, superseded) = match existing {
        Some(record) if record.version == resolved.version => (record, None),
        Some(current) if !is_newer(&resolved.version, &current.version) => {
            warn!(
                "{}: manifest tree offers {}, not newer than recorded {}; keeping the recorded version",
                id, resolved.version, current.version
            );
            return Ok(FetchReport {
                identity: id.clone(),
                version: current.version.clone(),
                downloaded: Vec::new(),
                adopted: Vec::new(),
                mismatched: Vec::new(),
                skipped: 0,
                previous_version: None,
                held_back: Some(resolved.version.clone()),
                has_files: !current.files.is_empty(),
            });
        }
        Some(old) => {
            info!(
                "{}: recorded version {} superseded by {}",
                id, old.version, resolved.version
            );
            (DownloadRecord::new(&resolved.version, revision), Some(old))
        }
        None => (DownloadRecord::new(&resolved.version, revision), None),
    };

    let mut report = FetchReport {
        identity: id.clone(),
        version: resolved.version.clone(),
        downloaded: Vec::new(),
        adopted: Vec::new(),
        mismatched: Vec::new(),
        skipped: 0,
        previous_version: superseded.as_ref().map(|old| old.version.clone()),
        held_back: None,
        has_files: false,
    };

    let download_dir = layout.download_dir(id, &resolved.version);
    let outcome = fs::create_dir_all(&download_dir)
        .map_err(|e| {
            Error::IoError(format!(
                "Failed to create directory {}: {}",
                download_dir.display(),
                e
            ))
        })
        .and_then(|()| fetch_installers(&download_dir, resolved, &mut record, &mut report, transfer));

    if let Err(e) = outcome {
        if superseded.is_none() {
            state.insert_record(id, record);
        }
        return Err(e);
    }

    if report.changed() || (record.timestamp.is_none() && !record.files.is_empty()) {
        record.timestamp = Some(current_timestamp());
    }
    report.has_files = !record.files.is_empty();
    state.insert_record(id, record);

    if let Some(old) = superseded {
        remove_superseded(&layout.download_dir(id, &old.version));
    }

    if report.downloaded.is_empty() && report.adopted.is_empty() {
        debug!("{} {} already up to date", id, resolved.version);
    }
    Ok(report)
}

fn fetch_installers(
    download_dir: &Path,
    resolved: &ResolvedPackage,
    record: &mut DownloadRecord,
    report: &mut FetchReport,
    transfer: &dyn Transfer,
) -> Result<()> {
    for entry in &resolved.installers {
        let Some(filename) = entry.filename() else {
            warn!(
                "{}: skipping installer with no filename in URL {}",
                resolved.identity, entry.url
            );
            report.skipped += 1;
            continue;
        };
        let dest = download_dir.join(&filename);

        if dest.exists() {
            if !record.files.contains_key(&filename) {
                let digest = hash_file(&dest)?;
                debug!("Recording existing file {} ({})", dest.display(), digest);
                record.files.insert(filename.clone(), digest);
                report.adopted.push(filename);
            }
            continue;
        }

        transfer.fetch(&entry.url, &dest)?;
        let digest = hash_file(&dest)?;

        if let Some(declared) = entry.expected_sha256.as_deref() {
            if !digest_matches(&digest, declared) {
                warn!(
                    "Hash mismatch for {}: manifest declares {}, got {}",
                    filename,
                    declared.trim(),
                    digest
                );
                report.mismatched.push(filename.clone());
            }
        }

        record.files.insert(filename.clone(), digest);
        report.downloaded.push(filename);
    }
    Ok(())
}

fn hash_file(path: &Path) -> Result<String> {
    sha256_file(path)
        .map_err(|e| Error::IoError(format!("Failed to hash {}: {}", path.display(), e)))
}

fn remove_superseded(dir: &Path) {
    if !dir.exists() {
        return;
    }
    match fs::remove_dir_all(dir) {
        Ok(()) => info!("Removed superseded downloads {}", dir.display()),
        Err(e) => debug!("Could not remove {}: {}", dir.display(), e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::sha256;
    use crate::manifest::InstallerEntry;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[derive(Default)]
    struct FakeTransfer {
        bodies: HashMap<String, Vec<u8>>,
        calls: RefCell<Vec<String>>,
    }

    impl FakeTransfer {
        fn serve(mut self, url: &str, body: &[u8]) -> Self {
            self.bodies.insert(url.to_string(), body.to_vec());
            self
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

    fn setup() -> (TempDir, MirrorLayout, MirrorState) {
        let dir = tempfile::tempdir().unwrap();
        let layout = MirrorLayout::new(dir.path(), "mirror");
        let state = MirrorState::new(dir.path());
        (dir, layout, state)
    }

    fn resolved(version: &str, installers: Vec<InstallerEntry>) -> ResolvedPackage {
        ResolvedPackage {
            identity: PackageIdentity::new("Contoso", "App"),
            version: version.to_string(),
            installers,
        }
    }

    #[test]
    fn test_fetch_new_package() {
        let (_dir, layout, mut state) = setup();
        let transfer = FakeTransfer::default()
            .serve("https://e.com/a.msi", b"alpha")
            .serve("https://e.com/b.msi", b"beta");
        let pkg = resolved(
            "1.0",
            vec![
                InstallerEntry::new("https://e.com/a.msi", Some(sha256(b"alpha").to_uppercase())),
                InstallerEntry::new("https://e.com/b.msi", None),
            ],
        );

        let report = fetch_package(&layout, &mut state, &pkg, "rev1", &transfer).unwrap();
        assert_eq!(report.downloaded, vec!["a.msi", "b.msi"]);
        assert!(report.mismatched.is_empty());
        assert!(report.has_files);

        let record = state.record(&pkg.identity).unwrap();
        assert_eq!(record.version, "1.0");
        assert_eq!(record.git_revision, "rev1");
        assert_eq!(record.files["a.msi"], sha256(b"alpha"));
        assert!(record.timestamp.is_some());
        assert!(layout.download_dir(&pkg.identity, "1.0").join("b.msi").is_file());
    }

    #[test]
    fn test_fetch_hash_mismatch_is_recorded() {
        let (_dir, layout, mut state) = setup();
        let transfer = FakeTransfer::default().serve("https://e.com/a.msi", b"served");
        let pkg = resolved(
            "1.0",
            vec![InstallerEntry::new("https://e.com/a.msi", Some("00".repeat(32)))],
        );

        let report = fetch_package(&layout, &mut state, &pkg, "rev", &transfer).unwrap();
        assert_eq!(report.mismatched, vec!["a.msi"]);
        assert_eq!(
            state.record(&pkg.identity).unwrap().files["a.msi"],
            sha256(b"served")
        );
    }

    #[test]
    fn test_fetch_adopts_existing_file_without_transfer() {
        let (_dir, layout, mut state) = setup();
        let pkg = resolved("1.0", vec![InstallerEntry::new("https://e.com/a.msi", None)]);
        let dir = layout.download_dir(&pkg.identity, "1.0");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("a.msi"), b"local").unwrap();

        let transfer = FakeTransfer::default();
        let report = fetch_package(&layout, &mut state, &pkg, "rev", &transfer).unwrap();

        assert!(transfer.calls.borrow().is_empty());
        assert!(report.is_up_to_date());
        assert_eq!(report.adopted, vec!["a.msi"]);
        let record = state.record(&pkg.identity).unwrap();
        assert_eq!(record.files["a.msi"], sha256(b"local"));
        assert!(record.timestamp.is_some());
    }

    #[test]
    fn test_second_pass_is_noop() {
        let (_dir, layout, mut state) = setup();
        let transfer = FakeTransfer::default().serve("https://e.com/a.msi", b"alpha");
        let pkg = resolved("1.0", vec![InstallerEntry::new("https://e.com/a.msi", None)]);

        fetch_package(&layout, &mut state, &pkg, "rev", &transfer).unwrap();
        let before = state.record(&pkg.identity).cloned();

        let report = fetch_package(&layout, &mut state, &pkg, "rev2", &transfer).unwrap();
        assert!(!report.changed());
        assert_eq!(transfer.calls.borrow().len(), 1);
        assert_eq!(state.record(&pkg.identity).cloned(), before);
    }

    #[test]
    fn test_transfer_failure_keeps_partial_progress() {
        let (_dir, layout, mut state) = setup();
        let transfer = FakeTransfer::default().serve("https://e.com/a.msi", b"alpha");
        let pkg = resolved(
            "1.0",
            vec![
                InstallerEntry::new("https://e.com/a.msi", None),
                InstallerEntry::new("https://e.com/gone.msi", None),
            ],
        );

        let err = fetch_package(&layout, &mut state, &pkg, "rev", &transfer).unwrap_err();
        assert!(matches!(err, Error::DownloadError(_)));

        let record = state.record(&pkg.identity).unwrap();
        assert_eq!(record.files.len(), 1);
        assert!(record.files.contains_key("a.msi"));
        assert!(record.timestamp.is_none());
    }

    #[test]
    fn test_version_change_restamps_and_removes_old_dir() {
        let (_dir, layout, mut state) = setup();
        let transfer = FakeTransfer::default()
            .serve("https://e.com/1.0/app.exe", b"one")
            .serve("https://e.com/1.1/app.exe", b"one-one");

        let v1 = resolved("1.0", vec![InstallerEntry::new("https://e.com/1.0/app.exe", None)]);
        fetch_package(&layout, &mut state, &v1, "rev-a", &transfer).unwrap();

        let v2 = resolved("1.1", vec![InstallerEntry::new("https://e.com/1.1/app.exe", None)]);
        let report = fetch_package(&layout, &mut state, &v2, "rev-b", &transfer).unwrap();
        assert_eq!(report.previous_version.as_deref(), Some("1.0"));

        let record = state.record(&v2.identity).unwrap();
        assert_eq!(record.version, "1.1");
        assert_eq!(record.git_revision, "rev-b");
        assert_eq!(record.files["app.exe"], sha256(b"one-one"));
        assert!(!layout.download_dir(&v2.identity, "1.0").exists());
    }

    #[test]
    fn test_failed_upgrade_keeps_old_record() {
        let (_dir, layout, mut state) = setup();
        let transfer = FakeTransfer::default().serve("https://e.com/1.0/app.exe", b"one");

        let v1 = resolved("1.0", vec![InstallerEntry::new("https://e.com/1.0/app.exe", None)]);
        fetch_package(&layout, &mut state, &v1, "rev-a", &transfer).unwrap();
        let before = state.record(&v1.identity).cloned();

        let v2 = resolved("1.1", vec![InstallerEntry::new("https://e.com/1.1/app.exe", None)]);
        assert!(fetch_package(&layout, &mut state, &v2, "rev-b", &transfer).is_err());

        assert_eq!(state.record(&v1.identity).cloned(), before);
        assert!(layout.download_dir(&v1.identity, "1.0").join("app.exe").is_file());
    }

    #[test]
    fn test_older_resolved_version_is_held_back() {
        let (_dir, layout, mut state) = setup();
        let transfer = FakeTransfer::default()
            .serve("https://e.com/2.0/app.exe", b"two")
            .serve("https://e.com/1.0/app.exe", b"one");

        let v2 = resolved("2.0", vec![InstallerEntry::new("https://e.com/2.0/app.exe", None)]);
        fetch_package(&layout, &mut state, &v2, "rev-new", &transfer).unwrap();
        let before = state.record(&v2.identity).cloned();

        let v1 = resolved("1.0", vec![InstallerEntry::new("https://e.com/1.0/app.exe", None)]);
        let report = fetch_package(&layout, &mut state, &v1, "rev-old", &transfer).unwrap();

        assert_eq!(report.held_back.as_deref(), Some("1.0"));
        assert_eq!(report.version, "2.0");
        assert!(report.has_files);
        assert_eq!(transfer.calls.borrow().len(), 1);
        assert_eq!(state.record(&v2.identity).cloned(), before);
        assert!(layout.download_dir(&v2.identity, "2.0").join("app.exe").is_file());
        assert!(!layout.download_dir(&v2.identity, "1.0").exists());
    }

    #[test]
    fn test_unusable_url_is_skipped() {
        let (_dir, layout, mut state) = setup();
        let pkg = resolved("1.0", vec![InstallerEntry::new("https://e.com/dir/", None)]);

        let report =
            fetch_package(&layout, &mut state, &pkg, "rev", &FakeTransfer::default()).unwrap();
        assert_eq!(report.skipped, 1);
        assert!(!report.has_files);

        let record = state.record(&pkg.identity).unwrap();
        assert!(record.files.is_empty());
        assert!(record.timestamp.is_none());
    }
}
