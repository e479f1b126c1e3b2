// src/verify.rs

//! Integrity verification of recorded downloads
//!
//! Recomputes the SHA-256 of every file the ledger records for a package and
//! compares it byte-exactly with the recorded digest. The manifest's declared
//! hash plays no part here. Verification never mutates the ledger.

use crate::error::{Error, Result};
use crate::hash::sha256_file;
use crate::package::PackageIdentity;
use crate::paths::MirrorLayout;
use crate::state::MirrorState;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use tracing::debug;

/// What the verifier found before looking at individual files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VerifyStatus {
    /// No ledger record for the package
    NotTracked,
    /// A record exists but lists no files
    NothingRecorded,
    /// Files are recorded but the version directory is gone
    DirectoryMissing,
    /// Each recorded file was checked
    Checked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FileStatus {
    Match,
    Mismatch,
}

/// Result for one recorded file present on disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileCheck {
    pub status: FileStatus,
    pub expected: String,
    pub computed: String,
}

/// Verification result for one package
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerifyReport {
    pub status: VerifyStatus,
    pub valid: bool,
    pub version: Option<String>,
    pub files: BTreeMap<String, FileCheck>,
    pub missing_files: Vec<String>,
    pub unexpected_files: Vec<String>,
}

impl VerifyReport {
    fn empty(status: VerifyStatus, valid: bool, version: Option<String>) -> Self {
        Self {
            status,
            valid,
            version,
            files: BTreeMap::new(),
            missing_files: Vec::new(),
            unexpected_files: Vec::new(),
        }
    }

    pub fn mismatched(&self) -> impl Iterator<Item = (&String, &FileCheck)> {
        self.files
            .iter()
            .filter(|(_, check)| check.status == FileStatus::Mismatch)
    }
}

/// Verify the recorded files of one package against the disk
///
/// Errors only when a present file cannot be read.
pub fn verify_package(
    layout: &MirrorLayout,
    state: &MirrorState,
    id: &PackageIdentity,
) -> Result<VerifyReport> {
    let Some(record) = state.record(id) else {
        return Ok(VerifyReport::empty(VerifyStatus::NotTracked, false, None));
    };
    let version = Some(record.version.clone());

    if record.files.is_empty() {
        return Ok(VerifyReport::empty(VerifyStatus::NothingRecorded, true, version));
    }

    let dir = layout.download_dir(id, &record.version);
    if !dir.is_dir() {
        debug!("Download directory {} does not exist", dir.display());
        return Ok(VerifyReport::empty(VerifyStatus::DirectoryMissing, false, version));
    }

    let on_disk: BTreeSet<String> = fs::read_dir(&dir)
        .map_err(|e| Error::IoError(format!("Failed to list {}: {}", dir.display(), e)))?
        .flatten()
        .filter(|entry| entry.file_type().is_ok_and(|t| t.is_file()))
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .collect();

    let mut report = VerifyReport::empty(VerifyStatus::Checked, true, version);

    for (filename, expected) in &record.files {
        if !on_disk.contains(filename) {
            report.missing_files.push(filename.clone());
            report.valid = false;
            continue;
        }

        let path = dir.join(filename);
        let computed = sha256_file(&path)
            .map_err(|e| Error::IoError(format!("Failed to hash {}: {}", path.display(), e)))?;
        let status = if computed == *expected {
            FileStatus::Match
        } else {
            report.valid = false;
            FileStatus::Mismatch
        };
        report.files.insert(
            filename.clone(),
            FileCheck {
                status,
                expected: expected.clone(),
                computed,
            },
        );
    }

    report.unexpected_files = on_disk
        .into_iter()
        .filter(|name| !record.files.contains_key(name))
        .collect();

    Ok(report)
}
