// src/mirror.rs

//! Mirror session: config, ledger and layout of one project directory
//!
//! A [`Mirror`] is opened once per command, loads `config.json` and
//! `state.json`, runs batch operations over matching packages and saves the
//! state after each package it mutates.

use crate::error::{Error, Result};
use crate::fetch::fetch_package;
use crate::manifest::patch::patch_manifest_dir;
use crate::manifest::ManifestResolver;
use crate::package::{PackageFilter, PackageIdentity};
use crate::paths::MirrorLayout;
use crate::purge::purge_package;
use crate::state::{format_timestamp, MirrorConfig, MirrorState, CONFIG_FILE, STATE_FILE};
use crate::transfer::Transfer;
use crate::vcs::ManifestRepo;
use crate::verify::{verify_package, VerifyReport};
use crate::version::is_newer;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// Counts reported by [`Mirror::sync`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncSummary {
    pub matched: usize,
    /// Packages with at least one file transferred
    pub downloaded: usize,
    /// Packages that needed no transfer
    pub up_to_date: usize,
    /// Packages whose record still holds no file
    pub empty: usize,
    /// Packages that could not be resolved, or whose recorded version is
    /// newer than the manifest tree's
    pub skipped: usize,
    /// Packages whose transfer failed, with the error
    pub failed: Vec<(String, String)>,
}

/// Counts reported by [`Mirror::refresh`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshSummary {
    pub checked: usize,
    /// `(id, old version, new version)`
    pub updated: Vec<(String, String, String)>,
    pub skipped: usize,
    pub failed: Vec<(String, String)>,
}

/// Verification of every tracked package
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationSummary {
    pub all_valid: bool,
    pub packages: BTreeMap<String, VerifyReport>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub errors: BTreeMap<String, String>,
}

/// Mirror status of one package, as shown by `search`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageStatus {
    Downloaded,
    DownloadedEmpty,
    DownloadedMissing,
    Recorded,
    NotDownloaded,
}

impl fmt::Display for PackageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Downloaded => "Downloaded",
            Self::DownloadedEmpty => "Downloaded (empty)",
            Self::DownloadedMissing => "Downloaded (missing)",
            Self::Recorded => "Recorded",
            Self::NotDownloaded => "Not downloaded",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusRow {
    pub identity: PackageIdentity,
    pub status: PackageStatus,
    pub version: Option<String>,
    pub timestamp: Option<String>,
}

pub struct Mirror {
    config: MirrorConfig,
    state: MirrorState,
    layout: MirrorLayout,
    state_path: PathBuf,
}

impl Mirror {
    /// Open an initialized project directory
    pub fn open(path: &Path) -> Result<Self> {
        let root = fs::canonicalize(path).map_err(|e| {
            Error::InitError(format!("Cannot open mirror at {}: {}", path.display(), e))
        })?;

        let config_path = root.join(CONFIG_FILE);
        if !config_path.is_file() {
            return Err(Error::InitError(format!(
                "{} is not an initialized mirror (run `winget-mirror init`)",
                root.display()
            )));
        }
        let config = MirrorConfig::load(&config_path)?;

        let state_path = root.join(STATE_FILE);
        let state = if state_path.is_file() {
            MirrorState::load(&state_path)?
        } else {
            warn!("{} missing, starting with an empty ledger", state_path.display());
            MirrorState::new(&root)
        };

        let layout = MirrorLayout::new(&root, &config.mirror_dir);
        Ok(Self {
            config,
            state,
            layout,
            state_path,
        })
    }

    pub fn config(&self) -> &MirrorConfig {
        &self.config
    }

    pub fn state(&self) -> &MirrorState {
        &self.state
    }

    pub fn layout(&self) -> &MirrorLayout {
        &self.layout
    }

    pub fn resolver(&self) -> ManifestResolver<'_> {
        ManifestResolver::new(&self.layout)
    }

    pub fn repo(&self) -> ManifestRepo {
        ManifestRepo::new(self.layout.mirror_dir())
    }

    pub fn save(&self) -> Result<()> {
        self.state.save(&self.state_path)
    }

    /// Clone or update the manifest tree at the configured revision
    pub fn sync_repo(&self) -> Result<String> {
        self.repo().sync(&self.config.repo_url, &self.config.revision)
    }

    /// Revision of the manifest tree on disk
    pub fn current_revision(&self) -> Result<String> {
        if !self.layout.manifests_dir().is_dir() {
            return Err(Error::NotFoundError(format!(
                "No manifest tree at {} (run `winget-mirror sync-repo`)",
                self.layout.mirror_dir().display()
            )));
        }
        self.repo().current_revision()
    }

    /// Fetch the latest version of every package matching `filter`
    pub fn sync(
        &mut self,
        filter: &PackageFilter,
        revision: &str,
        transfer: &dyn Transfer,
    ) -> Result<SyncSummary> {
        let mut summary = SyncSummary::default();
        let resolver = ManifestResolver::new(&self.layout);

        let packages = resolver.matching_packages(filter);
        if packages.is_empty() {
            warn!("No packages match '{}'", filter.publisher);
        }

        for id in packages {
            summary.matched += 1;
            let resolved = match resolver.resolve(&id) {
                Ok(resolved) => resolved,
                Err(e) => {
                    warn!("Skipping {}: {}", id, e);
                    summary.skipped += 1;
                    continue;
                }
            };

            match fetch_package(&self.layout, &mut self.state, &resolved, revision, transfer) {
                Ok(report) if report.held_back.is_some() => summary.skipped += 1,
                Ok(report) if !report.has_files => summary.empty += 1,
                Ok(report) if report.is_up_to_date() => summary.up_to_date += 1,
                Ok(_) => summary.downloaded += 1,
                Err(e) => {
                    error!("Failed to fetch {}: {}", id, e);
                    summary.failed.push((id.id(), e.to_string()));
                }
            }
            self.state.save(&self.state_path)?;
        }

        self.state.touch_last_sync();
        self.save()?;
        info!(
            "Sync complete: {} downloaded, {} up to date, {} skipped, {} failed",
            summary.downloaded,
            summary.up_to_date,
            summary.skipped,
            summary.failed.len()
        );
        Ok(summary)
    }

    /// Move every tracked package whose manifest tree has a newer version
    pub fn refresh(&mut self, revision: &str, transfer: &dyn Transfer) -> Result<RefreshSummary> {
        let mut summary = RefreshSummary::default();
        let resolver = ManifestResolver::new(&self.layout);

        for id in self.state.tracked() {
            summary.checked += 1;
            let Some(recorded) = self.state.record(&id).map(|r| r.version.clone()) else {
                continue;
            };

            let latest = match resolver.latest_version(&id) {
                Ok(latest) => latest,
                Err(e) => {
                    warn!("Skipping {}: {}", id, e);
                    summary.skipped += 1;
                    continue;
                }
            };
            if !is_newer(&latest, &recorded) {
                continue;
            }

            let resolved = match resolver.resolve(&id) {
                Ok(resolved) => resolved,
                Err(e) => {
                    warn!("Skipping {}: {}", id, e);
                    summary.skipped += 1;
                    continue;
                }
            };

            info!("Updating {} from {} to {}", id, recorded, resolved.version);
            match fetch_package(&self.layout, &mut self.state, &resolved, revision, transfer) {
                Ok(report) => summary.updated.push((id.id(), recorded, report.version)),
                Err(e) => {
                    error!("Failed to update {}: {}", id, e);
                    summary.failed.push((id.id(), e.to_string()));
                }
            }
            self.state.save(&self.state_path)?;
        }

        self.state.touch_last_sync();
        self.save()?;
        Ok(summary)
    }

    /// Verify one package
    pub fn verify(&self, id: &PackageIdentity) -> Result<VerifyReport> {
        verify_package(&self.layout, &self.state, id)
    }

    /// Verify every tracked package
    pub fn verify_all(&self) -> ValidationSummary {
        let mut summary = ValidationSummary {
            all_valid: true,
            ..ValidationSummary::default()
        };

        for id in self.state.tracked() {
            match self.verify(&id) {
                Ok(report) => {
                    summary.all_valid &= report.valid;
                    summary.packages.insert(id.id(), report);
                }
                Err(e) => {
                    error!("Failed to verify {}: {}", id, e);
                    summary.all_valid = false;
                    summary.errors.insert(id.id(), e.to_string());
                }
            }
        }
        summary
    }

    /// Tracked packages whose publisher starts with `publisher`
    pub fn tracked_matching(&self, publisher: &str) -> Vec<PackageIdentity> {
        self.state.tracked_matching(publisher)
    }

    pub fn tracked(&self) -> Vec<PackageIdentity> {
        self.state.tracked()
    }

    /// Purge each package, saving state after every removal
    pub fn purge(&mut self, ids: &[PackageIdentity]) -> Result<usize> {
        let mut purged = 0;
        for id in ids {
            if purge_package(&self.layout, &mut self.state, id) {
                info!("Purged {}", id);
                self.save()?;
                purged += 1;
            }
        }
        Ok(purged)
    }

    /// Mirror status of one package
    pub fn package_status(&self, id: &PackageIdentity) -> StatusRow {
        let row = |status, version: Option<String>, timestamp: Option<String>| StatusRow {
            identity: id.clone(),
            status,
            version,
            timestamp,
        };

        let Some(record) = self.state.record(id) else {
            return row(PackageStatus::NotDownloaded, None, None);
        };
        if record.files.is_empty() {
            return row(PackageStatus::Recorded, Some(record.version.clone()), None);
        }

        let dir = self.layout.download_dir(id, &record.version);
        let Ok(mut entries) = fs::read_dir(&dir) else {
            return row(PackageStatus::DownloadedMissing, None, None);
        };
        if entries.next().is_none() {
            return row(PackageStatus::DownloadedEmpty, None, None);
        }

        row(
            PackageStatus::Downloaded,
            Some(record.version.clone()),
            record.timestamp.as_deref().map(format_timestamp),
        )
    }

    /// Status of every package under publishers matching `publisher`
    pub fn search(&self, publisher: &str) -> Vec<StatusRow> {
        let resolver = self.resolver();
        resolver
            .matching_publishers(publisher)
            .iter()
            .flat_map(|p| resolver.packages_of(p))
            .map(|id| self.package_status(&id))
            .collect()
    }

    /// Write URL-patched copies of every tracked package's manifests
    ///
    /// `server_url` overrides the configured one. Returns the number of
    /// packages patched.
    pub fn patch_repo(&self, output: &Path, server_url: Option<&str>) -> Result<usize> {
        let server = server_url
            .or(self.config.server_url.as_deref())
            .ok_or_else(|| {
                Error::ConfigError(
                    "No server URL given and none configured in config.json".to_string(),
                )
            })?;

        let tracked = self.state.tracked();
        if tracked.is_empty() {
            info!("No downloaded packages in {}", STATE_FILE);
            return Ok(0);
        }

        fs::create_dir_all(output)
            .map_err(|e| Error::IoError(format!("Failed to create {}: {}", output.display(), e)))?;

        let mut patched = 0;
        for id in tracked {
            let Some(record) = self.state.record(&id) else {
                continue;
            };
            let source = self.layout.version_manifest_dir(&id, &record.version);
            if !source.is_dir() {
                warn!(
                    "Source manifest directory not found for {}: {}",
                    id,
                    source.display()
                );
                continue;
            }
            let target = MirrorLayout::output_manifest_dir(output, &id, &record.version);
            patch_manifest_dir(&source, &target, server, &id, &record.version)?;
            info!("Patched manifests for {}", id);
            patched += 1;
        }
        Ok(patched)
    }
}
