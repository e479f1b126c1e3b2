// src/state.rs

//! Persistent mirror configuration and download ledger
//!
//! A mirror project directory holds two JSON documents:
//!
//! - `config.json` ([`MirrorConfig`]): where manifests come from, read-only
//!   during a run.
//! - `state.json` ([`MirrorState`]): the project path, the last sync time,
//!   and the `downloads` ledger of [`DownloadRecord`]s keyed by
//!   `Publisher.Package`.
//!
//! Both are loaded and saved as whole documents. Saves go through a temporary
//! file in the same directory that is then persisted over the target.

use crate::error::{Error, Result};
use crate::package::PackageIdentity;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Config file name inside the project directory
pub const CONFIG_FILE: &str = "config.json";

/// State file name inside the project directory
pub const STATE_FILE: &str = "state.json";

/// Default manifest repository
pub const DEFAULT_REPO_URL: &str = "https://github.com/microsoft/winget-pkgs";

/// Where manifests come from and where they are cloned
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MirrorConfig {
    /// git URL of the manifest repository
    pub repo_url: String,
    /// Branch, tag or commit to check out
    pub revision: String,
    /// Clone directory name, relative to the project path
    pub mirror_dir: String,
    /// Base URL the downloads directory is served from
    pub server_url: Option<String>,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            repo_url: DEFAULT_REPO_URL.to_string(),
            revision: "master".to_string(),
            mirror_dir: "mirror".to_string(),
            server_url: None,
        }
    }
}

impl MirrorConfig {
    pub fn load(path: &Path) -> Result<Self> {
        read_json(path)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        write_json_atomic(path, self)
    }
}

/// Ledger entry for one tracked package
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadRecord {
    /// Version whose installers are recorded
    pub version: String,
    /// Manifest tree revision when this record was created for `version`
    #[serde(rename = "git_rev")]
    pub git_revision: String,
    /// Filename to lowercase hex SHA-256
    #[serde(default)]
    pub files: BTreeMap<String, String>,
    /// Last time a file was newly recorded (RFC 3339)
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl DownloadRecord {
    pub fn new(version: impl Into<String>, git_revision: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            git_revision: git_revision.into(),
            files: BTreeMap::new(),
            timestamp: None,
        }
    }
}

/// The persisted state document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MirrorState {
    /// Absolute project directory
    #[serde(rename = "path")]
    pub base_path: PathBuf,
    /// Last batch sync or refresh (RFC 3339)
    #[serde(default)]
    pub last_sync: Option<String>,
    /// Ledger keyed by `Publisher.Package`
    #[serde(default)]
    pub downloads: BTreeMap<String, DownloadRecord>,
}

impl MirrorState {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
            last_sync: None,
            downloads: BTreeMap::new(),
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        read_json(path)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        debug!("Saving state ({} tracked packages) to {}", self.downloads.len(), path.display());
        write_json_atomic(path, self)
    }

    pub fn record(&self, id: &PackageIdentity) -> Option<&DownloadRecord> {
        self.downloads.get(&id.id())
    }

    pub fn insert_record(&mut self, id: &PackageIdentity, record: DownloadRecord) {
        self.downloads.insert(id.id(), record);
    }

    pub fn remove_record(&mut self, id: &PackageIdentity) -> Option<DownloadRecord> {
        self.downloads.remove(&id.id())
    }

    /// Tracked package identities, in ledger order
    ///
    /// Keys that are not `Publisher.Package` are skipped.
    pub fn tracked(&self) -> Vec<PackageIdentity> {
        self.downloads
            .keys()
            .filter_map(|key| key.parse().ok())
            .collect()
    }

    /// Tracked packages whose publisher starts with `filter` (case-insensitive)
    pub fn tracked_matching(&self, filter: &str) -> Vec<PackageIdentity> {
        self.tracked()
            .into_iter()
            .filter(|id| id.publisher_matches(filter))
            .collect()
    }

    pub fn touch_last_sync(&mut self) {
        self.last_sync = Some(current_timestamp());
    }
}

/// Result of [`init_project`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitOutcome {
    Created(PathBuf),
    AlreadyInitialized(PathBuf),
}

/// Create a project directory with default config and empty state
///
/// Does nothing if `config.json` already exists there.
pub fn init_project(path: &Path) -> Result<InitOutcome> {
    let project = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map_err(|e| Error::InitError(format!("Cannot determine current directory: {}", e)))?
            .join(path)
    };

    fs::create_dir_all(&project).map_err(|e| {
        Error::InitError(format!("Failed to create {}: {}", project.display(), e))
    })?;
    let project = fs::canonicalize(&project).unwrap_or(project);

    let config_path = project.join(CONFIG_FILE);
    if config_path.exists() {
        return Ok(InitOutcome::AlreadyInitialized(project));
    }

    MirrorConfig::default().save(&config_path)?;
    MirrorState::new(&project).save(&project.join(STATE_FILE))?;

    info!("Initialized mirror at {}", project.display());
    Ok(InitOutcome::Created(project))
}

/// Current time as an RFC 3339 string
pub fn current_timestamp() -> String {
    Utc::now().to_rfc3339()
}

/// Render a stored timestamp as `YYYY-MM-DD HH:MM`
///
/// Accepts RFC 3339 and naive ISO 8601 (`2024-05-01T12:30:00.123456`), and
/// returns anything else unchanged.
pub fn format_timestamp(timestamp: &str) -> String {
    const DISPLAY: &str = "%Y-%m-%d %H:%M";

    if let Ok(dt) = DateTime::parse_from_rfc3339(timestamp) {
        return dt.format(DISPLAY).to_string();
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(timestamp, "%Y-%m-%dT%H:%M:%S%.f") {
        return dt.format(DISPLAY).to_string();
    }
    timestamp.to_string()
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::NotFoundError(format!("{} not found", path.display()))
        } else {
            Error::IoError(format!("Failed to read {}: {}", path.display(), e))
        }
    })?;
    serde_json::from_str(&content)
        .map_err(|e| Error::ParseError(format!("Invalid JSON in {}: {}", path.display(), e)))
}

fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));

    let mut temp = tempfile::NamedTempFile::new_in(dir).map_err(|e| {
        Error::IoError(format!("Failed to create temp file in {}: {}", dir.display(), e))
    })?;
    serde_json::to_writer_pretty(&mut temp, value)
        .map_err(|e| Error::ParseError(format!("Failed to serialize {}: {}", path.display(), e)))?;
    temp.write_all(b"\n")?;
    temp.persist(path).map_err(|e| {
        Error::IoError(format!("Failed to write {}: {}", path.display(), e.error))
    })?;
    Ok(())
}
