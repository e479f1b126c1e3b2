// src/lib.rs

//! winget manifest mirror
//!
//! Keeps a local copy of selected winget packages: the manifest tree (a
//! sparse git checkout) plus the installer files of each package's newest
//! version, with a JSON ledger of SHA-256 digests that can later prove the
//! files are intact.
//!
//! # Architecture
//!
//! - `version`: total order over version directory names
//! - `manifest`: manifest loading, latest-version resolution, URL patching
//! - `fetch` / `verify` / `purge`: operations on one package's ledger record
//! - `state`: `config.json` and the `state.json` ledger
//! - `mirror`: batch operations over a project directory

mod error;
pub mod fetch;
pub mod hash;
pub mod manifest;
pub mod mirror;
pub mod package;
pub mod paths;
pub mod purge;
pub mod state;
pub mod transfer;
pub mod vcs;
pub mod verify;
pub mod version;

pub use error::{Error, Result};
pub use fetch::{fetch_package, FetchReport};
pub use manifest::{InstallerEntry, ManifestResolver, ResolveError, ResolvedPackage};
pub use mirror::{Mirror, PackageStatus, RefreshSummary, StatusRow, SyncSummary, ValidationSummary};
pub use package::{PackageFilter, PackageIdentity};
pub use paths::MirrorLayout;
pub use purge::purge_package;
pub use state::{init_project, DownloadRecord, InitOutcome, MirrorConfig, MirrorState};
pub use transfer::{HttpTransfer, Transfer};
pub use verify::{verify_package, FileCheck, FileStatus, VerifyReport, VerifyStatus};
