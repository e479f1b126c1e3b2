// src/package.rs

//! Package identity and filter matching

use crate::error::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// A `(publisher, package)` pair, displayed as `Publisher.Package`
///
/// The package part may itself contain dots; only the first dot separates
/// the publisher.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PackageIdentity {
    pub publisher: String,
    pub package: String,
}

impl PackageIdentity {
    pub fn new(publisher: impl Into<String>, package: impl Into<String>) -> Self {
        Self {
            publisher: publisher.into(),
            package: package.into(),
        }
    }

    /// Ledger key and display form
    pub fn id(&self) -> String {
        format!("{}.{}", self.publisher, self.package)
    }

    /// Manifest file stem, identical to the id
    pub fn manifest_stem(&self) -> String {
        self.id()
    }

    /// Shard directory name: the publisher's first character, lowercased
    pub fn shard(&self) -> String {
        shard_for(&self.publisher)
    }

    /// Case-insensitive prefix match of the publisher against a filter
    pub fn publisher_matches(&self, filter: &str) -> bool {
        prefix_matches(&self.publisher, filter)
    }
}

impl fmt::Display for PackageIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.publisher, self.package)
    }
}

impl FromStr for PackageIdentity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.split_once('.') {
            Some((publisher, package)) if !publisher.is_empty() && !package.is_empty() => {
                Ok(Self::new(publisher, package))
            }
            _ => Err(Error::InvalidPackageId(s.to_string())),
        }
    }
}

/// A `Publisher[/Package]` filter as accepted by `sync`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageFilter {
    pub publisher: String,
    pub package: Option<String>,
}

impl PackageFilter {
    pub fn parse(s: &str) -> Result<Self> {
        let (publisher, package) = match s.split_once('/') {
            Some((p, k)) => (p, Some(k.to_string()).filter(|k| !k.is_empty())),
            None => (s, None),
        };
        if publisher.is_empty() {
            return Err(Error::ConfigError(format!(
                "Publisher filter must not be empty (got '{}')",
                s
            )));
        }
        Ok(Self {
            publisher: publisher.to_string(),
            package,
        })
    }

    /// Whether a package directory name passes the package part of the filter
    pub fn package_matches(&self, package: &str) -> bool {
        self.package
            .as_deref()
            .is_none_or(|filter| prefix_matches(package, filter))
    }
}

/// Shard directory for a publisher name or filter
///
/// Empty input maps to an empty shard, which never exists on disk.
pub fn shard_for(name: &str) -> String {
    name.chars()
        .next()
        .map(|c| c.to_lowercase().collect())
        .unwrap_or_default()
}

/// Case-insensitive prefix match
pub fn prefix_matches(name: &str, filter: &str) -> bool {
    name.to_lowercase().starts_with(&filter.to_lowercase())
}
