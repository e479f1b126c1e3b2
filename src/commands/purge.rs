// src/commands/purge.rs

//! Purge commands

use super::open_mirror;
use super::prompt::confirm;
use anyhow::Result;
use winget_mirror::{Mirror, PackageIdentity};

/// Purge tracked packages whose publisher starts with `publisher`
pub fn cmd_purge_package(path: &str, publisher: &str, yes: bool) -> Result<()> {
    let mut mirror = open_mirror(path)?;
    let targets = mirror.tracked_matching(publisher);
    if targets.is_empty() {
        println!("No tracked packages match '{}'", publisher);
        return Ok(());
    }
    purge_confirmed(&mut mirror, &targets, yes)
}

/// Purge every tracked package
pub fn cmd_purge_all_packages(path: &str, yes: bool) -> Result<()> {
    let mut mirror = open_mirror(path)?;
    let targets = mirror.tracked();
    if targets.is_empty() {
        println!("No tracked packages.");
        return Ok(());
    }
    purge_confirmed(&mut mirror, &targets, yes)
}

fn purge_confirmed(mirror: &mut Mirror, targets: &[PackageIdentity], yes: bool) -> Result<()> {
    println!("The following package(s) will be purged:");
    for id in targets {
        println!("  {}", id);
    }

    if !yes && !confirm(&format!("Purge {} package(s)?", targets.len()))? {
        println!("Aborted.");
        return Ok(());
    }

    let purged = mirror.purge(targets)?;
    println!("Purged {} package(s)", purged);
    Ok(())
}
