// src/commands/sync.rs

//! Download commands

use super::open_mirror;
use anyhow::{bail, Result};
use winget_mirror::{HttpTransfer, PackageFilter};

fn transfer(quiet: bool) -> Result<HttpTransfer> {
    let transfer = HttpTransfer::new()?;
    Ok(if quiet { transfer.quiet() } else { transfer })
}

/// Download the latest installers of every package matching `filter`
pub fn cmd_sync(path: &str, filter: &str, quiet: bool) -> Result<()> {
    let filter = PackageFilter::parse(filter)?;
    let mut mirror = open_mirror(path)?;
    let revision = mirror.current_revision()?;

    let summary = mirror.sync(&filter, &revision, &transfer(quiet)?)?;
    if summary.matched == 0 {
        bail!("No packages found matching '{}'", filter.publisher);
    }

    println!("Matched {} package(s)", summary.matched);
    println!("  Downloaded:      {}", summary.downloaded);
    println!("  Up to date:      {}", summary.up_to_date);
    if summary.empty > 0 {
        println!("  No installers:   {}", summary.empty);
    }
    if summary.skipped > 0 {
        println!("  Skipped:         {}", summary.skipped);
    }
    if !summary.failed.is_empty() {
        println!("  Failed:          {}", summary.failed.len());
        for (id, err) in &summary.failed {
            println!("    {}: {}", id, err);
        }
    }
    Ok(())
}

/// Update every tracked package that has a newer version
pub fn cmd_refresh_synced(path: &str, quiet: bool) -> Result<()> {
    let mut mirror = open_mirror(path)?;
    if mirror.state().downloads.is_empty() {
        println!("No synced packages found.");
        return Ok(());
    }
    let revision = mirror.current_revision()?;

    let summary = mirror.refresh(&revision, &transfer(quiet)?)?;
    for (id, from, to) in &summary.updated {
        println!("  {} {} -> {}", id, from, to);
    }
    println!(
        "Refreshed {} of {} package(s)",
        summary.updated.len(),
        summary.checked
    );
    for (id, err) in &summary.failed {
        println!("  Failed {}: {}", id, err);
    }
    Ok(())
}
