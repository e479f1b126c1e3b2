// src/commands/validate.rs

//! Integrity validation command

use super::open_mirror;
use crate::cli::OutputFormat;
use anyhow::Result;
use winget_mirror::{FileStatus, VerifyStatus};

/// Verify every tracked package
///
/// Returns whether all packages are valid.
pub fn cmd_validate_hash(path: &str, output: OutputFormat) -> Result<bool> {
    let mirror = open_mirror(path)?;
    let summary = mirror.verify_all();

    if output == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(summary.all_valid);
    }

    if summary.packages.is_empty() && summary.errors.is_empty() {
        println!("No packages tracked.");
        return Ok(true);
    }

    for (id, report) in &summary.packages {
        match report.status {
            VerifyStatus::NothingRecorded => {
                println!("Warning: No files recorded for {}", id);
                continue;
            }
            VerifyStatus::DirectoryMissing => {
                println!("Error: Download directory missing for {}", id);
                continue;
            }
            VerifyStatus::NotTracked => {
                println!("Error: {} is not tracked", id);
                continue;
            }
            VerifyStatus::Checked => {}
        }

        for (filename, check) in &report.files {
            let label = match check.status {
                FileStatus::Match => "MATCH",
                FileStatus::Mismatch => "MISMATCH",
            };
            println!("{} {}: {}", id, filename, label);
            if check.status == FileStatus::Mismatch {
                println!("  Tracked hash:  {}", check.expected);
                println!("  Computed hash: {}", check.computed);
            }
        }
        for missing in &report.missing_files {
            println!("Error: Missing file in {}: {}", id, missing);
        }
        for unexpected in &report.unexpected_files {
            println!("Warning: Unexpected file in {}: {}", id, unexpected);
        }
    }
    for (id, err) in &summary.errors {
        println!("Error: Could not verify {}: {}", id, err);
    }

    println!();
    if summary.all_valid {
        println!("All {} package(s) valid", summary.packages.len());
    } else {
        println!("Validation failed");
    }
    Ok(summary.all_valid)
}
