// src/commands/search.rs

//! Package search command

use super::open_mirror;
use anyhow::Result;

/// List packages under matching publishers with their mirror status
pub fn cmd_search(path: &str, publisher: &str) -> Result<()> {
    let mirror = open_mirror(path)?;
    let rows = mirror.search(publisher);

    if rows.is_empty() {
        println!("No packages found for publisher '{}'", publisher);
        return Ok(());
    }

    let cells: Vec<[String; 4]> = rows
        .iter()
        .map(|row| {
            [
                row.identity.id(),
                row.status.to_string(),
                row.version.clone().unwrap_or_else(|| "-".to_string()),
                row.timestamp.clone().unwrap_or_else(|| "-".to_string()),
            ]
        })
        .collect();

    let headers = ["Package", "Status", "Version", "Downloaded"];
    let mut widths = headers.map(str::len);
    for row in &cells {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.len());
        }
    }

    println!(
        "{:<w0$}  {:<w1$}  {:<w2$}  {}",
        headers[0],
        headers[1],
        headers[2],
        headers[3],
        w0 = widths[0],
        w1 = widths[1],
        w2 = widths[2]
    );
    println!(
        "{}  {}  {}  {}",
        "-".repeat(widths[0]),
        "-".repeat(widths[1]),
        "-".repeat(widths[2]),
        "-".repeat(widths[3])
    );
    for [id, status, version, timestamp] in &cells {
        println!(
            "{:<w0$}  {:<w1$}  {:<w2$}  {}",
            id,
            status,
            version,
            timestamp,
            w0 = widths[0],
            w1 = widths[1],
            w2 = widths[2]
        );
    }
    println!("\nTotal: {} package(s)", rows.len());
    Ok(())
}
