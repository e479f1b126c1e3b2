// src/commands/prompt.rs

//! Interactive confirmation

use anyhow::Result;
use std::io::{self, BufRead, Write};

/// Ask a yes/no question on stdin, defaulting to no
pub fn confirm(question: &str) -> Result<bool> {
    let mut stdout = io::stdout();
    write!(stdout, "{} (yes/no) [no]: ", question)?;
    stdout.flush()?;

    let mut input = String::new();
    io::stdin().lock().read_line(&mut input)?;
    Ok(is_affirmative(&input))
}

fn is_affirmative(input: &str) -> bool {
    matches!(input.trim().to_lowercase().as_str(), "y" | "yes")
}
