// src/hash.rs

//! SHA-256 hashing for installer integrity
//!
//! Every digest the mirror records or compares is a lowercase hex SHA-256
//! over the full file contents. Files are streamed, never read whole, since
//! installers routinely run to hundreds of megabytes.

use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// Buffer size for streaming file hashing (64 KB)
const HASH_BUFFER_SIZE: usize = 64 * 1024;

/// Compute SHA-256 of data from a reader, as lowercase hex
pub fn hash_reader<R: Read>(reader: &mut R) -> io::Result<String> {
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; HASH_BUFFER_SIZE];

    loop {
        let n = reader.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

/// Compute SHA-256 of a file on disk, as lowercase hex
pub fn sha256_file(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    hash_reader(&mut file)
}

/// Compute SHA-256 of a byte slice, as lowercase hex
#[inline]
pub fn sha256(data: &[u8]) -> String {
    format!("{:x}", Sha256::digest(data))
}

/// Compare a computed digest against a manifest-declared one
///
/// Manifests commonly declare uppercase hex, so the comparison ignores case.
/// Surrounding whitespace in the declared value is ignored as well.
pub fn digest_matches(computed: &str, declared: &str) -> bool {
    computed.eq_ignore_ascii_case(declared.trim())
}
