// src/transfer.rs

//! Installer transfer primitive
//!
//! [`Transfer`] is the only way the fetcher reaches the network. The
//! production implementation, [`HttpTransfer`], wraps a blocking reqwest
//! client with retry support and streams the body into `<dest>.part` before
//! renaming it over the final name, so an interrupted transfer never leaves
//! a file that later passes would mistake for a complete download.

use crate::error::{Error, Result};
use crate::paths::partial_path;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::blocking::Client;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default timeout for HTTP requests (30 seconds)
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Maximum attempts for a failed connection
const MAX_RETRIES: u32 = 3;

/// Retry delay in milliseconds, multiplied by the attempt number
const RETRY_DELAY_MS: u64 = 1000;

/// Buffer size for streaming downloads (8 KB)
const STREAM_BUFFER_SIZE: usize = 8192;

/// Fetch a URL to a local path
pub trait Transfer {
    /// Download `url` to `dest`, returning the number of bytes written
    ///
    /// On success `dest` exists with the full body. On failure `dest` is
    /// untouched.
    fn fetch(&self, url: &str, dest: &Path) -> Result<u64>;
}

/// Blocking HTTP transfer with retry and optional progress bar
pub struct HttpTransfer {
    client: Client,
    max_retries: u32,
    show_progress: bool,
}

impl HttpTransfer {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(HTTP_TIMEOUT)
            .user_agent(concat!("winget-mirror/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::InitError(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            max_retries: MAX_RETRIES,
            show_progress: true,
        })
    }

    /// Disable the per-file progress bar
    pub fn quiet(mut self) -> Self {
        self.show_progress = false;
        self
    }

    fn progress_bar(&self, name: &str) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(0);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:30.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}) {msg}")
                .expect("Invalid progress bar template")
                .progress_chars("#>-"),
        );
        pb.set_message(name.to_string());
        pb
    }

    fn download(&self, response: reqwest::blocking::Response, dest: &Path) -> Result<u64> {
        let display_name = dest
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let total_size = response.content_length().unwrap_or(0);

        let pb = self.progress_bar(&display_name);
        if total_size > 0 {
            pb.set_length(total_size);
        } else {
            pb.set_message(format!("{} (unknown size)", display_name));
        }

        let temp_path = partial_path(dest);
        let mut file = File::create(&temp_path).map_err(|e| {
            Error::IoError(format!("Failed to create file {}: {e}", temp_path.display()))
        })?;

        let downloaded = match stream_response_to_file(response, &mut file, &pb) {
            Ok(n) => n,
            Err(e) => {
                pb.abandon();
                drop(file);
                if let Err(rm) = fs::remove_file(&temp_path) {
                    debug!("Could not remove {}: {}", temp_path.display(), rm);
                }
                return Err(e);
            }
        };
        pb.finish_and_clear();

        fs::rename(&temp_path, dest).map_err(|e| {
            Error::IoError(format!(
                "Failed to move {} to {}: {e}",
                temp_path.display(),
                dest.display()
            ))
        })?;

        Ok(downloaded)
    }
}

impl Transfer for HttpTransfer {
    fn fetch(&self, url: &str, dest: &Path) -> Result<u64> {
        info!("Downloading {} to {}", url, dest.display());

        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                Error::IoError(format!("Failed to create directory {}: {e}", parent.display()))
            })?;
        }

        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.client.get(url).send() {
                Ok(response) => {
                    if !response.status().is_success() {
                        return Err(Error::DownloadError(format!(
                            "HTTP {} from {}",
                            response.status(),
                            url
                        )));
                    }
                    let downloaded = self.download(response, dest)?;
                    info!("Downloaded {} bytes to {}", downloaded, dest.display());
                    return Ok(downloaded);
                }
                Err(e) => {
                    if attempt >= self.max_retries {
                        return Err(Error::DownloadError(format!(
                            "Failed to download {url} after {attempt} attempts: {e}"
                        )));
                    }
                    warn!("Download attempt {} failed: {}, retrying...", attempt, e);
                    std::thread::sleep(Duration::from_millis(RETRY_DELAY_MS * attempt as u64));
                }
            }
        }
    }
}

/// Stream a response body into a file, never buffering it whole
fn stream_response_to_file<R: Read>(
    mut response: R,
    file: &mut File,
    progress_bar: &ProgressBar,
) -> Result<u64> {
    let mut downloaded: u64 = 0;
    let mut buffer = [0u8; STREAM_BUFFER_SIZE];

    loop {
        let bytes_read = response
            .read(&mut buffer)
            .map_err(|e| Error::DownloadError(format!("Failed to read response: {e}")))?;

        if bytes_read == 0 {
            break;
        }

        file.write_all(&buffer[..bytes_read])
            .map_err(|e| Error::IoError(format!("Failed to write data: {e}")))?;

        downloaded += bytes_read as u64;
        progress_bar.set_position(downloaded);
    }

    file.flush()
        .map_err(|e| Error::IoError(format!("Failed to flush data: {e}")))?;
    Ok(downloaded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_stream_response_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.bin");
        let mut file = File::create(&path).unwrap();

        let body = vec![7u8; STREAM_BUFFER_SIZE * 2 + 13];
        let written =
            stream_response_to_file(Cursor::new(body.clone()), &mut file, &ProgressBar::hidden())
                .unwrap();

        assert_eq!(written, body.len() as u64);
        assert_eq!(fs::read(&path).unwrap(), body);
    }

    #[test]
    fn test_http_transfer_builds() {
        let transfer = HttpTransfer::new().unwrap().quiet();
        assert!(!transfer.show_progress);
        assert_eq!(transfer.max_retries, MAX_RETRIES);
    }
}
