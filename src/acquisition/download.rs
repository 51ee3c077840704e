use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use futures::StreamExt;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::acquisition::client::{ensure_success, HttpClient};
use crate::error::{ProcessingError, Result};
use crate::utils::constants::PARTIAL_SUFFIX;
use crate::utils::file_name_from_url;

/// Whether a file was fetched or an existing copy reused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadStatus {
    Downloaded,
    Skipped,
}

/// Exists and holds at least one byte
pub fn has_content(path: &Path) -> bool {
    fs::metadata(path).map(|m| m.is_file() && m.len() > 0).unwrap_or(false)
}

/// Local path for `url` inside `dest_dir`, named after the URL's last segment
pub fn destination_for(url: &str, dest_dir: &Path) -> Result<PathBuf> {
    file_name_from_url(url)
        .map(|name| dest_dir.join(name))
        .ok_or_else(|| ProcessingError::InvalidFormat(format!("URL has no file name: {}", url)))
}

fn partial_path(dest: &Path) -> PathBuf {
    let mut name = OsString::from(dest.as_os_str());
    name.push(".");
    name.push(PARTIAL_SUFFIX);
    PathBuf::from(name)
}

/// Download into `dest_dir` unless a non-empty copy is already there
pub async fn download_with_skip(
    http: &HttpClient,
    url: &str,
    dest_dir: &Path,
    timeout: Duration,
) -> Result<(PathBuf, DownloadStatus)> {
    let dest = destination_for(url, dest_dir)?;
    if has_content(&dest) {
        debug!(path = %dest.display(), "already downloaded");
        return Ok((dest, DownloadStatus::Skipped));
    }

    download_to(http, url, &dest, timeout).await?;
    Ok((dest, DownloadStatus::Downloaded))
}

/// Stream `url` to `dest`, returning the byte count
///
/// Bytes land in `<dest>.part` and are renamed into place once complete,
/// so an interrupted transfer never leaves a truncated `dest` behind.
pub async fn download_to(http: &HttpClient, url: &str, dest: &Path, timeout: Duration) -> Result<u64> {
    if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }

    let response = http.inner().get(url).timeout(timeout).send().await?;
    let response = ensure_success(response)?;

    let partial = partial_path(dest);
    let result = stream_to_file(response, &partial).await;
    match result {
        Ok(bytes) => {
            tokio::fs::rename(&partial, dest).await?;
            debug!(url, path = %dest.display(), bytes, "downloaded");
            Ok(bytes)
        }
        Err(e) => {
            let _ = tokio::fs::remove_file(&partial).await;
            Err(e)
        }
    }
}

async fn stream_to_file(response: reqwest::Response, path: &Path) -> Result<u64> {
    let mut file = tokio::fs::File::create(path).await?;
    let mut written = 0u64;
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }

    file.flush().await?;
    Ok(written)
}
