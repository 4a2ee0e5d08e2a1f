use crate::result::{BuildError, Result};
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::Client;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tokio::fs::{self, File};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

const USER_AGENT: &str = concat!("tpbuild/", env!("CARGO_PKG_VERSION"));

/// A source archive a package needs, with where to get it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceArchive {
    pub filename: String,
    pub url: String,
    pub sha256: Option<String>,
}

impl SourceArchive {
    pub fn new(filename: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            url: url.into(),
            sha256: None,
        }
    }

    pub fn with_sha256(mut self, sha256: impl Into<String>) -> Self {
        self.sha256 = Some(sha256.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    Skipped,
    Downloaded,
}

pub struct SourceFetcher {
    client: Client,
}

impl Default for SourceFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceFetcher {
    pub fn new() -> Self {
        Self::with_client(Client::new())
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /** Makes sure `archive` is present at `destination`
     *
     * # Behavior
     * - An existing file is kept as is; no network request is made
     * - Otherwise the URL is streamed into `<destination>.part`, which is
     *   renamed once complete
     * - A declared SHA-256 is checked in both cases
     *
     * # Errors
     * - [`BuildError::Download`] for transport failures and non-success statuses
     * - [`BuildError::ChecksumMismatch`] when the digest differs
     */
    pub async fn fetch(&self, archive: &SourceArchive, destination: &Path) -> Result<FetchOutcome> {
        if destination.exists() {
            log::info!("{} already downloaded", destination.display());
            verify_checksum(archive, destination).await?;
            return Ok(FetchOutcome::Skipped);
        }

        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent).await?;
        }

        println!("Downloading {} from {}", archive.filename, archive.url);
        let mut response = self
            .client
            .get(&archive.url)
            .header("User-Agent", USER_AGENT)
            .send()
            .await
            .map_err(|e| BuildError::download(format!("Failed to download {}: {}", archive.url, e)))?;

        if !response.status().is_success() {
            return Err(BuildError::download(format!(
                "Download of {} failed with status: {}",
                archive.url,
                response.status()
            )));
        }

        let pb = progress_bar(response.content_length(), &archive.filename);
        let partial = partial_path(destination);
        let mut file = File::create(&partial).await?;
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| BuildError::download(format!("Download of {} interrupted: {}", archive.url, e)))?
        {
            file.write_all(&chunk).await?;
            pb.inc(chunk.len() as u64);
        }
        file.flush().await?;
        drop(file);

        fs::rename(&partial, destination).await?;
        pb.finish_with_message(format!("Downloaded {}", archive.filename));

        verify_checksum(archive, destination).await?;
        Ok(FetchOutcome::Downloaded)
    }
}

fn progress_bar(total: Option<u64>, filename: &str) -> ProgressBar {
    let pb = match total {
        Some(size) => {
            let pb = ProgressBar::new(size);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {bytes}/{total_bytes} ({eta})")
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("#>-"),
            );
            pb
        }
        None => {
            let pb = ProgressBar::new_spinner();
            pb.set_style(
                ProgressStyle::default_spinner()
                    .template("{spinner:.green} [{elapsed_precise}] {msg} {bytes}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            pb.enable_steady_tick(std::time::Duration::from_millis(100));
            pb
        }
    };
    pb.set_message(format!("Downloading {}", filename));
    pb
}

fn partial_path(destination: &Path) -> PathBuf {
    let mut name = destination.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}

async fn verify_checksum(archive: &SourceArchive, path: &Path) -> Result<()> {
    let Some(expected) = &archive.sha256 else {
        return Ok(());
    };

    let actual = sha256_file(path).await?;
    if !actual.eq_ignore_ascii_case(expected) {
        return Err(BuildError::ChecksumMismatch {
            path: path.to_path_buf(),
            expected: expected.clone(),
            actual,
        });
    }
    Ok(())
}

/// Lowercase hex SHA-256 of a file, read in blocks.
pub async fn sha256_file(path: &Path) -> Result<String> {
    let mut file = File::open(path).await?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; 64 * 1024];
    loop {
        let read = file.read(&mut buffer).await?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}
