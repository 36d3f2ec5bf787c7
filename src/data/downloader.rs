// ============================================================
// Layer 4 — Book Downloader
// ============================================================
// Fetches the catalogue into the raw directory with a blocking
// reqwest client. A book whose file already exists is never
// fetched again, so re-running `prepare` is cheap and works
// offline once everything is on disk.

use anyhow::{Context, Result};
use std::{fs, path::{Path, PathBuf}, time::Duration};

use crate::data::catalog::Book;

const USER_AGENT: &str = concat!("sherlock-lora/", env!("CARGO_PKG_VERSION"));
const TIMEOUT: Duration = Duration::from_secs(30);

/// What happened to one catalogue entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    AlreadyPresent(PathBuf),
    Downloaded(PathBuf),
}

pub struct BookDownloader {
    raw_dir: PathBuf,
    client:  reqwest::blocking::Client,
}

impl BookDownloader {
    pub fn new(raw_dir: impl Into<PathBuf>) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(TIMEOUT)
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self { raw_dir: raw_dir.into(), client })
    }

    /// Download every book that is not yet on disk
    pub fn download_all(&self, books: &[Book]) -> Result<Vec<DownloadOutcome>> {
        fs::create_dir_all(&self.raw_dir)
            .with_context(|| format!("Cannot create '{}'", self.raw_dir.display()))?;

        books.iter().map(|book| self.download(book)).collect()
    }

    pub fn download(&self, book: &Book) -> Result<DownloadOutcome> {
        let dest = self.raw_dir.join(book.file_name());
        if dest.exists() {
            tracing::info!("Already downloaded: {}", book.name);
            return Ok(DownloadOutcome::AlreadyPresent(dest));
        }

        let url = book.url();
        tracing::info!("Downloading {} from {}", book.name, url);
        let text = self
            .client
            .get(&url)
            .send()
            .and_then(|r| r.error_for_status())
            .and_then(|r| r.text())
            .with_context(|| format!("Failed to download '{url}'"))?;

        write_text(&dest, &text)?;
        tracing::debug!("Saved {} ({} bytes)", dest.display(), text.len());
        Ok(DownloadOutcome::Downloaded(dest))
    }
}

fn write_text(path: &Path, text: &str) -> Result<()> {
    fs::write(path, text).with_context(|| format!("Cannot write '{}'", path.display()))
}
