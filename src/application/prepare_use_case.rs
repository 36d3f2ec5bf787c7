// ============================================================
// Layer 2 — PrepareUseCase
// ============================================================
// Builds the cleaned corpus in order:
//
//   Step 1: Download missing books        (Layer 4 - data)
//   Step 2: Load every raw .txt file      (Layer 4 - data)
//   Step 3: Strip Gutenberg boilerplate   (Layer 4 - data)
//   Step 4: Chunk into word windows       (Layer 4 - data)
//   Step 5: Write chunk files + manifest  (Layer 4 - data)

use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::data::{
    catalog::SHERLOCK_HOLMES,
    chunker::Chunker,
    corpus::{write_manifest, CorpusStore},
    downloader::{BookDownloader, DownloadOutcome},
    loader::RawTextLoader,
    preprocessor::{Extraction, Preprocessor},
};
use crate::domain::{chunk::ManifestEntry, traits::DocumentSource};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrepareConfig {
    pub raw_dir:       String,
    pub clean_dir:     String,
    pub manifest_dir:  String,
    pub skip_download: bool,
    pub max_words:     usize,
    pub overlap:       usize,
    pub min_words:     usize,
}

impl Default for PrepareConfig {
    fn default() -> Self {
        Self {
            raw_dir:       "data/raw".to_string(),
            clean_dir:     "data/cleaned".to_string(),
            manifest_dir:  "data/manifests".to_string(),
            skip_download: false,
            max_words:     200,
            overlap:       20,
            min_words:     30,
        }
    }
}

impl PrepareConfig {
    pub fn validate(&self) -> Result<()> {
        ensure!(self.max_words > 0, "max_words must be positive");
        ensure!(
            self.overlap < self.max_words,
            "overlap ({}) must be smaller than max_words ({})",
            self.overlap,
            self.max_words
        );
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct PrepareReport {
    pub downloaded:      usize,
    pub already_present: usize,
    pub books:           Vec<ManifestEntry>,
}

impl PrepareReport {
    pub fn total_chunks(&self) -> usize {
        self.books.iter().map(|b| b.chunks).sum()
    }
}

pub struct PrepareUseCase {
    config: PrepareConfig,
}

impl PrepareUseCase {
    pub fn new(config: PrepareConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<PrepareReport> {
        let cfg = &self.config;
        cfg.validate()?;
        let mut report = PrepareReport::default();

        // ── Step 1: Download ──────────────────────────────────────────────────
        if cfg.skip_download {
            tracing::info!("Skipping download");
        } else {
            let downloader = BookDownloader::new(&cfg.raw_dir)?;
            for outcome in downloader.download_all(SHERLOCK_HOLMES)? {
                match outcome {
                    DownloadOutcome::Downloaded(_)     => report.downloaded += 1,
                    DownloadOutcome::AlreadyPresent(_) => report.already_present += 1,
                }
            }
        }

        // ── Step 2: Load raw texts ────────────────────────────────────────────
        let docs = RawTextLoader::new(&cfg.raw_dir).load_all()?;

        // ── Steps 3–5: Clean, chunk, write ────────────────────────────────────
        let preprocessor = Preprocessor::new();
        let chunker = Chunker::new(cfg.max_words, cfg.overlap, cfg.min_words);
        let store   = CorpusStore::new(&cfg.clean_dir);

        for doc in &docs {
            let (story, extraction) = preprocessor.clean_with_report(&doc.text);
            if extraction == Extraction::MiddleFallback {
                tracing::warn!("{}: Gutenberg markers not found, kept the middle 80%", doc.source);
            }

            let chunks = chunker.chunk(&story);
            store.write_book(&doc.source, &chunks)?;
            tracing::info!("{}: {} chunks", doc.source, chunks.len());
            report.books.push(ManifestEntry { book: doc.source.clone(), chunks: chunks.len() });
        }

        let manifest = write_manifest(Path::new(&cfg.manifest_dir), &report.books)?;
        tracing::info!(
            "Wrote {} chunks from {} books; manifest at '{}'",
            report.total_chunks(),
            report.books.len(),
            manifest.display()
        );
        Ok(report)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn gutenberg(body: &str) -> String {
        format!(
            "Title page\n*** START OF THE PROJECT GUTENBERG EBOOK TEST ***\n{body}\n\
             *** END OF THE PROJECT GUTENBERG EBOOK TEST ***\nLicense text"
        )
    }

    #[test]
    fn test_prepare_offline() {
        let dir = tempfile::tempdir().unwrap();
        let raw = dir.path().join("raw");
        fs::create_dir_all(&raw).unwrap();

        let story = (0..100).map(|i| format!("word{i}")).collect::<Vec<_>>().join(" ");
        fs::write(raw.join("b_book.txt"), gutenberg(&story)).unwrap();
        fs::write(raw.join("a_book.txt"), gutenberg("too short")).unwrap();
        fs::write(raw.join("notes.md"), "ignored").unwrap();

        let cfg = PrepareConfig {
            raw_dir:       raw.to_string_lossy().into_owned(),
            clean_dir:     dir.path().join("clean").to_string_lossy().into_owned(),
            manifest_dir:  dir.path().join("manifests").to_string_lossy().into_owned(),
            skip_download: true,
            max_words:     40,
            overlap:       10,
            min_words:     5,
        };
        let report = PrepareUseCase::new(cfg).execute().unwrap();

        // Sorted order; windows start at 0, 30, 60, 90 → the last has 10 words
        assert_eq!(
            report.books,
            vec![
                ManifestEntry { book: "a_book".into(), chunks: 0 },
                ManifestEntry { book: "b_book".into(), chunks: 4 },
            ]
        );
        assert_eq!(report.total_chunks(), 4);

        let chunks = CorpusStore::new(dir.path().join("clean")).load_all().unwrap();
        assert_eq!(chunks[0].id, "b_book_0");
        assert!(chunks[0].text.starts_with("word0 word1"));
        assert!(!chunks.iter().any(|c| c.text.contains("License")));
        assert!(dir.path().join("manifests/manifest.json").is_file());
    }

    #[test]
    fn test_invalid_overlap_rejected_before_work() {
        let cfg = PrepareConfig { overlap: 200, skip_download: true, ..PrepareConfig::default() };
        assert!(PrepareUseCase::new(cfg).execute().is_err());
    }
}
