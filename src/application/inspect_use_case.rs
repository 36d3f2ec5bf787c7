// ============================================================
// Layer 2 — InspectUseCase
// ============================================================
// Reads the cleaned corpus back and summarises whether it is
// ready for training: word statistics, chunks outside the
// expected length range, exact duplicates and a few samples.

use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::data::{
    corpus::CorpusStore,
    stats::{count_out_of_range, find_duplicates, snippet, Duplicate, WordStats},
};

const DUPLICATE_SNIPPET: usize = 100;
const SAMPLE_SNIPPET:    usize = 300;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InspectConfig {
    pub clean_dir: String,
    /// Number of sample chunks to show
    pub samples:   usize,
    /// Number of duplicate groups to show
    pub top_n:     usize,
    pub min_words: usize,
    pub max_words: usize,
}

impl Default for InspectConfig {
    fn default() -> Self {
        Self {
            clean_dir: "data/cleaned".to_string(),
            samples:   5,
            top_n:     5,
            min_words: 30,
            max_words: 300,
        }
    }
}

#[derive(Debug, Clone)]
pub struct InspectReport {
    pub stats:           WordStats,
    pub min_words:       usize,
    pub max_words:       usize,
    pub out_of_range:    usize,
    /// Every duplicate group, first occurrence first
    pub duplicates:      Vec<Duplicate>,
    pub shown_duplicates: usize,
    pub samples:         Vec<String>,
}

impl fmt::Display for InspectReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = &self.stats;
        writeln!(f, "Total chunks: {}", s.total_chunks)?;
        writeln!(
            f,
            "Words per chunk: avg {:.1}, min {}, max {}",
            s.avg_words, s.min_words, s.max_words
        )?;
        writeln!(
            f,
            "Chunks outside [{}, {}] words: {}",
            self.min_words, self.max_words, self.out_of_range
        )?;

        writeln!(f, "Duplicate chunks: {}", self.duplicates.len())?;
        for dup in self.duplicates.iter().take(self.shown_duplicates) {
            writeln!(f, "  x{} {}", dup.count, snippet(&dup.text, DUPLICATE_SNIPPET))?;
        }

        writeln!(f)?;
        writeln!(f, "Sample chunks:")?;
        for (i, sample) in self.samples.iter().enumerate() {
            writeln!(f, "--- [{}] ---", i + 1)?;
            writeln!(f, "{sample}")?;
        }
        Ok(())
    }
}

pub struct InspectUseCase {
    config: InspectConfig,
}

impl InspectUseCase {
    pub fn new(config: InspectConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<InspectReport> {
        let cfg    = &self.config;
        let chunks = CorpusStore::new(&cfg.clean_dir).load_all()?;
        ensure!(
            !chunks.is_empty(),
            "No chunks found in '{}'. Run 'prepare' first.",
            cfg.clean_dir
        );

        let stats = WordStats::compute(&chunks)
            .ok_or_else(|| anyhow::anyhow!("Empty corpus"))?;
        tracing::info!("Inspected {} chunks", stats.total_chunks);

        Ok(InspectReport {
            stats,
            min_words:        cfg.min_words,
            max_words:        cfg.max_words,
            out_of_range:     count_out_of_range(&chunks, cfg.min_words, cfg.max_words),
            duplicates:       find_duplicates(&chunks),
            shown_duplicates: cfg.top_n,
            samples: chunks
                .iter()
                .take(cfg.samples)
                .map(|c| snippet(&c.text, SAMPLE_SNIPPET))
                .collect(),
        })
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn words(n: usize) -> String {
        vec!["elementary"; n].join(" ")
    }

    #[test]
    fn test_report() {
        let dir   = tempfile::tempdir().unwrap();
        let store = CorpusStore::new(dir.path());
        store.write_book("a", &[words(40), words(10), words(40)]).unwrap();
        store.write_book("b", &[words(400)]).unwrap();

        let cfg = InspectConfig {
            clean_dir: dir.path().to_string_lossy().into_owned(),
            samples:   2,
            ..InspectConfig::default()
        };
        let report = InspectUseCase::new(cfg).execute().unwrap();

        assert_eq!(report.stats.total_chunks, 4);
        assert_eq!(report.stats.min_words, 10);
        assert_eq!(report.stats.max_words, 400);
        assert_eq!(report.out_of_range, 2);
        assert_eq!(report.duplicates, vec![Duplicate { text: words(40), count: 2 }]);
        assert_eq!(report.samples.len(), 2);
        assert_eq!(report.samples[0].chars().count(), 300);

        let text = report.to_string();
        assert!(text.contains("Total chunks: 4"));
        assert!(text.contains("avg 122.5"));
        assert!(text.contains("--- [2] ---"));
    }

    #[test]
    fn test_empty_corpus_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = InspectConfig {
            clean_dir: dir.path().to_string_lossy().into_owned(),
            ..InspectConfig::default()
        };
        assert!(InspectUseCase::new(cfg).execute().is_err());
    }

    #[test]
    fn test_missing_directory_is_an_error() {
        let cfg = InspectConfig { clean_dir: "/nonexistent/cleaned".into(), ..InspectConfig::default() };
        let err = InspectUseCase::new(cfg).execute().unwrap_err();
        assert!(err.to_string().contains("prepare"));
    }
}
