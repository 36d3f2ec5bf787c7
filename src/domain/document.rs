// ============================================================
// Layer 3 — Document Domain Type
// ============================================================
// A single raw book as read from disk, before the Gutenberg
// header/footer is stripped.

use serde::{Deserialize, Serialize};

/// A raw public-domain text loaded from disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// File stem of the source file, e.g. `hound_baskervilles`.
    /// Also used as the prefix of every chunk id cut from this book.
    pub source: String,

    /// The full text, Gutenberg boilerplate included
    pub text: String,
}

impl Document {
    pub fn new(source: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            text:   text.into(),
        }
    }

    /// Number of whitespace-separated words in the raw text
    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }
}
