// ============================================================
// Layer 3 — Chunk Domain Types
// ============================================================
// A chunk is one word-window of a cleaned book. Chunks are the
// unit of the training corpus: each one becomes one training
// sequence after tokenisation.
//
// On disk a book's chunks are stored as a JSON array:
//   [ { "id": "adventures_0", "text": "..." }, ... ]
// and the manifest records how many chunks each book produced.

use serde::{Deserialize, Serialize};

/// One passage of cleaned story text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextChunk {
    /// `<book stem>_<index>`, index counted from 0 within the book
    pub id: String,

    /// Whitespace-normalised passage text
    pub text: String,
}

impl TextChunk {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self { id: id.into(), text: text.into() }
    }

    /// Build the chunk id for the `index`-th chunk of `book`
    pub fn id_for(book: &str, index: usize) -> String {
        format!("{book}_{index}")
    }

    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }
}

/// One row of `manifest.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub book:   String,
    pub chunks: usize,
}
