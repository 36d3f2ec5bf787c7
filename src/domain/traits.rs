// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The application layer programs against these traits rather
// than the concrete loaders and generators.

use anyhow::Result;
use crate::domain::document::Document;

// ─── DocumentSource ───────────────────────────────────────────────────────────
/// Any component that can load raw books.
///
/// Implementations:
///   - RawTextLoader → every `*.txt` in a directory
pub trait DocumentSource {
    /// Load all available documents from this source.
    fn load_all(&self) -> Result<Vec<Document>>;
}

// ─── TextGenerator ────────────────────────────────────────────────────────────
/// Any component that continues a prompt with generated text.
///
/// Implementations:
///   - GenerateUseCase → base model + LoRA adapter
pub trait TextGenerator {
    /// Return the prompt followed by its continuation.
    fn generate(&mut self, prompt: &str) -> Result<String>;
}
