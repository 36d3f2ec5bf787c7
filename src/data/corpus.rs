// ============================================================
// Layer 4 — Corpus Store
// ============================================================
// Reads and writes the cleaned corpus:
//
//   data/cleaned/
//     adventures.json      ← [ {"id": "adventures_0", "text": ...}, ... ]
//     casebook.json
//     ...
//   data/manifests/
//     manifest.json        ← [ {"book": "adventures", "chunks": 412}, ... ]
//
// JSON is pretty-printed with two-space indentation and keeps
// non-ASCII characters as-is.

use anyhow::{Context, Result};
use std::{fs, path::{Path, PathBuf}};

use crate::data::loader::files_with_extension;
use crate::domain::chunk::{ManifestEntry, TextChunk};

pub struct CorpusStore {
    clean_dir: PathBuf,
}

impl CorpusStore {
    pub fn new(clean_dir: impl Into<PathBuf>) -> Self {
        Self { clean_dir: clean_dir.into() }
    }

    /// Write one book's chunks to `<clean_dir>/<book>.json`,
    /// numbering them `<book>_0`, `<book>_1`, ...
    pub fn write_book(&self, book: &str, chunks: &[String]) -> Result<PathBuf> {
        fs::create_dir_all(&self.clean_dir)
            .with_context(|| format!("Cannot create '{}'", self.clean_dir.display()))?;

        let records: Vec<TextChunk> = chunks
            .iter()
            .enumerate()
            .map(|(i, text)| TextChunk::new(TextChunk::id_for(book, i), text.as_str()))
            .collect();

        let path = self.clean_dir.join(format!("{book}.json"));
        write_json(&path, &records)?;
        Ok(path)
    }

    /// Load every chunk file, in file-name order
    pub fn load_all(&self) -> Result<Vec<TextChunk>> {
        if !self.clean_dir.exists() {
            anyhow::bail!(
                "Chunk directory '{}' does not exist. Run 'prepare' first.",
                self.clean_dir.display()
            );
        }

        let mut paths = files_with_extension(&self.clean_dir, "json")?;
        paths.sort();

        let mut chunks = Vec::new();
        for path in paths {
            let json = fs::read_to_string(&path)
                .with_context(|| format!("Cannot read '{}'", path.display()))?;
            let book: Vec<TextChunk> = serde_json::from_str(&json)
                .with_context(|| format!("Malformed chunk file '{}'", path.display()))?;
            tracing::debug!("{}: {} chunks", path.display(), book.len());
            chunks.extend(book);
        }
        Ok(chunks)
    }
}

/// Write `<manifest_dir>/manifest.json`
pub fn write_manifest(manifest_dir: &Path, entries: &[ManifestEntry]) -> Result<PathBuf> {
    fs::create_dir_all(manifest_dir)
        .with_context(|| format!("Cannot create '{}'", manifest_dir.display()))?;
    let path = manifest_dir.join("manifest.json");
    write_json(&path, entries)?;
    Ok(path)
}

fn write_json<T: serde::Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json).with_context(|| format!("Cannot write '{}'", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_written_books_load_back_in_name_order() {
        let dir   = tempfile::tempdir().unwrap();
        let store = CorpusStore::new(dir.path().join("cleaned"));

        store.write_book("sign_of_four", &["Miss Morstan arrived".into()]).unwrap();
        store
            .write_book("adventures", &["A Scandal in Bohemia".into(), "The Red-Headed League".into()])
            .unwrap();

        let chunks = store.load_all().unwrap();
        let ids: Vec<_> = chunks.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, ["adventures_0", "adventures_1", "sign_of_four_0"]);
        assert_eq!(chunks[1].text, "The Red-Headed League");
    }

    #[test]
    fn test_non_ascii_is_kept_verbatim() {
        let dir   = tempfile::tempdir().unwrap();
        let store = CorpusStore::new(dir.path());
        let path  = store.write_book("casebook", &["Café Royal — naïve".into()]).unwrap();

        let raw = fs::read_to_string(path).unwrap();
        assert!(raw.contains("Café Royal — naïve"));
        assert!(raw.contains("\n  {"));
    }

    #[test]
    fn test_manifest_written() {
        let dir  = tempfile::tempdir().unwrap();
        let path = write_manifest(
            &dir.path().join("manifests"),
            &[ManifestEntry { book: "memoirs".into(), chunks: 7 }],
        )
        .unwrap();

        let entries: Vec<ManifestEntry> =
            serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(entries, [ManifestEntry { book: "memoirs".into(), chunks: 7 }]);
    }

    #[test]
    fn test_missing_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = CorpusStore::new(dir.path().join("missing")).load_all().unwrap_err();
        assert!(err.to_string().contains("prepare"));
    }
}
