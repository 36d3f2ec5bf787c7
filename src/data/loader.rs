// ============================================================
// Layer 4 — Raw Text Loader
// ============================================================
// Loads every `*.txt` file from the raw directory. Not limited
// to the catalogue: any public-domain text dropped into the
// directory is picked up too.
//
// Files are returned sorted by name so chunk files and the
// manifest come out in the same order on every run.
//
// Invalid UTF-8 sequences are dropped rather than replaced,
// so stray bytes never leak U+FFFD into the corpus.

use anyhow::{Context, Result};
use std::{fs, path::{Path, PathBuf}};

use crate::domain::document::Document;
use crate::domain::traits::DocumentSource;

pub struct RawTextLoader {
    dir: PathBuf,
}

impl RawTextLoader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl DocumentSource for RawTextLoader {
    fn load_all(&self) -> Result<Vec<Document>> {
        if !self.dir.exists() {
            tracing::warn!(
                "Raw directory '{}' does not exist — returning empty corpus",
                self.dir.display()
            );
            return Ok(Vec::new());
        }

        let mut paths = files_with_extension(&self.dir, "txt")?;
        paths.sort();

        let mut docs = Vec::with_capacity(paths.len());
        for path in paths {
            let doc = load_single_text(&path)?;
            tracing::debug!("Loaded: {} ({} words)", doc.source, doc.word_count());
            docs.push(doc);
        }

        tracing::info!("Loaded {} raw texts from '{}'", docs.len(), self.dir.display());
        Ok(docs)
    }
}

/// All regular files in `dir` with the given extension (unsorted)
pub fn files_with_extension(dir: &Path, ext: &str) -> Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    for entry in fs::read_dir(dir)
        .with_context(|| format!("Cannot read directory '{}'", dir.display()))?
    {
        let path = entry?.path();
        if path.is_file() && path.extension().and_then(|e| e.to_str()) == Some(ext) {
            out.push(path);
        }
    }
    Ok(out)
}

fn load_single_text(path: &Path) -> Result<Document> {
    let bytes = fs::read(path)
        .with_context(|| format!("Cannot read '{}'", path.display()))?;

    let text: String = String::from_utf8_lossy(&bytes)
        .chars()
        .filter(|&c| c != char::REPLACEMENT_CHARACTER)
        .collect();

    let source = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("unknown")
        .to_string();

    Ok(Document::new(source, text))
}
