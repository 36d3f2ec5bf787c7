// ============================================================
// Layer 6 — Tokenizer Store
// ============================================================
// The base model's byte-level BPE tokenizer is used unchanged.
// It is copied next to the adapter after training so that
// generation uses exactly the vocabulary the adapter saw.
//
// GPT-2 has no padding token; `<|endoftext|>` serves as both
// end-of-sequence and padding.

use anyhow::{Context, Result};
use std::{
    fs,
    path::{Path, PathBuf},
};
use tokenizers::Tokenizer;

pub const EOS_TOKEN: &str = "<|endoftext|>";

pub struct TokenizerStore {
    dir: PathBuf,
}

impl TokenizerStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join("tokenizer.json")
    }

    pub fn exists(&self) -> bool {
        self.path().is_file()
    }

    pub fn load(&self) -> Result<Tokenizer> {
        load_tokenizer(&self.path())
    }

    pub fn save(&self, tokenizer: &Tokenizer) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Cannot create '{}'", self.dir.display()))?;
        let path = self.path();
        tokenizer
            .save(&path, true)
            .map_err(|e| anyhow::anyhow!("Cannot write tokenizer to '{}': {e}", path.display()))?;
        tracing::debug!("Saved tokenizer to '{}'", path.display());
        Ok(())
    }
}

pub fn load_tokenizer(path: &Path) -> Result<Tokenizer> {
    Tokenizer::from_file(path)
        .map_err(|e| anyhow::anyhow!("Cannot load tokenizer from '{}': {e}", path.display()))
}

/// Id of `<|endoftext|>`, used as EOS and as padding
pub fn eos_token_id(tokenizer: &Tokenizer) -> Result<u32> {
    tokenizer
        .token_to_id(EOS_TOKEN)
        .with_context(|| format!("Tokenizer has no '{EOS_TOKEN}' token"))
}

/// Token ids without special tokens
pub fn encode(tokenizer: &Tokenizer, text: &str) -> Result<Vec<u32>> {
    let encoding = tokenizer
        .encode(text, false)
        .map_err(|e| anyhow::anyhow!("Tokenise: {e}"))?;
    Ok(encoding.get_ids().to_vec())
}

/// Text with special tokens skipped
pub fn decode(tokenizer: &Tokenizer, ids: &[u32]) -> Result<String> {
    tokenizer
        .decode(ids, true)
        .map_err(|e| anyhow::anyhow!("Decode: {e}"))
}
