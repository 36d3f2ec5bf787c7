// ============================================================
// Layer 6 — Base Model Files
// ============================================================
// Resolves a base model id to the three files the pipeline
// needs. A local directory is used as-is; anything else is a
// Hugging Face Hub repository, downloaded once into the hub
// cache (~/.cache/huggingface) and reused afterwards.

use anyhow::{ensure, Context, Result};
use hf_hub::{api::sync::Api, Repo, RepoType};
use std::path::{Path, PathBuf};

pub const CONFIG_FILE:    &str = "config.json";
pub const WEIGHTS_FILE:   &str = "model.safetensors";
pub const TOKENIZER_FILE: &str = "tokenizer.json";

#[derive(Debug, Clone)]
pub struct ModelFiles {
    pub config:    PathBuf,
    pub weights:   PathBuf,
    pub tokenizer: PathBuf,
}

impl ModelFiles {
    pub fn resolve(model_id: &str) -> Result<Self> {
        let local = Path::new(model_id);
        if local.is_dir() {
            return Self::from_dir(local);
        }
        Self::from_hub(model_id)
    }

    pub fn from_dir(dir: &Path) -> Result<Self> {
        let files = Self {
            config:    dir.join(CONFIG_FILE),
            weights:   dir.join(WEIGHTS_FILE),
            tokenizer: dir.join(TOKENIZER_FILE),
        };
        for path in [&files.config, &files.weights, &files.tokenizer] {
            ensure!(path.is_file(), "Base model file '{}' not found", path.display());
        }
        tracing::info!("Using local base model in '{}'", dir.display());
        Ok(files)
    }

    fn from_hub(model_id: &str) -> Result<Self> {
        tracing::info!("Fetching base model '{}' from the Hugging Face Hub", model_id);
        let api  = Api::new().context("Failed to initialize HuggingFace Hub API")?;
        let repo = api.repo(Repo::new(model_id.to_string(), RepoType::Model));

        let get = |file: &str| {
            repo.get(file)
                .with_context(|| format!("Failed to download {file} from {model_id}"))
        };
        Ok(Self {
            config:    get(CONFIG_FILE)?,
            weights:   get(WEIGHTS_FILE)?,
            tokenizer: get(TOKENIZER_FILE)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_local_directory() {
        let dir = tempfile::tempdir().unwrap();
        for f in [CONFIG_FILE, WEIGHTS_FILE, TOKENIZER_FILE] {
            fs::write(dir.path().join(f), "x").unwrap();
        }
        let files = ModelFiles::resolve(dir.path().to_str().unwrap()).unwrap();
        assert_eq!(files.weights, dir.path().join(WEIGHTS_FILE));
    }

    #[test]
    fn test_local_directory_missing_weights() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(CONFIG_FILE), "{}").unwrap();
        fs::write(dir.path().join(TOKENIZER_FILE), "{}").unwrap();

        let err = ModelFiles::from_dir(dir.path()).unwrap_err();
        assert!(err.to_string().contains(WEIGHTS_FILE));
    }
}
