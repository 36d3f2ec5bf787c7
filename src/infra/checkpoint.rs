// ============================================================
// Layer 6 — Adapter Checkpoints
// ============================================================
// Saves and restores the LoRA adapter stack using Burn's
// gzipped named-MessagePack recorder. Only the low-rank weights are written; the
// frozen base model is re-fetched from its source at load time.
//
// Layout of an adapter directory:
//
//   <output_dir>/
//     adapter_model.mpk.gz    ← AdapterStack record
//     adapter_config.json     ← rank, alpha, targets, base model id
//     tokenizer.json          ← written by TokenizerStore
//     training_config.json    ← full TrainConfig of the run
//     training_log.csv        ← written by MetricsLogger
//     checkpoint-200/         ← intermediate adapters (same layout,
//     checkpoint-400/           newest `save_total_limit` kept)
//
// Weights are stored as MessagePack + gzip at half precision.
// Loading into a stack of a different shape fails, so the
// stack must be rebuilt from adapter_config.json first.

use anyhow::{Context, Result};
use burn::{
    prelude::*,
    record::{HalfPrecisionSettings, NamedMpkGzFileRecorder, Recorder},
};
use serde::{de::DeserializeOwned, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::domain::adapter::AdapterConfig;
use crate::ml::lora::AdapterStack;

pub const ADAPTER_WEIGHTS: &str = "adapter_model";
pub const ADAPTER_CONFIG:  &str = "adapter_config.json";
pub const TRAIN_CONFIG:    &str = "training_config.json";
const STEP_PREFIX: &str = "checkpoint-";

/// Writes `<name>.mpk.gz`
type AdapterRecorder = NamedMpkGzFileRecorder<HalfPrecisionSettings>;

/// One adapter directory (the final output or a checkpoint-<step>).
pub struct AdapterCheckpoint {
    dir: PathBuf,
}

impl AdapterCheckpoint {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write the adapter weights and their config
    pub fn save<B: Backend>(&self, adapters: &AdapterStack<B>, cfg: &AdapterConfig) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Cannot create '{}'", self.dir.display()))?;

        let path = self.dir.join(ADAPTER_WEIGHTS);
        AdapterRecorder::new()
            .record(adapters.clone().into_record(), path.clone())
            .with_context(|| format!("Failed to save adapter to '{}'", path.display()))?;

        save_json(&self.dir.join(ADAPTER_CONFIG), cfg)?;
        tracing::debug!("Saved adapter to '{}'", self.dir.display());
        Ok(())
    }

    pub fn load_config(&self) -> Result<AdapterConfig> {
        let path = self.dir.join(ADAPTER_CONFIG);
        load_json(&path).with_context(|| {
            format!(
                "No adapter found in '{}'. Run 'train' before 'generate'.",
                self.dir.display()
            )
        })
    }

    /// Restore weights into `adapters`, which must have the saved shape
    pub fn load_adapters<B: Backend>(
        &self,
        adapters: AdapterStack<B>,
        device:   &B::Device,
    ) -> Result<AdapterStack<B>> {
        let path = self.dir.join(ADAPTER_WEIGHTS);
        let record = AdapterRecorder::new()
            .load(path.clone(), device)
            .with_context(|| {
                format!(
                    "Cannot load adapter weights '{}'. Have you trained the model first?",
                    path.display()
                )
            })?;
        Ok(adapters.load_record(record))
    }
}

/// Intermediate `checkpoint-<step>` directories under the output directory.
pub struct StepCheckpoints {
    root:        PathBuf,
    total_limit: usize,
}

impl StepCheckpoints {
    /// `total_limit = 0` keeps every checkpoint
    pub fn new(root: impl Into<PathBuf>, total_limit: usize) -> Self {
        Self { root: root.into(), total_limit }
    }

    pub fn save<B: Backend>(
        &self,
        step:     usize,
        adapters: &AdapterStack<B>,
        cfg:      &AdapterConfig,
    ) -> Result<PathBuf> {
        let ckpt = AdapterCheckpoint::new(self.root.join(format!("{STEP_PREFIX}{step}")));
        ckpt.save(adapters, cfg)?;
        tracing::info!("Checkpoint saved at step {}", step);
        self.rotate()?;
        Ok(ckpt.dir().to_path_buf())
    }

    /// Existing checkpoint steps, oldest first
    pub fn steps(&self) -> Result<Vec<usize>> {
        if !self.root.is_dir() {
            return Ok(Vec::new());
        }
        let mut steps: Vec<usize> = fs::read_dir(&self.root)
            .with_context(|| format!("Cannot list '{}'", self.root.display()))?
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().is_dir())
            .filter_map(|entry| {
                entry
                    .file_name()
                    .to_str()
                    .and_then(|name| name.strip_prefix(STEP_PREFIX))
                    .and_then(|step| step.parse().ok())
            })
            .collect();
        steps.sort_unstable();
        Ok(steps)
    }

    fn rotate(&self) -> Result<()> {
        if self.total_limit == 0 {
            return Ok(());
        }
        let steps = self.steps()?;
        let excess = steps.len().saturating_sub(self.total_limit);
        for step in &steps[..excess] {
            let dir = self.root.join(format!("{STEP_PREFIX}{step}"));
            fs::remove_dir_all(&dir)
                .with_context(|| format!("Cannot remove old checkpoint '{}'", dir.display()))?;
            tracing::debug!("Removed old checkpoint '{}'", dir.display());
        }
        Ok(())
    }
}

pub fn save_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json)
        .with_context(|| format!("Cannot write '{}'", path.display()))
}

pub fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("Cannot read '{}'", path.display()))?;
    serde_json::from_str(&json)
        .with_context(|| format!("Invalid JSON in '{}'", path.display()))
}
