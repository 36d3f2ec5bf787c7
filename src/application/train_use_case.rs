// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates the fine-tuning pipeline in order:
//
//   Step 1: Load cleaned chunks          (Layer 4 - data)
//   Step 2: Resolve base model files     (Layer 6 - infra)
//   Step 3: Load the base tokenizer      (Layer 6 - infra)
//   Step 4: Tokenise into a dataset      (Layer 4 - data)
//   Step 5: Save tokenizer + config      (Layer 6 - infra)
//   Step 6: Run the LoRA training loop   (Layer 5 - ml)
//
// Reference: Hu et al. (2021) LoRA
//            Burn Book §5 (Training)

use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::data::{corpus::CorpusStore, dataset::LmDataset};
use crate::domain::adapter::AdapterConfig;
use crate::infra::{
    checkpoint::{save_json, TRAIN_CONFIG},
    hub::ModelFiles,
    tokenizer_store::{eos_token_id, load_tokenizer, TokenizerStore},
};
use crate::ml::{
    lora::LoraTargets,
    trainer::{run_training, TrainJob, TrainSummary},
    weights::HfGptConfig,
};

// ─── Training Configuration ──────────────────────────────────────────────────
// All hyperparameters for a run. Written to
// <output_dir>/training_config.json so a run can be reproduced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    pub chunks_dir:       String,
    pub output_dir:       String,
    /// Hub repository id or a local directory with config.json,
    /// model.safetensors and tokenizer.json
    pub base_model:       String,
    pub max_length:       usize,
    pub epochs:           usize,
    pub batch_size:       usize,
    pub learning_rate:    f64,
    pub weight_decay:     f64,
    pub max_grad_norm:    f64,
    pub logging_steps:    usize,
    pub save_steps:       usize,
    pub save_total_limit: usize,
    pub seed:             u64,
    pub lora_r:           usize,
    pub lora_alpha:       f64,
    pub lora_dropout:     f64,
    pub target_modules:   Vec<String>,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            chunks_dir:       "data/cleaned".to_string(),
            output_dir:       "experiments/sherlock_lora".to_string(),
            base_model:       "gpt2".to_string(),
            max_length:       512,
            epochs:           3,
            batch_size:       4,
            learning_rate:    1e-4,
            weight_decay:     0.01,
            max_grad_norm:    1.0,
            logging_steps:    50,
            save_steps:       200,
            save_total_limit: 2,
            seed:             42,
            lora_r:           8,
            lora_alpha:       16.0,
            lora_dropout:     0.1,
            target_modules:   vec!["c_attn".to_string(), "c_proj".to_string()],
        }
    }
}

impl TrainConfig {
    pub fn validate(&self) -> Result<()> {
        ensure!(self.batch_size > 0, "batch_size must be positive");
        ensure!(self.epochs > 0, "epochs must be positive");
        ensure!(self.max_length >= 2, "max_length must be at least 2");
        ensure!(self.lora_r > 0, "lora_r must be positive");
        ensure!(
            (0.0..1.0).contains(&self.lora_dropout),
            "lora_dropout must be in [0, 1)"
        );
        LoraTargets::from_names(&self.target_modules)?;
        Ok(())
    }

    /// Sequence length actually used: never longer than the
    /// position-embedding table
    pub fn effective_max_length(&self, n_positions: usize) -> usize {
        self.max_length.min(n_positions)
    }

    /// The adapter_config.json record for this run
    pub fn adapter_config(&self) -> AdapterConfig {
        AdapterConfig::lora(
            self.base_model.clone(),
            self.lora_r,
            self.lora_alpha,
            self.lora_dropout,
            self.target_modules.clone(),
        )
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<TrainSummary> {
        let cfg = &self.config;
        cfg.validate()?;

        // ── Step 1: Load chunks ───────────────────────────────────────────────
        let chunks = CorpusStore::new(&cfg.chunks_dir).load_all()?;
        ensure!(
            !chunks.is_empty(),
            "No chunks found in '{}'. Run 'prepare' first.",
            cfg.chunks_dir
        );
        tracing::info!("Loaded {} chunks from '{}'", chunks.len(), cfg.chunks_dir);

        // ── Step 2: Base model files ──────────────────────────────────────────
        let files = ModelFiles::resolve(&cfg.base_model)?;
        let hf    = HfGptConfig::load(&files.config)?;
        let gpt   = hf.to_gpt_config(hf.resid_pdrop);

        // ── Step 3: Tokenizer (GPT-2 has no pad token, EOS doubles as pad) ────
        let tokenizer = load_tokenizer(&files.tokenizer)?;
        let pad_id    = eos_token_id(&tokenizer)?;

        // ── Step 4: Dataset ───────────────────────────────────────────────────
        let max_length = cfg.effective_max_length(gpt.n_positions);
        if max_length < cfg.max_length {
            tracing::warn!(
                "max_length {} exceeds the model context, using {}",
                cfg.max_length,
                max_length
            );
        }
        let dataset = LmDataset::from_texts(
            chunks.iter().map(|c| c.text.as_str()),
            &tokenizer,
            max_length,
        )?;
        ensure!(dataset.sample_count() > 0, "No chunk produced a training sequence");
        tracing::info!(
            "Tokenised {} sequences ({} tokens)",
            dataset.sample_count(),
            dataset.token_count()
        );

        // ── Step 5: Persist what generation needs ─────────────────────────────
        TokenizerStore::new(&cfg.output_dir).save(&tokenizer)?;
        save_json(&Path::new(&cfg.output_dir).join(TRAIN_CONFIG), cfg)?;

        // ── Step 6: Train ─────────────────────────────────────────────────────
        let job = TrainJob {
            gpt,
            weights: &files.weights,
            adapter: cfg.adapter_config(),
            dataset,
            pad_id,
        };
        let summary = run_training(cfg, job)?;
        tracing::info!("Training complete after {} steps", summary.steps);
        Ok(summary)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::tiny_config;

    #[test]
    fn test_defaults_are_valid() {
        let cfg = TrainConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.max_length, 512);
        assert_eq!(cfg.epochs, 3);
    }

    #[test]
    fn test_adapter_config_mirrors_lora_settings() {
        let a = TrainConfig::default().adapter_config();
        assert_eq!(a.base_model_name_or_path, "gpt2");
        assert_eq!(a.r, 8);
        assert_eq!(a.scaling(), 2.0);
        assert_eq!(a.target_modules, vec!["c_attn", "c_proj"]);
    }

    #[test]
    fn test_max_length_capped_at_context() {
        let n_positions = tiny_config().n_positions;
        let long  = TrainConfig::default();
        let short = TrainConfig { max_length: 8, ..TrainConfig::default() };

        assert_eq!(long.effective_max_length(n_positions), 16);
        assert_eq!(short.effective_max_length(n_positions), 8);
        assert_eq!(long.effective_max_length(1024), 512);
    }

    #[test]
    fn test_validation_errors() {
        let bad_batch = TrainConfig { batch_size: 0, ..TrainConfig::default() };
        assert!(bad_batch.validate().is_err());

        let bad_target = TrainConfig { target_modules: vec!["q_proj".into()], ..TrainConfig::default() };
        assert!(bad_target.validate().is_err());
    }

    #[test]
    fn test_missing_chunks_fail_before_model_download() {
        let cfg = TrainConfig {
            chunks_dir: "/nonexistent/cleaned".into(),
            ..TrainConfig::default()
        };
        let err = TrainUseCase::new(cfg).execute().unwrap_err();
        assert!(err.to_string().contains("prepare"));
    }

    #[test]
    fn test_config_json_round_trip() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join(TRAIN_CONFIG);
        save_json(&path, &TrainConfig::default()).unwrap();

        let back: TrainConfig = crate::infra::checkpoint::load_json(&path).unwrap();
        assert_eq!(back.seed, 42);
        assert_eq!(back.save_total_limit, 2);
    }
}
