// ============================================================
// Layer 2 — GenerateUseCase
// ============================================================
// Loads a trained adapter and continues a prompt:
//
//   Step 1: Read adapter_config.json      (Layer 6 - infra)
//   Step 2: Fetch the base model it names (Layer 6 - infra)
//   Step 3: Rebuild + load the adapters   (Layer 5/6)
//   Step 4: Merge adapters into the base  (Layer 5 - ml)
//   Step 5: Sample a continuation         (Layer 5 - ml)
//
// The tokenizer saved next to the adapter is preferred; the
// base model's tokenizer is the fallback.

use anyhow::{ensure, Result};
use burn::prelude::*;
use serde::{Deserialize, Serialize};
use tokenizers::Tokenizer;

use crate::domain::traits::TextGenerator;
use crate::infra::{
    checkpoint::AdapterCheckpoint,
    hub::ModelFiles,
    tokenizer_store::{decode, encode, load_tokenizer, TokenizerStore, EOS_TOKEN},
};
use crate::ml::{
    generator::Generator,
    lora::{LoraConfig, LoraGpt, LoraTargets},
    sampling::{LogitsSampler, SamplingConfig},
    weights::{load_gpt2, HfGptConfig},
};

type InferBackend = burn::backend::Wgpu;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateConfig {
    pub model_dir:      String,
    pub max_new_tokens: usize,
    pub sampling:       SamplingConfig,
    /// Fixed seed for reproducible sampling; None draws one from the OS
    pub seed:           Option<u64>,
}

impl Default for GenerateConfig {
    fn default() -> Self {
        Self {
            model_dir:      "experiments/sherlock_lora".to_string(),
            max_new_tokens: 180,
            sampling:       SamplingConfig::default(),
            seed:           None,
        }
    }
}

pub struct GenerateUseCase<B: Backend = InferBackend> {
    config:    GenerateConfig,
    tokenizer: Tokenizer,
    generator: Generator<B>,
    eos_id:    Option<u32>,
}

impl GenerateUseCase<InferBackend> {
    pub fn new(config: GenerateConfig) -> Result<Self> {
        let device = burn::backend::wgpu::WgpuDevice::default();
        tracing::info!("Using WGPU device: {:?}", device);
        Self::load(config, device)
    }
}

impl<B: Backend> GenerateUseCase<B> {
    pub fn load(config: GenerateConfig, device: B::Device) -> Result<Self> {
        // ── Step 1: Adapter record ────────────────────────────────────────────
        let ckpt        = AdapterCheckpoint::new(&config.model_dir);
        let adapter_cfg = ckpt.load_config()?;
        tracing::info!(
            "Adapter: r={} alpha={} (scaling {}) targets={:?} base='{}'",
            adapter_cfg.r,
            adapter_cfg.lora_alpha,
            adapter_cfg.scaling(),
            adapter_cfg.target_modules,
            adapter_cfg.base_model_name_or_path
        );

        // ── Step 2: Base model (dropout off for inference) ────────────────────
        let files = ModelFiles::resolve(&adapter_cfg.base_model_name_or_path)?;
        let hf    = HfGptConfig::load(&files.config)?;
        let gpt   = hf.to_gpt_config(0.0);
        let base  = load_gpt2::<B>(&gpt, &files.weights, &device)?;

        // ── Step 3: Adapters ──────────────────────────────────────────────────
        let targets  = LoraTargets::from_names(&adapter_cfg.target_modules)?;
        let stack    = LoraConfig::from_adapter_config(&adapter_cfg)
            .with_dropout(0.0)
            .init_stack(&gpt, &targets, &device);
        let adapters = ckpt.load_adapters(stack, &device)?;

        // ── Step 4: Merge ─────────────────────────────────────────────────────
        let model = LoraGpt::new(base, adapters).merge();
        tracing::info!("Merged adapter into base model");

        let store = TokenizerStore::new(&config.model_dir);
        let tokenizer = if store.exists() {
            store.load()?
        } else {
            tracing::warn!("No tokenizer in '{}', using the base tokenizer", config.model_dir);
            load_tokenizer(&files.tokenizer)?
        };
        let eos_id = tokenizer.token_to_id(EOS_TOKEN).or(hf.eos_token_id);

        Ok(Self { config, tokenizer, generator: Generator::new(model, device), eos_id })
    }
}

impl<B: Backend> TextGenerator for GenerateUseCase<B> {
    fn generate(&mut self, prompt: &str) -> Result<String> {
        let prompt_ids = encode(&self.tokenizer, prompt)?;
        ensure!(!prompt_ids.is_empty(), "Prompt is empty after tokenisation");

        // ── Step 5: Sample ────────────────────────────────────────────────────
        let mut sampler = LogitsSampler::new(&self.config.sampling, self.config.seed);
        tracing::debug!("Sampling: {:?}, seed {:?}", sampler.sampling(), self.config.seed);
        let continuation = self.generator.generate(
            &prompt_ids,
            self.config.max_new_tokens,
            self.eos_id,
            &mut sampler,
        )?;

        let mut all_ids = prompt_ids;
        all_ids.extend_from_slice(&continuation);
        decode(&self.tokenizer, &all_ids)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::{
        hub::{CONFIG_FILE, TOKENIZER_FILE, WEIGHTS_FILE},
        tokenizer_store::tests::word_level_tokenizer,
    };
    use crate::ml::{tiny_config, weights::tests::fake_checkpoint};
    use crate::domain::adapter::AdapterConfig;
    use burn::backend::NdArray;
    use std::{fs, path::Path};

    type TestBackend = NdArray;

    /// Local base model + trained-adapter directory, both on disk
    fn fixture(root: &Path) -> GenerateConfig {
        let base = root.join("base");
        fs::create_dir_all(&base).unwrap();
        let gpt = tiny_config();
        fs::write(
            base.join(CONFIG_FILE),
            r#"{"vocab_size": 32, "n_positions": 16, "n_embd": 8, "n_layer": 2, "n_head": 2}"#,
        )
        .unwrap();
        fs::write(base.join(WEIGHTS_FILE), fake_checkpoint(&gpt, "")).unwrap();
        word_level_tokenizer().save(base.join(TOKENIZER_FILE), false).unwrap();

        let adapter_cfg = AdapterConfig::lora(
            base.to_string_lossy(),
            2,
            4.0,
            0.0,
            vec!["c_attn".into(), "c_proj".into()],
        );
        let stack = LoraConfig::from_adapter_config(&adapter_cfg).init_stack::<TestBackend>(
            &gpt,
            &LoraTargets::from_names(&adapter_cfg.target_modules).unwrap(),
            &Default::default(),
        );
        let out = root.join("adapter");
        AdapterCheckpoint::new(&out).save(&stack, &adapter_cfg).unwrap();

        GenerateConfig {
            model_dir:      out.to_string_lossy().into_owned(),
            max_new_tokens: 6,
            sampling:       SamplingConfig { repetition_penalty: 1.0, ..SamplingConfig::default() },
            seed:           Some(42),
        }
    }

    #[test]
    fn test_fixed_seed_fixed_output() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = fixture(dir.path());

        let mut a = GenerateUseCase::<TestBackend>::load(cfg.clone(), Default::default()).unwrap();
        let mut b = GenerateUseCase::<TestBackend>::load(cfg, Default::default()).unwrap();

        let first = a.generate("holmes said").unwrap();
        assert!(first.starts_with("holmes said"));
        assert_eq!(first, a.generate("holmes said").unwrap());
        assert_eq!(first, b.generate("holmes said").unwrap());
    }

    #[test]
    fn test_empty_prompt_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut gen = GenerateUseCase::<TestBackend>::load(fixture(dir.path()), Default::default()).unwrap();
        assert!(gen.generate("   ").is_err());
    }

    #[test]
    fn test_untrained_directory_mentions_train() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = GenerateConfig {
            model_dir: dir.path().to_string_lossy().into_owned(),
            ..GenerateConfig::default()
        };
        let err = GenerateUseCase::<TestBackend>::load(cfg, Default::default()).err().unwrap();
        assert!(format!("{err:#}").contains("Run 'train'"));
    }
}
