// ============================================================
// Layer 5 — Pretrained GPT-2 Weight Import
// ============================================================
// Reads a Hugging Face GPT-2 checkpoint (config.json +
// model.safetensors) into GptModel.
//
// GPT-2 uses Conv1D projections whose weights are stored as
// [in, out], which is exactly burn's Linear layout, so no
// transposes are needed:
//
//   wte.weight                  [vocab, d]
//   wpe.weight                  [n_positions, d]
//   h.{i}.ln_1.{weight,bias}    [d]
//   h.{i}.attn.c_attn.weight    [d, 3d]   (+ bias [3d])
//   h.{i}.attn.c_proj.weight    [d, d]
//   h.{i}.ln_2.{weight,bias}    [d]
//   h.{i}.mlp.c_fc.weight       [d, 4d]
//   h.{i}.mlp.c_proj.weight     [4d, d]
//   ln_f.{weight,bias}          [d]
//
// Some exports prefix every key with "transformer."; both
// spellings are accepted.

use anyhow::{bail, ensure, Context, Result};
use burn::{
    module::Param,
    nn::{LayerNorm, Linear},
    prelude::*,
    tensor::TensorData,
};
use safetensors::{tensor::Dtype, SafeTensors};
use serde::Deserialize;
use std::{fs, path::Path};

use crate::ml::model::{GptConfig, GptModel};

/// The fields of a Hugging Face GPT-2 `config.json` this crate uses.
#[derive(Debug, Clone, Deserialize)]
pub struct HfGptConfig {
    pub vocab_size:  usize,
    pub n_positions: usize,
    pub n_embd:      usize,
    pub n_layer:     usize,
    pub n_head:      usize,
    #[serde(default = "default_layer_norm_epsilon")]
    pub layer_norm_epsilon: f64,
    #[serde(default = "default_dropout")]
    pub resid_pdrop: f64,
    #[serde(default)]
    pub eos_token_id: Option<u32>,
}

fn default_layer_norm_epsilon() -> f64 { 1e-5 }
fn default_dropout() -> f64 { 0.1 }

impl HfGptConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("Cannot read model config '{}'", path.display()))?;
        let cfg: Self = serde_json::from_str(&json)
            .with_context(|| format!("'{}' is not a GPT-2 config", path.display()))?;
        ensure!(
            cfg.n_head > 0 && cfg.n_embd % cfg.n_head == 0,
            "n_embd ({}) must be divisible by n_head ({})",
            cfg.n_embd,
            cfg.n_head
        );
        Ok(cfg)
    }

    /// Architecture for burn, with `dropout` overriding the checkpoint's rate
    pub fn to_gpt_config(&self, dropout: f64) -> GptConfig {
        GptConfig::new(self.vocab_size, self.n_positions, self.n_embd, self.n_layer, self.n_head)
            .with_layer_norm_epsilon(self.layer_norm_epsilon)
            .with_dropout(dropout)
    }
}

/// Build `config` and overwrite every parameter from the safetensors file.
pub fn load_gpt2<B: Backend>(
    config:  &GptConfig,
    weights: &Path,
    device:  &B::Device,
) -> Result<GptModel<B>> {
    let bytes = fs::read(weights)
        .with_context(|| format!("Cannot read weights '{}'", weights.display()))?;
    let st = SafeTensors::deserialize(&bytes)
        .map_err(|e| anyhow::anyhow!("Invalid safetensors file '{}': {e}", weights.display()))?;

    let reader = WeightReader { st: &st, device };
    let mut model: GptModel<B> = config.init(device);

    let (v, p, d) = (config.vocab_size, config.n_positions, config.n_embd);
    model.wte.weight = Param::from_tensor(reader.tensor("wte.weight", [v, d])?);
    model.wpe.weight = Param::from_tensor(reader.tensor("wpe.weight", [p, d])?);

    for (i, block) in model.blocks.iter_mut().enumerate() {
        let h = format!("h.{i}");
        reader.layer_norm(&mut block.ln_1, &format!("{h}.ln_1"), d)?;
        reader.linear(&mut block.attn.c_attn, &format!("{h}.attn.c_attn"), d, 3 * d)?;
        reader.linear(&mut block.attn.c_proj, &format!("{h}.attn.c_proj"), d, d)?;
        reader.layer_norm(&mut block.ln_2, &format!("{h}.ln_2"), d)?;
        reader.linear(&mut block.mlp.c_fc, &format!("{h}.mlp.c_fc"), d, 4 * d)?;
        reader.linear(&mut block.mlp.c_proj, &format!("{h}.mlp.c_proj"), 4 * d, d)?;
    }
    reader.layer_norm(&mut model.ln_f, "ln_f", d)?;

    tracing::info!(
        "Loaded {} layers ({} parameters) from '{}'",
        model.num_layers(),
        model.num_params(),
        weights.display()
    );
    Ok(model)
}

struct WeightReader<'a, B: Backend> {
    st:     &'a SafeTensors<'a>,
    device: &'a B::Device,
}

impl<B: Backend> WeightReader<'_, B> {
    fn tensor<const D: usize>(&self, name: &str, shape: [usize; D]) -> Result<Tensor<B, D>> {
        let prefixed = format!("transformer.{name}");
        let view = self
            .st
            .tensor(name)
            .or_else(|_| self.st.tensor(&prefixed))
            .map_err(|_| anyhow::anyhow!("Missing tensor '{name}' in checkpoint"))?;

        ensure!(
            view.shape() == shape.as_slice(),
            "Tensor '{name}' has shape {:?}, expected {:?}",
            view.shape(),
            shape
        );
        let values = match view.dtype() {
            Dtype::F32 => view
                .data()
                .chunks_exact(4)
                .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
                .collect::<Vec<f32>>(),
            other => bail!("Tensor '{name}' has unsupported dtype {other:?} (expected F32)"),
        };

        Ok(Tensor::from_data(TensorData::new(values, shape), self.device))
    }

    fn linear(&self, linear: &mut Linear<B>, prefix: &str, d_in: usize, d_out: usize) -> Result<()> {
        linear.weight = Param::from_tensor(self.tensor(&format!("{prefix}.weight"), [d_in, d_out])?);
        linear.bias = Some(Param::from_tensor(self.tensor(&format!("{prefix}.bias"), [d_out])?));
        Ok(())
    }

    fn layer_norm(&self, norm: &mut LayerNorm<B>, prefix: &str, d: usize) -> Result<()> {
        norm.gamma = Param::from_tensor(self.tensor(&format!("{prefix}.weight"), [d])?);
        norm.beta  = Param::from_tensor(self.tensor(&format!("{prefix}.bias"), [d])?);
        Ok(())
    }
}
