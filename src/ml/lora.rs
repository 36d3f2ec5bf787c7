// ============================================================
// Layer 5 — LoRA Adapters
// ============================================================
// Low-rank adaptation of the frozen GPT-2 projections.
//
// For an adapted projection W (stored [in, out]) the forward is
//
//   y = x·W + b + (alpha / r) · dropout(x)·A·B
//
//   A: [in, r]   Kaiming-uniform init
//   B: [r, out]  zero init → an untrained adapter changes nothing
//
// The adapters live in their own module tree (AdapterStack),
// parallel to the base model's blocks, so the checkpoint holds
// only the low-rank weights and the base model can be fetched
// again from the hub at inference time.
//
// Target names follow GPT-2's module names. As with PEFT's
// suffix matching, "c_proj" adapts both the attention output
// projection and the MLP output projection.

use anyhow::{bail, ensure, Result};
use burn::{
    module::Param,
    nn::{Dropout, DropoutConfig, Initializer, Linear, LinearConfig},
    prelude::*,
};

use crate::domain::adapter::AdapterConfig;
use crate::ml::model::{masked_lm_loss, GptConfig, GptModel};

#[derive(Config, Debug)]
pub struct LoraConfig {
    #[config(default = 8)]
    pub r: usize,
    #[config(default = 16.0)]
    pub alpha: f64,
    #[config(default = 0.1)]
    pub dropout: f64,
}

impl LoraConfig {
    pub fn from_adapter_config(cfg: &AdapterConfig) -> Self {
        Self::new()
            .with_r(cfg.r)
            .with_alpha(cfg.lora_alpha)
            .with_dropout(cfg.lora_dropout)
    }

    pub fn scaling(&self) -> f64 {
        self.alpha / self.r as f64
    }

    pub fn init_linear<B: Backend>(
        &self,
        d_in:   usize,
        d_out:  usize,
        device: &B::Device,
    ) -> LoraLinear<B> {
        LoraLinear {
            lora_a: LinearConfig::new(d_in, self.r).with_bias(false).init(device),
            lora_b: LinearConfig::new(self.r, d_out)
                .with_bias(false)
                .with_initializer(Initializer::Zeros)
                .init(device),
            dropout: DropoutConfig::new(self.dropout).init(),
            scaling: self.scaling(),
        }
    }

    /// One BlockAdapters per transformer block, adapting `targets`
    pub fn init_stack<B: Backend>(
        &self,
        gpt:     &GptConfig,
        targets: &LoraTargets,
        device:  &B::Device,
    ) -> AdapterStack<B> {
        let d = gpt.n_embd;
        let blocks = (0..gpt.n_layer)
            .map(|_| BlockAdapters {
                attn_c_attn: targets.attn_c_attn.then(|| self.init_linear(d, 3 * d, device)),
                attn_c_proj: targets.attn_c_proj.then(|| self.init_linear(d, d, device)),
                mlp_c_fc:    targets.mlp_c_fc.then(|| self.init_linear(d, 4 * d, device)),
                mlp_c_proj:  targets.mlp_c_proj.then(|| self.init_linear(4 * d, d, device)),
            })
            .collect();
        AdapterStack { blocks }
    }
}

/// Which projections of every block carry an adapter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoraTargets {
    pub attn_c_attn: bool,
    pub attn_c_proj: bool,
    pub mlp_c_fc:    bool,
    pub mlp_c_proj:  bool,
}

impl LoraTargets {
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Result<Self> {
        ensure!(!names.is_empty(), "At least one LoRA target module is required");

        let mut t = Self::default();
        for name in names {
            match name.as_ref().trim() {
                "c_attn" | "attn.c_attn" => t.attn_c_attn = true,
                "c_proj" => {
                    t.attn_c_proj = true;
                    t.mlp_c_proj  = true;
                }
                "attn.c_proj"          => t.attn_c_proj = true,
                "c_fc" | "mlp.c_fc"    => t.mlp_c_fc = true,
                "mlp.c_proj"           => t.mlp_c_proj = true,
                other => bail!(
                    "Unknown LoRA target module '{other}' \
                     (expected c_attn, c_proj, c_fc, attn.c_proj or mlp.c_proj)"
                ),
            }
        }
        Ok(t)
    }

    /// Adapted projections per block
    pub fn count(&self) -> usize {
        [self.attn_c_attn, self.attn_c_proj, self.mlp_c_fc, self.mlp_c_proj]
            .iter()
            .filter(|&&on| on)
            .count()
    }
}

#[derive(Module, Debug)]
pub struct LoraLinear<B: Backend> {
    /// [in, r]
    pub lora_a:  Linear<B>,
    /// [r, out]
    pub lora_b:  Linear<B>,
    pub dropout: Dropout,
    pub scaling: f64,
}

impl<B: Backend> LoraLinear<B> {
    /// The low-rank update only; callers add the base projection
    pub fn forward<const D: usize>(&self, x: Tensor<B, D>) -> Tensor<B, D> {
        self.lora_b
            .forward(self.lora_a.forward(self.dropout.forward(x)))
            .mul_scalar(self.scaling)
    }

    /// scaling · A·B in the base weight layout [in, out]
    pub fn delta_weight(&self) -> Tensor<B, 2> {
        self.lora_a
            .weight
            .val()
            .matmul(self.lora_b.weight.val())
            .mul_scalar(self.scaling)
    }

    /// Fold the update into `base`: W' = W + scaling · A·B
    pub fn merge_into(&self, mut base: Linear<B>) -> Linear<B> {
        let merged = base.weight.val() + self.delta_weight();
        base.weight = Param::from_tensor(merged);
        base
    }
}

#[derive(Module, Debug)]
pub struct BlockAdapters<B: Backend> {
    pub attn_c_attn: Option<LoraLinear<B>>,
    pub attn_c_proj: Option<LoraLinear<B>>,
    pub mlp_c_fc:    Option<LoraLinear<B>>,
    pub mlp_c_proj:  Option<LoraLinear<B>>,
}

#[derive(Module, Debug)]
pub struct AdapterStack<B: Backend> {
    pub blocks: Vec<BlockAdapters<B>>,
}

/// Frozen base model plus trainable adapters.
#[derive(Module, Debug)]
pub struct LoraGpt<B: Backend> {
    pub base:     GptModel<B>,
    pub adapters: AdapterStack<B>,
}

impl<B: Backend> LoraGpt<B> {
    /// Wrap `base`, freezing every one of its parameters
    pub fn new(base: GptModel<B>, adapters: AdapterStack<B>) -> Self {
        Self { base: base.no_grad(), adapters }
    }

    pub fn forward(&self, input_ids: Tensor<B, 2, Int>) -> Tensor<B, 3> {
        self.base.forward(input_ids, Some(&self.adapters))
    }

    pub fn forward_loss(
        &self,
        inputs:      Tensor<B, 2, Int>,
        targets:     Tensor<B, 2, Int>,
        target_mask: Tensor<B, 2>,
    ) -> Tensor<B, 1> {
        masked_lm_loss(self.forward(inputs), targets, target_mask)
    }

    pub fn trainable_params(&self) -> usize {
        self.adapters.num_params()
    }

    /// A plain GPT model with every adapter folded into its base projection
    pub fn merge(self) -> GptModel<B> {
        let mut model = self.base;
        model.blocks = model
            .blocks
            .into_iter()
            .zip(&self.adapters.blocks)
            .map(|(mut block, a)| {
                if let Some(l) = &a.attn_c_attn {
                    block.attn.c_attn = l.merge_into(block.attn.c_attn);
                }
                if let Some(l) = &a.attn_c_proj {
                    block.attn.c_proj = l.merge_into(block.attn.c_proj);
                }
                if let Some(l) = &a.mlp_c_fc {
                    block.mlp.c_fc = l.merge_into(block.mlp.c_fc);
                }
                if let Some(l) = &a.mlp_c_proj {
                    block.mlp.c_proj = l.merge_into(block.mlp.c_proj);
                }
                block
            })
            .collect();
        model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::tiny_config;
    use burn::{backend::NdArray, tensor::Distribution};

    type TestBackend = NdArray;

    fn tiny_lora(targets: &[&str]) -> LoraGpt<TestBackend> {
        let device = Default::default();
        let gpt    = tiny_config();
        let lora   = LoraConfig::new().with_r(2).with_alpha(4.0).with_dropout(0.0);
        let stack  = lora.init_stack(&gpt, &LoraTargets::from_names(targets).unwrap(), &device);
        LoraGpt::new(gpt.init(&device), stack)
    }

    fn input() -> Tensor<TestBackend, 2, Int> {
        Tensor::<TestBackend, 1, Int>::from_ints([5, 1, 30, 2, 9], &Default::default())
            .reshape([1, 5])
    }

    fn to_vec(t: Tensor<TestBackend, 3>) -> Vec<f32> {
        t.into_data().to_vec().unwrap()
    }

    fn assert_close(a: &[f32], b: &[f32]) {
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(b) {
            assert!((x - y).abs() < 1e-4, "{x} != {y}");
        }
    }

    #[test]
    fn test_target_names() {
        let t = LoraTargets::from_names(&["c_attn", "c_proj"]).unwrap();
        assert_eq!(
            t,
            LoraTargets { attn_c_attn: true, attn_c_proj: true, mlp_c_fc: false, mlp_c_proj: true }
        );
        assert_eq!(t.count(), 3);

        let t = LoraTargets::from_names(&["attn.c_proj"]).unwrap();
        assert!(t.attn_c_proj && !t.mlp_c_proj);
    }

    #[test]
    fn test_unknown_or_empty_targets_rejected() {
        assert!(LoraTargets::from_names(&["q_proj"]).is_err());
        assert!(LoraTargets::from_names::<&str>(&[]).is_err());
    }

    #[test]
    fn test_trainable_parameter_count() {
        // d=8, r=2: c_attn 8·2+2·24, attn.c_proj 8·2+2·8, mlp.c_proj 32·2+2·8
        let model = tiny_lora(&["c_attn", "c_proj"]);
        assert_eq!(model.trainable_params(), 2 * (64 + 32 + 80));
        assert!(model.num_params() > model.trainable_params());
    }

    #[test]
    fn test_untrained_adapter_matches_base_model() {
        let model   = tiny_lora(&["c_attn", "c_proj", "c_fc"]);
        let adapted = to_vec(model.forward(input()));
        let base    = to_vec(model.base.forward(input(), None));
        assert_close(&adapted, &base);
    }

    #[test]
    fn test_merged_model_matches_adapted_forward() {
        let mut model = tiny_lora(&["c_attn", "c_proj", "c_fc"]);
        let device    = Default::default();

        // Give every B a non-zero value so the adapters actually change the output
        for block in model.adapters.blocks.iter_mut() {
            for lora in [
                &mut block.attn_c_attn,
                &mut block.attn_c_proj,
                &mut block.mlp_c_fc,
                &mut block.mlp_c_proj,
            ]
            .into_iter()
            .flatten()
            {
                let dims = lora.lora_b.weight.dims();
                lora.lora_b.weight = Param::from_tensor(Tensor::random(
                    dims,
                    Distribution::Normal(0.0, 0.5),
                    &device,
                ));
            }
        }

        let adapted = to_vec(model.forward(input()));
        let base    = to_vec(model.base.forward(input(), None));
        assert!(adapted.iter().zip(&base).any(|(a, b)| (a - b).abs() > 1e-3));

        let merged = to_vec(model.merge().forward(input(), None));
        assert_close(&merged, &adapted);
    }
}
