// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// Everything that touches burn tensors lives here. The data
// layer hands over token ids, the application layer hands over
// configuration; this layer turns them into a trained adapter
// or generated token ids.
//
//   model.rs     — GPT-2 decoder (embeddings, pre-norm blocks,
//                  causal self-attention, tied LM head) with
//                  optional LoRA hooks on every projection
//
//   lora.rs      — low-rank adapters, the adapter stack that is
//                  checkpointed on its own, and weight merging
//
//   weights.rs   — Hugging Face config.json + safetensors import
//
//   trainer.rs   — AdamW loop over the frozen base model with
//                  clipping, linear LR decay, logging and
//                  intermediate checkpoints
//
//   sampling.rs  — repetition penalty, temperature, top-k,
//                  top-p and seeded sampling over raw logits
//
//   generator.rs — autoregressive decoding loop
//
// Reference: Radford et al. (2019) Language Models are
//            Unsupervised Multitask Learners (GPT-2)
//            Hu et al. (2021) LoRA
//            Holtzman et al. (2019) nucleus sampling

/// GPT-2 architecture
pub mod model;

/// Low-rank adapters and merging
pub mod lora;

/// Pretrained weight import
pub mod weights;

/// Fine-tuning loop
pub mod trainer;

/// Logits processing and token sampling
pub mod sampling;

/// Autoregressive generation
pub mod generator;

/// Two layers, 8-wide, 32-token vocabulary. Small enough for CPU tests.
#[cfg(test)]
pub(crate) fn tiny_config() -> model::GptConfig {
    model::GptConfig::new(32, 16, 8, 2, 2).with_dropout(0.0)
}
