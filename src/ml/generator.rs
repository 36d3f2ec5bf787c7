// ============================================================
// Layer 5 — Autoregressive Generator
// ============================================================
// Feeds the growing sequence back through the (merged) model one
// token at a time. Each step re-runs the full window of the last
// `n_positions` tokens; there is no key/value cache.

use anyhow::{anyhow, ensure, Result};
use burn::prelude::*;

use crate::ml::{model::GptModel, sampling::LogitsSampler};

pub struct Generator<B: Backend> {
    model:  GptModel<B>,
    device: B::Device,
}

impl<B: Backend> Generator<B> {
    pub fn new(model: GptModel<B>, device: B::Device) -> Self {
        Self { model, device }
    }

    /// Returns only the newly generated ids, stopping before `eos_id`
    pub fn generate(
        &self,
        prompt_ids:     &[u32],
        max_new_tokens: usize,
        eos_id:         Option<u32>,
        sampler:        &mut LogitsSampler,
    ) -> Result<Vec<u32>> {
        ensure!(!prompt_ids.is_empty(), "Prompt produced no tokens");

        let window = self.model.n_positions;
        let mut tokens = prompt_ids.to_vec();
        let mut generated = Vec::with_capacity(max_new_tokens);

        for _ in 0..max_new_tokens {
            let start   = tokens.len().saturating_sub(window);
            let context = &tokens[start..];
            let logits  = self.last_logits(context)?;

            let next = sampler.next_token(logits, &tokens)?;
            if Some(next) == eos_id {
                break;
            }
            tokens.push(next);
            generated.push(next);
        }

        tracing::debug!("Generated {} tokens", generated.len());
        Ok(generated)
    }

    /// Logits of the final position of `context`
    fn last_logits(&self, context: &[u32]) -> Result<Vec<f32>> {
        let seq_len = context.len();
        let ids: Vec<i32> = context.iter().map(|&t| t as i32).collect();
        let input = Tensor::<B, 1, Int>::from_ints(ids.as_slice(), &self.device)
            .reshape([1, seq_len]);

        let logits = self.model.forward(input, None);
        let [_, _, vocab] = logits.dims();
        logits
            .slice([0..1, seq_len - 1..seq_len, 0..vocab])
            .into_data()
            .to_vec::<f32>()
            .map_err(|e| anyhow!("Cannot read logits: {e:?}"))
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::{sampling::SamplingConfig, tiny_config};
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn generator() -> Generator<TestBackend> {
        let device = Default::default();
        TestBackend::seed(7);
        Generator::new(tiny_config().init(&device), device)
    }

    #[test]
    fn test_seeded_generation_is_deterministic() {
        let gen = generator();
        let cfg = SamplingConfig::default();

        let a = gen.generate(&[1, 2, 3], 12, None, &mut LogitsSampler::new(&cfg, Some(42))).unwrap();
        let b = gen.generate(&[1, 2, 3], 12, None, &mut LogitsSampler::new(&cfg, Some(42))).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 12);
        assert!(a.iter().all(|&t| t < 32));
    }

    #[test]
    fn test_context_slides_past_model_window() {
        // tiny_config has n_positions = 16
        let gen = generator();
        let prompt: Vec<u32> = (0..14).collect();
        let mut sampler = LogitsSampler::new(&SamplingConfig::greedy(), None);
        let out = gen.generate(&prompt, 10, None, &mut sampler).unwrap();
        assert_eq!(out.len(), 10);
    }

    #[test]
    fn test_stops_at_eos() {
        let gen = generator();
        let mut sampler = LogitsSampler::new(&SamplingConfig::greedy(), None);
        let first = gen.generate(&[4, 5], 1, None, &mut sampler).unwrap()[0];

        let mut sampler = LogitsSampler::new(&SamplingConfig::greedy(), None);
        let out = gen.generate(&[4, 5], 5, Some(first), &mut sampler).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_empty_prompt_is_an_error() {
        let gen = generator();
        let mut sampler = LogitsSampler::new(&SamplingConfig::greedy(), None);
        assert!(gen.generate(&[], 5, None, &mut sampler).is_err());
    }
}
