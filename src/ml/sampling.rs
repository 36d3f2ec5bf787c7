// ============================================================
// Layer 5 — Logits Processing and Sampling
// ============================================================
// Turns one row of next-token logits into a token id. The
// processors run in a fixed order:
//
//   1. repetition penalty over every token already in the
//      sequence (negative logits × p, positive logits ÷ p)
//   2. temperature
//   3. top-k
//   4. top-p (nucleus): smallest prefix of the sorted
//      distribution whose mass reaches p, never empty
//   5. draw from the renormalised distribution
//
// Temperature ≤ 0 switches to greedy argmax (after the
// repetition penalty). All randomness comes from one StdRng,
// so a fixed seed gives a fixed continuation.

use anyhow::{anyhow, Result};
use rand::{distributions::WeightedIndex, prelude::*, rngs::StdRng};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SamplingConfig {
    pub temperature:        f64,
    pub top_k:              usize,
    pub top_p:              f64,
    pub repetition_penalty: f32,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self { temperature: 0.7, top_k: 50, top_p: 0.92, repetition_penalty: 1.3 }
    }
}

#[cfg(test)]
impl SamplingConfig {
    pub fn greedy() -> Self {
        Self { temperature: 0.0, ..Self::default() }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Sampling {
    ArgMax,
    TopKThenTopP { k: usize, p: f64, temperature: f64 },
}

impl From<&SamplingConfig> for Sampling {
    fn from(cfg: &SamplingConfig) -> Self {
        if cfg.temperature <= 0.0 {
            Sampling::ArgMax
        } else {
            Sampling::TopKThenTopP { k: cfg.top_k, p: cfg.top_p, temperature: cfg.temperature }
        }
    }
}

pub struct LogitsSampler {
    sampling:           Sampling,
    repetition_penalty: f32,
    rng:                StdRng,
}

impl LogitsSampler {
    /// `seed = None` draws the seed from the OS
    pub fn new(cfg: &SamplingConfig, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None       => StdRng::from_entropy(),
        };
        Self { sampling: Sampling::from(cfg), repetition_penalty: cfg.repetition_penalty, rng }
    }

    pub fn sampling(&self) -> &Sampling {
        &self.sampling
    }

    /// Pick the next token from `logits` given the ids generated so far
    pub fn next_token(&mut self, mut logits: Vec<f32>, history: &[u32]) -> Result<u32> {
        apply_repetition_penalty(&mut logits, history, self.repetition_penalty);

        match self.sampling.clone() {
            Sampling::ArgMax => argmax(&logits),
            Sampling::TopKThenTopP { k, p, temperature } => {
                let mut probs = softmax(&logits, temperature);
                keep_top_k(&mut probs, k);
                keep_top_p(&mut probs, p);
                let dist = WeightedIndex::new(&probs)
                    .map_err(|e| anyhow!("Cannot sample from logits: {e}"))?;
                Ok(dist.sample(&mut self.rng) as u32)
            }
        }
    }
}

pub fn apply_repetition_penalty(logits: &mut [f32], history: &[u32], penalty: f32) {
    if penalty == 1.0 {
        return;
    }
    let mut seen = history.to_vec();
    seen.sort_unstable();
    seen.dedup();
    for id in seen {
        if let Some(logit) = logits.get_mut(id as usize) {
            *logit = if *logit < 0.0 { *logit * penalty } else { *logit / penalty };
        }
    }
}

pub fn argmax(logits: &[f32]) -> Result<u32> {
    logits
        .iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| a.total_cmp(b))
        .map(|(i, _)| i as u32)
        .ok_or_else(|| anyhow!("Empty logits"))
}

/// Probabilities of `logits / temperature`
pub fn softmax(logits: &[f32], temperature: f64) -> Vec<f32> {
    let t = temperature as f32;
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exp: Vec<f32> = logits.iter().map(|&l| ((l - max) / t).exp()).collect();
    let sum: f32 = exp.iter().sum();
    exp.into_iter().map(|e| e / sum).collect()
}

/// Indices sorted by descending probability
fn ranked(probs: &[f32]) -> Vec<usize> {
    let mut idx: Vec<usize> = (0..probs.len()).collect();
    idx.sort_by(|&a, &b| probs[b].total_cmp(&probs[a]));
    idx
}

/// Zero every probability below the `k`-th largest; ties with it are kept.
/// `k = 0` disables the filter.
pub fn keep_top_k(probs: &mut [f32], k: usize) {
    if k == 0 || k >= probs.len() {
        return;
    }
    let threshold = probs[ranked(probs)[k - 1]];
    for p in probs.iter_mut().filter(|p| **p < threshold) {
        *p = 0.0;
    }
}

/// Zero the tail once the cumulative mass of the kept tokens reaches `p`.
pub fn keep_top_p(probs: &mut [f32], p: f64) {
    if p >= 1.0 {
        return;
    }
    let total: f32 = probs.iter().sum();
    let mut cumulative = 0.0f64;
    for (rank, i) in ranked(probs).into_iter().enumerate() {
        if rank > 0 && cumulative >= p {
            probs[i] = 0.0;
        } else {
            cumulative += (probs[i] / total) as f64;
        }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
