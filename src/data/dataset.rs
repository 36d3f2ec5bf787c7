use anyhow::Result;
use burn::data::dataset::Dataset;
use serde::{Deserialize, Serialize};
use tokenizers::Tokenizer;

/// One tokenised chunk. Unpadded: the batcher pads per batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LmSample {
    pub token_ids: Vec<u32>,
}

impl LmSample {
    /// Number of next-token predictions this sample contributes
    pub fn num_targets(&self) -> usize {
        self.token_ids.len().saturating_sub(1)
    }
}

pub struct LmDataset {
    samples: Vec<LmSample>,
}

impl LmDataset {
    #[cfg(test)]
    pub fn new(samples: Vec<LmSample>) -> Self { Self { samples } }

    /// Tokenise every text without special tokens, truncating to `max_length`.
    /// Texts shorter than two tokens carry no next-token target and are skipped.
    pub fn from_texts<'a>(
        texts:      impl IntoIterator<Item = &'a str>,
        tokenizer:  &Tokenizer,
        max_length: usize,
    ) -> Result<Self> {
        let mut samples = Vec::new();
        let mut skipped = 0usize;

        for text in texts {
            let enc = tokenizer
                .encode(text, false)
                .map_err(|e| anyhow::anyhow!("Tokenisation error: {e}"))?;
            let mut token_ids = enc.get_ids().to_vec();
            token_ids.truncate(max_length);

            if token_ids.len() < 2 {
                skipped += 1;
                continue;
            }
            samples.push(LmSample { token_ids });
        }

        if skipped > 0 {
            tracing::warn!("Skipped {} chunks shorter than two tokens", skipped);
        }
        Ok(Self { samples })
    }

    pub fn sample_count(&self) -> usize { self.samples.len() }

    pub fn token_count(&self) -> usize {
        self.samples.iter().map(|s| s.token_ids.len()).sum()
    }
}

impl Dataset<LmSample> for LmDataset {
    fn get(&self, index: usize) -> Option<LmSample> {
        self.samples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}
