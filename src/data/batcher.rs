// ============================================================
// Layer 4 — Causal LM Batcher
// ============================================================
// Implements Burn's Batcher trait to turn a Vec<LmSample> into
// shifted input/target tensors for next-token prediction.
//
// For a sample t0 t1 t2 t3:
//   inputs  = t0 t1 t2
//   targets = t1 t2 t3
//
// Samples have different lengths, so the batch is padded to its
// longest member with the pad token. Padded target positions get
// weight 0 in `target_mask` and are ignored by the loss:
//
//   sample A: t0 t1 t2 t3      inputs  [t0 t1 t2]  mask [1 1 1]
//   sample B: u0 u1            inputs  [u0 P  P ]  mask [1 0 0]
//
// Padding sits on the right, and attention is causal, so real
// tokens never attend to padding.

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::data::dataset::LmSample;

#[derive(Debug, Clone)]
pub struct LmBatch<B: Backend> {
    /// [batch_size, seq_len]
    pub inputs: Tensor<B, 2, Int>,

    /// [batch_size, seq_len] — inputs shifted left by one
    pub targets: Tensor<B, 2, Int>,

    /// [batch_size, seq_len] — 1.0 for real targets, 0.0 for padding
    pub target_mask: Tensor<B, 2>,
}

#[derive(Clone, Debug)]
pub struct LmBatcher<B: Backend> {
    pub device: B::Device,
    pub pad_id: u32,
}

impl<B: Backend> LmBatcher<B> {
    pub fn new(device: B::Device, pad_id: u32) -> Self {
        Self { device, pad_id }
    }
}

impl<B: Backend> Batcher<LmSample, LmBatch<B>> for LmBatcher<B> {
    fn batch(&self, items: Vec<LmSample>) -> LmBatch<B> {
        let batch_size = items.len();
        let seq_len = items
            .iter()
            .map(LmSample::num_targets)
            .max()
            .unwrap_or(0)
            .max(1);

        let pad = self.pad_id as i32;
        let mut inputs  = Vec::with_capacity(batch_size * seq_len);
        let mut targets = Vec::with_capacity(batch_size * seq_len);
        let mut mask    = Vec::with_capacity(batch_size * seq_len);

        for item in &items {
            let ids = &item.token_ids;
            let n   = item.num_targets();
            for pos in 0..seq_len {
                if pos < n {
                    inputs.push(ids[pos] as i32);
                    targets.push(ids[pos + 1] as i32);
                    mask.push(1.0f32);
                } else {
                    inputs.push(pad);
                    targets.push(pad);
                    mask.push(0.0f32);
                }
            }
        }

        let inputs = Tensor::<B, 1, Int>::from_ints(inputs.as_slice(), &self.device)
            .reshape([batch_size, seq_len]);
        let targets = Tensor::<B, 1, Int>::from_ints(targets.as_slice(), &self.device)
            .reshape([batch_size, seq_len]);
        let target_mask = Tensor::<B, 1>::from_floats(mask.as_slice(), &self.device)
            .reshape([batch_size, seq_len]);

        LmBatch { inputs, targets, target_mask }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_shift_and_pad() {
        let batcher = LmBatcher::<TestBackend>::new(Default::default(), 99);
        let batch   = batcher.batch(vec![
            LmSample { token_ids: vec![1, 2, 3, 4] },
            LmSample { token_ids: vec![7, 8] },
        ]);

        assert_eq!(batch.inputs.dims(), [2, 3]);

        let inputs: Vec<i64> = batch.inputs.into_data().convert::<i64>().to_vec().unwrap();
        let targets: Vec<i64> = batch.targets.into_data().convert::<i64>().to_vec().unwrap();
        let mask: Vec<f32> = batch.target_mask.into_data().to_vec().unwrap();

        assert_eq!(inputs,  [1, 2, 3, 7, 99, 99]);
        assert_eq!(targets, [2, 3, 4, 8, 99, 99]);
        assert_eq!(mask,    [1.0, 1.0, 1.0, 1.0, 0.0, 0.0]);
    }
}
