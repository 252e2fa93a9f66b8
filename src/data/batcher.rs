// ============================================================
// Layer 4 — Sequence Batcher
// ============================================================
// Implements Burn's Batcher trait to stack SequenceSamples into
// tensors.
//
//   Input:  Vec of N samples, each padded to length S
//   Output: SequenceBatch
//             tokens    [N, S]  Int    embedding row ids
//             last_step [N, S]  Float  one-hot of the last real step
//             labels    [N]     Int    class ids
//
// last_step is how padding is masked: the model multiplies its
// per-step hidden states by this one-hot and sums over time, so
// only the state after the final real token reaches the classifier.
// An empty question gets an all-zero row.
//
// Reference: Burn Book §4 (Batcher)

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
    tensor::TensorData,
};

use crate::data::dataset::SequenceSample;

#[derive(Debug, Clone)]
pub struct SequenceBatch<B: Backend> {
    pub tokens:    Tensor<B, 2, Int>,
    pub last_step: Tensor<B, 2>,
    pub labels:    Tensor<B, 1, Int>,
}

#[derive(Clone, Debug)]
pub struct SequenceBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> SequenceBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }
}

/// Row-major one-hot of position `length - 1` per sample
pub fn last_step_mask(lengths: &[usize], seq_len: usize) -> Vec<f32> {
    let mut mask = vec![0.0f32; lengths.len() * seq_len];
    for (row, &len) in lengths.iter().enumerate() {
        if len > 0 && len <= seq_len {
            mask[row * seq_len + len - 1] = 1.0;
        }
    }
    mask
}

impl<B: Backend> Batcher<SequenceSample, SequenceBatch<B>> for SequenceBatcher<B> {
    fn batch(&self, items: Vec<SequenceSample>) -> SequenceBatch<B> {
        let batch_size = items.len();
        let seq_len    = items.first().map(|s| s.token_ids.len()).unwrap_or(0);

        let token_flat: Vec<i64> = items
            .iter()
            .flat_map(|s| s.token_ids.iter().map(|&x| x as i64))
            .collect();
        let lengths: Vec<usize> = items.iter().map(|s| s.length).collect();
        let labels: Vec<i64>    = items.iter().map(|s| s.label as i64).collect();

        let tokens = Tensor::<B, 2, Int>::from_data(
            TensorData::new(token_flat, [batch_size, seq_len]),
            &self.device,
        );
        let last_step = Tensor::<B, 2>::from_data(
            TensorData::new(last_step_mask(&lengths, seq_len), [batch_size, seq_len]),
            &self.device,
        );
        let labels = Tensor::<B, 1, Int>::from_data(
            TensorData::new(labels, [batch_size]),
            &self.device,
        );

        SequenceBatch { tokens, last_step, labels }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    use crate::data::dataset::build_samples;

    #[test]
    fn test_last_step_mask() {
        let m = last_step_mask(&[2, 0, 3], 3);
        assert_eq!(m, vec![0., 1., 0., 0., 0., 0., 0., 0., 1.]);
    }

    #[test]
    fn test_batch_shapes() {
        let samples = build_samples(&[vec![2, 3], vec![4]], &[0, 1], 4);
        let batcher = SequenceBatcher::<NdArray>::new(Default::default());
        let batch   = batcher.batch(samples);
        assert_eq!(batch.tokens.dims(), [2, 4]);
        assert_eq!(batch.last_step.dims(), [2, 4]);
        assert_eq!(batch.labels.dims(), [2]);
    }
}
