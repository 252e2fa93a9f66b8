use burn::data::dataset::Dataset;
use serde::{Deserialize, Serialize};

use crate::data::encoder::{effective_length, pad_or_truncate, PAD_INDEX};

/// One encoded, padded example.
/// `token_ids` is always exactly max_len long; `length` counts the
/// real tokens at its front.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SequenceSample {
    pub token_ids: Vec<u32>,
    pub length:    usize,
    pub label:     usize,
}

/// Pad every encoded sequence and pair it with its label
pub fn build_samples(encoded: &[Vec<u32>], labels: &[usize], max_len: usize) -> Vec<SequenceSample> {
    pad_or_truncate(encoded, max_len, PAD_INDEX)
        .into_iter()
        .zip(encoded.iter())
        .zip(labels.iter())
        .map(|((token_ids, raw), &label)| SequenceSample {
            length: effective_length(raw, max_len),
            token_ids,
            label,
        })
        .collect()
}

pub struct SequenceDataset {
    samples: Vec<SequenceSample>,
}

impl SequenceDataset {
    pub fn new(samples: Vec<SequenceSample>) -> Self { Self { samples } }
}

impl Dataset<SequenceSample> for SequenceDataset {
    fn get(&self, index: usize) -> Option<SequenceSample> {
        self.samples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_samples_tracks_length() {
        let samples = build_samples(&[vec![4, 5, 6], vec![7]], &[1, 0], 2);
        assert_eq!(samples[0].token_ids, vec![4, 5]);
        assert_eq!(samples[0].length, 2);
        assert_eq!(samples[1].token_ids, vec![7, PAD_INDEX]);
        assert_eq!(samples[1].length, 1);
        assert_eq!(samples[1].label, 0);
    }

    #[test]
    fn test_dataset_get() {
        let ds = SequenceDataset::new(build_samples(&[vec![2]], &[0], 3));
        assert_eq!(ds.len(), 1);
        assert!(ds.get(0).is_some());
        assert!(ds.get(1).is_none());
    }
}
