// ============================================================
// Layer 5 — Inferencer
// ============================================================
// Runs a trained RnnClassifier over encoded questions and
// decodes the top-k classes per question into Guesses.
//
// Batches are built in input order (no shuffling, no DataLoader)
// so row i of the output always belongs to question i.
//
// Top-k ordering: probability descending, ties broken by lower
// class id first.

use std::cmp::Ordering;

use burn::data::dataloader::batcher::Batcher;
use burn::prelude::*;

use crate::data::batcher::SequenceBatcher;
use crate::data::class_map::ClassMaps;
use crate::data::dataset::SequenceSample;
use crate::domain::answer::Guess;
use crate::domain::error::GuesserError;
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::model::{RnnClassifier, RnnClassifierConfig};
use crate::ml::params::RnnParameters;
use crate::ml::trainer::InferBackend;

pub struct Inferencer {
    model:      RnnClassifier<InferBackend>,
    device:     burn::backend::ndarray::NdArrayDevice,
    batch_size: usize,
}

impl Inferencer {
    pub fn new(model: RnnClassifier<InferBackend>, batch_size: usize) -> Self {
        Self { model, device: Default::default(), batch_size: batch_size.max(1) }
    }

    /// Network config implied by a parameter blob
    pub fn model_config(params: &RnnParameters) -> RnnClassifierConfig {
        RnnClassifierConfig::new(
            params.rnn_cell,
            params.embeddings.n_rows,
            params.embeddings.dim,
            params.hyper.hidden_size,
            params.n_classes,
        )
        .with_dropout(params.hyper.dropout)
    }

    /// Rebuild the network from `params` and load its weights.
    /// Weights whose recurrent layer is not `params.rnn_cell` are corrupt.
    pub fn from_checkpoint(
        ckpt:   &CheckpointManager,
        params: &RnnParameters,
    ) -> Result<Self, GuesserError> {
        let device = Default::default();
        let model: RnnClassifier<InferBackend> = Self::model_config(params).init(&device);
        let model = ckpt.load_model(model, &device)?;
        if model.cell() != Some(params.rnn_cell) {
            return Err(GuesserError::artifact_corrupt(
                ckpt.weights_path(),
                GuesserError::MissingRecurrentLayer(params.rnn_cell.to_string()),
            ));
        }
        Ok(Self::new(model, params.hyper.batch_size))
    }

    pub fn model(&self) -> &RnnClassifier<InferBackend> {
        &self.model
    }

    /// Class probability vector per sample, in input order
    pub fn predict_proba(&self, samples: Vec<SequenceSample>) -> Result<Vec<Vec<f32>>, GuesserError> {
        let batcher   = SequenceBatcher::<InferBackend>::new(self.device.clone());
        let n_classes = self.model.n_classes;
        let mut rows  = Vec::with_capacity(samples.len());

        for chunk in samples.chunks(self.batch_size) {
            let batch = batcher.batch(chunk.to_vec());
            let probs = self.model.forward_proba(batch.tokens, batch.last_step)?;
            let flat: Vec<f32> = probs
                .into_data()
                .convert::<f32>()
                .to_vec()
                .map_err(|e| GuesserError::Inference(format!("{e:?}")))?;
            rows.extend(split_rows(&flat, n_classes, chunk.len())?);
        }
        Ok(rows)
    }
}

/// Cut a flat [n_rows * n_classes] buffer into rows
fn split_rows(flat: &[f32], n_classes: usize, n_rows: usize) -> Result<Vec<Vec<f32>>, GuesserError> {
    if n_classes == 0 || flat.len() != n_rows * n_classes {
        return Err(GuesserError::Inference(format!(
            "expected {n_rows} rows of {n_classes} probabilities, got {} values",
            flat.len()
        )));
    }
    Ok(flat.chunks(n_classes).map(<[f32]>::to_vec).collect())
}

/// The `k` most probable classes as Guesses
pub fn top_k(probs: &[f32], k: usize, classes: &ClassMaps) -> Vec<Guess> {
    let mut order: Vec<usize> = (0..probs.len()).collect();
    order.sort_by(|&a, &b| match probs[b].total_cmp(&probs[a]) {
        Ordering::Equal => a.cmp(&b),
        other           => other,
    });
    order
        .into_iter()
        .take(k)
        .filter_map(|i| classes.page_of(i).map(|page| Guess::new(page, probs[i] as f64)))
        .collect()
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::dataset::build_samples;
    use crate::ml::model::CellType;

    fn classes() -> ClassMaps {
        // Napoleon = 0, Plato = 1
        ClassMaps::from_labels(&["Plato", "Napoleon"])
    }

    #[test]
    fn test_top_one() {
        let guesses = top_k(&[0.3, 0.7], 1, &classes());
        assert_eq!(guesses.len(), 1);
        assert_eq!(guesses[0].page, "Plato");
        assert!((guesses[0].score - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_ties_break_by_class_id() {
        let guesses = top_k(&[0.5, 0.5], 2, &classes());
        assert_eq!(guesses[0].page, "Napoleon");
        assert_eq!(guesses[1].page, "Plato");
    }

    #[test]
    fn test_k_larger_than_classes() {
        assert_eq!(top_k(&[0.3, 0.7], 10, &classes()).len(), 2);
        assert!(top_k(&[0.3, 0.7], 0, &classes()).is_empty());
    }

    #[test]
    fn test_predict_proba_keeps_order_across_batches() {
        let device = Default::default();
        let model: RnnClassifier<InferBackend> =
            RnnClassifierConfig::new(CellType::Lstm, 6, 4, 5, 3).init(&device);
        let samples = build_samples(&[vec![2], vec![3, 4], vec![5]], &[0, 0, 0], 3);

        let batched = Inferencer::new(model.clone(), 2).predict_proba(samples.clone()).unwrap();
        let single  = Inferencer::new(model, 1).predict_proba(samples).unwrap();
        assert_eq!(batched.len(), 3);
        for (a, b) in batched.iter().zip(single.iter()) {
            assert_eq!(a.len(), 3);
            for (x, y) in a.iter().zip(b.iter()) {
                assert!((x - y).abs() < 1e-5);
            }
        }
    }

    #[test]
    fn test_short_output_is_an_error() {
        assert_eq!(split_rows(&[0.1, 0.9, 0.4, 0.6], 2, 2).unwrap().len(), 2);
        assert!(matches!(split_rows(&[], 2, 3), Err(GuesserError::Inference(_))));
        assert!(matches!(split_rows(&[0.5, 0.5, 1.0], 2, 2), Err(GuesserError::Inference(_))));
    }
}
