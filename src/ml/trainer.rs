// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Train + validation loop using Burn's DataLoader and Adam,
// with early stopping on validation accuracy.
//
//   - Training runs on TrainBackend (Autodiff<NdArray>)
//   - model.valid() gives the same model on InferBackend (NdArray),
//     where dropout is off and batch norm uses running statistics
//   - Loss is sparse categorical cross-entropy: integer class ids
//     in, log-softmax applied inside the loss
//
// Early stopping: the best validation accuracy so far is tracked;
// after `max_patience` consecutive epochs without a strict
// improvement, training ends. The weights from the final epoch
// are the ones returned.
//
// Reference: Burn Book §5, Kingma & Ba (2015) Adam

use anyhow::{bail, Result};
use burn::{
    data::dataloader::DataLoaderBuilder,
    module::AutodiffModule,
    nn::loss::CrossEntropyLossConfig,
    optim::{AdamConfig, GradientsParams, Optimizer},
    prelude::*,
};

use crate::data::{
    batcher::SequenceBatcher,
    dataset::{SequenceDataset, SequenceSample},
};
use crate::infra::metrics::{EpochMetrics, TrainingHistory};
use crate::ml::embeddings::EmbeddingTable;
use crate::ml::model::{RnnClassifier, RnnClassifierConfig};
use crate::ml::params::RnnHyperParameters;

pub type TrainBackend = burn::backend::Autodiff<burn::backend::NdArray>;
pub type InferBackend = burn::backend::NdArray;

/// Patience counter over validation accuracy.
///
/// Stops on the `patience`-th consecutive epoch without a strict
/// improvement: with patience 2 and a best at epoch 1, training ends
/// after epoch 3. Patience 0 stops on the first non-improving epoch.
#[derive(Debug, Clone)]
pub struct EarlyStopping {
    patience: usize,
    best:     f64,
    wait:     usize,
}

impl EarlyStopping {
    pub fn new(patience: usize) -> Self {
        Self { patience, best: f64::NEG_INFINITY, wait: 0 }
    }

    /// Record this epoch's metrics; true means stop now
    pub fn should_stop(&mut self, metrics: &EpochMetrics) -> bool {
        if metrics.is_improvement(self.best) {
            self.best = metrics.val_accuracy;
            self.wait = 0;
            false
        } else {
            self.wait += 1;
            self.wait >= self.patience
        }
    }

    pub fn best(&self) -> f64 {
        self.best
    }
}

pub struct TrainOutcome {
    pub model:   RnnClassifier<InferBackend>,
    pub history: TrainingHistory,
}

/// Number of rows whose argmax equals the label
fn count_correct<B: Backend>(logits: Tensor<B, 2>, labels: Tensor<B, 1, Int>) -> usize {
    let predicted = logits.argmax(1).flatten::<1>(0, 1);
    predicted.equal(labels).int().sum().into_scalar().elem::<i64>() as usize
}

fn ratio(num: f64, den: usize) -> f64 {
    if den > 0 { num / den as f64 } else { 0.0 }
}

pub fn run_training(
    model_cfg:  &RnnClassifierConfig,
    embeddings: &EmbeddingTable,
    hyper:      &RnnHyperParameters,
    train:      Vec<SequenceSample>,
    val:        Vec<SequenceSample>,
) -> Result<TrainOutcome> {
    if train.is_empty() {
        bail!("No training examples left after preprocessing");
    }
    if val.is_empty() {
        tracing::warn!("Validation split is empty; early stopping will see accuracy 0.0");
    }

    let device = burn::backend::ndarray::NdArrayDevice::default();
    TrainBackend::seed(hyper.seed);

    // ── Build model ───────────────────────────────────────────────────────────
    let mut model: RnnClassifier<TrainBackend> = model_cfg.init_with_embeddings(embeddings, &device);
    tracing::info!(
        "Model ready: {} cell, hidden={}, classes={}, vocab rows={}",
        model_cfg.cell,
        model_cfg.hidden_size,
        model_cfg.n_classes,
        model_cfg.vocab_size
    );

    // ── Adam with default hyperparameters ─────────────────────────────────────
    let mut optim = AdamConfig::new().init();

    let n_train = train.len();
    let n_val   = val.len();

    let train_loader = DataLoaderBuilder::new(SequenceBatcher::<TrainBackend>::new(device.clone()))
        .batch_size(hyper.batch_size)
        .shuffle(hyper.seed)
        .num_workers(1)
        .build(SequenceDataset::new(train));

    let val_loader = DataLoaderBuilder::new(SequenceBatcher::<InferBackend>::new(device.clone()))
        .batch_size(hyper.batch_size)
        .num_workers(1)
        .build(SequenceDataset::new(val));

    let mut history = TrainingHistory::default();
    let mut stopper = EarlyStopping::new(hyper.max_patience);

    // ── Epoch loop ────────────────────────────────────────────────────────────
    for epoch in 1..=hyper.max_n_epochs {
        let mut train_loss_sum = 0.0f64;
        let mut train_batches  = 0usize;
        let mut train_correct  = 0usize;

        for batch in train_loader.iter() {
            let logits = model.forward(batch.tokens, batch.last_step)?;
            let loss = CrossEntropyLossConfig::new()
                .init(&logits.device())
                .forward(logits.clone(), batch.labels.clone());

            train_loss_sum += loss.clone().into_scalar().elem::<f64>();
            train_batches  += 1;
            train_correct  += count_correct(logits, batch.labels);

            let grads = loss.backward();
            let grads = GradientsParams::from_grads(grads, &model);
            model = optim.step(hyper.learning_rate, model, grads);
        }

        // ── Validation phase ──────────────────────────────────────────────────
        let model_valid = model.valid();

        let mut val_loss_sum = 0.0f64;
        let mut val_batches  = 0usize;
        let mut val_correct  = 0usize;

        for batch in val_loader.iter() {
            let logits = model_valid.forward(batch.tokens, batch.last_step)?;
            let loss = CrossEntropyLossConfig::new()
                .init(&logits.device())
                .forward(logits.clone(), batch.labels.clone());

            val_loss_sum += loss.into_scalar().elem::<f64>();
            val_batches  += 1;
            val_correct  += count_correct(logits, batch.labels);
        }

        let metrics = EpochMetrics::new(
            epoch,
            ratio(train_loss_sum, train_batches),
            ratio(train_correct as f64, n_train),
            if val_batches > 0 { val_loss_sum / val_batches as f64 } else { f64::NAN },
            ratio(val_correct as f64, n_val),
        );

        tracing::info!(
            "Epoch {:>3}/{} | loss={:.4} acc={:.3} | val_loss={:.4} val_acc={:.3}",
            epoch,
            hyper.max_n_epochs,
            metrics.train_loss,
            metrics.train_accuracy,
            metrics.val_loss,
            metrics.val_accuracy,
        );

        let stop = stopper.should_stop(&metrics);
        history.push(metrics);
        if stop {
            tracing::info!(
                "Early stopping after epoch {}: no val_accuracy gain over {:.4} for {} epochs",
                epoch,
                stopper.best(),
                hyper.max_patience
            );
            history.stopped_early = true;
            break;
        }
    }

    tracing::info!("Training complete after {} epochs", history.len());
    Ok(TrainOutcome { model: model.valid(), history })
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::dataset::build_samples;
    use crate::ml::model::CellType;

    fn val_acc(epoch: usize, val_accuracy: f64) -> EpochMetrics {
        EpochMetrics::new(epoch, 1.0, 0.5, 1.0, val_accuracy)
    }

    #[test]
    fn test_early_stopping_patience() {
        let mut s = EarlyStopping::new(2);
        assert!(!s.should_stop(&val_acc(1, 0.5)));
        assert!(!s.should_stop(&val_acc(2, 0.4)));
        // a strict improvement resets the counter
        assert!(!s.should_stop(&val_acc(3, 0.6)));
        assert!(!s.should_stop(&val_acc(4, 0.6)));
        assert!(s.should_stop(&val_acc(5, 0.6)));
        assert_eq!(s.best(), 0.6);
    }

    #[test]
    fn test_zero_patience_stops_on_first_plateau() {
        let mut s = EarlyStopping::new(0);
        assert!(!s.should_stop(&val_acc(1, 0.1)));
        assert!(s.should_stop(&val_acc(2, 0.1)));
    }

    fn tiny_hyper(max_n_epochs: usize, max_patience: usize) -> RnnHyperParameters {
        RnnHyperParameters {
            max_n_epochs,
            batch_size: 4,
            max_patience,
            hidden_size: 8,
            dropout: 0.0,
            learning_rate: 0.05,
            ..Default::default()
        }
    }

    fn table(rows: usize, dim: usize) -> EmbeddingTable {
        let mut values = vec![0.0; dim];
        values.extend((dim..rows * dim).map(|i| ((i % 7) as f32 - 3.0) / 3.0));
        EmbeddingTable { dim, n_rows: rows, values }
    }

    #[test]
    fn test_history_has_one_row_per_epoch() {
        let train = build_samples(&[vec![2, 3], vec![4, 5], vec![2], vec![5]], &[0, 1, 0, 1], 2);
        let val   = build_samples(&[vec![2, 3], vec![4, 5]], &[0, 1], 2);
        let cfg   = RnnClassifierConfig::new(CellType::Lstm, 6, 4, 8, 2).with_dropout(0.0);

        let outcome = run_training(&cfg, &table(6, 4), &tiny_hyper(3, 10), train, val).unwrap();
        assert_eq!(outcome.history.len(), 3);
        assert!(!outcome.history.stopped_early);
        for m in &outcome.history.epochs {
            assert!(m.train_loss.is_finite());
            assert!((0.0..=1.0).contains(&m.val_accuracy));
        }
    }

    #[test]
    fn test_empty_validation_stops_early() {
        let train = build_samples(&[vec![2], vec![3]], &[0, 1], 1);
        let cfg   = RnnClassifierConfig::new(CellType::SimpleRnn, 6, 4, 8, 2).with_dropout(0.0);

        let outcome = run_training(&cfg, &table(6, 4), &tiny_hyper(20, 2), train, Vec::new()).unwrap();
        // epoch 1 sets the best (0.0), epochs 2 and 3 exhaust patience
        assert_eq!(outcome.history.len(), 3);
        assert!(outcome.history.stopped_early);
    }

    #[test]
    fn test_no_training_examples_is_an_error() {
        let cfg = RnnClassifierConfig::new(CellType::Gru, 6, 4, 8, 2);
        assert!(run_training(&cfg, &table(6, 4), &tiny_hyper(1, 1), Vec::new(), Vec::new()).is_err());
    }
}
