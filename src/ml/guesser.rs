// ============================================================
// Layer 5 — RNN Guesser
// ============================================================
// Sequence classifier from question text straight to a
// probability over the answer vocabulary.
//
// train:
//   preprocess → embeddings (cached) → encode + pad → build model
//   → train with early stopping → stage weights + history
// guess:
//   tokenise → encode + pad with the TRAINING max_len → forward
//   → top-k classes per question
// save:
//   promote staged weights, write rnn_params.json, copy the
//   embedding cache and history next to them
// load:
//   strict rnn_params.json, rebuild network, load weights

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::data::dataset::{build_samples, SequenceSample};
use crate::data::encoder::encode;
use crate::data::preprocessor::{preprocess_dataset, PreprocessOptions, Preprocessor};
use crate::domain::answer::Guess;
use crate::domain::error::GuesserError;
use crate::domain::question::TrainingData;
use crate::domain::traits::Guesser;
use crate::infra::artifacts::{read_json, write_json};
use crate::infra::checkpoint::{CheckpointManager, RNN_MODEL_TARGET};
use crate::infra::metrics::{MetricsLogger, TrainingHistory};
use crate::ml::embeddings::{EmbeddingCache, EmbeddingSource};
use crate::ml::inferencer::{top_k, Inferencer};
use crate::ml::model::CellType;
use crate::ml::params::{RnnHyperParameters, RnnParameters, RNN_PARAMS_TARGET, RNN_PARAMS_VERSION};
use crate::ml::trainer::run_training;

pub const RNN_WE: &str = "rnn_we.json";
pub const RNN_HISTORY: &str = "rnn_history.csv";

/// Settings for an RNN training run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RnnGuesserConfig {
    pub rnn_cell:         CellType,
    pub min_answers:      usize,
    pub expand_we:        bool,
    /// GloVe-format text file; None means all-random vectors
    pub embeddings_path:  Option<PathBuf>,
    /// Vector width used when there is no pretrained file
    pub embedding_dim:    usize,
    /// Where weights, history and the embedding cache are staged
    pub staging_dir:      PathBuf,
    /// Second embedding-cache location, usually the output directory
    pub embedding_target: Option<PathBuf>,
    pub hyper:            RnnHyperParameters,
}

impl Default for RnnGuesserConfig {
    fn default() -> Self {
        Self {
            rnn_cell:         CellType::Lstm,
            min_answers:      1,
            expand_we:        true,
            embeddings_path:  None,
            embedding_dim:    300,
            staging_dir:      std::env::temp_dir().join("qanta").join("deep"),
            embedding_target: None,
            hyper:            RnnHyperParameters::default(),
        }
    }
}

struct TrainedRnn {
    params:     RnnParameters,
    inferencer: Inferencer,
    /// Weights and history are waiting in staging_dir
    staged:     bool,
}

pub struct RnnGuesser {
    config:       RnnGuesserConfig,
    preprocessor: Preprocessor,
    state:        Option<TrainedRnn>,
    history:      Option<TrainingHistory>,
}

impl RnnGuesser {
    pub fn new(config: RnnGuesserConfig) -> Self {
        Self { config, preprocessor: Preprocessor::new(), state: None, history: None }
    }

    /// Per-epoch metrics of the last `train` call
    pub fn history(&self) -> Option<&TrainingHistory> {
        self.history.as_ref()
    }

    fn embedding_cache(&self) -> EmbeddingCache {
        let cache = EmbeddingCache::new(self.config.staging_dir.join(RNN_WE));
        match &self.config.embedding_target {
            Some(target) => cache.with_target(target.clone()),
            None         => cache,
        }
    }

    fn encode_questions(&self, params: &RnnParameters, questions: &[String]) -> Result<Vec<SequenceSample>> {
        let mut encoded = Vec::with_capacity(questions.len());
        for q in questions {
            let tokens = self.preprocessor.tokenize(q)?;
            encoded.push(encode(&tokens, &params.embedding_lookup));
        }
        let labels = vec![0; encoded.len()];
        Ok(build_samples(&encoded, &labels, params.max_len))
    }

    /// Load a guesser saved by `save`
    pub fn load(directory: &Path) -> Result<Self> {
        let params_path = directory.join(RNN_PARAMS_TARGET);
        let params: RnnParameters = read_json(&params_path)?;
        params
            .validate()
            .map_err(|e| GuesserError::artifact_corrupt(&params_path, e))?;

        let inferencer = Inferencer::from_checkpoint(&CheckpointManager::new(directory), &params)?;

        let config = RnnGuesserConfig {
            rnn_cell:    params.rnn_cell,
            min_answers: params.min_answers,
            expand_we:   params.expand_we,
            embedding_dim: params.embeddings.dim,
            hyper:       params.hyper.clone(),
            ..RnnGuesserConfig::default()
        };
        tracing::info!(
            "Loaded RNN guesser ({} cell, {} classes) from '{}'",
            params.rnn_cell,
            params.n_classes,
            directory.display()
        );

        let mut guesser = Self::new(config);
        guesser.state = Some(TrainedRnn { params, inferencer, staged: false });
        Ok(guesser)
    }
}

impl Guesser for RnnGuesser {
    fn targets() -> Vec<&'static str> {
        vec![RNN_PARAMS_TARGET]
    }

    fn train(&mut self, data: &TrainingData) -> Result<()> {
        let cfg   = &self.config;
        let hyper = &cfg.hyper;

        // ── Step 1: Tokenise, split, class maps, vocab ───────────────────────
        tracing::info!("Preprocessing training data...");
        let options = PreprocessOptions {
            train_fraction: 1.0 - hyper.validation_fraction,
            seed:           hyper.seed,
            full_question:  hyper.full_question,
        };
        let pre = preprocess_dataset(data, &self.preprocessor, options)?;

        // ── Step 2: Embedding table + lookup ─────────────────────────────────
        tracing::info!("Creating embeddings...");
        let source = match &cfg.embeddings_path {
            Some(path) => EmbeddingSource::glove(path)?,
            None       => EmbeddingSource::random(cfg.embedding_dim),
        };
        let (embeddings, lookup) =
            self.embedding_cache().load_or_build(&pre.vocab, cfg.expand_we, hyper.seed, &source)?;

        // ── Step 3: Encode + pad ─────────────────────────────────────────────
        tracing::info!("Converting dataset to embedding indices...");
        let max_len   = pre.max_len();
        let n_classes = pre.class_maps.n_classes();
        let enc = |xs: &[Vec<String>]| -> Vec<Vec<u32>> {
            xs.iter().map(|q| encode(q, &lookup)).collect()
        };
        let train = build_samples(&enc(&pre.x_train), &pre.y_train, max_len);
        let val   = build_samples(&enc(&pre.x_val), &pre.y_val, max_len);

        let params = RnnParameters {
            format_version:   RNN_PARAMS_VERSION,
            rnn_cell:         cfg.rnn_cell,
            min_answers:      cfg.min_answers,
            expand_we:        cfg.expand_we,
            embeddings,
            embedding_lookup: lookup.clone(),
            max_len,
            class_maps:       pre.class_maps.clone(),
            vocab:            pre.vocab.clone(),
            n_classes,
            hyper:            hyper.clone(),
        };
        params.validate()?;

        // ── Step 4: Build + train ────────────────────────────────────────────
        tracing::info!("Training model...");
        let model_cfg = Inferencer::model_config(&params);
        let outcome   = run_training(&model_cfg, &params.embeddings, hyper, train, val)?;

        // ── Step 5: Stage weights and history ────────────────────────────────
        tracing::info!("Saving model to staging '{}'", cfg.staging_dir.display());
        CheckpointManager::new(&cfg.staging_dir).save_model(&outcome.model)?;
        MetricsLogger::new(cfg.staging_dir.join(RNN_HISTORY)).write(&outcome.history)?;
        tracing::info!("Model training history: {:?}", outcome.history.series(|m| m.val_accuracy));

        self.history = Some(outcome.history);
        self.state = Some(TrainedRnn {
            inferencer: Inferencer::new(outcome.model, hyper.batch_size),
            params,
            staged: true,
        });
        Ok(())
    }

    fn guess(&self, questions: &[String], max_n_guesses: usize) -> Result<Vec<Vec<Guess>>> {
        let state = self.state.as_ref().ok_or(GuesserError::ModelNotInitialized)?;
        tracing::info!(
            "Generating {} guesses for each of {} questions",
            max_n_guesses,
            questions.len()
        );

        let samples = self.encode_questions(&state.params, questions)?;
        let probs   = state.inferencer.predict_proba(samples)?;

        Ok(probs
            .iter()
            .map(|row| top_k(row, max_n_guesses, &state.params.class_maps))
            .collect())
    }

    fn save(&self, directory: &Path) -> Result<()> {
        let state = self.state.as_ref().ok_or(GuesserError::ModelNotInitialized)?;
        fs::create_dir_all(directory)
            .with_context(|| format!("Cannot create '{}'", directory.display()))?;

        let staging = CheckpointManager::new(&self.config.staging_dir);
        if state.staged && staging.weights_path().exists() {
            staging.promote_to(directory)?;
        } else {
            CheckpointManager::new(directory).save_model(state.inferencer.model())?;
        }

        write_json(&directory.join(RNN_PARAMS_TARGET), &state.params)?;

        if state.staged {
            self.embedding_cache().promote_to(&directory.join(RNN_WE))?;
            let history = self.config.staging_dir.join(RNN_HISTORY);
            if history.exists() {
                fs::copy(&history, directory.join(RNN_HISTORY))?;
            }
        }

        tracing::info!(
            "Saved RNN guesser ({}.mpk.gz + {}) to '{}'",
            RNN_MODEL_TARGET,
            RNN_PARAMS_TARGET,
            directory.display()
        );
        Ok(())
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn data() -> TrainingData {
        let mut questions = Vec::new();
        let mut answers   = Vec::new();
        for _ in 0..6 {
            questions.push(vec!["french emperor lost at waterloo".to_string()]);
            answers.push("Napoleon".to_string());
            questions.push(vec!["greek philosopher wrote the republic".to_string()]);
            answers.push("Plato".to_string());
        }
        TrainingData::new(questions, answers)
    }

    fn config(staging: &Path, cell: CellType) -> RnnGuesserConfig {
        RnnGuesserConfig {
            rnn_cell: cell,
            embedding_dim: 8,
            staging_dir: staging.to_path_buf(),
            hyper: RnnHyperParameters {
                max_n_epochs: 4,
                batch_size: 4,
                max_patience: 10,
                hidden_size: 8,
                dropout: 0.0,
                learning_rate: 0.05,
                validation_fraction: 0.25,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_guess_before_train_fails_fast() {
        let staging = tempfile::tempdir().unwrap();
        let g = RnnGuesser::new(config(staging.path(), CellType::Lstm));
        let err = g.guess(&["anything".into()], 3).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<GuesserError>(),
            Some(GuesserError::ModelNotInitialized)
        ));
    }

    #[test]
    fn test_train_guess_shape() {
        let staging = tempfile::tempdir().unwrap();
        let mut g = RnnGuesser::new(config(staging.path(), CellType::Gru));
        g.train(&data()).unwrap();

        assert_eq!(g.history().unwrap().len(), 4);
        let questions = vec!["french emperor".to_string(), "".to_string(), "greek".to_string()];
        let guesses = g.guess(&questions, 1).unwrap();
        assert_eq!(guesses.len(), 3);
        for list in &guesses {
            assert_eq!(list.len(), 1);
            assert!(list[0].page == "Napoleon" || list[0].page == "Plato");
            assert!((0.0..=1.0).contains(&list[0].score));
        }

        let all = g.guess(&questions[..1], 5).unwrap();
        assert_eq!(all[0].len(), 2);
        assert!(all[0][0].score >= all[0][1].score);
    }

    #[test]
    fn test_save_load_round_trip() {
        let staging = tempfile::tempdir().unwrap();
        let out     = tempfile::tempdir().unwrap();
        let mut g = RnnGuesser::new(config(staging.path(), CellType::SimpleRnn));
        g.train(&data()).unwrap();
        g.save(out.path()).unwrap();

        assert!(out.path().join(RNN_PARAMS_TARGET).exists());
        assert!(out.path().join(format!("{RNN_MODEL_TARGET}.mpk.gz")).exists());
        assert!(out.path().join(RNN_HISTORY).exists());

        let loaded = RnnGuesser::load(out.path()).unwrap();
        let questions = vec!["french emperor waterloo".to_string(), "greek republic".to_string()];
        let before = g.guess(&questions, 2).unwrap();
        let after  = loaded.guess(&questions, 2).unwrap();
        for (a, b) in before.iter().zip(after.iter()) {
            for (x, y) in a.iter().zip(b.iter()) {
                assert_eq!(x.page, y.page);
                assert!((x.score - y.score).abs() < 1e-5);
            }
        }
    }

    #[test]
    fn test_load_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let err = RnnGuesser::load(dir.path()).err().unwrap();
        assert!(matches!(
            err.downcast_ref::<GuesserError>(),
            Some(GuesserError::ArtifactMissing { .. })
        ));
    }

    #[test]
    fn test_load_rejects_invalid_params() {
        let staging = tempfile::tempdir().unwrap();
        let out     = tempfile::tempdir().unwrap();
        let mut g = RnnGuesser::new(config(staging.path(), CellType::Lstm));
        g.train(&data()).unwrap();
        g.save(out.path()).unwrap();

        let path = out.path().join(RNN_PARAMS_TARGET);
        let mut json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        json["n_classes"] = serde_json::json!(7);
        fs::write(&path, json.to_string()).unwrap();

        let err = RnnGuesser::load(out.path()).err().unwrap();
        assert!(matches!(
            err.downcast_ref::<GuesserError>(),
            Some(GuesserError::ArtifactCorrupt { .. })
        ));
    }

    #[test]
    fn test_load_rejects_weights_of_another_cell() {
        let staging = tempfile::tempdir().unwrap();
        let out     = tempfile::tempdir().unwrap();
        let mut g = RnnGuesser::new(config(staging.path(), CellType::Lstm));
        g.train(&data()).unwrap();
        g.save(out.path()).unwrap();

        let path = out.path().join(RNN_PARAMS_TARGET);
        let mut json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        json["rnn_cell"] = serde_json::json!("gru");
        fs::write(&path, json.to_string()).unwrap();

        let err = RnnGuesser::load(out.path()).err().unwrap();
        assert!(matches!(
            err.downcast_ref::<GuesserError>(),
            Some(GuesserError::ArtifactCorrupt { .. })
        ));
    }
}
