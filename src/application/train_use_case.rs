// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates one training run for either guesser:
//
//   Step 1: Load questions, drop rare answers   (Layer 4 - data)
//   Step 2: Build the guesser with its
//           collaborators (KB file, content dir) (ir / ml)
//   Step 3: Train                               (ir / ml)
//   Step 4: Save every artifact to output_dir   (ir / ml / infra)
//
// Reference: Rust Book §13 (Iterators and Closures)

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::data::loader::JsonlQuestionLoader;
use crate::domain::question::TrainingData;
use crate::domain::traits::{Guesser, QuestionSource};
use crate::ir::content::{DirectoryContentStore, MissingContentPolicy};
use crate::ir::guesser::{IrGuesser, IrGuesserConfig};
use crate::ir::index::DEFAULT_INDEX_NAME;
use crate::ir::knowledge_base::KnowledgeBase;
use crate::ml::guesser::{RnnGuesser, RnnGuesserConfig, RNN_WE};
use crate::ml::model::CellType;
use crate::ml::params::RnnHyperParameters;

// ─── IR Configuration ─────────────────────────────────────────────────────────
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IrConfig {
    pub dataset:         PathBuf,
    pub output_dir:      PathBuf,
    pub min_appearances: usize,
    pub n_cores:         usize,
    /// JSON page → properties file; None treats every answer as non-human
    pub knowledge_base:  Option<PathBuf>,
    /// Directory of <page>.txt reference files; None means no content
    pub content_dir:     Option<PathBuf>,
    pub missing_content: MissingContentPolicy,
    pub index_dir:       PathBuf,
    pub index_name:      String,
}

impl Default for IrConfig {
    fn default() -> Self {
        Self {
            dataset:         PathBuf::from("data/questions.jsonl"),
            output_dir:      PathBuf::from("output/guesser/ir"),
            min_appearances: 1,
            n_cores:         4,
            knowledge_base:  None,
            content_dir:     None,
            missing_content: MissingContentPolicy::default(),
            index_dir:       PathBuf::from("output/index"),
            index_name:      DEFAULT_INDEX_NAME.to_string(),
        }
    }
}

impl IrConfig {
    pub fn guesser_config(&self) -> IrGuesserConfig {
        IrGuesserConfig {
            index_dir:       self.index_dir.clone(),
            index_name:      self.index_name.clone(),
            n_cores:         self.n_cores,
            missing_content: self.missing_content,
        }
    }
}

// ─── RNN Configuration ────────────────────────────────────────────────────────
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RnnConfig {
    pub dataset:       PathBuf,
    pub output_dir:    PathBuf,
    pub rnn_cell:      CellType,
    /// Answer-frequency cutoff for the dataset
    pub min_answers:   usize,
    pub expand_we:     bool,
    /// GloVe-format text vectors
    pub embeddings:    Option<PathBuf>,
    pub embedding_dim: usize,
    pub staging_dir:   PathBuf,
    pub hyper:         RnnHyperParameters,
}

impl Default for RnnConfig {
    fn default() -> Self {
        let guesser = RnnGuesserConfig::default();
        Self {
            dataset:       PathBuf::from("data/questions.jsonl"),
            output_dir:    PathBuf::from("output/guesser/rnn"),
            rnn_cell:      guesser.rnn_cell,
            min_answers:   guesser.min_answers,
            expand_we:     guesser.expand_we,
            embeddings:    None,
            embedding_dim: guesser.embedding_dim,
            staging_dir:   guesser.staging_dir,
            hyper:         guesser.hyper,
        }
    }
}

impl RnnConfig {
    pub fn guesser_config(&self) -> RnnGuesserConfig {
        RnnGuesserConfig {
            rnn_cell:         self.rnn_cell,
            min_answers:      self.min_answers,
            expand_we:        self.expand_we,
            embeddings_path:  self.embeddings.clone(),
            embedding_dim:    self.embedding_dim,
            staging_dir:      self.staging_dir.clone(),
            embedding_target: Some(self.output_dir.join(RNN_WE)),
            hyper:            self.hyper.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TrainConfig {
    Ir(IrConfig),
    Rnn(RnnConfig),
}

/// What a finished run produced
#[derive(Debug, Clone, PartialEq)]
pub struct TrainSummary {
    pub n_questions: usize,
    pub n_answers:   usize,
    pub output_dir:  PathBuf,
    pub artifacts:   Vec<&'static str>,
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<TrainSummary> {
        match &self.config {
            TrainConfig::Ir(cfg)  => self.train_ir(cfg),
            TrainConfig::Rnn(cfg) => self.train_rnn(cfg),
        }
    }

    fn train_ir(&self, cfg: &IrConfig) -> Result<TrainSummary> {
        // ── Step 1: Questions ────────────────────────────────────────────────
        tracing::info!("Loading questions from '{}'", cfg.dataset.display());
        let data = JsonlQuestionLoader::new(&cfg.dataset).load_training(cfg.min_appearances)?;

        // ── Step 2: Guesser + collaborators ──────────────────────────────────
        let mut guesser = IrGuesser::new(cfg.guesser_config());
        if let Some(path) = &cfg.knowledge_base {
            guesser = guesser.with_types(KnowledgeBase::load(path)?);
        } else {
            tracing::warn!("No knowledge base given; every answer is treated as non-human");
        }
        if let Some(dir) = &cfg.content_dir {
            guesser = guesser.with_content(DirectoryContentStore::new(dir));
        }

        // ── Step 3 + 4: Train, save ──────────────────────────────────────────
        guesser.train(&data).context("IR guesser training failed")?;
        guesser.save(&cfg.output_dir)?;

        Ok(summary(&data, &cfg.output_dir, IrGuesser::targets()))
    }

    fn train_rnn(&self, cfg: &RnnConfig) -> Result<TrainSummary> {
        tracing::info!("Loading questions from '{}'", cfg.dataset.display());
        let data = JsonlQuestionLoader::new(&cfg.dataset).load_training(cfg.min_answers)?;

        let mut guesser = RnnGuesser::new(cfg.guesser_config());
        guesser.train(&data).context("RNN guesser training failed")?;
        guesser.save(&cfg.output_dir)?;

        if let Some(best) = guesser.history().and_then(|h| h.best_val_accuracy()) {
            tracing::info!("Best validation accuracy: {:.4}", best);
        }
        Ok(summary(&data, &cfg.output_dir, RnnGuesser::targets()))
    }
}

fn summary(data: &TrainingData, output_dir: &Path, artifacts: Vec<&'static str>) -> TrainSummary {
    let n_answers = data.answers.iter().collect::<BTreeSet<_>>().len();
    TrainSummary {
        n_questions: data.len(),
        n_answers,
        output_dir: output_dir.to_path_buf(),
        artifacts,
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_dataset(dir: &Path) -> PathBuf {
        let path = dir.join("questions.jsonl");
        let mut lines = Vec::new();
        for _ in 0..4 {
            lines.push(r#"{"page": "Napoleon", "text": "This French emperor lost at Waterloo."}"#);
            lines.push(r#"{"page": "Plato", "sentences": ["This Greek philosopher", "wrote the Republic."]}"#);
        }
        lines.push(r#"{"page": "Rare Answer", "text": "seen once"}"#);
        fs::write(&path, lines.join("\n")).unwrap();
        path
    }

    #[test]
    fn test_train_ir_writes_targets() {
        let dir = tempfile::tempdir().unwrap();
        let kb  = dir.path().join("kb.json");
        fs::write(&kb, r#"{"Napoleon": {"instance of": ["Human"]}, "Plato": {"instance of": ["Human"]}}"#).unwrap();

        let cfg = IrConfig {
            dataset:         write_dataset(dir.path()),
            output_dir:      dir.path().join("out"),
            min_appearances: 2,
            n_cores:         2,
            knowledge_base:  Some(kb),
            index_dir:       dir.path().join("index"),
            ..Default::default()
        };
        let summary = TrainUseCase::new(TrainConfig::Ir(cfg)).execute().unwrap();
        assert_eq!(summary.n_questions, 8);
        assert_eq!(summary.n_answers, 2);
        for target in &summary.artifacts {
            assert!(summary.output_dir.join(target).exists(), "{target}");
        }
    }

    #[test]
    fn test_train_rnn_writes_targets() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = RnnConfig {
            dataset:       write_dataset(dir.path()),
            output_dir:    dir.path().join("out"),
            min_answers:   2,
            embedding_dim: 4,
            staging_dir:   dir.path().join("staging"),
            hyper: RnnHyperParameters {
                max_n_epochs: 2,
                batch_size: 4,
                hidden_size: 4,
                validation_fraction: 0.25,
                ..Default::default()
            },
            ..Default::default()
        };
        let summary = TrainUseCase::new(TrainConfig::Rnn(cfg)).execute().unwrap();
        assert_eq!(summary.n_answers, 2);
        for target in &summary.artifacts {
            assert!(summary.output_dir.join(target).exists(), "{target}");
        }
        assert!(summary.output_dir.join(RNN_WE).exists());
    }

    #[test]
    fn test_missing_dataset_fails() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = IrConfig { dataset: dir.path().join("none.jsonl"), ..Default::default() };
        assert!(TrainUseCase::new(TrainConfig::Ir(cfg)).execute().is_err());
    }
}
