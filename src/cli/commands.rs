// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
//   qanta-guess train ir  [flags]
//   qanta-guess train rnn [flags]
//   qanta-guess guess ir  --question ... [--question ...] --max-guesses k
//   qanta-guess guess rnn --question ... --max-guesses k
//
// Reference: Rust Book §12 (Building a CLI Program)

use std::path::PathBuf;

use clap::{Args, Subcommand};

use crate::application::train_use_case::{IrConfig, RnnConfig};
use crate::ir::content::MissingContentPolicy;
use crate::ir::guesser::IrGuesserConfig;
use crate::ir::index::DEFAULT_INDEX_NAME;
use crate::ml::model::CellType;
use crate::ml::params::RnnHyperParameters;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train a guesser and save its artifacts
    Train {
        #[command(subcommand)]
        guesser: TrainTarget,
    },

    /// Load a trained guesser and rank answers for questions
    Guess {
        #[command(subcommand)]
        guesser: GuessTarget,
    },
}

#[derive(Subcommand, Debug)]
pub enum TrainTarget {
    /// Retrieval guesser gated by a human classifier
    Ir(TrainIrArgs),
    /// Recurrent answer classifier
    Rnn(TrainRnnArgs),
}

#[derive(Subcommand, Debug)]
pub enum GuessTarget {
    Ir(GuessIrArgs),
    Rnn(GuessArgs),
}

// ─── Shared flags ────────────────────────────────────────────────────────────
#[derive(Args, Debug, Clone)]
pub struct IndexArgs {
    /// Directory holding the answer index
    #[arg(long, default_value = "output/index")]
    pub index_dir: PathBuf,

    #[arg(long, default_value = DEFAULT_INDEX_NAME)]
    pub index_name: String,

    /// Worker threads for per-question search
    #[arg(long, default_value_t = 4)]
    pub n_cores: usize,
}

#[derive(Args, Debug)]
pub struct GuessArgs {
    /// Question text; repeat for several questions
    #[arg(long = "question", required = true)]
    pub questions: Vec<String>,

    #[arg(long, default_value_t = 10)]
    pub max_guesses: usize,

    /// Directory the guesser was saved to
    #[arg(long)]
    pub model_dir: PathBuf,
}

// ─── train ir ────────────────────────────────────────────────────────────────
#[derive(Args, Debug)]
pub struct TrainIrArgs {
    /// JSON Lines question file
    #[arg(long, default_value = "data/questions.jsonl")]
    pub dataset: PathBuf,

    #[arg(long, default_value = "output/guesser/ir")]
    pub output_dir: PathBuf,

    /// Drop answers seen fewer times than this
    #[arg(long, default_value_t = 1)]
    pub min_appearances: usize,

    /// Knowledge-base JSON with "instance of" types per page
    #[arg(long)]
    pub knowledge_base: Option<PathBuf>,

    /// Directory of <page>.txt reference content
    #[arg(long)]
    pub content_dir: Option<PathBuf>,

    /// empty | skip | fail
    #[arg(long, default_value = "empty")]
    pub missing_content: MissingContentPolicy,

    #[command(flatten)]
    pub index: IndexArgs,
}

impl From<TrainIrArgs> for IrConfig {
    fn from(a: TrainIrArgs) -> Self {
        IrConfig {
            dataset:         a.dataset,
            output_dir:      a.output_dir,
            min_appearances: a.min_appearances,
            n_cores:         a.index.n_cores,
            knowledge_base:  a.knowledge_base,
            content_dir:     a.content_dir,
            missing_content: a.missing_content,
            index_dir:       a.index.index_dir,
            index_name:      a.index.index_name,
        }
    }
}

// ─── train rnn ───────────────────────────────────────────────────────────────
#[derive(Args, Debug)]
pub struct TrainRnnArgs {
    #[arg(long, default_value = "data/questions.jsonl")]
    pub dataset: PathBuf,

    #[arg(long, default_value = "output/guesser/rnn")]
    pub output_dir: PathBuf,

    /// lstm | gru | simple_rnn
    #[arg(long, default_value = "lstm")]
    pub rnn_cell: CellType,

    /// Drop answers seen fewer times than this
    #[arg(long, default_value_t = 1)]
    pub min_answers: usize,

    /// Give random vectors to words missing from the pretrained file
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub expand_we: bool,

    /// GloVe-format word vectors
    #[arg(long)]
    pub embeddings: Option<PathBuf>,

    /// Vector width when no embeddings file is given
    #[arg(long, default_value_t = 300)]
    pub embedding_dim: usize,

    #[arg(long, default_value_os_t = std::env::temp_dir().join("qanta").join("deep"))]
    pub staging_dir: PathBuf,

    #[arg(long, default_value_t = 100)]
    pub max_n_epochs: usize,

    #[arg(long, default_value_t = 128)]
    pub batch_size: usize,

    /// Epochs without validation-accuracy gain before stopping
    #[arg(long, default_value_t = 5)]
    pub max_patience: usize,

    #[arg(long, default_value_t = 300)]
    pub hidden_size: usize,

    #[arg(long, default_value_t = 0.5)]
    pub dropout: f64,

    #[arg(long, default_value_t = 1e-3)]
    pub lr: f64,

    #[arg(long, default_value_t = 0.1)]
    pub validation_fraction: f64,

    /// Train on whole questions instead of one example per sentence
    #[arg(long)]
    pub full_question: bool,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

impl From<TrainRnnArgs> for RnnConfig {
    fn from(a: TrainRnnArgs) -> Self {
        RnnConfig {
            dataset:       a.dataset,
            output_dir:    a.output_dir,
            rnn_cell:      a.rnn_cell,
            min_answers:   a.min_answers,
            expand_we:     a.expand_we,
            embeddings:    a.embeddings,
            embedding_dim: a.embedding_dim,
            staging_dir:   a.staging_dir,
            hyper: RnnHyperParameters {
                max_n_epochs:        a.max_n_epochs,
                batch_size:          a.batch_size,
                max_patience:        a.max_patience,
                hidden_size:         a.hidden_size,
                dropout:             a.dropout,
                learning_rate:       a.lr,
                validation_fraction: a.validation_fraction,
                full_question:       a.full_question,
                seed:                a.seed,
            },
        }
    }
}

// ─── guess ir ────────────────────────────────────────────────────────────────
#[derive(Args, Debug)]
pub struct GuessIrArgs {
    #[command(flatten)]
    pub guess: GuessArgs,

    #[command(flatten)]
    pub index: IndexArgs,
}

impl From<IndexArgs> for IrGuesserConfig {
    fn from(a: IndexArgs) -> Self {
        IrGuesserConfig {
            index_dir:  a.index_dir,
            index_name: a.index_name,
            n_cores:    a.n_cores,
            ..Default::default()
        }
    }
}
