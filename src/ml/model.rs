// ============================================================
// Layer 5 — RNN Answer Classifier
// ============================================================
// token ids [batch, seq]
//   → Embedding (initialised from the embedding table)
//   → one recurrent layer: LSTM | GRU | plain tanh RNN
//   → hidden state at the last real step (padding masked out)
//   → Dropout
//   → Linear to n_classes logits
//   → BatchNorm over classes
//   → Dropout
//   → softmax (applied by the loss in training, explicitly at inference)
//
// Burn's Module derive does not give us one "recurrent layer"
// field that can hold three different cell types, so the model
// carries three Options and exactly one of them is Some.

use std::fmt;
use std::str::FromStr;

use burn::{
    module::Param,
    nn::{
        BatchNorm, BatchNormConfig,
        Dropout, DropoutConfig,
        Embedding, EmbeddingConfig,
        gru::{Gru, GruConfig},
        Linear, LinearConfig,
        Lstm, LstmConfig,
    },
    prelude::*,
    tensor::{activation, TensorData},
};
use serde::{Deserialize, Serialize};

use crate::domain::error::GuesserError;
use crate::ml::embeddings::EmbeddingTable;

// ─── Cell family ──────────────────────────────────────────────────────────────
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CellType {
    Lstm,
    Gru,
    SimpleRnn,
}

impl FromStr for CellType {
    type Err = GuesserError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "lstm"       => Ok(Self::Lstm),
            "gru"        => Ok(Self::Gru),
            "simple_rnn" => Ok(Self::SimpleRnn),
            other        => Err(GuesserError::UnsupportedCell(other.to_string())),
        }
    }
}

impl fmt::Display for CellType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Lstm      => "lstm",
            Self::Gru       => "gru",
            Self::SimpleRnn => "simple_rnn",
        };
        f.write_str(name)
    }
}

// ─── Plain recurrent cell ─────────────────────────────────────────────────────
// h_t = tanh(W x_t + U h_{t-1} + b)
#[derive(Module, Debug)]
pub struct SimpleRnn<B: Backend> {
    input:       Linear<B>,
    recurrent:   Linear<B>,
    hidden_size: usize,
}

impl<B: Backend> SimpleRnn<B> {
    pub fn new(d_input: usize, hidden_size: usize, device: &B::Device) -> Self {
        Self {
            input:     LinearConfig::new(d_input, hidden_size).init(device),
            recurrent: LinearConfig::new(hidden_size, hidden_size).with_bias(false).init(device),
            hidden_size,
        }
    }

    /// [batch, seq, d_input] → hidden state at every step [batch, seq, hidden]
    pub fn forward(&self, x: Tensor<B, 3>) -> Tensor<B, 3> {
        let [batch, seq_len, _] = x.dims();
        let projected = self.input.forward(x);
        let mut h = Tensor::<B, 2>::zeros([batch, self.hidden_size], &projected.device());

        let mut states = Vec::with_capacity(seq_len);
        for t in 0..seq_len {
            let x_t = projected
                .clone()
                .slice([0..batch, t..t + 1, 0..self.hidden_size])
                .reshape([batch, self.hidden_size]);
            h = activation::tanh(x_t + self.recurrent.forward(h));
            states.push(h.clone().reshape([batch, 1, self.hidden_size]));
        }
        Tensor::cat(states, 1)
    }
}

// ─── Model config ─────────────────────────────────────────────────────────────
// #[derive(Config)] already generates Clone and Serialize/Deserialize.
#[derive(Config, Debug)]
pub struct RnnClassifierConfig {
    pub cell:          CellType,
    pub vocab_size:    usize,
    pub embedding_dim: usize,
    pub hidden_size:   usize,
    pub n_classes:     usize,
    #[config(default = 0.5)]
    pub dropout:       f64,
}

impl RnnClassifierConfig {
    /// Fresh model with randomly initialised embeddings
    pub fn init<B: Backend>(&self, device: &B::Device) -> RnnClassifier<B> {
        let (lstm, gru, simple) = match self.cell {
            CellType::Lstm => (
                Some(LstmConfig::new(self.embedding_dim, self.hidden_size, true).init(device)),
                None,
                None,
            ),
            CellType::Gru => (
                None,
                Some(GruConfig::new(self.embedding_dim, self.hidden_size, true).init(device)),
                None,
            ),
            CellType::SimpleRnn => (
                None,
                None,
                Some(SimpleRnn::new(self.embedding_dim, self.hidden_size, device)),
            ),
        };

        RnnClassifier {
            embedding: EmbeddingConfig::new(self.vocab_size, self.embedding_dim).init(device),
            lstm,
            gru,
            simple,
            output:    LinearConfig::new(self.hidden_size, self.n_classes).init(device),
            norm:      BatchNormConfig::new(self.n_classes).init(device),
            dropout:   DropoutConfig::new(self.dropout).init(),
            n_classes: self.n_classes,
        }
    }

    /// Model whose embedding layer starts from `table`
    pub fn init_with_embeddings<B: Backend>(
        &self,
        table:  &EmbeddingTable,
        device: &B::Device,
    ) -> RnnClassifier<B> {
        let mut model = self.init(device);
        let weights = Tensor::<B, 2>::from_data(
            TensorData::new(table.values.clone(), [table.n_rows, table.dim]),
            device,
        );
        model.embedding.weight = Param::from_tensor(weights);
        model
    }
}

// ─── Model ────────────────────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct RnnClassifier<B: Backend> {
    pub embedding: Embedding<B>,
    pub lstm:      Option<Lstm<B>>,
    pub gru:       Option<Gru<B>>,
    pub simple:    Option<SimpleRnn<B>>,
    pub output:    Linear<B>,
    pub norm:      BatchNorm<B, 1>,
    pub dropout:   Dropout,
    pub n_classes: usize,
}

impl<B: Backend> RnnClassifier<B> {
    /// The single recurrent layer present, if exactly one is
    pub fn cell(&self) -> Option<CellType> {
        match (&self.lstm, &self.gru, &self.simple) {
            (Some(_), None, None) => Some(CellType::Lstm),
            (None, Some(_), None) => Some(CellType::Gru),
            (None, None, Some(_)) => Some(CellType::SimpleRnn),
            _                     => None,
        }
    }

    fn recurrent(&self, x: Tensor<B, 3>) -> Result<Tensor<B, 3>, GuesserError> {
        match (&self.lstm, &self.gru, &self.simple) {
            (Some(lstm), None, None) => Ok(lstm.forward(x, None).0),
            (None, Some(gru), None)  => Ok(gru.forward(x, None)),
            (None, None, Some(rnn))  => Ok(rnn.forward(x)),
            _ => Err(GuesserError::MissingRecurrentLayer("single".to_string())),
        }
    }

    /// tokens [batch, seq], last_step [batch, seq] → logits [batch, n_classes]
    pub fn forward(
        &self,
        tokens:    Tensor<B, 2, Int>,
        last_step: Tensor<B, 2>,
    ) -> Result<Tensor<B, 2>, GuesserError> {
        let [batch, seq_len] = tokens.dims();

        let embedded = self.embedding.forward(tokens);
        let states   = self.recurrent(embedded)?;
        let hidden   = states.dims()[2];

        // Keep only the state after the last real token
        let mask    = last_step.reshape([batch, seq_len, 1]).expand(Shape::new([batch, seq_len, hidden]));
        let summary = (states * mask).sum_dim(1).reshape([batch, hidden]);

        let x      = self.dropout.forward(summary);
        let logits = self.output.forward(x);
        let logits = self
            .norm
            .forward(logits.reshape([batch, self.n_classes, 1]))
            .reshape([batch, self.n_classes]);
        Ok(self.dropout.forward(logits))
    }

    /// Class probabilities [batch, n_classes]
    pub fn forward_proba(
        &self,
        tokens:    Tensor<B, 2, Int>,
        last_step: Tensor<B, 2>,
    ) -> Result<Tensor<B, 2>, GuesserError> {
        Ok(activation::softmax(self.forward(tokens, last_step)?, 1))
    }
}
