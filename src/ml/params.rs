// ============================================================
// Layer 5 — RNN Parameters
// ============================================================
// Everything, apart from the weights, that the RNN guesser needs
// to rebuild its network and encode questions identically to
// training time.
//
// Persisted as rnn_params.json. Loading is strict:
//   - unknown or missing fields are rejected (serde)
//   - format_version must match
//   - validate() checks the cross-field invariants
//
// A params file that deserialises but fails validate() is
// reported as ArtifactCorrupt by the caller.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::data::class_map::ClassMaps;
use crate::data::encoder::{EmbeddingLookup, PAD_INDEX};
use crate::domain::error::GuesserError;
use crate::ml::embeddings::{EmbeddingTable, PAD_TOKEN};
use crate::ml::model::CellType;

pub const RNN_PARAMS_TARGET: &str = "rnn_params.json";
pub const RNN_PARAMS_VERSION: u32 = 1;

/// Training hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RnnHyperParameters {
    pub max_n_epochs:        usize,
    pub batch_size:          usize,
    pub max_patience:        usize,
    pub hidden_size:         usize,
    pub dropout:             f64,
    pub learning_rate:       f64,
    pub validation_fraction: f64,
    pub full_question:       bool,
    pub seed:                u64,
}

impl Default for RnnHyperParameters {
    fn default() -> Self {
        Self {
            max_n_epochs:        100,
            batch_size:          128,
            max_patience:        5,
            hidden_size:         300,
            dropout:             0.5,
            learning_rate:       1e-3,
            validation_fraction: 0.1,
            full_question:       false,
            seed:                42,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RnnParameters {
    pub format_version:   u32,
    pub rnn_cell:         CellType,
    pub min_answers:      usize,
    pub expand_we:        bool,
    pub embeddings:       EmbeddingTable,
    pub embedding_lookup: EmbeddingLookup,
    pub max_len:          usize,
    pub class_maps:       ClassMaps,
    pub vocab:            BTreeSet<String>,
    pub n_classes:        usize,
    pub hyper:            RnnHyperParameters,
}

impl RnnParameters {
    pub fn validate(&self) -> Result<(), GuesserError> {
        let fail = |msg: String| Err(GuesserError::invalid_parameters(msg));

        if self.format_version != RNN_PARAMS_VERSION {
            return fail(format!(
                "format_version {} (expected {RNN_PARAMS_VERSION})",
                self.format_version
            ));
        }
        if self.max_len == 0 {
            return fail("max_len must be positive".into());
        }
        if self.embeddings.dim == 0 {
            return fail("embedding_dim must be positive".into());
        }
        if self.hyper.hidden_size == 0 {
            return fail("hidden_size must be positive".into());
        }
        if !self.embeddings.is_consistent() || self.embeddings.n_rows < 2 {
            return fail(format!(
                "embedding table has {} values for {} rows of dim {}",
                self.embeddings.values.len(),
                self.embeddings.n_rows,
                self.embeddings.dim
            ));
        }
        if self.embeddings.row(PAD_INDEX as usize).iter().any(|v| *v != 0.0) {
            return fail("embedding row 0 must be the zero padding vector".into());
        }
        for (token, &row) in &self.embedding_lookup {
            if row as usize >= self.embeddings.n_rows {
                return fail(format!("lookup '{token}' → row {row} is out of range"));
            }
            if row == PAD_INDEX && token != PAD_TOKEN {
                return fail(format!("lookup '{token}' uses the reserved padding row"));
            }
        }
        self.class_maps.validate()?;
        if self.class_maps.n_classes() != self.n_classes {
            return fail(format!(
                "n_classes {} disagrees with {} mapped classes",
                self.n_classes,
                self.class_maps.n_classes()
            ));
        }
        if self.hyper.batch_size == 0 {
            return fail("batch_size must be positive".into());
        }
        Ok(())
    }
}
