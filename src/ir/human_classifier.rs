// ============================================================
// IR — Human / Non-Human Classifier
// ============================================================
// Predicts whether the answer to a question is a person.
//
//   fit     : TF-IDF (1-2 grams, min_df 2) → ridge (alpha 1)
//   predict : text → bool, deterministic
//   save    : <dir>/is_human_model.json as { version, model }

use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::domain::error::GuesserError;
use crate::infra::artifacts::{read_json, write_json};
use crate::ir::ridge::RidgeClassifier;
use crate::ir::tfidf::TfidfVectorizer;

pub const IS_HUMAN_MODEL_TARGET: &str = "is_human_model.json";
pub const HUMAN_MODEL_VERSION: u32 = 1;

const MIN_DF: usize = 2;
const ALPHA: f64 = 1.0;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HumanClassifier {
    vectorizer: TfidfVectorizer,
    ridge:      RidgeClassifier,
}

#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct Envelope<M> {
    version: u32,
    model:   M,
}

impl HumanClassifier {
    pub fn fit<S: AsRef<str>>(texts: &[S], labels: &[bool]) -> Result<Self> {
        if texts.len() != labels.len() {
            bail!("{} texts but {} labels", texts.len(), labels.len());
        }
        if texts.is_empty() {
            bail!("Cannot fit the human classifier without training questions");
        }

        let vectorizer = TfidfVectorizer::fit(texts, MIN_DF).context("Invalid token pattern")?;
        let rows: Vec<_> = texts.iter().map(|t| vectorizer.transform(t.as_ref())).collect();
        let ridge = RidgeClassifier::fit(&rows, labels, vectorizer.n_features(), ALPHA);

        let n_human = labels.iter().filter(|&&l| l).count();
        tracing::info!(
            "Fitted human classifier: {} questions ({} human), {} features",
            texts.len(),
            n_human,
            vectorizer.n_features()
        );
        Ok(Self { vectorizer, ridge })
    }

    pub fn decision_function(&self, text: &str) -> f64 {
        self.ridge.decision_function(&self.vectorizer.transform(text))
    }

    pub fn predict(&self, text: &str) -> bool {
        self.decision_function(text) > 0.0
    }

    pub fn save(&self, directory: &Path) -> Result<()> {
        let envelope = Envelope { version: HUMAN_MODEL_VERSION, model: self };
        write_json(&directory.join(IS_HUMAN_MODEL_TARGET), &envelope)
    }

    pub fn load(directory: &Path) -> Result<Self, GuesserError> {
        let path = directory.join(IS_HUMAN_MODEL_TARGET);
        let envelope: Envelope<HumanClassifier> = read_json(&path)?;
        if envelope.version != HUMAN_MODEL_VERSION {
            return Err(GuesserError::artifact_corrupt(
                &path,
                format!("unsupported version {}", envelope.version),
            ));
        }
        let model = envelope.model;
        if model.ridge.weights.len() != model.vectorizer.n_features() {
            return Err(GuesserError::artifact_corrupt(&path, "weight count does not match vocabulary"));
        }
        Ok(model)
    }
}
