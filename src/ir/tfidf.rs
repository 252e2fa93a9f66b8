// ============================================================
// IR — TF-IDF Vectoriser
// ============================================================
// Turns question text into l2-normalised sparse TF-IDF vectors
// over word unigrams and bigrams.
//
//   tokens  : lowercase, regex (?u)\b\w\w+\b
//   terms   : every unigram and every adjacent-token bigram
//   min_df  : terms in fewer than `min_df` documents are dropped
//   idf     : ln((1 + n) / (1 + df)) + 1
//   weight  : raw term count × idf, then l2 normalised
//
// Feature ids follow the sorted term order, so fitting the same
// corpus twice yields identical vectors.

use std::collections::{BTreeMap, BTreeSet};

use regex::Regex;
use serde::{Deserialize, Serialize};

pub const TOKEN_PATTERN: &str = r"(?u)\b\w\w+\b";

/// Sparse vector as `(feature id, value)` pairs sorted by id
pub type SparseVector = Vec<(usize, f64)>;

/// Serialisable part of a fitted vectoriser
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TfidfVocabulary {
    pub min_df:     usize,
    pub vocabulary: BTreeMap<String, usize>,
    pub idf:        Vec<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "TfidfVocabulary", into = "TfidfVocabulary")]
pub struct TfidfVectorizer {
    fitted: TfidfVocabulary,
    token:  Regex,
}

impl TryFrom<TfidfVocabulary> for TfidfVectorizer {
    type Error = String;

    fn try_from(fitted: TfidfVocabulary) -> Result<Self, Self::Error> {
        if fitted.idf.len() != fitted.vocabulary.len() {
            return Err(format!(
                "idf has {} entries for {} terms",
                fitted.idf.len(),
                fitted.vocabulary.len()
            ));
        }
        if fitted.vocabulary.values().any(|&i| i >= fitted.idf.len()) {
            return Err("term id out of range".to_string());
        }
        let token = Regex::new(TOKEN_PATTERN).map_err(|e| e.to_string())?;
        Ok(Self { fitted, token })
    }
}

impl From<TfidfVectorizer> for TfidfVocabulary {
    fn from(v: TfidfVectorizer) -> Self {
        v.fitted
    }
}

impl TfidfVectorizer {
    /// Learn vocabulary and idf weights from `documents`
    pub fn fit<S: AsRef<str>>(documents: &[S], min_df: usize) -> Result<Self, regex::Error> {
        let token = Regex::new(TOKEN_PATTERN)?;

        let mut df: BTreeMap<String, usize> = BTreeMap::new();
        for doc in documents {
            let distinct: BTreeSet<String> = analyze(&token, doc.as_ref()).into_iter().collect();
            for term in distinct {
                *df.entry(term).or_insert(0) += 1;
            }
        }

        let n = documents.len() as f64;
        let kept: Vec<(String, usize)> = df.into_iter().filter(|(_, d)| *d >= min_df).collect();

        let mut vocabulary = BTreeMap::new();
        let mut idf        = Vec::with_capacity(kept.len());
        for (i, (term, d)) in kept.into_iter().enumerate() {
            idf.push(((1.0 + n) / (1.0 + d as f64)).ln() + 1.0);
            vocabulary.insert(term, i);
        }

        tracing::debug!("TF-IDF vocabulary: {} terms from {} documents", vocabulary.len(), documents.len());
        Ok(Self { fitted: TfidfVocabulary { min_df, vocabulary, idf }, token })
    }

    pub fn n_features(&self) -> usize {
        self.fitted.idf.len()
    }

    pub fn transform(&self, text: &str) -> SparseVector {
        let mut counts: BTreeMap<usize, f64> = BTreeMap::new();
        for term in analyze(&self.token, text) {
            if let Some(&id) = self.fitted.vocabulary.get(&term) {
                *counts.entry(id).or_insert(0.0) += 1.0;
            }
        }

        let mut vector: SparseVector = counts
            .into_iter()
            .map(|(id, tf)| (id, tf * self.fitted.idf[id]))
            .collect();

        let norm = vector.iter().map(|(_, v)| v * v).sum::<f64>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|(_, v)| *v /= norm);
        }
        vector
    }
}

/// Unigrams then bigrams of the lowercased token stream
fn analyze(token: &Regex, text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    let words: Vec<&str> = token.find_iter(&lowered).map(|m| m.as_str()).collect();

    let mut terms: Vec<String> = words.iter().map(|w| w.to_string()).collect();
    terms.extend(words.windows(2).map(|pair| format!("{} {}", pair[0], pair[1])));
    terms
}
