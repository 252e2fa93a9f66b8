// ============================================================
// Layer 4 — Question Preprocessor
// ============================================================
// Two jobs:
//
//   1. Tokenise question text the same way at train and guess
//      time. Uses the HuggingFace `tokenizers` BERT normaliser
//      (clean control chars, strip accents, lowercase) and the
//      BERT pre-tokenizer (split on whitespace and punctuation),
//      then drops the pure-punctuation pieces.
//
//        "Napoleon's army, at Waterloo!" → ["napoleon", "s", "army", "at", "waterloo"]
//
//   2. preprocess_dataset: turn TrainingData into the tokenised
//      train/validation examples, class maps and vocabulary the
//      RNN trainer consumes.
//
// The split is over whole questions, then each question expands
// to one example per fragment (or one example of the joined text
// with `full_question`). Splitting before expanding keeps
// fragments of one question out of both sets.

use std::collections::BTreeSet;

use anyhow::Result;
use tokenizers::normalizers::bert::BertNormalizer;
use tokenizers::pre_tokenizers::bert::BertPreTokenizer;
use tokenizers::{
    NormalizedString, Normalizer, OffsetReferential, OffsetType, PreTokenizedString, PreTokenizer,
};

use crate::data::class_map::ClassMaps;
use crate::data::splitter::split_train_val;
use crate::domain::question::TrainingData;

/// Tokeniser shared by training and inference
#[derive(Clone)]
pub struct Preprocessor {
    normalizer:    BertNormalizer,
    pre_tokenizer: BertPreTokenizer,
}

impl Preprocessor {
    pub fn new() -> Self {
        Self {
            // clean_text, handle_chinese_chars, strip_accents (follow lowercase), lowercase
            normalizer:    BertNormalizer::new(true, true, None, true),
            pre_tokenizer: BertPreTokenizer,
        }
    }

    /// Lowercased word tokens of `text`, punctuation removed
    pub fn tokenize(&self, text: &str) -> Result<Vec<String>> {
        let mut normalized = NormalizedString::from(text);
        self.normalizer
            .normalize(&mut normalized)
            .map_err(|e| anyhow::anyhow!("Normalisation error: {e}"))?;

        let mut pre = PreTokenizedString::from(normalized);
        self.pre_tokenizer
            .pre_tokenize(&mut pre)
            .map_err(|e| anyhow::anyhow!("Pre-tokenisation error: {e}"))?;

        Ok(pre
            .get_splits(OffsetReferential::Original, OffsetType::Byte)
            .into_iter()
            .map(|(piece, _, _)| piece)
            .filter(|piece| piece.chars().any(char::is_alphanumeric))
            .map(str::to_string)
            .collect())
    }
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self::new()
    }
}

/// Knobs for preprocess_dataset
#[derive(Debug, Clone, Copy)]
pub struct PreprocessOptions {
    pub train_fraction: f64,
    pub seed:           u64,
    pub full_question:  bool,
}

impl Default for PreprocessOptions {
    fn default() -> Self {
        Self { train_fraction: 0.9, seed: 42, full_question: false }
    }
}

/// Tokenised, labelled examples ready for encoding
#[derive(Debug, Clone)]
pub struct PreprocessedData {
    pub x_train:    Vec<Vec<String>>,
    pub y_train:    Vec<usize>,
    pub x_val:      Vec<Vec<String>>,
    pub y_val:      Vec<usize>,
    pub vocab:      BTreeSet<String>,
    pub class_maps: ClassMaps,
}

impl PreprocessedData {
    /// Longest tokenised training example (at least 1)
    pub fn max_len(&self) -> usize {
        self.x_train.iter().map(Vec::len).max().unwrap_or(0).max(1)
    }
}

pub fn preprocess_dataset(
    data:         &TrainingData,
    preprocessor: &Preprocessor,
    options:      PreprocessOptions,
) -> Result<PreprocessedData> {
    let class_maps = ClassMaps::from_labels(&data.answers);

    let indices: Vec<usize> = (0..data.len()).collect();
    let (train_idx, val_idx) = split_train_val(indices, options.train_fraction, options.seed);

    let (x_train, y_train) = expand_examples(data, &train_idx, &class_maps, preprocessor, options)?;
    let (x_val, y_val)     = expand_examples(data, &val_idx, &class_maps, preprocessor, options)?;

    let vocab: BTreeSet<String> = x_train.iter().flatten().cloned().collect();

    tracing::info!(
        "Preprocessed {} train / {} validation examples, {} classes, vocab {}",
        x_train.len(),
        x_val.len(),
        class_maps.n_classes(),
        vocab.len()
    );

    Ok(PreprocessedData { x_train, y_train, x_val, y_val, vocab, class_maps })
}

fn expand_examples(
    data:         &TrainingData,
    indices:      &[usize],
    class_maps:   &ClassMaps,
    preprocessor: &Preprocessor,
    options:      PreprocessOptions,
) -> Result<(Vec<Vec<String>>, Vec<usize>)> {
    let mut xs = Vec::new();
    let mut ys = Vec::new();

    for &i in indices {
        let Some(label) = class_maps.class_of(&data.answers[i]) else {
            continue;
        };
        let texts: Vec<String> = if options.full_question {
            vec![data.full_text(i)]
        } else {
            data.questions[i].clone()
        };
        for text in texts {
            let tokens = preprocessor.tokenize(&text)?;
            if tokens.is_empty() {
                continue;
            }
            xs.push(tokens);
            ys.push(label);
        }
    }
    Ok((xs, ys))
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_lowercases_and_drops_punctuation() {
        let p = Preprocessor::new();
        let tokens = p.tokenize("Napoleon's army, at Waterloo!").unwrap();
        assert_eq!(tokens, vec!["napoleon", "s", "army", "at", "waterloo"]);
    }

    #[test]
    fn test_tokenize_strips_accents() {
        let p = Preprocessor::new();
        assert_eq!(p.tokenize("Émile Zola").unwrap(), vec!["emile", "zola"]);
    }

    #[test]
    fn test_tokenize_empty() {
        let p = Preprocessor::new();
        assert!(p.tokenize("  ?! ").unwrap().is_empty());
    }

    fn sample() -> TrainingData {
        TrainingData::new(
            vec![
                vec!["french emperor".into(), "lost at waterloo".into()],
                vec!["greek philosopher".into()],
                vec!["wrote the republic".into()],
                vec!["exiled to elba".into()],
            ],
            vec!["Napoleon".into(), "Plato".into(), "Plato".into(), "Napoleon".into()],
        )
    }

    #[test]
    fn test_preprocess_expands_fragments() {
        let opts = PreprocessOptions { train_fraction: 1.0, ..Default::default() };
        let out  = preprocess_dataset(&sample(), &Preprocessor::new(), opts).unwrap();
        assert_eq!(out.x_train.len(), 5);
        assert_eq!(out.x_train.len(), out.y_train.len());
        assert!(out.x_val.is_empty());
        assert_eq!(out.class_maps.n_classes(), 2);
        assert!(out.vocab.contains("waterloo"));
        assert_eq!(out.max_len(), 3);
    }

    #[test]
    fn test_preprocess_full_question() {
        let opts = PreprocessOptions { train_fraction: 1.0, full_question: true, ..Default::default() };
        let out  = preprocess_dataset(&sample(), &Preprocessor::new(), opts).unwrap();
        assert_eq!(out.x_train.len(), 4);
        assert_eq!(out.max_len(), 5);
    }

    #[test]
    fn test_vocab_only_from_training_split() {
        let opts = PreprocessOptions { train_fraction: 0.5, ..Default::default() };
        let out  = preprocess_dataset(&sample(), &Preprocessor::new(), opts).unwrap();
        let train_tokens: BTreeSet<String> = out.x_train.iter().flatten().cloned().collect();
        assert_eq!(out.vocab, train_tokens);
    }
}
