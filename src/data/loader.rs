// ============================================================
// Layer 4 — Question Dataset Loader
// ============================================================
// Loads labelled quiz bowl questions from a JSON Lines file.
//
// One JSON object per line, either form is accepted:
//   {"page": "Napoleon", "text": "This emperor lost at Waterloo."}
//   {"page": "Napoleon", "sentences": ["This emperor ...", "He was ..."]}
//
// Blank lines are skipped. A malformed line fails the load with
// its line number, since a silently shorter dataset would shift
// every class id downstream.
//
// Answers seen fewer than `min_appearances` times are dropped
// before anything else sees the data.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::domain::question::TrainingData;
use crate::domain::traits::QuestionSource;

/// Raw record as it appears on one line of the file
#[derive(Debug, Deserialize)]
struct QuestionRecord {
    page: String,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    sentences: Option<Vec<String>>,
}

impl QuestionRecord {
    fn into_fragments(self) -> (Vec<String>, String) {
        let fragments = match (self.sentences, self.text) {
            (Some(s), _) if !s.is_empty() => s,
            (_, Some(t))                  => vec![t],
            _                             => Vec::new(),
        };
        (fragments, self.page)
    }
}

/// Reads a JSON Lines question file.
/// Implements the QuestionSource trait from Layer 3.
pub struct JsonlQuestionLoader {
    path: PathBuf,
}

impl JsonlQuestionLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn read_all(&self) -> Result<Vec<(Vec<String>, String)>> {
        let body = fs::read_to_string(&self.path)
            .with_context(|| format!("Cannot read question file '{}'", self.path.display()))?;

        let mut rows = Vec::new();
        for (line_no, line) in body.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let record: QuestionRecord = serde_json::from_str(line).with_context(|| {
                format!("Malformed question at {}:{}", self.path.display(), line_no + 1)
            })?;
            rows.push(record.into_fragments());
        }
        Ok(rows)
    }
}

impl QuestionSource for JsonlQuestionLoader {
    fn load_training(&self, min_appearances: usize) -> Result<TrainingData> {
        let rows = self.read_all()?;
        let total = rows.len();
        let data = filter_by_appearances(rows, min_appearances);

        tracing::info!(
            "Loaded {} questions from '{}' ({} kept with min_appearances={})",
            total,
            self.path.display(),
            data.len(),
            min_appearances
        );
        Ok(data)
    }
}

/// Keep only questions whose answer occurs at least `min_appearances` times.
pub fn filter_by_appearances(
    rows:            Vec<(Vec<String>, String)>,
    min_appearances: usize,
) -> TrainingData {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for (_, page) in &rows {
        *counts.entry(page.as_str()).or_insert(0) += 1;
    }
    let keep: Vec<bool> = rows
        .iter()
        .map(|(_, page)| counts.get(page.as_str()).copied().unwrap_or(0) >= min_appearances)
        .collect();

    let (questions, answers): (Vec<_>, Vec<_>) = rows
        .into_iter()
        .zip(keep)
        .filter(|(_, k)| *k)
        .map(|(row, _)| row)
        .unzip();
    TrainingData::new(questions, answers)
}
