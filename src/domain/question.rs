// ============================================================
// Layer 3 — TrainingData Domain Type
// ============================================================
// A training run sees questions as lists of text fragments
// (the sentences revealed so far) paired with one answer label.
//
// Example:
//   questions[0] = ["This emperor lost at Waterloo.", "He was exiled to Elba."]
//   answers[0]   = "Napoleon"

use serde::{Deserialize, Serialize};

/// Parallel vectors of questions and their answer labels.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrainingData {
    pub questions: Vec<Vec<String>>,
    pub answers:   Vec<String>,
}

impl TrainingData {
    pub fn new(questions: Vec<Vec<String>>, answers: Vec<String>) -> Self {
        debug_assert_eq!(questions.len(), answers.len());
        Self { questions, answers }
    }

    pub fn len(&self) -> usize {
        self.answers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.answers.is_empty()
    }

    /// Iterate over (fragments, answer) pairs
    pub fn iter(&self) -> impl Iterator<Item = (&[String], &str)> {
        self.questions
            .iter()
            .zip(self.answers.iter())
            .map(|(q, a)| (q.as_slice(), a.as_str()))
    }

    /// The full text of question `i`: all fragments joined by a space
    pub fn full_text(&self, i: usize) -> String {
        self.questions[i].join(" ")
    }
}
