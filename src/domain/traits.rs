// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The seams between the guessers and their collaborators.
//
//   - QuestionSource → where training questions come from
//                      (JSON Lines file, in-memory fixture, ...)
//   - ContentStore   → reference text per answer page
//                      (directory of .txt files, in-memory map)
//   - TypeLookup     → knowledge-base type labels per page
//   - Guesser        → anything that turns question text into
//                      ranked answer guesses
//
// The application layer only sees these traits.

use std::path::Path;

use anyhow::Result;

use crate::domain::answer::Guess;
use crate::domain::error::GuesserError;
use crate::domain::question::TrainingData;

// ─── QuestionSource ──────────────────────────────────────────────────────────
/// Any component that can supply labelled training questions.
pub trait QuestionSource {
    /// Load every question whose answer appears at least
    /// `min_appearances` times.
    fn load_training(&self, min_appearances: usize) -> Result<TrainingData>;
}

// ─── ContentStore ────────────────────────────────────────────────────────────
/// Reference content keyed by normalised page identifier.
///
/// `Sync` because index builds may read it from worker threads.
pub trait ContentStore: Sync {
    /// `Ok(None)` when the store has nothing for `page`; `Err` when
    /// content exists but cannot be read.
    fn get(&self, page: &str) -> Result<Option<String>, GuesserError>;
}

// ─── TypeLookup ──────────────────────────────────────────────────────────────
/// Precomputed knowledge-base "instance of" labels.
pub trait TypeLookup {
    /// Type labels for a normalised page, `None` if the page is unknown.
    fn types_of(&self, page: &str) -> Option<&[String]>;
}

// ─── Guesser ─────────────────────────────────────────────────────────────────
/// A trainable answer ranker.
pub trait Guesser {
    /// Artifact filenames written by `save`
    fn targets() -> Vec<&'static str>
    where
        Self: Sized;

    /// Fit the guesser on labelled questions
    fn train(&mut self, data: &TrainingData) -> Result<()>;

    /// Rank at most `max_n_guesses` answers for each question.
    /// The outer Vec is aligned with `questions`.
    fn guess(&self, questions: &[String], max_n_guesses: usize) -> Result<Vec<Vec<Guess>>>;

    /// Persist every artifact listed by `targets` into `directory`
    fn save(&self, directory: &Path) -> Result<()>;
}
