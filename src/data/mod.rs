// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything between raw question files and tensor batches.
//
//   questions.jsonl
//       │
//       ▼
//   JsonlQuestionLoader → TrainingData (min_appearances filter)
//       │
//       ▼
//   Preprocessor        → tokens, class maps, vocab, train/val split
//       │
//       ▼
//   encoder             → embedding row ids, padded to max_len
//       │
//       ▼
//   SequenceDataset     → Burn Dataset
//       │
//       ▼
//   SequenceBatcher     → tensor batches for the RNN
//
// The IR guesser only needs the loader; the rest feeds the RNN.

/// Loads labelled questions from JSON Lines
pub mod loader;

/// Tokenisation and dataset preprocessing
pub mod preprocessor;

/// Page ↔ class id maps
pub mod class_map;

/// Token ids, padding and truncation
pub mod encoder;

/// Burn Dataset over encoded samples
pub mod dataset;

/// Burn Batcher producing tensor batches
pub mod batcher;

/// Seeded train/validation split
pub mod splitter;
