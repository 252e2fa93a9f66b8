// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Cross-cutting persistence used by both guessers:
//
//   artifacts.rs  — atomic JSON write, typed JSON read that
//                   reports missing vs corrupt artifacts
//
//   checkpoint.rs — RNN weight files (Burn recorder), staging
//                   and promotion to the output directory
//
//   metrics.rs    — per-epoch training metrics and the
//                   rnn_history.csv writer
//
// Reference: Rust Book §9 (Error Handling with anyhow)
//            Burn Book §5 (Checkpointing)

/// JSON artifact helpers
pub mod artifacts;

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Training metrics and CSV history
pub mod metrics;
