// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// Workflow only: load data, wire a guesser to its
// collaborators, train / save, or load / guess.
//
// Rules for this layer:
//   - No model or retrieval code here
//   - No printing here (that's Layer 1)
//
// Reference: Clean Architecture pattern
//            Rust Book §7 (Module System)

// Training workflow for both guessers
pub mod train_use_case;

// Load-and-guess workflow
pub mod guess_use_case;
