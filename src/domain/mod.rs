// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust structs, traits and the error type that every
// other layer speaks in terms of.
//
// Rules for this layer:
//   - NO Burn or tantivy types allowed here
//   - NO file I/O or network calls
//   - Only plain Rust structs, enums, and traits
//
// The two guessers (IR and RNN) both consume TrainingData
// and produce Guess lists, so those live here.

// Answer pages, guesses and page normalisation
pub mod answer;

// Training questions paired with their answer labels
pub mod question;

// Core abstractions (traits) that other layers implement
pub mod traits;

// Typed failure kinds shared by both guessers
pub mod error;
