// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// All Burn framework code for the RNN guesser lives here.
// The IR guesser does not touch this layer.
//
//   embeddings.rs — embedding table construction (pretrained
//                   vectors, random expansion) and its JSON cache
//
//   model.rs      — embedding → recurrent cell (LSTM / GRU /
//                   simple RNN) → last real step → dense →
//                   batch norm → dropout → softmax
//
//   params.rs     — the versioned rnn_params.json record
//
//   trainer.rs    — Adam + cross-entropy epoch loop with
//                   early stopping on validation accuracy
//
//   inferencer.rs — batched probabilities and top-k decoding
//
//   guesser.rs    — RnnGuesser: the Guesser impl tying it together
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)

/// Embedding table construction and caching
pub mod embeddings;

/// Recurrent classifier architecture
pub mod model;

/// Persisted model parameters
pub mod params;

/// Training loop with early stopping
pub mod trainer;

/// Batched prediction and top-k decoding
pub mod inferencer;

/// RNN guesser
pub mod guesser;
