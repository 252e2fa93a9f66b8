// ============================================================
// IR Guesser Layer
// ============================================================
// Information-retrieval guesser. No Burn code here.
//
//   knowledge_base.rs   — KB type file, instance-of and human maps
//   tfidf.rs            — 1-2 gram TF-IDF vectoriser
//   ridge.rs            — l2-penalised linear classifier
//   human_classifier.rs — TF-IDF + ridge pipeline and its artifact
//   content.rs          — reference content stores and the
//                         missing-content policy
//   index.rs            — tantivy answer index with explicit
//                         open / build / close lifecycle
//   parallel.rs         — rayon pool: broadcast, ordered map
//   guesser.rs          — IrGuesser: the Guesser impl

/// Knowledge-base type maps
pub mod knowledge_base;

/// TF-IDF features
pub mod tfidf;

/// Ridge classifier
pub mod ridge;

/// Human / non-human question classifier
pub mod human_classifier;

/// Reference content per answer page
pub mod content;

/// Answer document index
pub mod index;

/// Parallel per-question execution
pub mod parallel;

/// IR guesser
pub mod guesser;
