// ============================================================
// Layer 4 — Sequence Encoder
// ============================================================
// Turns tokenised text into fixed-length rows of embedding
// indices for the RNN.
//
// Index layout of the embedding table:
//   0 = [PAD]  mask row, never assigned to a real token
//   1 = [UNK]  any token missing from the lookup
//   2.. real tokens
//
// Padding policy (shared by training and inference):
//   - truncate: keep the FIRST max_len tokens, drop the tail
//   - pad:      append pad_value on the RIGHT
//
// Right padding lets the model read its sentence summary from
// the last real time step (see ml::model), so padded steps
// never feed into a prediction.
//
// Everything here is pure and stateless.

use std::collections::BTreeMap;

/// Reserved mask/padding index
pub const PAD_INDEX: u32 = 0;

/// Index every out-of-lookup token resolves to
pub const UNK_INDEX: u32 = 1;

/// Token → embedding row index
pub type EmbeddingLookup = BTreeMap<String, u32>;

/// Map each token to its row in the embedding table.
/// Unknown tokens become UNK_INDEX, never PAD_INDEX.
pub fn encode<S: AsRef<str>>(tokens: &[S], lookup: &EmbeddingLookup) -> Vec<u32> {
    tokens
        .iter()
        .map(|t| match lookup.get(t.as_ref()) {
            Some(&i) if i != PAD_INDEX => i,
            _                          => UNK_INDEX,
        })
        .collect()
}

/// Truncate (drop trailing tokens) or right-pad every sequence
/// to exactly `max_len` entries.
pub fn pad_or_truncate(sequences: &[Vec<u32>], max_len: usize, pad_value: u32) -> Vec<Vec<u32>> {
    sequences
        .iter()
        .map(|seq| {
            let mut row: Vec<u32> = seq.iter().copied().take(max_len).collect();
            row.resize(max_len, pad_value);
            row
        })
        .collect()
}

/// Number of real (non-padding) steps a sequence keeps after
/// pad_or_truncate
pub fn effective_length(seq: &[u32], max_len: usize) -> usize {
    seq.len().min(max_len)
}
