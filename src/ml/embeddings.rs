// ============================================================
// Layer 5 — Embedding Table Builder
// ============================================================
// Builds the word-vector table the RNN's embedding layer starts
// from, plus the token → row lookup the encoder uses.
//
// Row layout:
//   0            [PAD]  all zeros, the mask row
//   1            [UNK]  random vector
//   2..          vocabulary words found in the pretrained source,
//                in sorted order, with their pretrained vectors
//   then         (expand only) vocabulary words missing from the
//                pretrained source, sorted, with random vectors
//
// Sorting plus a seeded RNG makes the lookup a pure function of
// (vocabulary, pretrained source, expand flag, seed). The lookup
// is persisted with the model anyway.
//
// Pretrained vectors come from a GloVe-style text file:
//   word v1 v2 ... vD
// Only words in the vocabulary are kept in memory.
//
// Building from a large GloVe file is slow, so the result is
// cached as JSON: first a temp location, then the model's output
// directory. A cache entry is reused only when its vocabulary,
// expand flag, seed and source fingerprint match the request.

use std::collections::{BTreeSet, HashMap};
use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use anyhow::{bail, Context, Result};
use rand::{distributions::Uniform, rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::data::encoder::{EmbeddingLookup, PAD_INDEX, UNK_INDEX};
use crate::infra::artifacts::{read_json, write_json};

pub const UNK_TOKEN: &str = "[UNK]";
pub const PAD_TOKEN: &str = "[PAD]";

/// Dense row-major matrix, one row per embedding index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EmbeddingTable {
    pub dim:    usize,
    pub n_rows: usize,
    pub values: Vec<f32>,
}

impl EmbeddingTable {
    pub fn row(&self, index: usize) -> &[f32] {
        &self.values[index * self.dim..(index + 1) * self.dim]
    }

    pub fn is_consistent(&self) -> bool {
        self.values.len() == self.n_rows * self.dim
    }
}

/// Word vectors read from a pretrained source
#[derive(Debug, Clone, Default)]
pub struct PretrainedVectors {
    pub dim:     usize,
    pub vectors: HashMap<String, Vec<f32>>,
}

impl PretrainedVectors {
    /// No pretrained words; every row comes from the RNG
    pub fn empty(dim: usize) -> Self {
        Self { dim, vectors: HashMap::new() }
    }

    /// Read a GloVe text file, keeping only words in `vocab`.
    /// Lines whose width disagrees with the first line are skipped;
    /// a word with no values at all is a format error.
    pub fn load_glove(path: &Path, vocab: &BTreeSet<String>) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("Cannot open embeddings '{}'", path.display()))?;

        let mut dim     = 0usize;
        let mut vectors = HashMap::new();
        let mut skipped = 0usize;

        for (i, line) in BufReader::new(file).lines().enumerate() {
            let line = line?;
            let mut parts = line.split_whitespace();
            let Some(word) = parts.next() else { continue };
            let values: Vec<f32> = match parts.map(str::parse::<f32>).collect() {
                Ok(v)  => v,
                Err(_) => { skipped += 1; continue; }
            };
            if values.is_empty() {
                bail!("'{}' line {}: '{}' has no vector values", path.display(), i + 1, word);
            }
            if dim == 0 {
                dim = values.len();
            }
            if values.len() != dim {
                skipped += 1;
                continue;
            }
            if vocab.contains(word) {
                vectors.insert(word.to_string(), values);
            }
        }
        if dim == 0 {
            bail!("'{}' contains no word vectors", path.display());
        }

        tracing::info!(
            "Loaded {} pretrained vectors (dim={}) from '{}', {} lines skipped",
            vectors.len(),
            dim,
            path.display(),
            skipped
        );
        Ok(Self { dim, vectors })
    }
}

/// Where pretrained vectors come from, identified well enough to
/// tell whether a cached table was built from the same input
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EmbeddingSource {
    /// No pretrained file; every row is random
    Random { dim: usize },
    /// GloVe text file with its size and modification time
    Glove { path: PathBuf, len: u64, modified_nanos: Option<u64> },
}

impl EmbeddingSource {
    pub fn random(dim: usize) -> Self {
        Self::Random { dim }
    }

    /// Fingerprint a GloVe file on disk
    pub fn glove(path: &Path) -> Result<Self> {
        let meta = fs::metadata(path)
            .with_context(|| format!("Cannot open embeddings '{}'", path.display()))?;
        let modified_nanos = meta
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_nanos() as u64);
        Ok(Self::Glove { path: path.to_path_buf(), len: meta.len(), modified_nanos })
    }

    /// Read the vectors this source names, restricted to `vocab`
    pub fn load(&self, vocab: &BTreeSet<String>) -> Result<PretrainedVectors> {
        match self {
            Self::Random { dim }     => Ok(PretrainedVectors::empty(*dim)),
            Self::Glove { path, .. } => PretrainedVectors::load_glove(path, vocab),
        }
    }
}

/// Build the table and lookup for `vocab`.
/// With `expand` false, words missing from `pretrained` resolve to [UNK].
pub fn build_embeddings(
    vocab:      &BTreeSet<String>,
    pretrained: &PretrainedVectors,
    expand:     bool,
    seed:       u64,
) -> (EmbeddingTable, EmbeddingLookup) {
    let dim  = pretrained.dim;
    let mut rng  = StdRng::seed_from_u64(seed);
    let uniform  = Uniform::new_inclusive(-1.0f32, 1.0f32);

    let mut values: Vec<f32>     = vec![0.0; dim];
    values.extend((0..dim).map(|_| rng.sample(uniform)));

    let mut lookup = EmbeddingLookup::new();
    lookup.insert(PAD_TOKEN.to_string(), PAD_INDEX);
    lookup.insert(UNK_TOKEN.to_string(), UNK_INDEX);
    let mut next = UNK_INDEX + 1;

    for word in vocab {
        if let Some(v) = pretrained.vectors.get(word) {
            values.extend_from_slice(v);
            lookup.insert(word.clone(), next);
            next += 1;
        }
    }
    let n_pretrained = next - 2;

    if expand {
        for word in vocab {
            if lookup.contains_key(word) {
                continue;
            }
            values.extend((0..dim).map(|_| rng.sample(uniform)));
            lookup.insert(word.clone(), next);
            next += 1;
        }
    }

    tracing::info!(
        "Embedding table: {} rows ({} pretrained, {} fresh), dim {}",
        next,
        n_pretrained,
        next - 2 - n_pretrained,
        dim
    );

    let table = EmbeddingTable { dim, n_rows: next as usize, values };
    (table, lookup)
}

/// What a cache entry was built from, plus the result
#[derive(Debug, Serialize, Deserialize)]
struct CachedEmbeddings {
    vocab:  BTreeSet<String>,
    expand: bool,
    seed:   u64,
    source: EmbeddingSource,
    table:  EmbeddingTable,
    lookup: EmbeddingLookup,
}

impl CachedEmbeddings {
    fn matches(&self, vocab: &BTreeSet<String>, expand: bool, seed: u64, source: &EmbeddingSource) -> bool {
        self.vocab == *vocab && self.expand == expand && self.seed == seed && self.source == *source
    }
}

/// Two-level JSON cache for built embedding tables
pub struct EmbeddingCache {
    tmp_path:    PathBuf,
    target_path: Option<PathBuf>,
}

impl EmbeddingCache {
    pub fn new(tmp_path: impl Into<PathBuf>) -> Self {
        Self { tmp_path: tmp_path.into(), target_path: None }
    }

    /// Also consult a second, longer-lived cache location
    pub fn with_target(mut self, target_path: impl Into<PathBuf>) -> Self {
        self.target_path = Some(target_path.into());
        self
    }

    /// Return a cached table for this request, or load `source`,
    /// build one and write it to the temp location
    pub fn load_or_build(
        &self,
        vocab:  &BTreeSet<String>,
        expand: bool,
        seed:   u64,
        source: &EmbeddingSource,
    ) -> Result<(EmbeddingTable, EmbeddingLookup)> {
        for path in std::iter::once(&self.tmp_path).chain(self.target_path.as_ref()) {
            match read_json::<CachedEmbeddings>(path) {
                Ok(c) if c.matches(vocab, expand, seed, source) => {
                    tracing::info!("Using cached embeddings from '{}'", path.display());
                    return Ok((c.table, c.lookup));
                }
                Ok(_)  => tracing::debug!("Stale embedding cache at '{}'", path.display()),
                Err(e) => tracing::debug!("No usable embedding cache: {e}"),
            }
        }

        let pretrained      = source.load(vocab)?;
        let (table, lookup) = build_embeddings(vocab, &pretrained, expand, seed);
        let cached = CachedEmbeddings {
            vocab: vocab.clone(),
            expand,
            seed,
            source: source.clone(),
            table,
            lookup,
        };
        write_json(&self.tmp_path, &cached)?;
        Ok((cached.table, cached.lookup))
    }

    /// Copy the temp cache to `path`; no-op when nothing was built
    pub fn promote_to(&self, path: &Path) -> Result<()> {
        if !self.tmp_path.exists() || self.tmp_path == path {
            return Ok(());
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(&self.tmp_path, path)
            .with_context(|| format!("Cannot copy embeddings to '{}'", path.display()))?;
        Ok(())
    }
}
