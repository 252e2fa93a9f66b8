// ============================================================
// IR — Reference Content
// ============================================================
// Encyclopedic text per answer page, indexed next to the
// aggregated question text.
//
//   DirectoryContentStore : <root>/<normalised page>.txt
//   MemoryContentStore    : page → text map (tests, small runs)
//
// What happens when a page has no content is a policy choice:
//   Empty → index the page with empty reference text (default)
//   Skip  → leave the page out of the index
//   Fail  → abort the build with MissingContent

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::answer::normalize_page;
use crate::domain::error::GuesserError;
use crate::domain::traits::ContentStore;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingContentPolicy {
    #[default]
    Empty,
    Skip,
    Fail,
}

impl FromStr for MissingContentPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "empty" => Ok(Self::Empty),
            "skip"  => Ok(Self::Skip),
            "fail"  => Ok(Self::Fail),
            other   => Err(format!("missing-content policy must be empty, skip, or fail, not '{other}'")),
        }
    }
}

impl fmt::Display for MissingContentPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Empty => "empty",
            Self::Skip  => "skip",
            Self::Fail  => "fail",
        };
        f.write_str(name)
    }
}

/// Reference content for `page` under `policy`.
/// `Ok(None)` means the page should not be indexed.
pub fn resolve_content(
    store:  &dyn ContentStore,
    page:   &str,
    policy: MissingContentPolicy,
) -> Result<Option<String>, GuesserError> {
    if let Some(text) = store.get(page)? {
        return Ok(Some(text));
    }
    match policy {
        MissingContentPolicy::Empty => {
            tracing::warn!("No reference content for '{}', indexing it without", page);
            Ok(Some(String::new()))
        }
        MissingContentPolicy::Skip => {
            tracing::warn!("No reference content for '{}', leaving it out of the index", page);
            Ok(None)
        }
        MissingContentPolicy::Fail => Err(GuesserError::MissingContent(page.to_string())),
    }
}

// ─── Directory store ─────────────────────────────────────────────────────────
#[derive(Debug, Clone)]
pub struct DirectoryContentStore {
    root: PathBuf,
}

impl DirectoryContentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl ContentStore for DirectoryContentStore {
    fn get(&self, page: &str) -> Result<Option<String>, GuesserError> {
        let path = self.root.join(format!("{}.txt", normalize_page(page)));
        match fs::read_to_string(&path) {
            Ok(text)                                  => Ok(Some(text)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(GuesserError::ContentUnreadable { path, reason: e.to_string() }),
        }
    }
}

// ─── In-memory store ─────────────────────────────────────────────────────────
#[derive(Debug, Clone, Default)]
pub struct MemoryContentStore {
    pages: HashMap<String, String>,
}

impl MemoryContentStore {
    pub fn insert(&mut self, page: &str, text: impl Into<String>) {
        self.pages.insert(normalize_page(page), text.into());
    }
}

impl<P: AsRef<str>, T: Into<String>> FromIterator<(P, T)> for MemoryContentStore {
    fn from_iter<I: IntoIterator<Item = (P, T)>>(iter: I) -> Self {
        let mut store = Self::default();
        for (page, text) in iter {
            store.insert(page.as_ref(), text);
        }
        store
    }
}

impl ContentStore for MemoryContentStore {
    fn get(&self, page: &str) -> Result<Option<String>, GuesserError> {
        Ok(self.pages.get(&normalize_page(page)).cloned())
    }
}
