// ============================================================
// IR — Knowledge-Base Type Maps
// ============================================================
// The knowledge-base file maps raw page titles to their
// properties:
//
//   { "Napoleon": { "instance of": ["Human"], ... }, ... }
//
// From it we derive, for the answers seen in training:
//   instance-of map : page → set of type labels
//   human map       : page → ("Human" ∈ types)
//
// Answers the knowledge base does not know are absent from
// both maps and count as non-human.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use anyhow::Result;
use serde_json::Value;

use crate::domain::answer::normalize_page;
use crate::domain::traits::TypeLookup;
use crate::infra::artifacts::read_json;

pub const INSTANCE_OF: &str = "instance of";
pub const HUMAN_TYPE: &str = "Human";

pub type InstanceOfMap = BTreeMap<String, BTreeSet<String>>;
pub type HumanMap = BTreeMap<String, bool>;

/// "instance of" labels keyed by normalised page
#[derive(Debug, Clone, Default)]
pub struct KnowledgeBase {
    types: BTreeMap<String, Vec<String>>,
}

impl KnowledgeBase {
    /// Build from `(raw page, types)` pairs. Pages that normalise
    /// to the same key have their labels merged.
    pub fn from_entries<I, P, T>(entries: I) -> Self
    where
        I: IntoIterator<Item = (P, Vec<T>)>,
        P: AsRef<str>,
        T: Into<String>,
    {
        let mut types: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (page, labels) in entries {
            let slot = types.entry(normalize_page(page.as_ref())).or_default();
            for label in labels {
                let label = label.into();
                if !slot.contains(&label) {
                    slot.push(label);
                }
            }
        }
        Self { types }
    }

    /// Read the JSON property file. Properties other than
    /// "instance of" are ignored, as are non-string labels.
    pub fn load(path: &Path) -> Result<Self> {
        let raw: BTreeMap<String, BTreeMap<String, Value>> = read_json(path)?;
        let entries = raw.into_iter().map(|(page, mut props)| {
            let labels: Vec<String> = match props.remove(INSTANCE_OF) {
                Some(Value::Array(items)) => items
                    .into_iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect(),
                _ => Vec::new(),
            };
            (page, labels)
        });
        let kb = Self::from_entries(entries);
        if kb.is_empty() {
            tracing::warn!("Knowledge base '{}' has no pages; every answer will be non-human", path.display());
        }
        tracing::info!("Loaded {} knowledge-base pages from '{}'", kb.len(), path.display());
        Ok(kb)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl TypeLookup for KnowledgeBase {
    fn types_of(&self, page: &str) -> Option<&[String]> {
        self.types.get(page).map(Vec::as_slice)
    }
}

/// Type sets for the training answers that have at least one label
pub fn create_instance_of_map(lookup: &dyn TypeLookup, answers: &BTreeSet<String>) -> InstanceOfMap {
    let map: InstanceOfMap = answers
        .iter()
        .filter_map(|page| {
            let types = lookup.types_of(page)?;
            if types.is_empty() {
                return None;
            }
            Some((page.clone(), types.iter().cloned().collect()))
        })
        .collect();

    let missing = answers.len() - map.len();
    if missing > 0 {
        tracing::warn!(
            "{} of {} answers have no knowledge-base types and will be treated as non-human",
            missing,
            answers.len()
        );
    }
    map
}

pub fn create_is_human_map(instance_of: &InstanceOfMap) -> HumanMap {
    instance_of
        .iter()
        .map(|(page, types)| (page.clone(), types.contains(HUMAN_TYPE)))
        .collect()
}

/// Human flag for `page`, false when absent
pub fn is_human(map: &HumanMap, page: &str) -> bool {
    map.get(page).copied().unwrap_or(false)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn answers(pages: &[&str]) -> BTreeSet<String> {
        pages.iter().map(|p| p.to_string()).collect()
    }

    fn kb() -> KnowledgeBase {
        KnowledgeBase::from_entries(vec![
            ("Napoleon", vec!["Human"]),
            ("Plato", vec!["Human", "Philosopher"]),
            ("Paris", vec!["City"]),
            ("Nowhere", vec![]),
        ])
    }

    #[test]
    fn test_keys_are_normalised() {
        let kb = KnowledgeBase::from_entries(vec![("Isaac Newton", vec!["Human"])]);
        assert!(kb.types_of("isaac_newton").is_some());
        assert!(kb.types_of("Isaac Newton").is_none());
    }

    #[test]
    fn test_instance_of_keeps_only_training_answers_with_types() {
        let map = create_instance_of_map(&kb(), &answers(&["napoleon", "paris", "nowhere", "atlantis"]));
        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["napoleon", "paris"]);
    }

    #[test]
    fn test_human_rule_is_exact() {
        let all = answers(&["napoleon", "plato", "paris", "nowhere", "atlantis"]);
        let instance_of = create_instance_of_map(&kb(), &all);
        let human = create_is_human_map(&instance_of);
        for page in &all {
            let expected = instance_of.get(page).map_or(false, |t| t.contains(HUMAN_TYPE));
            assert_eq!(is_human(&human, page), expected, "{page}");
        }
        assert!(is_human(&human, "plato"));
        assert!(!is_human(&human, "paris"));
        assert!(!is_human(&human, "atlantis"));
    }

    #[test]
    fn test_load_reads_instance_of_only() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("kb.json");
        std::fs::write(
            &path,
            r#"{"Napoleon": {"instance of": ["Human", 3], "occupation": ["Emperor"]},
                "Plato": {"occupation": ["Philosopher"]}}"#,
        )
        .unwrap();
        let kb = KnowledgeBase::load(&path).unwrap();
        assert_eq!(kb.types_of("napoleon").unwrap(), &["Human".to_string()]);
        assert_eq!(kb.types_of("plato").unwrap().len(), 0);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(KnowledgeBase::load(&dir.path().join("none.json")).is_err());
    }
}
