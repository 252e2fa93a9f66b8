// ============================================================
// Layer 4 — Class Index Maps
// ============================================================
// Bidirectional mapping between answer page and dense class id.
//
// Invariant: every id in [0, n_classes) maps to exactly one page
// and every page maps back to its id. Ids are assigned in sorted
// page order so the same label set always produces the same maps.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::domain::error::GuesserError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClassMaps {
    i_to_class: Vec<String>,
    class_to_i: BTreeMap<String, usize>,
}

impl ClassMaps {
    /// Build maps over the distinct labels, ids in sorted label order
    pub fn from_labels<S: AsRef<str>>(labels: &[S]) -> Self {
        let distinct: BTreeSet<&str> = labels.iter().map(|l| l.as_ref()).collect();
        let i_to_class: Vec<String> = distinct.into_iter().map(str::to_string).collect();
        let class_to_i = i_to_class
            .iter()
            .enumerate()
            .map(|(i, c)| (c.clone(), i))
            .collect();
        Self { i_to_class, class_to_i }
    }

    pub fn n_classes(&self) -> usize {
        self.i_to_class.len()
    }

    pub fn class_of(&self, page: &str) -> Option<usize> {
        self.class_to_i.get(page).copied()
    }

    pub fn page_of(&self, id: usize) -> Option<&str> {
        self.i_to_class.get(id).map(String::as_str)
    }

    /// Check the bijection invariant
    pub fn validate(&self) -> Result<(), GuesserError> {
        if self.class_to_i.len() != self.i_to_class.len() {
            return Err(GuesserError::invalid_parameters(format!(
                "class maps disagree in size: {} ids, {} pages",
                self.i_to_class.len(),
                self.class_to_i.len()
            )));
        }
        for (i, page) in self.i_to_class.iter().enumerate() {
            if self.class_to_i.get(page) != Some(&i) {
                return Err(GuesserError::invalid_parameters(format!(
                    "class id {i} ('{page}') does not round-trip"
                )));
            }
        }
        Ok(())
    }
}
