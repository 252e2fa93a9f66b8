// ============================================================
// Layer 3 — Answer Domain Types
// ============================================================
// An "answer page" is the canonical identifier of a candidate
// answer entity (a Wikipedia-style page title). Every label,
// knowledge-base key and content lookup goes through
// normalize_page so that "Napoleon Bonaparte", " napoleon
// bonaparte " and "Napoleon_Bonaparte" all meet in one place.

use serde::{Deserialize, Serialize};

/// Canonical form of an answer page:
/// trim, lowercase, spaces → underscores, drop ':' and '|'.
///
/// Example:
///   normalize_page(" Battle of Hastings ") == "battle_of_hastings"
pub fn normalize_page(page: &str) -> String {
    page.trim()
        .to_lowercase()
        .chars()
        .filter(|c| *c != ':' && *c != '|')
        .map(|c| if c == ' ' { '_' } else { c })
        .collect()
}

/// One candidate answer with its score.
/// For the IR guesser the score is a relevance score,
/// for the RNN guesser it is a class probability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Guess {
    pub page:  String,
    pub score: f64,
}

impl Guess {
    pub fn new(page: impl Into<String>, score: f64) -> Self {
        Self { page: page.into(), score }
    }
}

/// One indexed document per distinct training answer.
/// Built at index time, never updated in place: a reindex drops
/// the whole index and recreates every document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerDocument {
    /// Normalised page identifier
    pub page: String,

    /// All training question fragments for this page, space-joined
    pub qb_content: String,

    /// Encyclopedic reference text for the page
    pub wiki_content: String,

    /// Whether the answer is a human being
    pub is_human: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_page_spaces_and_case() {
        assert_eq!(normalize_page(" Battle of Hastings "), "battle_of_hastings");
    }

    #[test]
    fn test_normalize_page_drops_separators() {
        assert_eq!(normalize_page("Star Trek: Voyager|x"), "star_trek_voyagerx");
    }

    #[test]
    fn test_normalize_page_is_idempotent() {
        let once = normalize_page("Napoleon Bonaparte");
        assert_eq!(normalize_page(&once), once);
    }
}
