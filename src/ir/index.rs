// ============================================================
// IR — Answer Document Index (tantivy)
// ============================================================
// One document per training answer:
//
//   page          STRING | STORED   exact page id, returned on hits
//   wiki_content  TEXT              reference content
//   qb_content    TEXT              aggregated question text
//   is_human      bool INDEXED      filter field
//
// Lifecycle is explicit. A SearchClient starts closed; `build`
// drops whatever index exists under the same name, recreates it
// and leaves the client open; `open` attaches to an index built
// earlier; `close` releases the reader. `build` takes `&mut self`
// and `search` takes `&self`, so a rebuild can never overlap a
// query on the same client.
//
// Query: the question text is parsed leniently over both text
// fields (any term may match) and ANDed with a zero-score
// `is_human == flag` term filter. Hits are returned by score
// descending, ties broken by page id ascending. Every hit tied with
// the last kept score is fetched before truncating, so a top-k
// result is always a prefix of the full ranking.

use std::fs;
use std::path::{Path, PathBuf};

use tantivy::collector::TopDocs;
use tantivy::query::{BooleanQuery, ConstScoreQuery, Occur, Query, QueryParser, TermQuery};
use tantivy::schema::{Field, IndexRecordOption, Schema, Value, INDEXED, STORED, STRING, TEXT};
use tantivy::{doc, Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument, TantivyError, Term};

use crate::domain::answer::{AnswerDocument, Guess};
use crate::domain::error::GuesserError;

pub const DEFAULT_INDEX_NAME: &str = "qb";

const WRITER_MEMORY_BYTES: usize = 50_000_000;

impl From<TantivyError> for GuesserError {
    fn from(e: TantivyError) -> Self {
        GuesserError::Index(e.to_string())
    }
}

fn io_error(path: &Path, e: std::io::Error) -> GuesserError {
    GuesserError::Index(format!("'{}': {e}", path.display()))
}

#[derive(Debug, Clone, Copy)]
struct AnswerFields {
    page:         Field,
    wiki_content: Field,
    qb_content:   Field,
    is_human:     Field,
}

impl AnswerFields {
    fn schema() -> (Schema, Self) {
        let mut builder = Schema::builder();
        let fields = Self {
            page:         builder.add_text_field("page", STRING | STORED),
            wiki_content: builder.add_text_field("wiki_content", TEXT),
            qb_content:   builder.add_text_field("qb_content", TEXT),
            is_human:     builder.add_bool_field("is_human", INDEXED),
        };
        (builder.build(), fields)
    }

    fn from_schema(schema: &Schema) -> Result<Self, GuesserError> {
        Ok(Self {
            page:         schema.get_field("page")?,
            wiki_content: schema.get_field("wiki_content")?,
            qb_content:   schema.get_field("qb_content")?,
            is_human:     schema.get_field("is_human")?,
        })
    }
}

struct OpenIndex {
    index:  Index,
    reader: IndexReader,
    fields: AnswerFields,
}

impl OpenIndex {
    fn attach(index: Index) -> Result<Self, GuesserError> {
        let fields = AnswerFields::from_schema(&index.schema())?;
        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()?;
        Ok(Self { index, reader, fields })
    }
}

/// Handle on one named answer index under `root`
pub struct SearchClient {
    root:  PathBuf,
    name:  String,
    open:  Option<OpenIndex>,
}

impl SearchClient {
    pub fn new(root: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self { root: root.into(), name: name.into(), open: None }
    }

    pub fn path(&self) -> PathBuf {
        self.root.join(&self.name)
    }

    /// Attach to an index built earlier
    pub fn open(&mut self) -> Result<(), GuesserError> {
        let path = self.path();
        if !path.join("meta.json").exists() {
            return Err(GuesserError::ArtifactMissing { path });
        }
        let index = Index::open_in_dir(&path)?;
        self.open = Some(OpenIndex::attach(index)?);
        tracing::info!("Opened index '{}' ({} documents)", path.display(), self.num_docs());
        Ok(())
    }

    pub fn close(&mut self) {
        if self.open.take().is_some() {
            tracing::debug!("Closed index '{}'", self.path().display());
        }
    }

    /// Delete the index directory. Returns false if there was nothing to delete.
    pub fn drop_index(&mut self) -> Result<bool, GuesserError> {
        self.close();
        let path = self.path();
        if !path.exists() {
            tracing::info!("Could not delete non-existent index '{}', creating new index...", self.name);
            return Ok(false);
        }
        fs::remove_dir_all(&path).map_err(|e| io_error(&path, e))?;
        tracing::info!("Deleted index '{}'", path.display());
        Ok(true)
    }

    /// Full destructive rebuild from `documents`
    pub fn build(&mut self, documents: &[AnswerDocument]) -> Result<(), GuesserError> {
        self.drop_index()?;

        let path = self.path();
        fs::create_dir_all(&path).map_err(|e| io_error(&path, e))?;
        let (schema, fields) = AnswerFields::schema();
        let index = Index::create_in_dir(&path, schema)?;

        let mut writer: IndexWriter = index.writer_with_num_threads(1, WRITER_MEMORY_BYTES)?;
        for d in documents {
            writer.add_document(doc!(
                fields.page         => d.page.as_str(),
                fields.wiki_content => d.wiki_content.as_str(),
                fields.qb_content   => d.qb_content.as_str(),
                fields.is_human     => d.is_human,
            ))?;
        }
        writer.commit()?;
        writer.wait_merging_threads()?;

        self.open = Some(OpenIndex::attach(index)?);
        tracing::info!("Indexed {} answer documents into '{}'", documents.len(), path.display());
        Ok(())
    }

    pub fn num_docs(&self) -> u64 {
        self.open.as_ref().map_or(0, |o| o.reader.searcher().num_docs())
    }

    /// At most `limit` pages whose human flag equals `is_human`,
    /// ranked by relevance of both text fields to `text`
    pub fn search(&self, text: &str, is_human: bool, limit: usize) -> Result<Vec<Guess>, GuesserError> {
        let open = self
            .open
            .as_ref()
            .ok_or_else(|| GuesserError::Index(format!("index '{}' is not open", self.name)))?;
        if limit == 0 {
            return Ok(Vec::new());
        }
        let f = open.fields;

        let parser = QueryParser::for_index(&open.index, vec![f.wiki_content, f.qb_content]);
        let (text_query, errors) = parser.parse_query_lenient(text);
        if !errors.is_empty() {
            tracing::debug!("Ignored {} query syntax errors in {:?}", errors.len(), text);
        }

        let flag = TermQuery::new(Term::from_field_bool(f.is_human, is_human), IndexRecordOption::Basic);
        let filter: Box<dyn Query> = Box::new(ConstScoreQuery::new(Box::new(flag), 0.0));
        let query = BooleanQuery::new(vec![(Occur::Must, text_query), (Occur::Must, filter)]);

        let searcher = open.reader.searcher();
        let mut fetch = limit.saturating_add(1);
        let hits = loop {
            let hits = searcher.search(&query, &TopDocs::with_limit(fetch))?;
            if !boundary_tie_cut(&hits, limit, fetch) {
                break hits;
            }
            fetch = fetch.saturating_mul(2);
        };

        let mut guesses = Vec::with_capacity(hits.len());
        for (score, address) in hits {
            let stored: TantivyDocument = searcher.doc(address)?;
            if let Some(page) = stored.get_first(f.page).and_then(|v| v.as_str()) {
                guesses.push(Guess::new(page, score as f64));
            }
        }
        guesses.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.page.cmp(&b.page)));
        guesses.truncate(limit);
        Ok(guesses)
    }
}

/// True when a full page of `fetch` hits may have cut off documents
/// tied with the score at position `limit`
fn boundary_tie_cut<A>(hits: &[(f32, A)], limit: usize, fetch: usize) -> bool {
    if hits.len() < fetch || hits.len() <= limit {
        return false;
    }
    let boundary = hits[limit - 1].0;
    hits.last().map_or(false, |(score, _)| *score >= boundary)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn document(page: &str, qb: &str, wiki: &str, is_human: bool) -> AnswerDocument {
        AnswerDocument {
            page:         page.to_string(),
            qb_content:   qb.to_string(),
            wiki_content: wiki.to_string(),
            is_human,
        }
    }

    fn napoleon_plato() -> Vec<AnswerDocument> {
        vec![
            document("napoleon", "french emperor", "", true),
            document("plato", "greek philosopher", "", true),
        ]
    }

    fn pages(guesses: &[Guess]) -> Vec<&str> {
        guesses.iter().map(|g| g.page.as_str()).collect()
    }

    #[test]
    fn test_human_filter_example() {
        let dir = tempfile::tempdir().unwrap();
        let mut client = SearchClient::new(dir.path(), DEFAULT_INDEX_NAME);
        client.build(&napoleon_plato()).unwrap();

        let human = client.search("emperor", true, 10).unwrap();
        assert_eq!(human.first().map(|g| g.page.as_str()), Some("napoleon"));
        assert!(human.iter().all(|g| g.page != "plato" || g.score < human[0].score));

        assert!(client.search("emperor", false, 10).unwrap().is_empty());
    }

    #[test]
    fn test_both_fields_are_searched() {
        let dir = tempfile::tempdir().unwrap();
        let mut client = SearchClient::new(dir.path(), "qb");
        client
            .build(&[
                document("paris", "capital on the seine", "", false),
                document("rome", "", "eternal city with seven hills", false),
            ])
            .unwrap();
        assert_eq!(pages(&client.search("seine", false, 5).unwrap()), vec!["paris"]);
        assert_eq!(pages(&client.search("hills", false, 5).unwrap()), vec!["rome"]);
    }

    #[test]
    fn test_rebuild_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let mut client = SearchClient::new(dir.path(), "qb");
        client.build(&napoleon_plato()).unwrap();
        let first = client.search("greek emperor", true, 10).unwrap();
        client.build(&napoleon_plato()).unwrap();
        let second = client.search("greek emperor", true, 10).unwrap();
        assert_eq!(client.num_docs(), 2);
        assert_eq!(first, second);
    }

    #[test]
    fn test_ties_break_by_page() {
        let dir = tempfile::tempdir().unwrap();
        let mut client = SearchClient::new(dir.path(), "qb");
        client
            .build(&[
                document("b_page", "same words", "", true),
                document("a_page", "same words", "", true),
            ])
            .unwrap();
        let hits = client.search("same words", true, 10).unwrap();
        assert_eq!(pages(&hits), vec!["a_page", "b_page"]);

        let top = client.search("same words", true, 1).unwrap();
        assert_eq!(pages(&top), vec!["a_page"]);
    }

    #[test]
    fn test_top_k_is_prefix_of_full_ranking() {
        let dir = tempfile::tempdir().unwrap();
        let mut client = SearchClient::new(dir.path(), "qb");
        let docs: Vec<AnswerDocument> = ["e", "d", "c", "b", "a"]
            .iter()
            .map(|p| document(&format!("{p}_page"), "same words", "", true))
            .collect();
        client.build(&docs).unwrap();

        let all = client.search("same words", true, 10).unwrap();
        for k in 1..=5 {
            let top = client.search("same words", true, k).unwrap();
            assert_eq!(pages(&top), pages(&all[..k]));
        }
    }

    #[test]
    fn test_boundary_tie_detection() {
        let hits = [(2.0f32, ()), (1.0, ()), (1.0, ())];
        assert!(boundary_tie_cut(&hits, 2, 3));
        assert!(!boundary_tie_cut(&hits[..2], 2, 3));
        let falling = [(2.0f32, ()), (1.0, ()), (0.5, ())];
        assert!(!boundary_tie_cut(&falling, 2, 3));
    }

    #[test]
    fn test_limit_and_syntax_errors() {
        let dir = tempfile::tempdir().unwrap();
        let mut client = SearchClient::new(dir.path(), "qb");
        client.build(&napoleon_plato()).unwrap();
        assert!(client.search("emperor", true, 0).unwrap().is_empty());
        assert_eq!(client.search("french OR greek", true, 1).unwrap().len(), 1);
        assert!(client.search("emperor AND (", true, 5).is_ok());
    }

    #[test]
    fn test_lifecycle() {
        let dir = tempfile::tempdir().unwrap();
        let mut client = SearchClient::new(dir.path(), "qb");
        assert!(matches!(client.open(), Err(GuesserError::ArtifactMissing { .. })));
        assert!(matches!(client.search("x", true, 1), Err(GuesserError::Index(_))));
        assert!(!client.drop_index().unwrap());

        client.build(&napoleon_plato()).unwrap();
        assert_eq!(client.num_docs(), 2);
        client.close();
        assert_eq!(client.num_docs(), 0);

        let mut other = SearchClient::new(dir.path(), "qb");
        other.open().unwrap();
        assert_eq!(other.num_docs(), 2);
        assert_eq!(pages(&other.search("philosopher", true, 3).unwrap()), vec!["plato"]);
    }
}
