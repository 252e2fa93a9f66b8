// ============================================================
// IR Guesser
// ============================================================
// Retrieval over one document per answer, gated by a
// human / non-human classifier.
//
// train:
//   answers → instance-of map → human map
//   questions + human labels → HumanClassifier
//   questions grouped per answer + reference content → index
// guess (per question, in parallel, order preserved):
//   is_human = classifier(question)
//   search(question, is_human) → first max_n_guesses hits
// save / load:
//   is_human_model.json; the index lives in its own directory
//   and is reopened on load

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::domain::answer::{normalize_page, AnswerDocument, Guess};
use crate::domain::error::GuesserError;
use crate::domain::question::TrainingData;
use crate::domain::traits::{ContentStore, Guesser, TypeLookup};
use crate::ir::content::{resolve_content, MemoryContentStore, MissingContentPolicy};
use crate::ir::human_classifier::{HumanClassifier, IS_HUMAN_MODEL_TARGET};
use crate::ir::index::{SearchClient, DEFAULT_INDEX_NAME};
use crate::ir::knowledge_base::{create_instance_of_map, create_is_human_map, is_human, HumanMap, KnowledgeBase};
use crate::ir::parallel::{Broadcast, ParallelExecutor};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IrGuesserConfig {
    /// Directory holding the named index
    pub index_dir:       PathBuf,
    pub index_name:      String,
    /// Width of the guess worker pool
    pub n_cores:         usize,
    pub missing_content: MissingContentPolicy,
}

impl Default for IrGuesserConfig {
    fn default() -> Self {
        Self {
            index_dir:       std::env::temp_dir().join("qanta").join("index"),
            index_name:      DEFAULT_INDEX_NAME.to_string(),
            n_cores:         4,
            missing_content: MissingContentPolicy::default(),
        }
    }
}

pub struct IrGuesser {
    config:     IrGuesserConfig,
    types:      Box<dyn TypeLookup>,
    content:    Box<dyn ContentStore>,
    classifier: Option<Broadcast<HumanClassifier>>,
    client:     SearchClient,
}

/// Question text joined per question, labelled with its answer's human flag
pub fn format_human_data(human_map: &HumanMap, data: &TrainingData) -> (Vec<String>, Vec<bool>) {
    data.iter()
        .map(|(fragments, answer)| (fragments.join(" "), is_human(human_map, &normalize_page(answer))))
        .unzip()
}

/// All question text per normalised answer, in question order
pub fn aggregate_documents(data: &TrainingData) -> BTreeMap<String, String> {
    let mut documents: BTreeMap<String, String> = BTreeMap::new();
    for (fragments, answer) in data.iter() {
        let paragraph = fragments.join(" ");
        documents
            .entry(normalize_page(answer))
            .and_modify(|doc| {
                doc.push(' ');
                doc.push_str(&paragraph);
            })
            .or_insert(paragraph);
    }
    documents
}

impl IrGuesser {
    pub fn new(config: IrGuesserConfig) -> Self {
        let client = SearchClient::new(&config.index_dir, &config.index_name);
        Self {
            config,
            types: Box::new(KnowledgeBase::default()),
            content: Box::new(MemoryContentStore::default()),
            classifier: None,
            client,
        }
    }

    pub fn with_types(mut self, types: impl TypeLookup + 'static) -> Self {
        self.types = Box::new(types);
        self
    }

    pub fn with_content(mut self, content: impl ContentStore + 'static) -> Self {
        self.content = Box::new(content);
        self
    }

    /// Load the classifier from `directory` and reopen the index
    /// named by `config`
    pub fn load(directory: &Path, config: IrGuesserConfig) -> Result<Self> {
        let classifier = HumanClassifier::load(directory)?;
        let mut guesser = Self::new(config);
        guesser.client.open()?;
        guesser.classifier = Some(Broadcast::new(classifier));
        tracing::info!("Loaded IR guesser from '{}'", directory.display());
        Ok(guesser)
    }

    fn build_documents(&self, data: &TrainingData, human_map: &HumanMap) -> Result<Vec<AnswerDocument>> {
        let grouped: Vec<(String, String)> = aggregate_documents(data).into_iter().collect();
        let executor = ParallelExecutor::new(self.config.n_cores)?;
        let content  = self.content.as_ref();
        let policy   = self.config.missing_content;

        let wiki = executor.try_map(&grouped, |(page, _)| resolve_content(content, page, policy))?;

        let documents: Vec<AnswerDocument> = grouped
            .into_iter()
            .zip(wiki)
            .filter_map(|((page, qb_content), wiki)| {
                wiki.map(|wiki_content| AnswerDocument {
                    is_human: is_human(human_map, &page),
                    page,
                    qb_content,
                    wiki_content,
                })
            })
            .collect();
        Ok(documents)
    }
}

impl Guesser for IrGuesser {
    fn targets() -> Vec<&'static str> {
        vec![IS_HUMAN_MODEL_TARGET]
    }

    fn train(&mut self, data: &TrainingData) -> Result<()> {
        if data.is_empty() {
            bail!("No training questions for the IR guesser");
        }
        let answers: BTreeSet<String> = data.answers.iter().map(|a| normalize_page(a)).collect();

        tracing::info!("Training is_human model...");
        let instance_of = create_instance_of_map(self.types.as_ref(), &answers);
        let human_map   = create_is_human_map(&instance_of);
        let (x, y)      = format_human_data(&human_map, data);
        let classifier  = HumanClassifier::fit(&x, &y)?;

        tracing::info!("Building search index...");
        let documents = self.build_documents(data, &human_map)?;
        let n_human   = documents.iter().filter(|d| d.is_human).count();
        self.client.build(&documents)?;
        tracing::info!(
            "Indexed {} answers ({} human, {} other)",
            documents.len(),
            n_human,
            documents.len() - n_human
        );

        self.classifier = Some(Broadcast::new(classifier));
        Ok(())
    }

    fn guess(&self, questions: &[String], max_n_guesses: usize) -> Result<Vec<Vec<Guess>>> {
        let classifier = self.classifier.clone().ok_or(GuesserError::ModelNotInitialized)?;
        let executor   = ParallelExecutor::new(self.config.n_cores)?;
        let client     = &self.client;
        tracing::info!(
            "Searching {} questions on {} workers",
            questions.len(),
            executor.n_workers()
        );

        let results = executor.try_map(questions, |query| {
            let human = classifier.value().predict(query);
            let mut hits = client.search(query, human, max_n_guesses)?;
            hits.truncate(max_n_guesses);
            Ok::<_, GuesserError>(hits)
        })?;
        Ok(results)
    }

    fn save(&self, directory: &Path) -> Result<()> {
        let classifier = self.classifier.as_ref().ok_or(GuesserError::ModelNotInitialized)?;
        classifier.save(directory)?;
        tracing::info!(
            "Saved IR guesser to '{}' (index stays at '{}')",
            directory.display(),
            self.client.path().display()
        );
        Ok(())
    }
}
