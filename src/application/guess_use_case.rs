// ============================================================
// Layer 2 — GuessUseCase
// ============================================================
// Loads a trained guesser from its output directory and ranks
// answers for a batch of questions.
//
//   IR  : is_human_model.json + the named index
//   RNN : rnn_params.json + final_rnn.mpk.gz

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::domain::answer::Guess;
use crate::domain::traits::Guesser;
use crate::ir::guesser::{IrGuesser, IrGuesserConfig};
use crate::ml::guesser::RnnGuesser;

pub struct GuessUseCase {
    guesser:   Box<dyn Guesser>,
    model_dir: PathBuf,
}

impl GuessUseCase {
    pub fn load_ir(model_dir: &Path, config: IrGuesserConfig) -> Result<Self> {
        let guesser = IrGuesser::load(model_dir, config)
            .with_context(|| format!("Cannot load IR guesser from '{}'", model_dir.display()))?;
        Ok(Self { guesser: Box::new(guesser), model_dir: model_dir.to_path_buf() })
    }

    pub fn load_rnn(model_dir: &Path) -> Result<Self> {
        let guesser = RnnGuesser::load(model_dir)
            .with_context(|| format!("Cannot load RNN guesser from '{}'", model_dir.display()))?;
        Ok(Self { guesser: Box::new(guesser), model_dir: model_dir.to_path_buf() })
    }

    /// One ranked list per question, in question order
    pub fn guess(&self, questions: &[String], max_n_guesses: usize) -> Result<Vec<Vec<Guess>>> {
        tracing::info!("Guessing with the model in '{}'", self.model_dir.display());
        let guesses = self.guesser.guess(questions, max_n_guesses)?;
        for (q, g) in questions.iter().zip(&guesses) {
            tracing::debug!("{:?} → {:?}", q, g.first().map(|g| g.page.as_str()));
        }
        Ok(guesses)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::GuesserError;
    use crate::domain::question::TrainingData;
    use crate::ir::knowledge_base::KnowledgeBase;

    #[test]
    fn test_ir_round_trip_through_use_case() {
        let dir    = tempfile::tempdir().unwrap();
        let config = IrGuesserConfig { index_dir: dir.path().join("index"), n_cores: 2, ..Default::default() };
        let data = TrainingData::new(
            vec![vec!["french emperor".into()], vec!["greek philosopher".into()]],
            vec!["Napoleon".into(), "Plato".into()],
        );
        let kb = KnowledgeBase::from_entries(vec![("Napoleon", vec!["Human"]), ("Plato", vec!["Human"])]);
        let mut g = IrGuesser::new(config.clone()).with_types(kb);
        g.train(&data).unwrap();
        g.save(&dir.path().join("model")).unwrap();
        drop(g);

        let uc  = GuessUseCase::load_ir(&dir.path().join("model"), config).unwrap();
        let out = uc.guess(&["emperor".into(), "unrelated".into()], 3).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0][0].page, "napoleon");
        assert!(out[1].is_empty());
    }

    #[test]
    fn test_missing_model_dir() {
        let dir = tempfile::tempdir().unwrap();
        let err = GuessUseCase::load_rnn(dir.path()).err().unwrap();
        assert!(matches!(
            err.downcast_ref::<GuesserError>(),
            Some(GuesserError::ArtifactMissing { .. })
        ));
    }
}
