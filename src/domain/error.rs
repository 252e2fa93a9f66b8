//! Error kinds both guessers can fail with.

use std::path::PathBuf;

use thiserror::Error;

/// Failures callers may want to tell apart.
///
/// Everything else travels as a plain `anyhow::Error`; these variants
/// can be recovered from an `anyhow::Error` with `downcast_ref`.
#[derive(Debug, Error)]
pub enum GuesserError {
    /// `guess` was called before `train` or `load`.
    #[error("model not initialized: train or load the guesser before calling guess")]
    ModelNotInitialized,

    /// An expected artifact file is not on disk.
    #[error("artifact missing: '{path}'")]
    ArtifactMissing { path: PathBuf },

    /// An artifact exists but could not be read or decoded.
    #[error("artifact corrupt: '{path}': {reason}")]
    ArtifactCorrupt { path: PathBuf, reason: String },

    /// The configured recurrent cell family is not one we can build.
    #[error("rnn_cell must be lstm, gru, or simple_rnn and was: {0}")]
    UnsupportedCell(String),

    /// Reference content exists but could not be read.
    #[error("cannot read reference content '{path}': {reason}")]
    ContentUnreadable { path: PathBuf, reason: String },

    /// Reference content lookup failed and the policy says to fail.
    #[error("no reference content for page '{0}'")]
    MissingContent(String),

    /// Loaded parameters failed field validation.
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    /// The text search service reported an error.
    #[error("search index error: {0}")]
    Index(String),

    /// The network has no recurrent layer of the expected family.
    #[error("model has no {0} recurrent layer")]
    MissingRecurrentLayer(String),

    /// Model output could not be read back as class probabilities.
    #[error("inference output unreadable: {0}")]
    Inference(String),
}

impl GuesserError {
    pub fn artifact_corrupt(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::ArtifactCorrupt { path: path.into(), reason: reason.to_string() }
    }

    pub fn invalid_parameters(message: impl Into<String>) -> Self {
        Self::InvalidParameters(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_problem() {
        let e = GuesserError::UnsupportedCell("transformer".into());
        assert!(e.to_string().contains("transformer"));

        let e = GuesserError::artifact_corrupt("/tmp/x.json", "bad json");
        assert!(e.to_string().contains("/tmp/x.json"));
        assert!(e.to_string().contains("bad json"));
    }

    #[test]
    fn test_downcast_through_anyhow() {
        let err: anyhow::Error = GuesserError::ModelNotInitialized.into();
        assert!(matches!(
            err.downcast_ref::<GuesserError>(),
            Some(GuesserError::ModelNotInitialized)
        ));
    }
}
