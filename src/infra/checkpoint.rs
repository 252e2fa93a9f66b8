// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Saves and restores RNN weights with Burn's named MessagePack
// recorder (gzip-compressed, full precision so a save/load cycle
// reproduces the same probabilities).
//
// Weights are a separate artifact from the parameter blob:
//   <dir>/final_rnn.mpk.gz    ← network weights
//   <dir>/rnn_params.json     ← everything needed to rebuild the
//                               network before loading weights
//
// Training writes weights to a staging directory; save() on the
// guesser promotes (copies) them next to the parameter blob.
//
// Reference: Burn Book §5 (Records and Checkpointing)

use std::{fs, path::{Path, PathBuf}};

use anyhow::{Context, Result};
use burn::{
    prelude::*,
    record::{FullPrecisionSettings, NamedMpkGzFileRecorder, Recorder},
};

use crate::domain::error::GuesserError;
use crate::ml::model::RnnClassifier;

/// Weights file stem; the recorder adds the extension
pub const RNN_MODEL_TARGET: &str = "final_rnn";
const WEIGHTS_EXTENSION: &str = "mpk.gz";

type WeightsRecorder = NamedMpkGzFileRecorder<FullPrecisionSettings>;

/// Reads and writes the weights artifact inside one directory.
pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Full path of the weights file, extension included
    pub fn weights_path(&self) -> PathBuf {
        self.dir.join(format!("{RNN_MODEL_TARGET}.{WEIGHTS_EXTENSION}"))
    }

    pub fn save_model<B: Backend>(&self, model: &RnnClassifier<B>) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Cannot create '{}'", self.dir.display()))?;
        let stem = self.dir.join(RNN_MODEL_TARGET);

        WeightsRecorder::new()
            .record(model.clone().into_record(), stem.clone())
            .with_context(|| format!("Failed to save weights to '{}'", stem.display()))?;

        tracing::debug!("Saved weights to '{}'", self.weights_path().display());
        Ok(())
    }

    /// Load weights into `model`, which must have the saved architecture
    pub fn load_model<B: Backend>(
        &self,
        model:  RnnClassifier<B>,
        device: &B::Device,
    ) -> Result<RnnClassifier<B>, GuesserError> {
        let path = self.weights_path();
        if !path.exists() {
            return Err(GuesserError::ArtifactMissing { path });
        }

        let record = WeightsRecorder::new()
            .load(self.dir.join(RNN_MODEL_TARGET), device)
            .map_err(|e| GuesserError::artifact_corrupt(&path, e))?;

        tracing::info!("Loaded weights from '{}'", path.display());
        Ok(model.load_record(record))
    }

    /// Copy the weights file into `target_dir`
    pub fn promote_to(&self, target_dir: &Path) -> Result<()> {
        let source = self.weights_path();
        if !source.exists() {
            return Err(GuesserError::ArtifactMissing { path: source }.into());
        }
        let target = CheckpointManager::new(target_dir).weights_path();
        if target == source {
            return Ok(());
        }
        fs::create_dir_all(target_dir)
            .with_context(|| format!("Cannot create '{}'", target_dir.display()))?;
        fs::copy(&source, &target).with_context(|| {
            format!("Cannot copy '{}' to '{}'", source.display(), target.display())
        })?;

        tracing::info!("Promoted weights to '{}'", target.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use burn::tensor::TensorData;

    use crate::ml::model::{CellType, RnnClassifierConfig};

    fn outputs(model: &RnnClassifier<NdArray>) -> Vec<f32> {
        let device = Default::default();
        let tokens = Tensor::<NdArray, 2, Int>::from_data(TensorData::new(vec![2i64, 3], [1, 2]), &device);
        let last   = Tensor::<NdArray, 2>::from_data(TensorData::new(vec![0.0f32, 1.0], [1, 2]), &device);
        model.forward_proba(tokens, last).unwrap().into_data().to_vec().unwrap()
    }

    #[test]
    fn test_save_promote_load() {
        let staging = tempfile::tempdir().unwrap();
        let target  = tempfile::tempdir().unwrap();
        let device  = Default::default();
        let config  = RnnClassifierConfig::new(CellType::Gru, 5, 3, 4, 2);

        let model: RnnClassifier<NdArray> = config.init(&device);
        let ckpt = CheckpointManager::new(staging.path());
        ckpt.save_model(&model).unwrap();
        ckpt.promote_to(target.path()).unwrap();

        let fresh: RnnClassifier<NdArray> = config.init(&device);
        let loaded = CheckpointManager::new(target.path()).load_model(fresh, &device).unwrap();
        assert_eq!(outputs(&model), outputs(&loaded));
    }

    #[test]
    fn test_missing_weights() {
        let dir    = tempfile::tempdir().unwrap();
        let device = Default::default();
        let model: RnnClassifier<NdArray> =
            RnnClassifierConfig::new(CellType::Lstm, 5, 3, 4, 2).init(&device);
        let err = CheckpointManager::new(dir.path()).load_model(model, &device).unwrap_err();
        assert!(matches!(err, GuesserError::ArtifactMissing { .. }));
    }

    #[test]
    fn test_corrupt_weights() {
        let dir = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path());
        fs::write(ckpt.weights_path(), b"garbage").unwrap();
        let device = Default::default();
        let model: RnnClassifier<NdArray> =
            RnnClassifierConfig::new(CellType::Lstm, 5, 3, 4, 2).init(&device);
        let err = ckpt.load_model(model, &device).unwrap_err();
        assert!(matches!(err, GuesserError::ArtifactCorrupt { .. }));
    }
}
