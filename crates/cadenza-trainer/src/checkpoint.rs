//! Checkpoint persistence.

use std::path::{Path, PathBuf};

use candle_nn::VarMap;
use cadenza_core::Result;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Training progress stored next to the weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointState {
    pub epoch: usize,
    /// Optimizer steps completed.
    pub step: usize,
    pub train_loss: f64,
    pub dev_loss: f64,
    pub best_dev_loss: f64,
    pub learning_rate: f64,
}

/// Persists model weights together with a [`CheckpointState`].
pub trait CheckpointWriter {
    /// Write a checkpoint under `dest` (without extension).
    fn save(&self, vars: &VarMap, state: &CheckpointState, dest: &Path) -> Result<()>;
}

/// Writes `<dest>.safetensors` for the weights and `<dest>.json` for the state.
#[derive(Debug, Clone, Copy, Default)]
pub struct SafetensorsCheckpoint;

impl SafetensorsCheckpoint {
    pub fn weights_path(dest: &Path) -> PathBuf {
        dest.with_extension("safetensors")
    }

    pub fn state_path(dest: &Path) -> PathBuf {
        dest.with_extension("json")
    }

    /// Read back the state written by [`CheckpointWriter::save`].
    pub fn load_state(dest: &Path) -> Result<CheckpointState> {
        let content = std::fs::read_to_string(Self::state_path(dest))?;
        Ok(serde_json::from_str(&content)?)
    }
}

impl CheckpointWriter for SafetensorsCheckpoint {
    fn save(&self, vars: &VarMap, state: &CheckpointState, dest: &Path) -> Result<()> {
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let weights = Self::weights_path(dest);
        vars.save(&weights)?;
        std::fs::write(Self::state_path(dest), serde_json::to_string_pretty(state)?)?;

        info!(path = %weights.display(), epoch = state.epoch, "checkpoint saved");
        Ok(())
    }
}

/// Load weights into an already populated `VarMap`.
pub fn load_weights<P: AsRef<Path>>(vars: &mut VarMap, path: P) -> Result<()> {
    vars.load(path.as_ref())?;
    info!(path = %path.as_ref().display(), "loaded model weights");
    Ok(())
}
