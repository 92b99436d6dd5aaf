//! Training configuration.

use std::path::{Path, PathBuf};

use candle_core::Device;
use cadenza_core::{CadenzaError, Result};
use serde::{Deserialize, Serialize};

use crate::loss::LossKind;

/// Learning-rate schedule selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleKind {
    /// Inverse square-root decay with linear warmup.
    Noam,
    /// Fixed learning rate.
    Constant,
}

/// Configuration for a duration model training run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainerConfig {
    // === Data ===
    /// Training alignment corpus
    pub train_file: PathBuf,
    /// Validation alignment corpus
    pub dev_file: PathBuf,
    /// Batch capacity; longer utterances are truncated (default: 100)
    pub max_len: usize,
    /// Utterances per batch (default: 16)
    pub batch_size: usize,
    /// Shuffle training batches each epoch (default: true)
    pub shuffle: bool,
    /// Seed for batch shuffling (default: 42)
    pub seed: u64,

    // === Optimization ===
    /// Number of epochs (default: 100)
    pub epochs: usize,
    /// Global gradient norm threshold, 0 disables clipping (default: 1.0)
    pub gradclip: f64,
    /// Learning rate (default: 1.0).
    ///
    /// Under the Noam schedule this is a scale on
    /// `d_model^-0.5 * min(step^-0.5, step * warmup^-1.5)`, so the default
    /// peaks near 1e-3 at `warmup_steps`. Under the constant schedule it is
    /// used as is.
    pub learning_rate: f64,
    pub lr_schedule: ScheduleKind,
    /// Noam warmup steps (default: 4000)
    pub warmup_steps: usize,
    /// Noam model dimension (default: 256)
    pub d_model: usize,
    pub loss: LossKind,

    // === Model ===
    /// Phone embedding table size (default: 128)
    pub phone_vocab: usize,
    pub hidden_size: usize,
    /// Dropout after the hidden layer, training only (default: 0.1)
    pub dropout: f32,
    /// Weights to load before training
    pub init_model: Option<PathBuf>,

    // === Logging ===
    /// Training progress line every N steps (default: 10000)
    pub train_log_every: usize,
    /// Validation progress line every N steps (default: 1000)
    pub eval_log_every: usize,
    /// JSON-lines scalar log
    pub metrics_file: Option<PathBuf>,

    // === Checkpointing ===
    pub checkpoint_dir: PathBuf,
    /// Save an epoch checkpoint every N epochs, 0 keeps only `best` (default: 1)
    pub save_every: usize,

    /// `cpu`, `cuda[:N]` or `metal[:N]` (default: cpu)
    pub device: String,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            train_file: PathBuf::from("data/train_duration.txt"),
            dev_file: PathBuf::from("data/dev_duration.txt"),
            max_len: 100,
            batch_size: 16,
            shuffle: true,
            seed: 42,

            epochs: 100,
            gradclip: 1.0,
            learning_rate: 1.0,
            lr_schedule: ScheduleKind::Noam,
            warmup_steps: 4000,
            d_model: 256,
            loss: LossKind::L1,

            phone_vocab: 128,
            hidden_size: 256,
            dropout: 0.1,
            init_model: None,

            train_log_every: 10_000,
            eval_log_every: 1_000,
            metrics_file: None,

            checkpoint_dir: PathBuf::from("exp"),
            save_every: 1,

            device: "cpu".to_string(),
        }
    }
}

impl TrainerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a JSON config file; missing fields take their defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn with_train_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.train_file = path.into();
        self
    }

    pub fn with_dev_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.dev_file = path.into();
        self
    }

    pub fn with_max_len(mut self, max_len: usize) -> Self {
        self.max_len = max_len;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_epochs(mut self, epochs: usize) -> Self {
        self.epochs = epochs;
        self
    }

    pub fn with_gradclip(mut self, gradclip: f64) -> Self {
        self.gradclip = gradclip;
        self
    }

    pub fn with_learning_rate(mut self, lr: f64) -> Self {
        self.learning_rate = lr;
        self
    }

    pub fn with_schedule(mut self, schedule: ScheduleKind) -> Self {
        self.lr_schedule = schedule;
        self
    }

    pub fn with_checkpoint_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.checkpoint_dir = dir.into();
        self
    }

    pub fn with_device(mut self, device: impl Into<String>) -> Self {
        self.device = device.into();
        self
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: &str| Err(CadenzaError::InvalidConfig(msg.to_string()));

        if self.max_len == 0 {
            return invalid("max_len must be positive");
        }
        if self.batch_size == 0 {
            return invalid("batch_size must be positive");
        }
        if self.epochs == 0 {
            return invalid("epochs must be positive");
        }
        if !self.gradclip.is_finite() || self.gradclip < 0.0 {
            return invalid("gradclip must be a finite value >= 0");
        }
        if !self.learning_rate.is_finite() || self.learning_rate <= 0.0 {
            return invalid("learning_rate must be a finite positive value");
        }
        if self.lr_schedule == ScheduleKind::Noam && (self.warmup_steps == 0 || self.d_model == 0)
        {
            return invalid("noam schedule needs positive warmup_steps and d_model");
        }
        if self.phone_vocab == 0 || self.hidden_size == 0 {
            return invalid("phone_vocab and hidden_size must be positive");
        }
        if !(0.0..1.0).contains(&self.dropout) {
            return invalid("dropout must be in [0, 1)");
        }
        if self.train_log_every == 0 || self.eval_log_every == 0 {
            return invalid("log intervals must be positive");
        }
        parse_device(&self.device).map(|_| ())
    }

    /// Resolve the configured compute device.
    pub fn device(&self) -> Result<Device> {
        let spec = parse_device(&self.device)?;
        let device = match spec {
            DeviceSpec::Cpu => Device::Cpu,
            DeviceSpec::Cuda(ordinal) => Device::cuda_if_available(ordinal)?,
            DeviceSpec::Metal(ordinal) => Device::new_metal(ordinal)?,
        };
        Ok(device)
    }
}

/// Parsed form of a device string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceSpec {
    Cpu,
    Cuda(usize),
    Metal(usize),
}

/// Parse `cpu`, `cuda`, `cuda:N`, `metal` or `metal:N`.
pub fn parse_device(spec: &str) -> Result<DeviceSpec> {
    let spec = spec.trim().to_lowercase();
    let (kind, ordinal) = match spec.split_once(':') {
        Some((kind, ordinal)) => {
            let ordinal = ordinal.parse::<usize>().map_err(|_| {
                CadenzaError::InvalidConfig(format!("bad device ordinal in {spec:?}"))
            })?;
            (kind.to_string(), ordinal)
        }
        None => (spec.clone(), 0),
    };

    match kind.as_str() {
        "cpu" => Ok(DeviceSpec::Cpu),
        "cuda" | "gpu" => Ok(DeviceSpec::Cuda(ordinal)),
        "metal" | "mps" => Ok(DeviceSpec::Metal(ordinal)),
        _ => Err(CadenzaError::InvalidConfig(format!(
            "unknown device {spec:?}"
        ))),
    }
}
