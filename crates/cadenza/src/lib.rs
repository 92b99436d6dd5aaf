//! # Cadenza
//!
//! Phone duration modeling for speech synthesis: alignment compression,
//! padded batching and the training loop, re-exported from
//! [`cadenza_core`] and [`cadenza_trainer`].
pub use cadenza_core;
pub use cadenza_trainer;

pub use cadenza_core::{
    CadenzaError, CompressedSequence, DurationCollator, DurationDataset, PaddedBatch, Result,
    SequenceCompressor,
};
pub use cadenza_trainer::{run_training, TrainerConfig};
