use thiserror::Error;

/// Errors that can occur while building or consuming duration data.
#[derive(Debug, Error)]
pub enum CadenzaError {
    /// A corpus line carried a frame token that is not an integer label.
    #[error("malformed alignment on line {line}: {token:?} is not a frame label")]
    MalformedLine {
        /// 1-based line number in the corpus.
        line: usize,
        /// The offending token.
        token: String,
    },

    /// Dataset access beyond the number of retained utterances.
    #[error("index {index} out of range for dataset of length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    /// A batch example had no entries, so its mean duration is undefined.
    #[error("batch example {index} has no entries")]
    EmptyExample { index: usize },

    /// A raw batch pair whose label and duration sequences differ in length.
    #[error("batch example {index} has {labels} labels but {durations} durations")]
    MismatchedPair {
        index: usize,
        labels: usize,
        durations: usize,
    },

    /// Runs that break the compressed-sequence invariants.
    #[error("invalid sequence {id:?}: {reason}")]
    InvalidSequence { id: String, reason: String },

    /// A batch with no examples was handed to the collator.
    #[error("cannot collate an empty batch")]
    EmptyBatch,

    /// A configuration value failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Corpus or checkpoint file I/O failed.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// Tensor, model, criterion or optimizer failure.
    #[error("tensor error: {0}")]
    Candle(#[from] candle_core::Error),

    /// JSON encoding or decoding failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for Cadenza operations.
pub type Result<T> = std::result::Result<T, CadenzaError>;
