//! # Cadenza Core
//!
//! Data pipeline for phone duration models. Converts frame-level alignments
//! into run-length encoded (phone, duration) sequences, indexes them as a
//! dataset and collates them into fixed-capacity padded tensors.
//!
//! ## Quick Start
//!
//! ```rust
//! use cadenza_core::{DurationCollator, DurationDataset, SequenceCompressor};
//!
//! let corpus = ["utt1 1 1 2 2 2 1 1 3 1 1", "utt2 1 1 1"];
//! let dataset = DurationDataset::from_lines(corpus, &SequenceCompressor::new()).unwrap();
//! assert_eq!(dataset.len(), 1);
//!
//! let collator = DurationCollator::new(5).unwrap();
//! let batch = collator.collate(&[dataset.get(0).unwrap()]).unwrap();
//! assert_eq!(batch.phones.dims(), &[1, 5]);
//! ```
pub mod batch;
pub mod corpus;
pub mod error;
pub mod types;

// Re-export primary API
pub use batch::{padding_mask, padding_mask_from_lengths, DurationCollator, PaddedBatch};
pub use corpus::{DurationDataset, SequenceCompressor};
pub use error::{CadenzaError, Result};
pub use types::{AlignmentLine, CompressedSequence, SILENCE_LABEL};
