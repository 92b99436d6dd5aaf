pub mod collator;
pub mod mask;

pub use collator::{DurationCollator, PaddedBatch};
pub use mask::{padding_mask, padding_mask_from_lengths};
