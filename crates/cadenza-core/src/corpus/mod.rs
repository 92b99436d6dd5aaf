pub mod compress;
pub mod dataset;

pub use compress::SequenceCompressor;
pub use dataset::DurationDataset;
