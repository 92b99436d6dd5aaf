pub mod alignment;
pub mod sequence;

pub use alignment::{AlignmentLine, SILENCE_LABEL};
pub use sequence::CompressedSequence;
