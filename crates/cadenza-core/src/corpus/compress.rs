//! # Sequence Compressor
//!
//! Turns frame-level alignments into run-length encoded phone sequences.
//! Silence at the utterance boundaries is trimmed before encoding; silence
//! inside the utterance is kept as a regular phone.

use crate::types::{AlignmentLine, CompressedSequence, SILENCE_LABEL};

/// Run-length compressor with boundary silence trimming.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequenceCompressor {
    silence: u32,
}

impl Default for SequenceCompressor {
    fn default() -> Self {
        Self {
            silence: SILENCE_LABEL,
        }
    }
}

impl SequenceCompressor {
    /// Create a compressor using the standard silence label.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a different label as boundary silence.
    pub fn with_silence_label(mut self, silence: u32) -> Self {
        self.silence = silence;
        self
    }

    pub fn silence_label(&self) -> u32 {
        self.silence
    }

    /// Strip leading and trailing silence frames.
    ///
    /// Returns an empty slice when every frame is silence.
    pub fn trim<'a>(&self, frames: &'a [u32]) -> &'a [u32] {
        let Some(start) = frames.iter().position(|&f| f != self.silence) else {
            return &[];
        };
        // A non-silence frame exists at `start`, so the reverse search hits.
        let end = frames
            .iter()
            .rposition(|&f| f != self.silence)
            .unwrap_or(start);
        &frames[start..=end]
    }

    /// Merge consecutive equal labels into `(labels, durations)`.
    pub fn encode(&self, frames: &[u32]) -> (Vec<u32>, Vec<u32>) {
        let mut labels: Vec<u32> = Vec::new();
        let mut durations: Vec<u32> = Vec::new();

        for &frame in frames {
            if labels.last() == Some(&frame) {
                if let Some(count) = durations.last_mut() {
                    *count += 1;
                }
            } else {
                labels.push(frame);
                durations.push(1);
            }
        }

        (labels, durations)
    }

    /// Compress a raw frame sequence.
    ///
    /// Returns `None` when nothing but silence remains, in which case the
    /// utterance must be skipped.
    ///
    /// # Examples
    /// ```
    /// use cadenza_core::corpus::SequenceCompressor;
    ///
    /// let compressor = SequenceCompressor::new();
    /// let seq = compressor.compress("utt1", &[1, 1, 2, 2, 2, 1, 1, 3, 1, 1]).unwrap();
    /// assert_eq!(seq.labels(), &[2, 1, 3]);
    /// assert_eq!(seq.durations(), &[3, 2, 1]);
    ///
    /// assert!(compressor.compress("utt2", &[1, 1, 1]).is_none());
    /// ```
    pub fn compress(&self, id: &str, frames: &[u32]) -> Option<CompressedSequence> {
        let trimmed = self.trim(frames);
        if trimmed.is_empty() {
            return None;
        }

        let (labels, durations) = self.encode(trimmed);
        Some(CompressedSequence::from_parts(
            id.to_string(),
            labels,
            durations,
        ))
    }

    /// Compress a parsed corpus line.
    pub fn compress_line(&self, line: &AlignmentLine) -> Option<CompressedSequence> {
        self.compress(&line.id, &line.frames)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check_invariants(frames: &[u32], seq: &CompressedSequence) {
        let compressor = SequenceCompressor::new();
        let trimmed = compressor.trim(frames);
        assert_eq!(seq.labels().len(), seq.durations().len());
        assert_eq!(seq.total_frames(), trimmed.len() as u64);
        assert!(seq.labels().windows(2).all(|w| w[0] != w[1]));
        assert!(seq.durations().iter().all(|&d| d > 0));
        assert_eq!(seq.expand(), trimmed);
    }

    #[test]
    fn test_compress_scenario() {
        let compressor = SequenceCompressor::new();
        let frames = [1, 1, 2, 2, 2, 1, 1, 3, 1, 1];
        let seq = compressor.compress("utt1", &frames).unwrap();

        assert_eq!(seq.id, "utt1");
        assert_eq!(seq.labels(), &[2, 1, 3]);
        assert_eq!(seq.durations(), &[3, 2, 1]);
        check_invariants(&frames, &seq);
    }

    #[test]
    fn test_all_silence_is_dropped() {
        let compressor = SequenceCompressor::new();
        assert!(compressor.compress("utt2", &[1, 1, 1]).is_none());
        assert!(compressor.compress("utt3", &[1]).is_none());
        assert!(compressor.compress("utt4", &[]).is_none());
    }

    #[test]
    fn test_single_speech_frame_between_silence() {
        let compressor = SequenceCompressor::new();
        let seq = compressor.compress("utt", &[1, 1, 5, 1]).unwrap();
        assert_eq!(seq.labels(), &[5]);
        assert_eq!(seq.durations(), &[1]);
    }

    #[test]
    fn test_no_silence_to_trim() {
        let compressor = SequenceCompressor::new();
        let frames = [4, 4, 7, 7, 7, 4];
        let seq = compressor.compress("utt", &frames).unwrap();
        assert_eq!(seq.labels(), &[4, 7, 4]);
        assert_eq!(seq.durations(), &[2, 3, 1]);
        check_invariants(&frames, &seq);
    }

    #[test]
    fn test_inner_silence_is_kept() {
        let compressor = SequenceCompressor::new();
        let frames = [3, 1, 1, 1, 3];
        let seq = compressor.compress("utt", &frames).unwrap();
        assert_eq!(seq.labels(), &[3, 1, 3]);
        assert_eq!(seq.durations(), &[1, 3, 1]);
    }

    #[test]
    fn test_custom_silence_label() {
        let compressor = SequenceCompressor::new().with_silence_label(0);
        let seq = compressor.compress("utt", &[0, 1, 1, 0]).unwrap();
        assert_eq!(seq.labels(), &[1]);
        assert_eq!(seq.durations(), &[2]);
    }

    #[test]
    fn test_invariants_over_varied_inputs() {
        let compressor = SequenceCompressor::new();
        let inputs: [&[u32]; 6] = [
            &[2],
            &[1, 2, 1],
            &[2, 3, 2, 3],
            &[1, 1, 9, 9, 9, 9, 1, 9, 1, 1, 1],
            &[6, 6, 6, 6, 6, 6],
            &[1, 8, 8, 2, 2, 2, 2, 8, 1],
        ];
        for frames in inputs {
            let seq = compressor.compress("utt", frames).unwrap();
            check_invariants(frames, &seq);
        }
    }

    #[test]
    fn test_trim_views() {
        let compressor = SequenceCompressor::new();
        assert_eq!(compressor.trim(&[1, 2, 3, 1]), &[2, 3]);
        assert!(compressor.trim(&[1, 1]).is_empty());
    }
}
