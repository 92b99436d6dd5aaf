//! Duration dataset built from a frame alignment corpus.

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use tracing::{debug, info};

use crate::corpus::compress::SequenceCompressor;
use crate::error::{CadenzaError, Result};
use crate::types::{AlignmentLine, CompressedSequence};

/// Indexed collection of compressed utterances.
///
/// Utterances that are entirely silence are dropped while loading, so every
/// retained entry has at least one (label, duration) run.
#[derive(Debug, Clone, Default)]
pub struct DurationDataset {
    items: Vec<CompressedSequence>,
    dropped: usize,
}

impl DurationDataset {
    /// Build a dataset from raw corpus lines.
    pub fn from_lines<I, S>(lines: I, compressor: &SequenceCompressor) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut items = Vec::new();
        let mut dropped = 0;

        for (idx, line) in lines.into_iter().enumerate() {
            let Some(alignment) = AlignmentLine::parse(idx + 1, line.as_ref())? else {
                continue;
            };

            match compressor.compress_line(&alignment) {
                Some(seq) => items.push(seq),
                None => {
                    debug!(id = %alignment.id, "dropping utterance without speech frames");
                    dropped += 1;
                }
            }
        }

        info!(retained = items.len(), dropped, "loaded duration dataset");
        Ok(Self { items, dropped })
    }

    /// Build a dataset from any reader producing corpus text.
    pub fn from_reader<R: Read>(reader: R, compressor: &SequenceCompressor) -> Result<Self> {
        let lines = BufReader::new(reader)
            .lines()
            .collect::<std::io::Result<Vec<_>>>()?;
        Self::from_lines(lines, compressor)
    }

    /// Load a corpus file with the standard silence label.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_file_with(path, &SequenceCompressor::new())
    }

    pub fn from_file_with<P: AsRef<Path>>(path: P, compressor: &SequenceCompressor) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        Self::from_reader(file, compressor)
    }

    /// Number of retained utterances.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of utterances discarded because they held only silence.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// Get the `index`-th utterance.
    pub fn get(&self, index: usize) -> Result<&CompressedSequence> {
        self.items.get(index).ok_or(CadenzaError::IndexOutOfRange {
            index,
            len: self.items.len(),
        })
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CompressedSequence> {
        self.items.iter()
    }

    /// Utterance identifiers in dataset order.
    pub fn ids(&self) -> impl Iterator<Item = &str> + '_ {
        self.items.iter().map(|seq| seq.id.as_str())
    }

    /// Largest phone label present, used to size embedding tables.
    pub fn max_phone(&self) -> Option<u32> {
        self.items
            .iter()
            .flat_map(|seq| seq.labels().iter().copied())
            .max()
    }
}

impl<'a> IntoIterator for &'a DurationDataset {
    type Item = &'a CompressedSequence;
    type IntoIter = std::slice::Iter<'a, CompressedSequence>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CORPUS: &str = "utt1 1 1 2 2 2 1 1 3 1 1\nutt2 1 1 1\nutt3 4 4 5\n\n";

    #[test]
    fn test_load_from_text() {
        let dataset = DurationDataset::from_reader(CORPUS.as_bytes(), &SequenceCompressor::new())
            .unwrap();

        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.dropped(), 1);

        let first = dataset.get(0).unwrap();
        assert_eq!(first.labels(), &[2, 1, 3]);
        assert_eq!(first.durations(), &[3, 2, 1]);

        let second = dataset.get(1).unwrap();
        assert_eq!(second.id, "utt3");
        assert_eq!(second.labels(), &[4, 5]);
        assert_eq!(second.durations(), &[2, 1]);

        let ids: Vec<_> = dataset.ids().collect();
        assert_eq!(ids, vec!["utt1", "utt3"]);
    }

    #[test]
    fn test_all_silence_line_does_not_count() {
        let with = DurationDataset::from_lines(["utt1 2 3", "utt2 1 1 1"], &SequenceCompressor::new())
            .unwrap();
        let without = DurationDataset::from_lines(["utt1 2 3"], &SequenceCompressor::new()).unwrap();
        assert_eq!(with.len(), without.len());
    }

    #[test]
    fn test_id_without_frames_is_dropped() {
        let dataset = DurationDataset::from_lines(["utt1", "utt2 3"], &SequenceCompressor::new())
            .unwrap();
        assert_eq!(dataset.len(), 1);
        assert_eq!(dataset.dropped(), 1);
    }

    #[test]
    fn test_get_out_of_range() {
        let dataset = DurationDataset::from_lines(["utt1 2 3"], &SequenceCompressor::new()).unwrap();
        let err = dataset.get(1).unwrap_err();
        assert!(matches!(
            err,
            CadenzaError::IndexOutOfRange { index: 1, len: 1 }
        ));
    }

    #[test]
    fn test_malformed_line_reports_line_number() {
        let err = DurationDataset::from_lines(["utt1 2 3", "", "utt3 2 x"], &SequenceCompressor::new())
            .unwrap_err();
        assert!(matches!(err, CadenzaError::MalformedLine { line: 3, .. }));
    }

    #[test]
    fn test_max_phone() {
        let dataset = DurationDataset::from_reader(CORPUS.as_bytes(), &SequenceCompressor::new())
            .unwrap();
        assert_eq!(dataset.max_phone(), Some(5));
        assert_eq!(DurationDataset::default().max_phone(), None);
    }

    #[test]
    fn test_missing_file() {
        let err = DurationDataset::from_file("/nonexistent/cadenza/corpus.txt").unwrap_err();
        assert!(matches!(err, CadenzaError::Io(_)));
    }
}
