use serde::{Deserialize, Serialize};

use crate::error::{CadenzaError, Result};

/// Run-length compressed phone sequence of one utterance.
///
/// `labels` and `durations` are parallel: `durations[i]` is the number of
/// consecutive frames that carried `labels[i]`. Adjacent labels always
/// differ and every duration is at least one frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawSequence")]
pub struct CompressedSequence {
    pub id: String,
    labels: Vec<u32>,
    durations: Vec<u32>,
}

#[derive(Deserialize)]
struct RawSequence {
    id: String,
    labels: Vec<u32>,
    durations: Vec<u32>,
}

impl TryFrom<RawSequence> for CompressedSequence {
    type Error = CadenzaError;

    fn try_from(raw: RawSequence) -> Result<Self> {
        Self::new(raw.id, raw.labels, raw.durations)
    }
}

impl CompressedSequence {
    /// Build from externally produced runs, checking the run invariants.
    pub fn new(id: impl Into<String>, labels: Vec<u32>, durations: Vec<u32>) -> Result<Self> {
        let id = id.into();
        let invalid = |reason: &str| {
            Err(CadenzaError::InvalidSequence {
                id: id.clone(),
                reason: reason.to_string(),
            })
        };

        if labels.len() != durations.len() {
            return invalid("labels and durations differ in length");
        }
        if labels.is_empty() {
            return invalid("no runs");
        }
        if durations.contains(&0) {
            return invalid("zero-length run");
        }
        if labels.windows(2).any(|w| w[0] == w[1]) {
            return invalid("adjacent runs share a label");
        }

        Ok(Self::from_parts(id, labels, durations))
    }

    /// Build from runs produced by the compressor.
    pub(crate) fn from_parts(id: String, labels: Vec<u32>, durations: Vec<u32>) -> Self {
        debug_assert_eq!(labels.len(), durations.len());
        Self {
            id,
            labels,
            durations,
        }
    }

    pub fn labels(&self) -> &[u32] {
        &self.labels
    }

    pub fn durations(&self) -> &[u32] {
        &self.durations
    }

    /// Number of (label, duration) runs.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Iterate over `(label, duration)` runs.
    pub fn runs(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.labels.iter().copied().zip(self.durations.iter().copied())
    }

    /// Total number of frames covered by the runs.
    pub fn total_frames(&self) -> u64 {
        self.durations.iter().map(|&d| u64::from(d)).sum()
    }

    /// Mean run length in frames, `None` when there are no runs.
    pub fn mean_duration(&self) -> Option<f64> {
        if self.is_empty() {
            return None;
        }
        Some(self.total_frames() as f64 / self.len() as f64)
    }

    /// Expand back to one label per frame.
    pub fn expand(&self) -> Vec<u32> {
        self.runs()
            .flat_map(|(label, duration)| std::iter::repeat_n(label, duration as usize))
            .collect()
    }
}
