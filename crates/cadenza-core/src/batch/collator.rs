//! Fixed-capacity batch collation for duration training.

use candle_core::{Device, Tensor};

use crate::error::{CadenzaError, Result};
use crate::types::CompressedSequence;

/// A collated batch of `B` utterances padded to capacity `L`.
#[derive(Debug, Clone)]
pub struct PaddedBatch {
    /// Phone labels `[B, L]`, `u32`, zero padded.
    pub phones: Tensor,
    /// Mean duration of each example's kept prefix `[B, 1, 1]`, `f32`.
    pub mean: Tensor,
    /// Target durations `[B, L]`, `f32`, zero padded.
    pub durations: Tensor,
    /// Original example lengths before truncation `[B]`, `u32`.
    pub lengths: Tensor,
    /// Capacity `L` the batch was padded to.
    pub max_len: usize,
}

impl PaddedBatch {
    /// Number of examples in the batch.
    pub fn batch_size(&self) -> usize {
        self.phones.dims().first().copied().unwrap_or(0)
    }

    /// Move every tensor to `device`.
    pub fn to_device(&self, device: &Device) -> Result<Self> {
        Ok(Self {
            phones: self.phones.to_device(device)?,
            mean: self.mean.to_device(device)?,
            durations: self.durations.to_device(device)?,
            lengths: self.lengths.to_device(device)?,
            max_len: self.max_len,
        })
    }
}

/// Pads variable-length (labels, durations) pairs to a fixed capacity.
///
/// Examples longer than `max_len` are truncated; their reported length
/// stays the original one and masking clips it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DurationCollator {
    max_len: usize,
}

impl DurationCollator {
    pub fn new(max_len: usize) -> Result<Self> {
        if max_len == 0 {
            return Err(CadenzaError::InvalidConfig(
                "max_len must be positive".into(),
            ));
        }
        Ok(Self { max_len })
    }

    pub fn max_len(&self) -> usize {
        self.max_len
    }

    /// Collate a batch of sequences on the host.
    pub fn collate(&self, batch: &[&CompressedSequence]) -> Result<PaddedBatch> {
        let pairs: Vec<(&[u32], &[u32])> = batch
            .iter()
            .map(|seq| (seq.labels(), seq.durations()))
            .collect();
        self.collate_pairs(&pairs)
    }

    /// Collate raw `(labels, durations)` pairs on the host.
    pub fn collate_pairs(&self, batch: &[(&[u32], &[u32])]) -> Result<PaddedBatch> {
        if batch.is_empty() {
            return Err(CadenzaError::EmptyBatch);
        }

        let batch_size = batch.len();
        let max_len = self.max_len;

        let mut phones = vec![0u32; batch_size * max_len];
        let mut durations = vec![0f32; batch_size * max_len];
        let mut means = Vec::with_capacity(batch_size);
        let mut lengths = Vec::with_capacity(batch_size);

        for (i, (labels, durs)) in batch.iter().enumerate() {
            let true_len = labels.len();
            if durs.len() != true_len {
                return Err(CadenzaError::MismatchedPair {
                    index: i,
                    labels: true_len,
                    durations: durs.len(),
                });
            }
            let kept = true_len.min(max_len);
            if kept == 0 {
                return Err(CadenzaError::EmptyExample { index: i });
            }

            let row = i * max_len;
            phones[row..row + kept].copy_from_slice(&labels[..kept]);
            for (dst, &d) in durations[row..row + kept].iter_mut().zip(&durs[..kept]) {
                *dst = d as f32;
            }

            let sum: f64 = durs[..kept].iter().map(|&d| f64::from(d)).sum();
            means.push((sum / kept as f64) as f32);
            lengths.push(true_len as u32);
        }

        let device = Device::Cpu;
        Ok(PaddedBatch {
            phones: Tensor::from_vec(phones, (batch_size, max_len), &device)?,
            mean: Tensor::from_vec(means, (batch_size, 1, 1), &device)?,
            durations: Tensor::from_vec(durations, (batch_size, max_len), &device)?,
            lengths: Tensor::from_vec(lengths, batch_size, &device)?,
            max_len,
        })
    }
}
