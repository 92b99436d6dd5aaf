//! Batch iteration over a duration dataset.

use cadenza_core::{DurationCollator, DurationDataset, PaddedBatch, Result};

/// Groups dataset entries into collated batches.
///
/// The last batch of an epoch may be short. With shuffling enabled the
/// order is a deterministic function of `(seed, epoch)`.
pub struct BatchLoader<'a> {
    dataset: &'a DurationDataset,
    collator: DurationCollator,
    batch_size: usize,
    shuffle: Option<u64>,
}

impl<'a> BatchLoader<'a> {
    pub fn new(dataset: &'a DurationDataset, collator: DurationCollator, batch_size: usize) -> Self {
        Self {
            dataset,
            collator,
            batch_size: batch_size.max(1),
            shuffle: None,
        }
    }

    /// Shuffle entry order every epoch using `seed`.
    pub fn with_shuffle(mut self, seed: u64) -> Self {
        self.shuffle = Some(seed);
        self
    }

    pub fn num_batches(&self) -> usize {
        self.dataset.len().div_ceil(self.batch_size)
    }

    /// Entry order used for `epoch`.
    pub fn order(&self, epoch: usize) -> Vec<usize> {
        let mut indices: Vec<usize> = (0..self.dataset.len()).collect();
        if let Some(seed) = self.shuffle {
            let mut rng = oorandom::Rand64::new((u128::from(seed) << 64) | epoch as u128);
            for i in (1..indices.len()).rev() {
                let j = rng.rand_range(0..(i as u64 + 1)) as usize;
                indices.swap(i, j);
            }
        }
        indices
    }

    /// Iterate over the collated batches of one epoch.
    pub fn epoch(&self, epoch: usize) -> impl Iterator<Item = Result<PaddedBatch>> + '_ {
        let order = self.order(epoch);
        let batches: Vec<Vec<usize>> = order
            .chunks(self.batch_size)
            .map(<[usize]>::to_vec)
            .collect();

        batches.into_iter().map(move |indices| {
            let examples = indices
                .iter()
                .map(|&i| self.dataset.get(i))
                .collect::<Result<Vec<_>>>()?;
            self.collator.collate(&examples)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadenza_core::SequenceCompressor;

    fn dataset(n: usize) -> DurationDataset {
        let lines: Vec<String> = (0..n).map(|i| format!("utt{i} {} {}", i + 2, i + 3)).collect();
        DurationDataset::from_lines(lines, &SequenceCompressor::new()).unwrap()
    }

    #[test]
    fn test_batches_cover_dataset_in_order() {
        let data = dataset(5);
        let loader = BatchLoader::new(&data, DurationCollator::new(4).unwrap(), 2);
        assert_eq!(loader.num_batches(), 3);

        let sizes: Vec<usize> = loader
            .epoch(0)
            .map(|b| b.unwrap().batch_size())
            .collect();
        assert_eq!(sizes, vec![2, 2, 1]);

        let first = loader.epoch(0).next().unwrap().unwrap();
        assert_eq!(
            first.phones.to_vec2::<u32>().unwrap(),
            vec![vec![2, 3, 0, 0], vec![3, 4, 0, 0]]
        );
    }

    #[test]
    fn test_shuffle_is_deterministic_permutation() {
        let data = dataset(20);
        let loader = BatchLoader::new(&data, DurationCollator::new(4).unwrap(), 3).with_shuffle(7);

        let a = loader.order(1);
        let b = loader.order(1);
        assert_eq!(a, b);

        let mut sorted = a.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..20).collect::<Vec<_>>());

        assert_ne!(loader.order(1), loader.order(2));
    }

    #[test]
    fn test_unshuffled_order_is_identity() {
        let data = dataset(4);
        let loader = BatchLoader::new(&data, DurationCollator::new(4).unwrap(), 3);
        assert_eq!(loader.order(9), vec![0, 1, 2, 3]);
    }
}
