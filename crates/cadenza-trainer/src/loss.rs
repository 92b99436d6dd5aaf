//! Masked regression criteria over padded duration batches.

use candle_core::{Result, Tensor, D};
use serde::{Deserialize, Serialize};

/// Scores a prediction against target durations under a padding mask.
pub trait Criterion {
    /// Return a rank-0 loss tensor.
    fn score(&self, prediction: &Tensor, target: &Tensor, mask: &Tensor) -> Result<Tensor>;
}

/// Element-wise error used by [`MaskedLoss`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LossKind {
    /// Mean absolute error.
    L1,
    /// Mean squared error.
    Mse,
}

/// Mean error over the unmasked positions only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaskedLoss {
    kind: LossKind,
}

impl MaskedLoss {
    pub fn new(kind: LossKind) -> Self {
        Self { kind }
    }

    pub fn kind(&self) -> LossKind {
        self.kind
    }
}

impl Criterion for MaskedLoss {
    fn score(&self, prediction: &Tensor, target: &Tensor, mask: &Tensor) -> Result<Tensor> {
        let mut prediction = prediction.clone();
        while prediction.rank() > target.rank() && prediction.dims().last() == Some(&1) {
            prediction = prediction.squeeze(D::Minus1)?;
        }
        let diff = prediction.broadcast_sub(target)?;
        let err = match self.kind {
            LossKind::L1 => diff.abs()?,
            LossKind::Mse => diff.sqr()?,
        };

        let valid = mask.sum_all()?.to_dtype(candle_core::DType::F64)?.to_scalar::<f64>()?;
        if valid <= 0.0 {
            candle_core::bail!("masked loss over a batch with no valid positions");
        }

        (err * mask)?.sum_all()?.affine(1.0 / valid, 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::Device;

    fn tensors() -> (Tensor, Tensor, Tensor) {
        let dev = Device::Cpu;
        let pred = Tensor::new(&[[1f32, 2.0, 9.0], [4.0, 4.0, 4.0]], &dev).unwrap();
        let target = Tensor::new(&[[2f32, 2.0, 0.0], [1.0, 4.0, 0.0]], &dev).unwrap();
        let mask = Tensor::new(&[[1f32, 1.0, 0.0], [1.0, 1.0, 0.0]], &dev).unwrap();
        (pred, target, mask)
    }

    #[test]
    fn test_l1_ignores_padding() {
        let (pred, target, mask) = tensors();
        let loss = MaskedLoss::new(LossKind::L1)
            .score(&pred, &target, &mask)
            .unwrap();
        // |1-2| + 0 + |4-1| + 0 over 4 valid positions
        assert_eq!(loss.to_scalar::<f32>().unwrap(), 1.0);
    }

    #[test]
    fn test_mse_ignores_padding() {
        let (pred, target, mask) = tensors();
        let loss = MaskedLoss::new(LossKind::Mse)
            .score(&pred, &target, &mask)
            .unwrap();
        assert_eq!(loss.to_scalar::<f32>().unwrap(), 2.5);
    }

    #[test]
    fn test_prediction_with_trailing_unit_dim() {
        let (pred, target, mask) = tensors();
        let pred = pred.unsqueeze(2).unwrap();
        let loss = MaskedLoss::new(LossKind::L1)
            .score(&pred, &target, &mask)
            .unwrap();
        assert_eq!(loss.to_scalar::<f32>().unwrap(), 1.0);
    }

    #[test]
    fn test_per_example_prediction_broadcasts() {
        let (_, target, mask) = tensors();
        let pred = Tensor::new(&[[2f32], [2.0]], &Device::Cpu).unwrap();
        let loss = MaskedLoss::new(LossKind::L1)
            .score(&pred, &target, &mask)
            .unwrap();
        // |2-2| + |2-2| + |2-1| + |2-4| over 4 valid positions
        assert_eq!(loss.to_scalar::<f32>().unwrap(), 0.75);
    }

    #[test]
    fn test_incompatible_prediction_is_an_error() {
        let (_, target, mask) = tensors();
        let pred = Tensor::new(&[1f32, 2.0, 3.0, 4.0], &Device::Cpu).unwrap();
        assert!(MaskedLoss::new(LossKind::L1)
            .score(&pred, &target, &mask)
            .is_err());
    }

    #[test]
    fn test_empty_mask_is_an_error() {
        let (pred, target, mask) = tensors();
        let mask = mask.zeros_like().unwrap();
        assert!(MaskedLoss::new(LossKind::L1)
            .score(&pred, &target, &mask)
            .is_err());
    }
}
