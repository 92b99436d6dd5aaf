//! Duration model seam and a baseline predictor.

use candle_core::{DType, Module, Result, Tensor, D};
use candle_nn::{Embedding, Linear, VarBuilder};

/// Predicts per-phone durations for a padded batch.
pub trait DurationModel {
    /// `phones`: `[B, L]` u32, `mean`: `[B, 1, 1]` f32, `mask`: `[B, L]` f32.
    ///
    /// Returns predictions broadcast-compatible with the `[B, L]` targets.
    /// `train` selects training behaviour such as dropout.
    fn predict(&self, phones: &Tensor, mean: &Tensor, mask: &Tensor, train: bool)
        -> Result<Tensor>;
}

/// Feed-forward duration predictor conditioned on the utterance mean.
///
/// Each phone embedding is concatenated with the utterance mean duration,
/// passed through a hidden ReLU layer and projected to a scalar residual
/// over the mean. Padded positions are zeroed.
pub struct DurationPredictor {
    embedding: Embedding,
    hidden: Linear,
    output: Linear,
    dropout: f32,
}

impl DurationPredictor {
    pub const DROPOUT: f32 = 0.1;

    pub fn new(phone_vocab: usize, hidden_size: usize, vb: VarBuilder) -> Result<Self> {
        let embedding = candle_nn::embedding(phone_vocab, hidden_size, vb.pp("embedding"))?;
        let hidden = candle_nn::linear(hidden_size + 1, hidden_size, vb.pp("hidden"))?;
        let output = candle_nn::linear(hidden_size, 1, vb.pp("output"))?;

        Ok(Self {
            embedding,
            hidden,
            output,
            dropout: Self::DROPOUT,
        })
    }

    pub fn with_dropout(mut self, dropout: f32) -> Self {
        self.dropout = dropout;
        self
    }
}

impl DurationModel for DurationPredictor {
    fn predict(
        &self,
        phones: &Tensor,
        mean: &Tensor,
        mask: &Tensor,
        train: bool,
    ) -> Result<Tensor> {
        let (batch, len) = phones.dims2()?;

        let embedded = self.embedding.forward(phones)?;
        let mean_feature = mean
            .to_dtype(DType::F32)?
            .broadcast_as((batch, len, 1))?
            .contiguous()?;
        let features = Tensor::cat(&[&embedded, &mean_feature], D::Minus1)?;

        let mut hidden = self.hidden.forward(&features)?.relu()?;
        if train && self.dropout > 0.0 {
            hidden = candle_nn::ops::dropout(&hidden, self.dropout)?;
        }

        let residual = self.output.forward(&hidden)?.squeeze(D::Minus1)?;
        let base = mean.to_dtype(DType::F32)?.reshape((batch, 1))?;
        residual.broadcast_add(&base)? * mask
    }
}
