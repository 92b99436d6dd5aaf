//! # Padding Masks
//!
//! Builds `[B, L]` float masks from per-example lengths: `1.0` on valid
//! positions, `0.0` on padding. Lengths larger than `L` are clipped.

use candle_core::{DType, Device, Tensor};

use crate::error::Result;

/// Build a padding mask from a `[B]` length tensor.
///
/// The mask lives on the same device as `lengths`.
///
/// # Examples
/// ```
/// use candle_core::{Device, Tensor};
/// use cadenza_core::batch::padding_mask;
///
/// let lengths = Tensor::new(&[2u32, 5], &Device::Cpu).unwrap();
/// let mask = padding_mask(&lengths, 3).unwrap();
/// assert_eq!(
///     mask.to_vec2::<f32>().unwrap(),
///     vec![vec![1.0, 1.0, 0.0], vec![1.0, 1.0, 1.0]]
/// );
/// ```
pub fn padding_mask(lengths: &Tensor, max_len: usize) -> Result<Tensor> {
    let lengths = lengths.to_dtype(DType::U32)?;
    let positions = Tensor::arange(0u32, max_len as u32, lengths.device())?.unsqueeze(0)?;
    let mask = positions
        .broadcast_lt(&lengths.unsqueeze(1)?)?
        .to_dtype(DType::F32)?;
    Ok(mask)
}

/// Build a padding mask from host-side lengths.
pub fn padding_mask_from_lengths(
    lengths: &[usize],
    max_len: usize,
    device: &Device,
) -> Result<Tensor> {
    let mut values = vec![0f32; lengths.len() * max_len];
    for (row, &len) in values.chunks_mut(max_len.max(1)).zip(lengths) {
        row[..len.min(max_len)].fill(1.0);
    }
    Ok(Tensor::from_vec(values, (lengths.len(), max_len), device)?)
}
