//! Masked mean squared error and trailing zero-padding.

use candle_core::Tensor;

use crate::{Error, Result};

/// Mean squared error restricted to positions where `mask` is 1.0.
///
/// `sum((pred - target)^2 * mask) / sum(mask)`. The denominator counts valid
/// positions only, so padding never dilutes the mean. An all-zero mask gives
/// NaN (or Inf), which is returned as-is.
///
/// All three tensors must share one shape; returns a rank-0 tensor.
pub fn masked_mse(pred: &Tensor, target: &Tensor, mask: &Tensor) -> candle_core::Result<Tensor> {
    let squared = (pred - target)?.sqr()?;
    let total = (squared * mask)?.sum_all()?;
    let count = mask.sum_all()?;
    total / count
}

/// Zero-pad the trailing end of `dim` so it has `target_len` entries.
///
/// A tensor that is already longer than `target_len` cannot be aligned this
/// way and yields [`Error::Shape`].
pub fn pad_frames(t: &Tensor, dim: usize, target_len: usize) -> Result<Tensor> {
    let len = t.dim(dim)?;
    match len.cmp(&target_len) {
        std::cmp::Ordering::Equal => Ok(t.clone()),
        std::cmp::Ordering::Less => Ok(t.pad_with_zeros(dim, 0, target_len - len)?),
        std::cmp::Ordering::Greater => Err(Error::Shape(format!(
            "cannot pad dim {dim} of length {len} to shorter length {target_len}"
        ))),
    }
}
