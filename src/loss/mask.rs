//! Padding masks for the loss.
//!
//! Both builders return f32 tensors with 1.0 at valid positions and 0.0 at
//! padding, ready to multiply into an elementwise error.

use candle_core::{DType, Result, Tensor};

/// Create a (B, max_len) mask from per-sequence lengths of shape (B,).
///
/// Position `t` of row `b` is valid iff `t < lens[b]`. Lengths may have any
/// numeric dtype; a length above `max_len` gives a full row and a length of
/// zero gives an empty one.
pub fn mask_from_lens(lens: &Tensor, max_len: usize) -> Result<Tensor> {
    let batch = lens.dims1()?;
    let positions = Tensor::arange(0u32, max_len as u32, lens.device())?
        .to_dtype(DType::F32)?
        .unsqueeze(0)?;
    let lens = lens.to_dtype(DType::F32)?.reshape((batch, 1))?;
    positions.broadcast_lt(&lens)?.to_dtype(DType::F32)
}

/// Create a mask of the same shape as `t`, 1.0 wherever `t` is not exactly zero.
///
/// Used for spectrogram targets, where padded frames are zero-filled. A
/// genuinely zero-valued cell is indistinguishable from padding and is
/// excluded as well.
pub fn nonzero_mask(t: &Tensor) -> Result<Tensor> {
    t.ne(&t.zeros_like()?)?.to_dtype(DType::F32)
}
