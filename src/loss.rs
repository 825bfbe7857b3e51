//! FastPitch composite loss.
//!
//! Combines three masked mean squared errors into one training objective:
//!
//! ```text
//! loss = mel_loss
//!      + dur_predictor_loss_scale   * masked_mse(log_durs_predicted, ln(durs_tgt + 1), dur_mask)
//!      + pitch_predictor_loss_scale * masked_mse(pitch_predicted,    pitch_tgt,         dur_mask)
//!
//! mel_loss = masked_mse(pad(spect_predicted), spect_tgt, spect_tgt != 0)
//! ```
//!
//! `dur_mask` comes from `dur_lens` and is shared by the duration and pitch
//! terms. Predictions shorter than their targets are zero-padded at the end.
//!
//! ## Modules
//!
//! - [`mask`]: length and non-zero masks
//! - [`masked_mse`](mod@masked_mse): the masked mean and trailing padding

pub mod mask;
pub mod masked_mse;

use candle_core::{DType, Tensor};
use serde::Serialize;

use crate::batch::FastPitchBatch;
use crate::config::{EmptyMaskPolicy, FastPitchLossConfig};
use crate::{Error, Result};

use mask::{mask_from_lens, nonzero_mask};
use masked_mse::{masked_mse, pad_frames};

/// The four loss tensors, all rank 0 and f32.
///
/// They stay attached to the autograd graph of the predicted inputs, so
/// `output.loss.backward()` drives training directly.
#[derive(Debug, Clone)]
pub struct LossOutput {
    pub loss: Tensor,
    pub mel_loss: Tensor,
    pub dur_loss: Tensor,
    pub pitch_loss: Tensor,
}

impl LossOutput {
    /// Read the four scalars back to the host.
    pub fn values(&self) -> Result<LossValues> {
        Ok(LossValues {
            loss: self.loss.to_scalar::<f32>()?,
            mel_loss: self.mel_loss.to_scalar::<f32>()?,
            dur_loss: self.dur_loss.to_scalar::<f32>()?,
            pitch_loss: self.pitch_loss.to_scalar::<f32>()?,
        })
    }
}

/// Host-side copy of a [`LossOutput`], for logging and reporting.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LossValues {
    pub loss: f32,
    pub mel_loss: f32,
    pub dur_loss: f32,
    pub pitch_loss: f32,
}

/// The FastPitch loss. Holds only its configuration and is cheap to clone.
#[derive(Debug, Clone, Default)]
pub struct FastPitchLoss {
    config: FastPitchLossConfig,
}

impl FastPitchLoss {
    pub fn new(config: FastPitchLossConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &FastPitchLossConfig {
        &self.config
    }

    /// Validate `batch` and compute `(loss, mel_loss, dur_loss, pitch_loss)`.
    ///
    /// Arithmetic runs in f32 whatever the input dtype. The target
    /// spectrogram is detached, so no gradient flows into it.
    pub fn compute(&self, batch: &FastPitchBatch) -> Result<LossOutput> {
        let shape = batch.validate()?;
        tracing::trace!(
            batch = shape.batch,
            mel_channels = shape.mel_channels,
            mel_frames = shape.mel_frames,
            tokens = shape.tokens,
            "computing fastpitch loss"
        );

        // (B, T, D)
        let spect_tgt = batch
            .spect_tgt
            .to_frames_first()?
            .detach()
            .to_dtype(DType::F32)?;

        let dur_mask = mask_from_lens(batch.dur_lens.tensor(), shape.tokens)?;
        self.check_mask(&dur_mask, "dur_mask")?;

        let log_durs_tgt = (batch.durs_tgt.tensor().to_dtype(DType::F32)? + 1.0)?.log()?;
        let log_durs_predicted = batch.log_durs_predicted.tensor().to_dtype(DType::F32)?;
        let dur_loss = (masked_mse(&log_durs_predicted, &log_durs_tgt, &dur_mask)?
            * self.config.dur_predictor_loss_scale)?;

        let spect_predicted = batch
            .spect_predicted
            .to_frames_first()?
            .to_dtype(DType::F32)?;
        let spect_predicted = pad_frames(&spect_predicted, 1, shape.mel_frames)?;
        let mel_mask = nonzero_mask(&spect_tgt)?;
        self.check_mask(&mel_mask, "mel_mask")?;
        let mel_loss = masked_mse(&spect_predicted, &spect_tgt, &mel_mask)?;

        let pitch_predicted = batch.pitch_predicted.tensor().to_dtype(DType::F32)?;
        let pitch_predicted = pad_frames(&pitch_predicted, 1, shape.tokens)?;
        let pitch_tgt = batch.pitch_tgt.tensor().to_dtype(DType::F32)?;
        let pitch_loss = (masked_mse(&pitch_tgt, &pitch_predicted, &dur_mask)?
            * self.config.pitch_predictor_loss_scale)?;

        let loss = ((&mel_loss + &pitch_loss)? + &dur_loss)?;

        Ok(LossOutput {
            loss,
            mel_loss,
            dur_loss,
            pitch_loss,
        })
    }

    /// Apply the empty-mask policy. `Propagate` skips the device read.
    fn check_mask(&self, mask: &Tensor, name: &'static str) -> Result<()> {
        if self.config.empty_mask == EmptyMaskPolicy::Propagate {
            return Ok(());
        }
        let valid = mask.sum_all()?.to_scalar::<f32>()?;
        if valid > 0.0 {
            return Ok(());
        }
        match self.config.empty_mask {
            EmptyMaskPolicy::Error => Err(Error::EmptyMask(name)),
            _ => {
                tracing::warn!(mask = name, "mask has no valid positions, loss is not finite");
                Ok(())
            }
        }
    }
}
