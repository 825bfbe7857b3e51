//! Typed loss inputs, validated once before any arithmetic.
//!
//! Each tensor is wrapped in a struct that records its shape at construction
//! (rejecting the wrong rank), and [`FastPitchBatch::validate`] checks that the
//! seven inputs agree with each other. The loss only ever sees a batch that
//! passed validation.

use std::collections::HashMap;
use std::path::Path;

use candle_core::{Device, Tensor};

use crate::{Error, Result};

const SPECT_PREDICTED: &str = "spect_predicted";
const LOG_DURS_PREDICTED: &str = "log_durs_predicted";
const PITCH_PREDICTED: &str = "pitch_predicted";
const SPECT_TGT: &str = "spect_tgt";
const DURS_TGT: &str = "durs_tgt";
const DUR_LENS: &str = "dur_lens";
const PITCH_TGT: &str = "pitch_tgt";

/// Axis order of a mel spectrogram tensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MelLayout {
    /// (B, D, T): mel channels before frames. Data pipelines produce this.
    ChannelsFirst,
    /// (B, T, D): frames before mel channels. The decoder projection produces this.
    FramesFirst,
}

/// A batch of mel spectrograms with a known layout.
#[derive(Debug, Clone)]
pub struct MelSpectrogram {
    tensor: Tensor,
    layout: MelLayout,
    /// (batch, channels, frames), independent of layout.
    shape: (usize, usize, usize),
}

impl MelSpectrogram {
    /// Wrap a rank-3 tensor stored in `layout`.
    pub fn new(tensor: Tensor, layout: MelLayout) -> Result<Self> {
        let (b, d1, d2) = tensor.dims3().map_err(|_| {
            Error::Shape(format!(
                "mel spectrogram must be rank 3, got {:?}",
                tensor.dims()
            ))
        })?;
        let shape = match layout {
            MelLayout::ChannelsFirst => (b, d1, d2),
            MelLayout::FramesFirst => (b, d2, d1),
        };
        Ok(Self {
            tensor,
            layout,
            shape,
        })
    }

    /// Wrap a (B, D, T) tensor.
    pub fn channels_first(tensor: Tensor) -> Result<Self> {
        Self::new(tensor, MelLayout::ChannelsFirst)
    }

    /// Wrap a (B, T, D) tensor.
    pub fn frames_first(tensor: Tensor) -> Result<Self> {
        Self::new(tensor, MelLayout::FramesFirst)
    }

    pub fn tensor(&self) -> &Tensor {
        &self.tensor
    }

    pub fn layout(&self) -> MelLayout {
        self.layout
    }

    /// (batch, channels, frames).
    pub fn shape(&self) -> (usize, usize, usize) {
        self.shape
    }

    pub fn batch(&self) -> usize {
        self.shape.0
    }

    pub fn channels(&self) -> usize {
        self.shape.1
    }

    pub fn frames(&self) -> usize {
        self.shape.2
    }

    /// The spectrogram as a contiguous (B, T, D) tensor.
    pub fn to_frames_first(&self) -> Result<Tensor> {
        let t = match self.layout {
            MelLayout::ChannelsFirst => self.tensor.transpose(1, 2)?.contiguous()?,
            MelLayout::FramesFirst => self.tensor.clone(),
        };
        Ok(t)
    }
}

/// A (B, T) per-token sequence: durations, log-durations or pitch.
#[derive(Debug, Clone)]
pub struct TokenSequence {
    tensor: Tensor,
    shape: (usize, usize),
}

impl TokenSequence {
    pub fn new(tensor: Tensor) -> Result<Self> {
        let shape = tensor.dims2().map_err(|_| {
            Error::Shape(format!(
                "token sequence must be rank 2, got {:?}",
                tensor.dims()
            ))
        })?;
        Ok(Self { tensor, shape })
    }

    pub fn tensor(&self) -> &Tensor {
        &self.tensor
    }

    pub fn batch(&self) -> usize {
        self.shape.0
    }

    /// Number of time steps (tokens) per row.
    pub fn steps(&self) -> usize {
        self.shape.1
    }
}

/// Valid length per sequence, shape (B,).
#[derive(Debug, Clone)]
pub struct Lengths {
    tensor: Tensor,
    batch: usize,
}

impl Lengths {
    pub fn new(tensor: Tensor) -> Result<Self> {
        let batch = tensor.dims1().map_err(|_| {
            Error::Shape(format!("lengths must be rank 1, got {:?}", tensor.dims()))
        })?;
        Ok(Self { tensor, batch })
    }

    pub fn tensor(&self) -> &Tensor {
        &self.tensor
    }

    pub fn batch(&self) -> usize {
        self.batch
    }
}

/// Geometry of a validated batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchShape {
    pub batch: usize,
    pub mel_channels: usize,
    /// Frames of the target spectrogram (the prediction is padded up to this).
    pub mel_frames: usize,
    /// Tokens per row of the duration and pitch targets.
    pub tokens: usize,
}

/// The seven inputs of one loss evaluation.
#[derive(Debug, Clone)]
pub struct FastPitchBatch {
    pub spect_predicted: MelSpectrogram,
    pub log_durs_predicted: TokenSequence,
    pub pitch_predicted: TokenSequence,
    pub spect_tgt: MelSpectrogram,
    pub durs_tgt: TokenSequence,
    pub dur_lens: Lengths,
    pub pitch_tgt: TokenSequence,
}

impl FastPitchBatch {
    /// Check that the inputs agree with each other.
    ///
    /// Predictions may be shorter than their targets along time (they are
    /// zero-padded by the loss) but never longer.
    pub fn validate(&self) -> Result<BatchShape> {
        let batch = self.spect_tgt.batch();
        let batches = [
            (SPECT_PREDICTED, self.spect_predicted.batch()),
            (LOG_DURS_PREDICTED, self.log_durs_predicted.batch()),
            (PITCH_PREDICTED, self.pitch_predicted.batch()),
            (DURS_TGT, self.durs_tgt.batch()),
            (DUR_LENS, self.dur_lens.batch()),
            (PITCH_TGT, self.pitch_tgt.batch()),
        ];
        for (name, b) in batches {
            if b != batch {
                return Err(Error::Shape(format!(
                    "{name} has batch size {b}, {SPECT_TGT} has {batch}"
                )));
            }
        }

        let (_, channels, frames) = self.spect_tgt.shape();
        if self.spect_predicted.channels() != channels {
            return Err(Error::Shape(format!(
                "{SPECT_PREDICTED} has {} mel channels, {SPECT_TGT} has {channels}",
                self.spect_predicted.channels()
            )));
        }
        if self.spect_predicted.frames() > frames {
            return Err(Error::Shape(format!(
                "{SPECT_PREDICTED} has {} frames, more than the {frames} of {SPECT_TGT}",
                self.spect_predicted.frames()
            )));
        }

        let tokens = self.durs_tgt.steps();
        if self.log_durs_predicted.steps() != tokens {
            return Err(Error::Shape(format!(
                "{LOG_DURS_PREDICTED} has {} steps, {DURS_TGT} has {tokens}",
                self.log_durs_predicted.steps()
            )));
        }
        if self.pitch_tgt.steps() != tokens {
            return Err(Error::Shape(format!(
                "{PITCH_TGT} has {} steps, {DURS_TGT} has {tokens}",
                self.pitch_tgt.steps()
            )));
        }
        if self.pitch_predicted.steps() > tokens {
            return Err(Error::Shape(format!(
                "{PITCH_PREDICTED} has {} steps, more than the {tokens} of {PITCH_TGT}",
                self.pitch_predicted.steps()
            )));
        }

        Ok(BatchShape {
            batch,
            mel_channels: channels,
            mel_frames: frames,
            tokens,
        })
    }

    /// Load a batch from a safetensors file holding the seven named tensors.
    pub fn from_safetensors(
        path: impl AsRef<Path>,
        pred_layout: MelLayout,
        tgt_layout: MelLayout,
        device: &Device,
    ) -> Result<Self> {
        let path = path.as_ref();
        let mut tensors = candle_core::safetensors::load(path, device)?;
        tracing::debug!(path = %path.display(), count = tensors.len(), "loaded batch tensors");

        let mut take =
            |name: &'static str| tensors.remove(name).ok_or(Error::MissingTensor(name));

        Ok(Self {
            spect_predicted: MelSpectrogram::new(take(SPECT_PREDICTED)?, pred_layout)?,
            log_durs_predicted: TokenSequence::new(take(LOG_DURS_PREDICTED)?)?,
            pitch_predicted: TokenSequence::new(take(PITCH_PREDICTED)?)?,
            spect_tgt: MelSpectrogram::new(take(SPECT_TGT)?, tgt_layout)?,
            durs_tgt: TokenSequence::new(take(DURS_TGT)?)?,
            dur_lens: Lengths::new(take(DUR_LENS)?)?,
            pitch_tgt: TokenSequence::new(take(PITCH_TGT)?)?,
        })
    }

    /// Write the seven tensors, in their stored layouts, to a safetensors file.
    pub fn save_safetensors(&self, path: impl AsRef<Path>) -> Result<()> {
        let tensors: HashMap<&str, Tensor> = [
            (SPECT_PREDICTED, self.spect_predicted.tensor()),
            (LOG_DURS_PREDICTED, self.log_durs_predicted.tensor()),
            (PITCH_PREDICTED, self.pitch_predicted.tensor()),
            (SPECT_TGT, self.spect_tgt.tensor()),
            (DURS_TGT, self.durs_tgt.tensor()),
            (DUR_LENS, self.dur_lens.tensor()),
            (PITCH_TGT, self.pitch_tgt.tensor()),
        ]
        .into_iter()
        .map(|(name, t)| (name, t.clone()))
        .collect();
        candle_core::safetensors::save(&tensors, path)?;
        Ok(())
    }
}
