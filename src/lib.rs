//! FastPitch training loss in pure Rust.
//!
//! A candle-based implementation of the composite objective used to train
//! FastPitch-style acoustic models: mel-spectrogram reconstruction plus the
//! duration and pitch predictor losses, each averaged over valid positions
//! only.
//!
//! ## Data flow
//!
//! ```text
//! predictions + targets + dur_lens
//!          ↓
//!   FastPitchBatch::validate   (shapes, batch sizes, time lengths)
//!          ↓
//!   dur_mask ← dur_lens        mel_mask ← spect_tgt != 0
//!          ↓
//!   masked MSE × scale  →  loss, mel_loss, dur_loss, pitch_loss
//! ```
//!
//! ## Modules
//!
//! - [`batch`] — typed, validated loss inputs and safetensors batch files
//! - [`config`] — loss weights and empty-mask handling
//! - [`loss`] — the loss itself, masks and the masked mean

pub mod batch;
pub mod config;
pub mod loss;

mod error;

pub use error::{Error, Result};
