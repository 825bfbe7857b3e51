//! Loss configuration.
//!
//! Defaults match the FastPitch recipe: both predictor losses are weighted by
//! 0.1 against the mel reconstruction loss.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// What to do when a mask has no valid positions.
///
/// The masked mean divides by the mask sum, so an empty mask turns the
/// corresponding component (and the total) into NaN or Inf.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyMaskPolicy {
    /// Return the non-finite value without checking.
    #[default]
    Propagate,
    /// Return the non-finite value and log a warning.
    Warn,
    /// Fail with [`Error::EmptyMask`].
    Error,
}

impl EmptyMaskPolicy {
    /// Parse a policy name as used in JSON configs and on the command line.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "propagate" => Some(Self::Propagate),
            "warn" => Some(Self::Warn),
            "error" => Some(Self::Error),
            _ => None,
        }
    }
}

/// Configuration for [`FastPitchLoss`](crate::loss::FastPitchLoss).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FastPitchLossConfig {
    /// Weight of the log-duration predictor loss.
    #[serde(default = "default_dur_predictor_loss_scale")]
    pub dur_predictor_loss_scale: f64,

    /// Weight of the pitch predictor loss.
    #[serde(default = "default_pitch_predictor_loss_scale")]
    pub pitch_predictor_loss_scale: f64,

    /// Handling of masks that sum to zero.
    #[serde(default)]
    pub empty_mask: EmptyMaskPolicy,
}

impl Default for FastPitchLossConfig {
    fn default() -> Self {
        Self {
            dur_predictor_loss_scale: default_dur_predictor_loss_scale(),
            pitch_predictor_loss_scale: default_pitch_predictor_loss_scale(),
            empty_mask: EmptyMaskPolicy::default(),
        }
    }
}

impl FastPitchLossConfig {
    /// Load a config from a JSON file. Missing fields take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        tracing::debug!(path = %path.display(), ?config, "loaded loss config");
        config.validate()?;
        Ok(config)
    }

    /// Check that both scales are finite and non-negative.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("dur_predictor_loss_scale", self.dur_predictor_loss_scale),
            ("pitch_predictor_loss_scale", self.pitch_predictor_loss_scale),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(Error::Config(format!(
                    "{name} must be finite and >= 0, got {value}"
                )));
            }
        }
        Ok(())
    }
}

fn default_dur_predictor_loss_scale() -> f64 {
    0.1
}

fn default_pitch_predictor_loss_scale() -> f64 {
    0.1
}
