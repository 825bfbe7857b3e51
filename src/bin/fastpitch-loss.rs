//! FastPitch loss CLI — evaluate the loss on one dumped batch.
//!
//! Reads a safetensors file holding the seven loss inputs
//! (`spect_predicted`, `log_durs_predicted`, `pitch_predicted`, `spect_tgt`,
//! `durs_tgt`, `dur_lens`, `pitch_tgt`) and prints a one-line JSON summary to
//! stdout on success:
//!
//! ```json
//! {"loss":1.234,"mel_loss":1.1,"dur_loss":0.08,"pitch_loss":0.054}
//! ```
//!
//! Exit code 0 on success, non-zero on error.

use clap::{Parser, ValueEnum};
use fastpitch_loss_rs::{
    batch::{FastPitchBatch, MelLayout},
    config::{EmptyMaskPolicy, FastPitchLossConfig},
    loss::FastPitchLoss,
};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Layout {
    /// (B, D, T)
    ChannelsFirst,
    /// (B, T, D)
    FramesFirst,
}

impl From<Layout> for MelLayout {
    fn from(layout: Layout) -> Self {
        match layout {
            Layout::ChannelsFirst => MelLayout::ChannelsFirst,
            Layout::FramesFirst => MelLayout::FramesFirst,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "fastpitch-loss",
    about = "Evaluate the FastPitch training loss on a saved batch",
    long_about = "Load predictions, targets and lengths from a safetensors file\n\
                  and print the total, mel, duration and pitch losses as one JSON line."
)]
struct Args {
    /// Safetensors file with the seven named loss inputs.
    #[arg(long, short = 'b')]
    batch: String,

    /// JSON loss config. Flags below override its fields.
    #[arg(long, short = 'c')]
    config: Option<String>,

    /// Weight of the duration predictor loss.
    #[arg(long)]
    dur_scale: Option<f64>,

    /// Weight of the pitch predictor loss.
    #[arg(long)]
    pitch_scale: Option<f64>,

    /// Handling of empty masks: propagate, warn or error.
    #[arg(long)]
    empty_mask: Option<String>,

    /// Axis order of `spect_predicted`.
    #[arg(long, value_enum, default_value_t = Layout::FramesFirst)]
    pred_layout: Layout,

    /// Axis order of `spect_tgt`.
    #[arg(long, value_enum, default_value_t = Layout::ChannelsFirst)]
    tgt_layout: Layout,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => FastPitchLossConfig::from_json_file(path)
            .map_err(|e| anyhow::anyhow!("failed to load config {path}: {e}"))?,
        None => FastPitchLossConfig::default(),
    };
    if let Some(scale) = args.dur_scale {
        config.dur_predictor_loss_scale = scale;
    }
    if let Some(scale) = args.pitch_scale {
        config.pitch_predictor_loss_scale = scale;
    }
    if let Some(name) = &args.empty_mask {
        config.empty_mask = EmptyMaskPolicy::parse(name).ok_or_else(|| {
            anyhow::anyhow!("unknown empty-mask policy '{name}'. Use propagate, warn or error")
        })?;
    }
    let loss = FastPitchLoss::new(config)?;

    let device = candle_core::Device::cuda_if_available(0)?;
    tracing::info!("Using device: {:?}", device);

    let batch = FastPitchBatch::from_safetensors(
        &args.batch,
        args.pred_layout.into(),
        args.tgt_layout.into(),
        &device,
    )
    .map_err(|e| anyhow::anyhow!("failed to load batch {}: {e}", args.batch))?;

    let shape = batch.validate()?;
    tracing::info!(
        batch = shape.batch,
        mel_channels = shape.mel_channels,
        mel_frames = shape.mel_frames,
        tokens = shape.tokens,
        "loaded batch"
    );

    let values = loss.compute(&batch)?.values()?;
    if !values.loss.is_finite() {
        tracing::warn!("loss is not finite: {}", values.loss);
    }

    println!("{}", serde_json::to_string(&values)?);
    Ok(())
}
