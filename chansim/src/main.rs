//! Channel simulator calibration probe
//!
//! Loads a channel configuration, builds a MIMO channel and reports how the
//! measured tap and noise energies compare to their targets.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use channel::{ChannelConfig, ChannelFactory};

mod probe;

/// Statistical MIMO channel probe
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to a TOML or YAML channel configuration
    #[arg(short, long, default_value = "channel.toml")]
    config: PathBuf,

    /// Eb/N0 in dB
    #[arg(long, default_value = "10", allow_hyphen_values = true)]
    snr: f64,

    /// Number of channel steps
    #[arg(long, default_value = "1000")]
    steps: usize,

    /// Simulated time per step in seconds
    #[arg(long, default_value = "1e-3")]
    time_delta: f64,

    /// Override the configured seed
    #[arg(long)]
    seed: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_line_number(true)
        .init();

    info!("Configuration file: {}", args.config.display());
    let mut config = ChannelConfig::from_file(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    if let Some(seed) = args.seed {
        config = config.with_seed(seed);
    }

    let mut factory = ChannelFactory::new(config)?;
    let mut chan = factory.create(args.snr)?;

    info!("Channel configuration:");
    info!("  Domain: {}", factory.config().domain);
    info!("  Fading: {}", factory.config().fading);
    info!("  Antennas: {}x{}", chan.tx_antennas(), chan.rx_antennas());
    info!("  Link scale: {:.4}", factory.config().link_scale());
    if let Some(subcarriers) = chan.subcarriers() {
        info!("  Subcarriers: {}", subcarriers);
    }

    let report = probe::run_probe(&mut chan, args.steps, args.time_delta)?;

    info!("Probe finished after {} steps", report.steps);
    info!("  Mean tap energy: {:.4} (target 1.0)", report.mean_tap_energy);
    info!(
        "  Mean noise energy: {:.6} (target {:.6})",
        report.mean_noise_energy, report.noise_variance
    );
    if report.steps > 0 && (report.mean_tap_energy - 1.0).abs() > 0.1 {
        warn!("Tap energy deviates from unit gain by more than 10%");
    }

    println!("{}", serde_json::to_string_pretty(&chan.state())?);
    Ok(())
}
