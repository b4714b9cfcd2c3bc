//! Calibration probe
//!
//! Steps a MIMO channel and measures what reaches the receiver: the total
//! tap energy summed over all links and the energy of noise observed for
//! an all-zero transmission.

use anyhow::Result;
use channel::MimoChannel;
use common::utils::average_signal_energy;
use ndarray::Array2;
use num_complex::Complex32;
use tracing::trace;

/// Samples per antenna in each zero block
pub const PROBE_LEN: usize = 256;

/// Measured averages of a probe run
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeReport {
    pub steps: usize,
    /// Mean of the total tap energy, target 1
    pub mean_tap_energy: f64,
    /// Mean received energy per sample of a zero input
    pub mean_noise_energy: f64,
    /// Configured noise variance per sample
    pub noise_variance: f64,
}

/// Run `steps` iterations of `time_delta` seconds
pub fn run_probe(channel: &mut MimoChannel, steps: usize, time_delta: f64) -> Result<ProbeReport> {
    let zeros = Array2::<Complex32>::zeros((channel.tx_antennas(), PROBE_LEN));
    let mut tap_energy = 0.0;
    let mut noise_energy = 0.0;

    for i in 0..steps {
        channel.step(time_delta);
        let energy: f64 = channel.channel_taps().iter().map(|t| t.norm_sqr() as f64).sum();
        tap_energy += energy;

        let rx = channel.transmit(&zeros)?;
        let noise: f64 = rx
            .rows()
            .into_iter()
            .map(|row| average_signal_energy(&row.to_vec()) as f64)
            .sum::<f64>()
            / channel.rx_antennas() as f64;
        noise_energy += noise;
        trace!("step {}: tap energy={:.4}, noise energy={:.6}", i, energy, noise);
    }

    let n = steps.max(1) as f64;
    Ok(ProbeReport {
        steps,
        mean_tap_energy: tap_energy / n,
        mean_noise_energy: noise_energy / n,
        noise_variance: channel.noise().variance(),
    })
}
