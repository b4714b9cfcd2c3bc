//! Additive White Gaussian Noise
//!
//! Noise stage calibrated from an Eb/N0 target, an effective code rate and
//! the number of subcarriers the signal energy is spread over.

use crate::ChannelError;
use common::utils::ebn0_to_sigma;
use ndarray::Array2;
use num_complex::Complex32;
use rand::rngs::StdRng;
use rand::Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Draw `len` circularly-symmetric complex Gaussian samples
///
/// Real and imaginary parts are independent with variance `sigma^2 / 2`
/// each, so the per-sample power is `sigma^2`.
pub fn complex_noise<R: Rng>(rng: &mut R, len: usize, sigma: f64) -> Vec<Complex32> {
    let dev = (0.5_f64).sqrt() * sigma;
    (0..len)
        .map(|_| {
            let re: f64 = rng.sample(StandardNormal);
            let im: f64 = rng.sample(StandardNormal);
            Complex32::new((re * dev) as f32, (im * dev) as f32)
        })
        .collect()
}

/// Configuration snapshot of the noise stage
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AwgnState {
    /// Eb/N0 in dB
    pub snr: f64,
    /// Code rate times bits per symbol
    pub effective_rate: f64,
    /// Subcarriers the symbol energy is spread over
    pub subcarriers: usize,
}

/// AWGN channel stage
pub struct Awgn {
    snr_db: f64,
    effective_rate: f64,
    subcarriers: usize,
    sigma: f64,
    variance: f64,
    rng: StdRng,
}

impl Awgn {
    /// Create a noise stage
    ///
    /// `sigma^2 = 1 / (10^(snr_db/10) * effective_rate * subcarriers)`
    pub fn new(
        snr_db: f64,
        effective_rate: f64,
        subcarriers: usize,
        rng: StdRng,
    ) -> Result<Self, ChannelError> {
        if !snr_db.is_finite() {
            return Err(ChannelError::InvalidConfiguration(format!(
                "snr must be finite, got {}",
                snr_db
            )));
        }
        if !(effective_rate > 0.0 && effective_rate.is_finite()) {
            return Err(ChannelError::InvalidConfiguration(format!(
                "effective_rate must be positive, got {}",
                effective_rate
            )));
        }
        if subcarriers == 0 {
            return Err(ChannelError::InvalidConfiguration(
                "subcarriers must be positive".to_string(),
            ));
        }

        let sigma = ebn0_to_sigma(snr_db, effective_rate) / (subcarriers as f64).sqrt();
        let variance = sigma * sigma;

        debug!(
            "AWGN: snr={} dB, rate={}, subcarriers={}, sigma={:.6}",
            snr_db, effective_rate, subcarriers, sigma
        );

        Ok(Self {
            snr_db,
            effective_rate,
            subcarriers,
            sigma,
            variance,
            rng,
        })
    }

    /// Uncoded single-carrier noise stage
    pub fn with_snr(snr_db: f64, rng: StdRng) -> Result<Self, ChannelError> {
        Self::new(snr_db, 1.0, 1, rng)
    }

    /// Add noise to every sample
    pub fn transmit(&mut self, tx: &[Complex32]) -> Vec<Complex32> {
        let noise = complex_noise(&mut self.rng, tx.len(), self.sigma);
        tx.iter().zip(noise).map(|(&s, n)| s + n).collect()
    }

    /// Add independent noise to every element of a multi-antenna block
    pub fn transmit_matrix(&mut self, tx: &Array2<Complex32>) -> Array2<Complex32> {
        let noise = complex_noise(&mut self.rng, tx.len(), self.sigma);
        let mut rx = tx.clone();
        for (s, n) in rx.iter_mut().zip(noise) {
            *s += n;
        }
        rx
    }

    /// Noise is memoryless, stepping has no effect
    pub fn step(&mut self) {}

    /// No multipath structure
    pub fn channel_taps(&self) -> Option<&[Complex32]> {
        None
    }

    /// No multipath structure
    pub fn channel_gains(&self) -> Option<&[f32]> {
        None
    }

    pub fn channel_length(&self) -> usize {
        1
    }

    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    pub fn variance(&self) -> f64 {
        self.variance
    }

    pub fn snr(&self) -> f64 {
        self.snr_db
    }

    pub fn state(&self) -> AwgnState {
        AwgnState {
            snr: self.snr_db,
            effective_rate: self.effective_rate,
            subcarriers: self.subcarriers,
        }
    }
}
