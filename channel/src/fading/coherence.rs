//! Channel Coherence Models
//!
//! Map a spatial or temporal displacement to a correlation coefficient in
//! [0, 1]. Temporal deltas are converted to a displacement in carrier
//! wavelengths through the relative velocity (Doppler).

use crate::ChannelError;
use common::types::CoherenceModel;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Speed of light in vacuum, m/s
pub const SPEED_OF_LIGHT: f64 = 299_792_458.0;

/// Correlation between channel realizations separated in space or time
pub trait ChannelCoherence {
    /// Coefficient for a displacement given in carrier wavelengths
    fn coherence_distance(&self, distance_delta: f64) -> f64;

    /// Wavelengths travelled per second of simulated time
    fn time_to_distance_factor(&self) -> f64;

    /// Coefficient for a time delta in seconds
    fn coherence_time(&self, time_delta: f64) -> f64 {
        self.coherence_distance(time_delta * self.time_to_distance_factor())
    }
}

/// Configuration snapshot of a coherence model
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoherenceState {
    /// Correlation model
    #[serde(rename = "coherence")]
    pub model: CoherenceModel,
    /// Carrier frequency in Hz
    pub carrier_freq: f64,
    /// Relative velocity in m/s
    pub velocity: f64,
}

/// Coherence model for a carrier frequency and relative velocity
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coherence {
    model: CoherenceModel,
    carrier_freq: f64,
    velocity: f64,
    time2distance_factor: f64,
}

impl Coherence {
    /// Create a coherence model
    pub fn new(model: CoherenceModel, carrier_freq: f64, velocity: f64) -> Result<Self, ChannelError> {
        if !(carrier_freq > 0.0 && carrier_freq.is_finite()) {
            return Err(ChannelError::OutOfRange {
                parameter: "carrier_freq",
                value: carrier_freq,
            });
        }
        if !(velocity >= 0.0 && velocity.is_finite()) {
            return Err(ChannelError::OutOfRange {
                parameter: "velocity",
                value: velocity,
            });
        }
        Ok(Self {
            model,
            carrier_freq,
            velocity,
            time2distance_factor: velocity * carrier_freq / SPEED_OF_LIGHT,
        })
    }

    /// Gaussian correlation, the E_z case for omnidirectional antennas
    pub fn rappaport(carrier_freq: f64, velocity: f64) -> Result<Self, ChannelError> {
        Self::new(CoherenceModel::Rappaport, carrier_freq, velocity)
    }

    /// Squared Bessel J0 correlation for isotropic scattering
    pub fn jakes(carrier_freq: f64, velocity: f64) -> Result<Self, ChannelError> {
        Self::new(CoherenceModel::Jakes, carrier_freq, velocity)
    }

    /// Rebuild from a snapshot
    pub fn from_state(state: &CoherenceState) -> Result<Self, ChannelError> {
        Self::new(state.model, state.carrier_freq, state.velocity)
    }

    pub fn model(&self) -> CoherenceModel {
        self.model
    }

    pub fn carrier_freq(&self) -> f64 {
        self.carrier_freq
    }

    pub fn velocity(&self) -> f64 {
        self.velocity
    }

    pub fn state(&self) -> CoherenceState {
        CoherenceState {
            model: self.model,
            carrier_freq: self.carrier_freq,
            velocity: self.velocity,
        }
    }
}

impl ChannelCoherence for Coherence {
    fn coherence_distance(&self, distance_delta: f64) -> f64 {
        match self.model {
            CoherenceModel::Rappaport => (-23.0 * distance_delta * distance_delta).exp(),
            // Oscillates past the first zero of J0; not clamped
            CoherenceModel::Jakes => {
                let j0 = bessel_j0(2.0 * PI * distance_delta);
                j0 * j0
            }
        }
    }

    fn time_to_distance_factor(&self) -> f64 {
        self.time2distance_factor
    }
}

/// Bessel function of the first kind, order zero
///
/// Power series up to |x| = 12, Hankel asymptotic expansion beyond.
pub fn bessel_j0(x: f64) -> f64 {
    let ax = x.abs();
    if ax <= 12.0 {
        let y = 0.25 * ax * ax;
        let mut term = 1.0;
        let mut sum = 1.0;
        for k in 1..64 {
            term *= -y / (k * k) as f64;
            sum += term;
            if term.abs() < 1e-17 {
                break;
            }
        }
        sum
    } else {
        // P and Q from the terms prod_j(-(2j-1)^2) / (k! (8x)^k)
        let z = 8.0 * ax;
        let mut p = 1.0;
        let mut q = 0.0;
        let mut term = 1.0;
        for k in 1..=12 {
            let odd = (2 * k - 1) as f64;
            term *= -(odd * odd) / (k as f64 * z);
            match k % 4 {
                1 => q += term,
                2 => p -= term,
                3 => q -= term,
                _ => p += term,
            }
        }
        let chi = ax - 0.25 * PI;
        (2.0 / (PI * ax)).sqrt() * (p * chi.cos() - q * chi.sin())
    }
}
