//! Channel Configuration
//!
//! TOML or YAML description of a MIMO channel, consumed by
//! [`ChannelFactory`](crate::ChannelFactory).

use crate::fading::{Coherence, ProfileParams};
use crate::ChannelError;
use common::types::{CoherenceModel, Domain, FadingType};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, warn};

/// Temporal coherence of the fading links
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CoherenceConfig {
    /// Correlation model
    #[serde(alias = "coherence")]
    pub model: CoherenceModel,
    /// Carrier frequency in Hz
    #[serde(alias = "carrier_freq")]
    pub carrier_frequency: f64,
    /// Relative velocity in m/s
    pub velocity: f64,
}

impl CoherenceConfig {
    pub fn build(&self) -> Result<Coherence, ChannelError> {
        Coherence::new(self.model, self.carrier_frequency, self.velocity)
    }
}

fn default_bandwidth() -> f64 {
    20.0e6
}

fn default_subcarriers() -> usize {
    64
}

/// MIMO channel configuration
///
/// Everything up to `equalizer_type` is required, unknown keys are rejected.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ChannelConfig {
    /// Time or frequency domain simulation
    pub domain: Domain,
    /// Per-link fading process
    #[serde(alias = "channel_type")]
    pub fading: FadingType,
    /// Code rate times bits per symbol
    pub effective_rate: f64,
    /// RMS delay spread in seconds
    pub rms_delay_spread: f64,
    /// Maximum delay spread in seconds
    pub max_delay_spread: f64,
    /// Number of transmit antennas
    pub tx_antennas: usize,
    /// Number of receive antennas
    pub rx_antennas: usize,
    /// Equalizer name, passed through to the state
    pub equalizer_type: String,
    /// Sampling bandwidth in Hz
    #[serde(default = "default_bandwidth")]
    pub bandwidth: f64,
    /// Subcarriers for the frequency domain
    #[serde(default = "default_subcarriers")]
    pub subcarriers: usize,
    /// Master seed, entropy when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    /// Coherence model, block fading when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coherence: Option<CoherenceConfig>,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            domain: Domain::Time,
            fading: FadingType::Rayleigh,
            effective_rate: 1.0,
            rms_delay_spread: 46.8e-9,
            max_delay_spread: 250.0e-9,
            tx_antennas: 1,
            rx_antennas: 1,
            equalizer_type: "ZF".to_string(),
            bandwidth: default_bandwidth(),
            subcarriers: default_subcarriers(),
            seed: None,
            coherence: None,
        }
    }
}

impl ChannelConfig {
    /// Configuration with default bandwidth and subcarriers
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        domain: Domain,
        fading: FadingType,
        effective_rate: f64,
        rms_delay_spread: f64,
        max_delay_spread: f64,
        tx_antennas: usize,
        rx_antennas: usize,
        equalizer_type: &str,
    ) -> Self {
        Self {
            domain,
            fading,
            effective_rate,
            rms_delay_spread,
            max_delay_spread,
            tx_antennas,
            rx_antennas,
            equalizer_type: equalizer_type.to_string(),
            ..Self::default()
        }
    }

    pub fn with_coherence(mut self, model: CoherenceModel, carrier_frequency: f64, velocity: f64) -> Self {
        self.coherence = Some(CoherenceConfig {
            model,
            carrier_frequency,
            velocity,
        });
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_bandwidth(mut self, bandwidth: f64) -> Self {
        self.bandwidth = bandwidth;
        self
    }

    pub fn with_subcarriers(mut self, subcarriers: usize) -> Self {
        self.subcarriers = subcarriers;
        self
    }

    pub fn from_toml_str(s: &str) -> Result<Self, ChannelError> {
        toml::from_str(s).map_err(|e| ChannelError::InvalidConfiguration(e.to_string()))
    }

    pub fn from_yaml_str(s: &str) -> Result<Self, ChannelError> {
        serde_yaml::from_str(s).map_err(|e| ChannelError::InvalidConfiguration(e.to_string()))
    }

    /// Load from a `.toml`, `.yaml` or `.yml` file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ChannelError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let config = match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::from_toml_str(&content)?,
            Some("yaml") | Some("yml") => Self::from_yaml_str(&content)?,
            _ => {
                return Err(ChannelError::InvalidConfiguration(format!(
                    "unknown configuration format: {}",
                    path.display()
                )))
            }
        };
        debug!("Loaded channel configuration from {}", path.display());
        Ok(config)
    }

    /// Amplitude scale of each link, total energy over all links is 1
    pub fn link_scale(&self) -> f64 {
        1.0 / ((self.tx_antennas * self.rx_antennas) as f64).sqrt()
    }

    /// Profile parameters of a single link
    pub fn profile_params(&self) -> ProfileParams {
        let params = ProfileParams::new(self.rms_delay_spread, self.max_delay_spread, self.bandwidth)
            .with_scale(self.link_scale());
        match self.domain {
            Domain::Time => params,
            Domain::Frequency => params.with_subcarriers(self.subcarriers),
        }
    }

    /// Subcarriers the noise energy is spread over
    pub fn noise_subcarriers(&self) -> usize {
        match self.domain {
            Domain::Time => 1,
            Domain::Frequency => self.subcarriers,
        }
    }

    /// Check the configuration, including a trial profile build
    pub fn validate(&self) -> Result<(), ChannelError> {
        if self.tx_antennas == 0 || self.rx_antennas == 0 {
            return Err(ChannelError::InvalidConfiguration(format!(
                "antenna counts must be positive, got tx={} rx={}",
                self.tx_antennas, self.rx_antennas
            )));
        }
        if !(self.effective_rate > 0.0 && self.effective_rate.is_finite()) {
            return Err(ChannelError::InvalidConfiguration(format!(
                "effective_rate must be positive, got {}",
                self.effective_rate
            )));
        }
        if !(self.bandwidth > 0.0 && self.bandwidth.is_finite()) {
            return Err(ChannelError::InvalidConfiguration(format!(
                "bandwidth must be positive, got {}",
                self.bandwidth
            )));
        }
        if self.domain == Domain::Frequency && self.subcarriers == 0 {
            return Err(ChannelError::InvalidConfiguration(
                "subcarriers must be positive in the frequency domain".to_string(),
            ));
        }

        self.profile_params().build()?;

        if let Some(coherence) = &self.coherence {
            coherence.build()?;
            if self.fading == FadingType::Awgn {
                warn!("Coherence configured with awgn fading, it has no effect");
            }
        }
        Ok(())
    }
}
