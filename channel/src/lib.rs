//! Stochastic Channel Model Library
//!
//! This crate generates time-varying, frequency-selective multipath channels
//! for receiver evaluation: power delay profiles, Doppler coherence,
//! frequency-domain views, calibrated AWGN and MIMO composition.

pub mod awgn;
pub mod config;
pub mod factory;
pub mod fading;

pub use awgn::{complex_noise, Awgn, AwgnState};
pub use config::{ChannelConfig, CoherenceConfig};
pub use factory::{ChannelFactory, Link, MimoChannel, MimoChannelState};
pub use fading::{
    ChannelCoherence, ChannelState, Coherence, CoherentTimeVariantChannel, DelayProfile,
    FadingChannel, FftPowerDelayProfile, FrequencyDomainChannel, FrequencySelective,
    PowerDelayProfile, Profile, ProfileParams, StaticChannel, TimeVariant, TimeVariantChannel,
    TransmissionChannel,
};

use thiserror::Error;

/// Errors raised while constructing or driving a channel
#[derive(Error, Debug)]
pub enum ChannelError {
    #[error("Unsupported profile shape: {0}")]
    UnsupportedShape(String),

    #[error("Parameter out of physical range: {parameter} = {value}")]
    OutOfRange {
        parameter: &'static str,
        value: f64,
    },

    #[error("Missing frequency-domain configuration")]
    MissingFrequencyConfig,

    #[error("Numerical drift: {0}")]
    NumericalDrift(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
