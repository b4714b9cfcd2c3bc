//! Power Delay Profiles
//!
//! Exponentially decaying multipath profiles sampled at the bandwidth-derived
//! tap spacing. A profile is built by a pure function of its parameters;
//! changing the scale means building a new profile.

use crate::ChannelError;
use common::types::ProfileShape;
use num_complex::{Complex32, Complex64};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{transform, DelayProfile, FrequencySelective};

/// Largest RMS delay spread accepted, in seconds
pub const MAX_RMS_DELAY_SPREAD: f64 = 1.0e-5;
/// Largest maximum delay spread accepted, in seconds
pub const MAX_MAX_DELAY_SPREAD: f64 = 1.0e-4;

/// Relative tolerance on the time-domain energy normalization
const ENERGY_TOLERANCE: f64 = 1.0e-13;
/// Relative tolerance on the mean frequency-domain gain
const FREQ_ENERGY_TOLERANCE: f64 = 1.0e-6;

fn default_scale() -> f64 {
    1.0
}

/// Parameters of a power delay profile
///
/// This is both the construction input and the `state()` snapshot, so a
/// profile rebuilt from its state is identical to the original.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileParams {
    /// RMS delay spread in seconds
    pub rms_delay_spread: f64,
    /// Maximum delay spread in seconds (exclusive upper tap delay)
    pub max_delay_spread: f64,
    /// Sampling bandwidth in Hz, taps are spaced 1/bandwidth apart
    pub bandwidth: f64,
    /// Amplitude scale, total energy becomes scale^2
    #[serde(default = "default_scale")]
    pub scale: f64,
    /// Decay law
    #[serde(default)]
    pub shape: ProfileShape,
    /// Subcarrier count for frequency-calibrated profiles
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subcarriers: Option<usize>,
}

impl ProfileParams {
    /// Unit-scale exponential profile parameters
    pub fn new(rms_delay_spread: f64, max_delay_spread: f64, bandwidth: f64) -> Self {
        Self {
            rms_delay_spread,
            max_delay_spread,
            bandwidth,
            scale: default_scale(),
            shape: ProfileShape::Exponential,
            subcarriers: None,
        }
    }

    /// Set the amplitude scale
    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    /// Calibrate for a transform onto `subcarriers` bins
    pub fn with_subcarriers(mut self, subcarriers: usize) -> Self {
        self.subcarriers = Some(subcarriers);
        self
    }

    /// Number of taps these parameters produce
    pub fn num_taps(&self) -> usize {
        (self.max_delay_spread * self.bandwidth).ceil() as usize
    }

    /// Build the profile variant these parameters describe
    pub fn build(&self) -> Result<Profile, ChannelError> {
        Profile::from_params(self)
    }

    fn validate(&self) -> Result<(), ChannelError> {
        if !(self.rms_delay_spread > 0.0 && self.rms_delay_spread <= MAX_RMS_DELAY_SPREAD) {
            return Err(ChannelError::OutOfRange {
                parameter: "rms_delay_spread",
                value: self.rms_delay_spread,
            });
        }
        if !(self.max_delay_spread > 0.0 && self.max_delay_spread <= MAX_MAX_DELAY_SPREAD) {
            return Err(ChannelError::OutOfRange {
                parameter: "max_delay_spread",
                value: self.max_delay_spread,
            });
        }
        if !(self.bandwidth > 0.0 && self.bandwidth.is_finite()) {
            return Err(ChannelError::OutOfRange {
                parameter: "bandwidth",
                value: self.bandwidth,
            });
        }
        if !(self.scale > 0.0 && self.scale.is_finite()) {
            return Err(ChannelError::OutOfRange {
                parameter: "scale",
                value: self.scale,
            });
        }
        Ok(())
    }
}

/// Exponential law `exp(-tau / beta) / beta`
fn exp_dist(supports: &[f64], beta: f64) -> Vec<f64> {
    supports.iter().map(|&t| (-t / beta).exp() / beta).collect()
}

/// Build a time-domain power delay profile
///
/// Taps sit at `k / bandwidth` for `k = 0..ceil(max_delay_spread * bandwidth)`.
/// Magnitudes follow the decay law, normalized to unit energy and then
/// multiplied by `scale`. The `subcarriers` field is ignored here.
pub fn build_profile(params: &ProfileParams) -> Result<PowerDelayProfile, ChannelError> {
    params.validate()?;

    let samp_dur = 1.0 / params.bandwidth;
    let num_taps = params.num_taps();
    if num_taps == 0 {
        return Err(ChannelError::NumericalDrift(format!(
            "profile with max_delay_spread={} at bandwidth={} has no taps",
            params.max_delay_spread, params.bandwidth
        )));
    }
    let supports: Vec<f64> = (0..num_taps).map(|k| k as f64 * samp_dur).collect();

    let magnitudes = match params.shape {
        ProfileShape::Exponential => exp_dist(&supports, params.rms_delay_spread),
    };

    let raw_energy: f64 = magnitudes.iter().map(|m| m * m).sum();
    let norm = raw_energy.sqrt();
    if !(norm > 0.0 && norm.is_finite()) {
        return Err(ChannelError::NumericalDrift(format!(
            "cannot normalize profile energy {}",
            raw_energy
        )));
    }
    let normalized: Vec<f64> = magnitudes.iter().map(|m| m / norm).collect();
    let unit_energy: f64 = normalized.iter().map(|m| m * m).sum();
    if (unit_energy - 1.0).abs() > ENERGY_TOLERANCE {
        return Err(ChannelError::NumericalDrift(format!(
            "normalized profile energy {} deviates from 1",
            unit_energy
        )));
    }

    let scaled: Vec<f64> = normalized.iter().map(|m| m * params.scale).collect();
    let energy: f64 = scaled.iter().map(|m| m * m).sum();
    if (energy.sqrt() - params.scale).abs() > ENERGY_TOLERANCE * params.scale.max(1.0) {
        return Err(ChannelError::NumericalDrift(format!(
            "scaled profile amplitude {} deviates from scale {}",
            energy.sqrt(),
            params.scale
        )));
    }

    let taps = scaled
        .iter()
        .map(|&m| Complex32::new(m as f32, 0.0))
        .collect();

    debug!(
        "Built {} PDP: {} taps, rms={:e}s, max={:e}s, bw={:e}Hz, scale={}",
        params.shape, num_taps, params.rms_delay_spread, params.max_delay_spread,
        params.bandwidth, params.scale
    );

    Ok(PowerDelayProfile {
        params: ProfileParams {
            subcarriers: None,
            ..params.clone()
        },
        supports,
        taps,
    })
}

/// Time-domain power delay profile
#[derive(Debug, Clone, PartialEq)]
pub struct PowerDelayProfile {
    params: ProfileParams,
    supports: Vec<f64>,
    taps: Vec<Complex32>,
}

impl PowerDelayProfile {
    /// Unit-scale exponential profile
    pub fn new(
        rms_delay_spread: f64,
        max_delay_spread: f64,
        bandwidth: f64,
    ) -> Result<Self, ChannelError> {
        build_profile(&ProfileParams::new(rms_delay_spread, max_delay_spread, bandwidth))
    }

    /// Exponential profile with total energy `scale^2`
    pub fn with_scale(
        rms_delay_spread: f64,
        max_delay_spread: f64,
        bandwidth: f64,
        scale: f64,
    ) -> Result<Self, ChannelError> {
        build_profile(&ProfileParams::new(rms_delay_spread, max_delay_spread, bandwidth).with_scale(scale))
    }

    /// Profile with a textual shape name such as `"exponential"` or `"Exp"`
    pub fn with_shape(
        rms_delay_spread: f64,
        max_delay_spread: f64,
        bandwidth: f64,
        scale: f64,
        shape: &str,
    ) -> Result<Self, ChannelError> {
        let shape: ProfileShape = shape
            .parse()
            .map_err(|_| ChannelError::UnsupportedShape(shape.to_string()))?;
        let params = ProfileParams {
            shape,
            ..ProfileParams::new(rms_delay_spread, max_delay_spread, bandwidth).with_scale(scale)
        };
        build_profile(&params)
    }

    /// Rebuild from a parameter snapshot
    pub fn from_params(params: &ProfileParams) -> Result<Self, ChannelError> {
        build_profile(params)
    }

    /// Tap spacing in seconds
    pub fn samp_ticks(&self) -> f64 {
        1.0 / self.params.bandwidth
    }

    /// Decay law
    pub fn shape(&self) -> ProfileShape {
        self.params.shape
    }
}

impl DelayProfile for PowerDelayProfile {
    fn taps(&self) -> &[Complex32] {
        &self.taps
    }

    fn supports(&self) -> &[f64] {
        &self.supports
    }

    fn scale(&self) -> f64 {
        self.params.scale
    }

    fn state(&self) -> ProfileParams {
        self.params.clone()
    }
}

/// Power delay profile calibrated for a multicarrier transform
///
/// After zero-padding (or truncating) the taps to `subcarriers` bins and
/// transforming, the mean per-bin gain equals `scale^2`. Plain time-domain
/// normalization does not give this once the tap count differs from the
/// transform length, so the profile is built twice: once at unit scale to
/// measure the transformed energy, then again with the corrected scale.
#[derive(Debug, Clone, PartialEq)]
pub struct FftPowerDelayProfile {
    target: ProfileParams,
    subcarriers: usize,
    profile: PowerDelayProfile,
}

impl FftPowerDelayProfile {
    /// Unit mean-gain exponential profile over `subcarriers` bins
    pub fn new(
        rms_delay_spread: f64,
        max_delay_spread: f64,
        bandwidth: f64,
        subcarriers: usize,
    ) -> Result<Self, ChannelError> {
        Self::from_params(
            &ProfileParams::new(rms_delay_spread, max_delay_spread, bandwidth)
                .with_subcarriers(subcarriers),
        )
    }

    /// Exponential profile with mean per-bin gain `scale^2`
    pub fn with_scale(
        rms_delay_spread: f64,
        max_delay_spread: f64,
        bandwidth: f64,
        subcarriers: usize,
        scale: f64,
    ) -> Result<Self, ChannelError> {
        Self::from_params(
            &ProfileParams::new(rms_delay_spread, max_delay_spread, bandwidth)
                .with_scale(scale)
                .with_subcarriers(subcarriers),
        )
    }

    /// Build from parameters carrying a subcarrier count
    pub fn from_params(params: &ProfileParams) -> Result<Self, ChannelError> {
        let subcarriers = params.subcarriers.ok_or(ChannelError::MissingFrequencyConfig)?;
        if subcarriers == 0 {
            return Err(ChannelError::InvalidConfiguration(
                "subcarriers must be positive".to_string(),
            ));
        }

        let unit = build_profile(&params.clone().with_scale(1.0))?;
        let unit_energy = transformed_mean_energy(unit.taps(), subcarriers);
        if !(unit_energy > 0.0 && unit_energy.is_finite()) {
            return Err(ChannelError::NumericalDrift(format!(
                "transformed profile energy {} over {} subcarriers",
                unit_energy, subcarriers
            )));
        }

        let time_domain_scale = params.scale / unit_energy.sqrt();
        let profile = build_profile(&params.clone().with_scale(time_domain_scale))?;

        let target_energy = params.scale * params.scale;
        let mean_energy = transformed_mean_energy(profile.taps(), subcarriers);
        if (mean_energy / target_energy - 1.0).abs() > FREQ_ENERGY_TOLERANCE {
            return Err(ChannelError::NumericalDrift(format!(
                "mean subcarrier gain {} deviates from {}",
                mean_energy, target_energy
            )));
        }

        debug!(
            "Built FFT PDP over {} subcarriers: target scale={}, time-domain scale={}",
            subcarriers, params.scale, time_domain_scale
        );

        Ok(Self {
            target: params.clone(),
            subcarriers,
            profile,
        })
    }

    /// Scale actually applied to the time-domain taps
    pub fn time_domain_scale(&self) -> f64 {
        self.profile.scale()
    }

    /// Tap spacing in seconds
    pub fn samp_ticks(&self) -> f64 {
        self.profile.samp_ticks()
    }

    /// The underlying time-domain profile
    pub fn time_domain(&self) -> &PowerDelayProfile {
        &self.profile
    }
}

/// Mean of `|FFT(taps, n)|^2`, computed in double precision
fn transformed_mean_energy(taps: &[Complex32], subcarriers: usize) -> f64 {
    let taps: Vec<Complex64> = taps
        .iter()
        .map(|t| Complex64::new(t.re as f64, t.im as f64))
        .collect();
    let bins = transform(&taps, subcarriers);
    bins.iter().map(|b| b.norm_sqr()).sum::<f64>() / subcarriers as f64
}

impl DelayProfile for FftPowerDelayProfile {
    fn taps(&self) -> &[Complex32] {
        self.profile.taps()
    }

    fn supports(&self) -> &[f64] {
        self.profile.supports()
    }

    fn scale(&self) -> f64 {
        self.target.scale
    }

    fn state(&self) -> ProfileParams {
        self.target.clone()
    }

    fn frequency_selective(&self) -> Option<&dyn FrequencySelective> {
        Some(self)
    }
}

impl FrequencySelective for FftPowerDelayProfile {
    fn subcarriers(&self) -> usize {
        self.subcarriers
    }
}

/// Profile variant selected from configuration
#[derive(Debug, Clone, PartialEq)]
pub enum Profile {
    Time(PowerDelayProfile),
    Frequency(FftPowerDelayProfile),
}

impl Profile {
    /// Frequency-calibrated when `subcarriers` is set, time-domain otherwise
    pub fn from_params(params: &ProfileParams) -> Result<Self, ChannelError> {
        match params.subcarriers {
            Some(_) => Ok(Profile::Frequency(FftPowerDelayProfile::from_params(params)?)),
            None => Ok(Profile::Time(build_profile(params)?)),
        }
    }
}

impl From<PowerDelayProfile> for Profile {
    fn from(pdp: PowerDelayProfile) -> Self {
        Profile::Time(pdp)
    }
}

impl From<FftPowerDelayProfile> for Profile {
    fn from(pdp: FftPowerDelayProfile) -> Self {
        Profile::Frequency(pdp)
    }
}

impl DelayProfile for Profile {
    fn taps(&self) -> &[Complex32] {
        match self {
            Profile::Time(p) => p.taps(),
            Profile::Frequency(p) => p.taps(),
        }
    }

    fn supports(&self) -> &[f64] {
        match self {
            Profile::Time(p) => p.supports(),
            Profile::Frequency(p) => p.supports(),
        }
    }

    fn scale(&self) -> f64 {
        match self {
            Profile::Time(p) => p.scale(),
            Profile::Frequency(p) => p.scale(),
        }
    }

    fn state(&self) -> ProfileParams {
        match self {
            Profile::Time(p) => p.state(),
            Profile::Frequency(p) => p.state(),
        }
    }

    fn frequency_selective(&self) -> Option<&dyn FrequencySelective> {
        match self {
            Profile::Time(p) => p.frequency_selective(),
            Profile::Frequency(p) => p.frequency_selective(),
        }
    }
}
