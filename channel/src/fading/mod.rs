//! Fading Channel Submodules
//!
//! Multipath profiles, temporal coherence and the time-variant tap
//! processes built on top of them, plus the shared capability traits.

pub mod coherence;
pub mod frequency_domain;
pub mod pdp;
pub mod time_variant;
pub mod transmission;

// Re-export commonly used types
pub use coherence::{bessel_j0, ChannelCoherence, Coherence, CoherenceState, SPEED_OF_LIGHT};
pub use frequency_domain::FrequencyDomainChannel;
pub use pdp::{build_profile, FftPowerDelayProfile, PowerDelayProfile, Profile, ProfileParams};
pub use time_variant::{CoherentTimeVariantChannel, FadingChannel, StaticChannel, TimeVariantChannel};
pub use transmission::TransmissionChannel;

use num_complex::{Complex, Complex32};
use rustfft::{Fft, FftNum, FftPlanner};
use serde::Serialize;

/// Default simulation time advanced by one `step()`, in seconds
pub const DEFAULT_TIME_DELTA: f64 = 1.0e-3;

/// A multipath power delay profile
pub trait DelayProfile {
    /// Complex tap amplitudes
    fn taps(&self) -> &[Complex32];

    /// Tap delays in seconds
    fn supports(&self) -> &[f64];

    /// Number of taps
    fn num_taps(&self) -> usize {
        self.taps().len()
    }

    /// Configured amplitude scale
    fn scale(&self) -> f64;

    /// Parameters that rebuild this profile
    fn state(&self) -> ProfileParams;

    /// Frequency-domain capability, if the profile is calibrated for one
    fn frequency_selective(&self) -> Option<&dyn FrequencySelective> {
        None
    }
}

/// Capability of channels calibrated for a multicarrier transform
pub trait FrequencySelective {
    /// Number of subcarriers the taps are calibrated for
    fn subcarriers(&self) -> usize;
}

/// Common interface of time-variant channel stages
pub trait TimeVariant {
    /// Advance simulated time by `time_delta` seconds
    fn step(&mut self, time_delta: f64);

    /// Advance simulated time by [`DEFAULT_TIME_DELTA`]
    fn step_default(&mut self) {
        self.step(DEFAULT_TIME_DELTA);
    }

    /// Current time-domain taps
    fn channel_taps(&self) -> &[Complex32];

    /// Number of time-domain taps
    fn channel_length(&self) -> usize;

    /// Configuration snapshot
    fn state(&self) -> ChannelState;

    /// Frequency-domain capability of the underlying profile
    fn frequency_selective(&self) -> Option<&dyn FrequencySelective> {
        None
    }
}

/// Configuration snapshot of a time-variant channel
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ChannelState {
    /// Profile parameters, absent for flat channels
    #[serde(flatten)]
    pub profile: Option<ProfileParams>,
    /// Coherence parameters, absent for block fading
    #[serde(flatten)]
    pub coherence: Option<CoherenceState>,
}

/// Forward transform of `taps` onto `fft.len()` bins
///
/// The input is zero-padded or truncated to the transform length, the
/// output is unnormalized.
pub fn fft_taps<T: FftNum>(fft: &dyn Fft<T>, taps: &[Complex<T>]) -> Vec<Complex<T>> {
    let len = fft.len();
    let zero = Complex::new(T::zero(), T::zero());
    let mut buffer: Vec<Complex<T>> = taps.iter().take(len).copied().collect();
    buffer.resize(len, zero);
    if len > 0 {
        fft.process(&mut buffer);
    }
    buffer
}

/// One-shot forward transform of `taps` onto `len` bins
pub fn transform<T: FftNum>(taps: &[Complex<T>], len: usize) -> Vec<Complex<T>> {
    if len == 0 {
        return Vec::new();
    }
    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(len);
    fft_taps(fft.as_ref(), taps)
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_complex::Complex64;

    #[test]
    fn test_transform_of_impulse_is_flat() {
        let taps = vec![Complex64::new(1.0, 0.0)];
        let bins = transform(&taps, 16);
        assert_eq!(bins.len(), 16);
        for b in &bins {
            assert!((b - Complex64::new(1.0, 0.0)).norm() < 1e-12);
        }
    }

    #[test]
    fn test_transform_truncates() {
        // Only the first two taps survive a length-2 transform
        let taps = vec![
            Complex64::new(1.0, 0.0),
            Complex64::new(2.0, 0.0),
            Complex64::new(100.0, 0.0),
        ];
        let bins = transform(&taps, 2);
        assert!((bins[0] - Complex64::new(3.0, 0.0)).norm() < 1e-12);
        assert!((bins[1] - Complex64::new(-1.0, 0.0)).norm() < 1e-12);
    }

    #[test]
    fn test_transform_empty() {
        let taps = vec![Complex32::new(1.0, 0.0)];
        assert!(transform(&taps, 0).is_empty());
    }
}
