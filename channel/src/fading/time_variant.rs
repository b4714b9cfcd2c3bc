//! Time-Variant Fading Channels
//!
//! A fading channel multiplies a random complex state vector onto the taps
//! of its power delay profile. The state is either redrawn independently on
//! every step (block fading) or evolved with a first-order autoregressive
//! recursion driven by a coherence model.

use crate::awgn::complex_noise;
use num_complex::Complex32;
use rand::rngs::StdRng;
use tracing::trace;

use super::{
    ChannelCoherence, ChannelState, Coherence, DelayProfile, FrequencySelective, Profile,
    TimeVariant,
};

/// Rayleigh block-fading channel with independent redraws
pub struct TimeVariantChannel<P: DelayProfile = Profile> {
    pdp: P,
    channel_state: Vec<Complex32>,
    taps: Vec<Complex32>,
    rng: StdRng,
}

impl<P: DelayProfile> TimeVariantChannel<P> {
    /// Create a channel with an i.i.d. unit-variance initial state
    pub fn new(pdp: P, mut rng: StdRng) -> Self {
        let channel_state = complex_noise(&mut rng, pdp.num_taps(), 1.0);
        let mut channel = Self {
            pdp,
            channel_state,
            taps: Vec::new(),
            rng,
        };
        channel.update_channel_taps();
        channel
    }

    /// The power delay profile shaping this channel
    pub fn profile(&self) -> &P {
        &self.pdp
    }

    /// Current fading state, one unit-variance coefficient per tap
    pub fn channel_state(&self) -> &[Complex32] {
        &self.channel_state
    }

    fn update_channel_state(&mut self) {
        self.channel_state = complex_noise(&mut self.rng, self.pdp.num_taps(), 1.0);
    }

    fn update_channel_taps(&mut self) {
        self.taps = self
            .channel_state
            .iter()
            .zip(self.pdp.taps())
            .map(|(s, t)| s * t)
            .collect();
    }
}

impl<P: DelayProfile> TimeVariant for TimeVariantChannel<P> {
    fn step(&mut self, _time_delta: f64) {
        self.update_channel_state();
        self.update_channel_taps();
    }

    fn channel_taps(&self) -> &[Complex32] {
        &self.taps
    }

    fn channel_length(&self) -> usize {
        self.pdp.num_taps()
    }

    fn state(&self) -> ChannelState {
        ChannelState {
            profile: Some(self.pdp.state()),
            coherence: None,
        }
    }

    fn frequency_selective(&self) -> Option<&dyn FrequencySelective> {
        self.pdp.frequency_selective()
    }
}

/// Rayleigh fading channel with temporally correlated taps
///
/// `state <- sqrt(c) * state + sqrt(1 - c) * n` with `c` the coherence
/// coefficient for the step and `n` fresh unit-variance noise. The state
/// keeps unit variance for any `c` in [0, 1].
pub struct CoherentTimeVariantChannel<P: DelayProfile = Profile> {
    channel: TimeVariantChannel<P>,
    coherence: Coherence,
}

impl<P: DelayProfile> CoherentTimeVariantChannel<P> {
    pub fn new(pdp: P, coherence: Coherence, rng: StdRng) -> Self {
        Self {
            channel: TimeVariantChannel::new(pdp, rng),
            coherence,
        }
    }

    pub fn profile(&self) -> &P {
        self.channel.profile()
    }

    pub fn coherence(&self) -> &Coherence {
        &self.coherence
    }

    pub fn channel_state(&self) -> &[Complex32] {
        self.channel.channel_state()
    }

    fn current_weight(covariance: f64) -> f32 {
        covariance.sqrt() as f32
    }

    fn next_weight(covariance: f64) -> f32 {
        (1.0 - covariance).max(0.0).sqrt() as f32
    }

    fn update_channel_state(&mut self, time_delta: f64) {
        let cov = self.coherence.coherence_time(time_delta);
        let current = Self::current_weight(cov);
        let next = Self::next_weight(cov);
        trace!("Coherent step: dt={:e}s, covariance={:.6}", time_delta, cov);

        let inner = &mut self.channel;
        let noise = complex_noise(&mut inner.rng, inner.pdp.num_taps(), 1.0);
        for (s, n) in inner.channel_state.iter_mut().zip(noise) {
            *s = *s * current + n * next;
        }
    }
}

impl<P: DelayProfile> TimeVariant for CoherentTimeVariantChannel<P> {
    fn step(&mut self, time_delta: f64) {
        self.update_channel_state(time_delta);
        self.channel.update_channel_taps();
    }

    fn channel_taps(&self) -> &[Complex32] {
        self.channel.channel_taps()
    }

    fn channel_length(&self) -> usize {
        self.channel.channel_length()
    }

    fn state(&self) -> ChannelState {
        ChannelState {
            profile: Some(self.channel.pdp.state()),
            coherence: Some(self.coherence.state()),
        }
    }

    fn frequency_selective(&self) -> Option<&dyn FrequencySelective> {
        self.channel.frequency_selective()
    }
}

/// Flat, non-fading link with a single constant tap
#[derive(Debug, Clone, PartialEq)]
pub struct StaticChannel {
    taps: Vec<Complex32>,
    subcarriers: Option<usize>,
}

impl StaticChannel {
    /// Single tap of amplitude `scale`
    pub fn new(scale: f64) -> Self {
        Self {
            taps: vec![Complex32::new(scale as f32, 0.0)],
            subcarriers: None,
        }
    }

    /// Flat channel observed over `subcarriers` bins
    pub fn with_subcarriers(scale: f64, subcarriers: usize) -> Self {
        Self {
            subcarriers: Some(subcarriers),
            ..Self::new(scale)
        }
    }
}

impl TimeVariant for StaticChannel {
    fn step(&mut self, _time_delta: f64) {}

    fn channel_taps(&self) -> &[Complex32] {
        &self.taps
    }

    fn channel_length(&self) -> usize {
        self.taps.len()
    }

    fn state(&self) -> ChannelState {
        ChannelState::default()
    }

    fn frequency_selective(&self) -> Option<&dyn FrequencySelective> {
        self.subcarriers.map(|_| self as &dyn FrequencySelective)
    }
}

impl FrequencySelective for StaticChannel {
    fn subcarriers(&self) -> usize {
        self.subcarriers.unwrap_or(1)
    }
}

/// Per-link fading process selected from configuration
pub enum FadingChannel {
    Static(StaticChannel),
    Independent(TimeVariantChannel<Profile>),
    Coherent(CoherentTimeVariantChannel<Profile>),
}

impl FadingChannel {
    /// Profile of a fading link, `None` for static links
    pub fn profile(&self) -> Option<&Profile> {
        match self {
            FadingChannel::Static(_) => None,
            FadingChannel::Independent(c) => Some(c.profile()),
            FadingChannel::Coherent(c) => Some(c.profile()),
        }
    }
}

impl TimeVariant for FadingChannel {
    fn step(&mut self, time_delta: f64) {
        match self {
            FadingChannel::Static(c) => c.step(time_delta),
            FadingChannel::Independent(c) => c.step(time_delta),
            FadingChannel::Coherent(c) => c.step(time_delta),
        }
    }

    fn channel_taps(&self) -> &[Complex32] {
        match self {
            FadingChannel::Static(c) => c.channel_taps(),
            FadingChannel::Independent(c) => c.channel_taps(),
            FadingChannel::Coherent(c) => c.channel_taps(),
        }
    }

    fn channel_length(&self) -> usize {
        match self {
            FadingChannel::Static(c) => c.channel_length(),
            FadingChannel::Independent(c) => c.channel_length(),
            FadingChannel::Coherent(c) => c.channel_length(),
        }
    }

    fn state(&self) -> ChannelState {
        match self {
            FadingChannel::Static(c) => c.state(),
            FadingChannel::Independent(c) => c.state(),
            FadingChannel::Coherent(c) => c.state(),
        }
    }

    fn frequency_selective(&self) -> Option<&dyn FrequencySelective> {
        match self {
            FadingChannel::Static(c) => c.frequency_selective(),
            FadingChannel::Independent(c) => c.frequency_selective(),
            FadingChannel::Coherent(c) => c.frequency_selective(),
        }
    }
}
