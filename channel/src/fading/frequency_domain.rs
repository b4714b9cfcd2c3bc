//! Frequency-Domain View of a Fading Channel
//!
//! Wraps a time-variant channel whose profile is calibrated for a
//! multicarrier transform and keeps per-subcarrier taps and power gains in
//! sync with it.

use crate::ChannelError;
use num_complex::Complex32;
use rustfft::{Fft, FftPlanner};
use std::sync::Arc;
use tracing::debug;

use super::{fft_taps, ChannelState, FrequencySelective, TimeVariant};

pub struct FrequencyDomainChannel<C: TimeVariant> {
    channel: C,
    subcarriers: usize,
    fft: Arc<dyn Fft<f32>>,
    freq_taps: Vec<Complex32>,
    freq_gains: Vec<f32>,
}

impl<C: TimeVariant> FrequencyDomainChannel<C> {
    /// Wrap `channel`, taking the transform size from its profile
    pub fn new(channel: C) -> Result<Self, ChannelError> {
        let subcarriers = channel
            .frequency_selective()
            .map(|f| f.subcarriers())
            .ok_or(ChannelError::MissingFrequencyConfig)?;
        if subcarriers == 0 {
            return Err(ChannelError::InvalidConfiguration(
                "subcarriers must be positive".to_string(),
            ));
        }

        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(subcarriers);
        debug!(
            "Frequency-domain channel: {} taps onto {} subcarriers",
            channel.channel_length(),
            subcarriers
        );

        let mut chan = Self {
            channel,
            subcarriers,
            fft,
            freq_taps: Vec::new(),
            freq_gains: Vec::new(),
        };
        chan.update_freq_domain();
        Ok(chan)
    }

    fn update_freq_domain(&mut self) {
        self.freq_taps = fft_taps(self.fft.as_ref(), self.channel.channel_taps());
        self.freq_gains = self.freq_taps.iter().map(|t| t.norm_sqr()).collect();
    }

    /// Advance the wrapped channel and refresh the frequency response
    pub fn step(&mut self, time_delta: f64) {
        self.channel.step(time_delta);
        self.update_freq_domain();
    }

    pub fn subcarriers(&self) -> usize {
        self.subcarriers
    }

    /// Complex response per subcarrier
    pub fn freq_domain_taps(&self) -> &[Complex32] {
        &self.freq_taps
    }

    /// Power gain per subcarrier
    pub fn freq_domain_gains(&self) -> &[f32] {
        &self.freq_gains
    }

    pub fn time_domain_taps(&self) -> &[Complex32] {
        self.channel.channel_taps()
    }

    pub fn time_domain_length(&self) -> usize {
        self.channel.channel_length()
    }

    pub fn state(&self) -> ChannelState {
        self.channel.state()
    }

    /// The wrapped time-variant channel
    pub fn channel(&self) -> &C {
        &self.channel
    }
}

impl<C: TimeVariant> TimeVariant for FrequencyDomainChannel<C> {
    fn step(&mut self, time_delta: f64) {
        FrequencyDomainChannel::step(self, time_delta);
    }

    fn channel_taps(&self) -> &[Complex32] {
        self.time_domain_taps()
    }

    fn channel_length(&self) -> usize {
        self.time_domain_length()
    }

    fn state(&self) -> ChannelState {
        FrequencyDomainChannel::state(self)
    }

    fn frequency_selective(&self) -> Option<&dyn FrequencySelective> {
        Some(self)
    }
}

impl<C: TimeVariant> FrequencySelective for FrequencyDomainChannel<C> {
    fn subcarriers(&self) -> usize {
        self.subcarriers
    }
}
