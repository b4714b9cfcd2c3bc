//! Multipath Transmission
//!
//! Applies the current taps of a time-variant channel to a symbol stream by
//! linear convolution, keeping the first `tx.len()` output samples.

use num_complex::Complex32;
use num_traits::Zero;

use super::{ChannelState, FadingChannel, TimeVariant, DEFAULT_TIME_DELTA};

pub struct TransmissionChannel<C: TimeVariant = FadingChannel> {
    channel: C,
}

impl<C: TimeVariant> TransmissionChannel<C> {
    pub fn new(channel: C) -> Self {
        Self { channel }
    }

    /// Convolve `tx` with the current taps, truncated to the input length
    pub fn transmit(&self, tx: &[Complex32]) -> Vec<Complex32> {
        let h = self.channel.channel_taps();
        let mut rx = vec![Complex32::zero(); tx.len()];
        for (n, out) in rx.iter_mut().enumerate() {
            let mut acc = Complex32::zero();
            for (k, tap) in h.iter().enumerate().take(n + 1) {
                acc += tx[n - k] * tap;
            }
            *out = acc;
        }
        rx
    }

    /// Advance the underlying channel
    pub fn step(&mut self, time_delta: f64) {
        self.channel.step(time_delta);
    }

    pub fn step_default(&mut self) {
        self.step(DEFAULT_TIME_DELTA);
    }

    pub fn channel_taps(&self) -> &[Complex32] {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fading::{PowerDelayProfile, StaticChannel, TimeVariantChannel};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    /// Channel with fixed taps for checking the convolution
    struct FixedTaps(Vec<Complex32>);

    impl TimeVariant for FixedTaps {
        fn step(&mut self, _time_delta: f64) {}

        fn channel_taps(&self) -> &[Complex32] {
            &self.0
        }

        fn channel_length(&self) -> usize {
            self.0.len()
        }

        fn state(&self) -> ChannelState {
            ChannelState::default()
        }
    }

    fn c(re: f32) -> Complex32 {
        Complex32::new(re, 0.0)
    }

    #[test]
    fn test_truncated_convolution() {
        let chan = TransmissionChannel::new(FixedTaps(vec![c(1.0), c(0.5)]));
        let rx = chan.transmit(&[c(1.0), c(2.0), c(3.0)]);
        assert_eq!(rx, vec![c(1.0), c(2.5), c(4.0)]);
    }

    #[test]
    fn test_complex_taps() {
        let j = Complex32::new(0.0, 1.0);
        let chan = TransmissionChannel::new(FixedTaps(vec![j]));
        let rx = chan.transmit(&[c(1.0), j]);
        assert_eq!(rx, vec![j, c(-1.0)]);
    }

    #[test]
    fn test_more_taps_than_symbols() {
        let chan = TransmissionChannel::new(FixedTaps(vec![c(1.0), c(1.0), c(1.0), c(1.0)]));
        assert_eq!(chan.transmit(&[c(1.0), c(1.0)]), vec![c(1.0), c(2.0)]);
        assert!(chan.transmit(&[]).is_empty());
    }

    #[test]
    fn test_static_link_scales() {
        let chan = TransmissionChannel::new(StaticChannel::new(0.5));
        assert_eq!(chan.transmit(&[c(2.0), c(4.0)]), vec![c(1.0), c(2.0)]);
        assert_eq!(chan.time_domain_length(), 1);
    }

    #[test]
    fn test_follows_channel() {
        let pdp = PowerDelayProfile::new(46.8e-9, 250.0e-9, 20.0e6).unwrap();
        let mut chan = TransmissionChannel::new(TimeVariantChannel::new(pdp, StdRng::seed_from_u64(1)));
        let before = chan.channel_taps().to_vec();
        chan.step_default();
        assert_ne!(chan.channel_taps(), &before[..]);
        let rx = chan.transmit(&[c(1.0), c(0.0), c(0.0)]);
        for (r, t) in rx.iter().zip(chan.channel_taps()) {
            assert_eq!(r, t);
        }
        assert!(chan.state().profile.is_some());
    }
}
