//! Channel Factory and MIMO Composition
//!
//! Builds a grid of independent fading links, one per receive/transmit
//! antenna pair, followed by a shared AWGN stage. Each link carries
//! amplitude `1/sqrt(tx * rx)` so the expected received energy summed over
//! all links is 1.

use crate::awgn::Awgn;
use crate::config::ChannelConfig;
use crate::fading::{
    ChannelState, CoherentTimeVariantChannel, FadingChannel, FrequencyDomainChannel,
    FrequencySelective, Profile, StaticChannel, TimeVariant, TimeVariantChannel,
    TransmissionChannel, DEFAULT_TIME_DELTA,
};
use crate::ChannelError;
use common::types::{CoherenceModel, Domain, FadingType};
use ndarray::{Array2, Array3};
use num_complex::Complex32;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Fading process of one antenna pair, optionally viewed per subcarrier
pub enum Link {
    Time(FadingChannel),
    Frequency(FrequencyDomainChannel<FadingChannel>),
}

impl Link {
    /// Profile of a fading link, `None` for static links
    pub fn profile(&self) -> Option<&Profile> {
        match self {
            Link::Time(c) => c.profile(),
            Link::Frequency(c) => c.channel().profile(),
        }
    }

    pub fn freq_domain_taps(&self) -> Option<&[Complex32]> {
        match self {
            Link::Time(_) => None,
            Link::Frequency(c) => Some(c.freq_domain_taps()),
        }
    }

    pub fn freq_domain_gains(&self) -> Option<&[f32]> {
        match self {
            Link::Time(_) => None,
            Link::Frequency(c) => Some(c.freq_domain_gains()),
        }
    }
}

impl TimeVariant for Link {
    fn step(&mut self, time_delta: f64) {
        match self {
            Link::Time(c) => c.step(time_delta),
            Link::Frequency(c) => c.step(time_delta),
        }
    }

    fn channel_taps(&self) -> &[Complex32] {
        match self {
            Link::Time(c) => c.channel_taps(),
            Link::Frequency(c) => c.time_domain_taps(),
        }
    }

    fn channel_length(&self) -> usize {
        match self {
            Link::Time(c) => c.channel_length(),
            Link::Frequency(c) => c.time_domain_length(),
        }
    }

    fn state(&self) -> ChannelState {
        match self {
            Link::Time(c) => c.state(),
            Link::Frequency(c) => c.state(),
        }
    }

    fn frequency_selective(&self) -> Option<&dyn FrequencySelective> {
        match self {
            Link::Time(c) => c.frequency_selective(),
            Link::Frequency(c) => Some(c as &dyn FrequencySelective),
        }
    }
}

/// Creates MIMO channels from a validated configuration
pub struct ChannelFactory {
    config: ChannelConfig,
    rng: StdRng,
}

impl ChannelFactory {
    /// Validate `config` and seed the master random stream
    pub fn new(config: ChannelConfig) -> Result<Self, ChannelError> {
        config.validate()?;
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        debug!(
            "Channel factory: {:?}/{:?}, {}x{} antennas, seed={:?}",
            config.domain, config.fading, config.tx_antennas, config.rx_antennas, config.seed
        );
        Ok(Self { config, rng })
    }

    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }

    fn create_fading(
        &mut self,
        profile: &Profile,
        scale: f64,
    ) -> Result<FadingChannel, ChannelError> {
        let rng = StdRng::seed_from_u64(self.rng.gen());
        let fading = match self.config.fading {
            FadingType::Awgn => FadingChannel::Static(match self.config.domain {
                Domain::Time => StaticChannel::new(scale),
                Domain::Frequency => StaticChannel::with_subcarriers(scale, self.config.subcarriers),
            }),
            FadingType::Rayleigh => match &self.config.coherence {
                Some(coherence) => FadingChannel::Coherent(CoherentTimeVariantChannel::new(
                    profile.clone(),
                    coherence.build()?,
                    rng,
                )),
                None => FadingChannel::Independent(TimeVariantChannel::new(profile.clone(), rng)),
            },
        };
        Ok(fading)
    }

    /// Build a fresh MIMO channel operating at `snr_db` Eb/N0
    pub fn create(&mut self, snr_db: f64) -> Result<MimoChannel, ChannelError> {
        let (rx, tx) = (self.config.rx_antennas, self.config.tx_antennas);
        let scale = self.config.link_scale();
        let profile = self.config.profile_params().build()?;

        let mut links = Vec::with_capacity(rx * tx);
        for _ in 0..rx * tx {
            let fading = self.create_fading(&profile, scale)?;
            let link = match self.config.domain {
                Domain::Time => Link::Time(fading),
                Domain::Frequency => Link::Frequency(FrequencyDomainChannel::new(fading)?),
            };
            links.push(TransmissionChannel::new(link));
        }
        let links = Array2::from_shape_vec((rx, tx), links)
            .map_err(|e| ChannelError::InvalidConfiguration(e.to_string()))?;

        let noise = Awgn::new(
            snr_db,
            self.config.effective_rate,
            self.config.noise_subcarriers(),
            StdRng::seed_from_u64(self.rng.gen()),
        )?;

        info!(
            "Created {}x{} {:?} channel: snr={} dB, scale={:.4}, sigma={:.6}",
            rx, tx, self.config.domain, snr_db, scale, noise.sigma()
        );

        Ok(MimoChannel {
            config: self.config.clone(),
            links,
            noise,
            scale,
        })
    }
}

/// Serializable snapshot of a MIMO channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MimoChannelState {
    pub domain: Domain,
    pub fading: FadingType,
    pub snr: f64,
    pub effective_rate: f64,
    pub rms_delay_spread: f64,
    pub max_delay_spread: f64,
    pub bandwidth: f64,
    pub scale: f64,
    pub tx_antennas: usize,
    pub rx_antennas: usize,
    pub equalizer_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subcarriers: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coherence: Option<CoherenceModel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub carrier_freq: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub velocity: Option<f64>,
}

/// Grid of fading links followed by receiver noise
pub struct MimoChannel {
    config: ChannelConfig,
    links: Array2<TransmissionChannel<Link>>,
    noise: Awgn,
    scale: f64,
}

impl MimoChannel {
    /// Propagate one block of samples, rows are transmit antennas
    ///
    /// Each receive antenna gets the sum of its per-link convolutions plus
    /// independent noise.
    pub fn transmit(&mut self, tx: &Array2<Complex32>) -> Result<Array2<Complex32>, ChannelError> {
        let (num_rx, num_tx) = self.links.dim();
        if tx.nrows() != num_tx {
            return Err(ChannelError::DimensionMismatch {
                expected: num_tx,
                actual: tx.nrows(),
            });
        }

        let tx_rows: Vec<Vec<Complex32>> = tx.rows().into_iter().map(|r| r.to_vec()).collect();
        let mut rx = Array2::<Complex32>::zeros((num_rx, tx.ncols()));
        for ((r, t), link) in self.links.indexed_iter() {
            let y = link.transmit(&tx_rows[t]);
            for (acc, s) in rx.row_mut(r).iter_mut().zip(y) {
                *acc += s;
            }
        }
        Ok(self.noise.transmit_matrix(&rx))
    }

    /// Advance every link by `time_delta` seconds
    pub fn step(&mut self, time_delta: f64) {
        for link in self.links.iter_mut() {
            link.step(time_delta);
        }
        self.noise.step();
    }

    /// Advance every link by [`DEFAULT_TIME_DELTA`]
    pub fn step_default(&mut self) {
        self.step(DEFAULT_TIME_DELTA);
    }

    pub fn state(&self) -> MimoChannelState {
        let coherence = self.config.coherence.filter(|_| self.config.fading == FadingType::Rayleigh);
        MimoChannelState {
            domain: self.config.domain,
            fading: self.config.fading,
            snr: self.noise.snr(),
            effective_rate: self.config.effective_rate,
            rms_delay_spread: self.config.rms_delay_spread,
            max_delay_spread: self.config.max_delay_spread,
            bandwidth: self.config.bandwidth,
            scale: self.scale,
            tx_antennas: self.config.tx_antennas,
            rx_antennas: self.config.rx_antennas,
            equalizer_type: self.config.equalizer_type.clone(),
            subcarriers: self.subcarriers(),
            coherence: coherence.map(|c| c.model),
            carrier_freq: coherence.map(|c| c.carrier_frequency),
            velocity: coherence.map(|c| c.velocity),
        }
    }

    pub fn snr(&self) -> f64 {
        self.noise.snr()
    }

    pub fn tx_antennas(&self) -> usize {
        self.config.tx_antennas
    }

    pub fn rx_antennas(&self) -> usize {
        self.config.rx_antennas
    }

    /// `(rx_antennas, tx_antennas)`
    pub fn channel_dimensions(&self) -> (usize, usize) {
        self.links.dim()
    }

    /// Current time-domain taps, shape `(rx, tx, taps)`
    pub fn channel_taps(&self) -> Array3<Complex32> {
        let (num_rx, num_tx) = self.links.dim();
        let len = self.links.iter().map(|l| l.time_domain_length()).max().unwrap_or(0);
        let mut taps = Array3::<Complex32>::zeros((num_rx, num_tx, len));
        for ((r, t), link) in self.links.indexed_iter() {
            for (k, tap) in link.channel_taps().iter().enumerate() {
                taps[[r, t, k]] = *tap;
            }
        }
        taps
    }

    /// Link between receive antenna `rx` and transmit antenna `tx`
    pub fn link(&self, rx: usize, tx: usize) -> Option<&TransmissionChannel<Link>> {
        self.links.get((rx, tx))
    }

    pub fn link_profile(&self, rx: usize, tx: usize) -> Option<&Profile> {
        self.link(rx, tx).and_then(|l| l.channel().profile())
    }

    pub fn noise(&self) -> &Awgn {
        &self.noise
    }

    /// Subcarrier count in the frequency domain
    pub fn subcarriers(&self) -> Option<usize> {
        match self.config.domain {
            Domain::Time => None,
            Domain::Frequency => Some(self.config.subcarriers),
        }
    }

    /// Per-subcarrier response, shape `(rx, tx, subcarriers)`
    pub fn freq_domain_taps(&self) -> Option<Array3<Complex32>> {
        self.collect_freq(Link::freq_domain_taps)
    }

    /// Per-subcarrier power gain, shape `(rx, tx, subcarriers)`
    pub fn freq_domain_gains(&self) -> Option<Array3<f32>> {
        self.collect_freq(Link::freq_domain_gains)
    }

    fn collect_freq<T, F>(&self, f: F) -> Option<Array3<T>>
    where
        T: Copy + num_traits::Zero,
        F: Fn(&Link) -> Option<&[T]>,
    {
        let subcarriers = self.subcarriers()?;
        let (num_rx, num_tx) = self.links.dim();
        let mut out = Array3::<T>::zeros((num_rx, num_tx, subcarriers));
        for ((r, t), link) in self.links.indexed_iter() {
            for (k, v) in f(link.channel())?.iter().enumerate() {
                out[[r, t, k]] = *v;
            }
        }
        Some(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fading::DelayProfile;
    use common::utils::{average_signal_energy, signal_energy};

    const SNR: f64 = 13.0;

    fn config(domain: Domain, fading: FadingType, tx: usize, rx: usize) -> ChannelConfig {
        ChannelConfig::new(domain, fading, 1.0, 46.8e-9, 250.0e-9, tx, rx, "ZF").with_seed(17)
    }

    #[test]
    fn test_mimo_setup() {
        for tx in 1..=4 {
            for rx in 1..=4 {
                let mut factory = ChannelFactory::new(config(Domain::Time, FadingType::Rayleigh, tx, rx)).unwrap();
                let chan = factory.create(SNR).unwrap();
                let num_taps = factory.config().profile_params().num_taps();
                assert_eq!(chan.tx_antennas(), tx);
                assert_eq!(chan.rx_antennas(), rx);
                assert_eq!(chan.channel_dimensions(), (rx, tx));
                assert_eq!(chan.channel_taps().dim(), (rx, tx, num_taps));
                assert_eq!(chan.snr(), SNR);
                assert!(chan.subcarriers().is_none());
                assert!(chan.freq_domain_taps().is_none());

                let state = chan.state();
                let scale = 1.0 / ((tx * rx) as f64).sqrt();
                assert_eq!(state.effective_rate, 1.0);
                assert_eq!(state.rms_delay_spread, 46.8e-9);
                assert_eq!(state.max_delay_spread, 250.0e-9);
                assert_eq!(state.equalizer_type, "ZF");
                assert!((state.scale - scale).abs() < 1e-12);

                let profile = chan.link_profile(rx - 1, tx - 1).unwrap();
                let energy = signal_energy(profile.taps()) as f64;
                assert!((energy - scale * scale).abs() < 1e-6);
                assert!(chan.link(rx, tx).is_none());
            }
        }
    }

    #[test]
    fn test_unit_energy_for_all_antenna_counts() {
        let iterations = 20_000;
        for tx in 1..=4 {
            for rx in 1..=4 {
                let mut factory = ChannelFactory::new(config(Domain::Time, FadingType::Rayleigh, tx, rx)).unwrap();
                let mut chan = factory.create(SNR).unwrap();
                let mut total = 0.0;
                for _ in 0..iterations {
                    chan.step_default();
                    total += chan.channel_taps().iter().map(|t| t.norm_sqr() as f64).sum::<f64>();
                }
                let mean = total / iterations as f64;
                assert!((mean - 1.0).abs() < 0.03, "{}x{} mean total energy {}", tx, rx, mean);
            }
        }
    }

    #[test]
    fn test_unit_gain_per_subcarrier_for_all_antenna_counts() {
        let iterations = 20_000;
        let subcarriers = 64;
        for tx in 1..=4 {
            for rx in 1..=4 {
                let config = config(Domain::Frequency, FadingType::Rayleigh, tx, rx).with_subcarriers(subcarriers);
                let mut factory = ChannelFactory::new(config).unwrap();
                let mut chan = factory.create(SNR).unwrap();
                let mut sums = vec![0.0_f64; subcarriers];
                for _ in 0..iterations {
                    chan.step_default();
                    let gains = chan.freq_domain_gains().unwrap();
                    for ((_, _, k), g) in gains.indexed_iter() {
                        sums[k] += *g as f64;
                    }
                }
                for (k, s) in sums.iter().enumerate() {
                    let mean = s / iterations as f64;
                    assert!(
                        (mean - 1.0).abs() < 0.04,
                        "{}x{} subcarrier {} mean summed gain {}",
                        tx, rx, k, mean
                    );
                }
            }
        }
    }

    #[test]
    fn test_step_default_advances_links() {
        let mut factory = ChannelFactory::new(config(Domain::Time, FadingType::Rayleigh, 2, 2)).unwrap();
        let mut chan = factory.create(SNR).unwrap();
        let before = chan.channel_taps();
        chan.step_default();
        assert_ne!(chan.channel_taps(), before);
    }

    #[test]
    fn test_frequency_domain() {
        let config = config(Domain::Frequency, FadingType::Rayleigh, 2, 3)
            .with_subcarriers(32)
            .with_coherence(CoherenceModel::Rappaport, 3.8e9, 15.0);
        let mut factory = ChannelFactory::new(config).unwrap();
        let mut chan = factory.create(SNR).unwrap();
        chan.step(1.0e-3);
        assert_eq!(chan.subcarriers(), Some(32));
        assert_eq!(chan.noise().state().subcarriers, 32);
        let taps = chan.freq_domain_taps().unwrap();
        let gains = chan.freq_domain_gains().unwrap();
        assert_eq!(taps.dim(), (3, 2, 32));
        assert_eq!(gains.dim(), (3, 2, 32));
        for (t, g) in taps.iter().zip(gains.iter()) {
            assert!((t.norm_sqr() - g).abs() < 1e-6);
        }

        let state = chan.state();
        assert_eq!(state.subcarriers, Some(32));
        assert_eq!(state.coherence, Some(CoherenceModel::Rappaport));
        assert_eq!(state.carrier_freq, Some(3.8e9));
        assert_eq!(state.velocity, Some(15.0));
    }

    #[test]
    fn test_awgn_fading_is_flat() {
        let mut factory = ChannelFactory::new(config(Domain::Time, FadingType::Awgn, 2, 2)).unwrap();
        let mut chan = factory.create(200.0).unwrap();
        chan.step(1.0e-3);
        assert_eq!(chan.channel_taps().dim(), (2, 2, 1));
        assert!(chan.link_profile(0, 0).is_none());

        let tx = Array2::from_elem((2, 16), Complex32::new(1.0, 0.0));
        let rx = chan.transmit(&tx).unwrap();
        assert_eq!(rx.dim(), (2, 16));
        for s in rx.iter() {
            assert!((s - Complex32::new(1.0, 0.0)).norm() < 1e-6);
        }
    }

    #[test]
    fn test_noise_calibration() {
        let mut factory = ChannelFactory::new(config(Domain::Time, FadingType::Awgn, 1, 2)).unwrap();
        let mut chan = factory.create(3.0).unwrap();
        let tx = Array2::<Complex32>::zeros((1, 100_000));
        let rx = chan.transmit(&tx).unwrap();
        let variance = chan.noise().variance();
        for row in rx.rows() {
            let e = average_signal_energy(&row.to_vec()) as f64;
            assert!((e - variance).abs() < 0.02, "energy {} variance {}", e, variance);
        }
    }

    #[test]
    fn test_multipath_transmit() {
        let mut factory = ChannelFactory::new(config(Domain::Time, FadingType::Rayleigh, 2, 1)).unwrap();
        let mut chan = factory.create(300.0).unwrap();
        chan.step(1.0e-3);
        let mut tx = Array2::<Complex32>::zeros((2, 8));
        tx[[0, 0]] = Complex32::new(1.0, 0.0);
        let rx = chan.transmit(&tx).unwrap();
        let taps = chan.channel_taps();
        for k in 0..taps.dim().2 {
            assert!((rx[[0, k]] - taps[[0, 0, k]]).norm() < 1e-6);
        }
    }

    #[test]
    fn test_dimension_mismatch() {
        let mut factory = ChannelFactory::new(config(Domain::Time, FadingType::Rayleigh, 2, 2)).unwrap();
        let mut chan = factory.create(SNR).unwrap();
        let tx = Array2::<Complex32>::zeros((3, 8));
        assert!(matches!(
            chan.transmit(&tx),
            Err(ChannelError::DimensionMismatch { expected: 2, actual: 3 })
        ));
    }

    #[test]
    fn test_reproducible_with_seed() {
        let mut a = ChannelFactory::new(config(Domain::Time, FadingType::Rayleigh, 2, 2)).unwrap();
        let mut b = ChannelFactory::new(config(Domain::Time, FadingType::Rayleigh, 2, 2)).unwrap();
        let mut ca = a.create(SNR).unwrap();
        let mut cb = b.create(SNR).unwrap();
        ca.step(1.0e-3);
        cb.step(1.0e-3);
        assert_eq!(ca.channel_taps(), cb.channel_taps());
        let tx = Array2::from_elem((2, 8), Complex32::new(1.0, -1.0));
        assert_eq!(ca.transmit(&tx).unwrap(), cb.transmit(&tx).unwrap());
    }

    #[test]
    fn test_successive_channels_are_independent() {
        let mut factory = ChannelFactory::new(config(Domain::Time, FadingType::Rayleigh, 1, 1)).unwrap();
        let first = factory.create(SNR).unwrap();
        let second = factory.create(SNR).unwrap();
        assert_ne!(first.channel_taps(), second.channel_taps());
    }

    #[test]
    fn test_invalid_factory() {
        assert!(ChannelFactory::new(config(Domain::Time, FadingType::Rayleigh, 0, 1)).is_err());
        let wide = ChannelConfig {
            max_delay_spread: 1.0,
            ..config(Domain::Time, FadingType::Rayleigh, 1, 1)
        };
        assert!(matches!(ChannelFactory::new(wide), Err(ChannelError::OutOfRange { .. })));
    }

    #[test]
    fn test_state_json() {
        let mut factory = ChannelFactory::new(config(Domain::Time, FadingType::Rayleigh, 2, 2)).unwrap();
        let chan = factory.create(SNR).unwrap();
        let json = serde_json::to_string(&chan.state()).unwrap();
        for key in ["effective_rate", "rms_delay_spread", "max_delay_spread", "scale", "snr"] {
            assert!(json.contains(&format!("\"{}\"", key)), "missing {}", key);
        }
        assert!(!json.contains("subcarriers"));
        let state: MimoChannelState = serde_json::from_str(&json).unwrap();
        assert_eq!(state, chan.state());
    }
}
