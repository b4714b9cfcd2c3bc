//! Common Utilities
//!
//! Power-ratio conversions and signal energy measurements used when
//! calibrating channels against a target Eb/N0

use num_complex::Complex;
use num_traits::Float;
use tracing::trace;

/// Convert a power ratio from dB to linear scale, `10^(value / 10)`
pub fn db2lin(value_db: f64) -> f64 {
    10.0_f64.powf(value_db / 10.0)
}

/// Convert a linear power ratio to dB, `10 log10(value)`
pub fn lin2db(value: f64) -> f64 {
    10.0 * value.log10()
}

/// Noise standard deviation for a given Eb/N0 and code rate
///
/// Assumes unit energy per transmitted bit and complex noise, so the
/// returned sigma is the total (I + Q) deviation. `rate == 1` means uncoded.
pub fn ebn0_to_sigma(ebn0_db: f64, rate: f64) -> f64 {
    let snr_lin = db2lin(ebn0_db) * rate;
    let sigma = (1.0 / snr_lin).sqrt();
    trace!("Eb/N0 {} dB at rate {} -> sigma {}", ebn0_db, rate, sigma);
    sigma
}

/// Total energy of a complex vector, `sum |x|^2`
pub fn signal_energy<T: Float>(samples: &[Complex<T>]) -> T {
    samples
        .iter()
        .fold(T::zero(), |acc, s| acc + s.norm_sqr())
}

/// Average per-sample energy of a complex vector, `mean |x|^2`
///
/// Returns zero for an empty slice.
pub fn average_signal_energy<T: Float>(samples: &[Complex<T>]) -> T {
    if samples.is_empty() {
        return T::zero();
    }
    match T::from(samples.len()) {
        Some(n) => signal_energy(samples) / n,
        None => T::nan(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_complex::{Complex32, Complex64};

    #[test]
    fn test_db_conversions() {
        assert!((db2lin(10.0) - 10.0).abs() < 1e-12);
        assert!((db2lin(-3.0) - 0.501_187_233_627_272_3).abs() < 1e-12);
        assert!((lin2db(100.0) - 20.0).abs() < 1e-12);
        for v in [-4.0, 0.0, 3.5, 13.0] {
            assert!((lin2db(db2lin(v)) - v).abs() < 1e-12);
        }
    }

    #[test]
    fn test_ebn0_to_sigma() {
        assert!((ebn0_to_sigma(0.0, 1.0) - 1.0).abs() < 1e-12);
        // Halving the rate doubles the noise power
        let s1 = ebn0_to_sigma(4.0, 1.0);
        let s2 = ebn0_to_sigma(4.0, 0.5);
        assert!((s2 * s2 - 2.0 * s1 * s1).abs() < 1e-12);
    }

    #[test]
    fn test_signal_energy() {
        let s = vec![Complex32::new(1.0, 0.0), Complex32::new(0.0, -2.0), Complex32::new(3.0, 4.0)];
        assert!((signal_energy(&s) - 30.0).abs() < 1e-6);
        assert!((average_signal_energy(&s) - 10.0).abs() < 1e-6);

        let empty: Vec<Complex64> = Vec::new();
        assert_eq!(average_signal_energy(&empty), 0.0);
    }
}
