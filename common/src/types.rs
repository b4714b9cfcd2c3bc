//! Common Types for the Channel Model
//!
//! Defines the option vocabulary used to configure channel construction

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error returned when an option string does not name a known variant
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown {kind}: '{value}'")]
pub struct ParseOptionError {
    /// Option family being parsed
    pub kind: &'static str,
    /// Offending input
    pub value: String,
}

impl ParseOptionError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

/// Domain in which a channel is observed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    /// Time-domain taps applied by convolution
    #[default]
    Time,
    /// Taps calibrated for a multicarrier transform
    Frequency,
}

impl FromStr for Domain {
    type Err = ParseOptionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "time" => Ok(Domain::Time),
            "frequency" | "freq" => Ok(Domain::Frequency),
            _ => Err(ParseOptionError::new("domain", s)),
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Domain::Time => write!(f, "time"),
            Domain::Frequency => write!(f, "frequency"),
        }
    }
}

/// Small-scale fading applied on every link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FadingType {
    /// Multipath Rayleigh fading shaped by a power delay profile
    #[default]
    Rayleigh,
    /// No fading, flat unit link with additive noise only
    Awgn,
}

impl FromStr for FadingType {
    type Err = ParseOptionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "rayleigh" => Ok(FadingType::Rayleigh),
            "awgn" => Ok(FadingType::Awgn),
            _ => Err(ParseOptionError::new("fading type", s)),
        }
    }
}

impl fmt::Display for FadingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FadingType::Rayleigh => write!(f, "rayleigh"),
            FadingType::Awgn => write!(f, "awgn"),
        }
    }
}

/// Spatial correlation model driving tap evolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoherenceModel {
    /// Gaussian approximation for omnidirectional antennas
    Rappaport,
    /// Clarke/Jakes isotropic scattering, squared Bessel J0
    Jakes,
}

impl FromStr for CoherenceModel {
    type Err = ParseOptionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "rappaport" => Ok(CoherenceModel::Rappaport),
            "jakes" => Ok(CoherenceModel::Jakes),
            _ => Err(ParseOptionError::new("coherence model", s)),
        }
    }
}

impl fmt::Display for CoherenceModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoherenceModel::Rappaport => write!(f, "rappaport"),
            CoherenceModel::Jakes => write!(f, "jakes"),
        }
    }
}

/// Decay law of a power delay profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileShape {
    /// exp(-tau / tau_rms)
    #[default]
    #[serde(alias = "Exp", alias = "exp")]
    Exponential,
}

impl FromStr for ProfileShape {
    type Err = ParseOptionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Exp" | "exp" | "exponential" | "Exponential" => Ok(ProfileShape::Exponential),
            _ => Err(ParseOptionError::new("profile shape", s)),
        }
    }
}

impl fmt::Display for ProfileShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProfileShape::Exponential => write!(f, "exponential"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_parsing() {
        assert_eq!("time".parse::<Domain>().unwrap(), Domain::Time);
        assert_eq!("Frequency".parse::<Domain>().unwrap(), Domain::Frequency);
        assert!("space".parse::<Domain>().is_err());
    }

    #[test]
    fn test_fading_parsing() {
        assert_eq!("rayleigh".parse::<FadingType>().unwrap(), FadingType::Rayleigh);
        assert_eq!("AWGN".parse::<FadingType>().unwrap(), FadingType::Awgn);
        let err = "rician".parse::<FadingType>().unwrap_err();
        assert_eq!(err.value, "rician");
    }

    #[test]
    fn test_shape_parsing() {
        assert_eq!("Exp".parse::<ProfileShape>().unwrap(), ProfileShape::Exponential);
        assert_eq!("exponential".parse::<ProfileShape>().unwrap(), ProfileShape::Exponential);
        assert!("penguin".parse::<ProfileShape>().is_err());
    }

    #[test]
    fn test_display_matches_serde() {
        let json = serde_json::to_string(&CoherenceModel::Jakes).unwrap();
        assert_eq!(json, format!("\"{}\"", CoherenceModel::Jakes));
        let shape: ProfileShape = serde_json::from_str("\"Exp\"").unwrap();
        assert_eq!(shape, ProfileShape::Exponential);
    }
}
