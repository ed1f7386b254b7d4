//! Core type definitions for rsmitst

use serde::{Deserialize, Serialize};
use std::fmt;

/// Power in microwatts, the unit every SMI power query reports in
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Microwatts(pub u64);

impl Microwatts {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    /// Raw microwatt value
    pub fn get(&self) -> u64 {
        self.0
    }

    pub fn as_milliwatts(&self) -> f64 {
        self.0 as f64 / 1_000.0
    }

    pub fn as_watts(&self) -> f64 {
        self.0 as f64 / 1_000_000.0
    }
}

impl fmt::Display for Microwatts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}uW", self.0)
    }
}

impl From<u64> for Microwatts {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// Inclusive bounds within which a power cap may be set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PowerCapRange {
    pub min: Microwatts,
    pub max: Microwatts,
}

impl PowerCapRange {
    pub fn new(min: impl Into<Microwatts>, max: impl Into<Microwatts>) -> Self {
        Self {
            min: min.into(),
            max: max.into(),
        }
    }

    /// `min <= max`
    pub fn is_ordered(&self) -> bool {
        self.min <= self.max
    }

    /// Check whether `cap` lies inside the range, bounds included
    pub fn contains(&self, cap: Microwatts) -> bool {
        self.min <= cap && cap <= self.max
    }
}

impl fmt::Display for PowerCapRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {} uW", self.min.0, self.max.0)
    }
}

/// How much of the test transcript gets printed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verbosity {
    /// Only failures and skips
    Min,
    /// Queried values for manual verification
    #[default]
    Standard,
    /// Values plus per-phase progress
    Progress,
}

impl Verbosity {
    pub fn level(&self) -> u8 {
        match self {
            Verbosity::Min => 0,
            Verbosity::Standard => 1,
            Verbosity::Progress => 2,
        }
    }
}

impl TryFrom<u8> for Verbosity {
    type Error = crate::Error;

    fn try_from(level: u8) -> crate::Result<Self> {
        match level {
            0 => Ok(Verbosity::Min),
            1 => Ok(Verbosity::Standard),
            2 => Ok(Verbosity::Progress),
            _ => Err(crate::Error::parse(format!(
                "verbosity level must be 0, 1 or 2, got {}",
                level
            ))),
        }
    }
}

impl std::str::FromStr for Verbosity {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "min" | "minimal" => Ok(Verbosity::Min),
            "standard" => Ok(Verbosity::Standard),
            "progress" => Ok(Verbosity::Progress),
            other => other
                .parse::<u8>()
                .map_err(|_| crate::Error::parse(format!("Unknown verbosity: {}", s)))
                .and_then(Verbosity::try_from),
        }
    }
}

impl fmt::Display for Verbosity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verbosity::Min => write!(f, "min"),
            Verbosity::Standard => write!(f, "standard"),
            Verbosity::Progress => write!(f, "progress"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_microwatt_conversions() {
        let power = Microwatts::new(150_250_000);
        assert_eq!(power.as_milliwatts(), 150_250.0);
        assert_eq!(power.as_watts(), 150.25);
        assert_eq!(power.to_string(), "150250000uW");
    }

    #[test]
    fn test_power_cap_range() {
        let range = PowerCapRange::new(100_000_000, 300_000_000);
        assert!(range.is_ordered());
        assert!(range.contains(Microwatts(100_000_000)));
        assert!(range.contains(Microwatts(300_000_000)));
        assert!(!range.contains(Microwatts(300_000_001)));
        assert_eq!(range.to_string(), "100000000 to 300000000 uW");

        let inverted = PowerCapRange::new(300_000_000, 100_000_000);
        assert!(!inverted.is_ordered());
        assert!(!inverted.contains(Microwatts(200_000_000)));
    }

    #[test]
    fn test_verbosity_parsing() {
        assert_eq!("standard".parse::<Verbosity>().unwrap(), Verbosity::Standard);
        assert_eq!("2".parse::<Verbosity>().unwrap(), Verbosity::Progress);
        assert_eq!(Verbosity::try_from(0).unwrap(), Verbosity::Min);
        assert!(Verbosity::try_from(3).is_err());
        assert!("loud".parse::<Verbosity>().is_err());
    }

    #[test]
    fn test_verbosity_ordering() {
        assert!(Verbosity::Min < Verbosity::Standard);
        assert!(Verbosity::Progress > Verbosity::Standard);
        assert_eq!(Verbosity::default(), Verbosity::Standard);
    }
}
