//! Shared contract for percentile estimators
//!
//! Every estimator, streaming or not, implements [`PercentileBuilder`] so
//! that callers (and benchmarks comparing implementations) can feed values
//! and read results without knowing which algorithm sits behind it.

use core::fmt::Debug;

#[cfg(feature = "std")]
use std::{string::String, vec::Vec};

#[cfg(not(feature = "std"))]
use alloc::{string::String, vec::Vec};

/// Error while building an estimator from its configuration
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Desired percentile is negative or NaN
    InvalidPercentile { percentile: f64 },
    /// Precision tier name not recognized
    UnknownPrecision(String),
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ConfigError::InvalidPercentile { percentile } => {
                write!(f, "percentile must be non-negative, got {}", percentile)
            }
            ConfigError::UnknownPrecision(name) => {
                write!(
                    f,
                    "unknown precision: {} (expected fast, normal or high)",
                    name
                )
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ConfigError {}

/// A percentile and the value estimated for it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Percentile {
    percentile: f64,
    value: f64,
}

impl Percentile {
    /// Pair a percentile (0-100) with its value
    pub fn new(percentile: f64, value: f64) -> Self {
        Self { percentile, value }
    }

    /// The percentile, on a 0-100 scale
    pub fn percentile(&self) -> f64 {
        self.percentile
    }

    /// The value at that percentile
    pub fn value(&self) -> f64 {
        self.value
    }
}

/// Capability shared by all percentile estimators
pub trait PercentileBuilder: Debug {
    /// Record one observation
    fn add_value(&mut self, value: f64);

    /// Current estimates, one per tracked percentile, in ascending order
    /// of percentile. Empty while the estimator has nothing to report.
    fn percentiles(&self) -> Vec<Percentile>;

    /// Record every value of an iterator
    fn add_values<I>(&mut self, values: I)
    where
        I: IntoIterator<Item = f64>,
        Self: Sized,
    {
        for value in values {
            self.add_value(value);
        }
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Percentile {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("Percentile", 2)?;
        state.serialize_field("percentile", &self.percentile)?;
        state.serialize_field("value", &self.value)?;
        state.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default)]
    struct LastValue {
        last: Option<f64>,
    }

    impl PercentileBuilder for LastValue {
        fn add_value(&mut self, value: f64) {
            self.last = Some(value);
        }

        fn percentiles(&self) -> Vec<Percentile> {
            self.last
                .map(|v| Percentile::new(100.0, v))
                .into_iter()
                .collect()
        }
    }

    #[test]
    fn test_percentile_accessors() {
        let p = Percentile::new(95.0, 12.5);
        assert_eq!(p.percentile(), 95.0);
        assert_eq!(p.value(), 12.5);
    }

    #[test]
    fn test_add_values_feeds_everything() {
        let mut builder = LastValue::default();
        assert!(builder.percentiles().is_empty());
        builder.add_values([1.0, 2.0, 3.0]);
        assert_eq!(builder.percentiles(), vec![Percentile::new(100.0, 3.0)]);
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::InvalidPercentile { percentile: -1.0 };
        assert_eq!(err.to_string(), "percentile must be non-negative, got -1");

        let err = ConfigError::UnknownPrecision("ultra".into());
        assert!(err.to_string().contains("ultra"));
    }
}
