//! P² single-percentile estimator
//!
//! Tracks one percentile of a stream with a handful of markers, without
//! storing the observations. The number of markers is chosen through
//! [`Precision`]: more markers give a better estimate at a small CPU cost.
//!
//! # Thread Safety
//!
//! `PSquare` is plain data (`Send + Sync`) with no internal locking.
//! Concurrent writers need external synchronization, e.g. `Mutex<PSquare>`,
//! or one estimator per thread.

use super::engine::{MarkerEngine, MarkerLayout, MAX_MARKERS};
use super::marker::Marker;
use crate::traits::{ConfigError, Percentile, PercentileBuilder};
use core::fmt;
use core::str::FromStr;

#[cfg(feature = "std")]
use std::{string::ToString, vec, vec::Vec};

#[cfg(not(feature = "std"))]
use alloc::{string::ToString, vec, vec::Vec};

/// Accuracy tier, trading marker count for estimate quality
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Precision {
    /// Two intermediate markers (five in total)
    Fast,
    /// Four intermediate markers (seven in total)
    #[default]
    Normal,
    /// Six intermediate markers (nine in total)
    High,
}

impl Precision {
    /// Markers between the minimum and the maximum, including the target one
    pub fn intermediate_markers(self) -> usize {
        match self {
            Precision::Fast => 2,
            Precision::Normal => 4,
            Precision::High => 6,
        }
    }

    /// Total marker count, also the number of observations needed before
    /// the first estimate
    pub fn marker_count(self) -> usize {
        self.intermediate_markers() + 3
    }

    fn name(self) -> &'static str {
        match self {
            Precision::Fast => "fast",
            Precision::Normal => "normal",
            Precision::High => "high",
        }
    }
}

impl fmt::Display for Precision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Precision {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [Precision::Fast, Precision::Normal, Precision::High]
            .into_iter()
            .find(|p| s.eq_ignore_ascii_case(p.name()))
            .ok_or_else(|| ConfigError::UnknownPrecision(s.to_string()))
    }
}

/// Construction options for [`PSquare`]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PSquareConfig {
    /// Percentile to track, on a 0-100 scale
    pub percentile: f64,
    /// Accuracy tier
    pub precision: Precision,
}

impl PSquareConfig {
    /// Track `percentile` with the default precision
    pub fn new(percentile: f64) -> Self {
        Self {
            percentile,
            precision: Precision::default(),
        }
    }

    pub fn with_precision(mut self, precision: Precision) -> Self {
        self.precision = precision;
        self
    }
}

impl Default for PSquareConfig {
    fn default() -> Self {
        Self::new(95.0)
    }
}

/// Streaming estimator for a single percentile using the P² algorithm
///
/// Memory use is constant: a fixed array of markers plus a startup buffer
/// of the same size, both stored inline. Each observation costs O(1) in the
/// marker count, independent of how many values have been seen.
///
/// No estimate exists until [`Precision::marker_count`] values have been
/// added. After that the estimate is always between the smallest and largest
/// observed values; it is approximate, not exact.
///
/// # Example
///
/// ```
/// use psquare::{PSquare, Precision};
/// use psquare::traits::PercentileBuilder;
///
/// let mut p95 = PSquare::new(95.0, Precision::Normal).unwrap();
/// for i in 1..=1000 {
///     p95.add_value(i as f64);
/// }
///
/// let estimate = p95.estimate().unwrap();
/// assert!(estimate > 900.0 && estimate <= 1000.0);
/// ```
#[derive(Clone, Debug)]
pub struct PSquare {
    percentile: f64,
    precision: Precision,
    /// Index of the marker read as the estimate
    target_index: usize,
    engine: MarkerEngine,
}

impl PSquare {
    /// Create an estimator for `percentile` (0-100) at the given precision
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidPercentile`] if `percentile` is negative
    /// or NaN.
    pub fn new(percentile: f64, precision: Precision) -> Result<Self, ConfigError> {
        if percentile.is_nan() || percentile < 0.0 {
            return Err(ConfigError::InvalidPercentile { percentile });
        }

        let intermediate = precision.intermediate_markers();
        let target_index = (intermediate + 3) / 2;
        let layout = Self::layout(percentile, intermediate, target_index);

        Ok(Self {
            percentile,
            precision,
            target_index,
            engine: MarkerEngine::new(layout),
        })
    }

    /// Create an estimator for `percentile` with [`Precision::default`]
    pub fn with_percentile(percentile: f64) -> Result<Self, ConfigError> {
        Self::new(percentile, Precision::default())
    }

    /// Create an estimator from a [`PSquareConfig`]
    pub fn from_config(config: &PSquareConfig) -> Result<Self, ConfigError> {
        Self::new(config.percentile, config.precision)
    }

    /// Target percentile of each marker, by rank in the seeded array.
    ///
    /// Markers below the target spread the `[0, p]` range evenly, markers
    /// above it spread `[p, 100]`; the extremes only follow min and max.
    fn layout(percentile: f64, intermediate: usize, target_index: usize) -> MarkerLayout {
        let len = intermediate + 3;
        let half_buckets = ((intermediate + 2) / 2) as f64;
        let mut weights = [None; MAX_MARKERS];

        for (i, weight) in weights[..len].iter_mut().enumerate() {
            *weight = if i == 0 || i == len - 1 {
                None
            } else if i < target_index {
                Some(percentile / half_buckets * i as f64)
            } else if i > target_index {
                Some(percentile + (100.0 - percentile) / half_buckets * (i - target_index) as f64)
            } else {
                Some(percentile)
            };
        }

        MarkerLayout::from_weights(&weights[..len])
    }

    /// The tracked percentile
    pub fn percentile(&self) -> f64 {
        self.percentile
    }

    pub fn precision(&self) -> Precision {
        self.precision
    }

    /// Number of markers, equal to the observations needed for an estimate
    pub fn marker_count(&self) -> usize {
        self.precision.marker_count()
    }

    /// Number of observations recorded (non-finite values are not counted)
    pub fn count(&self) -> u64 {
        self.engine.count()
    }

    /// Whether enough values have been seen to produce an estimate
    pub fn is_initialized(&self) -> bool {
        self.engine.is_initialized()
    }

    /// Current markers, empty until the estimator is initialized
    pub fn markers(&self) -> &[Marker] {
        self.engine.markers()
    }

    /// Smallest value seen so far
    pub fn min(&self) -> Option<f64> {
        self.engine.min()
    }

    /// Largest value seen so far
    pub fn max(&self) -> Option<f64> {
        self.engine.max()
    }

    /// Estimated value at the tracked percentile
    ///
    /// Returns `None` until [`marker_count`](Self::marker_count) values have
    /// been added. Percentile 0 reports the minimum marker, which holds the
    /// exact running minimum; every other percentile reads the target marker,
    /// so percentile 100 approaches the maximum as the stream grows.
    pub fn estimate(&self) -> Option<f64> {
        let markers = self.engine.markers();
        if markers.is_empty() {
            return None;
        }

        let index = if self.percentile <= 0.0 {
            0
        } else {
            self.target_index
        };
        Some(markers[index].value())
    }

    /// Memory footprint in bytes; constant for the life of the estimator
    pub fn size_bytes(&self) -> usize {
        core::mem::size_of::<Self>()
    }
}

impl PercentileBuilder for PSquare {
    /// NaN and infinite values are ignored; the marker arithmetic would turn
    /// them into NaN.
    fn add_value(&mut self, value: f64) {
        if !value.is_finite() {
            return;
        }
        self.engine.push(value);
    }

    fn percentiles(&self) -> Vec<Percentile> {
        match self.estimate() {
            Some(value) => vec![Percentile::new(self.percentile, value)],
            None => Vec::new(),
        }
    }
}

impl Extend<f64> for PSquare {
    fn extend<I: IntoIterator<Item = f64>>(&mut self, iter: I) {
        self.add_values(iter);
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Precision {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.name())
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for PSquareConfig {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("PSquareConfig", 2)?;
        state.serialize_field("percentile", &self.percentile)?;
        state.serialize_field("precision", &self.precision)?;
        state.end()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn weights(estimator: &PSquare) -> Vec<Option<f64>> {
        estimator.markers().iter().map(|m| m.weight()).collect()
    }

    fn seeded(percentile: f64, precision: Precision) -> PSquare {
        let mut estimator = PSquare::new(percentile, precision).unwrap();
        for i in 0..precision.marker_count() {
            estimator.add_value(i as f64);
        }
        estimator
    }

    // ---- Construction ----

    #[test]
    fn test_negative_percentile_rejected() {
        let err = PSquare::new(-0.5, Precision::Fast).unwrap_err();
        assert_eq!(err, ConfigError::InvalidPercentile { percentile: -0.5 });
    }

    #[test]
    fn test_nan_percentile_rejected() {
        assert!(matches!(
            PSquare::new(f64::NAN, Precision::Normal),
            Err(ConfigError::InvalidPercentile { .. })
        ));
    }

    #[test]
    fn test_zero_and_hundred_accepted() {
        assert!(PSquare::new(0.0, Precision::High).is_ok());
        assert!(PSquare::new(100.0, Precision::High).is_ok());
    }

    #[test]
    fn test_defaults() {
        let estimator = PSquare::with_percentile(99.0).unwrap();
        assert_eq!(estimator.precision(), Precision::Normal);
        assert_eq!(estimator.marker_count(), 7);
        assert_eq!(estimator.percentile(), 99.0);

        let config = PSquareConfig::default();
        assert_eq!(config.percentile, 95.0);
        assert_eq!(config.precision, Precision::Normal);
    }

    #[test]
    fn test_from_config() {
        let config = PSquareConfig::new(75.0).with_precision(Precision::High);
        let estimator = PSquare::from_config(&config).unwrap();
        assert_eq!(estimator.percentile(), 75.0);
        assert_eq!(estimator.marker_count(), 9);
    }

    // ---- Precision ----

    #[test]
    fn test_precision_marker_counts() {
        assert_eq!(Precision::Fast.marker_count(), 5);
        assert_eq!(Precision::Normal.marker_count(), 7);
        assert_eq!(Precision::High.marker_count(), 9);
    }

    #[test]
    fn test_precision_parse() {
        assert_eq!("fast".parse::<Precision>(), Ok(Precision::Fast));
        assert_eq!("Normal".parse::<Precision>(), Ok(Precision::Normal));
        assert_eq!("HIGH".parse::<Precision>(), Ok(Precision::High));
        assert_eq!(
            "extreme".parse::<Precision>(),
            Err(ConfigError::UnknownPrecision("extreme".into()))
        );
    }

    #[test]
    fn test_precision_display_roundtrip() {
        for precision in [Precision::Fast, Precision::Normal, Precision::High] {
            assert_eq!(precision.to_string().parse::<Precision>(), Ok(precision));
        }
    }

    // ---- Marker roles ----

    #[test]
    fn test_fast_layout() {
        let estimator = seeded(90.0, Precision::Fast);
        assert_eq!(
            weights(&estimator),
            vec![None, Some(45.0), Some(90.0), Some(95.0), None]
        );
    }

    #[test]
    fn test_high_layout() {
        let estimator = seeded(50.0, Precision::High);
        assert_eq!(
            weights(&estimator),
            vec![
                None,
                Some(12.5),
                Some(25.0),
                Some(37.5),
                Some(50.0),
                Some(62.5),
                Some(75.0),
                Some(87.5),
                None
            ]
        );
    }

    #[test]
    fn test_normal_layout_targets_middle_marker() {
        let estimator = seeded(60.0, Precision::Normal);
        let w = weights(&estimator);
        assert_eq!(w.len(), 7);
        assert_eq!(w[3], Some(60.0));
        assert!((w[1].unwrap() - 20.0).abs() < 1e-12);
        assert!((w[2].unwrap() - 40.0).abs() < 1e-12);
        assert!((w[4].unwrap() - 60.0 - 40.0 / 3.0).abs() < 1e-12);
        assert!((w[5].unwrap() - 60.0 - 80.0 / 3.0).abs() < 1e-12);
    }

    // ---- Estimates ----

    #[test]
    fn test_no_estimate_before_seeding() {
        for precision in [Precision::Fast, Precision::Normal, Precision::High] {
            let mut estimator = PSquare::new(50.0, precision).unwrap();
            for i in 0..precision.marker_count() - 1 {
                estimator.add_value(i as f64);
                assert!(estimator.estimate().is_none());
                assert!(estimator.percentiles().is_empty());
            }
            estimator.add_value(100.0);
            assert!(estimator.estimate().is_some());
        }
    }

    #[test]
    fn test_seeded_median_of_five() {
        let mut estimator = PSquare::new(50.0, Precision::Fast).unwrap();
        estimator.extend([5.0, 1.0, 4.0, 2.0, 3.0]);
        assert_eq!(estimator.estimate(), Some(3.0));
        assert_eq!(estimator.percentiles(), vec![Percentile::new(50.0, 3.0)]);
    }

    #[test]
    fn test_ascending_golden() {
        let mut estimator = PSquare::new(50.0, Precision::Fast).unwrap();
        estimator.extend((1..=5).map(|i| i as f64));
        assert_eq!(estimator.estimate(), Some(3.0));

        estimator.add_value(6.0);
        assert_eq!(estimator.estimate(), Some(3.0));
        estimator.add_value(7.0);
        assert_eq!(estimator.estimate(), Some(3.0));
        estimator.add_value(8.0);
        assert_eq!(estimator.estimate(), Some(4.0));
        assert_eq!(estimator.count(), 8);
    }

    #[test]
    fn test_nan_ignored() {
        let mut estimator = PSquare::new(50.0, Precision::Fast).unwrap();
        for v in [1.0, f64::NAN, 2.0, 3.0, f64::NAN, 4.0, 5.0] {
            estimator.add_value(v);
        }
        assert_eq!(estimator.count(), 5);
        assert_eq!(estimator.estimate(), Some(3.0));
    }

    #[test]
    fn test_infinities_ignored() {
        let mut estimator = PSquare::new(50.0, Precision::Fast).unwrap();
        estimator.extend([1.0, 2.0, 3.0, 4.0, 5.0]);
        estimator.extend(core::iter::repeat(f64::INFINITY).take(20));
        estimator.add_value(3.5);
        estimator.extend([f64::NEG_INFINITY, f64::INFINITY, f64::NEG_INFINITY]);

        assert_eq!(estimator.count(), 6);
        assert_eq!(estimator.min(), Some(1.0));
        assert_eq!(estimator.max(), Some(5.0));
        assert!(estimator.markers().iter().all(|m| m.value().is_finite()));
        let est = estimator.estimate().unwrap();
        assert!((1.0..=5.0).contains(&est), "estimate {} out of range", est);
    }

    #[test]
    fn test_infinities_during_startup_not_counted() {
        let mut estimator = PSquare::new(50.0, Precision::Fast).unwrap();
        estimator.extend([f64::INFINITY, 1.0, 2.0, f64::NEG_INFINITY, 3.0, 4.0]);
        assert_eq!(estimator.count(), 4);
        assert!(!estimator.is_initialized());
        assert_eq!(estimator.max(), Some(4.0));
    }

    #[test]
    fn test_zero_percentile_is_minimum() {
        let mut estimator = PSquare::new(0.0, Precision::Normal).unwrap();
        estimator.extend([10.0, 20.0, 30.0, 40.0, 50.0, 60.0, 70.0, 80.0, 5.0, 90.0]);
        assert_eq!(estimator.estimate(), Some(5.0));
        assert_eq!(estimator.estimate(), estimator.min());
    }

    #[test]
    fn test_hundredth_percentile_reads_target_marker() {
        let mut estimator = PSquare::new(100.0, Precision::Fast).unwrap();
        estimator.extend([3.0, 1.0, 2.0, 5.0, 4.0, 9.0, 0.5]);
        let est = estimator.estimate().unwrap();
        assert_eq!(est, estimator.markers()[2].value());
        assert!(est >= 0.5 && est <= 9.0, "estimate {} out of range", est);
    }

    #[test]
    fn test_min_max_during_startup() {
        let mut estimator = PSquare::new(50.0, Precision::High).unwrap();
        assert_eq!(estimator.min(), None);
        estimator.extend([3.0, -2.0, 8.0]);
        assert_eq!(estimator.min(), Some(-2.0));
        assert_eq!(estimator.max(), Some(8.0));
        assert!(!estimator.is_initialized());
    }

    #[test]
    fn test_size_is_constant() {
        let mut estimator = PSquare::new(95.0, Precision::High).unwrap();
        let before = estimator.size_bytes();
        for i in 0..100_000 {
            estimator.add_value(i as f64);
        }
        assert_eq!(estimator.size_bytes(), before);
    }
}
