//! Streaming percentile estimation
//!
//! This module provides the P² (piecewise-parabolic) estimator of
//! Jain & Chlamtac, which follows a single percentile of a stream in
//! constant memory.
//!
//! # Algorithms
//!
//! - [`PSquare`]: single-percentile P² estimator with selectable [`Precision`]
//!
//! # Example
//!
//! ```
//! use psquare::quantiles::{PSquare, Precision};
//! use psquare::traits::PercentileBuilder;
//!
//! let mut median = PSquare::new(50.0, Precision::Fast).unwrap();
//!
//! for value in [1.0, 2.0, 3.0, 4.0, 5.0] {
//!     median.add_value(value);
//! }
//!
//! assert_eq!(median.estimate(), Some(3.0));
//! ```

mod engine;
mod marker;
mod psquare;

pub use marker::Marker;
pub use psquare::{PSquare, PSquareConfig, Precision};
