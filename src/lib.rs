//! # psquare
//!
//! Constant-memory streaming percentile estimation for Rust.
//!
//! `psquare` implements the P² algorithm (Jain & Chlamtac, 1985): a few
//! markers approximate the inverse CDF of a stream at one percentile, and
//! each new observation nudges them with a piecewise-parabolic update.
//! Observations are never stored, so memory stays fixed no matter how long
//! the stream runs. Typical use is latency monitoring, where keeping every
//! sample to compute a p95 or p99 is not an option.
//!
//! ## Features
//!
//! - **O(1) memory**: at most nine markers, all stored inline, no heap use
//! - **O(1) updates**: cost depends only on the precision tier
//! - **Precision tiers**: 5, 7 or 9 markers via [`Precision`]
//! - **Common contract**: [`PercentileBuilder`](traits::PercentileBuilder)
//!   lets other estimators be swapped in for comparison
//!
//! ## Quick Start
//!
//! ```rust
//! use psquare::prelude::*;
//!
//! let mut p95 = PSquare::new(95.0, Precision::Normal).unwrap();
//! for latency_ms in [12.0, 15.0, 11.0, 90.0, 14.0, 13.0, 16.0, 12.5] {
//!     p95.add_value(latency_ms);
//! }
//! println!("p95: {:?}", p95.estimate());
//!
//! for p in p95.percentiles() {
//!     println!("p{} = {}", p.percentile(), p.value());
//! }
//! ```
//!
//! Estimates are available once [`Precision::marker_count`] values have
//! been recorded; before that [`PSquare::estimate`] returns `None`.
//!
//! ## Feature Flags
//!
//! - `std` (default): Standard library support; without it the crate is
//!   `no_std` and needs `alloc`
//! - `serde`: Serialization of [`Percentile`](traits::Percentile),
//!   [`Precision`] and [`PSquareConfig`]
//! - `tracing`: Debug events on marker seeding, error event on internal
//!   invariant failure

#![cfg_attr(not(feature = "std"), no_std)]
#![cfg_attr(docsrs, feature(doc_cfg))]

#[cfg(not(feature = "std"))]
extern crate alloc;

pub mod quantiles;
pub mod traits;

pub mod prelude {
    pub use crate::quantiles::{Marker, PSquare, PSquareConfig, Precision};
    pub use crate::traits::*;
}

pub use quantiles::{PSquare, PSquareConfig, Precision};
