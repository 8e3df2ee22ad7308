//! P² marker-update engine
//!
//! The engine owns the startup buffer and the marker array and runs the
//! two-phase state machine of Jain & Chlamtac's algorithm:
//!
//! - **Startup**: raw values are buffered until there are as many as markers.
//!   The buffer is then sorted and turned into the initial markers.
//! - **Normal**: every value moves marker positions and, when a marker
//!   drifts at least one rank from where its percentile says it should be,
//!   recomputes its value with a piecewise-parabolic (or linear) step.
//!
//! All storage is inline, sized for the largest supported layout, so the
//! engine never touches the heap.
//!
//! See <http://www.cse.wustl.edu/~jain/papers/ftp/psqr.pdf>.

use super::marker::Marker;

/// Largest supported marker count (six intermediate markers plus three)
pub(crate) const MAX_MARKERS: usize = 9;

// Structured events under the `tracing` feature, nothing otherwise
macro_rules! event {
    ($level:ident, $($arg:tt)*) => {{
        #[cfg(feature = "tracing")]
        {
            tracing::$level!($($arg)*);
        }
    }};
}

/// Per-index target percentiles handed to the engine at construction.
///
/// Index `i` of the layout becomes the weight of the marker seeded from the
/// `i`-th smallest startup value. Extremes use `None`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct MarkerLayout {
    len: usize,
    weights: [Option<f64>; MAX_MARKERS],
}

impl MarkerLayout {
    pub(crate) fn from_weights(weights: &[Option<f64>]) -> Self {
        assert!(
            (3..=MAX_MARKERS).contains(&weights.len()),
            "marker layout needs between 3 and {} markers, got {}",
            MAX_MARKERS,
            weights.len()
        );
        let mut padded = [None; MAX_MARKERS];
        padded[..weights.len()].copy_from_slice(weights);
        Self {
            len: weights.len(),
            weights: padded,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    Startup,
    Normal,
}

/// Startup buffering, marker array and the per-observation update.
#[derive(Clone, Debug)]
pub(crate) struct MarkerEngine {
    layout: MarkerLayout,
    /// Observations accepted so far
    count: u64,
    /// Seeded markers, the first `layout.len` entries are live
    markers: [Marker; MAX_MARKERS],
    /// Raw values kept until seeding, the first `count` entries are live
    startup: [f64; MAX_MARKERS],
    phase: Phase,
}

impl MarkerEngine {
    pub(crate) fn new(layout: MarkerLayout) -> Self {
        Self {
            layout,
            count: 0,
            markers: [Marker::UNSET; MAX_MARKERS],
            startup: [0.0; MAX_MARKERS],
            phase: Phase::Startup,
        }
    }

    pub(crate) fn count(&self) -> u64 {
        self.count
    }

    pub(crate) fn is_initialized(&self) -> bool {
        self.phase == Phase::Normal
    }

    /// Live markers, empty until the engine has been seeded
    pub(crate) fn markers(&self) -> &[Marker] {
        match self.phase {
            Phase::Startup => &[],
            Phase::Normal => &self.markers[..self.layout.len],
        }
    }

    pub(crate) fn min(&self) -> Option<f64> {
        match self.phase {
            Phase::Startup => self.buffered().iter().copied().reduce(f64::min),
            Phase::Normal => Some(self.markers[0].value()),
        }
    }

    pub(crate) fn max(&self) -> Option<f64> {
        match self.phase {
            Phase::Startup => self.buffered().iter().copied().reduce(f64::max),
            Phase::Normal => Some(self.markers[self.layout.len - 1].value()),
        }
    }

    /// Feed one observation. The caller filters out non-finite values.
    pub(crate) fn push(&mut self, value: f64) {
        self.count += 1;

        match self.phase {
            Phase::Startup => self.startup_phase(value),
            Phase::Normal => self.normal_phase(value),
        }
    }

    fn buffered(&self) -> &[f64] {
        match self.phase {
            Phase::Startup => &self.startup[..self.count as usize],
            Phase::Normal => &[],
        }
    }

    fn startup_phase(&mut self, value: f64) {
        self.startup[self.count as usize - 1] = value;
        if (self.count as usize) < self.layout.len {
            return;
        }
        self.seed();
    }

    fn seed(&mut self) {
        let len = self.layout.len;
        let seeds = &mut self.startup[..len];
        seeds.sort_unstable_by(f64::total_cmp);

        let live = self.markers[..len].iter_mut().zip(seeds.iter());
        for (i, (marker, &value)) in live.enumerate() {
            *marker = Marker::new(i as u64 + 1, value, self.layout.weights[i]);
        }
        self.phase = Phase::Normal;

        event!(
            debug,
            markers = len,
            observations = self.count,
            "p-square markers seeded"
        );
    }

    fn normal_phase(&mut self, value: f64) {
        let len = self.layout.len;
        let bucket = self.locate_bucket(value);

        for marker in &mut self.markers[bucket + 1..len] {
            marker.increment_position();
        }

        self.adjust_interior_markers();

        let last_position = self.markers[len - 1].position();
        if last_position != self.count {
            event!(
                error,
                last_position,
                observations = self.count,
                "p-square marker invariant violated"
            );
            panic!(
                "last marker position {} != observation count {}",
                last_position, self.count
            );
        }
    }

    /// Find the bucket `[markers[i], markers[i + 1]]` holding `value`,
    /// widening the extreme markers when the value falls outside.
    ///
    /// The branch order fixes how ties at marker values are resolved and
    /// must stay as is for estimates to be reproducible.
    fn locate_bucket(&mut self, value: f64) -> usize {
        let last = self.layout.len - 1;

        if value < self.markers[0].value() {
            self.markers[0].set_value(value);
            return 0;
        }
        if value > self.markers[last].value() {
            self.markers[last].set_value(value);
            return last - 1;
        }

        let scanned = self.markers[..last]
            .windows(2)
            .position(|pair| pair[0].value() <= value && value < pair[1].value());
        if let Some(bucket) = scanned {
            return bucket;
        }

        debug_assert!(
            self.markers[last - 1].value() <= value && value <= self.markers[last].value(),
            "value {} outside the last bucket",
            value
        );
        last - 1
    }

    /// Move each interior marker at most one rank towards its desired
    /// position, recomputing its value on the way.
    fn adjust_interior_markers(&mut self) {
        let n = self.count as f64;

        for i in 1..self.layout.len - 1 {
            let current = self.markers[i];
            let Some(weight) = current.weight() else {
                continue;
            };
            let previous = self.markers[i - 1];
            let next = self.markers[i + 1];

            let desired_position = 1.0 + (n - 1.0) * weight / 100.0;
            let delta = desired_position - current.position() as f64;
            let room_above = next.position() - current.position() > 1;
            let room_below = current.position() - previous.position() > 1;

            if (delta >= 1.0 && room_above) || (delta <= -1.0 && room_below) {
                let shift: i64 = if delta < 0.0 { -1 } else { 1 };
                let value = adjusted_value(&previous, &current, &next, shift);
                let marker = &mut self.markers[i];
                marker.set_value(value);
                marker.shift_position(shift);
            }
        }
    }
}

/// New value for `current` after a one-rank move in direction `shift`.
///
/// The parabolic prediction is kept when it lands strictly between the
/// neighbours, otherwise the linear one is used.
fn adjusted_value(previous: &Marker, current: &Marker, next: &Marker, shift: i64) -> f64 {
    let candidate = parabolic(previous, current, next, shift);
    if previous.value() < candidate && candidate < next.value() {
        candidate
    } else {
        linear(previous, current, next, shift)
    }
}

#[inline]
fn parabolic(previous: &Marker, current: &Marker, next: &Marker, shift: i64) -> f64 {
    let d = shift as f64;
    let (n_prev, n_cur, n_next) = (
        previous.position() as f64,
        current.position() as f64,
        next.position() as f64,
    );
    let (q_prev, q_cur, q_next) = (previous.value(), current.value(), next.value());

    let ratio = d / (n_next - n_prev);
    let upper = (n_cur - n_prev + d) * ((q_next - q_cur) / (n_next - n_cur));
    let lower = (n_next - n_cur - d) * ((q_cur - q_prev) / (n_cur - n_prev));

    q_cur + ratio * (upper + lower)
}

#[inline]
fn linear(previous: &Marker, current: &Marker, next: &Marker, shift: i64) -> f64 {
    let other = if shift < 0 { previous } else { next };
    let slope = (other.value() - current.value())
        / (other.position() as f64 - current.position() as f64);
    current.value() + shift as f64 * slope
}
