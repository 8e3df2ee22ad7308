//! Marker record tracked by the P² engine

/// One tracked point on the empirical distribution.
///
/// A marker pairs an integer rank (`position`, 1-based) with the estimated
/// value at that rank. Interior markers also carry the percentile they aim
/// for; the two extreme markers only follow the observed minimum and maximum.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Marker {
    position: u64,
    value: f64,
    weight: Option<f64>,
}

impl Marker {
    /// Placeholder used before the engine is seeded
    pub(crate) const UNSET: Marker = Marker {
        position: 0,
        value: 0.0,
        weight: None,
    };

    pub(crate) fn new(position: u64, value: f64, weight: Option<f64>) -> Self {
        Self {
            position,
            value,
            weight,
        }
    }

    /// Rank of this marker among the observations seen so far
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Estimated value at [`position`](Self::position)
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Target percentile (0-100), `None` for the minimum and maximum markers
    pub fn weight(&self) -> Option<f64> {
        self.weight
    }

    /// Whether this marker tracks the running minimum or maximum
    pub fn is_extreme(&self) -> bool {
        self.weight.is_none()
    }

    #[inline]
    pub(crate) fn set_value(&mut self, value: f64) {
        self.value = value;
    }

    #[inline]
    pub(crate) fn increment_position(&mut self) {
        self.position += 1;
    }

    /// Move the marker one rank up (`shift > 0`) or down (`shift < 0`)
    #[inline]
    pub(crate) fn shift_position(&mut self, shift: i64) {
        if shift < 0 {
            self.position -= 1;
        } else {
            self.position += 1;
        }
    }
}
