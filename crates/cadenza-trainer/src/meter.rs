//! Count-weighted running average.

/// Tracks the latest value and the weighted mean of a scalar metric.
///
/// The meter is a plain value owned by whichever loop is accumulating; it
/// can also be built as a fold over `(value, weight)` pairs.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AverageMeter {
    /// Most recent value passed to [`AverageMeter::update`].
    pub value: f64,
    /// Weighted mean of all values so far.
    pub average: f64,
    /// Weighted sum of all values so far.
    pub sum: f64,
    /// Total weight seen.
    pub count: usize,
}

impl AverageMeter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear all statistics.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Record `value` observed `weight` times.
    ///
    /// A zero weight only replaces the latest value.
    pub fn update(&mut self, value: f64, weight: usize) {
        self.value = value;
        self.sum += value * weight as f64;
        self.count += weight;
        if self.count > 0 {
            self.average = self.sum / self.count as f64;
        }
    }

    /// Record a single observation.
    pub fn add(&mut self, value: f64) {
        self.update(value, 1);
    }

    /// Consuming form of [`AverageMeter::update`].
    #[must_use]
    pub fn updated(mut self, value: f64, weight: usize) -> Self {
        self.update(value, weight);
        self
    }
}

impl Extend<(f64, usize)> for AverageMeter {
    fn extend<T: IntoIterator<Item = (f64, usize)>>(&mut self, iter: T) {
        for (value, weight) in iter {
            self.update(value, weight);
        }
    }
}

impl FromIterator<(f64, usize)> for AverageMeter {
    fn from_iter<T: IntoIterator<Item = (f64, usize)>>(iter: T) -> Self {
        let mut meter = Self::new();
        meter.extend(iter);
        meter
    }
}
