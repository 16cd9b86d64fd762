//! Latency summaries for stress runs and hand-off measurements.

use core::fmt;
use core::time::Duration;

/// Sorted latency samples with summary statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LatencySummary {
    sorted: Vec<Duration>,
}

impl LatencySummary {
    /// Builds a summary from unsorted samples.
    #[must_use]
    pub fn from_samples(mut samples: Vec<Duration>) -> Self {
        samples.sort_unstable();
        Self { sorted: samples }
    }

    /// Returns the number of samples.
    #[must_use]
    pub fn count(&self) -> usize {
        self.sorted.len()
    }

    /// Returns the smallest sample.
    #[must_use]
    pub fn min(&self) -> Option<Duration> {
        self.sorted.first().copied()
    }

    /// Returns the largest sample.
    #[must_use]
    pub fn max(&self) -> Option<Duration> {
        self.sorted.last().copied()
    }

    /// Returns the arithmetic mean of the samples.
    #[must_use]
    pub fn mean(&self) -> Option<Duration> {
        let count = u32::try_from(self.sorted.len()).ok().filter(|n| *n > 0)?;
        let total: Duration = self.sorted.iter().sum();
        Some(total / count)
    }

    /// Returns the sample at `percentile` (0.0 to 1.0), by nearest rank.
    #[must_use]
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub fn percentile(&self, percentile: f64) -> Option<Duration> {
        if self.sorted.is_empty() || !(0.0..=1.0).contains(&percentile) {
            return None;
        }

        let rank = ((self.sorted.len() as f64) * percentile).ceil() as usize;
        self.sorted.get(rank.saturating_sub(1)).copied()
    }

    /// Returns the median sample.
    #[must_use]
    pub fn median(&self) -> Option<Duration> {
        self.percentile(0.5)
    }

    /// Returns the 99th percentile sample.
    #[must_use]
    pub fn p99(&self) -> Option<Duration> {
        self.percentile(0.99)
    }
}

impl fmt::Display for LatencySummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.min(), self.median(), self.p99(), self.max()) {
            (Some(min), Some(median), Some(p99), Some(max)) => write!(
                f,
                "{} samples: min {min:?}, median {median:?}, p99 {p99:?}, max {max:?}",
                self.count()
            ),
            _ => f.write_str("no samples"),
        }
    }
}
