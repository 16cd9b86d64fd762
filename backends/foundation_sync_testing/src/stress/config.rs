//! Stress test configuration.

use core::time::Duration;

/// Configuration for stress tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StressConfig {
    thread_count: usize,
    iterations: usize,
    duration: Option<Duration>,
    wait_timeout: Duration,
}

impl StressConfig {
    /// Creates a configuration with default values.
    ///
    /// Defaults:
    /// - `thread_count`: 4
    /// - `iterations`: 1000
    /// - `duration`: None (no time limit)
    /// - `wait_timeout`: 1 second
    #[must_use]
    pub const fn new() -> Self {
        Self {
            thread_count: 4,
            iterations: 1000,
            duration: None,
            wait_timeout: Duration::from_secs(1),
        }
    }

    /// Sets the number of threads to spawn.
    #[must_use]
    pub const fn threads(mut self, count: usize) -> Self {
        self.thread_count = count;
        self
    }

    /// Sets the number of iterations per thread.
    #[must_use]
    pub const fn iterations(mut self, count: usize) -> Self {
        self.iterations = count;
        self
    }

    /// Sets the maximum duration of the run.
    ///
    /// Threads stop early once it is reached.
    #[must_use]
    pub const fn duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    /// Sets the bound on any single blocking wait inside an operation.
    ///
    /// A wait that hits this bound counts as a failed operation, which is how
    /// a lost wakeup shows up in the results instead of hanging the run.
    #[must_use]
    pub const fn wait_timeout(mut self, timeout: Duration) -> Self {
        self.wait_timeout = timeout;
        self
    }

    /// Returns the thread count.
    #[must_use]
    pub const fn get_thread_count(&self) -> usize {
        self.thread_count
    }

    /// Returns the iteration count.
    #[must_use]
    pub const fn get_iterations(&self) -> usize {
        self.iterations
    }

    /// Returns the optional duration.
    #[must_use]
    pub const fn get_duration(&self) -> Option<Duration> {
        self.duration
    }

    /// Returns the per-wait bound.
    #[must_use]
    pub const fn get_wait_timeout(&self) -> Duration {
        self.wait_timeout
    }
}

impl Default for StressConfig {
    fn default() -> Self {
        Self::new()
    }
}
