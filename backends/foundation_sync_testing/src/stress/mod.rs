//! Stress test framework for synchronization primitives.
//!
//! Provides configurable high-contention testing with:
//! - Thread count control
//! - Iteration limits
//! - Time-based duration
//! - Success rate tracking

use core::time::Duration;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

pub mod config;
pub mod sync;

pub use config::StressConfig;

/// Result of a stress test run.
#[derive(Debug, Clone, PartialEq, derive_more::Display)]
#[display(
    "{successes} succeeded, {failures} failed, {panicked} panicked on {thread_count} threads in {duration:?}"
)]
pub struct StressResult {
    /// Operations that reported success
    pub successes: usize,
    /// Operations that reported failure
    pub failures: usize,
    /// Worker threads that panicked
    pub panicked: usize,
    /// Wall time of the run
    pub duration: Duration,
    /// Number of worker threads
    pub thread_count: usize,
}

impl StressResult {
    /// Returns the total number of completed operations.
    #[must_use]
    pub const fn total_operations(&self) -> usize {
        self.successes + self.failures
    }

    /// Returns the success rate as a value between 0.0 and 1.0.
    ///
    /// A run with a panicked worker has a success rate of 0.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn success_rate(&self) -> f64 {
        if self.panicked > 0 || self.total_operations() == 0 {
            0.0
        } else {
            self.successes as f64 / self.total_operations() as f64
        }
    }

    /// Returns operations per second.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn operations_per_second(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs == 0.0 {
            0.0
        } else {
            self.total_operations() as f64 / secs
        }
    }

    /// Returns `true` if every operation succeeded and no worker panicked.
    #[must_use]
    pub const fn is_clean(&self) -> bool {
        self.failures == 0 && self.panicked == 0
    }
}

/// Base stress test harness.
///
/// Spawns worker threads that call an operation repeatedly until they run out
/// of iterations or the configured duration passes.
pub struct StressHarness {
    config: StressConfig,
}

impl StressHarness {
    /// Creates a harness with the given configuration.
    #[must_use]
    pub const fn new(config: StressConfig) -> Self {
        Self { config }
    }

    /// Returns the configuration of this harness.
    #[must_use]
    pub const fn config(&self) -> &StressConfig {
        &self.config
    }

    /// Runs `operation` on every worker thread.
    ///
    /// The closure receives the thread index (`0..thread_count`) and the
    /// iteration number on that thread, and returns `true` on success.
    ///
    /// # Examples
    ///
    /// ```
    /// use foundation_sync_testing::stress::{StressConfig, StressHarness};
    /// use std::sync::atomic::{AtomicUsize, Ordering};
    /// use std::sync::Arc;
    ///
    /// let counter = Arc::new(AtomicUsize::new(0));
    /// let harness = StressHarness::new(StressConfig::new().threads(4).iterations(100));
    ///
    /// let counter_clone = Arc::clone(&counter);
    /// let result = harness.run(move |_thread_id, _iteration| {
    ///     counter_clone.fetch_add(1, Ordering::Relaxed);
    ///     true
    /// });
    ///
    /// assert_eq!(counter.load(Ordering::Relaxed), 400);
    /// assert!(result.is_clean());
    /// ```
    pub fn run<F>(self, operation: F) -> StressResult
    where
        F: Fn(usize, usize) -> bool + Send + Sync + 'static,
    {
        let start = Instant::now();
        let operation = Arc::new(operation);

        let successes = Arc::new(AtomicUsize::new(0));
        let failures = Arc::new(AtomicUsize::new(0));
        let stop_flag = Arc::new(AtomicBool::new(false));

        if let Some(duration) = self.config.get_duration() {
            let stop_flag = Arc::clone(&stop_flag);
            thread::spawn(move || {
                thread::sleep(duration);
                stop_flag.store(true, Ordering::Release);
            });
        }

        let thread_count = self.config.get_thread_count();
        let iterations = self.config.get_iterations();

        let handles: Vec<_> = (0..thread_count)
            .map(|thread_id| {
                let operation = Arc::clone(&operation);
                let successes = Arc::clone(&successes);
                let failures = Arc::clone(&failures);
                let stop_flag = Arc::clone(&stop_flag);

                thread::spawn(move || {
                    for iteration in 0..iterations {
                        if stop_flag.load(Ordering::Acquire) {
                            break;
                        }

                        if operation(thread_id, iteration) {
                            successes.fetch_add(1, Ordering::Relaxed);
                        } else {
                            failures.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                })
            })
            .collect();

        let panicked = handles
            .into_iter()
            .map(thread::JoinHandle::join)
            .filter(Result::is_err)
            .count();

        let result = StressResult {
            successes: successes.load(Ordering::Relaxed),
            failures: failures.load(Ordering::Relaxed),
            panicked,
            duration: start.elapsed(),
            thread_count,
        };

        if result.is_clean() {
            tracing::debug!(%result, "stress run finished");
        } else {
            tracing::warn!(%result, "stress run finished with failures");
        }
        result
    }
}
