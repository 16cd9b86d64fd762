//! Stress runs for `Semaphore`, `CountdownLatch` and `Event`.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use foundation_sync::{CountdownLatch, Event, Semaphore};

use crate::stress::{StressConfig, StressHarness, StressResult};

/// Runs every thread through a semaphore with `permits` permits.
///
/// An operation fails if it observes more than `permits` threads inside the
/// guarded section, including itself.
///
/// # Examples
///
/// ```
/// use foundation_sync_testing::stress::{sync::run_semaphore_stress, StressConfig};
///
/// let result = run_semaphore_stress(StressConfig::new().threads(16).iterations(50), 3);
/// assert!(result.is_clean());
/// ```
#[must_use]
pub fn run_semaphore_stress(config: StressConfig, permits: usize) -> StressResult {
    let semaphore = Arc::new(Semaphore::new(permits));
    let inside = Arc::new(AtomicUsize::new(0));

    StressHarness::new(config).run(move |_thread_id, _iteration| {
        semaphore.acquire(|| {
            let occupancy = inside.fetch_add(1, Ordering::SeqCst) + 1;
            thread::yield_now();
            inside.fetch_sub(1, Ordering::SeqCst);
            occupancy <= permits
        })
    })
}

/// Runs fresh latches opened by `signals` concurrent signallers.
///
/// Each operation waits on its latch with the configured wait bound and fails
/// if the latch did not open or did not settle at zero.
#[must_use]
pub fn run_countdown_latch_stress(config: StressConfig, signals: usize) -> StressResult {
    let wait_timeout = config.get_wait_timeout();

    StressHarness::new(config).run(move |_thread_id, _iteration| {
        let latch = CountdownLatch::new(signals);

        thread::scope(|scope| {
            for _ in 0..signals {
                scope.spawn(|| latch.signal());
            }

            latch.wait_timeout(wait_timeout) && latch.count() == 0
        })
    })
}

/// Runs pulses of an event against a fresh waiter each operation.
///
/// The waiter blocks on the event; the operation pulses with `signal(true)`
/// until the waiter reports back, then checks that the event was left cleared.
#[must_use]
pub fn run_event_pulse_stress(config: StressConfig) -> StressResult {
    let wait_timeout = config.get_wait_timeout();

    StressHarness::new(config).run(move |_thread_id, _iteration| {
        let event = Event::new();
        let released = AtomicUsize::new(0);

        thread::scope(|scope| {
            scope.spawn(|| {
                if event.wait_timeout(wait_timeout) {
                    released.fetch_add(1, Ordering::SeqCst);
                }
            });

            let started = std::time::Instant::now();
            while released.load(Ordering::SeqCst) == 0 && started.elapsed() < wait_timeout {
                event.signal(true);
                thread::yield_now();
            }
        });

        released.load(Ordering::SeqCst) == 1 && !event.is_signaled()
    })
}
