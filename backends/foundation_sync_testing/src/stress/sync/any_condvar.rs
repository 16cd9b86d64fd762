//! `AnyCondVar` stress runs.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use foundation_sync::{AnyCondVar, ConditionVariable, ExclusiveLock, Lock, Lockable, ReadWriteLock};

use crate::metrics::LatencySummary;
use crate::stress::{StressConfig, StressHarness, StressResult};

/// Runs repeated one-shot hand-offs between a waiter and a notifier.
///
/// Every operation sets up a fresh lock, condition variable and flag, starts a
/// notifier thread that sets the flag under the lock and calls `notify_all`,
/// and waits for the flag with the configured wait bound. An operation fails
/// only if the wait times out, which means the notify was lost.
///
/// # Examples
///
/// ```
/// use foundation_sync_testing::stress::{sync::run_lost_wakeup_stress, StressConfig};
///
/// let result = run_lost_wakeup_stress(StressConfig::new().threads(4).iterations(50));
/// assert!(result.is_clean());
/// ```
#[must_use]
pub fn run_lost_wakeup_stress(config: StressConfig) -> StressResult {
    let wait_timeout = config.get_wait_timeout();

    StressHarness::new(config).run(move |_thread_id, _iteration| {
        let lock = Lock::empty();
        let condvar = AnyCondVar::<Lock>::new();
        let flag = AtomicBool::new(false);

        thread::scope(|scope| {
            scope.spawn(|| {
                lock.with(|_| flag.store(true, Ordering::Relaxed));
                condvar.notify_all();
            });

            let mut guard = lock.acquire();
            condvar.wait_until_timeout(&mut guard, wait_timeout, |_| flag.load(Ordering::Relaxed))
        })
    })
}

/// Runs contended timed waits on the exclusive view of a shared read/write lock.
///
/// Every operation takes the exclusive view, bumps a counter, notifies, then
/// waits briefly for another thread to bump it. The wait may time out; the
/// operation succeeds if the caller holds the exclusive slot again afterwards.
#[must_use]
pub fn run_any_condvar_relock_stress(config: StressConfig) -> StressResult {
    let lock = Arc::new(ReadWriteLock::new());
    let condvar = Arc::new(AnyCondVar::<ExclusiveLock>::new());
    let counter = Arc::new(AtomicU64::new(0));
    let wait_timeout = config.get_wait_timeout() / 100;

    StressHarness::new(config).run(move |_thread_id, _iteration| {
        let mut guard = lock.exclusive().acquire();
        let seen = counter.fetch_add(1, Ordering::Relaxed) + 1;
        condvar.notify_all();

        condvar.wait_until_timeout(&mut guard, wait_timeout, |_| {
            counter.load(Ordering::Relaxed) != seen
        });

        let relocked = !lock.try_lock_shared();
        drop(guard);
        relocked
    })
}

/// Measures the time from `notify_one` to the waiter running again.
///
/// Runs `rounds` ping-pong exchanges between two threads over one
/// [`AnyCondVar<Lock>`] and returns the notify-to-wake latencies.
#[must_use]
pub fn measure_any_condvar_handoff(rounds: usize) -> LatencySummary {
    let lock = Lock::new(Turn::Ping);
    let condvar = AnyCondVar::<Lock<Turn>>::new();
    let sent_at = Lock::new(Instant::now());
    let mut samples = Vec::with_capacity(rounds);

    thread::scope(|scope| {
        scope.spawn(|| {
            for _ in 0..rounds {
                let mut turn = lock.acquire();
                condvar.wait_until(&mut turn, |turn| **turn == Turn::Pong);
                *turn = Turn::Ping;
                *sent_at.acquire() = Instant::now();
                condvar.notify_one();
            }
        });

        for _ in 0..rounds {
            let mut turn = lock.acquire();
            *turn = Turn::Pong;
            *sent_at.acquire() = Instant::now();
            condvar.notify_one();
            condvar.wait_until(&mut turn, |turn| **turn == Turn::Ping);
            samples.push(sent_at.acquire().elapsed());
        }
    });

    LatencySummary::from_samples(samples)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Turn {
    Ping,
    Pong,
}
