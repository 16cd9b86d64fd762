//! Condition variable that works with any [`Lockable`].
//!
//! The platform condition variable can only release a platform mutex atomically
//! with registering the waiter. [`AnyCondVar`] gets the same guarantee for a lock
//! the platform knows nothing about by routing the hand-off through an internal
//! lock (`cv_lock`) that both `wait` and `notify_*` pass through.
//!
//! # The hand-off
//!
//! `wait` acquires `cv_lock` *before* releasing the caller's lock, then waits on
//! the internal [`CondVar`] with `cv_lock`, which releases `cv_lock` and registers
//! the waiter in one platform step. `notify_*` acquires and immediately releases
//! `cv_lock` before forwarding to the internal condition variable.
//!
//! A notifier changes the shared state while holding the caller's lock, so it
//! either finishes before the waiter releases that lock (and the waiter sees the
//! new state), or it reaches `cv_lock` after the waiter took it, and then cannot
//! get through until the waiter is registered with the platform primitive. There
//! is no window in which a notify can fall between "caller's lock released" and
//! "waiter registered".
//!
//! When the internal wait returns, `cv_lock` is released before the caller's lock
//! is taken back. Holding `cv_lock` while blocking on the caller's lock would
//! deadlock against any thread that holds the caller's lock and is itself entering
//! `wait` or `notify_*`.
//!
//! # Examples
//!
//! ```
//! use foundation_sync::{AnyCondVar, ConditionVariable, Lockable, ReadWriteLock};
//! use std::sync::atomic::{AtomicBool, Ordering};
//! use std::sync::Arc;
//! use std::thread;
//!
//! let lock = Arc::new(ReadWriteLock::new());
//! let condvar = Arc::new(AnyCondVar::new());
//! let ready = Arc::new(AtomicBool::new(false));
//!
//! let notifier = {
//!     let (lock, condvar, ready) = (lock.clone(), condvar.clone(), ready.clone());
//!     thread::spawn(move || {
//!         lock.write(|| ready.store(true, Ordering::Relaxed));
//!         condvar.notify_all();
//!     })
//! };
//!
//! let mut guard = lock.exclusive().acquire();
//! condvar.wait_until(&mut guard, |_| ready.load(Ordering::Relaxed));
//! drop(guard);
//! notifier.join().unwrap();
//! ```

use core::fmt;
use core::marker::PhantomData;
use core::time::Duration;
use std::time::Instant;

use crate::primitives::{CondVar, ConditionVariable, Lock, LockGuard, Lockable, WaitTimeoutResult};

/// A condition variable usable with any lock implementing [`Lockable`].
///
/// The lock is chosen per call: each wait takes the guard of the caller's lock.
/// The internal lock is private and never handed to callers.
pub struct AnyCondVar<L: ?Sized> {
    cv_lock: Lock,
    condvar: CondVar,
    _lock: PhantomData<fn(&L)>,
}

impl<L: Lockable + ?Sized> AnyCondVar<L> {
    /// Creates a new condition variable.
    #[must_use]
    pub fn new() -> Self {
        Self {
            cv_lock: Lock::empty(),
            condvar: CondVar::new(),
            _lock: PhantomData,
        }
    }

    /// Releases the caller's lock, blocks until woken, then re-acquires it.
    pub fn wait(&self, guard: &mut LockGuard<'_, L>) {
        self.wait_with(guard, |condvar, cv_guard| {
            condvar.wait(cv_guard);
            WaitTimeoutResult::new(false)
        });
    }

    /// Like [`AnyCondVar::wait`], giving up after `timeout`.
    pub fn wait_timeout(&self, guard: &mut LockGuard<'_, L>, timeout: Duration) -> WaitTimeoutResult {
        self.wait_with(guard, |condvar, cv_guard| {
            condvar.wait_timeout(cv_guard, timeout)
        })
    }

    /// Like [`AnyCondVar::wait`], giving up at the monotonic `deadline`.
    pub fn wait_deadline(&self, guard: &mut LockGuard<'_, L>, deadline: Instant) -> WaitTimeoutResult {
        self.wait_with(guard, |condvar, cv_guard| {
            condvar.wait_deadline(cv_guard, deadline)
        })
    }

    /// Wakes one waiting thread, if any.
    pub fn notify_one(&self) {
        drop(self.cv_lock.acquire());
        self.condvar.notify_one();
    }

    /// Wakes every waiting thread.
    pub fn notify_all(&self) {
        drop(self.cv_lock.acquire());
        self.condvar.notify_all();
    }

    fn wait_with<F>(&self, guard: &mut LockGuard<'_, L>, wait_internal: F) -> WaitTimeoutResult
    where
        F: FnOnce(&CondVar, &mut LockGuard<'_, Lock>) -> WaitTimeoutResult,
    {
        let lock = LockGuard::lockable(guard);

        let cv_guard = self.cv_lock.acquire();

        // SAFETY: `guard` proves this thread holds `lock`. `relock` takes it back
        // before this function returns or unwinds, so `guard` stays truthful.
        unsafe { lock.unlock() };
        let relock = Relock(lock);

        // cv_lock is released at the end of this block, before the relock
        let result = {
            let mut cv_guard = cv_guard;
            wait_internal(&self.condvar, &mut cv_guard)
        };
        drop(relock);

        if result.timed_out() {
            tracing::trace!("generic condition variable wait timed out");
        }
        result
    }
}

/// Re-acquires a lock released in the middle of a wait.
struct Relock<'a, L: Lockable + ?Sized>(&'a L);

impl<L: Lockable + ?Sized> Drop for Relock<'_, L> {
    fn drop(&mut self) {
        self.0.lock();
    }
}

// SAFETY: `Relock` re-acquires the caller's lock on every exit from a wait.
unsafe impl<L: Lockable + ?Sized> ConditionVariable<L> for AnyCondVar<L> {
    #[inline]
    fn wait(&self, guard: &mut LockGuard<'_, L>) {
        AnyCondVar::wait(self, guard);
    }

    #[inline]
    fn wait_timeout(&self, guard: &mut LockGuard<'_, L>, timeout: Duration) -> WaitTimeoutResult {
        AnyCondVar::wait_timeout(self, guard, timeout)
    }

    #[inline]
    fn wait_deadline(&self, guard: &mut LockGuard<'_, L>, deadline: Instant) -> WaitTimeoutResult {
        AnyCondVar::wait_deadline(self, guard, deadline)
    }

    #[inline]
    fn notify_one(&self) {
        AnyCondVar::notify_one(self);
    }

    #[inline]
    fn notify_all(&self) {
        AnyCondVar::notify_all(self);
    }
}

impl<L: Lockable + ?Sized> Default for AnyCondVar<L> {
    fn default() -> Self {
        Self::new()
    }
}

impl<L: ?Sized> fmt::Debug for AnyCondVar<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnyCondVar").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::{ExclusiveLock, ReadWriteLock, SharedLock};
    use ntest::timeout;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;
    use tracing_test::traced_test;

    struct Shared<L: Lockable> {
        lock: L,
        condvar: AnyCondVar<L>,
        value: AtomicUsize,
    }

    fn shared_with_lock() -> Arc<Shared<Lock<()>>> {
        Arc::new(Shared {
            lock: Lock::empty(),
            condvar: AnyCondVar::new(),
            value: AtomicUsize::new(0),
        })
    }

    /// `WHY`: The caller's lock must be released while waiting
    /// `WHAT`: Another thread can take the lock while a waiter is blocked
    #[test]
    #[timeout(10000)]
    fn test_wait_releases_caller_lock() {
        let shared = shared_with_lock();

        let waiter = {
            let shared = Arc::clone(&shared);
            thread::spawn(move || {
                let mut guard = shared.lock.acquire();
                shared
                    .condvar
                    .wait_until(&mut guard, |_| shared.value.load(Ordering::SeqCst) == 1);
                assert!(shared.lock.is_locked());
            })
        };

        // the notifier only gets the lock once the waiter released it
        shared.lock.with(|_| shared.value.store(1, Ordering::SeqCst));
        shared.condvar.notify_all();

        waiter.join().unwrap();
    }

    /// `WHY`: `notify_one` must wake a single waiter only
    /// `WHAT`: Of five waiters, exactly one completes after one `notify_one`
    #[test]
    #[timeout(10000)]
    fn test_notify_one_wakes_one() {
        let shared = shared_with_lock();
        let completed = Arc::new(AtomicUsize::new(0));
        let parked = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..5)
            .map(|_| {
                let shared = Arc::clone(&shared);
                let completed = Arc::clone(&completed);
                let parked = Arc::clone(&parked);
                thread::spawn(move || {
                    let mut guard = shared.lock.acquire();
                    parked.fetch_add(1, Ordering::SeqCst);
                    shared.condvar.wait_until(&mut guard, |_| {
                        shared.value.load(Ordering::SeqCst) > 0
                    });
                    drop(guard);
                    completed.fetch_add(1, Ordering::SeqCst);
                })
            })
            .collect();

        while parked.load(Ordering::SeqCst) < 5 {
            thread::yield_now();
        }
        // every waiter has registered once it let go of the caller's lock
        shared.lock.with(|_| ());
        assert_eq!(completed.load(Ordering::SeqCst), 0);

        shared.lock.with(|_| shared.value.store(1, Ordering::SeqCst));
        shared.condvar.notify_one();

        let deadline = Instant::now() + Duration::from_secs(5);
        while completed.load(Ordering::SeqCst) == 0 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(1));
        }
        assert_eq!(completed.load(Ordering::SeqCst), 1);

        // nobody else follows without another notify
        thread::sleep(Duration::from_millis(50));
        assert_eq!(completed.load(Ordering::SeqCst), 1);

        shared.condvar.notify_all();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(completed.load(Ordering::SeqCst), 5);
    }

    /// `WHY`: A long timeout must return `true` once the condition is met
    /// `WHAT`: 100 unrelated notifies leave the waiter blocked; the qualifying one releases it
    #[test]
    #[timeout(10000)]
    fn test_wait_until_timeout_satisfied() {
        let shared = shared_with_lock();
        let finished = Arc::new(AtomicBool::new(false));

        let waiter = {
            let shared = Arc::clone(&shared);
            let finished = Arc::clone(&finished);
            thread::spawn(move || {
                let mut guard = shared.lock.acquire();
                let result = shared.condvar.wait_until_timeout(
                    &mut guard,
                    Duration::from_secs(10),
                    |_| shared.value.load(Ordering::SeqCst) == 100,
                );
                finished.store(true, Ordering::SeqCst);
                result
            })
        };

        for i in 0..100 {
            shared.lock.with(|_| shared.value.store(i, Ordering::SeqCst));
            shared.condvar.notify_one();
        }
        thread::sleep(Duration::from_millis(10));
        assert!(!finished.load(Ordering::SeqCst));

        shared.lock.with(|_| shared.value.store(100, Ordering::SeqCst));
        shared.condvar.notify_one();

        assert!(waiter.join().unwrap());
    }

    /// `WHY`: A short timeout must report failure when the condition never holds
    /// `WHAT`: A 1 ms timed wait returns `false` despite a stream of notifies
    #[test]
    #[traced_test]
    #[timeout(10000)]
    fn test_wait_until_timeout_expires() {
        let shared = shared_with_lock();

        let notifier = {
            let shared = Arc::clone(&shared);
            thread::spawn(move || {
                for i in 0..100 {
                    shared.lock.with(|_| shared.value.store(i, Ordering::SeqCst));
                    shared.condvar.notify_one();
                }
            })
        };

        let mut guard = shared.lock.acquire();
        let satisfied = shared
            .condvar
            .wait_until_timeout(&mut guard, Duration::from_millis(1), |_| {
                shared.value.load(Ordering::SeqCst) == 100
            });
        drop(guard);
        notifier.join().unwrap();

        assert!(!satisfied);
        assert!(logs_contain("generic condition variable wait timed out"));
    }

    /// `WHY`: Raw timed waits report the timeout and still hand the lock back
    /// `WHAT`: `wait_timeout` without a notifier times out with the lock held
    #[test]
    fn test_wait_timeout_reacquires() {
        let lock = ReadWriteLock::new();
        let condvar = AnyCondVar::<ExclusiveLock>::new();

        let mut guard = lock.exclusive().acquire();
        let result = condvar.wait_timeout(&mut guard, Duration::from_millis(5));

        assert!(result.timed_out());
        assert!(!lock.try_lock_shared());
    }

    /// `WHY`: The adapter must accept the shared view of a read/write lock
    /// `WHAT`: A waiter holding the shared view is released by a writer's notify
    #[test]
    #[timeout(10000)]
    fn test_with_shared_view() {
        let lock = Arc::new(ReadWriteLock::new());
        let condvar = Arc::new(AnyCondVar::<SharedLock>::new());
        let ready = Arc::new(AtomicBool::new(false));

        let waiter = {
            let (lock, condvar, ready) = (lock.clone(), condvar.clone(), ready.clone());
            thread::spawn(move || {
                let mut guard = lock.shared().acquire();
                condvar.wait_until(&mut guard, |_| ready.load(Ordering::SeqCst));
            })
        };

        lock.write(|| ready.store(true, Ordering::SeqCst));
        condvar.notify_all();

        waiter.join().unwrap();
    }

    /// `WHY`: Waiters re-entering `wait` while another waiter wakes must not deadlock
    /// `WHAT`: Many waiters ping-pong through the same lock and condvar to completion
    #[test]
    #[timeout(20000)]
    fn test_waiters_and_notify_under_lock_do_not_deadlock() {
        let shared = shared_with_lock();
        let rounds = 200;

        let handles: Vec<_> = (0..4)
            .map(|parity| {
                let shared = Arc::clone(&shared);
                thread::spawn(move || {
                    for round in 0..rounds {
                        let mut guard = shared.lock.acquire();
                        shared.condvar.wait_until(&mut guard, |_| {
                            shared.value.load(Ordering::SeqCst) % 4 == parity
                        });
                        assert_eq!(shared.value.load(Ordering::SeqCst), round * 4 + parity);
                        shared.value.fetch_add(1, Ordering::SeqCst);
                        // notify while still holding the caller's lock
                        shared.condvar.notify_all();
                        drop(guard);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(shared.value.load(Ordering::SeqCst), rounds * 4);
    }

    /// `WHY`: Catches lost wakeups in the hand-off protocol
    /// `WHAT`: Repeated single-shot handshakes with a 1 s safety timeout all succeed
    #[test]
    #[timeout(60000)]
    fn test_no_lost_wakeups() {
        for _ in 0..500 {
            let shared = shared_with_lock();

            let waiter = {
                let shared = Arc::clone(&shared);
                thread::spawn(move || {
                    let mut guard = shared.lock.acquire();
                    shared.condvar.wait_until_timeout(&mut guard, Duration::from_secs(1), |_| {
                        shared.value.load(Ordering::SeqCst) == 1
                    })
                })
            };

            shared.lock.with(|_| shared.value.store(1, Ordering::SeqCst));
            shared.condvar.notify_all();

            assert!(waiter.join().unwrap());
        }
    }
}
