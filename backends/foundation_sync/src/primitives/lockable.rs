//! The lock capability shared by every lock in this crate.
//!
//! [`Lockable`] is the minimal contract a lock needs to work with
//! [`AnyCondVar`](crate::primitives::AnyCondVar): an explicit `lock`/`unlock`
//! pair. On top of it the trait provides RAII acquisition through
//! [`LockGuard`] and scoped acquisition through [`Lockable::with_lock`].
//!
//! # Examples
//!
//! ```
//! use foundation_sync::{Lock, Lockable};
//!
//! let lock = Lock::empty();
//!
//! let answer = lock.with_lock(|| 42);
//! assert_eq!(answer, 42);
//!
//! let guard = lock.acquire();
//! assert!(!lock.try_lock());
//! drop(guard);
//! assert!(lock.try_lock());
//! // SAFETY: acquired by the successful `try_lock` above.
//! unsafe { lock.unlock() };
//! ```

use core::fmt;
use core::marker::PhantomData;

use crate::primitives::{TryLockError, TryLockResult};

/// A lock that can be acquired and released explicitly.
///
/// # Safety
///
/// Between a successful [`lock`](Lockable::lock) or [`try_lock`](Lockable::try_lock)
/// and the matching [`unlock`](Lockable::unlock), no conflicting acquisition may
/// succeed on any thread. Condition variables rely on this to protect the state
/// their callers guard with the lock.
pub unsafe trait Lockable {
    /// Acquires the lock, blocking the current thread until it is available.
    ///
    /// The lock is not re-entrant: locking it again from the thread that holds
    /// it deadlocks.
    fn lock(&self);

    /// Attempts to acquire the lock without blocking.
    ///
    /// Returns `true` if the lock was acquired.
    fn try_lock(&self) -> bool;

    /// Releases the lock.
    ///
    /// # Safety
    ///
    /// The lock must be held by the current thread, acquired through
    /// [`lock`](Lockable::lock) or a successful [`try_lock`](Lockable::try_lock)
    /// and not yet released.
    unsafe fn unlock(&self);

    /// Acquires the lock and returns a guard that releases it when dropped.
    fn acquire(&self) -> LockGuard<'_, Self> {
        self.lock();
        // SAFETY: acquired just above on this thread.
        unsafe { LockGuard::new_unchecked(self) }
    }

    /// Attempts to acquire the lock without blocking.
    ///
    /// # Errors
    ///
    /// Returns [`TryLockError::WouldBlock`] if the lock is held elsewhere.
    fn try_acquire(&self) -> TryLockResult<LockGuard<'_, Self>> {
        if self.try_lock() {
            // SAFETY: acquired by the successful `try_lock` on this thread.
            Ok(unsafe { LockGuard::new_unchecked(self) })
        } else {
            Err(TryLockError::WouldBlock)
        }
    }

    /// Runs `work` with the lock held and returns its result.
    ///
    /// The lock is released on every exit path, including when `work` panics;
    /// an error returned by `work` reaches the caller after the release.
    fn with_lock<R, F>(&self, work: F) -> R
    where
        F: FnOnce() -> R,
    {
        let _guard = self.acquire();
        work()
    }
}

/// RAII guard for any [`Lockable`].
///
/// The guard proves the current thread holds the lock, which is what the
/// condition variables require to wait. It is neither `Send` nor `Sync`, so the
/// release always happens on the acquiring thread.
#[must_use = "if unused the lock will immediately unlock"]
pub struct LockGuard<'a, L: Lockable + ?Sized> {
    lock: &'a L,
    _not_send: PhantomData<*const ()>,
}

impl<'a, L: Lockable + ?Sized> LockGuard<'a, L> {
    /// Wraps an already held lock.
    ///
    /// # Safety
    ///
    /// `lock` must be held by the current thread and no other guard may own
    /// that acquisition.
    pub(crate) unsafe fn new_unchecked(lock: &'a L) -> Self {
        Self {
            lock,
            _not_send: PhantomData,
        }
    }

    /// Returns the lock this guard holds.
    ///
    /// This is an associated function so it never shadows methods of the
    /// guarded data.
    #[inline]
    #[must_use]
    pub fn lockable(this: &Self) -> &'a L {
        this.lock
    }
}

impl<L: Lockable + ?Sized> Drop for LockGuard<'_, L> {
    #[inline]
    fn drop(&mut self) {
        // SAFETY: the guard only exists while this thread holds the lock.
        unsafe { self.lock.unlock() };
    }
}

impl<L: Lockable + ?Sized> fmt::Debug for LockGuard<'_, L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LockGuard").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;

    /// A minimal caller-defined lock, to exercise the provided methods.
    struct FlagLock {
        locked: AtomicBool,
        releases: AtomicUsize,
    }

    impl FlagLock {
        fn new() -> Self {
            Self {
                locked: AtomicBool::new(false),
                releases: AtomicUsize::new(0),
            }
        }
    }

    unsafe impl Lockable for FlagLock {
        fn lock(&self) {
            while !self.try_lock() {
                thread::yield_now();
            }
        }

        fn try_lock(&self) -> bool {
            self.locked
                .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
                .is_ok()
        }

        unsafe fn unlock(&self) {
            self.releases.fetch_add(1, Ordering::Relaxed);
            self.locked.store(false, Ordering::Release);
        }
    }

    /// `WHY`: Guards must release exactly once
    /// `WHAT`: Dropping an acquired guard unlocks the lock
    #[test]
    fn test_guard_releases_on_drop() {
        let lock = FlagLock::new();

        let guard = lock.acquire();
        assert!(!lock.try_lock());
        drop(guard);

        assert_eq!(lock.releases.load(Ordering::Relaxed), 1);
        assert!(lock.try_lock());
    }

    /// `WHY`: Non-blocking acquisition must report a busy lock as an error
    /// `WHAT`: `try_acquire` on a held lock yields `WouldBlock`
    #[test]
    fn test_try_acquire_would_block() {
        let lock = FlagLock::new();
        let _guard = lock.acquire();

        let err = lock.try_acquire().unwrap_err();
        assert_eq!(err, TryLockError::WouldBlock);
    }

    /// `WHY`: Scoped acquisition propagates failures after releasing
    /// `WHAT`: An `Err` returned by the work reaches the caller with the lock free
    #[test]
    fn test_with_lock_propagates_error_after_release() {
        let lock = FlagLock::new();

        let result: Result<(), &str> = lock.with_lock(|| Err("work failed"));

        assert_eq!(result, Err("work failed"));
        assert!(lock.try_lock());
    }

    /// `WHY`: Scoped acquisition must release on unwinding as well
    /// `WHAT`: A panicking work item leaves the lock free
    #[test]
    fn test_with_lock_releases_on_panic() {
        let lock = FlagLock::new();

        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            lock.with_lock(|| panic!("boom"));
        }));

        assert!(outcome.is_err());
        assert_eq!(lock.releases.load(Ordering::Relaxed), 1);
        assert!(lock.try_lock());
    }

    /// `WHY`: The provided methods must give mutual exclusion for any implementor
    /// `WHAT`: Unsynchronized read-modify-write under `with_lock` never loses updates
    #[test]
    fn test_with_lock_mutual_exclusion() {
        let lock = Arc::new(FlagLock::new());
        let counter = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let lock = Arc::clone(&lock);
                let counter = Arc::clone(&counter);
                thread::spawn(move || {
                    for _ in 0..1000 {
                        lock.with_lock(|| {
                            let value = counter.load(Ordering::Relaxed);
                            counter.store(value + 1, Ordering::Relaxed);
                        });
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(counter.load(Ordering::Relaxed), 4000);
    }

    /// `WHY`: The guard exposes its lock for condition variables
    /// `WHAT`: `LockGuard::lockable` returns the acquired lock
    #[test]
    fn test_guard_lockable() {
        let lock = FlagLock::new();
        let guard = lock.acquire();

        assert!(core::ptr::eq(LockGuard::lockable(&guard), &lock));
        assert!(format!("{guard:?}").contains("LockGuard"));
    }
}
