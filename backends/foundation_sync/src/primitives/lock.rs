//! Exclusive lock backed by the platform mutex.
//!
//! [`Lock`] is the lock [`CondVar`](crate::primitives::CondVar) waits with. It can
//! carry the data it protects (`Lock<T>`), or nothing at all (`Lock<()>`, built with
//! [`Lock::empty`]) when the protected state lives elsewhere.

use core::cell::UnsafeCell;
use core::fmt;
use core::ops::{Deref, DerefMut};

use crate::primitives::{LockGuard, Lockable, TryLockResult};

/// A mutual-exclusion lock.
///
/// The lock is not re-entrant. Acquisition goes through [`Lockable`]; the guard
/// returned by [`Lock::acquire`] dereferences to the protected data.
///
/// # Examples
///
/// ```
/// use foundation_sync::Lock;
///
/// let lock = Lock::new(0);
///
/// *lock.acquire() += 1;
/// lock.with(|value| *value += 1);
///
/// assert_eq!(lock.into_inner(), 2);
/// ```
pub struct Lock<T: ?Sized = ()> {
    raw: parking_lot::Mutex<()>,
    data: UnsafeCell<T>,
}

unsafe impl<T: ?Sized + Send> Send for Lock<T> {}
unsafe impl<T: ?Sized + Send> Sync for Lock<T> {}

impl Lock {
    /// Creates a lock that protects no data of its own.
    #[inline]
    #[must_use]
    pub fn empty() -> Self {
        Self::new(())
    }
}

impl<T> Lock<T> {
    /// Creates a new unlocked lock protecting `data`.
    #[inline]
    pub fn new(data: T) -> Self {
        Self {
            raw: parking_lot::Mutex::new(()),
            data: UnsafeCell::new(data),
        }
    }

    /// Consumes the lock and returns the protected data.
    #[inline]
    pub fn into_inner(self) -> T {
        self.data.into_inner()
    }
}

impl<T: ?Sized> Lock<T> {
    /// Acquires the lock, blocking until it becomes available.
    #[inline]
    pub fn acquire(&self) -> LockGuard<'_, Self> {
        Lockable::acquire(self)
    }

    /// Attempts to acquire the lock without blocking.
    ///
    /// # Errors
    ///
    /// Returns [`TryLockError::WouldBlock`](crate::primitives::TryLockError::WouldBlock)
    /// if the lock is already held.
    #[inline]
    pub fn try_acquire(&self) -> TryLockResult<LockGuard<'_, Self>> {
        Lockable::try_acquire(self)
    }

    /// Runs `work` with exclusive access to the data and returns its result.
    ///
    /// The lock is released before the result is returned, on every exit path.
    #[inline]
    pub fn with<R, F>(&self, work: F) -> R
    where
        F: FnOnce(&mut T) -> R,
    {
        let mut guard = self.acquire();
        work(&mut *guard)
    }

    /// Returns a mutable reference to the data.
    ///
    /// The exclusive borrow statically guarantees no other access exists.
    #[inline]
    pub fn get_mut(&mut self) -> &mut T {
        self.data.get_mut()
    }

    /// Returns `true` if the lock is currently held by some thread.
    #[inline]
    pub fn is_locked(&self) -> bool {
        self.raw.is_locked()
    }

    /// The platform mutex, for condition variable waits.
    #[inline]
    pub(crate) fn raw(&self) -> &parking_lot::Mutex<()> {
        &self.raw
    }
}

unsafe impl<T: ?Sized> Lockable for Lock<T> {
    #[inline]
    fn lock(&self) {
        core::mem::forget(self.raw.lock());
    }

    #[inline]
    fn try_lock(&self) -> bool {
        self.raw.try_lock().map(core::mem::forget).is_some()
    }

    #[inline]
    unsafe fn unlock(&self) {
        // SAFETY: the caller holds the lock, acquired through a forgotten guard.
        unsafe { self.raw.force_unlock() };
    }
}

impl<T: ?Sized> Deref for LockGuard<'_, Lock<T>> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        // SAFETY: the guard proves exclusive ownership of the lock.
        unsafe { &*LockGuard::lockable(self).data.get() }
    }
}

impl<T: ?Sized> DerefMut for LockGuard<'_, Lock<T>> {
    #[inline]
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: the guard proves exclusive ownership of the lock.
        unsafe { &mut *LockGuard::lockable(self).data.get() }
    }
}

impl<T: Default> Default for Lock<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> From<T> for Lock<T> {
    fn from(data: T) -> Self {
        Self::new(data)
    }
}

impl<T: ?Sized + fmt::Debug> fmt::Debug for Lock<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut d = f.debug_struct("Lock");
        match self.try_acquire() {
            Ok(guard) => d.field("data", &&*guard),
            Err(_) => d.field("data", &format_args!("<locked>")),
        };
        d.finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::TryLockError;
    use std::sync::Arc;
    use std::thread;

    /// `WHY`: Validates basic construction and data access
    /// `WHAT`: Guard deref reads and writes the protected data
    #[test]
    fn test_acquire_and_deref() {
        let lock = Lock::new(10);
        {
            let mut guard = lock.acquire();
            *guard += 5;
            assert!(lock.is_locked());
        }
        assert!(!lock.is_locked());
        assert_eq!(lock.into_inner(), 15);
    }

    /// `WHY`: Explicit lock/unlock is the contract the generic condvar builds on
    /// `WHAT`: Raw `lock` blocks `try_lock` until `unlock`
    #[test]
    fn test_raw_lock_unlock() {
        let lock = Lock::empty();

        lock.lock();
        assert!(!lock.try_lock());
        // SAFETY: locked above on this thread.
        unsafe { lock.unlock() };

        assert!(lock.try_lock());
        // SAFETY: locked by the successful `try_lock`.
        unsafe { lock.unlock() };
    }

    /// `WHY`: Non-blocking acquisition must not wait
    /// `WHAT`: `try_acquire` on a held lock returns `WouldBlock`
    #[test]
    fn test_try_acquire_when_held() {
        let lock = Lock::new(());
        let _guard = lock.acquire();

        assert!(matches!(lock.try_acquire(), Err(TryLockError::WouldBlock)));
    }

    /// `WHY`: Scoped access must release on unwinding
    /// `WHAT`: A panic inside `with` leaves the lock usable
    #[test]
    fn test_with_releases_on_panic() {
        let lock = Lock::new(1);

        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            lock.with(|value| {
                *value = 2;
                panic!("boom");
            });
        }));

        assert!(outcome.is_err());
        assert!(!lock.is_locked());
        assert_eq!(*lock.acquire(), 2);
    }

    /// `WHY`: The lock must serialize concurrent writers
    /// `WHAT`: Concurrent increments are never lost
    #[test]
    fn test_mutual_exclusion() {
        let lock = Arc::new(Lock::new(0usize));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let lock = Arc::clone(&lock);
                thread::spawn(move || {
                    for _ in 0..1000 {
                        lock.with(|value| *value += 1);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(*lock.acquire(), 8000);
    }

    /// `WHY`: Validates Debug implementation
    /// `WHAT`: Debug shows the data when free and a placeholder when held
    #[test]
    fn test_debug() {
        let mut lock = Lock::new(7);
        assert!(format!("{lock:?}").contains('7'));

        {
            let _guard = lock.acquire();
            assert!(format!("{lock:?}").contains("<locked>"));
        }

        *lock.get_mut() = 9;
        assert!(format!("{lock:?}").contains('9'));
    }
}
