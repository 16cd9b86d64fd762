//! Shared/exclusive lock backed by the platform read/write lock.
//!
//! [`ReadWriteLock`] allows any number of shared holders or exactly one
//! exclusive holder. Because a condition variable needs a single-mode lock,
//! the lock exposes two capability views that implement [`Lockable`]:
//!
//! - [`SharedLock`] (via [`ReadWriteLock::shared`]): `lock` acquires shared
//! - [`ExclusiveLock`] (via [`ReadWriteLock::exclusive`]): `lock` acquires exclusive
//!
//! Both views are references to the same platform handle, and each only ever
//! issues its matching acquire/release pair.
//!
//! # Examples
//!
//! ```
//! use foundation_sync::{Lockable, ReadWriteLock};
//!
//! let lock = ReadWriteLock::new();
//!
//! let reader_a = lock.shared().acquire();
//! let reader_b = lock.shared().acquire();
//! assert!(!lock.try_lock_exclusive());
//!
//! drop((reader_a, reader_b));
//! lock.write(|| {
//!     assert!(!lock.try_lock_shared());
//! });
//! ```

use core::fmt;

use parking_lot::lock_api::RawRwLock as RawRwLockApi;

use crate::primitives::Lockable;

/// A reader/writer lock that protects no data of its own.
///
/// Fairness between waiting readers and writers is the platform lock's policy.
/// Neither mode is re-entrant.
pub struct ReadWriteLock {
    raw: parking_lot::RawRwLock,
}

impl ReadWriteLock {
    /// Creates a new unlocked read/write lock.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            raw: <parking_lot::RawRwLock as RawRwLockApi>::INIT,
        }
    }

    /// Acquires a shared slot, blocking while an exclusive holder exists.
    #[inline]
    pub fn lock_shared(&self) {
        self.raw.lock_shared();
    }

    /// Attempts to acquire a shared slot without blocking.
    #[inline]
    #[must_use]
    pub fn try_lock_shared(&self) -> bool {
        self.raw.try_lock_shared()
    }

    /// Releases a shared slot.
    ///
    /// # Safety
    ///
    /// The current thread must hold a shared slot acquired from this lock.
    #[inline]
    pub unsafe fn unlock_shared(&self) {
        // SAFETY: forwarded from the caller.
        unsafe { self.raw.unlock_shared() };
    }

    /// Acquires the exclusive slot, blocking while any other holder exists.
    #[inline]
    pub fn lock_exclusive(&self) {
        self.raw.lock_exclusive();
    }

    /// Attempts to acquire the exclusive slot without blocking.
    #[inline]
    #[must_use]
    pub fn try_lock_exclusive(&self) -> bool {
        self.raw.try_lock_exclusive()
    }

    /// Releases the exclusive slot.
    ///
    /// # Safety
    ///
    /// The current thread must hold the exclusive slot of this lock.
    #[inline]
    pub unsafe fn unlock_exclusive(&self) {
        // SAFETY: forwarded from the caller.
        unsafe { self.raw.unlock_exclusive() };
    }

    /// Runs `work` while holding a shared slot.
    ///
    /// Can run concurrently with other `read` calls, never with `write`.
    #[inline]
    pub fn read<R, F>(&self, work: F) -> R
    where
        F: FnOnce() -> R,
    {
        self.shared().with_lock(work)
    }

    /// Runs `work` while holding the exclusive slot.
    #[inline]
    pub fn write<R, F>(&self, work: F) -> R
    where
        F: FnOnce() -> R,
    {
        self.exclusive().with_lock(work)
    }

    /// Returns the view of this lock whose `lock` acquires shared.
    #[inline]
    #[must_use]
    pub fn shared(&self) -> &SharedLock {
        // SAFETY: `SharedLock` is a `repr(transparent)` wrapper around `ReadWriteLock`.
        unsafe { &*core::ptr::from_ref(self).cast::<SharedLock>() }
    }

    /// Returns the view of this lock whose `lock` acquires exclusive.
    #[inline]
    #[must_use]
    pub fn exclusive(&self) -> &ExclusiveLock {
        // SAFETY: `ExclusiveLock` is a `repr(transparent)` wrapper around `ReadWriteLock`.
        unsafe { &*core::ptr::from_ref(self).cast::<ExclusiveLock>() }
    }
}

impl Default for ReadWriteLock {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ReadWriteLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadWriteLock").finish_non_exhaustive()
    }
}

/// Shared capability view of a [`ReadWriteLock`].
#[repr(transparent)]
pub struct SharedLock {
    inner: ReadWriteLock,
}

impl SharedLock {
    /// Returns the read/write lock this view acquires.
    #[inline]
    #[must_use]
    pub fn read_write_lock(&self) -> &ReadWriteLock {
        &self.inner
    }
}

unsafe impl Lockable for SharedLock {
    #[inline]
    fn lock(&self) {
        self.inner.lock_shared();
    }

    #[inline]
    fn try_lock(&self) -> bool {
        self.inner.try_lock_shared()
    }

    #[inline]
    unsafe fn unlock(&self) {
        // SAFETY: this view only ever acquires shared slots.
        unsafe { self.inner.unlock_shared() };
    }
}

impl fmt::Debug for SharedLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedLock").finish_non_exhaustive()
    }
}

/// Exclusive capability view of a [`ReadWriteLock`].
#[repr(transparent)]
pub struct ExclusiveLock {
    inner: ReadWriteLock,
}

impl ExclusiveLock {
    /// Returns the read/write lock this view acquires.
    #[inline]
    #[must_use]
    pub fn read_write_lock(&self) -> &ReadWriteLock {
        &self.inner
    }
}

unsafe impl Lockable for ExclusiveLock {
    #[inline]
    fn lock(&self) {
        self.inner.lock_exclusive();
    }

    #[inline]
    fn try_lock(&self) -> bool {
        self.inner.try_lock_exclusive()
    }

    #[inline]
    unsafe fn unlock(&self) {
        // SAFETY: this view only ever acquires the exclusive slot.
        unsafe { self.inner.unlock_exclusive() };
    }
}

impl fmt::Debug for ExclusiveLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExclusiveLock").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Barrier};
    use std::thread;
    use std::time::Duration;

    /// `WHY`: Shared holders must coexist
    /// `WHAT`: Two shared acquisitions succeed while exclusive is refused
    #[test]
    fn test_multiple_shared_holders() {
        let lock = ReadWriteLock::new();

        lock.lock_shared();
        assert!(lock.try_lock_shared());
        assert!(!lock.try_lock_exclusive());

        // SAFETY: two shared slots acquired above.
        unsafe {
            lock.unlock_shared();
            lock.unlock_shared();
        }

        assert!(lock.try_lock_exclusive());
        // SAFETY: exclusive acquired by the successful try above.
        unsafe { lock.unlock_exclusive() };
    }

    /// `WHY`: The exclusive slot excludes every other holder
    /// `WHAT`: Neither shared nor exclusive can be taken while exclusive is held
    #[test]
    fn test_exclusive_excludes_all() {
        let lock = ReadWriteLock::new();

        let _writer = lock.exclusive().acquire();
        assert!(!lock.try_lock_shared());
        assert!(!lock.try_lock_exclusive());
        assert!(lock.shared().try_acquire().is_err());
    }

    /// `WHY`: Views must share the handle of the lock they came from
    /// `WHAT`: Both views point back at the same `ReadWriteLock`
    #[test]
    fn test_views_share_handle() {
        let lock = ReadWriteLock::new();

        assert!(core::ptr::eq(lock.shared().read_write_lock(), &lock));
        assert!(core::ptr::eq(lock.exclusive().read_write_lock(), &lock));
    }

    /// `WHY`: Scoped helpers return the work result
    /// `WHAT`: `read` and `write` propagate values and release afterwards
    #[test]
    fn test_read_write_scoped() {
        let lock = ReadWriteLock::new();

        assert_eq!(lock.read(|| 1), 1);
        let result: Result<u8, &str> = lock.write(|| Err("nope"));
        assert_eq!(result, Err("nope"));

        assert!(lock.try_lock_exclusive());
        // SAFETY: acquired just above.
        unsafe { lock.unlock_exclusive() };
    }

    /// `WHY`: Readers must run concurrently
    /// `WHAT`: Several threads are inside `read` at the same time
    #[test]
    fn test_concurrent_readers() {
        let lock = Arc::new(ReadWriteLock::new());
        let barrier = Arc::new(Barrier::new(3));
        let inside = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..3)
            .map(|_| {
                let lock = Arc::clone(&lock);
                let barrier = Arc::clone(&barrier);
                let inside = Arc::clone(&inside);
                thread::spawn(move || {
                    lock.read(|| {
                        inside.fetch_add(1, Ordering::SeqCst);
                        // every reader reaches this point while the others hold their slots
                        barrier.wait();
                    });
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(inside.load(Ordering::SeqCst), 3);
    }

    /// `WHY`: Writers block readers until they release
    /// `WHAT`: A reader started during a write observes the write's effect
    #[test]
    fn test_writer_blocks_reader() {
        let lock = Arc::new(ReadWriteLock::new());
        let value = Arc::new(AtomicUsize::new(0));

        let writer = lock.exclusive().acquire();

        let reader = {
            let lock = Arc::clone(&lock);
            let value = Arc::clone(&value);
            thread::spawn(move || lock.read(|| value.load(Ordering::SeqCst)))
        };

        thread::sleep(Duration::from_millis(20));
        value.store(42, Ordering::SeqCst);
        drop(writer);

        assert_eq!(reader.join().unwrap(), 42);
    }
}
