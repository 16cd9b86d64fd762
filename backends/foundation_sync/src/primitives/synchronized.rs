//! A value paired with the read/write lock that protects it.
//!
//! [`Synchronized`] hands out access only through closures that run while the
//! lock is held in the matching mode, so no reference to the value outlives its
//! critical section. Waiting for the value to reach some state goes through any
//! [`ConditionVariable`] over the shared view of the internal lock, typically an
//! [`AnyCondVar<SharedLock>`](crate::primitives::AnyCondVar).
//!
//! # Examples
//!
//! ```
//! use foundation_sync::Synchronized;
//!
//! #[derive(Clone, Default)]
//! struct Stats {
//!     hits: u64,
//!     misses: u64,
//! }
//!
//! let stats = Synchronized::new(Stats::default());
//!
//! stats.with_field_mut(|s| &mut s.hits, |hits| *hits += 1);
//! let previous = stats.set_field(|s| &mut s.misses, 4);
//!
//! assert_eq!(previous, 0);
//! assert_eq!(stats.get_field(|s| &s.hits), 1);
//! assert_eq!(stats.read(|s| s.hits + s.misses), 5);
//! ```

use core::cell::UnsafeCell;
use core::fmt;
use core::time::Duration;
use std::time::Instant;

use crate::primitives::{
    ConditionVariable, LockGuard, Lockable, ReadWriteLock, SharedLock, TryLockResult,
};

/// A value guarded by a [`ReadWriteLock`].
///
/// Reads run concurrently with each other; writes are exclusive. Compound
/// operations ([`get_and_set`](Synchronized::get_and_set),
/// [`swap`](Synchronized::swap), the field setters) each run in a single
/// exclusive section, so no other thread observes an intermediate state.
pub struct Synchronized<T: ?Sized> {
    lock: ReadWriteLock,
    value: UnsafeCell<T>,
}

unsafe impl<T: ?Sized + Send> Send for Synchronized<T> {}
unsafe impl<T: ?Sized + Send + Sync> Sync for Synchronized<T> {}

impl<T> Synchronized<T> {
    /// Wraps `value`.
    #[inline]
    pub const fn new(value: T) -> Self {
        Self {
            lock: ReadWriteLock::new(),
            value: UnsafeCell::new(value),
        }
    }

    /// Consumes the wrapper and returns the value.
    #[inline]
    pub fn into_inner(self) -> T {
        self.value.into_inner()
    }

    /// Returns a copy of the value, taken under shared access.
    #[inline]
    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.read(T::clone)
    }

    /// Replaces the value under exclusive access.
    #[inline]
    pub fn set(&self, value: T) {
        self.write(|current| *current = value);
    }

    /// Replaces the value with `value` and returns the previous one.
    #[inline]
    pub fn swap(&self, value: T) -> T {
        self.write(|current| core::mem::replace(current, value))
    }

    /// Applies `work` to the value and returns the value as it was before.
    ///
    /// The copy and the mutation happen in the same exclusive section.
    pub fn get_and_set<F>(&self, work: F) -> T
    where
        T: Clone,
        F: FnOnce(&mut T),
    {
        self.write(|current| {
            let previous = current.clone();
            work(current);
            previous
        })
    }
}

impl<T: ?Sized> Synchronized<T> {
    /// Runs `work` with shared access to the value and returns its result.
    #[inline]
    pub fn read<R, F>(&self, work: F) -> R
    where
        F: FnOnce(&T) -> R,
    {
        let _guard = self.lock.shared().acquire();
        // SAFETY: the shared slot excludes every writer.
        work(unsafe { &*self.value.get() })
    }

    /// Runs `work` with exclusive access to the value and returns its result.
    #[inline]
    pub fn write<R, F>(&self, work: F) -> R
    where
        F: FnOnce(&mut T) -> R,
    {
        let _guard = self.lock.exclusive().acquire();
        // SAFETY: the exclusive slot excludes every other access.
        work(unsafe { &mut *self.value.get() })
    }

    /// Like [`read`](Synchronized::read), without blocking.
    ///
    /// # Errors
    ///
    /// Returns [`TryLockError::WouldBlock`](crate::primitives::TryLockError::WouldBlock)
    /// while a writer holds the value; `work` is not run.
    pub fn try_read<R, F>(&self, work: F) -> TryLockResult<R>
    where
        F: FnOnce(&T) -> R,
    {
        let _guard = self.lock.shared().try_acquire()?;
        // SAFETY: the shared slot excludes every writer.
        Ok(work(unsafe { &*self.value.get() }))
    }

    /// Like [`write`](Synchronized::write), without blocking.
    ///
    /// # Errors
    ///
    /// Returns [`TryLockError::WouldBlock`](crate::primitives::TryLockError::WouldBlock)
    /// while any other thread holds the value; `work` is not run.
    pub fn try_write<R, F>(&self, work: F) -> TryLockResult<R>
    where
        F: FnOnce(&mut T) -> R,
    {
        let _guard = self.lock.exclusive().try_acquire()?;
        // SAFETY: the exclusive slot excludes every other access.
        Ok(work(unsafe { &mut *self.value.get() }))
    }

    /// Returns a copy of the member selected by `project`.
    pub fn get_field<U, P>(&self, project: P) -> U
    where
        U: Clone,
        P: FnOnce(&T) -> &U,
    {
        self.read(|value| project(value).clone())
    }

    /// Stores `field` into the member selected by `project` and returns the old member.
    pub fn set_field<U, P>(&self, project: P, field: U) -> U
    where
        P: FnOnce(&mut T) -> &mut U,
    {
        self.write(|value| core::mem::replace(project(value), field))
    }

    /// Runs `work` on the member selected by `project` under exclusive access.
    pub fn with_field_mut<U, R, P, F>(&self, project: P, work: F) -> R
    where
        U: ?Sized,
        P: FnOnce(&mut T) -> &mut U,
        F: FnOnce(&mut U) -> R,
    {
        self.write(|value| work(project(value)))
    }

    /// Blocks until `predicate` holds for the value.
    ///
    /// The predicate runs under shared access each time `condvar` wakes the
    /// caller. Writers must notify `condvar` after changing the value.
    ///
    /// # Panics
    ///
    /// Panics if `condvar` hands back a guard over some other lock.
    pub fn wait_until<C, F>(&self, condvar: &C, mut predicate: F)
    where
        C: ConditionVariable<SharedLock>,
        F: FnMut(&T) -> bool,
    {
        let mut guard = self.lock.shared().acquire();
        condvar.wait_until(&mut guard, |guard| predicate(self.shared_value(guard)));
    }

    /// Like [`wait_until`](Synchronized::wait_until), giving up after `timeout`.
    ///
    /// Returns the final value of the predicate.
    ///
    /// # Panics
    ///
    /// Panics if `condvar` hands back a guard over some other lock.
    pub fn wait_until_timeout<C, F>(&self, condvar: &C, timeout: Duration, mut predicate: F) -> bool
    where
        C: ConditionVariable<SharedLock>,
        F: FnMut(&T) -> bool,
    {
        let mut guard = self.lock.shared().acquire();
        condvar.wait_until_timeout(&mut guard, timeout, |guard| {
            predicate(self.shared_value(guard))
        })
    }

    /// Like [`wait_until`](Synchronized::wait_until), giving up at `deadline`.
    ///
    /// Returns the final value of the predicate.
    ///
    /// # Panics
    ///
    /// Panics if `condvar` hands back a guard over some other lock.
    pub fn wait_until_deadline<C, F>(&self, condvar: &C, deadline: Instant, mut predicate: F) -> bool
    where
        C: ConditionVariable<SharedLock>,
        F: FnMut(&T) -> bool,
    {
        let mut guard = self.lock.shared().acquire();
        condvar.wait_until_deadline(&mut guard, deadline, |guard| {
            predicate(self.shared_value(guard))
        })
    }

    /// Borrows the value on the strength of a shared guard over the internal lock.
    fn shared_value(&self, guard: &LockGuard<'_, SharedLock>) -> &T {
        assert!(
            core::ptr::eq(LockGuard::lockable(guard), self.lock.shared()),
            "condition variable returned a guard for a different lock"
        );
        // SAFETY: `guard` holds a shared slot of `self.lock`, which excludes every writer.
        unsafe { &*self.value.get() }
    }

    /// Returns a mutable reference to the value.
    ///
    /// The exclusive borrow statically guarantees no other access exists.
    #[inline]
    pub fn get_mut(&mut self) -> &mut T {
        self.value.get_mut()
    }
}

impl<T: Default> Default for Synchronized<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> From<T> for Synchronized<T> {
    fn from(value: T) -> Self {
        Self::new(value)
    }
}

impl<T: ?Sized + fmt::Debug> fmt::Debug for Synchronized<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut d = f.debug_struct("Synchronized");
        match self.try_read(|value| d.field("value", &value).finish_non_exhaustive()) {
            Ok(result) => result,
            Err(_) => d.field("value", &format_args!("<locked>")).finish_non_exhaustive(),
        }
    }
}
