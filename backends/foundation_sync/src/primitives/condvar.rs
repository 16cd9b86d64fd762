//! Condition variable primitives for coordinating thread waits and notifications.
//!
//! This module provides:
//! - [`ConditionVariable`]: the contract shared by every condition variable in
//!   this crate, including the predicate-wait helpers
//! - [`CondVar`]: the platform condition variable, paired with [`Lock`]
//!
//! [`AnyCondVar`](crate::primitives::AnyCondVar) implements the same contract for
//! any [`Lockable`].
//!
//! # Examples
//!
//! ```
//! use foundation_sync::{CondVar, ConditionVariable, Lock};
//! use std::sync::Arc;
//! use std::thread;
//!
//! let state = Arc::new((Lock::new(false), CondVar::new()));
//!
//! let notifier = {
//!     let state = Arc::clone(&state);
//!     thread::spawn(move || {
//!         let (lock, condvar) = &*state;
//!         *lock.acquire() = true;
//!         condvar.notify_one();
//!     })
//! };
//!
//! let (lock, condvar) = &*state;
//! let mut ready = lock.acquire();
//! condvar.wait_until(&mut ready, |ready| **ready);
//! drop(ready);
//! notifier.join().unwrap();
//! ```

use core::fmt;
use core::time::Duration;
use std::time::{Instant, SystemTime};

use crate::primitives::{Lock, LockGuard, Lockable};

/// Result of a timed wait operation.
///
/// This type is returned by [`ConditionVariable::wait_timeout`] and related methods
/// to indicate whether the wait timed out or was woken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitTimeoutResult(bool);

impl WaitTimeoutResult {
    /// Returns `true` if the wait timed out.
    #[inline]
    #[must_use]
    pub const fn timed_out(&self) -> bool {
        self.0
    }

    #[inline]
    pub(crate) const fn new(timed_out: bool) -> Self {
        Self(timed_out)
    }
}

/// Operations shared by condition variables waiting with a lock of type `L`.
///
/// Every wait takes the caller's guard, which proves the lock is held. The lock
/// is released while the thread sleeps and held again when the wait returns,
/// whether the wake came from a notify, a timeout, or nowhere at all: waits may
/// wake spuriously, so callers re-check their condition (the `wait_until*`
/// helpers do that loop).
///
/// Notifications do not require holding the lock, but the state a waiter checks
/// must only be changed while holding it.
///
/// # Safety
///
/// Every wait must return, normally or by unwinding, with `*guard` guarding the
/// same lock it guarded on entry, held again by the current thread. Callers such
/// as [`Synchronized`](crate::primitives::Synchronized) read protected state
/// after a wait on the strength of that guard alone.
pub unsafe trait ConditionVariable<L: Lockable + ?Sized> {
    /// Releases the guarded lock, blocks until woken, then re-acquires it.
    fn wait(&self, guard: &mut LockGuard<'_, L>);

    /// Like [`wait`](ConditionVariable::wait), giving up after `timeout`.
    fn wait_timeout(&self, guard: &mut LockGuard<'_, L>, timeout: Duration) -> WaitTimeoutResult;

    /// Like [`wait`](ConditionVariable::wait), giving up at the monotonic `deadline`.
    fn wait_deadline(&self, guard: &mut LockGuard<'_, L>, deadline: Instant)
        -> WaitTimeoutResult;

    /// Wakes one waiting thread, if any.
    fn notify_one(&self);

    /// Wakes every waiting thread.
    fn notify_all(&self);

    /// Like [`wait`](ConditionVariable::wait), giving up at the wall-clock `deadline`.
    ///
    /// A deadline in the past still releases and re-acquires the lock once.
    fn wait_system_deadline(
        &self,
        guard: &mut LockGuard<'_, L>,
        deadline: SystemTime,
    ) -> WaitTimeoutResult {
        let remaining = deadline
            .duration_since(SystemTime::now())
            .unwrap_or_default();
        self.wait_timeout(guard, remaining)
    }

    /// Blocks until `condition` returns `true`.
    ///
    /// The condition is evaluated with the lock held, first before any wait.
    fn wait_until<'a, F>(&self, guard: &mut LockGuard<'a, L>, mut condition: F)
    where
        F: FnMut(&mut LockGuard<'a, L>) -> bool,
    {
        while !condition(guard) {
            self.wait(guard);
        }
    }

    /// Blocks until `condition` returns `true` or returns an error.
    ///
    /// # Errors
    ///
    /// Returns the first error produced by `condition`, with the lock held.
    fn try_wait_until<'a, E, F>(&self, guard: &mut LockGuard<'a, L>, mut condition: F) -> Result<(), E>
    where
        F: FnMut(&mut LockGuard<'a, L>) -> Result<bool, E>,
    {
        while !condition(guard)? {
            self.wait(guard);
        }
        Ok(())
    }

    /// Blocks until `condition` returns `true` or `timeout` elapses.
    ///
    /// Returns the final value of the condition: `false` means the time ran out
    /// with the condition still unmet, however many wakeups happened meanwhile.
    fn wait_until_timeout<'a, F>(
        &self,
        guard: &mut LockGuard<'a, L>,
        timeout: Duration,
        condition: F,
    ) -> bool
    where
        F: FnMut(&mut LockGuard<'a, L>) -> bool,
    {
        if let Some(deadline) = Instant::now().checked_add(timeout) {
            self.wait_until_deadline(guard, deadline, condition)
        } else {
            self.wait_until(guard, condition);
            true
        }
    }

    /// Blocks until `condition` returns `true` or the monotonic `deadline` passes.
    ///
    /// Returns the final value of the condition.
    fn wait_until_deadline<'a, F>(
        &self,
        guard: &mut LockGuard<'a, L>,
        deadline: Instant,
        mut condition: F,
    ) -> bool
    where
        F: FnMut(&mut LockGuard<'a, L>) -> bool,
    {
        while !condition(guard) {
            if self.wait_deadline(guard, deadline).timed_out() {
                return condition(guard);
            }
        }
        true
    }

    /// Blocks until `condition` returns `true` or the wall-clock `deadline` passes.
    ///
    /// The deadline is converted to a monotonic one once, on entry.
    fn wait_until_system_deadline<'a, F>(
        &self,
        guard: &mut LockGuard<'a, L>,
        deadline: SystemTime,
        condition: F,
    ) -> bool
    where
        F: FnMut(&mut LockGuard<'a, L>) -> bool,
    {
        let remaining = deadline
            .duration_since(SystemTime::now())
            .unwrap_or_default();
        self.wait_until_timeout(guard, remaining, condition)
    }
}

/// The platform condition variable.
///
/// `CondVar` waits with a [`Lock`]: the platform primitive releases the lock and
/// registers the waiter in one step, so a notify sent by a thread that changed
/// the state under the same lock cannot be missed. To wait with any other lock,
/// use [`AnyCondVar`](crate::primitives::AnyCondVar).
///
/// Waiting with two different locks at the same time is a usage error.
pub struct CondVar {
    inner: parking_lot::Condvar,
}

impl CondVar {
    /// Creates a new condition variable.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            inner: parking_lot::Condvar::new(),
        }
    }

    /// Releases the guarded lock, blocks until woken, then re-acquires it.
    #[inline]
    pub fn wait<T: ?Sized>(&self, guard: &mut LockGuard<'_, Lock<T>>) {
        let lock = LockGuard::lockable(guard);
        // SAFETY: `guard` proves this thread holds `lock`; the platform guard is
        // forgotten so ownership stays with `guard`.
        let mut raw = unsafe { lock.raw().make_guard_unchecked() };
        self.inner.wait(&mut raw);
        core::mem::forget(raw);
    }

    /// Like [`CondVar::wait`], giving up after `timeout`.
    #[inline]
    pub fn wait_timeout<T: ?Sized>(
        &self,
        guard: &mut LockGuard<'_, Lock<T>>,
        timeout: Duration,
    ) -> WaitTimeoutResult {
        let lock = LockGuard::lockable(guard);
        // SAFETY: see `CondVar::wait`.
        let mut raw = unsafe { lock.raw().make_guard_unchecked() };
        let result = self.inner.wait_for(&mut raw, timeout);
        core::mem::forget(raw);
        WaitTimeoutResult::new(result.timed_out())
    }

    /// Like [`CondVar::wait`], giving up at the monotonic `deadline`.
    #[inline]
    pub fn wait_deadline<T: ?Sized>(
        &self,
        guard: &mut LockGuard<'_, Lock<T>>,
        deadline: Instant,
    ) -> WaitTimeoutResult {
        let lock = LockGuard::lockable(guard);
        // SAFETY: see `CondVar::wait`.
        let mut raw = unsafe { lock.raw().make_guard_unchecked() };
        let result = self.inner.wait_until(&mut raw, deadline);
        core::mem::forget(raw);
        WaitTimeoutResult::new(result.timed_out())
    }

    /// Wakes one waiting thread, if any.
    #[inline]
    pub fn notify_one(&self) {
        self.inner.notify_one();
    }

    /// Wakes every waiting thread.
    #[inline]
    pub fn notify_all(&self) {
        self.inner.notify_all();
    }
}

// SAFETY: the platform condvar re-acquires the mutex behind `guard` before returning.
unsafe impl<T: ?Sized> ConditionVariable<Lock<T>> for CondVar {
    #[inline]
    fn wait(&self, guard: &mut LockGuard<'_, Lock<T>>) {
        CondVar::wait(self, guard);
    }

    #[inline]
    fn wait_timeout(
        &self,
        guard: &mut LockGuard<'_, Lock<T>>,
        timeout: Duration,
    ) -> WaitTimeoutResult {
        CondVar::wait_timeout(self, guard, timeout)
    }

    #[inline]
    fn wait_deadline(
        &self,
        guard: &mut LockGuard<'_, Lock<T>>,
        deadline: Instant,
    ) -> WaitTimeoutResult {
        CondVar::wait_deadline(self, guard, deadline)
    }

    #[inline]
    fn notify_one(&self) {
        CondVar::notify_one(self);
    }

    #[inline]
    fn notify_all(&self) {
        CondVar::notify_all(self);
    }
}

impl Default for CondVar {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CondVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CondVar").finish_non_exhaustive()
    }
}
