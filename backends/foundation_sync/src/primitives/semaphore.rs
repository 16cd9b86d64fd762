//! A counting semaphore.

use core::fmt;
use core::time::Duration;

use crate::primitives::{CondVar, ConditionVariable, Lock};

/// A counting semaphore built from a [`Lock`] and a [`CondVar`].
///
/// The count never goes below zero: [`Semaphore::wait`] blocks while it is
/// zero. Permits are not tied to threads, so any thread may
/// [`signal`](Semaphore::signal).
///
/// # Examples
///
/// ```
/// use foundation_sync::Semaphore;
///
/// let semaphore = Semaphore::new(2);
///
/// let first = semaphore.permit();
/// let second = semaphore.permit();
/// assert!(!semaphore.try_wait());
///
/// drop(first);
/// assert_eq!(semaphore.available_permits(), 1);
/// # drop(second);
/// ```
pub struct Semaphore {
    count: Lock<usize>,
    condvar: CondVar,
}

impl Semaphore {
    /// Creates a semaphore holding `permits` permits.
    #[must_use]
    pub fn new(permits: usize) -> Self {
        Self {
            count: Lock::new(permits),
            condvar: CondVar::new(),
        }
    }

    /// Takes a permit, blocking while none is available.
    pub fn wait(&self) {
        let mut count = self.count.acquire();
        self.condvar.wait_until(&mut count, |count| **count > 0);
        *count -= 1;
    }

    /// Takes a permit if one is available right now.
    #[must_use]
    pub fn try_wait(&self) -> bool {
        let mut count = self.count.acquire();
        if *count == 0 {
            return false;
        }
        *count -= 1;
        true
    }

    /// Like [`Semaphore::wait`], giving up after `timeout`.
    ///
    /// Returns `false`, without taking a permit, if the time ran out.
    #[must_use]
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let mut count = self.count.acquire();
        if !self
            .condvar
            .wait_until_timeout(&mut count, timeout, |count| **count > 0)
        {
            tracing::trace!(?timeout, "semaphore wait timed out");
            return false;
        }
        *count -= 1;
        true
    }

    /// Returns a permit and wakes one waiter.
    pub fn signal(&self) {
        let mut count = self.count.acquire();
        *count += 1;
        self.condvar.notify_one();
    }

    /// Takes a permit that is returned when the [`SemaphorePermit`] drops.
    pub fn permit(&self) -> SemaphorePermit<'_> {
        self.wait();
        SemaphorePermit { semaphore: self }
    }

    /// Runs `work` while holding a permit and returns its result.
    ///
    /// The permit is returned on every exit path.
    pub fn acquire<R, F>(&self, work: F) -> R
    where
        F: FnOnce() -> R,
    {
        let _permit = self.permit();
        work()
    }

    /// Returns the number of permits currently available.
    pub fn available_permits(&self) -> usize {
        *self.count.acquire()
    }
}

impl fmt::Debug for Semaphore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Semaphore")
            .field("permits", &self.available_permits())
            .finish_non_exhaustive()
    }
}

/// A permit taken from a [`Semaphore`], returned on drop.
#[must_use = "if unused the permit is returned immediately"]
pub struct SemaphorePermit<'a> {
    semaphore: &'a Semaphore,
}

impl Drop for SemaphorePermit<'_> {
    fn drop(&mut self) {
        self.semaphore.signal();
    }
}

impl fmt::Debug for SemaphorePermit<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SemaphorePermit").finish_non_exhaustive()
    }
}
