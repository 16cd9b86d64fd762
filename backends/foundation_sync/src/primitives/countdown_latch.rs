//! A one-shot countdown latch.

use core::fmt;
use core::time::Duration;

use crate::primitives::{CondVar, ConditionVariable, Lock};

/// Releases waiters once it has been signalled a fixed number of times.
///
/// The count only goes down and stops at zero. Once it is zero the latch stays
/// open: every current and future [`wait`](CountdownLatch::wait) returns.
///
/// # Examples
///
/// ```
/// use foundation_sync::CountdownLatch;
/// use std::sync::Arc;
/// use std::thread;
///
/// let latch = Arc::new(CountdownLatch::new(3));
///
/// let workers: Vec<_> = (0..3)
///     .map(|_| {
///         let latch = Arc::clone(&latch);
///         thread::spawn(move || latch.signal())
///     })
///     .collect();
///
/// latch.wait();
/// assert_eq!(latch.count(), 0);
/// # for worker in workers { worker.join().unwrap(); }
/// ```
pub struct CountdownLatch {
    count: Lock<usize>,
    condvar: CondVar,
}

impl CountdownLatch {
    /// Creates a latch that opens after `count` signals.
    ///
    /// A latch created with zero is already open.
    #[must_use]
    pub fn new(count: usize) -> Self {
        Self {
            count: Lock::new(count),
            condvar: CondVar::new(),
        }
    }

    /// Counts down by one, opening the latch when the count reaches zero.
    ///
    /// Signalling an open latch has no effect.
    pub fn signal(&self) {
        let mut count = self.count.acquire();
        match *count {
            0 => tracing::warn!("countdown latch signalled after it was released"),
            1 => {
                *count = 0;
                tracing::trace!("countdown latch released");
                self.condvar.notify_all();
            }
            _ => *count -= 1,
        }
    }

    /// Blocks until the latch is open.
    pub fn wait(&self) {
        let mut count = self.count.acquire();
        self.condvar.wait_until(&mut count, |count| **count == 0);
    }

    /// Like [`CountdownLatch::wait`], giving up after `timeout`.
    ///
    /// Returns `false` if the latch was still closed when the time ran out.
    #[must_use]
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let mut count = self.count.acquire();
        self.condvar
            .wait_until_timeout(&mut count, timeout, |count| **count == 0)
    }

    /// Returns the number of signals still needed to open the latch.
    pub fn count(&self) -> usize {
        *self.count.acquire()
    }
}

impl fmt::Debug for CountdownLatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CountdownLatch")
            .field("count", &self.count())
            .finish_non_exhaustive()
    }
}
