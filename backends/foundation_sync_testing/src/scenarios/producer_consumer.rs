//! Bounded producer-consumer queue.

use std::collections::VecDeque;
use std::sync::Arc;

use foundation_sync::{AnyCondVar, SharedLock, Synchronized};

/// A bounded FIFO queue shared between producer and consumer threads.
///
/// Waiting happens under the shared view of the queue's lock, so waiting
/// threads never block each other; the actual push or pop re-checks the state
/// in an exclusive section and waits again if another thread got there first.
///
/// # Examples
///
/// ```
/// use foundation_sync_testing::scenarios::BoundedQueue;
/// use std::thread;
///
/// let queue = BoundedQueue::new(2);
///
/// let producer = {
///     let queue = queue.clone();
///     thread::spawn(move || {
///         for i in 0..5 {
///             queue.push(i);
///         }
///     })
/// };
///
/// let received: Vec<_> = (0..5).map(|_| queue.pop()).collect();
/// producer.join().unwrap();
///
/// assert_eq!(received, vec![0, 1, 2, 3, 4]);
/// ```
pub struct BoundedQueue<T> {
    inner: Arc<Inner<T>>,
}

struct Inner<T> {
    items: Synchronized<VecDeque<T>>,
    changed: AnyCondVar<SharedLock>,
    capacity: usize,
}

impl<T> BoundedQueue<T> {
    /// Creates a queue holding at most `capacity` items.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is 0.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "BoundedQueue capacity must be > 0");

        Self {
            inner: Arc::new(Inner {
                items: Synchronized::new(VecDeque::with_capacity(capacity)),
                changed: AnyCondVar::new(),
                capacity,
            }),
        }
    }

    /// Appends `item`, blocking while the queue is full.
    pub fn push(&self, item: T) {
        let capacity = self.inner.capacity;
        let mut pending = Some(item);

        while let Some(item) = pending.take() {
            self.inner
                .items
                .wait_until(&self.inner.changed, |items| items.len() < capacity);

            pending = self.inner.items.write(|items| {
                if items.len() < capacity {
                    items.push_back(item);
                    None
                } else {
                    Some(item)
                }
            });
        }

        self.inner.changed.notify_all();
    }

    /// Removes the oldest item, blocking while the queue is empty.
    pub fn pop(&self) -> T {
        loop {
            self.inner
                .items
                .wait_until(&self.inner.changed, |items| !items.is_empty());

            if let Some(item) = self.inner.items.write(VecDeque::pop_front) {
                self.inner.changed.notify_all();
                return item;
            }
            tracing::trace!("queue drained by another consumer, waiting again");
        }
    }

    /// Returns the number of queued items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.items.read(VecDeque::len)
    }

    /// Returns `true` if nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the capacity of the queue.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }
}

impl<T> Clone for BoundedQueue<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}
