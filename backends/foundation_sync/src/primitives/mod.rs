//! Platform-backed synchronization primitives.

// Public modules
pub mod any_condvar;
pub mod condvar;
pub mod countdown_latch;
pub mod errors;
pub mod event;
pub mod lock;
pub mod lockable;
pub mod rwlock;
pub mod semaphore;
pub mod synchronized;

// Re-export error types
pub use errors::{TryLockError, TryLockResult};

// Re-export lock types
pub use lock::Lock;
pub use lockable::{LockGuard, Lockable};
pub use rwlock::{ExclusiveLock, ReadWriteLock, SharedLock};

// Re-export condvar types
pub use any_condvar::AnyCondVar;
pub use condvar::{CondVar, ConditionVariable, WaitTimeoutResult};

// Re-export guarded values and utilities
pub use countdown_latch::CountdownLatch;
pub use event::Event;
pub use semaphore::{Semaphore, SemaphorePermit};
pub use synchronized::Synchronized;
