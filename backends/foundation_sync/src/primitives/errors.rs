//! Error types for the non-blocking acquisition paths.
//!
//! Blocking acquisition never fails and timed waits report timeouts through
//! [`WaitTimeoutResult`](crate::primitives::WaitTimeoutResult) or a `bool`, so the
//! only error this crate produces is "the lock was busy".

/// A type alias for the result of a `try_*` acquisition.
pub type TryLockResult<T> = Result<T, TryLockError>;

/// An enumeration of possible errors from the `try_*` acquisition methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum TryLockError {
    /// The lock could not be acquired because another thread is holding it.
    #[display("try_lock failed because the lock was already held")]
    WouldBlock,
}

impl TryLockError {
    /// Returns `true` if the acquisition failed because the lock was busy.
    #[must_use]
    pub fn is_would_block(&self) -> bool {
        matches!(self, TryLockError::WouldBlock)
    }
}
