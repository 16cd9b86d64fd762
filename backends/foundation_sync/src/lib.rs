//! Blocking synchronization primitives for the foundation crates.
//!
//! This crate provides:
//! - **Locks**: [`Lock`] (exclusive) and [`ReadWriteLock`] (shared/exclusive) with
//!   shared and exclusive capability views usable anywhere a [`Lockable`] is expected
//! - **Condition variables**: [`CondVar`] paired with [`Lock`], and [`AnyCondVar`]
//!   which works with any [`Lockable`] without losing wakeups
//! - **Guarded values**: [`Synchronized`] keeps a value behind a read/write lock so
//!   it can only be touched inside a locked scope
//! - **Utilities**: [`Event`], [`Semaphore`] and [`CountdownLatch`]
//!
//! # Examples
//!
//! ```rust
//! use foundation_sync::{AnyCondVar, SharedLock, Synchronized};
//! use std::sync::Arc;
//! use std::thread;
//!
//! let ready = Arc::new(Synchronized::new(false));
//! let condvar = Arc::new(AnyCondVar::<SharedLock>::new());
//!
//! let waiter = {
//!     let ready = Arc::clone(&ready);
//!     let condvar = Arc::clone(&condvar);
//!     thread::spawn(move || ready.wait_until(&*condvar, |ready| *ready))
//! };
//!
//! ready.set(true);
//! condvar.notify_all();
//! waiter.join().unwrap();
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod primitives;

pub use primitives::{
    AnyCondVar, CondVar, ConditionVariable, CountdownLatch, Event, ExclusiveLock, Lock,
    LockGuard, Lockable, ReadWriteLock, Semaphore, SemaphorePermit, SharedLock, Synchronized,
    TryLockError, TryLockResult, WaitTimeoutResult,
};
