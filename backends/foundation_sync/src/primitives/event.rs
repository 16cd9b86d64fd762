//! A flag threads can wait on.
//!
//! [`Event`] supports two signal modes:
//!
//! - `signal(false)` sets the flag: current waiters and every later `wait` pass
//!   until [`Event::reset`] clears it.
//! - `signal(true)` pulses: every thread already waiting is released and the flag
//!   stays cleared, so a `wait` that starts afterwards blocks.
//!
//! Waiters snapshot a generation counter when they start waiting. A pulse bumps
//! the generation under the lock, so exactly the threads that were waiting at
//! that moment see a different generation and leave, however quickly a new
//! waiter arrives.

use core::fmt;
use core::time::Duration;

use crate::primitives::{CondVar, ConditionVariable, Lock};

#[derive(Debug, Default)]
struct EventState {
    signaled: bool,
    generation: u64,
}

/// A manual or pulsed event.
///
/// # Examples
///
/// ```
/// use foundation_sync::Event;
/// use std::sync::Arc;
/// use std::thread;
///
/// let event = Arc::new(Event::new());
///
/// let waiter = {
///     let event = Arc::clone(&event);
///     thread::spawn(move || event.wait())
/// };
///
/// event.signal(false);
/// waiter.join().unwrap();
/// assert!(event.is_signaled());
/// ```
pub struct Event {
    state: Lock<EventState>,
    condvar: CondVar,
}

impl Event {
    /// Creates a cleared event.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Lock::new(EventState::default()),
            condvar: CondVar::new(),
        }
    }

    /// Wakes every waiting thread.
    ///
    /// With `reset` the flag is left cleared and only threads already waiting
    /// are released; without it the flag stays set until [`Event::reset`].
    pub fn signal(&self, reset: bool) {
        let mut state = self.state.acquire();
        if reset {
            state.signaled = false;
            state.generation = state.generation.wrapping_add(1);
        } else {
            state.signaled = true;
        }
        tracing::trace!(reset, generation = state.generation, "event signaled");
        self.condvar.notify_all();
    }

    /// Blocks until the event is set or pulsed.
    pub fn wait(&self) {
        let mut state = self.state.acquire();
        let generation = state.generation;
        self.condvar.wait_until(&mut state, |state| {
            state.signaled || state.generation != generation
        });
    }

    /// Like [`Event::wait`], giving up after `timeout`.
    ///
    /// Returns `false` if the time ran out before the event was set or pulsed.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let mut state = self.state.acquire();
        let generation = state.generation;
        self.condvar.wait_until_timeout(&mut state, timeout, |state| {
            state.signaled || state.generation != generation
        })
    }

    /// Clears the flag.
    pub fn reset(&self) {
        self.state.acquire().signaled = false;
    }

    /// Returns `true` if the flag is set.
    pub fn is_signaled(&self) -> bool {
        self.state.acquire().signaled
    }
}

impl Default for Event {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("signaled", &self.is_signaled())
            .finish_non_exhaustive()
    }
}
