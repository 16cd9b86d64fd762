//! Reusable barrier using `Lock` and `CondVar`.

use foundation_sync::{CondVar, ConditionVariable, Lock};

/// A barrier that blocks threads until a fixed number of them have arrived.
///
/// The barrier resets itself after each release, so the same instance can be
/// used for any number of rounds.
///
/// # Examples
///
/// ```
/// use foundation_sync_testing::scenarios::Barrier;
/// use std::sync::Arc;
/// use std::thread;
///
/// let barrier = Arc::new(Barrier::new(3));
///
/// let handles: Vec<_> = (0..3)
///     .map(|_| {
///         let barrier = Arc::clone(&barrier);
///         thread::spawn(move || barrier.wait())
///     })
///     .collect();
///
/// let leaders = handles
///     .into_iter()
///     .map(|handle| handle.join().unwrap())
///     .filter(|leader| *leader)
///     .count();
/// assert_eq!(leaders, 1);
/// ```
pub struct Barrier {
    state: Lock<BarrierState>,
    condvar: CondVar,
    parties: usize,
}

struct BarrierState {
    arrived: usize,
    generation: u64,
}

impl Barrier {
    /// Creates a barrier for `parties` threads.
    ///
    /// # Panics
    ///
    /// Panics if `parties` is 0.
    #[must_use]
    pub fn new(parties: usize) -> Self {
        assert!(parties > 0, "Barrier parties must be > 0");

        Self {
            state: Lock::new(BarrierState {
                arrived: 0,
                generation: 0,
            }),
            condvar: CondVar::new(),
            parties,
        }
    }

    /// Blocks until all parties have called `wait` in this round.
    ///
    /// Returns `true` for exactly one thread per round, the last to arrive.
    pub fn wait(&self) -> bool {
        let mut state = self.state.acquire();
        let generation = state.generation;
        state.arrived += 1;

        if state.arrived == self.parties {
            state.arrived = 0;
            state.generation = state.generation.wrapping_add(1);
            drop(state);
            self.condvar.notify_all();
            return true;
        }

        self.condvar
            .wait_until(&mut state, |state| state.generation != generation);
        false
    }
}
