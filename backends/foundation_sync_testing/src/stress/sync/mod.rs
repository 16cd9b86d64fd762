//! Stress runs for the `foundation_sync` primitives.

pub mod any_condvar;
pub mod synchronized;
pub mod utilities;

pub use any_condvar::{
    measure_any_condvar_handoff, run_any_condvar_relock_stress, run_lost_wakeup_stress,
};
pub use synchronized::{run_swap_stress, run_torn_read_stress};
pub use utilities::{run_countdown_latch_stress, run_event_pulse_stress, run_semaphore_stress};
