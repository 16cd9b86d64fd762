//! `Synchronized` stress runs.

use std::sync::Arc;

use foundation_sync::Synchronized;

use crate::stress::{StressConfig, StressHarness, StressResult};

/// Runs concurrent writers and readers over a pair that must stay balanced.
///
/// Even threads bump both halves of the pair in one `write`; odd threads read
/// the pair and fail the operation if the halves differ.
///
/// # Examples
///
/// ```
/// use foundation_sync_testing::stress::{sync::run_torn_read_stress, StressConfig};
///
/// let result = run_torn_read_stress(StressConfig::new().threads(4).iterations(500));
/// assert!(result.is_clean());
/// ```
#[must_use]
pub fn run_torn_read_stress(config: StressConfig) -> StressResult {
    let pair = Arc::new(Synchronized::new((0u64, 0u64)));

    StressHarness::new(config).run(move |thread_id, _iteration| {
        if thread_id % 2 == 0 {
            pair.write(|(left, right)| {
                *left += 1;
                std::hint::spin_loop();
                *right += 1;
            });
            true
        } else {
            pair.read(|(left, right)| left == right)
        }
    })
}

/// Runs concurrent swaps where every thread hands out unique tokens.
///
/// Each operation swaps in a fresh token and checks that the token it got back
/// was not handed out before. Duplicates would mean two swaps observed the same
/// prior value.
#[must_use]
pub fn run_swap_stress(config: StressConfig) -> StressResult {
    let iterations = config.get_iterations();
    let slot = Arc::new(Synchronized::new(usize::MAX));
    let returned = Arc::new(Synchronized::new(Vec::<usize>::new()));

    StressHarness::new(config).run(move |thread_id, iteration| {
        let token = thread_id * iterations + iteration;
        let previous = slot.swap(token);

        returned.write(|seen| {
            let fresh = !seen.contains(&previous);
            seen.push(previous);
            fresh
        })
    })
}
