//! Processor-invocation guard: per-session memoization preventing repeat
//! work on the same (processor, raw input) pair (spec §1, §4.3.1, §8).

use std::collections::HashSet;

use parking_lot::Mutex;

use crate::throttle::ProcessorId;

/// Key is `(processor identity, raw input)` — two distinct processors may
/// independently process the same raw input.
#[derive(Default)]
pub struct ProcessorGuard {
    seen: Mutex<HashSet<(ProcessorId, String)>>,
}

impl ProcessorGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically checks and claims `(processor, raw_input)` in one lock
    /// acquisition. Returns `true` only to the caller that actually
    /// inserted the pair — the sole gate callers must use before
    /// attempting a processor invocation, so that two concurrent
    /// first-discoveries of the same pair can't both proceed.
    pub fn try_claim(&self, processor: ProcessorId, raw_input: &str) -> bool {
        self.seen.lock().insert((processor, raw_input.to_string()))
    }
}
