//! Throttler: enforces a minimum inter-invocation spacing per processor
//! identity.
//!
//! See spec §4.2. For each processor identity, a "next permitted start"
//! timestamp is held behind a lock touched only for the read-modify-write;
//! the actual sleep happens outside the lock so throughput isn't
//! serialized.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::time::Instant;

/// Identifies a processor for both throttling and the per-session
/// deduplication guard: the concrete implementation type.
pub type ProcessorId = TypeId;

#[async_trait::async_trait]
pub trait Throttler: Send + Sync {
    /// Cooperatively delays the caller so that `processor`'s effective
    /// start time is at least `last_scheduled_start + delay`. Never
    /// returns an error.
    async fn throttle(&self, processor: ProcessorId);
}

/// Shared "next permitted start" book-keeping, reused by every fixed-delay
/// variant below.
struct NextStartTable {
    next_start: DashMap<ProcessorId, Mutex<Instant>>,
}

impl NextStartTable {
    fn new() -> Self {
        Self {
            next_start: DashMap::new(),
        }
    }

    /// Computes and records the wait for `processor`, given its `delay`.
    /// The entry lock is held only for this arithmetic; the caller sleeps
    /// after it's released. The first call for a fresh processor identity
    /// never waits; each subsequent call is spaced `delay` after the
    /// previous one's effective start.
    fn reserve(&self, processor: ProcessorId, delay: Duration) -> Duration {
        let now = Instant::now();
        let entry = self
            .next_start
            .entry(processor)
            .or_insert_with(|| Mutex::new(now));
        let mut next_start = entry.lock();
        let prev = now.max(*next_start);
        *next_start = prev + delay;
        prev.saturating_duration_since(now)
    }
}

/// Zero-delay throttler: returns immediately.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpThrottler;

#[async_trait::async_trait]
impl Throttler for NoOpThrottler {
    async fn throttle(&self, _processor: ProcessorId) {}
}

/// One global delay applied to every processor identity (per-identity
/// book-keeping is still used, so distinct processors don't contend with
/// each other's schedule).
pub struct FixedDelayThrottler {
    table: NextStartTable,
    delay: Duration,
}

impl FixedDelayThrottler {
    pub fn new(delay: Duration) -> Self {
        Self {
            table: NextStartTable::new(),
            delay,
        }
    }
}

#[async_trait::async_trait]
impl Throttler for FixedDelayThrottler {
    async fn throttle(&self, processor: ProcessorId) {
        let wait = self.table.reserve(processor, self.delay);
        if !wait.is_zero() {
            tokio::time::sleep(wait).await;
        }
    }
}

/// Per-processor configurable delay, with a fallback throttler for
/// processors not explicitly mapped.
pub struct PerProcessorThrottler {
    table: NextStartTable,
    delays: HashMap<ProcessorId, Duration>,
    fallback: Arc<dyn Throttler>,
}

impl PerProcessorThrottler {
    pub fn new(delays: HashMap<ProcessorId, Duration>) -> Self {
        Self::with_fallback(delays, Arc::new(NoOpThrottler))
    }

    pub fn with_fallback(delays: HashMap<ProcessorId, Duration>, fallback: Arc<dyn Throttler>) -> Self {
        Self {
            table: NextStartTable::new(),
            delays,
            fallback,
        }
    }
}

#[async_trait::async_trait]
impl Throttler for PerProcessorThrottler {
    async fn throttle(&self, processor: ProcessorId) {
        match self.delays.get(&processor) {
            Some(&delay) => {
                let wait = self.table.reserve(processor, delay);
                if !wait.is_zero() {
                    tokio::time::sleep(wait).await;
                }
            }
            None => self.fallback.throttle(processor).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ProcA;
    struct ProcB;

    #[tokio::test(start_paused = true)]
    async fn fixed_delay_spaces_successive_calls() {
        let throttler = FixedDelayThrottler::new(Duration::from_millis(250));
        let id = TypeId::of::<ProcA>();

        let start = Instant::now();
        throttler.throttle(id).await; // first call: no wait
        assert_eq!(Instant::now(), start);

        throttler.throttle(id).await; // second call: waits out the delay
        assert!(Instant::now() >= start + Duration::from_millis(250));

        throttler.throttle(id).await;
        assert!(Instant::now() >= start + Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn distinct_processors_do_not_contend() {
        let throttler = FixedDelayThrottler::new(Duration::from_millis(250));
        let a = TypeId::of::<ProcA>();
        let b = TypeId::of::<ProcB>();

        throttler.throttle(a).await;
        throttler.throttle(b).await;
        // b's schedule is independent of a's, so neither call after the
        // first for each identity should wait on the other's cadence.
        let start = Instant::now();
        throttler.throttle(b).await;
        assert!(Instant::now() >= start);
    }

    #[tokio::test]
    async fn noop_never_waits() {
        let throttler = NoOpThrottler;
        let start = Instant::now();
        throttler.throttle(TypeId::of::<ProcA>()).await;
        throttler.throttle(TypeId::of::<ProcA>()).await;
        assert!(Instant::now().duration_since(start) < Duration::from_millis(5));
    }
}
