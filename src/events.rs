//! Lifecycle events emitted by sessions and, translated, by the dispatcher.
//!
//! Represented as tagged variants per the design notes (spec §9): "avoid
//! open-ended inheritance."

use std::time::Duration;

use crate::error::SessionError;

/// Events a `Session` emits to its listener (normally only the owning
/// dispatcher).
#[derive(Debug, Clone)]
pub enum SessionEvent {
    Started {
        session_id: String,
        initial_inputs: Vec<String>,
    },
    Finished {
        session_id: String,
        initial_inputs: Vec<String>,
        result_id: String,
        duration: Duration,
    },
    Failed {
        session_id: String,
        initial_inputs: Vec<String>,
        error: SessionError,
        duration: Duration,
    },
}

/// Client-visible events published by the `Dispatcher` (spec §6.4).
/// `SessionStarted` is intentionally not surfaced here: clients observe
/// only terminal outcomes.
#[derive(Debug, Clone)]
pub enum DispatcherEvent {
    CrawlingFinished {
        initial_inputs: Vec<String>,
        crawling_result_id: String,
        crawling_duration: Duration,
    },
    CrawlingFailed {
        initial_inputs: Vec<String>,
        error: SessionError,
        crawling_duration: Duration,
    },
}

/// Callback sink for `DispatcherEvent`s. Invoked synchronously on whichever
/// task delivers the event; callers must not block inside it (spec §6.4).
pub type EventListener = std::sync::Arc<dyn Fn(DispatcherEvent) + Send + Sync>;

/// Callback sink for `SessionEvent`s.
pub type SessionEventListener = std::sync::Arc<dyn Fn(SessionEvent) + Send + Sync>;
