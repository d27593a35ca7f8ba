//! Dispatcher ("Crawler"): accepts submissions, bounds active sessions to a
//! configured parallelism, queues overflow, and forwards session events to
//! the client listener (spec §4.4).

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{info, warn};

use crate::error::CrawlEngineError;
use crate::events::{DispatcherEvent, EventListener, SessionEvent};
use crate::frontier::TraversalAlgorithm;
use crate::processor::InputProcessor;
use crate::session::{NO_DEPTH_LIMIT, Session, SessionConfig};
use crate::store::CrawlingResultStore;
use crate::throttle::{NoOpThrottler, Throttler};

/// Builds a `Session` from a set of normalized seeds. Boxed so tests can
/// substitute fakes without touching the dispatcher's own logic.
pub type SessionFactory = Arc<dyn Fn(Vec<String>) -> Result<Arc<Session>, CrawlEngineError> + Send + Sync>;

/// Immutable dispatcher configuration, validated at construction.
pub struct DispatcherConfig {
    pub processors: Vec<Arc<dyn InputProcessor>>,
    pub store: Arc<dyn CrawlingResultStore>,
    pub session_parallelism: usize,
    pub batch_size: usize,
    pub max_crawl_depth: u32,
    pub throttler: Arc<dyn Throttler>,
    pub traversal_algorithm: TraversalAlgorithm,
    pub event_listener: Option<EventListener>,
    pub session_factory: Option<SessionFactory>,
}

impl DispatcherConfig {
    pub fn new(processors: Vec<Arc<dyn InputProcessor>>, store: Arc<dyn CrawlingResultStore>) -> Self {
        Self {
            processors,
            store,
            session_parallelism: 10,
            batch_size: 10,
            max_crawl_depth: NO_DEPTH_LIMIT,
            throttler: Arc::new(NoOpThrottler),
            traversal_algorithm: TraversalAlgorithm::Bfs,
            event_listener: None,
            session_factory: None,
        }
    }

    pub fn with_session_parallelism(mut self, n: usize) -> Self {
        self.session_parallelism = n;
        self
    }

    pub fn with_batch_size(mut self, n: usize) -> Self {
        self.batch_size = n;
        self
    }

    pub fn with_max_crawl_depth(mut self, n: u32) -> Self {
        self.max_crawl_depth = n;
        self
    }

    pub fn with_throttler(mut self, throttler: Arc<dyn Throttler>) -> Self {
        self.throttler = throttler;
        self
    }

    pub fn with_traversal_algorithm(mut self, algorithm: TraversalAlgorithm) -> Self {
        self.traversal_algorithm = algorithm;
        self
    }

    pub fn with_event_listener(mut self, listener: EventListener) -> Self {
        self.event_listener = Some(listener);
        self
    }

    /// Overrides how sessions are built, for dependency injection in tests.
    pub fn with_session_factory(mut self, factory: SessionFactory) -> Self {
        self.session_factory = Some(factory);
        self
    }

    fn validate(self) -> Result<Self, CrawlEngineError> {
        if self.processors.is_empty() {
            return Err(CrawlEngineError::config("processor set must not be empty"));
        }
        if self.session_parallelism < 1 {
            return Err(CrawlEngineError::config("session parallelism must be >= 1"));
        }
        if self.batch_size < 1 {
            return Err(CrawlEngineError::config("batch size must be >= 1"));
        }
        if self.max_crawl_depth < 1 {
            return Err(CrawlEngineError::config("max_crawl_depth must be >= 1"));
        }
        Ok(self)
    }
}

struct PendingSubmission {
    seeds: Vec<String>,
}

struct DispatcherState {
    active: HashMap<String, Arc<Session>>,
    pending: VecDeque<PendingSubmission>,
    shut_down: bool,
}

/// Accepts submissions and runs sessions under a bounded parallelism,
/// exactly as described in spec §4.4's state machine: `queued -> running
/// -> finished | failed -> destroyed`.
pub struct Dispatcher {
    config: Arc<DispatcherConfig>,
    state: Mutex<DispatcherState>,
    self_ref: Mutex<Option<std::sync::Weak<Dispatcher>>>,
}

impl Dispatcher {
    pub fn new(config: DispatcherConfig) -> Result<Arc<Self>, CrawlEngineError> {
        let config = config.validate()?;
        let dispatcher = Arc::new(Self {
            config: Arc::new(config),
            state: Mutex::new(DispatcherState {
                active: HashMap::new(),
                pending: VecDeque::new(),
                shut_down: false,
            }),
            self_ref: Mutex::new(None),
        });
        *dispatcher.self_ref.lock() = Some(Arc::downgrade(&dispatcher));
        Ok(dispatcher)
    }

    /// Validates, normalizes, and deduplicates `seed` plus `extra_seeds`,
    /// then either starts a session immediately or enqueues a pending
    /// submission if `sessionParallelism` active sessions are already
    /// running. Fails with a usage error if the dispatcher has been shut
    /// down or no non-blank seed remains after trimming.
    pub fn submit(&self, seed: impl Into<String>, extra_seeds: Vec<String>) -> Result<(), CrawlEngineError> {
        let mut seeds = Vec::with_capacity(extra_seeds.len() + 1);
        seeds.push(seed.into());
        seeds.extend(extra_seeds);

        let mut normalized = Vec::new();
        for raw in seeds {
            let trimmed = raw.trim().to_string();
            if trimmed.is_empty() {
                return Err(CrawlEngineError::usage("submit: every seed must be non-blank"));
            }
            if !normalized.contains(&trimmed) {
                normalized.push(trimmed);
            }
        }

        let mut state = self.state.lock();
        if state.shut_down {
            return Err(CrawlEngineError::usage("submit: dispatcher has been shut down"));
        }

        if state.active.len() < self.config.session_parallelism {
            self.start_session(&mut state, normalized)?;
        } else {
            state.pending.push_back(PendingSubmission { seeds: normalized });
        }
        Ok(())
    }

    fn start_session(&self, state: &mut DispatcherState, seeds: Vec<String>) -> Result<(), CrawlEngineError> {
        let session = self.build_session(seeds)?;
        let session_id = session.id().to_string();

        let weak_self = self
            .self_ref
            .lock()
            .clone()
            .expect("self_ref set in Dispatcher::new before any submit can run");

        session.set_event_listener(Arc::new(move |event: SessionEvent| {
            if let Some(dispatcher) = weak_self.upgrade() {
                dispatcher.on_session_event(event);
            }
        }));

        session.init();
        state.active.insert(session_id, session);
        Ok(())
    }

    fn build_session(&self, seeds: Vec<String>) -> Result<Arc<Session>, CrawlEngineError> {
        if let Some(factory) = &self.config.session_factory {
            return factory(seeds);
        }
        let session_config = SessionConfig::new(seeds, self.config.processors.clone(), Arc::clone(&self.config.store))?
            .with_batch_size(self.config.batch_size)
            .with_throttler(Arc::clone(&self.config.throttler))
            .with_traversal_algorithm(self.config.traversal_algorithm)
            .with_max_crawl_depth(self.config.max_crawl_depth);
        Ok(Session::new(session_config))
    }

    /// Translates a terminal `SessionEvent` into the dispatcher's own
    /// client-facing event, destroys the finished session, and promotes
    /// the next pending submission — all under the dispatcher's lock, so
    /// `active <= sessionParallelism` always holds (spec §4.4).
    fn on_session_event(&self, event: SessionEvent) {
        match event {
            SessionEvent::Started { .. } => {}
            SessionEvent::Finished {
                session_id,
                initial_inputs,
                result_id,
                duration,
            } => {
                info!(%session_id, %result_id, "crawling finished");
                self.finish_session(&session_id);
                self.notify(DispatcherEvent::CrawlingFinished {
                    initial_inputs,
                    crawling_result_id: result_id,
                    crawling_duration: duration,
                });
            }
            SessionEvent::Failed {
                session_id,
                initial_inputs,
                error,
                duration,
            } => {
                warn!(%session_id, %error, "crawling failed");
                self.finish_session(&session_id);
                self.notify(DispatcherEvent::CrawlingFailed {
                    initial_inputs,
                    error,
                    crawling_duration: duration,
                });
            }
        }
    }

    fn finish_session(&self, session_id: &str) {
        let mut state = self.state.lock();
        if let Some(session) = state.active.remove(session_id) {
            session.destroy();
        }
        if let Some(next) = state.pending.pop_front() {
            if let Err(e) = self.start_session(&mut state, next.seeds) {
                warn!(error = %e, "failed to promote pending submission");
            }
        }
    }

    fn notify(&self, event: DispatcherEvent) {
        if let Some(listener) = &self.config.event_listener {
            listener(event);
        }
    }

    /// Idempotent: clears the pending queue, destroys every active
    /// session (snapshotting the id list first), and marks the
    /// dispatcher shut down. Sessions are aborted, not awaited; from an
    /// async context prefer `shutdown_async` if a grace period matters.
    pub fn shutdown(&self) {
        let sessions = {
            let mut state = self.state.lock();
            if state.shut_down {
                return;
            }
            state.shut_down = true;
            state.pending.clear();
            state.active.drain().map(|(_, session)| session).collect::<Vec<_>>()
        };
        for session in sessions {
            session.destroy();
        }
    }

    /// As `shutdown`, but when `grace` is set, awaits each destroyed
    /// session's task up to `grace` before returning (the Open Question
    /// in spec §9 resolved in favor of a bounded await; `None` keeps
    /// `shutdown`'s fire-and-forget behavior).
    pub async fn shutdown_async(&self, grace: Option<Duration>) {
        let sessions = {
            let mut state = self.state.lock();
            if state.shut_down {
                return;
            }
            state.shut_down = true;
            state.pending.clear();
            state.active.drain().map(|(_, session)| session).collect::<Vec<_>>()
        };

        match grace {
            None => {
                for session in sessions {
                    session.destroy();
                }
            }
            Some(grace) => {
                for session in sessions {
                    session.destroy_and_wait(grace).await;
                }
            }
        }
    }

    pub fn active_session_count(&self) -> usize {
        self.state.lock().active.len()
    }

    pub fn pending_count(&self) -> usize {
        self.state.lock().pending.len()
    }
}
