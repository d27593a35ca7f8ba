//! Session: a long-running task that drives one traversal for one
//! submission (spec §4.3).

mod traversal;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::RwLock;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::error::CrawlEngineError;
use crate::events::{SessionEvent, SessionEventListener};
use crate::frontier::TraversalAlgorithm;
use crate::processor::InputProcessor;
use crate::store::CrawlingResultStore;
use crate::throttle::{NoOpThrottler, Throttler};

/// Immutable configuration for one session, validated at construction.
pub struct SessionConfig {
    pub initial_inputs: Vec<String>,
    pub batch_size: usize,
    pub processors: Vec<Arc<dyn InputProcessor>>,
    pub store: Arc<dyn CrawlingResultStore>,
    pub throttler: Arc<dyn Throttler>,
    pub traversal_algorithm: TraversalAlgorithm,
    pub max_crawl_depth: u32,
}

/// Sentinel expressing "no depth limit," per spec §4.3.
pub const NO_DEPTH_LIMIT: u32 = u32::MAX;

impl SessionConfig {
    pub fn new(
        initial_inputs: Vec<String>,
        processors: Vec<Arc<dyn InputProcessor>>,
        store: Arc<dyn CrawlingResultStore>,
    ) -> Result<Self, CrawlEngineError> {
        Self {
            initial_inputs,
            batch_size: 10,
            processors,
            store,
            throttler: Arc::new(NoOpThrottler),
            traversal_algorithm: TraversalAlgorithm::Bfs,
            max_crawl_depth: NO_DEPTH_LIMIT,
        }
        .validate()
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
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

    pub fn with_max_crawl_depth(mut self, max_crawl_depth: u32) -> Self {
        self.max_crawl_depth = max_crawl_depth;
        self
    }

    fn validate(self) -> Result<Self, CrawlEngineError> {
        if self.initial_inputs.is_empty() {
            return Err(CrawlEngineError::config("initial inputs must not be empty"));
        }
        if self.processors.is_empty() {
            return Err(CrawlEngineError::config("processor set must not be empty"));
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

/// A bounded-lifetime task executing one traversal for one submission.
pub struct Session {
    id: String,
    config: Arc<SessionConfig>,
    listener: RwLock<Option<SessionEventListener>>,
    handle: RwLock<Option<JoinHandle<()>>>,
    destroyed: AtomicBool,
}

impl Session {
    pub fn new(config: SessionConfig) -> Arc<Self> {
        Arc::new(Self {
            id: Uuid::new_v4().to_string(),
            config: Arc::new(config),
            listener: RwLock::new(None),
            handle: RwLock::new(None),
            destroyed: AtomicBool::new(false),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn set_event_listener(&self, listener: SessionEventListener) {
        *self.listener.write() = Some(listener);
    }

    fn emit(&self, event: SessionEvent) {
        if self.destroyed.load(Ordering::Acquire) {
            return;
        }
        if let Some(listener) = self.listener.read().as_ref() {
            listener(event);
        }
    }

    /// Starts the background traversal task. Non-blocking; emits
    /// `SessionEvent::Started` before traversal work begins.
    pub fn init(self: &Arc<Self>) {
        let this = Arc::clone(self);
        this.emit(SessionEvent::Started {
            session_id: this.id.clone(),
            initial_inputs: this.config.initial_inputs.clone(),
        });

        let handle = tokio::spawn(async move {
            traversal::run(&this).await;
        });
        *self.handle.write() = Some(handle);
    }

    /// Cancels the traversal task cooperatively and releases resources.
    /// Idempotent; after this call, no further events are delivered.
    pub fn destroy(&self) {
        if self.destroyed.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(handle) = self.handle.write().take() {
            handle.abort();
        }
    }

    pub async fn destroy_and_wait(&self, grace: Duration) {
        let handle = {
            if self.destroyed.swap(true, Ordering::AcqRel) {
                None
            } else {
                self.handle.write().take()
            }
        };
        if let Some(handle) = handle {
            handle.abort();
            let _ = tokio::time::timeout(grace, handle).await;
        }
    }

    fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::Acquire)
    }
}
