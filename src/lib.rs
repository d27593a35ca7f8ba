//! Generic, extensible crawling engine: pluggable input processors driven
//! over a throttled, depth-bounded frontier traversal.
//!
//! The core loop is domain-agnostic — it knows nothing about HTTP, the
//! filesystem, or any other concrete resource. Concrete `InputProcessor`
//! implementations (web fetch, API query, filesystem walk, media
//! download, ...) are external collaborators supplied by the embedding
//! application.

pub mod dispatcher;
pub mod error;
pub mod events;
pub mod frontier;
pub mod guard;
pub mod model;
pub mod processor;
pub mod session;
pub mod store;
pub mod throttle;

pub use dispatcher::{Dispatcher, DispatcherConfig, SessionFactory};
pub use error::{CrawlEngineError, ProcessError, SessionError, StoreError};
pub use events::{DispatcherEvent, EventListener, SessionEvent, SessionEventListener};
pub use frontier::{BfsFrontier, DfsFrontier, Frontier, TraversalAlgorithm};
pub use guard::ProcessorGuard;
pub use model::{
    CrawlingContext, CrawlingInput, CrawlingResult, CrawlingResultJson, Output, OutputRecord, Source,
    StoredOutput, StoredRecord, ValueHolder,
};
pub use processor::InputProcessor;
pub use session::{NO_DEPTH_LIMIT, Session, SessionConfig};
pub use store::{CrawlingResultStore, InMemoryResultStore, JsonFileResultStore};
pub use throttle::{FixedDelayThrottler, NoOpThrottler, PerProcessorThrottler, ProcessorId, Throttler};
