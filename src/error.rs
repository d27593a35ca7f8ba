//! Error taxonomy for the crawling engine.
//!
//! Per the error handling design: usage errors are raised synchronously to
//! callers, processor errors are absorbed and logged inside a session, and
//! only uncaught traversal/store errors escalate to session failure.

use thiserror::Error;

/// Errors surfaced synchronously from dispatcher/session construction and
/// submission APIs.
#[derive(Debug, Error, Clone)]
pub enum CrawlEngineError {
    /// Invalid argument or illegal-state usage error (e.g. blank seed,
    /// submission after shutdown, negative `removeBatch` count).
    #[error("usage error: {0}")]
    Usage(String),

    /// Configuration rejected at construction time (empty processor set,
    /// batch size < 1, `max_crawl_depth` < 1, session parallelism < 1).
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl CrawlEngineError {
    pub fn usage(msg: impl Into<String>) -> Self {
        Self::Usage(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

/// Error returned by `InputProcessor::process`. The engine never inspects
/// the contents beyond logging them; the processor owns its own error
/// taxonomy.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct ProcessError(pub String);

impl ProcessError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

impl From<anyhow::Error> for ProcessError {
    fn from(err: anyhow::Error) -> Self {
        Self(format!("{err:#}"))
    }
}

/// Error returned by a `CrawlingResultStore`. A failed `save` call
/// propagates as a `SessionFailed` event (spec §7: "Result-store errors:
/// treated as traversal errors").
#[derive(Debug, Error)]
#[error("{0}")]
pub struct StoreError(pub String);

impl StoreError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

impl From<anyhow::Error> for StoreError {
    fn from(err: anyhow::Error) -> Self {
        Self(format!("{err:#}"))
    }
}

/// The error carried by a failed session/traversal. Since the triggering
/// error may originate in a processor or a store the engine knows nothing
/// about, only its `Display` text is retained.
#[derive(Debug, Error, Clone)]
#[error("{0}")]
pub struct SessionError(pub String);

impl From<StoreError> for SessionError {
    fn from(err: StoreError) -> Self {
        Self(err.0)
    }
}

impl From<anyhow::Error> for SessionError {
    fn from(err: anyhow::Error) -> Self {
        Self(format!("{err:#}"))
    }
}
