//! `InputProcessor`: the external collaborator contract the engine drives
//! (spec §6.1). Concrete processors (web fetch, API query, filesystem
//! read, media download, ...) live outside this crate.

use async_trait::async_trait;

use crate::error::ProcessError;
use crate::model::{CrawlingContext, CrawlingInput, Output};
use crate::throttle::ProcessorId;

/// Implemented by every concrete input processor. Stored as
/// `Arc<dyn InputProcessor>` inside a session's processor set, so the
/// trait must be object-safe; `async-trait` provides that.
#[async_trait]
pub trait InputProcessor: Send + Sync {
    /// Stable identity, recommended unique per instance.
    fn source(&self) -> crate::model::Source;

    /// Processor identity used for both the deduplication guard and the
    /// throttler: the concrete implementation type. Implementors should
    /// return `std::any::TypeId::of::<Self>()`; the call happens inside a
    /// non-generic context so it resolves to the concrete type even
    /// though the trait is used as `dyn InputProcessor`.
    fn processor_id(&self) -> ProcessorId;

    /// Must not panic across an unwind boundary the session can't catch;
    /// may perform I/O and may take long. Receives a read-only context
    /// view. The session has already claimed this (processor, input) pair
    /// in its guard before calling this, so a `false` result here still
    /// leaves the pair consumed for the rest of the session rather than
    /// eligible for a retry.
    async fn can_process(&self, input: &CrawlingInput, context: &CrawlingContext) -> bool;

    /// On success, the session commits the output and, depth permitting,
    /// re-feeds crawlable values. On failure the session logs and emits
    /// nothing. Either outcome leaves the guard's claim on this pair in
    /// place — it was taken before this call was ever reached.
    async fn process(
        &self,
        input: &CrawlingInput,
        context: &CrawlingContext,
    ) -> Result<Output, ProcessError>;
}

/// Implements `processor_id` via `TypeId::of::<Self>()` for a concrete
/// processor type. Most processors should call this from their own
/// `processor_id` override rather than repeating the `TypeId` call.
#[macro_export]
macro_rules! processor_id_of {
    ($ty:ty) => {
        std::any::TypeId::of::<$ty>()
    };
}
