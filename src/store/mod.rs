//! `CrawlingResultStore`: the external collaborator that persists finished
//! `CrawlingResult`s (spec §4.5, §6.2).

mod json_file;
mod memory;

pub use json_file::JsonFileResultStore;
pub use memory::InMemoryResultStore;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::model::CrawlingResult;

/// Contract consumed by the core. `save` may fail; such failure surfaces
/// as session failure (spec §7).
#[async_trait]
pub trait CrawlingResultStore: Send + Sync {
    async fn save(&self, result: CrawlingResult) -> Result<String, StoreError>;

    async fn get_by_id(&self, id: &str) -> Result<Option<CrawlingResult>, StoreError>;

    async fn get_all(&self) -> Result<Vec<CrawlingResult>, StoreError>;

    async fn delete_by_id(&self, id: &str) -> Result<(), StoreError>;

    async fn delete_all(&self) -> Result<(), StoreError>;
}
