use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::CrawlingResultStore;
use crate::error::StoreError;
use crate::model::CrawlingResult;

/// In-memory result store, primarily for tests and for embedding in
/// binaries that don't need persistence.
#[derive(Default)]
pub struct InMemoryResultStore {
    results: RwLock<HashMap<String, CrawlingResult>>,
}

impl InMemoryResultStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CrawlingResultStore for InMemoryResultStore {
    async fn save(&self, result: CrawlingResult) -> Result<String, StoreError> {
        let id = Uuid::new_v4().to_string();
        self.results.write().await.insert(id.clone(), result);
        Ok(id)
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<CrawlingResult>, StoreError> {
        Ok(self.results.read().await.get(id).cloned())
    }

    async fn get_all(&self) -> Result<Vec<CrawlingResult>, StoreError> {
        Ok(self.results.read().await.values().cloned().collect())
    }

    async fn delete_by_id(&self, id: &str) -> Result<(), StoreError> {
        self.results.write().await.remove(id);
        Ok(())
    }

    async fn delete_all(&self) -> Result<(), StoreError> {
        self.results.write().await.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn save_then_get_round_trips() {
        let store = InMemoryResultStore::new();
        let result = CrawlingResult::new(vec!["seed".into()], Default::default(), 0, 1);
        let id = store.save(result).await.unwrap();
        let fetched = store.get_by_id(&id).await.unwrap();
        assert!(fetched.is_some());
        assert_eq!(fetched.unwrap().initial_inputs, vec!["seed".to_string()]);
    }

    #[tokio::test]
    async fn delete_all_clears_store() {
        let store = InMemoryResultStore::new();
        store
            .save(CrawlingResult::new(vec![], Default::default(), 0, 1))
            .await
            .unwrap();
        store.delete_all().await.unwrap();
        assert!(store.get_all().await.unwrap().is_empty());
    }
}
