use std::path::PathBuf;

use async_trait::async_trait;
use uuid::Uuid;

use super::CrawlingResultStore;
use crate::error::StoreError;
use crate::model::{CrawlingResult, CrawlingResultJson};

/// Reference file-based store: one JSON file per result under
/// `directory`, serialized in the shape documented in spec §6.2.
pub struct JsonFileResultStore {
    directory: PathBuf,
}

impl JsonFileResultStore {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    fn path_for(&self, id: &str) -> PathBuf {
        self.directory.join(format!("{id}.json"))
    }
}

#[async_trait]
impl CrawlingResultStore for JsonFileResultStore {
    async fn save(&self, result: CrawlingResult) -> Result<String, StoreError> {
        let id = Uuid::new_v4().to_string();
        let json = CrawlingResultJson::from(&result);

        let json_str = tokio::task::spawn_blocking(move || serde_json::to_string_pretty(&json))
            .await
            .map_err(|e| StoreError::new(format!("JSON serialization task panicked: {e}")))?
            .map_err(|e| StoreError::new(format!("failed to serialize result: {e}")))?;

        tokio::fs::create_dir_all(&self.directory)
            .await
            .map_err(|e| StoreError::new(format!("failed to create {:?}: {e}", self.directory)))?;

        let path = self.path_for(&id);
        tokio::fs::write(&path, json_str)
            .await
            .map_err(|e| StoreError::new(format!("failed to write {path:?}: {e}")))?;

        Ok(id)
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<CrawlingResult>, StoreError> {
        let path = self.path_for(id);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::new(format!("failed to read {path:?}: {e}"))),
        };
        let json: CrawlingResultJson = serde_json::from_slice(&bytes)
            .map_err(|e| StoreError::new(format!("failed to parse {path:?}: {e}")))?;
        Ok(Some(from_json(json)))
    }

    async fn get_all(&self) -> Result<Vec<CrawlingResult>, StoreError> {
        let mut entries = match tokio::fs::read_dir(&self.directory).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::new(format!("failed to list {:?}: {e}", self.directory))),
        };

        let mut results = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StoreError::new(format!("failed to iterate directory: {e}")))?
        {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let bytes = tokio::fs::read(&path)
                .await
                .map_err(|e| StoreError::new(format!("failed to read {path:?}: {e}")))?;
            let json: CrawlingResultJson = serde_json::from_slice(&bytes)
                .map_err(|e| StoreError::new(format!("failed to parse {path:?}: {e}")))?;
            results.push(from_json(json));
        }
        Ok(results)
    }

    async fn delete_by_id(&self, id: &str) -> Result<(), StoreError> {
        match tokio::fs::remove_file(self.path_for(id)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::new(format!("failed to delete {id}: {e}"))),
        }
    }

    async fn delete_all(&self) -> Result<(), StoreError> {
        match tokio::fs::remove_dir_all(&self.directory).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::new(format!("failed to clear {:?}: {e}", self.directory))),
        }
    }
}

fn from_json(json: CrawlingResultJson) -> CrawlingResult {
    use crate::model::{CrawlingContext, StoredOutput};

    let mut context = CrawlingContext::new();
    for output in json.outputs {
        context.commit(StoredOutput {
            source: output.source,
            started_by: output.started_by,
            input: output.input,
            data: output
                .data
                .into_iter()
                .map(|map| map.into_iter().collect())
                .collect(),
            timestamp_ms: output.timestamp,
        });
    }
    CrawlingResult::new(
        json.initial_inputs,
        context,
        json.crawling_start_time_ms,
        json.crawling_end_time_ms,
    )
}
