use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use starlift_utils::{Record, StarliftResult, TaskError};

use crate::connections::traits::ObjectStore;

/// In-memory object store keyed by location prefix. Used by tests and demos
/// in place of a real bucket.
#[derive(Default)]
pub struct MemoryObjectStore {
    partitions: RwLock<HashMap<String, Vec<Record>>>,
    descriptors: RwLock<HashMap<String, serde_json::Value>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a partition of records under a location key.
    pub fn put_partition(&self, location: impl Into<String>, rows: Vec<Record>) {
        self.partitions
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(location.into(), rows);
    }

    /// Store a descriptor document (e.g. a column map) under a location key.
    pub fn put_descriptor(&self, location: impl Into<String>, descriptor: serde_json::Value) {
        self.descriptors
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(location.into(), descriptor);
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn fetch_records(&self, location: &str) -> StarliftResult<Vec<Record>> {
        let partitions = self.partitions.read().unwrap_or_else(|e| e.into_inner());

        // Exact key first, then prefix scan so templated locations can select
        // a family of time-partitioned keys.
        if let Some(rows) = partitions.get(location) {
            return Ok(rows.clone());
        }

        let mut matches: Vec<(&String, &Vec<Record>)> = partitions
            .iter()
            .filter(|(key, _)| key.starts_with(location))
            .collect();
        if matches.is_empty() {
            return Err(TaskError::SourceUnavailable(format!(
                "no data under location `{location}`"
            )));
        }

        // Deterministic order regardless of map iteration.
        matches.sort_by_key(|(key, _)| key.as_str());
        Ok(matches
            .into_iter()
            .flat_map(|(_, rows)| rows.iter().cloned())
            .collect())
    }

    async fn fetch_descriptor(&self, location: &str) -> StarliftResult<serde_json::Value> {
        self.descriptors
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(location)
            .cloned()
            .ok_or_else(|| {
                TaskError::SourceUnavailable(format!("no descriptor at location `{location}`"))
            })
    }
}
