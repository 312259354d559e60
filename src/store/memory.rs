use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::KeyValueStore;
use crate::error::StoreError;

/// Process-local store. Used when no Redis URL is configured and in tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    maps: RwLock<HashMap<String, HashMap<String, Vec<u8>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of fields currently held in `map`.
    pub async fn len(&self, map: &str) -> usize {
        self.maps.read().await.get(map).map_or(0, HashMap::len)
    }

    pub async fn contains(&self, map: &str, field: &str) -> bool {
        self.maps
            .read()
            .await
            .get(map)
            .is_some_and(|fields| fields.contains_key(field))
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn hget(&self, map: &str, field: &str) -> Result<Vec<u8>, StoreError> {
        self.maps
            .read()
            .await
            .get(map)
            .and_then(|fields| fields.get(field))
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn hset(&self, map: &str, field: &str, value: Vec<u8>) -> Result<(), StoreError> {
        self.maps
            .write()
            .await
            .entry(map.to_string())
            .or_default()
            .insert(field.to_string(), value);
        Ok(())
    }

    async fn hdel(&self, map: &str, field: &str) -> Result<(), StoreError> {
        let mut maps = self.maps.write().await;
        if let Some(fields) = maps.get_mut(map) {
            fields.remove(field);
            if fields.is_empty() {
                maps.remove(map);
            }
        }
        Ok(())
    }

    async fn hget_all(&self, map: &str) -> Result<HashMap<String, Vec<u8>>, StoreError> {
        Ok(self.maps.read().await.get(map).cloned().unwrap_or_default())
    }
}
