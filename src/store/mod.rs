//! Hash-map key/value storage.
//!
//! Every piece of cached state lives in a named map (a Redis hash) under a
//! field. The backends only promise per-field atomicity.

use async_trait::async_trait;
use std::collections::HashMap;

use crate::error::StoreError;

mod memory;
mod redis;

pub use self::memory::MemoryStore;
pub use self::redis::RedisStore;

#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Returns `StoreError::NotFound` when the map or field is absent.
    async fn hget(&self, map: &str, field: &str) -> Result<Vec<u8>, StoreError>;

    async fn hset(&self, map: &str, field: &str, value: Vec<u8>) -> Result<(), StoreError>;

    async fn hdel(&self, map: &str, field: &str) -> Result<(), StoreError>;

    /// An absent map reads as empty.
    async fn hget_all(&self, map: &str) -> Result<HashMap<String, Vec<u8>>, StoreError>;
}
