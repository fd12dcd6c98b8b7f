//! Entity services: the only place business rules live.
//!
//! Every service pairs a repository with an [`EntityCache`] and follows the
//! same ordering on writes: the per-entity key is dropped *before* the store
//! mutation, the collection key is rebuilt from the store *after* it.
//!
//! Cache failures on the read path are logged and treated as a miss. Cache
//! failures while invalidating or refreshing after a write are returned to the
//! caller.
//!
//! There is no locking across requests. Two concurrent writers to the same
//! collection each rebuild the collection key from whatever the store holds
//! at that moment, so the last refresh wins. A refresh that read the store
//! before the other writer committed can leave the collection key one write
//! behind until the next mutation or TTL expiry.

mod director;
mod movie;

use std::{future::Future, sync::Arc};

use serde::{Serialize, de::DeserializeOwned};
use tracing::{debug, warn};

pub use director::DirectorService;
pub use movie::MovieService;

use crate::{
    cache::{Cache, CacheKeys},
    error::AppResult,
};

#[derive(Clone)]
pub struct EntityCache {
    cache: Arc<dyn Cache>,
    keys: CacheKeys,
    ttl_seconds: u64,
}

impl EntityCache {
    pub fn new(cache: Arc<dyn Cache>, keys: CacheKeys, ttl_seconds: u64) -> Self {
        Self { cache, keys, ttl_seconds }
    }

    pub async fn read_entity<T: DeserializeOwned>(&self, id: &str) -> Option<T> {
        self.read(&self.keys.entity(id)).await
    }

    pub async fn read_collection<T: DeserializeOwned>(&self) -> Option<Vec<T>> {
        self.read(&self.keys.collection()).await
    }

    pub async fn populate_entity<T: Serialize>(&self, id: &str, value: &T) {
        self.populate(&self.keys.entity(id), value).await;
    }

    pub async fn populate_collection<T: Serialize>(&self, values: &[T]) {
        self.populate(&self.keys.collection(), values).await;
    }

    pub async fn invalidate_entity(&self, id: &str) -> AppResult<()> {
        let key = self.keys.entity(id);
        debug!(key = %key, "invalidating cache entry");
        self.cache.del(&key).await
    }

    /// Drops the collection key and the entity pattern, then stores a fresh
    /// snapshot produced by `load`. `load` is not polled until the old
    /// entries are gone.
    pub async fn refresh_collection<T, F>(&self, load: F) -> AppResult<()>
    where
        T: Serialize,
        F: Future<Output = AppResult<Vec<T>>>,
    {
        let key = self.keys.collection();
        self.cache.del(&key).await?;
        self.cache.del_by_pattern(&self.keys.pattern()).await?;

        let fresh = load.await?;
        debug!(key = %key, count = fresh.len(), "refreshing collection cache");
        let payload = serde_json::to_string(&fresh)?;
        self.cache.set(&key, payload, self.ttl_seconds).await
    }

    async fn read<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.cache.get(key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!(key = %key, "cache miss");
                return None;
            },
            Err(err) => {
                warn!(key = %key, error = %err, "cache read failed, falling back to store");
                return None;
            },
        };

        match serde_json::from_str(&raw) {
            Ok(value) => {
                debug!(key = %key, "cache hit");
                Some(value)
            },
            Err(err) => {
                warn!(key = %key, error = %err, "discarding undecodable cache entry");
                None
            },
        }
    }

    async fn populate<T: Serialize + ?Sized>(&self, key: &str, value: &T) {
        let payload = match serde_json::to_string(value) {
            Ok(payload) => payload,
            Err(err) => {
                warn!(key = %key, error = %err, "failed to serialize cache entry");
                return;
            },
        };
        if let Err(err) = self.cache.set(key, payload, self.ttl_seconds).await {
            warn!(key = %key, error = %err, "failed to populate cache");
        }
    }
}
