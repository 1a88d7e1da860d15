//! Cache doubles for testing code built on the WB client.

use crate::cache::{InMemoryCache, SharedCache};
use crate::errors::CacheError;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// A cache whose store is always unreachable.
#[derive(Debug, Default, Clone, Copy)]
pub struct FailingCache;

#[async_trait]
impl SharedCache for FailingCache {
    async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
        Err(CacheError::Unavailable("connection refused".into()))
    }

    async fn set(&self, _key: &str, _value: &str) -> Result<(), CacheError> {
        Err(CacheError::Unavailable("connection refused".into()))
    }

    async fn setex(&self, _key: &str, _ttl: Duration, _value: &str) -> Result<(), CacheError> {
        Err(CacheError::Unavailable("connection refused".into()))
    }

    async fn delete(&self, _key: &str) -> Result<(), CacheError> {
        Err(CacheError::Unavailable("connection refused".into()))
    }
}

/// A cache operation seen by [`RecordingCache`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheOp {
    /// `get(key)`.
    Get(String),
    /// `set(key, value)`.
    Set(String),
    /// `setex(key, ttl, value)`.
    SetEx(String, Duration),
    /// `delete(key)`.
    Delete(String),
}

/// An in-memory cache that records every operation.
#[derive(Debug, Default, Clone)]
pub struct RecordingCache {
    inner: Arc<InMemoryCache>,
    ops: Arc<Mutex<Vec<CacheOp>>>,
}

impl RecordingCache {
    /// Creates an empty recording cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Operations seen so far.
    pub fn operations(&self) -> Vec<CacheOp> {
        self.ops.lock().map(|ops| ops.clone()).unwrap_or_default()
    }

    /// Keys written so far, in order.
    pub fn written_keys(&self) -> Vec<String> {
        self.operations()
            .into_iter()
            .filter_map(|op| match op {
                CacheOp::Set(key) | CacheOp::SetEx(key, _) => Some(key),
                _ => None,
            })
            .collect()
    }

    fn record(&self, op: CacheOp) {
        if let Ok(mut ops) = self.ops.lock() {
            ops.push(op);
        }
    }
}

#[async_trait]
impl SharedCache for RecordingCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        self.record(CacheOp::Get(key.to_string()));
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), CacheError> {
        self.record(CacheOp::Set(key.to_string()));
        self.inner.set(key, value).await
    }

    async fn setex(&self, key: &str, ttl: Duration, value: &str) -> Result<(), CacheError> {
        self.record(CacheOp::SetEx(key.to_string(), ttl));
        self.inner.setex(key, ttl, value).await
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.record(CacheOp::Delete(key.to_string()));
        self.inner.delete(key).await
    }
}
