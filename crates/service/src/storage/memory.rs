use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use rand::seq::IteratorRandom;
use tokio::sync::RwLock;

use super::kv::{KvBackend, WriteBatch, WriteOp};
use crate::errors::ServiceError;

#[derive(Default)]
struct MemoryState {
    sets: HashMap<String, HashSet<String>>,
    hashes: HashMap<String, HashMap<String, String>>,
}

impl MemoryState {
    /// A key holds one type at a time, as in Redis.
    fn check_type(&self, op: &WriteOp) -> Result<(), ServiceError> {
        match op {
            WriteOp::SetAdd { key, .. } => self.check_set(key),
            WriteOp::HashSet { key, .. } => self.check_hash(key),
        }
    }

    fn check_set(&self, key: &str) -> Result<(), ServiceError> {
        if self.hashes.contains_key(key) { Err(wrong_type(key)) } else { Ok(()) }
    }

    fn check_hash(&self, key: &str) -> Result<(), ServiceError> {
        if self.sets.contains_key(key) { Err(wrong_type(key)) } else { Ok(()) }
    }

    fn write(&mut self, op: WriteOp) {
        match op {
            WriteOp::SetAdd { key, member } => {
                self.sets.entry(key).or_default().insert(member);
            }
            WriteOp::HashSet { key, fields } => {
                self.hashes.entry(key).or_default().extend(fields);
            }
        }
    }
}

fn wrong_type(key: &str) -> ServiceError {
    ServiceError::Store(format!("WRONGTYPE key {key} holds a different kind of value"))
}

/// In-process backend with Redis set/hash semantics.
///
/// A batch is validated and applied under one write lock, so readers never
/// observe half of it. Nothing is persisted; state lives as long as the handle.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    inner: Arc<RwLock<MemoryState>>,
}

impl MemoryBackend {
    pub fn new() -> Self { Self::default() }
}

#[async_trait]
impl KvBackend for MemoryBackend {
    async fn ping(&self) -> Result<(), ServiceError> { Ok(()) }

    async fn set_members(&self, key: &str) -> Result<Vec<String>, ServiceError> {
        let state = self.inner.read().await;
        state.check_set(key)?;
        Ok(state.sets.get(key).map(|s| s.iter().cloned().collect()).unwrap_or_default())
    }

    async fn set_contains(&self, key: &str, member: &str) -> Result<bool, ServiceError> {
        let state = self.inner.read().await;
        state.check_set(key)?;
        Ok(state.sets.get(key).map(|s| s.contains(member)).unwrap_or(false))
    }

    async fn set_len(&self, key: &str) -> Result<usize, ServiceError> {
        let state = self.inner.read().await;
        state.check_set(key)?;
        Ok(state.sets.get(key).map(HashSet::len).unwrap_or(0))
    }

    async fn set_random_member(&self, key: &str) -> Result<Option<String>, ServiceError> {
        let state = self.inner.read().await;
        state.check_set(key)?;
        let picked = state
            .sets
            .get(key)
            .and_then(|s| s.iter().choose(&mut rand::thread_rng()).cloned());
        Ok(picked)
    }

    async fn hash_get_all(&self, key: &str) -> Result<HashMap<String, String>, ServiceError> {
        let state = self.inner.read().await;
        state.check_hash(key)?;
        Ok(state.hashes.get(key).cloned().unwrap_or_default())
    }

    async fn apply(&self, batch: WriteBatch) -> Result<(), ServiceError> {
        let mut state = self.inner.write().await;
        for op in batch.ops() {
            state.check_type(op)?;
        }
        for op in batch.into_ops() {
            state.write(op);
        }
        Ok(())
    }
}
