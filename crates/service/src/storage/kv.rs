use std::collections::HashMap;

use async_trait::async_trait;

use crate::errors::ServiceError;

/// A single write inside a [`WriteBatch`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WriteOp {
    /// Add `member` to the set stored at `key`.
    SetAdd { key: String, member: String },
    /// Set the given fields of the hash stored at `key`, leaving others untouched.
    HashSet { key: String, fields: Vec<(String, String)> },
}

/// Ordered group of writes applied atomically by [`KvBackend::apply`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn new() -> Self { Self::default() }

    pub fn set_add(mut self, key: impl Into<String>, member: impl Into<String>) -> Self {
        self.ops.push(WriteOp::SetAdd { key: key.into(), member: member.into() });
        self
    }

    pub fn hash_set<I, F, V>(mut self, key: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = (F, V)>,
        F: Into<String>,
        V: Into<String>,
    {
        let fields = fields.into_iter().map(|(f, v)| (f.into(), v.into())).collect();
        self.ops.push(WriteOp::HashSet { key: key.into(), fields });
        self
    }

    pub fn ops(&self) -> &[WriteOp] { &self.ops }

    pub fn into_ops(self) -> Vec<WriteOp> { self.ops }

    pub fn is_empty(&self) -> bool { self.ops.is_empty() }

    pub fn len(&self) -> usize { self.ops.len() }
}

/// Backend primitives used by the roster store.
/// Implementations can be in-process or remote (Redis).
#[async_trait]
pub trait KvBackend: Send + Sync {
    /// Round-trip check used once at startup.
    async fn ping(&self) -> Result<(), ServiceError>;

    /// All members of a set; empty when the key is missing.
    async fn set_members(&self, key: &str) -> Result<Vec<String>, ServiceError>;

    async fn set_contains(&self, key: &str, member: &str) -> Result<bool, ServiceError>;

    async fn set_len(&self, key: &str) -> Result<usize, ServiceError>;

    /// One uniformly chosen member, picked by the backend itself.
    /// `None` when the set is empty or missing.
    async fn set_random_member(&self, key: &str) -> Result<Option<String>, ServiceError>;

    /// All fields of a hash; empty when the key is missing.
    async fn hash_get_all(&self, key: &str) -> Result<HashMap<String, String>, ServiceError>;

    /// Apply every write in the batch or none of them.
    async fn apply(&self, batch: WriteBatch) -> Result<(), ServiceError>;
}
