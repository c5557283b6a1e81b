use std::collections::HashMap;

use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands};
use tracing::info;

use super::kv::{KvBackend, WriteBatch, WriteOp};
use crate::errors::ServiceError;

/// Redis-backed store handle.
///
/// Opened once at startup with [`RedisBackend::connect`]; the connection
/// manager reconnects on its own and is cheap to clone per command.
#[derive(Clone)]
pub struct RedisBackend {
    manager: ConnectionManager,
}

impl RedisBackend {
    pub async fn connect(url: &str) -> Result<Self, ServiceError> {
        let client = redis::Client::open(url)
            .map_err(|e| ServiceError::Store(format!("invalid redis url: {e}")))?;
        let manager = ConnectionManager::new(client)
            .await
            .map_err(|e| ServiceError::Store(format!("could not connect to redis: {e}")))?;
        info!(event = "redis_connected", "redis connection manager ready");
        Ok(Self { manager })
    }

    fn conn(&self) -> ConnectionManager {
        self.manager.clone()
    }
}

#[async_trait]
impl KvBackend for RedisBackend {
    async fn ping(&self) -> Result<(), ServiceError> {
        let mut con = self.conn();
        let _pong: String = redis::cmd("PING").query_async(&mut con).await?;
        Ok(())
    }

    async fn set_members(&self, key: &str) -> Result<Vec<String>, ServiceError> {
        let mut con = self.conn();
        let members: Vec<String> = con.smembers(key).await?;
        Ok(members)
    }

    async fn set_contains(&self, key: &str, member: &str) -> Result<bool, ServiceError> {
        let mut con = self.conn();
        let found: bool = con.sismember(key, member).await?;
        Ok(found)
    }

    async fn set_len(&self, key: &str) -> Result<usize, ServiceError> {
        let mut con = self.conn();
        let len: usize = con.scard(key).await?;
        Ok(len)
    }

    async fn set_random_member(&self, key: &str) -> Result<Option<String>, ServiceError> {
        let mut con = self.conn();
        let picked: Option<String> = con.srandmember(key).await?;
        Ok(picked.filter(|m| !m.is_empty()))
    }

    async fn hash_get_all(&self, key: &str) -> Result<HashMap<String, String>, ServiceError> {
        let mut con = self.conn();
        let fields: HashMap<String, String> = con.hgetall(key).await?;
        Ok(fields)
    }

    async fn apply(&self, batch: WriteBatch) -> Result<(), ServiceError> {
        if batch.is_empty() {
            return Ok(());
        }
        // MULTI/EXEC so the index entry and its record land together
        let mut pipe = redis::pipe();
        pipe.atomic();
        for op in batch.into_ops() {
            match op {
                WriteOp::SetAdd { key, member } => {
                    pipe.sadd(key, member).ignore();
                }
                WriteOp::HashSet { key, fields } => {
                    pipe.hset_multiple(key, fields.as_slice()).ignore();
                }
            }
        }
        let mut con = self.conn();
        let _: () = pipe.query_async(&mut con).await?;
        Ok(())
    }
}
