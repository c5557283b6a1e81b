//! Key-value backends for the roster.
//!
//! `KvBackend` is the narrow set of set/hash primitives the roster needs,
//! with `WriteBatch` for groups of writes that must land together.

pub mod kv;
pub mod memory;
pub mod redis_backend;

pub use kv::{KvBackend, WriteBatch, WriteOp};
pub use memory::MemoryBackend;
pub use redis_backend::RedisBackend;
