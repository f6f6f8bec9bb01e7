pub mod memory;
#[cfg(feature = "redis-store")]
pub mod redis_store;

use crate::error::{Result, StoreError};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// 事务中的单个写操作
#[derive(Debug, Clone, PartialEq)]
pub enum StoreOp {
    Set { key: String, value: String },
    Del { key: String },
    HSet { key: String, field: String, value: String },
    /// 字段不存在时才写入
    HSetNx { key: String, field: String, value: String },
    HIncrBy { key: String, field: String, delta: i64 },
    Expire { key: String, ttl: Duration },
    ZAdd { key: String, score: f64, member: String },
    ZRem { key: String, member: String },
    SAdd { key: String, member: String },
    SRem { key: String, member: String },
    RPush { key: String, value: String },
}

impl StoreOp {
    pub fn set(key: impl Into<String>, value: impl Into<String>) -> Self {
        StoreOp::Set { key: key.into(), value: value.into() }
    }

    pub fn del(key: impl Into<String>) -> Self {
        StoreOp::Del { key: key.into() }
    }

    pub fn hset(key: impl Into<String>, field: impl Into<String>, value: impl Into<String>) -> Self {
        StoreOp::HSet { key: key.into(), field: field.into(), value: value.into() }
    }

    pub fn hsetnx(key: impl Into<String>, field: impl Into<String>, value: impl Into<String>) -> Self {
        StoreOp::HSetNx { key: key.into(), field: field.into(), value: value.into() }
    }

    pub fn hincrby(key: impl Into<String>, field: impl Into<String>, delta: i64) -> Self {
        StoreOp::HIncrBy { key: key.into(), field: field.into(), delta }
    }

    pub fn expire(key: impl Into<String>, ttl: Duration) -> Self {
        StoreOp::Expire { key: key.into(), ttl }
    }

    pub fn zadd(key: impl Into<String>, score: f64, member: impl Into<String>) -> Self {
        StoreOp::ZAdd { key: key.into(), score, member: member.into() }
    }

    pub fn zrem(key: impl Into<String>, member: impl Into<String>) -> Self {
        StoreOp::ZRem { key: key.into(), member: member.into() }
    }

    pub fn sadd(key: impl Into<String>, member: impl Into<String>) -> Self {
        StoreOp::SAdd { key: key.into(), member: member.into() }
    }

    pub fn srem(key: impl Into<String>, member: impl Into<String>) -> Self {
        StoreOp::SRem { key: key.into(), member: member.into() }
    }

    pub fn rpush(key: impl Into<String>, value: impl Into<String>) -> Self {
        StoreOp::RPush { key: key.into(), value: value.into() }
    }

    /// 操作涉及的键
    pub fn key(&self) -> &str {
        match self {
            StoreOp::Set { key, .. }
            | StoreOp::Del { key }
            | StoreOp::HSet { key, .. }
            | StoreOp::HSetNx { key, .. }
            | StoreOp::HIncrBy { key, .. }
            | StoreOp::Expire { key, .. }
            | StoreOp::ZAdd { key, .. }
            | StoreOp::ZRem { key, .. }
            | StoreOp::SAdd { key, .. }
            | StoreOp::SRem { key, .. }
            | StoreOp::RPush { key, .. } => key,
        }
    }

    /// 操作要求键已有的数据结构（Redis `TYPE` 名称）；`None` 表示任意类型
    pub fn required_type(&self) -> Option<&'static str> {
        match self {
            StoreOp::HSet { .. } | StoreOp::HSetNx { .. } | StoreOp::HIncrBy { .. } => Some("hash"),
            StoreOp::ZAdd { .. } | StoreOp::ZRem { .. } => Some("zset"),
            StoreOp::SAdd { .. } | StoreOp::SRem { .. } => Some("set"),
            StoreOp::RPush { .. } => Some("list"),
            StoreOp::Set { .. } | StoreOp::Del { .. } | StoreOp::Expire { .. } => None,
        }
    }
}

/// 共享状态存储
///
/// 语义与 Redis 对应命令一致：集合类型在最后一个元素被移除后键随之删除。
/// `transaction` 中的操作全部生效或全部不生效：任一操作失败时返回错误且不留下部分写入。
#[async_trait]
pub trait Store: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn set(&self, key: &str, value: &str) -> Result<()>;

    async fn del(&self, key: &str) -> Result<()>;

    async fn exists(&self, key: &str) -> Result<bool>;

    async fn expire(&self, key: &str, ttl: Duration) -> Result<()>;

    async fn hget(&self, key: &str, field: &str) -> Result<Option<String>>;

    async fn hgetall(&self, key: &str) -> Result<HashMap<String, String>>;

    async fn hset(&self, key: &str, field: &str, value: &str) -> Result<()>;

    async fn hdel(&self, key: &str, field: &str) -> Result<()>;

    async fn hincrby(&self, key: &str, field: &str, delta: i64) -> Result<i64>;

    async fn sadd(&self, key: &str, member: &str) -> Result<bool>;

    async fn srem(&self, key: &str, member: &str) -> Result<bool>;

    async fn smembers(&self, key: &str) -> Result<Vec<String>>;

    async fn sismember(&self, key: &str, member: &str) -> Result<bool>;

    async fn zadd(&self, key: &str, score: f64, member: &str) -> Result<()>;

    async fn zrem(&self, key: &str, member: &str) -> Result<()>;

    /// 按分数升序返回 [min, max] 区间内的成员
    async fn zrange_by_score(&self, key: &str, min: f64, max: f64) -> Result<Vec<String>>;

    /// 按分数升序返回全部成员及分数
    async fn zrange_with_scores(&self, key: &str) -> Result<Vec<(String, f64)>>;

    async fn rpush(&self, key: &str, value: &str) -> Result<()>;

    async fn lpop(&self, key: &str) -> Result<Option<String>>;

    /// 支持负数下标，语义同 LRANGE
    async fn lrange(&self, key: &str, start: isize, stop: isize) -> Result<Vec<String>>;

    async fn llen(&self, key: &str) -> Result<usize>;

    /// 删除列表中所有等于 `value` 的元素，返回删除数量
    async fn lrem(&self, key: &str, value: &str) -> Result<usize>;

    /// 阻塞弹出，没有超时，直到列表中出现元素
    async fn blpop(&self, key: &str) -> Result<String>;

    async fn transaction(&self, ops: Vec<StoreOp>) -> Result<()>;
}

pub type SharedStore = Arc<dyn Store>;

/// 读取 JSON 编码的字符串值
pub async fn get_json<T: DeserializeOwned>(store: &dyn Store, key: &str) -> Result<Option<T>> {
    match store.get(key).await? {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}

pub async fn set_json<T: Serialize + Sync>(store: &dyn Store, key: &str, value: &T) -> Result<()> {
    let raw = serde_json::to_string(value)?;
    store.set(key, &raw).await
}

/// 根据 URL 打开存储：`memory://` 或 `redis://...`
pub async fn open(url: &str) -> Result<SharedStore> {
    if url.starts_with("memory://") {
        tracing::info!("Using in-memory store");
        return Ok(Arc::new(memory::MemoryStore::new()));
    }

    if url.starts_with("redis://") || url.starts_with("rediss://") {
        #[cfg(feature = "redis-store")]
        {
            let store = redis_store::RedisStore::connect(url).await?;
            tracing::info!("Connected to redis store");
            return Ok(Arc::new(store));
        }
        #[cfg(not(feature = "redis-store"))]
        {
            return Err(StoreError::Config(
                "redis store requested but the redis-store feature is disabled".to_string(),
            ));
        }
    }

    Err(StoreError::Config(format!("unsupported store url: {}", url)))
}
