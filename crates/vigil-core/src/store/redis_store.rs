use crate::error::{Result, StoreError};
use crate::store::{Store, StoreOp};
use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{Client, Cmd, Pipeline};
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

/// Redis 存储实现
pub struct RedisStore {
    client: Client,
    conn: MultiplexedConnection,
}

impl RedisStore {
    pub async fn connect(url: &str) -> Result<Self> {
        let client = Client::open(url)?;
        let conn = client.get_multiplexed_tokio_connection().await?;
        Ok(Self { client, conn })
    }

    async fn query<T: redis::FromRedisValue>(&self, cmd: &Cmd) -> Result<T> {
        let mut conn = self.conn.clone();
        Ok(cmd.query_async(&mut conn).await?)
    }
}

fn push_op(pipe: &mut Pipeline, op: StoreOp) {
    match op {
        StoreOp::Set { key, value } => pipe.cmd("SET").arg(key).arg(value),
        StoreOp::Del { key } => pipe.cmd("DEL").arg(key),
        StoreOp::HSet { key, field, value } => pipe.cmd("HSET").arg(key).arg(field).arg(value),
        StoreOp::HSetNx { key, field, value } => {
            pipe.cmd("HSETNX").arg(key).arg(field).arg(value)
        }
        StoreOp::HIncrBy { key, field, delta } => {
            pipe.cmd("HINCRBY").arg(key).arg(field).arg(delta)
        }
        StoreOp::Expire { key, ttl } => pipe.cmd("EXPIRE").arg(key).arg(ttl.as_secs().max(1)),
        StoreOp::ZAdd { key, score, member } => pipe.cmd("ZADD").arg(key).arg(score).arg(member),
        StoreOp::ZRem { key, member } => pipe.cmd("ZREM").arg(key).arg(member),
        StoreOp::SAdd { key, member } => pipe.cmd("SADD").arg(key).arg(member),
        StoreOp::SRem { key, member } => pipe.cmd("SREM").arg(key).arg(member),
        StoreOp::RPush { key, value } => pipe.cmd("RPUSH").arg(key).arg(value),
    }
    .ignore();
}

#[async_trait]
impl Store for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.query(redis::cmd("GET").arg(key)).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.query(redis::cmd("SET").arg(key).arg(value)).await
    }

    async fn del(&self, key: &str) -> Result<()> {
        self.query(redis::cmd("DEL").arg(key)).await
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        self.query(redis::cmd("EXISTS").arg(key)).await
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<()> {
        self.query(redis::cmd("EXPIRE").arg(key).arg(ttl.as_secs().max(1)))
            .await
    }

    async fn hget(&self, key: &str, field: &str) -> Result<Option<String>> {
        self.query(redis::cmd("HGET").arg(key).arg(field)).await
    }

    async fn hgetall(&self, key: &str) -> Result<HashMap<String, String>> {
        self.query(redis::cmd("HGETALL").arg(key)).await
    }

    async fn hset(&self, key: &str, field: &str, value: &str) -> Result<()> {
        self.query(redis::cmd("HSET").arg(key).arg(field).arg(value))
            .await
    }

    async fn hdel(&self, key: &str, field: &str) -> Result<()> {
        self.query(redis::cmd("HDEL").arg(key).arg(field)).await
    }

    async fn hincrby(&self, key: &str, field: &str, delta: i64) -> Result<i64> {
        self.query(redis::cmd("HINCRBY").arg(key).arg(field).arg(delta))
            .await
    }

    async fn sadd(&self, key: &str, member: &str) -> Result<bool> {
        let added: i64 = self.query(redis::cmd("SADD").arg(key).arg(member)).await?;
        Ok(added > 0)
    }

    async fn srem(&self, key: &str, member: &str) -> Result<bool> {
        let removed: i64 = self.query(redis::cmd("SREM").arg(key).arg(member)).await?;
        Ok(removed > 0)
    }

    async fn smembers(&self, key: &str) -> Result<Vec<String>> {
        let mut members: Vec<String> = self.query(redis::cmd("SMEMBERS").arg(key)).await?;
        members.sort();
        Ok(members)
    }

    async fn sismember(&self, key: &str, member: &str) -> Result<bool> {
        self.query(redis::cmd("SISMEMBER").arg(key).arg(member))
            .await
    }

    async fn zadd(&self, key: &str, score: f64, member: &str) -> Result<()> {
        self.query(redis::cmd("ZADD").arg(key).arg(score).arg(member))
            .await
    }

    async fn zrem(&self, key: &str, member: &str) -> Result<()> {
        self.query(redis::cmd("ZREM").arg(key).arg(member)).await
    }

    async fn zrange_by_score(&self, key: &str, min: f64, max: f64) -> Result<Vec<String>> {
        self.query(redis::cmd("ZRANGEBYSCORE").arg(key).arg(min).arg(max))
            .await
    }

    async fn zrange_with_scores(&self, key: &str) -> Result<Vec<(String, f64)>> {
        self.query(redis::cmd("ZRANGE").arg(key).arg(0).arg(-1).arg("WITHSCORES"))
            .await
    }

    async fn rpush(&self, key: &str, value: &str) -> Result<()> {
        self.query(redis::cmd("RPUSH").arg(key).arg(value)).await
    }

    async fn lpop(&self, key: &str) -> Result<Option<String>> {
        self.query(redis::cmd("LPOP").arg(key)).await
    }

    async fn lrange(&self, key: &str, start: isize, stop: isize) -> Result<Vec<String>> {
        self.query(redis::cmd("LRANGE").arg(key).arg(start).arg(stop))
            .await
    }

    async fn llen(&self, key: &str) -> Result<usize> {
        self.query(redis::cmd("LLEN").arg(key)).await
    }

    async fn lrem(&self, key: &str, value: &str) -> Result<usize> {
        self.query(redis::cmd("LREM").arg(key).arg(0).arg(value)).await
    }

    async fn blpop(&self, key: &str) -> Result<String> {
        // 阻塞命令使用独立连接，不占用共享的多路复用连接
        let mut conn = self.client.get_multiplexed_tokio_connection().await?;
        debug!(key = %key, "Waiting on BLPOP");
        let popped: Option<(String, String)> = redis::cmd("BLPOP")
            .arg(key)
            .arg(0)
            .query_async(&mut conn)
            .await?;
        popped
            .map(|(_, value)| value)
            .ok_or_else(|| StoreError::Backend(format!("BLPOP on {} returned nothing", key)))
    }

    async fn transaction(&self, ops: Vec<StoreOp>) -> Result<()> {
        if ops.is_empty() {
            return Ok(());
        }
        let mut keys: Vec<&str> = ops.iter().map(StoreOp::key).collect();
        keys.sort_unstable();
        keys.dedup();

        // WATCH 状态属于连接，使用独立连接
        let mut conn = self.client.get_multiplexed_tokio_connection().await?;
        loop {
            redis::cmd("WATCH").arg(&keys).query_async::<_, ()>(&mut conn).await?;

            // EXEC 不会回滚运行期错误，提交前先检查类型
            if let Err(e) = check_ops(&mut conn, &ops).await {
                redis::cmd("UNWATCH").query_async::<_, ()>(&mut conn).await?;
                return Err(e);
            }

            let mut pipe = redis::pipe();
            pipe.atomic();
            for op in ops.iter().cloned() {
                push_op(&mut pipe, op);
            }
            let committed: Option<()> = pipe.query_async(&mut conn).await?;
            if committed.is_some() {
                return Ok(());
            }
            debug!(keys = ?keys, "Watched keys changed, retrying transaction");
        }
    }
}

/// 检查每个操作涉及的键类型，以及 HINCRBY 的字段是否为整数
async fn check_ops(conn: &mut MultiplexedConnection, ops: &[StoreOp]) -> Result<()> {
    for op in ops {
        if let Some(required) = op.required_type() {
            let actual: String = redis::cmd("TYPE").arg(op.key()).query_async(conn).await?;
            if actual != "none" && actual != required {
                return Err(StoreError::WrongType(op.key().to_string()));
            }
        }
        if let StoreOp::HIncrBy { key, field, .. } = op {
            let current: Option<String> = redis::cmd("HGET").arg(key).arg(field).query_async(conn).await?;
            if let Some(raw) = current {
                if raw.parse::<i64>().is_err() {
                    return Err(StoreError::invalid_data(format!(
                        "hash value is not an integer: {}.{}",
                        key, field
                    )));
                }
            }
        }
    }
    Ok(())
}
