use crate::error::{Result, StoreError};
use crate::store::{Store, StoreOp};
use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, Notify};

#[derive(Debug, Clone)]
enum Entry {
    Str(String),
    Hash(HashMap<String, String>),
    Set(BTreeSet<String>),
    ZSet(HashMap<String, f64>),
    List(VecDeque<String>),
}

impl Entry {
    fn is_empty(&self) -> bool {
        match self {
            Entry::Str(_) => false,
            Entry::Hash(h) => h.is_empty(),
            Entry::Set(s) => s.is_empty(),
            Entry::ZSet(z) => z.is_empty(),
            Entry::List(l) => l.is_empty(),
        }
    }
}

#[derive(Debug, Default)]
struct Inner {
    data: HashMap<String, Entry>,
    expires: HashMap<String, Instant>,
}

macro_rules! typed_ref {
    ($name:ident, $variant:ident, $ty:ty) => {
        fn $name(&mut self, key: &str) -> Result<Option<&$ty>> {
            self.purge(key);
            match self.data.get(key) {
                None => Ok(None),
                Some(Entry::$variant(v)) => Ok(Some(v)),
                Some(_) => Err(StoreError::WrongType(key.to_string())),
            }
        }
    };
}

macro_rules! typed_mut {
    ($name:ident, $variant:ident, $ty:ty) => {
        fn $name(&mut self, key: &str) -> Result<&mut $ty> {
            self.purge(key);
            let entry = self
                .data
                .entry(key.to_string())
                .or_insert_with(|| Entry::$variant(Default::default()));
            match entry {
                Entry::$variant(v) => Ok(v),
                _ => Err(StoreError::WrongType(key.to_string())),
            }
        }
    };
}

impl Inner {
    /// 惰性清理过期键
    fn purge(&mut self, key: &str) {
        if let Some(at) = self.expires.get(key) {
            if *at <= Instant::now() {
                self.expires.remove(key);
                self.data.remove(key);
            }
        }
    }

    /// 集合类型为空时删除键
    fn drop_if_empty(&mut self, key: &str) {
        if self.data.get(key).map(Entry::is_empty).unwrap_or(false) {
            self.data.remove(key);
            self.expires.remove(key);
        }
    }

    typed_ref!(string, Str, String);
    typed_ref!(hash, Hash, HashMap<String, String>);
    typed_ref!(set, Set, BTreeSet<String>);
    typed_ref!(zset, ZSet, HashMap<String, f64>);
    typed_ref!(list, List, VecDeque<String>);
    typed_mut!(hash_mut, Hash, HashMap<String, String>);
    typed_mut!(set_mut, Set, BTreeSet<String>);
    typed_mut!(zset_mut, ZSet, HashMap<String, f64>);
    typed_mut!(list_mut, List, VecDeque<String>);

    fn set_string(&mut self, key: &str, value: &str) {
        self.expires.remove(key);
        self.data.insert(key.to_string(), Entry::Str(value.to_string()));
    }

    fn delete(&mut self, key: &str) {
        self.data.remove(key);
        self.expires.remove(key);
    }

    fn expire(&mut self, key: &str, ttl: Duration) {
        self.purge(key);
        if self.data.contains_key(key) {
            self.expires.insert(key.to_string(), Instant::now() + ttl);
        }
    }

    fn hincrby(&mut self, key: &str, field: &str, delta: i64) -> Result<i64> {
        let hash = self.hash_mut(key)?;
        let current = match hash.get(field) {
            Some(raw) => raw.parse::<i64>().map_err(|_| {
                StoreError::invalid_data(format!("hash value is not an integer: {}.{}", key, field))
            })?,
            None => 0,
        };
        let next = current.checked_add(delta).ok_or_else(|| {
            StoreError::invalid_data(format!("hash value overflow: {}.{}", key, field))
        })?;
        hash.insert(field.to_string(), next.to_string());
        Ok(next)
    }

    /// 记录事务涉及的键的当前内容，用于失败时回滚
    fn snapshot(&mut self, ops: &[StoreOp]) -> Vec<(String, Option<Entry>, Option<Instant>)> {
        let mut keys: Vec<&str> = ops.iter().map(StoreOp::key).collect();
        keys.sort_unstable();
        keys.dedup();
        keys.into_iter()
            .map(|key| {
                self.purge(key);
                (
                    key.to_string(),
                    self.data.get(key).cloned(),
                    self.expires.get(key).copied(),
                )
            })
            .collect()
    }

    fn restore(&mut self, snapshot: Vec<(String, Option<Entry>, Option<Instant>)>) {
        for (key, entry, expires) in snapshot {
            match entry {
                Some(entry) => self.data.insert(key.clone(), entry),
                None => self.data.remove(&key),
            };
            match expires {
                Some(at) => self.expires.insert(key, at),
                None => self.expires.remove(&key),
            };
        }
    }

    /// 返回是否向列表写入了数据
    fn apply(&mut self, op: StoreOp) -> Result<bool> {
        match op {
            StoreOp::Set { key, value } => self.set_string(&key, &value),
            StoreOp::Del { key } => self.delete(&key),
            StoreOp::HSet { key, field, value } => {
                self.hash_mut(&key)?.insert(field, value);
            }
            StoreOp::HSetNx { key, field, value } => {
                self.hash_mut(&key)?.entry(field).or_insert(value);
            }
            StoreOp::HIncrBy { key, field, delta } => {
                self.hincrby(&key, &field, delta)?;
            }
            StoreOp::Expire { key, ttl } => self.expire(&key, ttl),
            StoreOp::ZAdd { key, score, member } => {
                self.zset_mut(&key)?.insert(member, score);
            }
            StoreOp::ZRem { key, member } => {
                self.zset_mut(&key)?.remove(&member);
                self.drop_if_empty(&key);
            }
            StoreOp::SAdd { key, member } => {
                self.set_mut(&key)?.insert(member);
            }
            StoreOp::SRem { key, member } => {
                self.set_mut(&key)?.remove(&member);
                self.drop_if_empty(&key);
            }
            StoreOp::RPush { key, value } => {
                self.list_mut(&key)?.push_back(value);
                return Ok(true);
            }
        }
        Ok(false)
    }
}

/// 进程内存储，用于测试和单机部署
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
    /// 列表写入时唤醒阻塞的 blpop
    pushed: Notify,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn normalize_range(len: usize, start: isize, stop: isize) -> Option<(usize, usize)> {
    let len = len as isize;
    let start = if start < 0 { (len + start).max(0) } else { start };
    let stop = if stop < 0 { len + stop } else { stop.min(len - 1) };
    if len == 0 || start > stop || start >= len {
        return None;
    }
    Some((start as usize, stop as usize))
}

#[async_trait]
impl Store for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut inner = self.inner.lock().await;
        Ok(inner.string(key)?.cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.inner.lock().await.set_string(key, value);
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<()> {
        self.inner.lock().await.delete(key);
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let mut inner = self.inner.lock().await;
        inner.purge(key);
        Ok(inner.data.contains_key(key))
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<()> {
        self.inner.lock().await.expire(key, ttl);
        Ok(())
    }

    async fn hget(&self, key: &str, field: &str) -> Result<Option<String>> {
        let mut inner = self.inner.lock().await;
        Ok(inner.hash(key)?.and_then(|h| h.get(field).cloned()))
    }

    async fn hgetall(&self, key: &str) -> Result<HashMap<String, String>> {
        let mut inner = self.inner.lock().await;
        Ok(inner.hash(key)?.cloned().unwrap_or_default())
    }

    async fn hset(&self, key: &str, field: &str, value: &str) -> Result<()> {
        let mut inner = self.inner.lock().await;
        inner.hash_mut(key)?.insert(field.to_string(), value.to_string());
        Ok(())
    }

    async fn hdel(&self, key: &str, field: &str) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if inner.hash(key)?.is_some() {
            inner.hash_mut(key)?.remove(field);
            inner.drop_if_empty(key);
        }
        Ok(())
    }

    async fn hincrby(&self, key: &str, field: &str, delta: i64) -> Result<i64> {
        self.inner.lock().await.hincrby(key, field, delta)
    }

    async fn sadd(&self, key: &str, member: &str) -> Result<bool> {
        let mut inner = self.inner.lock().await;
        Ok(inner.set_mut(key)?.insert(member.to_string()))
    }

    async fn srem(&self, key: &str, member: &str) -> Result<bool> {
        let mut inner = self.inner.lock().await;
        if inner.set(key)?.is_none() {
            return Ok(false);
        }
        let removed = inner.set_mut(key)?.remove(member);
        inner.drop_if_empty(key);
        Ok(removed)
    }

    async fn smembers(&self, key: &str) -> Result<Vec<String>> {
        let mut inner = self.inner.lock().await;
        Ok(inner
            .set(key)?
            .map(|s| s.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn sismember(&self, key: &str, member: &str) -> Result<bool> {
        let mut inner = self.inner.lock().await;
        Ok(inner.set(key)?.map(|s| s.contains(member)).unwrap_or(false))
    }

    async fn zadd(&self, key: &str, score: f64, member: &str) -> Result<()> {
        let mut inner = self.inner.lock().await;
        inner.zset_mut(key)?.insert(member.to_string(), score);
        Ok(())
    }

    async fn zrem(&self, key: &str, member: &str) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if inner.zset(key)?.is_some() {
            inner.zset_mut(key)?.remove(member);
            inner.drop_if_empty(key);
        }
        Ok(())
    }

    async fn zrange_by_score(&self, key: &str, min: f64, max: f64) -> Result<Vec<String>> {
        Ok(self
            .zrange_with_scores(key)
            .await?
            .into_iter()
            .filter(|(_, score)| *score >= min && *score <= max)
            .map(|(member, _)| member)
            .collect())
    }

    async fn zrange_with_scores(&self, key: &str) -> Result<Vec<(String, f64)>> {
        let mut inner = self.inner.lock().await;
        let mut members: Vec<(String, f64)> = inner
            .zset(key)?
            .map(|z| z.iter().map(|(m, s)| (m.clone(), *s)).collect())
            .unwrap_or_default();
        // 分数相同时按成员字典序，与 Redis 一致
        members.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
        Ok(members)
    }

    async fn rpush(&self, key: &str, value: &str) -> Result<()> {
        {
            let mut inner = self.inner.lock().await;
            inner.list_mut(key)?.push_back(value.to_string());
        }
        self.pushed.notify_waiters();
        Ok(())
    }

    async fn lpop(&self, key: &str) -> Result<Option<String>> {
        let mut inner = self.inner.lock().await;
        if inner.list(key)?.is_none() {
            return Ok(None);
        }
        let value = inner.list_mut(key)?.pop_front();
        inner.drop_if_empty(key);
        Ok(value)
    }

    async fn lrange(&self, key: &str, start: isize, stop: isize) -> Result<Vec<String>> {
        let mut inner = self.inner.lock().await;
        let list = match inner.list(key)? {
            Some(list) => list,
            None => return Ok(Vec::new()),
        };
        Ok(match normalize_range(list.len(), start, stop) {
            Some((from, to)) => list.range(from..=to).cloned().collect(),
            None => Vec::new(),
        })
    }

    async fn llen(&self, key: &str) -> Result<usize> {
        let mut inner = self.inner.lock().await;
        Ok(inner.list(key)?.map(VecDeque::len).unwrap_or(0))
    }

    async fn lrem(&self, key: &str, value: &str) -> Result<usize> {
        let mut inner = self.inner.lock().await;
        if inner.list(key)?.is_none() {
            return Ok(0);
        }
        let list = inner.list_mut(key)?;
        let before = list.len();
        list.retain(|v| v != value);
        let removed = before - list.len();
        inner.drop_if_empty(key);
        Ok(removed)
    }

    async fn blpop(&self, key: &str) -> Result<String> {
        loop {
            // 先登记等待再检查列表，避免错过检查与等待之间的写入
            let notified = self.pushed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(value) = self.lpop(key).await? {
                return Ok(value);
            }
            notified.await;
        }
    }

    async fn transaction(&self, ops: Vec<StoreOp>) -> Result<()> {
        let mut pushed = false;
        {
            let mut inner = self.inner.lock().await;
            let snapshot = inner.snapshot(&ops);
            for op in ops {
                match inner.apply(op) {
                    Ok(wrote) => pushed |= wrote,
                    Err(e) => {
                        inner.restore(snapshot);
                        return Err(e);
                    }
                }
            }
        }
        if pushed {
            self.pushed.notify_waiters();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tokio::time::{sleep, timeout};

    #[tokio::test]
    async fn test_hash_and_counters() {
        let store = MemoryStore::new();
        store.hset("h", "a", "1").await.unwrap();
        assert_eq!(store.hincrby("h", "a", 2).await.unwrap(), 3);
        assert_eq!(store.hincrby("h", "b", 1).await.unwrap(), 1);

        let all = store.hgetall("h").await.unwrap();
        assert_eq!(all.get("a").map(String::as_str), Some("3"));
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn test_wrong_type() {
        let store = MemoryStore::new();
        store.set("k", "v").await.unwrap();
        assert!(matches!(store.hget("k", "f").await, Err(StoreError::WrongType(_))));
        assert!(matches!(store.rpush("k", "x").await, Err(StoreError::WrongType(_))));
    }

    #[tokio::test]
    async fn test_list_operations() {
        let store = MemoryStore::new();
        for v in ["a", "b", "c", "d"] {
            store.rpush("l", v).await.unwrap();
        }

        assert_eq!(store.lrange("l", 0, -1).await.unwrap(), vec!["a", "b", "c", "d"]);
        assert_eq!(store.lrange("l", -2, -1).await.unwrap(), vec!["c", "d"]);
        assert_eq!(store.lrange("l", 1, 100).await.unwrap(), vec!["b", "c", "d"]);
        assert!(store.lrange("l", 5, 10).await.unwrap().is_empty());

        assert_eq!(store.lpop("l").await.unwrap().as_deref(), Some("a"));
        assert_eq!(store.llen("l").await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_lrem_keeps_other_values() {
        let store = MemoryStore::new();
        for v in ["+", "stop", "+", "+"] {
            store.rpush("actions", v).await.unwrap();
        }

        assert_eq!(store.lrem("actions", "+").await.unwrap(), 3);
        assert_eq!(store.lrange("actions", 0, -1).await.unwrap(), vec!["stop"]);
        assert_eq!(store.lrem("missing", "+").await.unwrap(), 0);
        assert!(!store.exists("missing").await.unwrap());

        store.lpop("actions").await.unwrap();
        store.rpush("actions", "+").await.unwrap();
        store.lrem("actions", "+").await.unwrap();
        assert!(!store.exists("actions").await.unwrap());
    }

    #[tokio::test]
    async fn test_empty_collections_are_removed() {
        let store = MemoryStore::new();
        store.sadd("s", "x").await.unwrap();
        assert!(store.srem("s", "x").await.unwrap());
        assert!(!store.exists("s").await.unwrap());

        store.rpush("l", "x").await.unwrap();
        store.lpop("l").await.unwrap();
        assert!(!store.exists("l").await.unwrap());
    }

    #[tokio::test]
    async fn test_sorted_set_ordering() {
        let store = MemoryStore::new();
        store.zadd("z", 30.0, "c").await.unwrap();
        store.zadd("z", 10.0, "a").await.unwrap();
        store.zadd("z", 20.0, "b").await.unwrap();

        assert_eq!(store.zrange_by_score("z", 10.0, 20.0).await.unwrap(), vec!["a", "b"]);
        let all = store.zrange_with_scores("z").await.unwrap();
        assert_eq!(all[2], ("c".to_string(), 30.0));

        store.zrem("z", "a").await.unwrap();
        assert_eq!(store.zrange_with_scores("z").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_expire() {
        let store = MemoryStore::new();
        store.hset("h", "f", "v").await.unwrap();
        store.expire("h", Duration::from_millis(20)).await.unwrap();
        assert!(store.exists("h").await.unwrap());

        sleep(Duration::from_millis(40)).await;
        assert!(!store.exists("h").await.unwrap());
    }

    #[tokio::test]
    async fn test_transaction_applies_all_ops() {
        let store = MemoryStore::new();
        store
            .transaction(vec![
                StoreOp::hsetnx("counters", "all", "5"),
                StoreOp::hsetnx("counters", "all", "0"),
                StoreOp::hincrby("counters", "all", 1),
                StoreOp::zadd("instances", 100.0, "i1"),
                StoreOp::rpush("queue", "e1"),
            ])
            .await
            .unwrap();

        assert_eq!(store.hget("counters", "all").await.unwrap().as_deref(), Some("6"));
        assert_eq!(store.llen("queue").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_failed_transaction_leaves_no_writes() {
        let store = MemoryStore::new();
        store.set("alerts", "not a list").await.unwrap();
        store.rpush("medium", "a0").await.unwrap();

        let result = store
            .transaction(vec![
                StoreOp::set("alert:a1", "{}"),
                StoreOp::rpush("medium", "a1"),
                StoreOp::rpush("alerts", "a1"),
            ])
            .await;

        assert!(matches!(result, Err(StoreError::WrongType(key)) if key == "alerts"));
        assert!(!store.exists("alert:a1").await.unwrap());
        assert_eq!(store.lrange("medium", 0, -1).await.unwrap(), vec!["a0"]);
        assert_eq!(store.get("alerts").await.unwrap().as_deref(), Some("not a list"));
    }

    #[tokio::test]
    async fn test_blpop_wakes_on_push() {
        let store = Arc::new(MemoryStore::new());

        let waiter = {
            let store = store.clone();
            tokio::spawn(async move { store.blpop("actions").await })
        };

        sleep(Duration::from_millis(20)).await;
        store.rpush("actions", "stop").await.unwrap();

        let value = timeout(Duration::from_secs(1), waiter)
            .await
            .expect("blpop did not wake up")
            .unwrap()
            .unwrap();
        assert_eq!(value, "stop");
    }

    #[tokio::test]
    async fn test_blpop_returns_existing_value() {
        let store = MemoryStore::new();
        store.rpush("actions", "+").await.unwrap();
        let value = tokio_test::assert_ok!(store.blpop("actions").await);
        assert_eq!(value, "+");
    }
}
