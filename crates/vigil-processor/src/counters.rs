use std::collections::HashMap;
use std::time::Duration;

use vigil_core::{keys, SharedStore, StoreOp};
use vigil_types::EventClass;

use crate::error::Result;

/// 计数器字段
pub const COUNTER_FIELDS: [&str; 5] = ["all", "ok", "failure", "action", "invalid"];

const INVALID: &str = "invalid";
const ALL: &str = "all";

/// 计数器快照
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CounterSnapshot {
    pub all: i64,
    pub ok: i64,
    pub failure: i64,
    pub action: i64,
    pub invalid: i64,
}

impl CounterSnapshot {
    fn from_hash(hash: &HashMap<String, String>) -> Self {
        let field = |name: &str| {
            hash.get(name)
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(0)
        };
        Self {
            all: field(ALL),
            ok: field("ok"),
            failure: field("failure"),
            action: field("action"),
            invalid: field(INVALID),
        }
    }

    /// all == invalid + ok + failure + action
    pub fn is_consistent(&self) -> bool {
        self.all == self.invalid + self.ok + self.failure + self.action
    }
}

/// 全局和实例级事件计数
#[derive(Clone)]
pub struct EventCounters {
    store: SharedStore,
    instance: String,
}

impl EventCounters {
    pub fn new(store: SharedStore, instance: impl Into<String>) -> Self {
        Self {
            store,
            instance: instance.into(),
        }
    }

    /// 启动时的初始化操作：实例计数清零，全局计数只在不存在时创建
    pub fn init_ops(&self, boot_time: i64, ttl: Duration) -> Vec<StoreOp> {
        let instance_key = keys::instance_counters(&self.instance);
        let executive_key = keys::executive_instance(&self.instance);

        let mut ops = vec![StoreOp::hset(executive_key.clone(), "boot_time", boot_time.to_string())];
        for field in COUNTER_FIELDS {
            ops.push(StoreOp::hset(instance_key.clone(), field, "0"));
            ops.push(StoreOp::hsetnx(keys::EVENT_COUNTERS, field, "0"));
        }
        ops.push(StoreOp::zadd(keys::EXECUTIVE_INSTANCES, boot_time as f64, self.instance.clone()));
        ops.push(StoreOp::expire(instance_key, ttl));
        ops.push(StoreOp::expire(executive_key, ttl));
        ops
    }

    async fn increment(&self, field: &str) -> Result<()> {
        let instance_key = keys::instance_counters(&self.instance);
        self.store
            .transaction(vec![
                StoreOp::hincrby(keys::EVENT_COUNTERS, ALL, 1),
                StoreOp::hincrby(keys::EVENT_COUNTERS, field, 1),
                StoreOp::hincrby(instance_key.clone(), ALL, 1),
                StoreOp::hincrby(instance_key, field, 1),
            ])
            .await?;
        Ok(())
    }

    pub async fn record(&self, class: EventClass) -> Result<()> {
        self.increment(class.counter()).await
    }

    pub async fn record_invalid(&self) -> Result<()> {
        self.increment(INVALID).await
    }

    pub async fn global(&self) -> Result<CounterSnapshot> {
        let hash = self.store.hgetall(keys::EVENT_COUNTERS).await?;
        Ok(CounterSnapshot::from_hash(&hash))
    }

    pub async fn instance(&self) -> Result<CounterSnapshot> {
        let hash = self.store.hgetall(&keys::instance_counters(&self.instance)).await?;
        Ok(CounterSnapshot::from_hash(&hash))
    }
}
