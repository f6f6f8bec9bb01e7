use tracing::{debug, info};
use vigil_core::{keys, SharedStore, StoreOp};

use crate::error::Result;

/// 事件队列：`<queue>` 列表保存事件，`<queue>_actions` 为控制通道
#[derive(Clone)]
pub struct EventQueue {
    store: SharedStore,
    name: String,
    actions: String,
    rejected: String,
}

impl EventQueue {
    pub fn new(store: SharedStore, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            actions: keys::actions_channel(&name),
            rejected: keys::rejected(&name),
            store,
            name,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// 写入一条事件并唤醒等待中的处理器
    pub async fn push(&self, raw: &str) -> Result<()> {
        self.store
            .transaction(vec![
                StoreOp::rpush(self.name.clone(), raw),
                StoreOp::rpush(self.actions.clone(), keys::EVENT_TOKEN),
            ])
            .await?;
        Ok(())
    }

    /// 非阻塞取出一条事件
    pub async fn pop(&self) -> Result<Option<String>> {
        Ok(self.store.lpop(&self.name).await?)
    }

    pub async fn len(&self) -> Result<usize> {
        Ok(self.store.llen(&self.name).await?)
    }

    pub async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }

    /// 阻塞等待控制通道上的下一个指令，没有超时
    pub async fn wait_for_action(&self) -> Result<String> {
        debug!(queue = %self.name, "Waiting for actions");
        Ok(self.store.blpop(&self.actions).await?)
    }

    /// 删除控制通道里残留的事件唤醒标记，保留停止等其他指令
    ///
    /// 清空即退出的模式不消费控制通道，退出前调用，避免标记在多次运行间累积。
    pub async fn clear_event_tokens(&self) -> Result<usize> {
        let removed = self.store.lrem(&self.actions, keys::EVENT_TOKEN).await?;
        if removed > 0 {
            debug!(queue = %self.name, removed, "Cleared event tokens");
        }
        Ok(removed)
    }

    /// 写入死信列表
    pub async fn reject(&self, raw: &str) -> Result<()> {
        self.store.rpush(&self.rejected, raw).await?;
        Ok(())
    }

    pub async fn rejected(&self) -> Result<Vec<String>> {
        Ok(self.store.lrange(&self.rejected, 0, -1).await?)
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            store: self.store.clone(),
            actions: self.actions.clone(),
        }
    }
}

/// 停止处理器的句柄，可以跨任务传递
#[derive(Clone)]
pub struct StopHandle {
    store: SharedStore,
    actions: String,
}

impl StopHandle {
    /// 向控制通道写入停止指令
    pub async fn stop(&self) -> Result<()> {
        self.store.rpush(&self.actions, keys::STOP_TOKEN).await?;
        info!(channel = %self.actions, "Stop requested");
        Ok(())
    }
}
