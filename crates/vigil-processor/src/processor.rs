use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use vigil_config::VigilConfig;
use vigil_core::store::set_json;
use vigil_core::{keys, SharedStore};
use vigil_data::{CheckRepository, ContactRepository, StateMachine};
use vigil_filter::{FilterChain, FilterContext};
use vigil_notify::{NotificationGenerator, NotifyManager};
use vigil_types::{Acknowledgement, Alert, Event, Notification, NotificationType};

use crate::counters::EventCounters;
use crate::error::{ProcessorError, Result};
use crate::queue::{EventQueue, StopHandle};

/// 主循环结束的原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessorExit {
    /// 收到停止指令，只结束本实例
    Stopped,
    /// 队列已清空且配置为清空即退出，结束整个进程
    QueueEmpty,
}

/// 事件处理器
///
/// 从队列取出事件，更新检查状态，经过滤链后生成并投递告警。
/// 同一实例内严格串行，多个实例通过队列的原子弹出协作。
pub struct Processor {
    store: SharedStore,
    instance_id: String,
    boot_time: i64,
    queue: EventQueue,
    counters: EventCounters,
    checks: CheckRepository,
    contacts: ContactRepository,
    state: StateMachine,
    filters: FilterChain,
    generator: NotificationGenerator,
    notify: Arc<NotifyManager>,
    exit_on_queue_empty: bool,
    instance_ttl: Duration,
    default_acknowledgement_secs: i64,
    lock: Mutex<()>,
}

/// 实例 ID：`<hostname>:<启动时间>`
pub fn instance_id(boot_time: i64) -> String {
    let host = hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "localhost".to_string());
    format!("{}:{}", host, boot_time)
}

impl Processor {
    pub fn new(store: SharedStore, config: &VigilConfig, notify: Arc<NotifyManager>) -> Result<Self> {
        let default_timezone = config.notifications.default_offset().ok_or_else(|| {
            ProcessorError::config(format!(
                "invalid default timezone: {}",
                config.notifications.default_timezone
            ))
        })?;

        let boot_time = chrono::Utc::now().timestamp();
        let instance_id = instance_id(boot_time);
        let checks = CheckRepository::new(store.clone());

        Ok(Self {
            queue: EventQueue::new(store.clone(), config.processor.queue.clone()),
            counters: EventCounters::new(store.clone(), instance_id.clone()),
            contacts: ContactRepository::new(store.clone()),
            state: StateMachine::new(checks.clone()),
            filters: FilterChain::new(config.filters.initial_failure_delay_secs),
            generator: NotificationGenerator::new(store.clone(), default_timezone),
            checks,
            store,
            instance_id,
            boot_time,
            notify,
            exit_on_queue_empty: config.processor.exit_on_queue_empty,
            instance_ttl: Duration::from_secs(config.processor.instance_ttl_secs),
            default_acknowledgement_secs: config.filters.default_acknowledgement_secs,
            lock: Mutex::new(()),
        })
    }

    /// 覆盖实例 ID（同一主机上运行多个实例时使用）
    pub fn with_instance_id(mut self, instance_id: impl Into<String>) -> Self {
        self.instance_id = instance_id.into();
        self.counters = EventCounters::new(self.store.clone(), self.instance_id.clone());
        self
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    pub fn queue(&self) -> &EventQueue {
        &self.queue
    }

    pub fn counters(&self) -> &EventCounters {
        &self.counters
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.queue.stop_handle()
    }

    /// 登记实例并初始化计数器
    pub async fn start(&self) -> Result<()> {
        let _guard = self.lock.lock().await;
        self.store
            .transaction(self.counters.init_ops(self.boot_time, self.instance_ttl))
            .await?;

        info!(
            instance = %self.instance_id,
            queue = %self.queue.name(),
            filters = ?self.filters.names(),
            "Processor started"
        );
        Ok(())
    }

    /// 主循环：清空队列后等待控制通道，直到停止或（按配置）队列清空
    pub async fn run(&self) -> Result<ProcessorExit> {
        self.start().await?;

        loop {
            let _guard = self.lock.lock().await;

            while let Some(raw) = self.queue.pop().await? {
                self.process_raw(&raw).await?;
            }

            if self.exit_on_queue_empty {
                self.queue.clear_event_tokens().await?;
                info!(instance = %self.instance_id, "Queue empty, exiting");
                return Ok(ProcessorExit::QueueEmpty);
            }

            let token = self.queue.wait_for_action().await?;
            if token == keys::STOP_TOKEN {
                info!(instance = %self.instance_id, "Processor stopped");
                return Ok(ProcessorExit::Stopped);
            }
        }
    }

    /// 处理一条原始记录；无法解析的记录计数后写入死信列表
    pub async fn process_raw(&self, raw: &str) -> Result<Vec<Alert>> {
        let event = match Event::parse(raw) {
            Ok(event) => event,
            Err(e) => {
                warn!(queue = %self.queue.name(), "Rejected event: {}", e);
                self.counters.record_invalid().await?;
                self.queue.reject(raw).await?;
                return Ok(Vec::new());
            }
        };

        self.counters.record(event.class()).await?;
        self.process_event(&event).await
    }

    /// 处理一个已解析的事件，返回生成的告警
    pub async fn process_event(&self, event: &Event) -> Result<Vec<Alert>> {
        let check_id = event.check_id();
        debug!(check = %check_id, state = %event.state, time = event.time, "Processing event");

        self.checks.ensure(&check_id).await?;
        let update = self.state.update(event).await?;

        let ctx = FilterContext::new(event, &update, &self.checks);
        if let Some(filter) = self.filters.evaluate(&ctx).await? {
            info!(check = %check_id, state = %event.state, filter, "Event blocked");
            return Ok(Vec::new());
        }

        let mut notification = Notification::from_event(event, &update.current);

        if event.is_acknowledgement() {
            let duration = event.duration.unwrap_or(self.default_acknowledgement_secs);
            let ack = Acknowledgement {
                status: update.current.status,
                expires_at: event.time.saturating_add(duration),
                summary: event.summary.clone(),
                acknowledgement_id: event.acknowledgement_id.clone(),
            };
            self.checks.set_acknowledgement(&check_id, &ack).await?;
            notification = notification.with_acknowledgement_duration(duration);
            info!(check = %check_id, expires_at = ack.expires_at, "Check acknowledged");
        }

        set_json(self.store.as_ref(), &keys::notification(&notification.id), &notification).await?;

        let contacts = self.contacts.contacts_for(&check_id).await?;
        let alerts = self.generator.generate(&notification, &contacts).await?;

        if matches!(
            notification.notification_type,
            NotificationType::Problem | NotificationType::Recovery
        ) {
            self.checks.mark_notified(&check_id, alerts.len() as u32).await?;
        }

        let delivered = self.notify.dispatch(&alerts).await;
        debug!(check = %check_id, alerts = alerts.len(), delivered, "Alerts dispatched");

        Ok(alerts)
    }
}
