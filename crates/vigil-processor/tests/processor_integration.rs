use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::{timeout, Duration};
use vigil_config::{ConfigLoader, VigilConfig};
use vigil_core::{keys, MemoryStore, SharedStore};
use vigil_data::{CheckRepository, ContactRepository};
use vigil_notify::{Notifier, NotifyManager, NotifyResult};
use vigil_processor::{Processor, ProcessorExit};
use vigil_types::{
    Alert, CheckId, CheckStatus, Contact, MaintenanceWindow, Medium, MediumType, NotificationType,
};

/// 记录收到的告警
#[derive(Clone, Default)]
struct RecordingNotifier {
    sent: Arc<Mutex<Vec<Alert>>>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, alert: &Alert) -> anyhow::Result<NotifyResult> {
        self.sent.lock().await.push(alert.clone());
        Ok(NotifyResult::success())
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}

struct Harness {
    store: SharedStore,
    processor: Arc<Processor>,
    recorder: RecordingNotifier,
}

impl Harness {
    async fn new(config: VigilConfig) -> Self {
        let store: SharedStore = Arc::new(MemoryStore::new());
        let recorder = RecordingNotifier::default();
        let notify = NotifyManager::new();
        notify.register(MediumType::Email, Box::new(recorder.clone())).await;
        notify.register(MediumType::Sms, Box::new(recorder.clone())).await;

        let processor = Processor::new(store.clone(), &config, Arc::new(notify))
            .unwrap()
            .with_instance_id("test-host:1000");

        Self {
            store,
            processor: Arc::new(processor),
            recorder,
        }
    }

    async fn draining() -> Self {
        let mut config = VigilConfig::default();
        config.processor.exit_on_queue_empty = true;
        Self::new(config).await
    }

    /// 联系人：email + sms，汇总阈值 10，关联到 web:HTTP
    async fn with_contact(self) -> Self {
        let contacts = ContactRepository::new(self.store.clone());
        let contact = Contact::new("alice", "Alice")
            .with_medium(Medium::new(MediumType::Email, "alice@example.com").with_rollup_threshold(10))
            .with_medium(Medium::new(MediumType::Sms, "+15550100").with_rollup_threshold(10));
        contacts.save(&contact).await.unwrap();
        contacts.link_check(&check_id(), "alice").await.unwrap();
        self
    }

    async fn push(&self, raw: &str) {
        tokio_test::assert_ok!(self.processor.queue().push(raw).await);
    }

    async fn drain(&self) -> ProcessorExit {
        timeout(Duration::from_secs(5), self.processor.run())
            .await
            .expect("processor did not finish")
            .unwrap()
    }

    async fn sent(&self) -> Vec<Alert> {
        self.recorder.sent.lock().await.clone()
    }

    fn checks(&self) -> CheckRepository {
        CheckRepository::new(self.store.clone())
    }
}

fn check_id() -> CheckId {
    CheckId::new("web-01", "HTTP")
}

fn service(state: &str, time: i64) -> String {
    format!(
        r#"{{"entity":"web-01","check":"HTTP","type":"service","state":"{}","summary":"{} at {}","time":{},"initial_failure_delay":10}}"#,
        state, state, time, time
    )
}

fn action(state: &str, time: i64) -> String {
    format!(
        r#"{{"entity":"web-01","check":"HTTP","type":"action","state":"{}","summary":"looking","time":{},"duration":3600}}"#,
        state, time
    )
}

/// 持续 16 秒的 critical 故障为两个媒介各生成一条告警
#[tokio::test]
async fn test_problem_alerts_per_medium() {
    let harness = Harness::draining().await.with_contact().await;
    harness.push(&service("critical", 1000)).await;
    harness.push(&service("critical", 1016)).await;

    assert_eq!(harness.drain().await, ProcessorExit::QueueEmpty);

    let sent = harness.sent().await;
    assert_eq!(sent.len(), 2);
    for alert in &sent {
        assert!(!alert.rollup);
        assert_eq!(alert.state, CheckStatus::Critical);
        assert_eq!(alert.state_duration, 16);
        assert_eq!(alert.notification_type, NotificationType::Problem);
        assert_eq!(
            harness
                .store
                .lrange(&keys::medium_alerts("alice", alert.medium), 0, -1)
                .await
                .unwrap(),
            vec![alert.id.clone()]
        );
    }
    assert_eq!(harness.checks().alerts(&check_id()).await.unwrap().len(), 2);

    let current = harness.checks().current_state(&check_id()).await.unwrap().unwrap();
    assert!(current.notified);
    assert_eq!(current.last_notification_count, 2);
}

/// 已通知的状态不会重复通知
#[tokio::test]
async fn test_repeated_state_is_not_renotified() {
    let harness = Harness::draining().await.with_contact().await;
    for time in [1000, 1020, 1040, 1060] {
        harness.push(&service("critical", time)).await;
    }
    harness.drain().await;
    assert_eq!(harness.sent().await.len(), 2);

    // 恢复后再次故障会重新通知
    harness.push(&service("ok", 1100)).await;
    harness.push(&service("critical", 1200)).await;
    harness.push(&service("critical", 1215)).await;
    harness.drain().await;

    let types: Vec<NotificationType> = harness.sent().await.iter().map(|a| a.notification_type).collect();
    assert_eq!(
        types,
        vec![
            NotificationType::Problem,
            NotificationType::Problem,
            NotificationType::Recovery,
            NotificationType::Recovery,
            NotificationType::Problem,
            NotificationType::Problem,
        ]
    );
}

/// 维护期间不生成告警
#[tokio::test]
async fn test_maintenance_suppresses_alerts() {
    let harness = Harness::draining().await.with_contact().await;
    harness
        .checks()
        .add_scheduled_maintenance(&check_id(), &MaintenanceWindow::new(900, 2000, "upgrade"))
        .await
        .unwrap();

    harness.push(&service("critical", 1000)).await;
    harness.push(&service("critical", 1500)).await;
    harness.drain().await;

    assert!(harness.sent().await.is_empty());
    assert!(harness.checks().alerts(&check_id()).await.unwrap().is_empty());
}

/// 计数器满足 all == invalid + ok + failure + action，坏记录进入死信列表
#[tokio::test]
async fn test_counters_and_dead_letters() {
    let harness = Harness::draining().await;
    harness.push("this is not json").await;
    harness.push(r#"{"entity":"web-01","check":"HTTP","type":"service","state":"sideways","time":1}"#).await;
    harness.push(&service("ok", 1000)).await;
    harness.push(&service("critical", 1010)).await;
    harness.push(&action("test_notifications", 1020)).await;
    harness.drain().await;

    let counters = harness.processor.counters();
    for snapshot in [counters.global().await.unwrap(), counters.instance().await.unwrap()] {
        assert!(snapshot.is_consistent());
        assert_eq!(snapshot.all, 5);
        assert_eq!(snapshot.invalid, 2);
        assert_eq!((snapshot.ok, snapshot.failure, snapshot.action), (1, 1, 1));
    }

    let rejected = harness.processor.queue().rejected().await.unwrap();
    assert_eq!(rejected.len(), 2);
    assert_eq!(rejected[0], "this is not json");
}

/// 批处理模式退出时不留下唤醒标记
#[tokio::test]
async fn test_batch_run_leaves_no_event_tokens() {
    let harness = Harness::draining().await;
    let actions = keys::actions_channel(harness.processor.queue().name());
    for run in 0..3 {
        harness.push(&service("ok", 1000 + run)).await;
        harness.push(&service("ok", 1001 + run)).await;
        assert_eq!(harness.drain().await, ProcessorExit::QueueEmpty);
        assert_eq!(harness.store.llen(&actions).await.unwrap(), 0);
    }
}

/// 到期时间超出范围的确认记录进入死信列表，处理器继续运行
#[tokio::test]
async fn test_out_of_range_acknowledgement_is_dead_lettered() {
    let harness = Harness::draining().await.with_contact().await;
    let huge = r#"{"entity":"web-01","check":"HTTP","type":"action","state":"acknowledgement","time":1005,"duration":9223372036854775000}"#;
    harness.push(&service("critical", 1000)).await;
    harness.push(huge).await;
    harness.push(&service("critical", 1016)).await;

    assert_eq!(harness.drain().await, ProcessorExit::QueueEmpty);
    assert_eq!(harness.processor.queue().rejected().await.unwrap(), vec![huge]);
    assert!(harness.checks().acknowledgement(&check_id()).await.unwrap().is_none());
    assert_eq!(harness.sent().await.len(), 2);
    assert_eq!(harness.processor.counters().global().await.unwrap().invalid, 1);
}

/// 告警保存失败时不投递，也不留下半写入的记录
#[tokio::test]
async fn test_failed_alert_save_is_not_delivered() {
    let harness = Harness::draining().await.with_contact().await;
    harness.store.set(&keys::check_alerts(&check_id()), "not a list").await.unwrap();
    harness.push(&service("critical", 1000)).await;
    harness.push(&service("critical", 1016)).await;
    harness.drain().await;

    assert!(harness.sent().await.is_empty());
    for medium in [MediumType::Email, MediumType::Sms] {
        assert!(harness
            .store
            .lrange(&keys::medium_alerts("alice", medium), 0, -1)
            .await
            .unwrap()
            .is_empty());
    }
}

/// 确认后同一故障被拦截，确认本身会发出通知
#[tokio::test]
async fn test_acknowledgement_flow() {
    let harness = Harness::draining().await.with_contact().await;
    harness.push(&service("critical", 1000)).await;
    harness.push(&action("acknowledgement", 1005)).await;
    harness.push(&service("critical", 1060)).await;
    harness.drain().await;

    let sent = harness.sent().await;
    assert_eq!(sent.len(), 2);
    assert!(sent.iter().all(|a| a.notification_type == NotificationType::Acknowledgement));
    assert!(sent.iter().all(|a| a.acknowledgement_duration == Some(3600)));

    let ack = harness.checks().acknowledgement(&check_id()).await.unwrap().unwrap();
    assert_eq!(ack.expires_at, 4605);
    assert!(harness
        .store
        .smembers(&keys::medium_alerting_checks("alice", MediumType::Email))
        .await
        .unwrap()
        .is_empty());
}

/// 对正常的检查确认会被拦截
#[tokio::test]
async fn test_acknowledging_ok_check_is_blocked() {
    let harness = Harness::draining().await.with_contact().await;
    harness.push(&service("ok", 1000)).await;
    harness.push(&action("acknowledgement", 1010)).await;
    harness.drain().await;

    assert!(harness.sent().await.is_empty());
    assert!(harness.checks().acknowledgement(&check_id()).await.unwrap().is_none());
}

/// 停止指令只结束实例循环
#[tokio::test]
async fn test_stop_ends_waiting_loop() {
    let harness = Harness::new(VigilConfig::default()).await.with_contact().await;

    let processor = harness.processor.clone();
    let running = tokio::spawn(async move { processor.run().await });

    harness.push(&service("critical", 1000)).await;
    harness.push(&service("critical", 1030)).await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    harness.processor.stop_handle().stop().await.unwrap();

    let exit = timeout(Duration::from_secs(5), running)
        .await
        .expect("processor did not stop")
        .unwrap()
        .unwrap();
    assert_eq!(exit, ProcessorExit::Stopped);
    assert_eq!(harness.sent().await.len(), 2);
    assert!(harness.processor.queue().is_empty().await.unwrap());
}

/// 启动时登记实例，重启不清空全局计数
#[tokio::test]
async fn test_start_registers_instance() {
    let harness = Harness::draining().await;
    harness.push(&service("ok", 1000)).await;
    harness.drain().await;

    harness.processor.start().await.unwrap();
    assert_eq!(harness.processor.counters().global().await.unwrap().all, 1);
    assert_eq!(harness.processor.counters().instance().await.unwrap().all, 0);

    let instances = harness.store.zrange_with_scores(keys::EXECUTIVE_INSTANCES).await.unwrap();
    assert_eq!(instances.len(), 1);
    assert_eq!(instances[0].0, "test-host:1000");
    assert!(harness
        .store
        .hget(&keys::executive_instance("test-host:1000"), "boot_time")
        .await
        .unwrap()
        .is_some());
}

/// 从配置文件构建处理器
#[tokio::test]
async fn test_processor_from_config_file() {
    let temp_dir = tempfile::tempdir().unwrap();
    let path = temp_dir.path().join("vigil.toml");
    std::fs::write(
        &path,
        r#"
[processor]
queue = "staging_events"
exit_on_queue_empty = true

[filters]
initial_failure_delay_secs = 0
"#,
    )
    .unwrap();

    let config = ConfigLoader::new(&path).load().unwrap();
    let harness = Harness::new(config).await.with_contact().await;
    assert_eq!(harness.processor.queue().name(), "staging_events");

    // 事件自带的延迟优先于配置
    harness.push(&service("warning", 1000)).await;
    harness.drain().await;
    assert!(harness.sent().await.is_empty());

    harness
        .push(r#"{"entity":"web-01","check":"HTTP","type":"service","state":"critical","time":2000}"#)
        .await;
    harness.drain().await;
    assert_eq!(harness.sent().await.len(), 2);
}
