//! 存储键命名空间。键名需要与已有部署保持兼容，不要随意修改。

use vigil_types::{CheckId, MediumType};

/// 全局事件计数器（hash）
pub const EVENT_COUNTERS: &str = "event_counters";

/// 按启动时间排序的实例集合（sorted set）
pub const EXECUTIVE_INSTANCES: &str = "executive_instances";

/// 控制通道中的停止指令
pub const STOP_TOKEN: &str = "stop";

/// 控制通道中的新事件提示
pub const EVENT_TOKEN: &str = "+";

pub fn instance_counters(instance: &str) -> String {
    format!("{}:{}", EVENT_COUNTERS, instance)
}

pub fn executive_instance(instance: &str) -> String {
    format!("executive_instance:{}", instance)
}

pub fn actions_channel(queue: &str) -> String {
    format!("{}_actions", queue)
}

/// 死信列表
///
/// 按队列名而不是实例 ID 命名：实例 ID 含启动时间，每次重启都会变化，
/// 按实例命名的旧列表 `events_rejected:<instance>` 不会被本版本写入。
pub fn rejected(queue: &str) -> String {
    format!("events_rejected:{}", queue)
}

pub fn check(id: &CheckId) -> String {
    format!("check:{}", id)
}

pub fn check_states(id: &CheckId) -> String {
    format!("check:{}:states", id)
}

pub fn check_state(id: &CheckId, seq: i64) -> String {
    format!("check:{}:state:{}", id, seq)
}

pub fn check_acknowledgement(id: &CheckId) -> String {
    format!("check:{}:acknowledgement", id)
}

pub fn scheduled_maintenances(id: &CheckId) -> String {
    format!("check:{}:scheduled_maintenances", id)
}

pub fn unscheduled_maintenances(id: &CheckId) -> String {
    format!("check:{}:unscheduled_maintenances", id)
}

pub fn check_alerts(id: &CheckId) -> String {
    format!("check:{}:alerts", id)
}

pub fn check_contacts(id: &CheckId) -> String {
    format!("check:{}:contacts", id)
}

pub fn entity_contacts(entity: &str) -> String {
    format!("entity:{}:contacts", entity)
}

pub fn contact(contact_id: &str) -> String {
    format!("contact:{}", contact_id)
}

pub fn medium_alerting_checks(contact_id: &str, medium: MediumType) -> String {
    format!("contact:{}:medium:{}:alerting_checks", contact_id, medium)
}

pub fn medium_alerts(contact_id: &str, medium: MediumType) -> String {
    format!("contact:{}:medium:{}:alerts", contact_id, medium)
}

pub fn notification(id: &str) -> String {
    format!("notification:{}", id)
}

pub fn alert(id: &str) -> String {
    format!("alert:{}", id)
}
