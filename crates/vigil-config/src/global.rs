use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use vigil_notify::{EmailConfig, WebhookConfig};
use vigil_types::parse_utc_offset;

/// 全局配置
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct VigilConfig {
    pub processor: ProcessorConfig,
    pub filters: FilterConfig,
    pub notifications: NotificationConfig,
    pub store: StoreConfig,
    pub logging: LoggingConfig,
    pub notifiers: NotifiersConfig,
}

/// 事件处理器配置
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ProcessorConfig {
    /// 事件队列名
    pub queue: String,
    /// 队列清空后退出整个进程
    pub exit_on_queue_empty: bool,
    /// 实例级键的过期时间（秒）
    pub instance_ttl_secs: u64,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            queue: "events".to_string(),
            exit_on_queue_empty: false,
            instance_ttl_secs: 7 * 24 * 3600,
        }
    }
}

/// 过滤器配置
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct FilterConfig {
    pub initial_failure_delay_secs: i64,
    /// 确认动作未携带时长时使用
    pub default_acknowledgement_secs: i64,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            initial_failure_delay_secs: 30,
            default_acknowledgement_secs: 4 * 3600,
        }
    }
}

/// 通知配置
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct NotificationConfig {
    /// 联系人未设置时区时使用，UTC 偏移形式
    pub default_timezone: String,
}

impl NotificationConfig {
    pub fn default_offset(&self) -> Option<FixedOffset> {
        parse_utc_offset(&self.default_timezone)
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            default_timezone: "+00:00".to_string(),
        }
    }
}

/// 存储配置
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreConfig {
    /// `memory://` 或 `redis://host:port/db`
    pub url: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: "memory://".to_string(),
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// 投递渠道配置，未配置的渠道只写日志
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct NotifiersConfig {
    pub email: Option<EmailConfig>,
    pub webhook: Option<WebhookConfig>,
}
