use anyhow::Result;
use async_trait::async_trait;
use vigil_types::Alert;

/// 通知结果
#[derive(Debug, Clone)]
pub struct NotifyResult {
    pub success: bool,
    pub message: String,
}

impl NotifyResult {
    pub fn success() -> Self {
        Self {
            success: true,
            message: "Alert delivered".to_string(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// 告警投递 trait，每种媒介一个实现
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    /// 投递告警
    async fn send(&self, alert: &Alert) -> Result<NotifyResult>;

    /// 通知器名称
    fn name(&self) -> &'static str;

    /// 是否启用
    fn is_enabled(&self) -> bool {
        true
    }
}
