use crate::notifier::Notifier;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, info};
use vigil_types::{Alert, MediumType};

/// 通知管理器，按媒介类型分派告警
pub struct NotifyManager {
    notifiers: Arc<RwLock<HashMap<MediumType, Box<dyn Notifier>>>>,
}

impl NotifyManager {
    pub fn new() -> Self {
        Self {
            notifiers: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// 注册通知器
    pub async fn register(&self, medium: MediumType, notifier: Box<dyn Notifier>) {
        let mut notifiers = self.notifiers.write().await;
        info!(medium = %medium, notifier = notifier.name(), "Registered notifier");
        notifiers.insert(medium, notifier);
    }

    pub async fn registered(&self) -> Vec<MediumType> {
        let mut media: Vec<MediumType> = self.notifiers.read().await.keys().copied().collect();
        media.sort();
        media
    }

    /// 投递单条告警，返回是否成功；错误只记录日志
    pub async fn send(&self, alert: &Alert) -> bool {
        let notifiers = self.notifiers.read().await;

        let notifier = match notifiers.get(&alert.medium) {
            Some(notifier) if notifier.is_enabled() => notifier,
            _ => {
                debug!(alert_id = %alert.id, medium = %alert.medium, "No notifier for medium");
                return false;
            }
        };

        match notifier.send(alert).await {
            Ok(result) if result.success => {
                info!(
                    alert_id = %alert.id,
                    notifier = notifier.name(),
                    address = %alert.address,
                    "Alert delivered"
                );
                true
            }
            Ok(result) => {
                error!(alert_id = %alert.id, notifier = notifier.name(), "Alert delivery failed: {}", result.message);
                false
            }
            Err(e) => {
                error!(alert_id = %alert.id, notifier = notifier.name(), "Alert delivery error: {}", e);
                false
            }
        }
    }

    /// 依次投递，返回成功数量
    pub async fn dispatch(&self, alerts: &[Alert]) -> usize {
        let mut delivered = 0;
        for alert in alerts {
            if self.send(alert).await {
                delivered += 1;
            }
        }
        delivered
    }
}

impl Default for NotifyManager {
    fn default() -> Self {
        Self::new()
    }
}
