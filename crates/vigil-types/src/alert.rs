use crate::check::{CheckId, CheckStatus};
use crate::contact::MediumType;
use crate::notification::{Notification, NotificationType};
use serde::{Deserialize, Serialize};

/// 汇总告警中的一项
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollupEntry {
    pub check_id: CheckId,
    pub state: CheckStatus,
    pub duration: i64,
}

/// 一条待投递的告警消息，每个 (联系人, 媒介) 一条，保存后不再修改
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: String,
    pub notification_id: String,
    pub contact_id: String,
    pub medium: MediumType,
    pub address: String,
    pub rollup: bool,
    #[serde(default)]
    pub rollup_alerts: Vec<RollupEntry>,
    #[serde(default)]
    pub acknowledgement_duration: Option<i64>,
    pub state: CheckStatus,
    pub state_duration: i64,
    pub notification_type: NotificationType,
    pub check_id: CheckId,
    pub summary: String,
    pub time: i64,
}

impl Alert {
    pub fn new(
        notification: &Notification,
        contact_id: impl Into<String>,
        medium: MediumType,
        address: impl Into<String>,
        rollup: bool,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            notification_id: notification.id.clone(),
            contact_id: contact_id.into(),
            medium,
            address: address.into(),
            rollup,
            rollup_alerts: Vec::new(),
            acknowledgement_duration: notification.acknowledgement_duration,
            state: notification.severity,
            state_duration: notification.duration,
            notification_type: notification.notification_type,
            check_id: notification.check_id.clone(),
            summary: notification.summary.clone(),
            time: notification.time,
        }
    }

    pub fn with_rollup_alerts(mut self, entries: Vec<RollupEntry>) -> Self {
        self.rollup_alerts = entries;
        self
    }

    /// 投递用的标题
    pub fn subject(&self) -> String {
        if self.rollup {
            return format!(
                "{} checks alerting on {}",
                self.rollup_alerts.len(),
                self.medium
            );
        }
        match self.notification_type {
            NotificationType::Problem => format!(
                "PROBLEM: {} is {}",
                self.check_id,
                self.state.as_str().to_uppercase()
            ),
            NotificationType::Recovery => format!("RECOVERY: {} is OK", self.check_id),
            NotificationType::Acknowledgement => format!("ACKNOWLEDGED: {}", self.check_id),
            NotificationType::Test => format!("TEST: {}", self.check_id),
        }
    }
}
