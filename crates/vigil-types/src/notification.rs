use crate::check::{CheckId, CheckState, CheckStatus};
use crate::event::{ActionKind, Event, EventState};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// 通知类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    Problem,
    Recovery,
    Acknowledgement,
    Test,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::Problem => "problem",
            NotificationType::Recovery => "recovery",
            NotificationType::Acknowledgement => "acknowledgement",
            NotificationType::Test => "test",
        }
    }
}

impl fmt::Display for NotificationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 由通过过滤链的事件生成的通知
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub check_id: CheckId,
    /// 严重级别（当前状态）
    pub severity: CheckStatus,
    pub notification_type: NotificationType,
    pub summary: String,
    #[serde(default)]
    pub details: Option<String>,
    /// 事件时间（秒）
    pub time: i64,
    /// 在当前状态中持续的秒数
    pub duration: i64,
    /// 确认持续时间，仅确认通知携带
    #[serde(default)]
    pub acknowledgement_duration: Option<i64>,
    #[serde(default)]
    pub tags: BTreeSet<String>,
}

impl Notification {
    pub fn from_event(event: &Event, current: &CheckState) -> Self {
        let (severity, notification_type) = match event.state {
            EventState::Service(CheckStatus::Ok) => (CheckStatus::Ok, NotificationType::Recovery),
            EventState::Service(status) => (status, NotificationType::Problem),
            EventState::Action(ActionKind::Acknowledgement) => {
                (current.status, NotificationType::Acknowledgement)
            }
            EventState::Action(ActionKind::TestNotifications) => {
                (current.status, NotificationType::Test)
            }
        };

        let acknowledgement_duration = match notification_type {
            NotificationType::Acknowledgement => event.duration,
            _ => None,
        };

        let mut tags = event.tags.clone();
        tags.insert(event.entity.clone());
        tags.insert(event.check.clone());

        let summary = if event.summary.is_empty() {
            current.summary().to_string()
        } else {
            event.summary.clone()
        };

        Self {
            id: uuid::Uuid::new_v4().to_string(),
            check_id: event.check_id(),
            severity,
            notification_type,
            summary,
            details: event.details.clone(),
            time: event.time,
            duration: current.duration_at(event.time),
            acknowledgement_duration,
            tags,
        }
    }

    pub fn with_acknowledgement_duration(mut self, duration: i64) -> Self {
        if self.notification_type == NotificationType::Acknowledgement {
            self.acknowledgement_duration = Some(duration);
        }
        self
    }
}
