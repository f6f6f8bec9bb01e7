use crate::check::{CheckId, CheckStatus};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;

/// 事件解析错误
#[derive(Error, Debug)]
pub enum EventError {
    /// 不是合法的 JSON
    #[error("Malformed event payload: {0}")]
    Json(#[from] serde_json::Error),

    /// 字段缺失或取值非法
    #[error("Invalid event: {0}")]
    Invalid(String),
}

impl EventError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        EventError::Invalid(msg.into())
    }
}

/// 事件类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Service,
    Action,
}

/// 动作事件的种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// 确认故障
    Acknowledgement,
    /// 测试通知
    TestNotifications,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Acknowledgement => "acknowledgement",
            ActionKind::TestNotifications => "test_notifications",
        }
    }
}

/// 事件上报的状态，按事件类型区分取值范围
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventState {
    Service(CheckStatus),
    Action(ActionKind),
}

impl fmt::Display for EventState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventState::Service(status) => f.write_str(status.as_str()),
            EventState::Action(kind) => f.write_str(kind.as_str()),
        }
    }
}

/// 计数分类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventClass {
    Ok,
    Failure,
    Action,
}

impl EventClass {
    /// 对应的计数器字段名
    pub fn counter(&self) -> &'static str {
        match self {
            EventClass::Ok => "ok",
            EventClass::Failure => "failure",
            EventClass::Action => "action",
        }
    }
}

/// 队列中的原始记录
#[derive(Debug, Deserialize)]
struct RawEvent {
    entity: String,
    check: String,
    #[serde(rename = "type")]
    event_type: EventType,
    state: String,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    details: Option<String>,
    time: i64,
    #[serde(default)]
    tags: Option<Vec<String>>,
    #[serde(default)]
    duration: Option<i64>,
    #[serde(default)]
    acknowledgement_id: Option<String>,
    #[serde(default)]
    initial_failure_delay: Option<i64>,
}

/// 一次检查观测事件，解析后不可变
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub entity: String,
    pub check: String,
    pub state: EventState,
    pub summary: String,
    pub details: Option<String>,
    /// 事件时间（秒）
    pub time: i64,
    pub tags: BTreeSet<String>,
    /// 确认持续时间（秒），仅对确认动作有意义
    pub duration: Option<i64>,
    pub acknowledgement_id: Option<String>,
    /// 覆盖配置中的首次故障延迟（秒）
    pub initial_failure_delay: Option<i64>,
}

impl Event {
    /// 解析并校验一条队列记录
    pub fn parse(raw: &str) -> Result<Self, EventError> {
        let value: serde_json::Value = serde_json::from_str(raw)?;
        if !value.is_object() {
            return Err(EventError::invalid("event must be a JSON object"));
        }
        let raw: RawEvent = serde_json::from_value(value)?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawEvent) -> Result<Self, EventError> {
        if raw.entity.trim().is_empty() {
            return Err(EventError::invalid("entity must not be empty"));
        }
        if raw.check.trim().is_empty() {
            return Err(EventError::invalid("check must not be empty"));
        }
        if raw.time < 0 {
            return Err(EventError::invalid(format!("time must not be negative: {}", raw.time)));
        }

        let state = match raw.event_type {
            EventType::Service => EventState::Service(
                raw.state.parse::<CheckStatus>().map_err(EventError::Invalid)?,
            ),
            EventType::Action => match raw.state.to_ascii_lowercase().as_str() {
                "acknowledgement" => EventState::Action(ActionKind::Acknowledgement),
                "test_notifications" => EventState::Action(ActionKind::TestNotifications),
                other => {
                    return Err(EventError::invalid(format!("invalid action state: {}", other)))
                }
            },
        };

        if let Some(duration) = raw.duration {
            if duration <= 0 {
                return Err(EventError::invalid(format!(
                    "duration must be positive: {}",
                    duration
                )));
            }
            // 确认到期时间 = time + duration，必须可表示
            if raw.time.checked_add(duration).is_none() {
                return Err(EventError::invalid(format!(
                    "duration out of range: {}",
                    duration
                )));
            }
        }
        if let Some(delay) = raw.initial_failure_delay {
            if delay < 0 {
                return Err(EventError::invalid(format!(
                    "initial_failure_delay must not be negative: {}",
                    delay
                )));
            }
        }

        Ok(Self {
            entity: raw.entity,
            check: raw.check,
            state,
            summary: raw.summary.unwrap_or_default(),
            details: raw.details,
            time: raw.time,
            tags: raw.tags.unwrap_or_default().into_iter().collect(),
            duration: raw.duration,
            acknowledgement_id: raw.acknowledgement_id,
            initial_failure_delay: raw.initial_failure_delay,
        })
    }

    pub fn check_id(&self) -> CheckId {
        CheckId::new(&self.entity, &self.check)
    }

    pub fn event_type(&self) -> EventType {
        match self.state {
            EventState::Service(_) => EventType::Service,
            EventState::Action(_) => EventType::Action,
        }
    }

    pub fn is_service(&self) -> bool {
        matches!(self.state, EventState::Service(_))
    }

    pub fn is_action(&self) -> bool {
        matches!(self.state, EventState::Action(_))
    }

    /// 上报的检查状态；动作事件返回 None
    pub fn status(&self) -> Option<CheckStatus> {
        match self.state {
            EventState::Service(status) => Some(status),
            EventState::Action(_) => None,
        }
    }

    /// 服务事件且处于故障状态
    pub fn is_failure(&self) -> bool {
        self.status().map(|s| s.is_failure()).unwrap_or(false)
    }

    pub fn is_acknowledgement(&self) -> bool {
        self.state == EventState::Action(ActionKind::Acknowledgement)
    }

    pub fn class(&self) -> EventClass {
        match self.state {
            EventState::Service(CheckStatus::Ok) => EventClass::Ok,
            EventState::Service(_) => EventClass::Failure,
            EventState::Action(_) => EventClass::Action,
        }
    }
}
