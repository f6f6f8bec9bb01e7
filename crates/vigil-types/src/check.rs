use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 检查状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    /// 正常
    Ok,
    /// 警告
    Warning,
    /// 严重
    Critical,
    /// 未知
    Unknown,
}

impl CheckStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckStatus::Ok => "ok",
            CheckStatus::Warning => "warning",
            CheckStatus::Critical => "critical",
            CheckStatus::Unknown => "unknown",
        }
    }

    /// 是否为故障状态（warning / critical / unknown）
    pub fn is_failure(&self) -> bool {
        !matches!(self, CheckStatus::Ok)
    }
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CheckStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ok" => Ok(CheckStatus::Ok),
            "warning" => Ok(CheckStatus::Warning),
            "critical" => Ok(CheckStatus::Critical),
            "unknown" => Ok(CheckStatus::Unknown),
            other => Err(format!("invalid check state: {}", other)),
        }
    }
}

/// 检查标识：实体 + 检查名
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CheckId {
    pub entity: String,
    pub check: String,
}

impl CheckId {
    pub fn new(entity: impl Into<String>, check: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            check: check.into(),
        }
    }
}

impl fmt::Display for CheckId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.entity, self.check)
    }
}

impl FromStr for CheckId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some((entity, check)) if !entity.is_empty() && !check.is_empty() => {
                Ok(CheckId::new(entity, check))
            }
            _ => Err(format!("invalid check id: {}", s)),
        }
    }
}

/// 一次状态观测记录
///
/// 状态变化时追加新记录；状态持续期间只更新当前记录的摘要和更新时间。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckState {
    /// 状态
    pub status: CheckStatus,

    /// 摘要（最新在前）
    #[serde(default)]
    pub summaries: Vec<String>,

    /// 详情
    #[serde(default)]
    pub details: Option<String>,

    /// 进入该状态的时间（秒）
    pub timestamp: i64,

    /// 最后一次观测时间（秒）
    pub last_update: i64,

    /// 是否已经为该状态发出通知
    #[serde(default)]
    pub notified: bool,

    /// 最近一次通知生成的告警数量
    #[serde(default)]
    pub last_notification_count: u32,
}

impl CheckState {
    pub fn new(
        status: CheckStatus,
        summary: impl Into<String>,
        details: Option<String>,
        timestamp: i64,
    ) -> Self {
        let summary = summary.into();
        Self {
            status,
            summaries: if summary.is_empty() { Vec::new() } else { vec![summary] },
            details,
            timestamp,
            last_update: timestamp,
            notified: false,
            last_notification_count: 0,
        }
    }

    /// 同一状态的再次观测
    pub fn observe(&mut self, summary: &str, details: Option<String>, time: i64) {
        if !summary.is_empty() {
            self.summaries.insert(0, summary.to_string());
        }
        if details.is_some() {
            self.details = details;
        }
        self.last_update = self.last_update.max(time);
    }

    /// 最新摘要
    pub fn summary(&self) -> &str {
        self.summaries.first().map(String::as_str).unwrap_or("")
    }

    /// 到 `now` 为止该状态持续的秒数
    pub fn duration_at(&self, now: i64) -> i64 {
        (now - self.timestamp).max(0)
    }
}

/// 维护窗口
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaintenanceWindow {
    pub start: i64,
    pub end: i64,
    #[serde(default)]
    pub summary: String,
}

impl MaintenanceWindow {
    pub fn new(start: i64, end: i64, summary: impl Into<String>) -> Self {
        Self {
            start,
            end,
            summary: summary.into(),
        }
    }

    pub fn covers(&self, time: i64) -> bool {
        self.start <= time && time < self.end
    }
}

/// 对当前故障状态的确认
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Acknowledgement {
    /// 被确认的状态
    pub status: CheckStatus,
    /// 过期时间（秒）
    pub expires_at: i64,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub acknowledgement_id: Option<String>,
}

impl Acknowledgement {
    pub fn is_active(&self, time: i64) -> bool {
        time < self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_id_round_trip() {
        let id = CheckId::new("web-01", "HTTP Port 80");
        assert_eq!(id.to_string(), "web-01:HTTP Port 80");
        assert_eq!("web-01:HTTP Port 80".parse::<CheckId>().unwrap(), id);
        assert!("no-separator".parse::<CheckId>().is_err());
    }

    #[test]
    fn test_check_state_observe() {
        let mut state = CheckState::new(CheckStatus::Critical, "down", None, 100);
        state.observe("still down", Some("timeout".to_string()), 130);

        assert_eq!(state.summaries, vec!["still down", "down"]);
        assert_eq!(state.summary(), "still down");
        assert_eq!(state.last_update, 130);
        // 持续时间从进入状态时算起
        assert_eq!(state.duration_at(130), 30);
        assert_eq!(state.duration_at(50), 0);
    }

    #[test]
    fn test_maintenance_window_bounds() {
        let window = MaintenanceWindow::new(100, 200, "patching");
        assert!(window.covers(100));
        assert!(window.covers(199));
        assert!(!window.covers(200));
        assert!(!window.covers(99));
    }

    #[test]
    fn test_status_parse() {
        assert_eq!("CRITICAL".parse::<CheckStatus>().unwrap(), CheckStatus::Critical);
        assert!("down".parse::<CheckStatus>().is_err());
        assert!(!CheckStatus::Ok.is_failure());
        assert!(CheckStatus::Unknown.is_failure());
    }
}
