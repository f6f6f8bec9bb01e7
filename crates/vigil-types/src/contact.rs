use crate::check::CheckStatus;
use chrono::{Datelike, FixedOffset, NaiveDateTime, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// 通知媒介类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediumType {
    /// 邮件
    Email,
    /// 短信
    Sms,
    Jabber,
    Pagerduty,
    /// Webhook
    Webhook,
}

impl MediumType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediumType::Email => "email",
            MediumType::Sms => "sms",
            MediumType::Jabber => "jabber",
            MediumType::Pagerduty => "pagerduty",
            MediumType::Webhook => "webhook",
        }
    }
}

impl fmt::Display for MediumType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 联系人的一个投递渠道
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Medium {
    #[serde(rename = "type")]
    pub medium_type: MediumType,

    /// 投递地址（邮箱、手机号、URL 等）
    #[serde(default)]
    pub address: String,

    /// 同时告警的检查数超过该值后合并为汇总告警
    #[serde(default)]
    pub rollup_threshold: Option<u32>,
}

impl Medium {
    pub fn new(medium_type: MediumType, address: impl Into<String>) -> Self {
        Self {
            medium_type,
            address: address.into(),
            rollup_threshold: None,
        }
    }

    pub fn with_rollup_threshold(mut self, threshold: u32) -> Self {
        self.rollup_threshold = Some(threshold);
        self
    }
}

/// 时间段限制（联系人本地时间）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRestriction {
    /// 生效的星期，空表示每天
    #[serde(default)]
    pub days: Vec<Weekday>,
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl TimeRestriction {
    /// start > end 时视为跨夜时段
    pub fn covers(&self, local: NaiveDateTime) -> bool {
        let time = local.time();
        if self.start <= self.end {
            self.day_allowed(local.weekday()) && self.start <= time && time < self.end
        } else if time >= self.start {
            self.day_allowed(local.weekday())
        } else if time < self.end {
            // 跨夜时段的后半段属于前一天
            self.day_allowed(local.weekday().pred())
        } else {
            false
        }
    }

    fn day_allowed(&self, day: Weekday) -> bool {
        self.days.is_empty() || self.days.contains(&day)
    }
}

/// 通知规则
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRule {
    /// 匹配的严重级别，空表示全部
    #[serde(default)]
    pub severities: BTreeSet<CheckStatus>,

    /// 必须全部出现在通知标签中，空表示不限
    #[serde(default)]
    pub tags: BTreeSet<String>,

    /// 空表示任意时间
    #[serde(default)]
    pub time_restrictions: Vec<TimeRestriction>,

    /// 规则适用的媒介类型，空表示联系人的全部媒介
    #[serde(default)]
    pub media: Vec<MediumType>,
}

/// 联系人
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub id: String,

    #[serde(default)]
    pub name: String,

    /// UTC 偏移，如 "+08:00"；为空时使用默认时区
    #[serde(default)]
    pub timezone: Option<String>,

    #[serde(default)]
    pub media: Vec<Medium>,

    #[serde(default)]
    pub rules: Vec<NotificationRule>,
}

impl Contact {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            timezone: None,
            media: Vec::new(),
            rules: Vec::new(),
        }
    }

    pub fn with_medium(mut self, medium: Medium) -> Self {
        self.media.push(medium);
        self
    }

    pub fn with_rule(mut self, rule: NotificationRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn with_timezone(mut self, timezone: impl Into<String>) -> Self {
        self.timezone = Some(timezone.into());
        self
    }
}

/// 解析 "+HH:MM" / "-HH:MM" / "Z" 形式的 UTC 偏移
pub fn parse_utc_offset(value: &str) -> Option<FixedOffset> {
    let value = value.trim();
    if value.eq_ignore_ascii_case("z") || value.eq_ignore_ascii_case("utc") {
        return FixedOffset::east_opt(0);
    }

    let (sign, rest) = match value.as_bytes().first()? {
        b'+' => (1, &value[1..]),
        b'-' => (-1, &value[1..]),
        _ => return None,
    };
    let (hours, minutes) = rest.split_once(':').unwrap_or((rest, "0"));
    let hours: i32 = hours.parse().ok()?;
    let minutes: i32 = minutes.parse().ok()?;
    if !(0..=23).contains(&hours) || !(0..=59).contains(&minutes) {
        return None;
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}
