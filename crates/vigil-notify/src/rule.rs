use chrono::{DateTime, FixedOffset, NaiveDateTime};
use std::collections::BTreeSet;
use tracing::warn;
use vigil_types::{parse_utc_offset, Contact, Medium, MediumType, Notification, NotificationRule};

/// 联系人所在时区，未设置或无法解析时使用默认时区
pub fn contact_offset(contact: &Contact, default: FixedOffset) -> FixedOffset {
    match contact.timezone.as_deref() {
        Some(tz) => parse_utc_offset(tz).unwrap_or_else(|| {
            warn!(contact_id = %contact.id, timezone = %tz, "Invalid contact timezone, using default");
            default
        }),
        None => default,
    }
}

/// 时间戳超出可表示范围时返回 None
fn local_time(time: i64, offset: FixedOffset) -> Option<NaiveDateTime> {
    DateTime::from_timestamp(time, 0).map(|utc| utc.with_timezone(&offset).naive_local())
}

/// 规则是否匹配通知：严重级别、标签、时间段均需满足
///
/// 本地时间未知时，带时间段限制的规则不匹配。
pub fn rule_matches(
    rule: &NotificationRule,
    notification: &Notification,
    local: Option<NaiveDateTime>,
) -> bool {
    if !rule.severities.is_empty() && !rule.severities.contains(&notification.severity) {
        return false;
    }
    if !rule.tags.is_subset(&notification.tags) {
        return false;
    }
    if rule.time_restrictions.is_empty() {
        return true;
    }
    match local {
        Some(local) => rule.time_restrictions.iter().any(|r| r.covers(local)),
        None => false,
    }
}

/// 联系人应收到该通知的媒介，按定义顺序
///
/// 没有任何规则的联系人视为匹配全部。匹配的规则中只要有一条未限定媒介，
/// 就使用全部媒介；否则取各规则媒介的并集。
pub fn matching_media<'a>(
    contact: &'a Contact,
    notification: &Notification,
    default_offset: FixedOffset,
) -> Vec<&'a Medium> {
    if contact.rules.is_empty() {
        return contact.media.iter().collect();
    }

    let local = local_time(notification.time, contact_offset(contact, default_offset));
    if local.is_none() {
        warn!(
            contact_id = %contact.id,
            notification_id = %notification.id,
            time = notification.time,
            "Notification time out of range, skipping time-restricted rules"
        );
    }
    let matched: Vec<&NotificationRule> = contact
        .rules
        .iter()
        .filter(|rule| rule_matches(rule, notification, local))
        .collect();

    if matched.is_empty() {
        return Vec::new();
    }
    if matched.iter().any(|rule| rule.media.is_empty()) {
        return contact.media.iter().collect();
    }

    let allowed: BTreeSet<MediumType> = matched
        .iter()
        .flat_map(|rule| rule.media.iter().copied())
        .collect();
    contact
        .media
        .iter()
        .filter(|m| allowed.contains(&m.medium_type))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveTime, Weekday};
    use vigil_types::{CheckState, CheckStatus, Event, TimeRestriction};

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    // 2024-01-01 是星期一，10:00 UTC
    const MONDAY_10AM: i64 = 1_704_103_200;

    fn notification(state: &str, tags: &str) -> Notification {
        let event = Event::parse(&format!(
            r#"{{"entity":"web","check":"HTTP","type":"service","state":"{}","time":{},"tags":{}}}"#,
            state, MONDAY_10AM, tags
        ))
        .unwrap();
        let current = CheckState::new(event.status().unwrap(), "", None, MONDAY_10AM);
        Notification::from_event(&event, &current)
    }

    fn contact() -> Contact {
        Contact::new("alice", "Alice")
            .with_medium(Medium::new(MediumType::Email, "alice@example.com"))
            .with_medium(Medium::new(MediumType::Sms, "+100"))
    }

    #[test]
    fn test_no_rules_matches_everything() {
        let n = notification("critical", "[]");
        assert_eq!(matching_media(&contact(), &n, utc()).len(), 2);
    }

    #[test]
    fn test_severity_and_tags() {
        let rule = NotificationRule {
            severities: [CheckStatus::Critical].into_iter().collect(),
            tags: ["prod".to_string()].into_iter().collect(),
            ..Default::default()
        };
        let c = contact().with_rule(rule);

        assert_eq!(matching_media(&c, &notification("critical", r#"["prod"]"#), utc()).len(), 2);
        assert!(matching_media(&c, &notification("warning", r#"["prod"]"#), utc()).is_empty());
        assert!(matching_media(&c, &notification("critical", r#"["dev"]"#), utc()).is_empty());
    }

    #[test]
    fn test_entity_name_counts_as_tag() {
        let rule = NotificationRule {
            tags: ["web".to_string()].into_iter().collect(),
            ..Default::default()
        };
        let c = contact().with_rule(rule);
        assert_eq!(matching_media(&c, &notification("critical", "[]"), utc()).len(), 2);
    }

    #[test]
    fn test_media_union_of_matching_rules() {
        let sms_only = NotificationRule {
            media: vec![MediumType::Sms],
            ..Default::default()
        };
        let c = contact().with_rule(sms_only);
        let media = matching_media(&c, &notification("critical", "[]"), utc());
        assert_eq!(media.len(), 1);
        assert_eq!(media[0].medium_type, MediumType::Sms);
    }

    #[test]
    fn test_time_restriction_uses_contact_timezone() {
        // 工作时间 09:00-17:00，周一至周五
        let business_hours = NotificationRule {
            time_restrictions: vec![TimeRestriction {
                days: vec![Weekday::Mon, Weekday::Tue, Weekday::Wed, Weekday::Thu, Weekday::Fri],
                start: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
                end: NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
            }],
            ..Default::default()
        };
        let n = notification("critical", "[]");

        let london = contact().with_rule(business_hours.clone());
        assert_eq!(matching_media(&london, &n, utc()).len(), 2);

        // UTC 10:00 在 +10:00 时区是 20:00，不在工作时间内
        let sydney = contact().with_rule(business_hours).with_timezone("+10:00");
        assert!(matching_media(&sydney, &n, utc()).is_empty());
    }

    #[test]
    fn test_time_out_of_range_skips_restricted_rules() {
        let mut n = notification("critical", "[]");
        n.time = i64::MAX;

        let restricted = NotificationRule {
            time_restrictions: vec![TimeRestriction {
                days: Vec::new(),
                start: NaiveTime::from_hms_opt(0, 0, 0).unwrap(),
                end: NaiveTime::from_hms_opt(23, 59, 59).unwrap(),
            }],
            ..Default::default()
        };
        assert!(matching_media(&contact().with_rule(restricted.clone()), &n, utc()).is_empty());

        let sms_any_time = NotificationRule {
            media: vec![MediumType::Sms],
            ..Default::default()
        };
        let c = contact().with_rule(restricted).with_rule(sms_any_time);
        let media = matching_media(&c, &n, utc());
        assert_eq!(media.len(), 1);
        assert_eq!(media[0].medium_type, MediumType::Sms);
    }

    #[test]
    fn test_invalid_timezone_falls_back() {
        let c = contact().with_timezone("Mars/Olympus");
        assert_eq!(contact_offset(&c, utc()), utc());
    }
}
