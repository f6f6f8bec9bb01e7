use chrono::FixedOffset;
use tracing::{debug, info, warn};
use vigil_core::{keys, Result, SharedStore, StoreOp};
use vigil_data::{CheckRepository, ContactRepository};
use vigil_types::{Alert, CheckId, CheckStatus, Contact, Medium, Notification, NotificationType, RollupEntry};

use crate::rule::matching_media;

/// 通知生成器：把一条通知展开为每个 (联系人, 媒介) 的告警
pub struct NotificationGenerator {
    store: SharedStore,
    checks: CheckRepository,
    contacts: ContactRepository,
    default_timezone: FixedOffset,
}

impl NotificationGenerator {
    pub fn new(store: SharedStore, default_timezone: FixedOffset) -> Self {
        Self {
            checks: CheckRepository::new(store.clone()),
            contacts: ContactRepository::new(store.clone()),
            store,
            default_timezone,
        }
    }

    /// 生成并保存告警，按联系人顺序、媒介顺序返回
    ///
    /// 单条告警保存失败只记录日志并跳过，其他存储错误向上传播。
    pub async fn generate(&self, notification: &Notification, contacts: &[Contact]) -> Result<Vec<Alert>> {
        let mut alerts = Vec::new();

        for contact in contacts {
            let media = matching_media(contact, notification, self.default_timezone);
            if media.is_empty() {
                debug!(
                    contact_id = %contact.id,
                    notification_id = %notification.id,
                    "No notification rule matched"
                );
                continue;
            }

            for medium in media {
                if medium.address.is_empty() {
                    continue;
                }
                if let Some(alert) = self.alert_for_medium(notification, contact, medium).await? {
                    alerts.push(alert);
                }
            }
        }

        info!(
            check = %notification.check_id,
            notification_id = %notification.id,
            notification_type = %notification.notification_type,
            alerts = alerts.len(),
            "Notification generated"
        );
        Ok(alerts)
    }

    async fn alert_for_medium(
        &self,
        notification: &Notification,
        contact: &Contact,
        medium: &Medium,
    ) -> Result<Option<Alert>> {
        let medium_type = medium.medium_type;
        let check_id = &notification.check_id;

        // 先清理再计算阈值
        self.cleanup_alerting_checks(contact, medium, notification.time).await?;

        match notification.notification_type {
            NotificationType::Problem => {
                self.contacts.add_alerting_check(&contact.id, medium_type, check_id).await?;
            }
            NotificationType::Recovery | NotificationType::Acknowledgement => {
                self.contacts.remove_alerting_check(&contact.id, medium_type, check_id).await?;
            }
            NotificationType::Test => {}
        }

        let alerting = self.contacts.alerting_checks(&contact.id, medium_type).await?;
        let rollup = medium
            .rollup_threshold
            .map(|threshold| alerting.len() > threshold as usize)
            .unwrap_or(false);

        let mut alert = Alert::new(notification, contact.id.clone(), medium_type, medium.address.clone(), rollup);
        if rollup {
            alert = alert.with_rollup_alerts(self.rollup_entries(&alerting, notification.time).await?);
        }

        if let Err(e) = self.persist(&alert).await {
            warn!(
                contact_id = %contact.id,
                medium = %medium_type,
                alert_id = %alert.id,
                "Failed to save alert: {}", e
            );
            return Ok(None);
        }

        debug!(
            contact_id = %contact.id,
            medium = %medium_type,
            alert_id = %alert.id,
            rollup,
            "Alert created"
        );
        Ok(Some(alert))
    }

    /// 移除已恢复、无状态、处于维护或已确认的检查
    async fn cleanup_alerting_checks(&self, contact: &Contact, medium: &Medium, time: i64) -> Result<()> {
        for id in self.contacts.alerting_checks(&contact.id, medium.medium_type).await? {
            let stale = match self.checks.current_state(&id).await? {
                None => true,
                Some(state) if state.status == CheckStatus::Ok => true,
                Some(_) => {
                    self.checks.in_maintenance(&id, time).await?
                        || self.checks.is_acknowledged(&id, time).await?
                }
            };
            if stale {
                self.contacts
                    .remove_alerting_check(&contact.id, medium.medium_type, &id)
                    .await?;
                debug!(contact_id = %contact.id, medium = %medium.medium_type, check = %id, "Alerting check cleaned up");
            }
        }
        Ok(())
    }

    async fn rollup_entries(&self, alerting: &[CheckId], time: i64) -> Result<Vec<RollupEntry>> {
        let mut entries = Vec::with_capacity(alerting.len());
        for id in alerting {
            if let Some(state) = self.checks.current_state(id).await? {
                entries.push(RollupEntry {
                    check_id: id.clone(),
                    state: state.status,
                    duration: state.duration_at(time),
                });
            }
        }
        Ok(entries)
    }

    async fn persist(&self, alert: &Alert) -> Result<()> {
        let raw = serde_json::to_string(alert)?;
        self.store
            .transaction(vec![
                StoreOp::set(keys::alert(&alert.id), raw),
                StoreOp::rpush(keys::medium_alerts(&alert.contact_id, alert.medium), alert.id.clone()),
                StoreOp::rpush(keys::check_alerts(&alert.check_id), alert.id.clone()),
            ])
            .await
    }
}
