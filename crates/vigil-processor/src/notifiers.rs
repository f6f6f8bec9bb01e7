use tracing::info;
use vigil_config::NotifiersConfig;
use vigil_notify::{EmailNotifier, LogNotifier, NotifyManager, WebhookNotifier};
use vigil_types::MediumType;

/// 经 webhook 网关投递的媒介
const WEBHOOK_MEDIA: [MediumType; 3] = [MediumType::Sms, MediumType::Pagerduty, MediumType::Webhook];

/// 按配置注册各媒介的通知器，未配置的媒介只写日志
pub async fn build_notify_manager(config: &NotifiersConfig) -> NotifyManager {
    let manager = NotifyManager::new();

    match &config.email {
        Some(email) => {
            manager
                .register(MediumType::Email, Box::new(EmailNotifier::new(email.clone())))
                .await
        }
        None => manager.register(MediumType::Email, Box::new(LogNotifier)).await,
    }

    for medium in WEBHOOK_MEDIA {
        match &config.webhook {
            Some(webhook) => {
                manager
                    .register(medium, Box::new(WebhookNotifier::new(webhook.clone())))
                    .await
            }
            None => manager.register(medium, Box::new(LogNotifier)).await,
        }
    }

    manager.register(MediumType::Jabber, Box::new(LogNotifier)).await;

    info!(
        email = config.email.is_some(),
        webhook = config.webhook.is_some(),
        "Notifiers configured"
    );
    manager
}
