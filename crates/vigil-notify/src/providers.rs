use crate::notifier::{Notifier, NotifyResult};
use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::info;
use vigil_types::Alert;

/// 告警正文
pub fn render_body(alert: &Alert) -> String {
    let mut body = format!(
        "{}\n\nCheck: {}\nState: {} for {}s\nType: {}\nTime: {}\n",
        alert.summary,
        alert.check_id,
        alert.state,
        alert.state_duration,
        alert.notification_type,
        alert.time
    );
    if let Some(duration) = alert.acknowledgement_duration {
        body.push_str(&format!("Acknowledged for: {}s\n", duration));
    }
    if alert.rollup {
        body.push_str("\nAlerting checks:\n");
        for entry in &alert.rollup_alerts {
            body.push_str(&format!("  {} {} for {}s\n", entry.check_id, entry.state, entry.duration));
        }
    }
    body
}

// ============================================================================
// 邮件通知
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailConfig {
    pub smtp_host: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    pub from: String,
}

fn default_smtp_port() -> u16 {
    587
}

pub struct EmailNotifier {
    config: EmailConfig,
    enabled: bool,
}

impl EmailNotifier {
    pub fn new(config: EmailConfig) -> Self {
        Self {
            config,
            enabled: true,
        }
    }

    fn build_message(&self, alert: &Alert) -> Result<lettre::Message> {
        use lettre::message::header::ContentType;

        Ok(lettre::Message::builder()
            .from(self.config.from.parse()?)
            .to(alert.address.parse()?)
            .subject(alert.subject())
            .header(ContentType::TEXT_PLAIN)
            .body(render_body(alert))?)
    }
}

#[async_trait]
impl Notifier for EmailNotifier {
    async fn send(&self, alert: &Alert) -> Result<NotifyResult> {
        use lettre::transport::smtp::authentication::Credentials;
        use lettre::{AsyncSmtpTransport, AsyncTransport, Tokio1Executor};

        let email = self.build_message(alert)?;

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::relay(&self.config.smtp_host)?
            .port(self.config.smtp_port);
        if !self.config.username.is_empty() {
            builder = builder.credentials(Credentials::new(
                self.config.username.clone(),
                self.config.password.clone(),
            ));
        }
        let mailer = builder.build();

        match mailer.send(email).await {
            Ok(_) => Ok(NotifyResult::success()),
            Err(e) => Ok(NotifyResult::failure(format!("Email send failed: {}", e))),
        }
    }

    fn name(&self) -> &'static str {
        "email"
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }
}

// ============================================================================
// Webhook 通知（短信网关、PagerDuty、聊天机器人等）
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookConfig {
    pub url: String,
    #[serde(default)]
    pub headers: Option<HashMap<String, String>>,
}

pub struct WebhookNotifier {
    config: WebhookConfig,
    client: reqwest::Client,
    enabled: bool,
}

impl WebhookNotifier {
    pub fn new(config: WebhookConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
            enabled: true,
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn send(&self, alert: &Alert) -> Result<NotifyResult> {
        let mut request = self.client.post(&self.config.url);

        if let Some(headers) = &self.config.headers {
            for (key, value) in headers {
                request = request.header(key, value);
            }
        }

        let payload = serde_json::json!({
            "subject": alert.subject(),
            "body": render_body(alert),
            "alert": alert,
        });
        let response = request.json(&payload).send().await?;

        if response.status().is_success() {
            Ok(NotifyResult::success())
        } else {
            Ok(NotifyResult::failure(format!(
                "Webhook failed with status: {}",
                response.status()
            )))
        }
    }

    fn name(&self) -> &'static str {
        "webhook"
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }
}

// ============================================================================
// 日志通知
// ============================================================================

/// 只写日志的通知器，用于没有配置投递渠道的媒介
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, alert: &Alert) -> Result<NotifyResult> {
        info!(
            alert_id = %alert.id,
            contact_id = %alert.contact_id,
            medium = %alert.medium,
            address = %alert.address,
            rollup = alert.rollup,
            "{}",
            alert.subject()
        );
        Ok(NotifyResult::success())
    }

    fn name(&self) -> &'static str {
        "log"
    }
}
