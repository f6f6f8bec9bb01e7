pub mod generator;
pub mod manager;
pub mod notifier;
pub mod providers;
pub mod rule;

pub use generator::NotificationGenerator;
pub use manager::NotifyManager;
pub use notifier::{Notifier, NotifyResult};
pub use providers::{EmailConfig, EmailNotifier, LogNotifier, WebhookConfig, WebhookNotifier};
pub use rule::{contact_offset, matching_media, rule_matches};
