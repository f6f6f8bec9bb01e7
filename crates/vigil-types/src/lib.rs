pub mod alert;
pub mod check;
pub mod contact;
pub mod event;
pub mod notification;

pub use alert::{Alert, RollupEntry};
pub use check::{Acknowledgement, CheckId, CheckState, CheckStatus, MaintenanceWindow};
pub use contact::{parse_utc_offset, Contact, Medium, MediumType, NotificationRule, TimeRestriction};
pub use event::{ActionKind, Event, EventClass, EventError, EventState, EventType};
pub use notification::{Notification, NotificationType};
