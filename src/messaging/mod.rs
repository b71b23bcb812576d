// Notification channel between the editing core and a presentation layer

pub mod channels;
pub mod notification;

pub use channels::{NotificationConsumer, NotificationProducer, Notifier, create_notification_channel};
pub use notification::{Notification, NotificationKind, Property};
