// Lock-free notification channel

use crate::messaging::notification::Notification;
use ringbuf::traits::{Producer, Split};
use ringbuf::HeapRb;

pub type NotificationProducer = ringbuf::HeapProd<Notification>;
pub type NotificationConsumer = ringbuf::HeapCons<Notification>;

pub fn create_notification_channel(
    capacity: usize,
) -> (NotificationProducer, NotificationConsumer) {
    let rb = HeapRb::<Notification>::new(capacity.max(1));
    rb.split()
}

/// Sending half held by the document.
///
/// Sending never blocks; when the view layer falls behind and the buffer is
/// full the notification is dropped.
#[derive(Default)]
pub struct Notifier {
    producer: Option<NotificationProducer>,
    dropped: u64,
}

impl Notifier {
    pub fn new(producer: NotificationProducer) -> Self {
        Self {
            producer: Some(producer),
            dropped: 0,
        }
    }

    /// A notifier with no listener
    pub fn disconnected() -> Self {
        Self::default()
    }

    pub fn send(&mut self, notification: Notification) {
        let Some(producer) = self.producer.as_mut() else {
            return;
        };
        if producer.try_push(notification).is_err() {
            self.dropped += 1;
            log::warn!(
                "notification buffer full, {} notification(s) dropped so far",
                self.dropped
            );
        }
    }

    /// Number of notifications dropped because the buffer was full
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

impl std::fmt::Debug for Notifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier")
            .field("connected", &self.producer.is_some())
            .field("dropped", &self.dropped)
            .finish()
    }
}
