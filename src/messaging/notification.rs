// Change notifications raised by the editing core for a view layer

use crate::model::ids::{LinkedParameterId, NodeId, ParameterId};
use std::time::{SystemTime, UNIX_EPOCH};

/// Node property whose value changed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Property {
    Name,
    Description,
    Type,
    IsDisabled,
    IsMetaModule,
    IsDirty,
}

/// What changed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationKind {
    PropertyChanged { node: NodeId, property: Property },
    ChildrenChanged { node: NodeId },
    ParametersChanged { node: NodeId },
    ParameterValueChanged { parameter: ParameterId },
    IsLinkedChanged { parameter: ParameterId },
    LinkedParameterAdded { linked: LinkedParameterId },
    LinkedParameterRemoved { linked: LinkedParameterId },
    LinkedParameterChanged { linked: LinkedParameterId },
    ModelSystemDescriptionChanged,
    /// A command was executed, undone or redone
    CommandExecuted { name: String },
    Saved,
    /// The document was rebuilt from the persisted structure
    Reloaded,
    SessionClosed,
}

/// Notification with its creation time
#[derive(Debug, Clone)]
pub struct Notification {
    pub kind: NotificationKind,
    pub timestamp: u64, // Unix timestamp in milliseconds
}

impl Notification {
    pub fn new(kind: NotificationKind) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;

        Self { kind, timestamp }
    }

    pub fn property(node: NodeId, property: Property) -> Self {
        Self::new(NotificationKind::PropertyChanged { node, property })
    }

    pub fn command_executed(name: impl Into<String>) -> Self {
        Self::new(NotificationKind::CommandExecuted { name: name.into() })
    }

    /// True if the notification is younger than `max_age_ms`
    pub fn is_recent(&self, max_age_ms: u64) -> bool {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;

        now.saturating_sub(self.timestamp) < max_age_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notification_creation() {
        let node = NodeId::generate();
        let notif = Notification::property(node, Property::Name);

        assert_eq!(
            notif.kind,
            NotificationKind::PropertyChanged {
                node,
                property: Property::Name
            }
        );
        assert!(notif.timestamp > 0);
    }

    #[test]
    fn test_notification_is_recent() {
        let notif = Notification::command_executed("Set Module Name");

        assert!(notif.is_recent(1000));
        assert!(notif.is_recent(10_000));
    }
}
