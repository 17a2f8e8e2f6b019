//! Subscription entity.
//!
//! A subscription names a resource collection and, optionally, a single entity
//! inside it. It renders to the topic path sent in `/meta/subscribe` and
//! `/meta/unsubscribe` requests.

use serde::{Deserialize, Serialize};

/// Wildcard used when a subscription covers every entity of a collection.
const WILDCARD: &str = "*";

/// Notification collection a subscription targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NotificationType {
    #[default]
    ManagedObject,
    Alarm,
    Measurement,
    Event,
}

impl NotificationType {
    /// Collection name used in the topic path.
    pub fn collection_name(&self) -> &'static str {
        match self {
            Self::ManagedObject => "managedobjects",
            Self::Alarm => "alarms",
            Self::Measurement => "measurements",
            Self::Event => "events",
        }
    }
}

impl std::fmt::Display for NotificationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.collection_name())
    }
}

/// A realtime subscription, compared by value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Subscription {
    /// Entity id, or `None` for every entity of the collection
    pub entity_id: Option<String>,

    /// Target collection
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
}

impl Subscription {
    pub fn new(entity_id: impl Into<String>, notification_type: NotificationType) -> Self {
        Self {
            entity_id: Some(entity_id.into()),
            notification_type,
        }
    }

    /// Subscription to every entity of a collection.
    pub fn all(notification_type: NotificationType) -> Self {
        Self {
            entity_id: None,
            notification_type,
        }
    }

    /// Render the topic path, e.g. `/managedobjects/42` or `/alarms/*`.
    pub fn topic_path(&self) -> String {
        format!(
            "/{}/{}",
            self.notification_type.collection_name(),
            self.entity_id.as_deref().unwrap_or(WILDCARD)
        )
    }
}

impl std::fmt::Display for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.topic_path())
    }
}
