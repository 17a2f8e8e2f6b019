//! Provisioning request and response bodies.

use serde::{Deserialize, Serialize};

/// Scope of a notification subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionContext {
    #[default]
    Mo,
    Tenant,
}

/// Restricts which APIs and types a subscription forwards.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionFilter {
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub apis: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub type_filter: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionSource {
    pub id: String,
}

/// Body of `POST notification2/subscriptions`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationSubscription {
    pub context: SubscriptionContext,

    /// Subscription name, also used as the token's subscription claim
    pub subscription: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<SubscriptionSource>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fragments_to_copy: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription_filter: Option<SubscriptionFilter>,
}

impl NotificationSubscription {
    /// Tenant-wide subscription.
    pub fn tenant(name: impl Into<String>) -> Self {
        Self {
            context: SubscriptionContext::Tenant,
            subscription: name.into(),
            source: None,
            fragments_to_copy: Vec::new(),
            subscription_filter: None,
        }
    }

    /// Subscription scoped to one managed object.
    pub fn managed_object(name: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            context: SubscriptionContext::Mo,
            subscription: name.into(),
            source: Some(SubscriptionSource { id: id.into() }),
            fragments_to_copy: Vec::new(),
            subscription_filter: None,
        }
    }

    pub fn with_fragments(mut self, fragments: Vec<String>) -> Self {
        self.fragments_to_copy = fragments;
        self
    }

    pub fn with_filter(mut self, filter: SubscriptionFilter) -> Self {
        self.subscription_filter = Some(filter);
        self
    }
}

/// Body of `POST notification2/token`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenClaim {
    pub subscriber: String,
    pub subscription: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_in_minutes: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub signed: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub non_persistent: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub shared: Option<bool>,
}

impl TokenClaim {
    pub fn new(subscriber: impl Into<String>, subscription: impl Into<String>) -> Self {
        Self {
            subscriber: subscriber.into(),
            subscription: subscription.into(),
            expires_in_minutes: None,
            signed: None,
            non_persistent: None,
            shared: None,
        }
    }
}

/// Identifiers needed to tear down a provisioned session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionData {
    pub subscription_id: String,
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CreatedSubscription {
    pub id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CreatedToken {
    pub token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UnsubscribeResult {
    pub result: Option<String>,
}
