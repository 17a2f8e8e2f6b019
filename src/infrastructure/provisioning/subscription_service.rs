//! Notification subscription REST service.

use async_trait::async_trait;

use super::models::{CreatedSubscription, NotificationSubscription};
use super::ProvisioningClient;
use crate::shared::error::ApiError;

/// Creates and deletes server-side notification subscriptions.
#[async_trait]
pub trait SubscriptionService: Send + Sync {
    /// Create a subscription and return its id.
    async fn create(&self, subscription: &NotificationSubscription) -> Result<String, ApiError>;

    /// Delete a subscription by id.
    async fn delete(&self, id: &str) -> Result<(), ApiError>;
}

/// [`SubscriptionService`] over `notification2/subscriptions`.
#[derive(Clone)]
pub struct HttpSubscriptionService {
    client: ProvisioningClient,
}

impl HttpSubscriptionService {
    pub fn new(client: ProvisioningClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SubscriptionService for HttpSubscriptionService {
    async fn create(&self, subscription: &NotificationSubscription) -> Result<String, ApiError> {
        let created: CreatedSubscription = self
            .client
            .post("notification2/subscriptions")
            .json(subscription)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        tracing::debug!(id = ?created.id, name = %subscription.subscription, "Subscription created");
        created.id.ok_or_else(ApiError::null_result)
    }

    async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.client
            .delete(&format!("notification2/subscriptions/{}", id))
            .send()
            .await?
            .error_for_status()?;

        tracing::debug!(id = %id, "Subscription deleted");
        Ok(())
    }
}
