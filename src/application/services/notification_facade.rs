//! Notification Facade
//!
//! Provisions a notification subscription and a subscriber token over REST,
//! then opens the token consumer socket. `stop` tears all three down again.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use super::token_consumer::TokenConsumer;
use crate::infrastructure::provisioning::{
    ConnectionData, NotificationSubscription, SubscriptionService, TokenClaim, TokenService,
};
use crate::shared::error::ApiError;

pub struct NotificationFacade {
    subscriptions: Arc<dyn SubscriptionService>,
    tokens: Arc<dyn TokenService>,
    consumer: TokenConsumer,
}

impl NotificationFacade {
    pub fn new(
        subscriptions: Arc<dyn SubscriptionService>,
        tokens: Arc<dyn TokenService>,
        consumer: TokenConsumer,
    ) -> Self {
        Self {
            subscriptions,
            tokens,
            consumer,
        }
    }

    pub fn consumer(&self) -> &TokenConsumer {
        &self.consumer
    }

    /// Create the subscription, issue a token for it and open the consumer
    /// socket with the token.
    pub async fn start(
        &self,
        subscription: &NotificationSubscription,
        cancel: &CancellationToken,
    ) -> Result<ConnectionData, ApiError> {
        let subscription_id = self.subscriptions.create(subscription).await?;
        let token = self
            .tokens
            .create_token(&TokenClaim::new(
                subscription_id.clone(),
                subscription.subscription.clone(),
            ))
            .await?;

        self.consumer.connect(&token, cancel).await?;

        info!(subscription_id = %subscription_id, "Notification session started");
        Ok(ConnectionData {
            subscription_id,
            token,
        })
    }

    /// Disconnect, revoke the token and delete the subscription. The first
    /// failing step ends the sequence.
    pub async fn stop(&self, connection: &ConnectionData) -> Result<(), ApiError> {
        self.consumer.disconnect().await;
        self.tokens.unsubscribe(&connection.token).await?;
        self.subscriptions.delete(&connection.subscription_id).await?;

        info!(subscription_id = %connection.subscription_id, "Notification session stopped");
        Ok(())
    }
}
