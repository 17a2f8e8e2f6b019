//! Application Startup
//!
//! Wires settings into the realtime client and the provisioning facade, and
//! runs the demo session: a Bayeux session by default, or a provisioned token
//! consumer when `demo.token_subscription` is set.

use std::sync::Arc;

use anyhow::Result;
use futures::future::join_all;
use tokio_util::sync::CancellationToken;

use crate::application::{
    ClientOptions, ConsumerOptions, LoggingDataFeedHandler, NotificationFacade, RealtimeClient,
    TokenConsumer,
};
use crate::config::Settings;
use crate::domain::{NotificationType, Subscription};
use crate::infrastructure::provisioning::{
    HttpSubscriptionService, HttpTokenService, NotificationSubscription, ProvisioningClient,
};
use crate::infrastructure::transport::WebSocketFactory;

/// Application instance
pub struct Application {
    settings: Settings,
    client: RealtimeClient,
    facade: NotificationFacade,
}

impl Application {
    /// Build the application from settings
    pub fn build(settings: Settings) -> Result<Self> {
        let client = RealtimeClient::new(
            ClientOptions::from_settings(&settings),
            Arc::new(WebSocketFactory),
            Arc::new(LoggingDataFeedHandler),
        );

        let consumer = TokenConsumer::new(
            ConsumerOptions::from_settings(&settings),
            Arc::new(WebSocketFactory),
            Arc::new(LoggingDataFeedHandler),
        );
        let provisioning = ProvisioningClient::from_settings(&settings)?;
        let facade = NotificationFacade::new(
            Arc::new(HttpSubscriptionService::new(provisioning.clone())),
            Arc::new(HttpTokenService::new(provisioning)),
            consumer,
        );

        tracing::debug!(uri = %settings.websocket_url(), "Realtime client created");
        Ok(Self {
            settings,
            client,
            facade,
        })
    }

    /// Run the configured demo session until Ctrl-C.
    pub async fn run_until_stopped(self) -> Result<()> {
        let cancel = CancellationToken::new();
        match self.settings.demo.token_subscription.clone() {
            Some(name) => self.run_token_session(name, &cancel).await,
            None => self.run_bayeux_session(&cancel).await,
        }
    }

    /// Provision a tenant subscription, consume it with a subscriber token
    /// and tear everything down on Ctrl-C.
    async fn run_token_session(&self, name: String, cancel: &CancellationToken) -> Result<()> {
        let connection = self
            .facade
            .start(&NotificationSubscription::tenant(name), cancel)
            .await?;
        tracing::info!(subscription_id = %connection.subscription_id, "Consuming notifications");

        tokio::signal::ctrl_c().await?;
        tracing::info!("Shutting down");

        self.facade.stop(&connection).await?;
        Ok(())
    }

    /// Connect, subscribe to the configured managed objects and log pushed
    /// notifications until Ctrl-C.
    async fn run_bayeux_session(&self, cancel: &CancellationToken) -> Result<()> {
        let subscriptions: Vec<Subscription> = self
            .settings
            .demo
            .managed_object_ids
            .iter()
            .map(|id| Subscription::new(id.clone(), NotificationType::ManagedObject))
            .collect();

        self.client.connect(cancel).await?;
        tracing::info!(client_id = ?self.client.client_id(), "Connected");

        let results = join_all(
            subscriptions
                .iter()
                .map(|subscription| self.client.subscribe(subscription, cancel)),
        )
        .await;
        for (subscription, result) in subscriptions.iter().zip(results) {
            match result {
                Ok(()) => tracing::info!(topic = %subscription, "Subscribed"),
                Err(e) => tracing::warn!(
                    topic = %subscription,
                    error = %e,
                    transient = e.is_transient(),
                    "Subscribe failed"
                ),
            }
        }

        tokio::signal::ctrl_c().await?;
        tracing::info!("Shutting down");

        for subscription in self.client.subscriptions() {
            if let Err(e) = self.client.unsubscribe(&subscription, cancel).await {
                tracing::warn!(topic = %subscription, error = %e, "Unsubscribe failed");
            }
        }
        self.client.disconnect(cancel).await;
        self.client.dispose().await;

        Ok(())
    }
}
