//! Provisioning plus realtime session lifecycle.

use std::sync::Arc;

use async_trait::async_trait;
use mockall::{mock, predicate::eq, Sequence};
use pretty_assertions::assert_eq;
use tokio_util::sync::CancellationToken;

use notification_client::application::NotificationFacade;
use notification_client::infrastructure::provisioning::{
    ConnectionData, NotificationSubscription, SubscriptionService, TokenClaim, TokenService,
};
use notification_client::shared::error::ApiError;

use crate::common::{consumer, FakeServer, RecordingFeed};

mock! {
    pub Subscriptions {}

    #[async_trait]
    impl SubscriptionService for Subscriptions {
        async fn create(&self, subscription: &NotificationSubscription) -> Result<String, ApiError>;
        async fn delete(&self, id: &str) -> Result<(), ApiError>;
    }
}

mock! {
    pub Tokens {}

    #[async_trait]
    impl TokenService for Tokens {
        async fn create_token(&self, claim: &TokenClaim) -> Result<String, ApiError>;
        async fn unsubscribe(&self, token: &str) -> Result<(), ApiError>;
    }
}

fn facade(
    server: &FakeServer,
    subscriptions: MockSubscriptions,
    tokens: MockTokens,
) -> NotificationFacade {
    NotificationFacade::new(
        Arc::new(subscriptions),
        Arc::new(tokens),
        consumer(server, &RecordingFeed::default()),
    )
}

fn connection() -> ConnectionData {
    ConnectionData {
        subscription_id: "7".into(),
        token: "jwt".into(),
    }
}

#[tokio::test]
async fn test_start_provisions_and_opens_consumer_with_token() {
    let server = FakeServer::new();
    let mut subscriptions = MockSubscriptions::new();
    subscriptions
        .expect_create()
        .withf(|subscription: &NotificationSubscription| subscription.subscription == "sub1")
        .times(1)
        .returning(|_| Ok("7".into()));
    let mut tokens = MockTokens::new();
    tokens
        .expect_create_token()
        .withf(|claim: &TokenClaim| claim.subscriber == "7" && claim.subscription == "sub1")
        .times(1)
        .returning(|_| Ok("jwt".into()));
    let facade = facade(&server, subscriptions, tokens);

    let data = facade
        .start(
            &NotificationSubscription::managed_object("sub1", "42"),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(data, connection());
    assert!(facade.consumer().is_connected());
    assert_eq!(
        server.connected_uris(),
        vec!["ws://fake/notification2/consumer/?token=jwt".to_string()]
    );
    assert!(server.requests().is_empty());
}

#[tokio::test]
async fn test_start_stops_at_failed_subscription() {
    let server = FakeServer::new();
    let mut subscriptions = MockSubscriptions::new();
    subscriptions
        .expect_create()
        .returning(|_| Err(ApiError::new("Forbidden", Some(403))));
    let mut tokens = MockTokens::new();
    tokens.expect_create_token().times(0);
    let facade = facade(&server, subscriptions, tokens);

    let err = facade
        .start(&NotificationSubscription::tenant("all"), &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(err.status_code, Some(403));
    assert_eq!(server.socket_count(), 0);
}

#[tokio::test]
async fn test_start_reports_connect_failure() {
    let server = FakeServer::new();
    server.configure(|b| b.refuse_connections = 1);
    let mut subscriptions = MockSubscriptions::new();
    subscriptions.expect_create().returning(|_| Ok("7".into()));
    let mut tokens = MockTokens::new();
    tokens.expect_create_token().returning(|_| Ok("jwt".into()));
    let facade = facade(&server, subscriptions, tokens);

    let err = facade
        .start(&NotificationSubscription::tenant("all"), &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(err.message, "Failed to connect. Connection refused");
    assert_eq!(err.status_code, None);
    assert!(!facade.consumer().is_connected());
}

#[tokio::test]
async fn test_stop_disconnects_then_revokes_token_then_deletes_subscription() {
    let server = FakeServer::new();
    let mut sequence = Sequence::new();
    let mut subscriptions = MockSubscriptions::new();
    let mut tokens = MockTokens::new();
    subscriptions.expect_create().returning(|_| Ok("7".into()));
    tokens.expect_create_token().returning(|_| Ok("jwt".into()));
    tokens
        .expect_unsubscribe()
        .with(eq("jwt"))
        .times(1)
        .in_sequence(&mut sequence)
        .returning(|_| Ok(()));
    subscriptions
        .expect_delete()
        .with(eq("7"))
        .times(1)
        .in_sequence(&mut sequence)
        .returning(|_| Ok(()));
    let facade = facade(&server, subscriptions, tokens);
    let cancel = CancellationToken::new();

    let data = facade
        .start(&NotificationSubscription::tenant("all"), &cancel)
        .await
        .unwrap();
    facade.stop(&data).await.unwrap();

    assert!(!facade.consumer().is_connected());
    assert_eq!(server.latest_state().to_string(), "Closed");
    assert!(server.requests().is_empty());
}

#[tokio::test]
async fn test_stop_keeps_subscription_when_token_revocation_fails() {
    let server = FakeServer::new();
    let subscriptions = {
        let mut mock = MockSubscriptions::new();
        mock.expect_delete().times(0);
        mock
    };
    let tokens = {
        let mut mock = MockTokens::new();
        mock.expect_unsubscribe()
            .returning(|_| Err(ApiError::null_result()));
        mock
    };
    let facade = facade(&server, subscriptions, tokens);

    let err = facade.stop(&connection()).await.unwrap_err();

    assert_eq!(err.message, "Null result.");
}
