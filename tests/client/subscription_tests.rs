//! Subscribe and unsubscribe.

use std::collections::HashSet;

use pretty_assertions::assert_eq;
use tokio_util::sync::CancellationToken;

use notification_client::domain::{NotificationType, Subscription};
use notification_client::shared::error::ClientError;

use crate::common::{client, FakeServer, RecordingFeed};

#[tokio::test]
async fn test_subscribe_adds_to_active_set() {
    let server = FakeServer::with_client_ids(&["abc"]);
    let client = client(&server, &RecordingFeed::default());
    let cancel = CancellationToken::new();
    client.connect(&cancel).await.unwrap();

    let subscription = Subscription::new("42", NotificationType::ManagedObject);
    client.subscribe(&subscription, &cancel).await.unwrap();

    assert_eq!(client.subscriptions(), HashSet::from([subscription]));
    let request = &server.requests_on("/meta/subscribe")[0];
    assert_eq!(request["subscription"], "/managedobjects/42");
    assert_eq!(request["clientId"], "abc");
    assert!(request["id"].as_str().is_some_and(|id| !id.is_empty()));
}

#[tokio::test]
async fn test_wildcard_subscription_topic() {
    let server = FakeServer::new();
    let client = client(&server, &RecordingFeed::default());
    let cancel = CancellationToken::new();
    client.connect(&cancel).await.unwrap();

    client
        .subscribe(&Subscription::all(NotificationType::Alarm), &cancel)
        .await
        .unwrap();

    assert_eq!(server.requests_on("/meta/subscribe")[0]["subscription"], "/alarms/*");
}

#[tokio::test]
async fn test_unsubscribe_removes_from_active_set() {
    let server = FakeServer::new();
    let client = client(&server, &RecordingFeed::default());
    let cancel = CancellationToken::new();
    client.connect(&cancel).await.unwrap();

    let kept = Subscription::new("1", NotificationType::Event);
    let dropped = Subscription::new("2", NotificationType::Measurement);
    client.subscribe(&kept, &cancel).await.unwrap();
    client.subscribe(&dropped, &cancel).await.unwrap();
    client.unsubscribe(&dropped, &cancel).await.unwrap();

    assert_eq!(client.subscriptions(), HashSet::from([kept]));
    assert_eq!(
        server.requests_on("/meta/unsubscribe")[0]["subscription"],
        "/measurements/2"
    );
}

#[tokio::test]
async fn test_server_error_is_returned_with_transience() {
    let server = FakeServer::new();
    let client = client(&server, &RecordingFeed::default());
    let cancel = CancellationToken::new();
    client.connect(&cancel).await.unwrap();
    let subscription = Subscription::new("42", NotificationType::ManagedObject);

    server.configure(|b| b.subscribe_error = Some("500:0:server error".into()));
    let err = client.subscribe(&subscription, &cancel).await.unwrap_err();
    assert!(err.is_transient());

    server.configure(|b| b.subscribe_error = Some("400:0:bad request".into()));
    let err = client.subscribe(&subscription, &cancel).await.unwrap_err();
    assert!(matches!(err, ClientError::Protocol { transient: false, .. }));
    assert_eq!(err.to_string(), "400:0:bad request");

    assert!(client.subscriptions().is_empty());
}

#[tokio::test]
async fn test_unsubscribe_before_connect_is_rejected() {
    let server = FakeServer::new();
    let client = client(&server, &RecordingFeed::default());

    let err = client
        .unsubscribe(
            &Subscription::new("42", NotificationType::ManagedObject),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "Connect was not called.");
    assert!(!err.is_transient());
    assert_eq!(server.socket_count(), 0);
}

#[tokio::test]
async fn test_disconnect_clears_subscriptions() {
    let server = FakeServer::new();
    let client = client(&server, &RecordingFeed::default());
    let cancel = CancellationToken::new();
    client.connect(&cancel).await.unwrap();
    client
        .subscribe(&Subscription::new("42", NotificationType::ManagedObject), &cancel)
        .await
        .unwrap();

    client.disconnect(&cancel).await;

    assert!(client.subscriptions().is_empty());
}
