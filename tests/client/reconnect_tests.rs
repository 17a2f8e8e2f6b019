//! Heartbeat cycle and monitor-driven reconnects.

use std::collections::HashSet;
use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::json;
use tokio_util::sync::CancellationToken;

use notification_client::domain::{Advice, NotificationType, Subscription};
use notification_client::infrastructure::transport::SocketState;

use crate::common::{client, client_with, eventually, options, FakeServer, RecordingFeed};

#[tokio::test]
async fn test_successful_heartbeat_adopts_advice_and_continues_cycle() {
    let server = FakeServer::new();
    let mut options = options();
    options.default_advice = Advice::new(1000, 500);
    let client = client_with(&server, &RecordingFeed::default(), options);
    client.connect(&CancellationToken::new()).await.unwrap();

    server.push_heartbeat(true);

    eventually("next heartbeat", || server.requests_on("/meta/connect").len() == 2).await;
    assert_eq!(client.advice(), Some(Advice::new(5000, 2000)));
    let heartbeats = server.requests_on("/meta/connect");
    assert_eq!(heartbeats[1]["advice"]["timeout"], 5000);
    assert!(!client.full_reconnect_required());
}

#[tokio::test]
async fn test_heartbeat_without_advice_keeps_the_session() {
    let server = FakeServer::with_client_ids(&["abc", "def"]);
    let client = client(&server, &RecordingFeed::default());
    client.connect(&CancellationToken::new()).await.unwrap();

    server.push(json!([{ "channel": "/meta/connect", "successful": true }]));

    eventually("next heartbeat", || server.requests_on("/meta/connect").len() >= 2).await;
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert_eq!(server.requests_on("/meta/handshake").len(), 1);
    assert_eq!(client.client_id().as_deref(), Some("abc"));
    assert_eq!(client.advice(), Some(Advice::default()));
    assert!(!client.full_reconnect_required());
    assert_eq!(server.requests_on("/meta/connect")[1]["clientId"], "abc");
}

#[tokio::test]
async fn test_failed_heartbeat_with_closed_socket_triggers_full_reconnect() {
    let server = FakeServer::with_client_ids(&["abc", "def"]);
    let client = client(&server, &RecordingFeed::default());
    let cancel = CancellationToken::new();
    client.connect(&cancel).await.unwrap();
    let subscription = Subscription::new("42", NotificationType::ManagedObject);
    client.subscribe(&subscription, &cancel).await.unwrap();

    server.push_heartbeat(false);
    server.drop_connection();

    eventually("second handshake", || server.requests_on("/meta/handshake").len() == 2).await;
    eventually("subscription replay", || server.requests_on("/meta/subscribe").len() == 2).await;
    eventually("flag cleared", || !client.full_reconnect_required()).await;
    eventually("new socket open", || {
        server.socket_count() == 2 && server.latest_state() == SocketState::Open
    })
    .await;

    assert_eq!(client.client_id().as_deref(), Some("def"));
    assert_eq!(client.subscriptions(), HashSet::from([subscription]));

    let replay = &server.requests_on("/meta/subscribe")[1];
    assert_eq!(replay["clientId"], "def");
    assert_eq!(replay["subscription"], "/managedobjects/42");
}

#[tokio::test]
async fn test_closed_socket_alone_resumes_existing_client_id() {
    let server = FakeServer::with_client_ids(&["abc"]);
    let client = client(&server, &RecordingFeed::default());
    let cancel = CancellationToken::new();
    client.connect(&cancel).await.unwrap();
    client
        .subscribe(&Subscription::new("42", NotificationType::ManagedObject), &cancel)
        .await
        .unwrap();

    server.drop_connection();

    eventually("socket reopened", || server.socket_count() == 2).await;
    eventually("resumed heartbeat", || server.requests_on("/meta/connect").len() == 2).await;

    let heartbeats = server.requests_on("/meta/connect");
    assert_eq!(heartbeats[1]["clientId"], "abc");
    assert_eq!(server.requests_on("/meta/handshake").len(), 1);
    assert_eq!(server.requests_on("/meta/subscribe").len(), 1);
    assert_eq!(client.client_id().as_deref(), Some("abc"));
    assert_eq!(client.subscriptions().len(), 1);
}

#[tokio::test]
async fn test_heartbeat_timeout_resends_heartbeat_without_handshake() {
    let server = FakeServer::with_client_ids(&["abc"]);
    let mut options = options();
    options.default_advice = Advice::new(0, 0);
    let client = client_with(&server, &RecordingFeed::default(), options);
    client.connect(&CancellationToken::new()).await.unwrap();

    eventually("heartbeat resent", || server.requests_on("/meta/connect").len() >= 2).await;

    assert_eq!(server.socket_count(), 1);
    assert_eq!(server.requests_on("/meta/handshake").len(), 1);
    assert!(server
        .requests_on("/meta/connect")
        .iter()
        .all(|heartbeat| heartbeat["clientId"] == "abc"));
}

#[tokio::test]
async fn test_failed_reconnects_are_retried_on_later_ticks() {
    let server = FakeServer::new();
    let client = client(&server, &RecordingFeed::default());
    client.connect(&CancellationToken::new()).await.unwrap();

    server.configure(|b| b.refuse_connections = 2);
    server.drop_connection();

    eventually("reconnect after two refusals", || {
        server.socket_count() == 4 && server.latest_state() == SocketState::Open
    })
    .await;
    assert!(client.is_connected());
}

#[tokio::test]
async fn test_disconnect_stops_the_monitor() {
    let server = FakeServer::new();
    let client = client(&server, &RecordingFeed::default());
    let cancel = CancellationToken::new();
    client.connect(&cancel).await.unwrap();

    client.disconnect(&cancel).await;
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert_eq!(server.socket_count(), 1);
    assert!(!client.is_connected());
}
