//! Connect and disconnect.

use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::json;
use tokio_util::sync::CancellationToken;

use notification_client::domain::messages::Authentication;
use notification_client::shared::error::ClientError;

use crate::common::{client, client_with, eventually, options, FakeServer, RecordingFeed};

#[tokio::test]
async fn test_connect_handshakes_and_starts_heartbeat() {
    let server = FakeServer::with_client_ids(&["abc"]);
    let client = client(&server, &RecordingFeed::default());

    client.connect(&CancellationToken::new()).await.unwrap();

    assert!(client.is_connected());
    assert_eq!(client.client_id().as_deref(), Some("abc"));

    let requests = server.requests();
    assert_eq!(requests.len(), 2);
    let handshake = &requests[0][0];
    assert_eq!(handshake["channel"], "/meta/handshake");
    assert_eq!(handshake["version"], "1.0");
    // base64("user:pass")
    assert_eq!(handshake["ext"]["com.cumulocity.authn"]["token"], "dXNlcjpwYXNz");

    assert_eq!(
        requests[1],
        json!([{
            "channel": "/meta/connect",
            "clientId": "abc",
            "connectionType": "websocket",
            "advice": { "timeout": 5000, "interval": 2000 },
        }])
    );
}

#[tokio::test]
async fn test_connect_times_out_without_handshake_response() {
    let server = FakeServer::new();
    server.configure(|b| b.answer_handshake = false);
    let mut options = options();
    options.operation_timeout = Duration::from_millis(100);
    let client = client_with(&server, &RecordingFeed::default(), options);

    let err = client.connect(&CancellationToken::new()).await.unwrap_err();

    assert!(matches!(err, ClientError::Timeout));
    assert!(err.is_transient());
    assert_eq!(err.to_string(), "Operation timed out.");
    assert!(!client.is_connected());
    assert_eq!(client.client_id(), None);
}

#[tokio::test]
async fn test_caller_cancellation_is_not_a_timeout() {
    let server = FakeServer::new();
    server.configure(|b| b.answer_handshake = false);
    let client = client(&server, &RecordingFeed::default());
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        trigger.cancel();
    });

    let err = client.connect(&cancel).await.unwrap_err();
    assert!(matches!(err, ClientError::Cancelled));
    assert!(!client.is_connected());
}

#[tokio::test]
async fn test_rejected_handshake_is_not_transient() {
    let server = FakeServer::new();
    server.configure(|b| b.handshake_error = Some("401::Unauthorized".into()));
    let client = client(&server, &RecordingFeed::default());

    let err = client.connect(&CancellationToken::new()).await.unwrap_err();

    assert!(!err.is_transient());
    assert_eq!(err.to_string(), "401::Unauthorized");
    assert!(!client.is_connected());
}

#[tokio::test]
async fn test_unsupported_connection_type_is_rejected() {
    let server = FakeServer::new();
    server.configure(|b| b.supported_types = vec!["long-polling".into()]);
    let client = client(&server, &RecordingFeed::default());

    let err = client.connect(&CancellationToken::new()).await.unwrap_err();

    assert!(matches!(err, ClientError::InvalidResponse(_)));
    assert!(!err.is_transient());
    assert!(!client.is_connected());
}

#[tokio::test]
async fn test_refused_socket_is_transient_and_connect_can_be_retried() {
    let server = FakeServer::new();
    server.configure(|b| b.refuse_connections = 1);
    let client = client(&server, &RecordingFeed::default());
    let cancel = CancellationToken::new();

    let err = client.connect(&cancel).await.unwrap_err();
    assert!(matches!(err, ClientError::Connect(_)));
    assert!(err.is_transient());
    assert!(!client.is_connected());

    client.connect(&cancel).await.unwrap();
    assert!(client.is_connected());
    assert_eq!(server.socket_count(), 2);
}

#[tokio::test]
async fn test_second_connect_reports_already_connected() {
    let server = FakeServer::new();
    let client = client(&server, &RecordingFeed::default());
    let cancel = CancellationToken::new();

    client.connect(&cancel).await.unwrap();
    let err = client.connect(&cancel).await.unwrap_err();

    assert_eq!(err.to_string(), "Already connected.");
    assert!(!err.is_transient());
    assert_eq!(server.requests_on("/meta/handshake").len(), 1);
}

#[tokio::test]
async fn test_connect_with_token_authentication() {
    let server = FakeServer::new();
    let client = client(&server, &RecordingFeed::default());

    client
        .connect_with(Authentication::Token("t0k3n".into()), &CancellationToken::new())
        .await
        .unwrap();

    let handshake = &server.requests_on("/meta/handshake")[0];
    assert_eq!(handshake["ext"]["com.cumulocity.authn"]["token"], "t0k3n");
}

#[tokio::test]
async fn test_disconnect_twice_is_a_noop_the_second_time() {
    let server = FakeServer::with_client_ids(&["abc"]);
    let client = client(&server, &RecordingFeed::default());
    let cancel = CancellationToken::new();
    client.connect(&cancel).await.unwrap();

    client.disconnect(&cancel).await;
    let after_first = server.requests().len();
    client.disconnect(&cancel).await;

    assert!(!client.is_connected());
    assert_eq!(client.client_id(), None);
    assert!(client.subscriptions().is_empty());
    assert_eq!(server.requests().len(), after_first);

    let disconnects = server.requests_on("/meta/disconnect");
    assert_eq!(disconnects, vec![json!({ "channel": "/meta/disconnect", "clientId": "abc" })]);
    assert_eq!(server.latest_state().to_string(), "Closed");
}

#[tokio::test]
async fn test_client_can_reconnect_after_disconnect() {
    let server = FakeServer::new();
    let client = client(&server, &RecordingFeed::default());
    let cancel = CancellationToken::new();

    client.connect(&cancel).await.unwrap();
    client.disconnect(&cancel).await;
    client.connect(&cancel).await.unwrap();

    assert!(client.is_connected());
    assert_eq!(client.client_id().as_deref(), Some("client-2"));
    client.dispose().await;
    client.dispose().await;
    assert!(!client.is_connected());
}

#[tokio::test]
async fn test_pushed_notifications_reach_the_data_feed() {
    let server = FakeServer::new();
    let feed = RecordingFeed::default();
    let client = client(&server, &feed);
    client.connect(&CancellationToken::new()).await.unwrap();

    let notification = json!([{ "channel": "/managedobjects/42", "data": { "id": "42" } }]);
    server.push(notification.clone());

    eventually("notification delivery", || !feed.payloads().is_empty()).await;
    let payload: serde_json::Value = serde_json::from_slice(&feed.payloads()[0]).unwrap();
    assert_eq!(payload, notification);
}
