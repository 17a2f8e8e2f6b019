//! Token consumer socket.

use pretty_assertions::assert_eq;
use serde_json::json;
use tokio_util::sync::CancellationToken;

use notification_client::infrastructure::transport::SocketState;
use notification_client::shared::error::ClientError;

use crate::common::{consumer, eventually, FakeServer, RecordingFeed};

const TOKEN_URI: &str = "ws://fake/notification2/consumer/?token=jwt";

#[tokio::test]
async fn test_every_frame_reaches_the_data_feed() {
    let server = FakeServer::new();
    let feed = RecordingFeed::default();
    let consumer = consumer(&server, &feed);
    consumer.connect("jwt", &CancellationToken::new()).await.unwrap();

    // control-looking frames are not interpreted on this socket
    let frame = json!([{ "channel": "/meta/connect", "successful": true }]);
    server.push(frame.clone());

    eventually("frame delivery", || feed.payloads().len() == 1).await;
    assert_eq!(feed.payloads()[0], serde_json::to_vec(&frame).unwrap());
    assert!(server.requests().is_empty());
}

#[tokio::test]
async fn test_broken_socket_reopens_with_the_same_token() {
    let server = FakeServer::new();
    let consumer = consumer(&server, &RecordingFeed::default());
    consumer.connect("jwt", &CancellationToken::new()).await.unwrap();

    server.drop_connection();

    eventually("socket reopened", || {
        server.socket_count() == 2 && server.latest_state() == SocketState::Open
    })
    .await;
    assert_eq!(server.connected_uris(), vec![TOKEN_URI.to_string(); 2]);
    assert!(consumer.is_connected());
}

#[tokio::test]
async fn test_refused_connect_is_transient_and_retryable() {
    let server = FakeServer::new();
    server.configure(|b| b.refuse_connections = 1);
    let consumer = consumer(&server, &RecordingFeed::default());
    let cancel = CancellationToken::new();

    let err = consumer.connect("jwt", &cancel).await.unwrap_err();
    assert!(matches!(err, ClientError::Connect(_)));
    assert!(err.is_transient());
    assert!(!consumer.is_connected());

    consumer.connect("jwt", &cancel).await.unwrap();
    assert!(consumer.is_connected());
}

#[tokio::test]
async fn test_second_connect_is_rejected_and_disconnect_is_idempotent() {
    let server = FakeServer::new();
    let consumer = consumer(&server, &RecordingFeed::default());
    let cancel = CancellationToken::new();
    consumer.connect("jwt", &cancel).await.unwrap();

    let err = consumer.connect("jwt", &cancel).await.unwrap_err();
    assert_eq!(err.to_string(), "Already connected.");

    consumer.disconnect().await;
    consumer.disconnect().await;

    assert!(!consumer.is_connected());
    assert_eq!(server.socket_count(), 1);
    assert_eq!(server.latest_state(), SocketState::Closed);
}
