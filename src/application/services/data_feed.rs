//! Data-feed handlers.
//!
//! Every inbound frame that is not a control response is handed to a
//! [`DataFeedHandler`].

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Consumer of pushed notification payloads.
#[async_trait]
pub trait DataFeedHandler: Send + Sync {
    async fn handle(&self, data: Vec<u8>, cancel: &CancellationToken);
}

/// Logs every payload at `info`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingDataFeedHandler;

#[async_trait]
impl DataFeedHandler for LoggingDataFeedHandler {
    async fn handle(&self, data: Vec<u8>, _cancel: &CancellationToken) {
        tracing::info!(payload = %String::from_utf8_lossy(&data), "Notification received");
    }
}
