//! Receive Loop
//!
//! Drains the current socket and routes each frame by its channel: control
//! responses go to their correlation table, heartbeat responses to the
//! heartbeat handler (inline), everything else to the data feed.
//!
//! A peer close does not end the loop. The socket state turns `Closed`, the
//! loop idles, and it resumes on whatever socket the monitor reconnects.

use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::correlator::ResponseTables;
use super::services::DataFeedHandler;
use super::timeout::sleep_unless_cancelled;
use crate::domain::messages::{decode_first, Channel, HeartbeatResponse};
use crate::infrastructure::transport::{SocketSlot, SocketState};
use crate::shared::error::FrameError;

/// Receiver of `/meta/connect` responses.
#[async_trait]
pub trait HeartbeatHandler: Send + Sync {
    async fn on_heartbeat(&self, response: HeartbeatResponse, cancel: &CancellationToken);
}

pub struct ReceiveLoop {
    tables: Arc<ResponseTables>,
    data_feed: Arc<dyn DataFeedHandler>,
    heartbeat: Weak<dyn HeartbeatHandler>,
    idle_delay: Duration,
}

impl ReceiveLoop {
    pub fn new(
        tables: Arc<ResponseTables>,
        data_feed: Arc<dyn DataFeedHandler>,
        heartbeat: Weak<dyn HeartbeatHandler>,
        idle_delay: Duration,
    ) -> Self {
        Self {
            tables,
            data_feed,
            heartbeat,
            idle_delay,
        }
    }

    /// Run until `cancel` fires.
    pub async fn run(self, socket: SocketSlot, cancel: CancellationToken) {
        loop {
            let open = socket.current().filter(|s| s.state() == SocketState::Open);
            let Some(current) = open else {
                if !sleep_unless_cancelled(self.idle_delay, &cancel).await {
                    break;
                }
                continue;
            };

            let received = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                received = current.receive() => received,
            };

            match received {
                Ok(result) if result.close => {
                    debug!(state = %current.state(), "Peer closed the socket");
                }
                Ok(result) => {
                    if let Err(e) = self.dispatch(result.data, &cancel).await {
                        debug!(error = %e, "Generic error in receive loop");
                    }
                    continue;
                }
                Err(e) => {
                    debug!(error = %e, "Generic error in receive loop");
                }
            }

            if !sleep_unless_cancelled(self.idle_delay, &cancel).await {
                break;
            }
        }

        debug!("Receive loop stopped");
    }

    async fn dispatch(&self, data: Vec<u8>, cancel: &CancellationToken) -> Result<(), FrameError> {
        match Channel::of_frame(&data) {
            Channel::Handshake => self.tables.handshakes.add(decode_first(&data)?),
            Channel::Subscribe => self.tables.subscribes.add(decode_first(&data)?),
            Channel::Unsubscribe => self.tables.unsubscribes.add(decode_first(&data)?),
            Channel::Heartbeat => {
                let response = decode_first(&data)?;
                if let Some(handler) = self.heartbeat.upgrade() {
                    handler.on_heartbeat(response, cancel).await;
                }
            }
            Channel::Other => self.data_feed.handle(data, cancel).await,
        }
        Ok(())
    }
}
