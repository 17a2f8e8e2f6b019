//! Token Consumer
//!
//! Plain websocket consumer for token-authenticated notification sessions.
//! There is no Bayeux handshake: the subscriber token travels in the URI and
//! every inbound frame goes to the data feed. The monitor loop reopens the
//! socket whenever it breaks.

use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::data_feed::DataFeedHandler;
use crate::application::monitor_loop::{MonitorLoop, ReconnectTarget, SessionHealth};
use crate::application::timeout::{execute_with_timeout, sleep_unless_cancelled};
use crate::config::Settings;
use crate::domain::{Advice, HeartbeatTimes};
use crate::infrastructure::transport::{
    SessionLoops, SocketFactory, SocketSlot, SocketState, TransportSession,
};
use crate::shared::error::ClientError;

#[derive(Debug, Clone)]
pub struct ConsumerOptions {
    /// Consumer endpoint the token is appended to, e.g.
    /// `wss://tenant.example.com/notification2/consumer/`
    pub uri: String,
    pub operation_timeout: Duration,
    pub monitor_interval: Duration,
    pub idle_delay: Duration,
}

impl ConsumerOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            uri: settings.consumer_url(),
            operation_timeout: settings.client.operation_timeout(),
            monitor_interval: settings.client.monitor_interval(),
            idle_delay: settings.client.idle_delay(),
        }
    }

    fn token_uri(&self, token: &str) -> String {
        format!("{}?token={}", self.uri, token)
    }
}

#[derive(Default)]
enum ConsumerState {
    #[default]
    Disconnected,
    Connecting,
    Connected(Arc<TransportSession>),
}

/// Consumer of a token-authenticated notification stream.
#[derive(Clone)]
pub struct TokenConsumer {
    inner: Arc<ConsumerInner>,
}

struct ConsumerInner {
    options: ConsumerOptions,
    factory: Arc<dyn SocketFactory>,
    data_feed: Arc<dyn DataFeedHandler>,
    state: Mutex<ConsumerState>,
}

impl TokenConsumer {
    pub fn new(
        options: ConsumerOptions,
        factory: Arc<dyn SocketFactory>,
        data_feed: Arc<dyn DataFeedHandler>,
    ) -> Self {
        Self {
            inner: Arc::new(ConsumerInner {
                options,
                factory,
                data_feed,
                state: Mutex::new(ConsumerState::default()),
            }),
        }
    }

    /// Open the consumer socket for `token`.
    pub async fn connect(&self, token: &str, cancel: &CancellationToken) -> Result<(), ClientError> {
        {
            let mut state = self.inner.state.lock();
            if !matches!(*state, ConsumerState::Disconnected) {
                return Err(ClientError::InvalidState("Already connected.".into()));
            }
            *state = ConsumerState::Connecting;
        }

        let transport = Arc::new(TransportSession::new(
            self.inner.options.token_uri(token),
            self.inner.factory.clone(),
        ));
        let loops = ConsumerLoops {
            inner: Arc::downgrade(&self.inner),
        };

        let result = execute_with_timeout(self.inner.options.operation_timeout, cancel, async {
            transport.connect(&loops).await.map_err(ClientError::from)
        })
        .await;

        let result = result.and_then(|()| {
            let mut state = self.inner.state.lock();
            if !matches!(*state, ConsumerState::Connecting) {
                return Err(ClientError::InvalidState("Disconnected while connecting.".into()));
            }
            *state = ConsumerState::Connected(transport.clone());
            Ok(())
        });

        match &result {
            Ok(()) => info!("Token consumer connected"),
            Err(e) => {
                debug!(error = %e, "Token consumer connect failed");
                transport.close().await;
                let mut state = self.inner.state.lock();
                if matches!(*state, ConsumerState::Connecting) {
                    *state = ConsumerState::Disconnected;
                }
            }
        }
        result
    }

    /// Close the socket. No-op when not connected.
    pub async fn disconnect(&self) {
        let previous = std::mem::take(&mut *self.inner.state.lock());
        if let ConsumerState::Connected(transport) = previous {
            transport.close().await;
            info!("Token consumer disconnected");
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(*self.inner.state.lock(), ConsumerState::Connected(_))
    }
}

impl ConsumerInner {
    fn transport(&self) -> Option<Arc<TransportSession>> {
        match &*self.state.lock() {
            ConsumerState::Connected(transport) => Some(transport.clone()),
            _ => None,
        }
    }

    /// Forward every frame of the current socket to the data feed.
    async fn forward(
        data_feed: Arc<dyn DataFeedHandler>,
        idle_delay: Duration,
        socket: SocketSlot,
        cancel: CancellationToken,
    ) {
        loop {
            let open = socket.current().filter(|s| s.state() == SocketState::Open);
            if let Some(current) = open {
                let received = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    received = current.receive() => received,
                };

                match received {
                    Ok(result) if !result.close => {
                        data_feed.handle(result.data, &cancel).await;
                        continue;
                    }
                    Ok(_) => debug!(state = %current.state(), "Peer closed the socket"),
                    Err(e) => debug!(error = %e, "Error in consumer receive loop"),
                }
            }

            if !sleep_unless_cancelled(idle_delay, &cancel).await {
                break;
            }
        }

        debug!("Consumer receive loop stopped");
    }
}

#[async_trait]
impl ReconnectTarget for ConsumerInner {
    /// No heartbeat runs on this socket, so only a broken socket reconnects.
    fn health(&self) -> Option<SessionHealth> {
        self.transport().map(|_| SessionHealth {
            advice: Advice::default(),
            full_reconnect: false,
            heartbeat: HeartbeatTimes::default(),
        })
    }

    async fn reconnect(&self, _full: bool, cancel: &CancellationToken) -> Result<(), ClientError> {
        let transport = self
            .transport()
            .ok_or_else(|| ClientError::InvalidState("Not connected.".into()))?;

        execute_with_timeout(self.options.operation_timeout, cancel, async {
            if transport.state() == Some(SocketState::Open) {
                return Ok(());
            }
            transport
                .reconnect()
                .await
                .map_err(|e| ClientError::Connect(e.to_string()))
        })
        .await
    }
}

struct ConsumerLoops {
    inner: Weak<ConsumerInner>,
}

impl SessionLoops for ConsumerLoops {
    fn receive(&self, socket: SocketSlot, cancel: CancellationToken) -> BoxFuture<'static, ()> {
        let Some(inner) = self.inner.upgrade() else {
            return futures::future::ready(()).boxed();
        };

        ConsumerInner::forward(
            inner.data_feed.clone(),
            inner.options.idle_delay,
            socket,
            cancel,
        )
        .boxed()
    }

    fn monitor(&self, socket: SocketSlot, cancel: CancellationToken) -> BoxFuture<'static, ()> {
        let Some(inner) = self.inner.upgrade() else {
            return futures::future::ready(()).boxed();
        };
        let target: Weak<dyn ReconnectTarget> = self.inner.clone();

        MonitorLoop::new(target, inner.options.monitor_interval, inner.options.idle_delay)
            .run(socket, cancel)
            .boxed()
    }
}
