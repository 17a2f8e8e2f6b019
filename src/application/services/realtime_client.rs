//! Realtime Client
//!
//! The connection supervisor: handshake, heartbeat cycle, subscribe and
//! unsubscribe, and the reconnect policy driven by the monitor loop.
//!
//! State transitions go through one mutex-guarded [`SessionState`]. The
//! background loops only hold weak references to the client, so dropping the
//! last [`RealtimeClient`] handle tears the session down.

use std::collections::HashSet;
use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use super::data_feed::DataFeedHandler;
use crate::application::correlator::ResponseTables;
use crate::application::monitor_loop::{MonitorLoop, ReconnectTarget, SessionHealth};
use crate::application::receive_loop::{HeartbeatHandler, ReceiveLoop};
use crate::application::session_state::{ActiveSession, Connection, SessionState};
use crate::application::timeout::{execute_with_timeout, wait_for_correlated};
use crate::config::Settings;
use crate::domain::messages::{
    encode_envelope, Authentication, DisconnectRequest, HandshakeRequest, HeartbeatRequest,
    HeartbeatResponse, SubscriptionRequest, SubscriptionResponse, CONNECTION_TYPE,
};
use crate::domain::{Advice, Subscription};
use crate::infrastructure::transport::{
    SessionLoops, SocketFactory, SocketSlot, SocketState, TransportSession,
};
use crate::shared::error::ClientError;

const ALREADY_CONNECTED: &str = "Already connected.";
const NOT_CONNECTED: &str = "Connect was not called.";

/// Static client configuration.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Realtime endpoint, e.g. `wss://tenant.example.com/notification/realtime`
    pub uri: String,
    pub authentication: Authentication,
    /// Advice proposed at handshake, before the server sends its own
    pub default_advice: Advice,
    pub operation_timeout: Duration,
    pub monitor_interval: Duration,
    pub idle_delay: Duration,
}

impl ClientOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            uri: settings.websocket_url(),
            authentication: settings.authentication(),
            default_advice: settings.heartbeat.default_advice(),
            operation_timeout: settings.client.operation_timeout(),
            monitor_interval: settings.client.monitor_interval(),
            idle_delay: settings.client.idle_delay(),
        }
    }
}

/// Persistent Bayeux client over one realtime socket.
///
/// Cheap to clone; clones share the same session.
#[derive(Clone)]
pub struct RealtimeClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    options: ClientOptions,
    factory: Arc<dyn SocketFactory>,
    data_feed: Arc<dyn DataFeedHandler>,
    tables: Arc<ResponseTables>,
    state: Mutex<SessionState>,
}

impl RealtimeClient {
    pub fn new(
        options: ClientOptions,
        factory: Arc<dyn SocketFactory>,
        data_feed: Arc<dyn DataFeedHandler>,
    ) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                options,
                factory,
                data_feed,
                tables: Arc::new(ResponseTables::default()),
                state: Mutex::new(SessionState::default()),
            }),
        }
    }

    /// Open the socket and handshake with the configured credentials.
    pub async fn connect(&self, cancel: &CancellationToken) -> Result<(), ClientError> {
        let authentication = self.inner.options.authentication.clone();
        self.connect_with(authentication, cancel).await
    }

    /// Open the socket and handshake with `authentication`.
    ///
    /// The credentials are kept for the handshakes of later full reconnects.
    #[instrument(skip_all, level = "debug")]
    pub async fn connect_with(
        &self,
        authentication: Authentication,
        cancel: &CancellationToken,
    ) -> Result<(), ClientError> {
        {
            let mut state = self.inner.state.lock();
            if !matches!(state.connection, Connection::Disconnected) {
                return Err(ClientError::InvalidState(ALREADY_CONNECTED.into()));
            }
            state.connection = Connection::Connecting;
        }

        let transport = Arc::new(TransportSession::new(
            self.inner.options.uri.clone(),
            self.inner.factory.clone(),
        ));
        let loops = ClientLoops {
            inner: Arc::downgrade(&self.inner),
        };

        let result = execute_with_timeout(
            self.inner.options.operation_timeout,
            cancel,
            self.inner.open_session(&transport, &loops, authentication),
        )
        .await;

        if let Err(e) = &result {
            debug!(error = %e, "Connect failed");
            transport.close().await;
            self.inner.abandon(&transport);
        }

        result
    }

    /// Subscribe and add the subscription to the active set.
    pub async fn subscribe(
        &self,
        subscription: &Subscription,
        cancel: &CancellationToken,
    ) -> Result<(), ClientError> {
        self.inner.subscribe(subscription, cancel).await
    }

    /// Unsubscribe and remove the subscription from the active set.
    pub async fn unsubscribe(
        &self,
        subscription: &Subscription,
        cancel: &CancellationToken,
    ) -> Result<(), ClientError> {
        execute_with_timeout(
            self.inner.options.operation_timeout,
            cancel,
            self.inner.change_subscription(subscription, false),
        )
        .await
    }

    /// Stop the heartbeat, close the socket and forget the session.
    ///
    /// No-op when not connected.
    pub async fn disconnect(&self, cancel: &CancellationToken) {
        let session = self.inner.state.lock().active().cloned();
        let Some(session) = session else {
            return;
        };

        match encode_envelope(&DisconnectRequest::new(session.client_id.clone())) {
            Ok(frame) => {
                let sent = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => Err(ClientError::Cancelled),
                    sent = session.transport.send(frame) => sent.map_err(ClientError::from),
                };
                if let Err(e) = sent {
                    debug!(error = %e, "Failed to stop heartbeat");
                }
            }
            Err(e) => debug!(error = %e, "Failed to encode disconnect request"),
        }

        session.transport.close().await;
        self.inner.abandon(&session.transport);
        info!(client_id = %session.client_id, "Disconnected");
    }

    /// Release the session from any state. Idempotent.
    pub async fn dispose(&self) {
        let session = self.inner.state.lock().reset();
        self.inner.tables.clear();

        if let Some(session) = session {
            session.transport.close().await;
            debug!(client_id = %session.client_id, "Client disposed");
        }
    }

    pub fn is_connected(&self) -> bool {
        self.inner.state.lock().active().is_some()
    }

    pub fn client_id(&self) -> Option<String> {
        self.inner
            .state
            .lock()
            .active()
            .map(|session| session.client_id.clone())
    }

    /// Snapshot of the active subscription set.
    pub fn subscriptions(&self) -> HashSet<Subscription> {
        self.inner.state.lock().subscriptions.clone()
    }

    /// Whether a failed heartbeat is waiting for the monitor's full reconnect.
    pub fn full_reconnect_required(&self) -> bool {
        self.inner
            .state
            .lock()
            .active()
            .is_some_and(|session| session.full_reconnect)
    }

    /// Advice currently in force, if connected.
    pub fn advice(&self) -> Option<Advice> {
        self.inner.state.lock().active().map(|session| session.advice)
    }
}

impl ClientInner {
    async fn open_session(
        &self,
        transport: &Arc<TransportSession>,
        loops: &ClientLoops,
        authentication: Authentication,
    ) -> Result<(), ClientError> {
        transport.connect(loops).await?;

        let client_id = self.handshake(transport, &authentication).await?;
        let advice = self.options.default_advice;
        {
            let mut state = self.state.lock();
            if !matches!(state.connection, Connection::Connecting) {
                return Err(ClientError::InvalidState("Disposed while connecting.".into()));
            }
            state.connection = Connection::Connected(ActiveSession {
                client_id: client_id.clone(),
                transport: transport.clone(),
                advice,
                full_reconnect: false,
                authentication,
            });
        }
        info!(client_id = %client_id, "Connected");

        self.send_heartbeat(transport, client_id, advice).await
    }

    /// Roll back to `Disconnected` if `transport` still belongs to the
    /// current (or pending) session.
    fn abandon(&self, transport: &Arc<TransportSession>) {
        {
            let mut state = self.state.lock();
            if matches!(state.connection, Connection::Connecting) || state.is_current(transport) {
                state.reset();
            }
        }
        self.tables.clear();
    }

    async fn handshake(
        &self,
        transport: &TransportSession,
        authentication: &Authentication,
    ) -> Result<String, ClientError> {
        let id = request_id();
        let frame = encode_envelope(&HandshakeRequest::new(id.clone(), authentication))?;
        transport.send(frame).await?;

        wait_for_correlated(&self.tables.handshakes, &id, |response| {
            response.into_client_id(CONNECTION_TYPE)
        })
        .await
    }

    async fn send_heartbeat(
        &self,
        transport: &TransportSession,
        client_id: String,
        advice: Advice,
    ) -> Result<(), ClientError> {
        let frame = encode_envelope(&HeartbeatRequest::new(client_id, advice))?;
        // start is marked before the send so a fast response cannot precede it
        self.state.lock().heartbeat.set_start(Utc::now());
        transport.send(frame).await?;
        debug!("Heartbeat sent");
        Ok(())
    }

    async fn subscribe(
        &self,
        subscription: &Subscription,
        cancel: &CancellationToken,
    ) -> Result<(), ClientError> {
        execute_with_timeout(
            self.options.operation_timeout,
            cancel,
            self.change_subscription(subscription, true),
        )
        .await
    }

    #[instrument(skip(self), fields(topic = %subscription.topic_path()), level = "debug")]
    async fn change_subscription(
        &self,
        subscription: &Subscription,
        subscribe: bool,
    ) -> Result<(), ClientError> {
        let (transport, client_id) = self
            .state
            .lock()
            .active()
            .map(|session| (session.transport.clone(), session.client_id.clone()))
            .ok_or_else(|| ClientError::InvalidState(NOT_CONNECTED.into()))?;

        let id = request_id();
        let topic = subscription.topic_path();
        let (request, table) = if subscribe {
            (
                SubscriptionRequest::subscribe(id.clone(), client_id, topic),
                &self.tables.subscribes,
            )
        } else {
            (
                SubscriptionRequest::unsubscribe(id.clone(), client_id, topic),
                &self.tables.unsubscribes,
            )
        };

        transport.send(encode_envelope(&request)?).await?;
        wait_for_correlated(table, &id, SubscriptionResponse::into_result).await?;

        let mut state = self.state.lock();
        if subscribe {
            state.subscriptions.insert(subscription.clone());
        } else {
            state.subscriptions.remove(subscription);
        }
        Ok(())
    }

    /// Reopen the socket if needed, then either handshake again (`full`) or
    /// resume the existing client id with a heartbeat.
    async fn resume(&self, session: ActiveSession, full: bool) -> Result<(), ClientError> {
        self.tables.clear();
        self.state.lock().heartbeat.clear();

        let transport = &session.transport;
        if transport.state() != Some(SocketState::Open) {
            transport
                .reconnect()
                .await
                .map_err(|e| ClientError::Connect(e.to_string()))?;
        }

        if !full {
            debug!(client_id = %session.client_id, "Executing partial reconnect");
            return self
                .send_heartbeat(transport, session.client_id, session.advice)
                .await;
        }

        debug!("Executing full reconnect");
        let client_id = self.handshake(transport, &session.authentication).await?;
        let advice = self.options.default_advice;
        {
            let mut state = self.state.lock();
            let active = state
                .active_mut()
                .filter(|active| Arc::ptr_eq(&active.transport, transport))
                .ok_or_else(|| ClientError::InvalidState(NOT_CONNECTED.into()))?;
            active.client_id = client_id.clone();
            active.advice = advice;
        }
        info!(client_id = %client_id, "Session re-established");

        self.send_heartbeat(transport, client_id, advice).await
    }

    async fn replay_subscriptions(&self, cancel: &CancellationToken) {
        let subscriptions: Vec<Subscription> =
            self.state.lock().subscriptions.iter().cloned().collect();

        for subscription in subscriptions {
            match self.subscribe(&subscription, cancel).await {
                Ok(()) => debug!(topic = %subscription, "Subscribed"),
                Err(e) => debug!(topic = %subscription, error = %e, "Error during subscribe"),
            }
        }
    }
}

#[async_trait]
impl HeartbeatHandler for ClientInner {
    async fn on_heartbeat(&self, response: HeartbeatResponse, _cancel: &CancellationToken) {
        let advice = match response.into_advice() {
            Ok(advice) => advice,
            Err(e) => {
                debug!(error = %e, "Heartbeat failed, full reconnect required");
                if let Some(session) = self.state.lock().active_mut() {
                    session.full_reconnect = true;
                }
                return;
            }
        };

        let next = {
            let mut state = self.state.lock();
            let SessionState {
                connection,
                heartbeat,
                ..
            } = &mut *state;
            match connection {
                Connection::Connected(session) => {
                    session.advice = advice;
                    session.full_reconnect = false;
                    heartbeat.set_end(Utc::now());
                    Some((session.transport.clone(), session.client_id.clone()))
                }
                _ => None,
            }
        };

        let Some((transport, client_id)) = next else {
            debug!("Heartbeat response without a session");
            return;
        };

        if let Err(e) = self.send_heartbeat(&transport, client_id, advice).await {
            debug!(error = %e, "Failed to send heartbeat");
        }
    }
}

#[async_trait]
impl ReconnectTarget for ClientInner {
    fn health(&self) -> Option<SessionHealth> {
        let state = self.state.lock();
        state.active().map(|session| SessionHealth {
            advice: session.advice,
            full_reconnect: session.full_reconnect,
            heartbeat: state.heartbeat,
        })
    }

    async fn reconnect(&self, full: bool, cancel: &CancellationToken) -> Result<(), ClientError> {
        let session = self
            .state
            .lock()
            .active()
            .cloned()
            .ok_or_else(|| ClientError::InvalidState(NOT_CONNECTED.into()))?;

        execute_with_timeout(self.options.operation_timeout, cancel, self.resume(session, full))
            .await?;

        if full {
            self.replay_subscriptions(cancel).await;
            if let Some(session) = self.state.lock().active_mut() {
                session.full_reconnect = false;
            }
        }
        Ok(())
    }
}

/// Spawns the receive and monitor loops against the client, by weak reference.
struct ClientLoops {
    inner: Weak<ClientInner>,
}

impl SessionLoops for ClientLoops {
    fn receive(&self, socket: SocketSlot, cancel: CancellationToken) -> BoxFuture<'static, ()> {
        let Some(inner) = self.inner.upgrade() else {
            return futures::future::ready(()).boxed();
        };
        let heartbeat: Weak<dyn HeartbeatHandler> = self.inner.clone();

        ReceiveLoop::new(
            inner.tables.clone(),
            inner.data_feed.clone(),
            heartbeat,
            inner.options.idle_delay,
        )
        .run(socket, cancel)
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

fn request_id() -> String {
    Uuid::new_v4().to_string()
}
