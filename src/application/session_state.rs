//! Connection Supervisor state.
//!
//! Everything the caller path and the background loops share lives in one
//! [`SessionState`] behind a single mutex. Guards are never held across an
//! await point.

use std::collections::HashSet;
use std::sync::Arc;

use crate::domain::messages::Authentication;
use crate::domain::{Advice, HeartbeatTimes, Subscription};
use crate::infrastructure::transport::TransportSession;

/// A handshaken session.
#[derive(Clone)]
pub struct ActiveSession {
    pub client_id: String,
    pub transport: Arc<TransportSession>,
    pub advice: Advice,
    pub full_reconnect: bool,
    /// Credentials reused by full reconnect handshakes
    pub authentication: Authentication,
}

/// Connection lifecycle as seen by callers.
#[derive(Clone, Default)]
pub enum Connection {
    #[default]
    Disconnected,
    /// Connect in progress; the handshake has not completed yet
    Connecting,
    Connected(ActiveSession),
}

#[derive(Default)]
pub struct SessionState {
    pub connection: Connection,
    pub subscriptions: HashSet<Subscription>,
    pub heartbeat: HeartbeatTimes,
}

impl SessionState {
    pub fn active(&self) -> Option<&ActiveSession> {
        match &self.connection {
            Connection::Connected(session) => Some(session),
            _ => None,
        }
    }

    pub fn active_mut(&mut self) -> Option<&mut ActiveSession> {
        match &mut self.connection {
            Connection::Connected(session) => Some(session),
            _ => None,
        }
    }

    /// Whether `transport` is still the transport of the current session.
    pub fn is_current(&self, transport: &Arc<TransportSession>) -> bool {
        self.active()
            .is_some_and(|session| Arc::ptr_eq(&session.transport, transport))
    }

    /// Drop everything and return to `Disconnected`, handing back the session
    /// that was active, if any.
    pub fn reset(&mut self) -> Option<ActiveSession> {
        self.subscriptions.clear();
        self.heartbeat.clear();
        match std::mem::take(&mut self.connection) {
            Connection::Connected(session) => Some(session),
            _ => None,
        }
    }
}
