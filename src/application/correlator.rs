//! Request/response correlation table.
//!
//! The receive loop adds every control response it decodes; the issuing
//! operation waits for the entry carrying its request id. Waiters are woken on
//! every add instead of polling.

use std::collections::HashMap;

use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::domain::messages::{Correlated, HandshakeResponse, SubscriptionResponse};

/// Thread-safe table of responses keyed by request id.
pub struct Correlator<T> {
    responses: Mutex<HashMap<String, T>>,
    arrived: Notify,
}

impl<T: Correlated> Correlator<T> {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(HashMap::new()),
            arrived: Notify::new(),
        }
    }

    /// Store a response under its own id and wake all waiters.
    pub fn add(&self, response: T) {
        self.responses
            .lock()
            .insert(response.id().to_string(), response);
        self.arrived.notify_waiters();
    }

    /// Atomically fetch and delete the response for `id`.
    pub fn take_and_remove(&self, id: &str) -> Option<T> {
        self.responses.lock().remove(id)
    }

    pub fn clear(&self) {
        self.responses.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.responses.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.responses.lock().is_empty()
    }

    /// Wait until the response for `id` arrives, then remove and return it.
    ///
    /// Unbounded; callers race it against a deadline.
    pub async fn wait_for(&self, id: &str) -> T {
        loop {
            let notified = self.arrived.notified();
            tokio::pin!(notified);
            // register before checking so an add in between is not missed
            notified.as_mut().enable();

            if let Some(response) = self.take_and_remove(id) {
                return response;
            }

            notified.await;
        }
    }
}

impl<T: Correlated> Default for Correlator<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// One correlation table per control-message type.
#[derive(Default)]
pub struct ResponseTables {
    pub handshakes: Correlator<HandshakeResponse>,
    pub subscribes: Correlator<SubscriptionResponse>,
    pub unsubscribes: Correlator<SubscriptionResponse>,
}

impl ResponseTables {
    /// Drop every pending response so a stale one cannot satisfy a new wait.
    pub fn clear(&self) {
        self.handshakes.clear();
        self.subscribes.clear();
        self.unsubscribes.clear();
    }
}
