//! Transport Session
//!
//! Owns one physical socket plus the receive and monitor loops bound to it.
//! On reconnect the socket is swapped behind [`SocketSlot`]; the loops keep
//! running and pick up the new socket through that indirection.

use std::sync::Arc;

use futures::future::BoxFuture;
use parking_lot::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::socket::{Socket, SocketFactory, SocketState};
use crate::shared::error::TransportError;

/// Replaceable handle to "the current socket".
#[derive(Clone, Default)]
pub struct SocketSlot {
    inner: Arc<RwLock<Option<Arc<dyn Socket>>>>,
}

impl SocketSlot {
    pub fn current(&self) -> Option<Arc<dyn Socket>> {
        self.inner.read().clone()
    }

    pub fn state(&self) -> Option<SocketState> {
        self.inner.read().as_ref().map(|s| s.state())
    }

    #[cfg(test)]
    pub(crate) fn holding(socket: Arc<dyn Socket>) -> Self {
        let slot = Self::default();
        slot.replace(Some(socket));
        slot
    }

    fn replace(&self, socket: Option<Arc<dyn Socket>>) -> Option<Arc<dyn Socket>> {
        std::mem::replace(&mut *self.inner.write(), socket)
    }

    /// Empty the slot if it still holds `socket`.
    fn release(&self, socket: &Arc<dyn Socket>) {
        let mut current = self.inner.write();
        if current.as_ref().is_some_and(|held| Arc::ptr_eq(held, socket)) {
            *current = None;
        }
    }
}

/// Background activities started when the session first connects.
pub trait SessionLoops: Send + Sync {
    fn receive(&self, socket: SocketSlot, cancel: CancellationToken) -> BoxFuture<'static, ()>;

    fn monitor(&self, socket: SocketSlot, cancel: CancellationToken) -> BoxFuture<'static, ()>;
}

struct Workers {
    cancel: CancellationToken,
    handles: Vec<JoinHandle<()>>,
}

/// One logical session over a replaceable socket.
pub struct TransportSession {
    uri: String,
    factory: Arc<dyn SocketFactory>,
    socket: SocketSlot,
    workers: Mutex<Option<Workers>>,
}

impl TransportSession {
    pub fn new(uri: impl Into<String>, factory: Arc<dyn SocketFactory>) -> Self {
        Self {
            uri: uri.into(),
            factory,
            socket: SocketSlot::default(),
            workers: Mutex::new(None),
        }
    }

    /// Open the socket and start both background loops.
    ///
    /// No-op when a socket already exists. Returns once the socket itself is
    /// open, not the protocol handshake.
    pub async fn connect(&self, loops: &dyn SessionLoops) -> Result<(), TransportError> {
        if self.socket.current().is_some() {
            return Ok(());
        }

        let socket = self.factory.create();
        self.socket.replace(Some(socket.clone()));

        let cancel = CancellationToken::new();
        let handles = vec![
            tokio::spawn(loops.receive(self.socket.clone(), cancel.clone())),
            tokio::spawn(loops.monitor(self.socket.clone(), cancel.clone())),
        ];
        if let Some(previous) = self.workers.lock().replace(Workers { cancel, handles }) {
            previous.cancel.cancel();
        }

        socket.connect(&self.uri).await
    }

    /// Discard the current socket and open a fresh one. The loops are not
    /// restarted.
    ///
    /// A session closed while the new socket was connecting keeps no socket.
    pub async fn reconnect(&self) -> Result<(), TransportError> {
        if !self.is_running() {
            return Err(TransportError::NotConnected);
        }

        let socket = self.factory.create();
        if let Some(previous) = self.socket.replace(Some(socket.clone())) {
            tracing::debug!(state = %previous.state(), "Discarding socket");
        }

        let connected = socket.connect(&self.uri).await;
        if self.is_running() {
            return connected;
        }

        self.socket.release(&socket);
        if socket.state() == SocketState::Open {
            if let Err(e) = socket.close().await {
                tracing::debug!(error = %e, "Error closing socket");
            }
        }
        Err(TransportError::NotConnected)
    }

    fn is_running(&self) -> bool {
        self.workers.lock().is_some()
    }

    pub async fn send(&self, data: Vec<u8>) -> Result<(), TransportError> {
        let socket = self.socket.current().ok_or(TransportError::NotConnected)?;
        socket.send(data).await
    }

    /// Close the socket gracefully when open, then stop and join both loops.
    pub async fn close(&self) {
        if let Some(socket) = self.socket.replace(None) {
            if socket.state() == SocketState::Open {
                if let Err(e) = socket.close().await {
                    tracing::debug!(error = %e, "Error closing socket");
                }
            }
        }

        let workers = self.workers.lock().take();
        if let Some(workers) = workers {
            workers.cancel.cancel();
            for handle in workers.handles {
                if let Err(e) = handle.await {
                    tracing::debug!(error = %e, "Background loop ended abnormally");
                }
            }
        }
    }

    /// Current socket state, `None` if never connected or already closed.
    pub fn state(&self) -> Option<SocketState> {
        self.socket.state()
    }
}

impl Drop for TransportSession {
    fn drop(&mut self) {
        if let Some(workers) = self.workers.get_mut().take() {
            workers.cancel.cancel();
        }
    }
}
