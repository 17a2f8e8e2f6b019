//! Socket boundary consumed by the transport session.

use std::sync::Arc;

use async_trait::async_trait;

use crate::shared::error::TransportError;

/// Lifecycle state of a physical socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SocketState {
    #[default]
    Created,
    Connecting,
    Open,
    Closing,
    Closed,
    Aborted,
}

impl SocketState {
    /// States that require the socket to be reopened.
    pub fn is_broken(&self) -> bool {
        matches!(self, Self::Closed | Self::Aborted)
    }

    pub(crate) fn as_u8(self) -> u8 {
        match self {
            Self::Created => 0,
            Self::Connecting => 1,
            Self::Open => 2,
            Self::Closing => 3,
            Self::Closed => 4,
            Self::Aborted => 5,
        }
    }

    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Connecting,
            2 => Self::Open,
            3 => Self::Closing,
            4 => Self::Closed,
            5 => Self::Aborted,
            _ => Self::Created,
        }
    }
}

impl std::fmt::Display for SocketState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(self, f)
    }
}

/// One logical receive: a complete message, or the peer's close signal.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReceiveResult {
    pub close: bool,
    pub data: Vec<u8>,
}

impl ReceiveResult {
    pub fn message(data: Vec<u8>) -> Self {
        Self { close: false, data }
    }

    pub fn closed() -> Self {
        Self {
            close: true,
            data: Vec::new(),
        }
    }
}

/// Duplex, message-oriented socket.
///
/// `send` and `receive` may run concurrently on the same instance.
#[async_trait]
pub trait Socket: Send + Sync {
    /// Open the socket. Faulted connections map to [`TransportError::Faulted`].
    async fn connect(&self, uri: &str) -> Result<(), TransportError>;

    /// Write one complete frame.
    async fn send(&self, data: Vec<u8>) -> Result<(), TransportError>;

    /// Read one complete message, reassembling fragments.
    async fn receive(&self) -> Result<ReceiveResult, TransportError>;

    /// Graceful close handshake.
    async fn close(&self) -> Result<(), TransportError>;

    fn state(&self) -> SocketState;
}

/// Creates fresh socket instances; the transport session asks for a new one on
/// every reconnect.
pub trait SocketFactory: Send + Sync {
    fn create(&self) -> Arc<dyn Socket>;
}
