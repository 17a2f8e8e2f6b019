//! WebSocket socket over tokio-tungstenite.
//!
//! The stream is split so an outbound send never waits behind the pending
//! receive of the receive loop.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use super::socket::{ReceiveResult, Socket, SocketFactory, SocketState};
use crate::shared::error::TransportError;

type Stream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Client websocket implementing the [`Socket`] boundary.
pub struct WebSocket {
    state: AtomicU8,
    sink: Mutex<Option<SplitSink<Stream, Message>>>,
    stream: Mutex<Option<SplitStream<Stream>>>,
}

impl WebSocket {
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(SocketState::Created.as_u8()),
            sink: Mutex::new(None),
            stream: Mutex::new(None),
        }
    }

    fn set_state(&self, state: SocketState) {
        self.state.store(state.as_u8(), Ordering::SeqCst);
    }
}

impl Default for WebSocket {
    fn default() -> Self {
        Self::new()
    }
}

/// Connection-level failures are retryable; everything else is fatal.
fn classify(err: WsError) -> TransportError {
    match err {
        WsError::Io(_) | WsError::ConnectionClosed | WsError::AlreadyClosed => {
            TransportError::Faulted(err.to_string())
        }
        other => TransportError::Fatal(other.to_string()),
    }
}

#[async_trait]
impl Socket for WebSocket {
    async fn connect(&self, uri: &str) -> Result<(), TransportError> {
        self.set_state(SocketState::Connecting);

        match connect_async(uri).await {
            Ok((ws, _response)) => {
                let (sink, stream) = ws.split();
                *self.sink.lock().await = Some(sink);
                *self.stream.lock().await = Some(stream);
                self.set_state(SocketState::Open);
                tracing::debug!(uri = %uri, "WebSocket opened");
                Ok(())
            }
            Err(e) => {
                self.set_state(SocketState::Closed);
                Err(classify(e))
            }
        }
    }

    async fn send(&self, data: Vec<u8>) -> Result<(), TransportError> {
        let mut guard = self.sink.lock().await;
        let sink = guard.as_mut().ok_or(TransportError::NotConnected)?;

        let message = match String::from_utf8(data) {
            Ok(text) => Message::Text(text.into()),
            Err(e) => Message::Binary(e.into_bytes().into()),
        };

        sink.send(message).await.map_err(|e| {
            self.set_state(SocketState::Aborted);
            classify(e)
        })
    }

    async fn receive(&self) -> Result<ReceiveResult, TransportError> {
        let mut guard = self.stream.lock().await;
        let stream = guard.as_mut().ok_or(TransportError::NotConnected)?;

        loop {
            match stream.next().await {
                Some(Ok(Message::Text(text))) => {
                    return Ok(ReceiveResult::message(text.as_str().as_bytes().to_vec()))
                }
                Some(Ok(Message::Binary(data))) => return Ok(ReceiveResult::message(data.to_vec())),
                Some(Ok(Message::Close(frame))) => {
                    tracing::debug!(frame = ?frame, "WebSocket closed by peer");
                    self.set_state(SocketState::Closed);
                    return Ok(ReceiveResult::closed());
                }
                // Pongs are queued by tungstenite itself
                Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) | Some(Ok(Message::Frame(_))) => {}
                Some(Err(e)) => {
                    self.set_state(SocketState::Aborted);
                    return Err(classify(e));
                }
                None => {
                    self.set_state(SocketState::Closed);
                    return Ok(ReceiveResult::closed());
                }
            }
        }
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.set_state(SocketState::Closing);

        let result = match self.sink.lock().await.as_mut() {
            Some(sink) => match sink.send(Message::Close(None)).await {
                Ok(()) => sink.close().await.map_err(classify),
                Err(e) => Err(classify(e)),
            },
            None => Ok(()),
        };

        self.set_state(SocketState::Closed);
        result
    }

    fn state(&self) -> SocketState {
        SocketState::from_u8(self.state.load(Ordering::SeqCst))
    }
}

/// Factory for [`WebSocket`] instances.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketFactory;

impl SocketFactory for WebSocketFactory {
    fn create(&self) -> Arc<dyn Socket> {
        Arc::new(WebSocket::new())
    }
}
