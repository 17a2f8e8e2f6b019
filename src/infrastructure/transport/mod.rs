//! Socket transport
//!
//! - `socket`: the duplex socket boundary and its lifecycle states
//! - `websocket`: tokio-tungstenite implementation
//! - `session`: one logical session over a replaceable socket, owning the
//!   receive and monitor loops

mod session;
mod socket;
mod websocket;

#[cfg(test)]
pub(crate) use scripted::ScriptedSocket;

pub use session::{SessionLoops, SocketSlot, TransportSession};
pub use socket::{ReceiveResult, Socket, SocketFactory, SocketState};
pub use websocket::{WebSocket, WebSocketFactory};
