//! # Infrastructure Layer
//!
//! External implementations behind the client:
//!
//! - **transport**: WebSocket transport and the transport session
//! - **provisioning**: REST services creating notification subscriptions and tokens

pub mod provisioning;
pub mod transport;
