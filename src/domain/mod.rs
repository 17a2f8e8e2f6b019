//! # Domain Layer
//!
//! Value types of the realtime notification protocol. Independent of the
//! socket implementation and of the session state machine.
//!
//! ## Structure
//!
//! - **entities**: Subscriptions, heartbeat advice and heartbeat timing
//! - **messages**: Bayeux control envelopes (requests and responses)

pub mod entities;
pub mod messages;

// Re-export commonly used types
pub use entities::*;
