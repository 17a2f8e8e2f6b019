//! # Domain Entities
//!
//! - **Subscription**: a subscribable collection/entity pair and its topic path
//! - **Advice**: the heartbeat cadence contract negotiated with the server
//! - **HeartbeatTimes**: start/end of the current heartbeat round trip

mod heartbeat;
mod subscription;

pub use heartbeat::{Advice, HeartbeatTimes};
pub use subscription::{NotificationType, Subscription};
