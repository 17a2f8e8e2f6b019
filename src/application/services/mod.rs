//! Application Services
//!
//! ## Available Services
//!
//! - **RealtimeClient**: the connection supervisor (connect, subscribe,
//!   unsubscribe, disconnect, automatic reconnect)
//! - **TokenConsumer**: token-authenticated notification stream without
//!   Bayeux framing
//! - **NotificationFacade**: REST provisioning plus a token consumer session
//! - **DataFeedHandler**: consumer of pushed notification payloads

pub mod data_feed;
pub mod notification_facade;
pub mod realtime_client;
pub mod token_consumer;

pub use data_feed::{DataFeedHandler, LoggingDataFeedHandler};
pub use notification_facade::NotificationFacade;
pub use realtime_client::{ClientOptions, RealtimeClient};
pub use token_consumer::{ConsumerOptions, TokenConsumer};
