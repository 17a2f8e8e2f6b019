//! Application Layer
//!
//! The session state machine and the activities that run against it: the
//! correlation tables, the timeout guard, the receive and monitor loops, and
//! the services built on top of them.

pub mod correlator;
pub mod monitor_loop;
pub mod receive_loop;
pub mod services;
pub mod session_state;
pub mod timeout;

pub use services::{
    ClientOptions, ConsumerOptions, DataFeedHandler, LoggingDataFeedHandler, NotificationFacade,
    RealtimeClient, TokenConsumer,
};
