//! # Notification Client Library
//!
//! A persistent client for the Bayeux-style realtime notification endpoint:
//! - Handshake, server-advised heartbeat and topic subscriptions over one
//!   long-lived websocket
//! - Automatic full or partial reconnect driven by a health monitor
//! - REST provisioning of notification subscriptions and subscriber tokens
//!
//! ## Architecture
//!
//! - **Domain Layer**: Subscriptions, heartbeat advice, protocol envelopes
//! - **Application Layer**: Session state machine, correlation, background loops
//! - **Infrastructure Layer**: Websocket transport and REST provisioning
//!
//! ## Module Structure
//!
//! ```text
//! notification_client/
//! +-- config/         Configuration management
//! +-- domain/         Subscriptions, advice, Bayeux messages
//! +-- application/    Realtime client, loops, correlation, timeouts
//! +-- infrastructure/ Socket transport and provisioning services
//! +-- shared/         Error types
//! ```

// Configuration module
pub mod config;

// Domain layer - protocol values
pub mod domain;

// Application layer - session state machine
pub mod application;

// Infrastructure layer - transport and REST implementations
pub mod infrastructure;

// Shared utilities
pub mod shared;

// Dependency wiring
pub mod startup;

// Logging
pub mod telemetry;
