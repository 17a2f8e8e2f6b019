//! # Configuration Module
//!
//! This module handles client configuration loading and management.
//! Configuration can be loaded from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config/default.toml, config/{environment}.toml)
//! - .env files (via dotenvy)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use notification_client::config::Settings;
//!
//! let settings = Settings::load()?;
//! println!("Realtime endpoint: {}", settings.websocket_url());
//! ```

mod settings;

pub use settings::*;
