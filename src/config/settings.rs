//! Application settings and configuration structures.

use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use crate::domain::messages::Authentication;
use crate::domain::Advice;

/// Root configuration structure containing all application settings.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Remote endpoint (host, protocol security)
    pub endpoint: EndpointSettings,

    /// Credentials for the handshake and the provisioning API
    pub credentials: CredentialSettings,

    /// Client-proposed heartbeat advice
    pub heartbeat: HeartbeatSettings,

    /// Timeouts and loop cadence
    pub client: ClientSettings,

    /// Demo driver settings
    pub demo: DemoSettings,

    /// Current environment (development, staging, production)
    pub environment: String,
}

/// Remote endpoint configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct EndpointSettings {
    /// Host name, optionally with port (e.g. "tenant.example.com")
    pub host: String,

    /// Use `wss`/`https` instead of `ws`/`http`
    pub secure: bool,
}

/// Basic authentication credentials.
#[derive(Debug, Clone, Deserialize)]
pub struct CredentialSettings {
    pub username: String,
    pub password: String,
}

/// Default heartbeat advice proposed at handshake.
#[derive(Debug, Clone, Deserialize)]
pub struct HeartbeatSettings {
    /// Heartbeat interval in milliseconds (default: 2000)
    pub interval_ms: u64,

    /// Heartbeat timeout in milliseconds (default: 5000)
    pub timeout_ms: u64,
}

/// Client timing configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientSettings {
    /// Deadline for connect/subscribe/unsubscribe/reconnect (default: 30000)
    pub operation_timeout_ms: u64,

    /// Monitor loop period (default: 20000)
    pub monitor_interval_ms: u64,

    /// Back-off of the background loops while no socket is open (default: 1)
    pub idle_delay_ms: u64,
}

/// Demo driver configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DemoSettings {
    /// Managed object ids subscribed on startup
    pub managed_object_ids: Vec<String>,

    /// When set, provision a tenant subscription of this name and consume it
    /// with a subscriber token instead of running the Bayeux session
    #[serde(default)]
    pub token_subscription: Option<String>,
}

impl Settings {
    /// Load settings from environment variables and configuration files.
    ///
    /// The loading order is:
    /// 1. config/default.toml (base configuration)
    /// 2. config/{RUN_ENV}.toml (environment-specific overrides)
    /// 3. Environment variables (highest priority)
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if configuration cannot be loaded or parsed,
    /// or if no endpoint host is configured.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let environment = std::env::var("RUN_ENV").unwrap_or_else(|_| "development".into());

        Config::builder()
            .set_default("environment", environment.clone())?
            .set_default("endpoint.host", "")?
            .set_default("endpoint.secure", false)?
            .set_default("credentials.username", "")?
            .set_default("credentials.password", "")?
            .set_default("heartbeat.interval_ms", 2000_i64)?
            .set_default("heartbeat.timeout_ms", 5000_i64)?
            .set_default("client.operation_timeout_ms", 30000_i64)?
            .set_default("client.monitor_interval_ms", 20000_i64)?
            .set_default("client.idle_delay_ms", 1_i64)?
            .set_default("demo.managed_object_ids", Vec::<String>::new())?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // APP__ENDPOINT__HOST=example.com -> endpoint.host = example.com
            .add_source(
                Environment::default()
                    .prefix("APP")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("demo.managed_object_ids")
                    .try_parsing(true),
            )
            .set_override_option("endpoint.host", std::env::var("NOTIFICATION_HOST").ok())?
            .set_override_option(
                "credentials.username",
                std::env::var("NOTIFICATION_USERNAME").ok(),
            )?
            .set_override_option(
                "credentials.password",
                std::env::var("NOTIFICATION_PASSWORD").ok(),
            )?
            .build()?
            .try_deserialize()
            .and_then(Self::validate)
    }

    fn validate(self) -> Result<Self, ConfigError> {
        if self.endpoint.host.trim().is_empty() {
            return Err(ConfigError::Message(
                "Endpoint host must be configured (APP__ENDPOINT__HOST or NOTIFICATION_HOST)".into(),
            ));
        }
        Ok(self)
    }

    /// Realtime websocket endpoint.
    pub fn websocket_url(&self) -> String {
        let scheme = if self.endpoint.secure { "wss" } else { "ws" };
        format!("{}://{}/notification/realtime", scheme, self.endpoint.host)
    }

    /// Token consumer endpoint, with trailing slash.
    pub fn consumer_url(&self) -> String {
        let scheme = if self.endpoint.secure { "wss" } else { "ws" };
        format!("{}://{}/notification2/consumer/", scheme, self.endpoint.host)
    }

    /// Base URL of the REST API, with trailing slash.
    pub fn http_url(&self) -> String {
        let scheme = if self.endpoint.secure { "https" } else { "http" };
        format!("{}://{}/", scheme, self.endpoint.host)
    }

    /// Handshake credentials from the configured username and password.
    pub fn authentication(&self) -> Authentication {
        Authentication::basic(&self.credentials.username, &self.credentials.password)
    }
}

impl HeartbeatSettings {
    pub fn default_advice(&self) -> Advice {
        Advice::new(self.timeout_ms, self.interval_ms)
    }
}

impl ClientSettings {
    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.operation_timeout_ms)
    }

    pub fn monitor_interval(&self) -> Duration {
        Duration::from_millis(self.monitor_interval_ms)
    }

    pub fn idle_delay(&self) -> Duration {
        Duration::from_millis(self.idle_delay_ms)
    }
}
