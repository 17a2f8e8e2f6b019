//! # Notification Client
//!
//! Demo driver for the realtime notification client.
//!
//! This is the application entry point that initializes:
//! - Tracing/logging subsystem
//! - Configuration loading
//! - The realtime session and its subscriptions

use anyhow::Result;
use tracing::info;

use notification_client::config::Settings;
use notification_client::startup::Application;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber for structured logging
    notification_client::telemetry::init_tracing();

    info!("Starting notification client...");

    // Load configuration from environment and config files
    let settings = Settings::load()?;
    info!(
        host = %settings.endpoint.host,
        secure = settings.endpoint.secure,
        environment = %settings.environment,
        "Configuration loaded"
    );

    let application = Application::build(settings)?;
    application.run_until_stopped().await?;

    info!("Notification client stopped");
    Ok(())
}
