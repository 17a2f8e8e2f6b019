//! Provisioning Services
//!
//! Plain request/response REST calls that create the notification
//! subscription and subscriber token a realtime session is opened with. No
//! protocol state lives here.

mod models;
mod subscription_service;
mod token_service;

use std::time::Duration;

use reqwest::{Client, RequestBuilder};

use crate::config::Settings;
use crate::shared::error::ApiError;

pub use models::{
    ConnectionData, NotificationSubscription, SubscriptionContext, SubscriptionFilter,
    SubscriptionSource, TokenClaim,
};
pub use subscription_service::{HttpSubscriptionService, SubscriptionService};
pub use token_service::{HttpTokenService, TokenService};

/// Authenticated HTTP client shared by the provisioning services.
#[derive(Clone)]
pub struct ProvisioningClient {
    http: Client,
    base_url: String,
    username: String,
    password: String,
}

impl ProvisioningClient {
    pub fn new(
        base_url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ApiError> {
        let http = Client::builder().timeout(timeout).build()?;
        let mut base_url = base_url.into();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }

        Ok(Self {
            http,
            base_url,
            username: username.into(),
            password: password.into(),
        })
    }

    /// Build from application settings.
    pub fn from_settings(settings: &Settings) -> Result<Self, ApiError> {
        Self::new(
            settings.http_url(),
            settings.credentials.username.clone(),
            settings.credentials.password.clone(),
            settings.client.operation_timeout(),
        )
    }

    fn post(&self, path: &str) -> RequestBuilder {
        self.http
            .post(format!("{}{}", self.base_url, path))
            .basic_auth(&self.username, Some(&self.password))
    }

    fn delete(&self, path: &str) -> RequestBuilder {
        self.http
            .delete(format!("{}{}", self.base_url, path))
            .basic_auth(&self.username, Some(&self.password))
    }
}
