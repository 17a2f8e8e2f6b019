//! Notification token REST service.

use async_trait::async_trait;

use super::models::{CreatedToken, TokenClaim, UnsubscribeResult};
use super::ProvisioningClient;
use crate::shared::error::ApiError;

/// Issues and revokes subscriber tokens.
#[async_trait]
pub trait TokenService: Send + Sync {
    async fn create_token(&self, claim: &TokenClaim) -> Result<String, ApiError>;

    /// Unsubscribe the subscriber the token was issued for.
    async fn unsubscribe(&self, token: &str) -> Result<(), ApiError>;
}

/// [`TokenService`] over `notification2/token` and `notification2/unsubscribe`.
#[derive(Clone)]
pub struct HttpTokenService {
    client: ProvisioningClient,
}

impl HttpTokenService {
    pub fn new(client: ProvisioningClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl TokenService for HttpTokenService {
    async fn create_token(&self, claim: &TokenClaim) -> Result<String, ApiError> {
        let created: CreatedToken = self
            .client
            .post("notification2/token")
            .json(claim)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        created.token.ok_or_else(ApiError::null_result)
    }

    async fn unsubscribe(&self, token: &str) -> Result<(), ApiError> {
        let result: UnsubscribeResult = self
            .client
            .post("notification2/unsubscribe")
            .query(&[("token", token)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        match result.result {
            Some(_) => Ok(()),
            None => Err(ApiError::null_result()),
        }
    }
}
