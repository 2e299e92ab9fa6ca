use crate::core::client::{server_message, ApiClient};
use crate::domain::model::{Credentials, TokenGrant};
use crate::utils::error::{ConsoleError, Result, GENERIC_FAILURE_MESSAGE, NETWORK_FAILURE_MESSAGE};
use crate::utils::validation::Validate;
use std::sync::Arc;

/// Submits credentials to the auth endpoint and opens the session.
pub struct Authenticator {
    api: Arc<ApiClient>,
}

impl Authenticator {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }

    /// The auth call is not guarded: a 401 here means rejected credentials,
    /// never an expired session.
    pub async fn login(&self, credentials: &Credentials) -> Result<()> {
        credentials.validate()?;

        let settings = self.api.settings();
        let url = settings.url(&settings.auth_path);
        tracing::info!("Signing in as {}", credentials.username);

        let response = self
            .api
            .http()
            .post(&url)
            .json(credentials)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Auth request failed: {}", e);
                ConsoleError::NetworkFailure {
                    message: NETWORK_FAILURE_MESSAGE.to_string(),
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = server_message(response)
                .await
                .unwrap_or_else(|| GENERIC_FAILURE_MESSAGE.to_string());
            tracing::warn!("Login rejected with status {}", status);
            return Err(ConsoleError::InvalidCredential { message });
        }

        let grant: TokenGrant = response.json().await.map_err(|e| {
            tracing::error!("Auth response was not a token grant: {}", e);
            ConsoleError::UnexpectedResponse {
                message: "Auth response did not contain an access token".to_string(),
            }
        })?;

        let token = grant.into_token().ok_or_else(|| ConsoleError::UnexpectedResponse {
            message: "Auth response did not contain an access token".to_string(),
        })?;

        self.api.session().login(&token)
    }

    pub fn logout(&self) -> Result<()> {
        self.api.session().logout()
    }
}
