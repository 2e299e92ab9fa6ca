use crate::core::session::{SessionService, TokenSnapshot};
use crate::domain::model::{ServerMessage, TokenGrant, UnauthorizedPolicy};
use crate::domain::ports::{ConfigProvider, TokenRefresher};
use crate::utils::error::{ConsoleError, Result, GENERIC_FAILURE_MESSAGE};
use crate::utils::validation::validate_url;
use async_trait::async_trait;
use reqwest::{header, Client, Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ApiSettings {
    pub base_url: String,
    pub auth_path: String,
    pub refresh_path: String,
    pub timeout: Duration,
    pub policy: UnauthorizedPolicy,
}

impl ApiSettings {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            auth_path: "/auth".to_string(),
            refresh_path: "/refresh".to_string(),
            timeout: Duration::from_secs(30),
            policy: UnauthorizedPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: UnauthorizedPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn from_config<C: ConfigProvider + ?Sized>(config: &C) -> Self {
        Self {
            base_url: config.api_base_url().to_string(),
            auth_path: config.auth_path().to_string(),
            refresh_path: config.refresh_path().to_string(),
            timeout: Duration::from_secs(config.request_timeout_seconds()),
            policy: config.unauthorized_policy(),
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}

pub(crate) fn build_http_client(timeout: Duration) -> Result<Client> {
    let mut headers = header::HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        header::HeaderValue::from_static("application/json"),
    );

    Client::builder()
        .default_headers(headers)
        .cookie_store(true)
        .timeout(timeout)
        .build()
        .map_err(|e| ConsoleError::ConfigError {
            message: format!("Failed to build HTTP client: {}", e),
        })
}

/// Pulls `message`/`Message` out of an error body, if there is one.
pub(crate) async fn server_message(response: Response) -> Option<String> {
    let bytes = response.bytes().await.ok()?;
    serde_json::from_slice::<ServerMessage>(&bytes).ok()?.text()
}

/// Calls the refresh endpoint over HTTP.
pub struct HttpRefresher {
    client: Client,
    url: String,
}

impl HttpRefresher {
    pub fn new(client: Client, url: String) -> Self {
        Self { client, url }
    }
}

#[async_trait]
impl TokenRefresher for HttpRefresher {
    async fn refresh(&self, current: Option<&str>) -> Result<Option<String>> {
        let request = SessionService::attach_token(self.client.get(&self.url), current);
        let response = request.send().await.map_err(ConsoleError::network)?;
        let status = response.status();
        tracing::debug!("Refresh response status: {}", status);

        if !status.is_success() {
            return Ok(None);
        }

        let grant: TokenGrant = response.json().await.map_err(ConsoleError::network)?;
        Ok(grant.into_token())
    }
}

/// HTTP client for guarded requests.
///
/// Every request carries the session token when one exists. A 401 is handled
/// by the single configured [`UnauthorizedPolicy`]; under refresh-and-retry
/// concurrent 401s share one refresh call through the session's refresh gate.
pub struct ApiClient {
    client: Client,
    settings: ApiSettings,
    session: Arc<SessionService>,
    refresher: Arc<dyn TokenRefresher>,
}

impl ApiClient {
    pub fn new(settings: ApiSettings, session: Arc<SessionService>) -> Result<Self> {
        validate_url("api.base_url", &settings.base_url)?;
        let client = build_http_client(settings.timeout)?;
        let refresher = Arc::new(HttpRefresher::new(
            client.clone(),
            settings.url(&settings.refresh_path),
        ));

        Ok(Self {
            client,
            settings,
            session,
            refresher,
        })
    }

    pub fn with_refresher(mut self, refresher: Arc<dyn TokenRefresher>) -> Self {
        self.refresher = refresher;
        self
    }

    pub fn session(&self) -> &Arc<SessionService> {
        &self.session
    }

    pub fn settings(&self) -> &ApiSettings {
        &self.settings
    }

    pub(crate) fn http(&self) -> &Client {
        &self.client
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.send(Method::GET, path, None).await?;
        decode(response).await
    }

    pub async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let body = serde_json::to_value(body)?;
        let response = self.send(Method::POST, path, Some(&body)).await?;
        decode(response).await
    }

    pub async fn put_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let body = serde_json::to_value(body)?;
        let response = self.send(Method::PUT, path, Some(&body)).await?;
        decode(response).await
    }

    pub async fn delete_json<T: DeserializeOwned>(
        &self,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<T> {
        let response = self.send(Method::DELETE, path, body).await?;
        decode(response).await
    }

    pub async fn get_bytes(&self, path: &str) -> Result<Vec<u8>> {
        let response = self.send(Method::GET, path, None).await?;
        let bytes = response.bytes().await.map_err(ConsoleError::network)?;
        Ok(bytes.to_vec())
    }

    /// Sends a guarded request and returns the successful response.
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<Response> {
        let snapshot = self.session.snapshot();
        let response = self
            .dispatch(&method, path, body, snapshot.token.as_deref())
            .await?;

        if response.status() != StatusCode::UNAUTHORIZED {
            return ensure_success(response).await;
        }

        tracing::warn!("401 Unauthorized on {} {}", method, path);

        if snapshot.token.is_none() {
            self.session.redirect_to_login();
            return Err(ConsoleError::NoCredential);
        }

        match self.settings.policy {
            UnauthorizedPolicy::ClearAndRedirect => {
                self.session.invalidate_at(snapshot.generation);
                Err(ConsoleError::ExpiredSession)
            }
            UnauthorizedPolicy::RefreshAndRetry => {
                let refreshed = self.refreshed_token(snapshot.generation).await?;
                let token = refreshed.token.ok_or(ConsoleError::ExpiredSession)?;
                tracing::debug!("Retrying {} {} with refreshed token", method, path);

                let retried = self.dispatch(&method, path, body, Some(&token)).await?;
                if retried.status() == StatusCode::UNAUTHORIZED {
                    tracing::warn!("Retry of {} {} still unauthorized", method, path);
                    self.session.expire_at(refreshed.generation);
                    return Err(ConsoleError::ExpiredSession);
                }
                ensure_success(retried).await
            }
        }
    }

    /// Returns a token newer than `seen_generation`, refreshing at most once
    /// across all callers that observed the same generation.
    async fn refreshed_token(&self, seen_generation: u64) -> Result<TokenSnapshot> {
        let _gate = self.session.refresh_gate().lock().await;

        let current = self.session.snapshot();
        if current.generation != seen_generation {
            tracing::debug!("Token already replaced by another request");
            return match current.token {
                Some(_) => Ok(current),
                None => Err(ConsoleError::ExpiredSession),
            };
        }

        tracing::info!("Attempting silent token refresh");
        let refreshed = match self.refresher.refresh(current.token.as_deref()).await {
            Ok(token) => token,
            Err(e) => {
                tracing::warn!("Token refresh failed: {}", e);
                None
            }
        };

        match refreshed {
            Some(token) => {
                let generation = self.session.replace_token(&token)?;
                tracing::info!("Token refreshed");
                Ok(TokenSnapshot {
                    token: Some(token),
                    generation,
                })
            }
            None => {
                self.session.expire_at(current.generation);
                Err(ConsoleError::ExpiredSession)
            }
        }
    }

    async fn dispatch(
        &self,
        method: &Method,
        path: &str,
        body: Option<&serde_json::Value>,
        token: Option<&str>,
    ) -> Result<Response> {
        let url = self.settings.url(path);
        tracing::debug!("{} {} (authenticated: {})", method, url, token.is_some());

        let mut request =
            SessionService::attach_token(self.client.request(method.clone(), &url), token);
        if let Some(body) = body {
            request = request.json(body);
        }

        request.send().await.map_err(ConsoleError::network)
    }
}

async fn ensure_success(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    tracing::debug!("Request failed with status {}", status);
    let message = server_message(response)
        .await
        .unwrap_or_else(|| GENERIC_FAILURE_MESSAGE.to_string());
    Err(ConsoleError::Api {
        status: status.as_u16(),
        message,
    })
}

/// Decodes a JSON body; an empty body decodes as `null`.
async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    let bytes = response.bytes().await.map_err(ConsoleError::network)?;
    let slice: &[u8] = if bytes.iter().all(|b| b.is_ascii_whitespace()) {
        b"null"
    } else {
        &bytes
    };
    serde_json::from_slice(slice).map_err(|e| ConsoleError::UnexpectedResponse {
        message: format!("Invalid JSON body: {}", e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_joins_without_double_slash() {
        let settings = ApiSettings::new("http://localhost:3500/");
        assert_eq!(settings.url("/inventory"), "http://localhost:3500/inventory");
        assert_eq!(settings.policy, UnauthorizedPolicy::RefreshAndRetry);
    }
}
