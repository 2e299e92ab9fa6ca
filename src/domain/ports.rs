use crate::domain::model::{Notice, View};
use crate::utils::error::Result;
use async_trait::async_trait;

/// Persistent key/value storage surviving restarts (the browser's local storage).
pub trait TokenStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

pub trait Navigator: Send + Sync {
    fn navigate(&self, view: View);
}

/// Shows a notice and returns once the user acknowledged it.
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: &Notice);
}

/// Exchanges the current session for a fresh bearer token.
///
/// `Ok(None)` means the server answered but produced no token; callers treat
/// it exactly like an error.
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    async fn refresh(&self, current: Option<&str>) -> Result<Option<String>>;
}

pub trait ConfigProvider: Send + Sync {
    fn api_base_url(&self) -> &str;
    fn auth_path(&self) -> &str;
    fn refresh_path(&self) -> &str;
    fn request_timeout_seconds(&self) -> u64;
    fn token_file(&self) -> &str;
    fn unauthorized_policy(&self) -> crate::domain::model::UnauthorizedPolicy;
    fn clear_on_exit(&self) -> bool;
}
