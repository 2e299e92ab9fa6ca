pub mod auth;
pub mod client;
pub mod resources;
pub mod session;

pub use crate::domain::model::{GuardDecision, SessionState, UnauthorizedPolicy, View};
pub use crate::domain::ports::{ConfigProvider, Navigator, Notifier, TokenRefresher, TokenStore};
pub use crate::utils::error::Result;
