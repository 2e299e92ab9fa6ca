use crate::domain::model::{GuardDecision, Notice, SessionState, View, ACCESS_TOKEN_KEY};
use crate::domain::ports::{Navigator, Notifier, TokenStore};
use crate::utils::error::{ConsoleError, Result};
use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex, MutexGuard};

/// Token together with the generation it was read at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenSnapshot {
    pub token: Option<String>,
    pub generation: u64,
}

#[derive(Debug)]
struct SessionInner {
    state: SessionState,
    generation: u64,
    authenticated_since: Option<DateTime<Utc>>,
}

/// Sole owner of the bearer token.
///
/// Every write or clear of the token bumps `generation`, which lets the
/// HTTP client tell whether a 401 it received is already stale.
pub struct SessionService {
    store: Arc<dyn TokenStore>,
    navigator: Arc<dyn Navigator>,
    notifier: Arc<dyn Notifier>,
    clear_on_exit: bool,
    inner: Mutex<SessionInner>,
    refresh_gate: tokio::sync::Mutex<()>,
}

impl SessionService {
    pub fn new(
        store: Arc<dyn TokenStore>,
        navigator: Arc<dyn Navigator>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let restored = read_token(store.as_ref());
        let state = if restored.is_some() {
            tracing::debug!("Restored persisted session token");
            SessionState::Authenticated
        } else {
            SessionState::Anonymous
        };

        Self {
            store,
            navigator,
            notifier,
            clear_on_exit: false,
            inner: Mutex::new(SessionInner {
                state,
                generation: 0,
                authenticated_since: None,
            }),
            refresh_gate: tokio::sync::Mutex::new(()),
        }
    }

    /// Clear the token when the session is torn down instead of keeping it for the next run.
    pub fn with_clear_on_exit(mut self, clear_on_exit: bool) -> Self {
        self.clear_on_exit = clear_on_exit;
        self
    }

    fn lock(&self) -> MutexGuard<'_, SessionInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn get_token(&self) -> Option<String> {
        read_token(self.store.as_ref())
    }

    pub fn snapshot(&self) -> TokenSnapshot {
        let inner = self.lock();
        TokenSnapshot {
            token: read_token(self.store.as_ref()),
            generation: inner.generation,
        }
    }

    pub fn state(&self) -> SessionState {
        self.lock().state
    }

    pub fn authenticated_since(&self) -> Option<DateTime<Utc>> {
        self.lock().authenticated_since
    }

    pub fn generation(&self) -> u64 {
        self.lock().generation
    }

    /// Held while a token refresh is pending. Shared by every client built
    /// over this session, so concurrent 401s wait for one refresh.
    pub fn refresh_gate(&self) -> &tokio::sync::Mutex<()> {
        &self.refresh_gate
    }

    /// Adds the bearer credential when a token is stored; otherwise the
    /// request goes out without any authorization header.
    pub fn attach(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        Self::attach_token(request, self.get_token().as_deref())
    }

    pub fn attach_token(
        request: reqwest::RequestBuilder,
        token: Option<&str>,
    ) -> reqwest::RequestBuilder {
        match token {
            Some(token) if !token.trim().is_empty() => request.bearer_auth(token),
            _ => request,
        }
    }

    /// Guard evaluated before rendering a view. Never touches the network.
    pub fn require_auth(&self, view: &View) -> GuardDecision {
        if !view.is_protected() {
            return GuardDecision::Proceed;
        }

        if self.get_token().is_some() {
            return GuardDecision::Proceed;
        }

        tracing::info!("No session for {}, redirecting to login", view);
        self.navigator.navigate(View::Login);
        GuardDecision::Redirect(View::Login)
    }

    pub fn login(&self, token: &str) -> Result<()> {
        if token.trim().is_empty() {
            return Err(ConsoleError::validation("Refusing to store an empty access token"));
        }

        {
            let mut inner = self.lock();
            self.store.set(ACCESS_TOKEN_KEY, token)?;
            inner.state = SessionState::Authenticated;
            inner.generation += 1;
            inner.authenticated_since = Some(Utc::now());
        }

        tracing::info!("Session established");
        self.navigator.navigate(View::DEFAULT_PROTECTED);
        Ok(())
    }

    /// The session is anonymous afterwards even if the store fails; the
    /// store error is still returned.
    pub fn logout(&self) -> Result<()> {
        let cleared = self.clear();
        match &cleared {
            Ok(()) => tracing::info!("Logged out"),
            Err(e) => tracing::warn!("Logged out, but clearing the stored token failed: {}", e),
        }
        self.navigator.navigate(View::Login);
        cleared
    }

    /// Swaps in a refreshed token without navigating anywhere. Returns the
    /// new generation.
    pub fn replace_token(&self, token: &str) -> Result<u64> {
        if token.trim().is_empty() {
            return Err(ConsoleError::validation("Refusing to store an empty access token"));
        }

        let mut inner = self.lock();
        self.store.set(ACCESS_TOKEN_KEY, token)?;
        inner.state = SessionState::Authenticated;
        inner.generation += 1;
        if inner.authenticated_since.is_none() {
            inner.authenticated_since = Some(Utc::now());
        }
        tracing::debug!("Access token replaced (generation {})", inner.generation);
        Ok(inner.generation)
    }

    pub fn redirect_to_login(&self) {
        self.navigator.navigate(View::Login);
    }

    /// Drops the credential after a 401. The next guarded view redirects.
    pub fn invalidate(&self) {
        let mut inner = self.lock();
        if let Err(e) = self.clear_locked(&mut inner) {
            tracing::warn!("Failed to clear stored token: {}", e);
        }
    }

    /// Like [`invalidate`](Self::invalidate), but only while the token issued
    /// at `generation` is still current. Returns whether it cleared.
    pub fn invalidate_at(&self, generation: u64) -> bool {
        let mut inner = self.lock();
        if inner.generation != generation {
            tracing::debug!("Token changed since generation {}, keeping it", generation);
            return false;
        }
        if let Err(e) = self.clear_locked(&mut inner) {
            tracing::warn!("Failed to clear stored token: {}", e);
        }
        true
    }

    /// Unrecoverable 401: clear, show the expiry notice, then go to login.
    pub fn expire(&self) {
        self.invalidate();
        self.announce_expiry();
    }

    pub fn expire_at(&self, generation: u64) {
        if self.invalidate_at(generation) {
            self.announce_expiry();
        }
    }

    fn announce_expiry(&self) {
        tracing::warn!("Session expired");
        self.notifier.notify(&Notice::SessionExpired);
        self.navigator.navigate(View::Login);
    }

    /// Session-lifetime hook run when the console shuts down.
    pub fn teardown(&self) -> Result<()> {
        if self.clear_on_exit {
            tracing::debug!("Clearing session on exit");
            self.clear()?;
        }
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let mut inner = self.lock();
        self.clear_locked(&mut inner)
    }

    fn clear_locked(&self, inner: &mut SessionInner) -> Result<()> {
        let removed = self.store.remove(ACCESS_TOKEN_KEY);
        inner.state = SessionState::Anonymous;
        inner.generation += 1;
        inner.authenticated_since = None;
        removed
    }
}

fn read_token(store: &dyn TokenStore) -> Option<String> {
    match store.get(ACCESS_TOKEN_KEY) {
        Ok(token) => token.filter(|t| !t.trim().is_empty()),
        Err(e) => {
            tracing::warn!("Failed to read stored token: {}", e);
            None
        }
    }
}
