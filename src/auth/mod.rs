//! Authentication state for the client
//!
//! [`AuthSession`] owns the logged-in user and keeps three things in step:
//! the [`TokenStore`] (what survives a restart), the [`ApiClient`]'s
//! request context (what is sent on the wire), and the in-memory user
//! (what the guard checks).

pub mod guard;
pub mod token_store;

use std::sync::Arc;

use crate::api::types::{Role, User};
use crate::api::ApiClient;
use crate::config::{Config, TokenStoreKind};
use crate::error::{classify, Result};

pub use guard::{GuardOutcome, Route};
pub use token_store::{
    FileTokenStore, KeyringTokenStore, MemoryTokenStore, StoredToken, TokenStore,
};

/// Build the token store selected by `auth.token_store`.
///
/// The keyring entry is keyed by the backend host so that credentials for
/// different deployments are kept apart.
///
/// # Errors
///
/// Returns an error if the `file` store is selected without a
/// `token_file` and no platform data directory exists.
pub fn build_token_store(config: &Config) -> Result<Arc<dyn TokenStore>> {
    let store: Arc<dyn TokenStore> = match config.auth.token_store {
        TokenStoreKind::Keyring => {
            let account = url::Url::parse(&config.server.api_url)
                .ok()
                .and_then(|u| {
                    u.host_str()
                        .map(|h| format!("{}:{}", h, u.port_or_known_default().unwrap_or(0)))
                })
                .unwrap_or_else(|| config.server.api_url.clone());
            Arc::new(KeyringTokenStore::new(account))
        }
        TokenStoreKind::File => match &config.auth.token_file {
            Some(path) => Arc::new(FileTokenStore::new(path.clone())),
            None => Arc::new(FileTokenStore::in_data_dir()?),
        },
        TokenStoreKind::Memory => Arc::new(MemoryTokenStore::new()),
    };
    Ok(store)
}

/// The logged-in (or anonymous) state of the client.
pub struct AuthSession {
    api: ApiClient,
    store: Arc<dyn TokenStore>,
    user: Option<User>,
}

impl AuthSession {
    /// Create an anonymous session.
    pub fn new(api: ApiClient, store: Arc<dyn TokenStore>) -> Self {
        Self {
            api,
            store,
            user: None,
        }
    }

    /// The API client whose request context this session manages.
    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    /// The logged-in user, if any.
    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    /// Restore a session from the persisted token.
    ///
    /// With no stored token the session stays anonymous. With a token, the
    /// user is fetched from `/users/me`; if that fails for any reason the
    /// token is cleared and the session stays anonymous.
    ///
    /// # Returns
    ///
    /// The restored user, or `None` when the caller should be sent to login.
    ///
    /// # Errors
    ///
    /// Returns an error only when the token store itself fails to read.
    pub async fn restore(&mut self) -> Result<Option<User>> {
        let Some(stored) = self.store.load_token()? else {
            tracing::debug!("No stored token, starting anonymous");
            return Ok(None);
        };

        self.api.set_token(Some(stored.access_token)).await;
        match self.api.me().await {
            Ok(user) => {
                tracing::info!(user_id = %user.id, role = %user.role, "Session restored");
                self.user = Some(user.clone());
                Ok(Some(user))
            }
            Err(e) => {
                tracing::warn!("Failed to fetch user with stored token: {}", e);
                self.logout().await?;
                Ok(None)
            }
        }
    }

    /// Log in with email and password.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::StudyflowError::Authentication`] when the
    /// backend rejects the credentials; the session stays anonymous.
    pub async fn login(&mut self, email: &str, password: &str) -> Result<User> {
        let response = self.api.login(email, password).await?;
        self.establish(response.access_token, response.user).await
    }

    /// Register a new account and log in as it.
    pub async fn register(
        &mut self,
        email: &str,
        name: &str,
        password: &str,
        role: Role,
    ) -> Result<User> {
        let response = self.api.register(email, name, password, role).await?;
        self.establish(response.access_token, response.user).await
    }

    async fn establish(&mut self, access_token: String, user: User) -> Result<User> {
        self.store.save_token(&StoredToken::new(access_token.clone()))?;
        self.api.set_token(Some(access_token)).await;
        tracing::info!(user_id = %user.id, role = %user.role, "Logged in");
        self.user = Some(user.clone());
        Ok(user)
    }

    /// Forget the user and the token, both in memory and in the store.
    pub async fn logout(&mut self) -> Result<()> {
        self.user = None;
        self.api.set_token(None).await;
        self.store.delete_token()
    }

    /// Check access to an area that requires `required`.
    pub fn guard(&self, required: Option<Role>) -> GuardOutcome {
        guard::check(self.user.as_ref(), required)
    }

    /// React to an error from an authenticated call.
    ///
    /// Session expiry forces a logout and yields a redirect to login. Any
    /// other error leaves the session untouched and yields `None`.
    pub async fn handle_error(&mut self, err: &anyhow::Error) -> Option<GuardOutcome> {
        if !classify(err).is_some_and(|e| e.requires_login()) {
            return None;
        }
        tracing::warn!("Session no longer valid: {}", err);
        if let Err(e) = self.logout().await {
            tracing::warn!("Failed to clear stored token: {}", e);
        }
        Some(GuardOutcome::Redirect(Route::Login))
    }
}
