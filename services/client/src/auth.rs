//! services/client/src/auth.rs
//!
//! The session manager: single owner of the credential lifecycle.
//!
//! All persisted credential state is mutated here and nowhere else. Other
//! components read it through the synchronous accessors or subscribe to the
//! authentication-state channel.

use std::sync::Arc;

use telehealth_core::domain::{Credential, NewUser, Profile};
use telehealth_core::ports::{AuthApi, AuthError, CredentialStore};
use tokio::sync::{watch, Mutex};
use tracing::{debug, info};

//=========================================================================================
// SessionManager
//=========================================================================================

/// Owns the access token, refresh token, and cached profile, and broadcasts
/// the derived authentication state to subscribers.
///
/// Constructed once at process start; collaborators receive it as an
/// `Arc<SessionManager>` rather than reaching for ambient global state.
pub struct SessionManager {
    api: Arc<dyn AuthApi>,
    store: Arc<dyn CredentialStore>,
    auth_state: watch::Sender<bool>,
    /// Serializes token refreshes so concurrent 401s share one in-flight
    /// refresh instead of racing each other.
    refresh_gate: Mutex<()>,
}

impl SessionManager {
    /// Restores session state from the persisted slots. No network traffic;
    /// whatever survived the last process is trusted until a request fails.
    pub fn new(api: Arc<dyn AuthApi>, store: Arc<dyn CredentialStore>) -> Self {
        let restored = store.access_token().is_some();
        let (auth_state, _) = watch::channel(restored);
        Self {
            api,
            store,
            auth_state,
            refresh_gate: Mutex::new(()),
        }
    }

    //-------------------------------------------------------------------------------------
    // Credential lifecycle
    //-------------------------------------------------------------------------------------

    /// Creates a new account. On success all three slots are persisted and
    /// the authentication state flips to true; on failure nothing is mutated.
    pub async fn register(&self, user: &NewUser, password: &str) -> Result<Credential, AuthError> {
        let credential = self.api.register(user, password).await?;
        self.install(&credential);
        Ok(credential)
    }

    /// Logs in with an email and password. Same persistence semantics as
    /// [`register`](Self::register).
    pub async fn login(&self, email: &str, password: &str) -> Result<Credential, AuthError> {
        let credential = self.api.login(email, password).await?;
        self.install(&credential);
        Ok(credential)
    }

    /// Logs out. The server notification is a courtesy call whose failure is
    /// ignored; the local slots are cleared unconditionally. Idempotent.
    pub async fn logout(&self) {
        if let Some(refresh_token) = self.store.refresh_token() {
            if let Err(e) = self.api.logout(&refresh_token).await {
                debug!("Best-effort logout notification failed: {e}");
            }
        }
        self.store.clear();
        self.auth_state.send_replace(false);
        info!("Logged out; credential slots cleared.");
    }

    /// Obtains a new access token with the persisted refresh token and
    /// replaces only the access-token slot.
    ///
    /// Fails with `NoRefreshToken` when the slot is absent and
    /// `RefreshRejected` when the server turns the token down; the caller is
    /// responsible for forcing a logout in either case.
    pub async fn refresh(&self) -> Result<String, AuthError> {
        let _gate = self.refresh_gate.lock().await;
        self.refresh_locked().await
    }

    /// The de-duplicating refresh entry point used by the request pipeline.
    ///
    /// `stale` is the access token the failing call had attached. If another
    /// caller already completed a refresh while this one waited for the gate,
    /// the stored token no longer matches `stale` and is reused as-is; only
    /// one refresh is issued per batch of concurrent 401s.
    pub async fn refresh_reusing_current(&self, stale: &str) -> Result<String, AuthError> {
        let _gate = self.refresh_gate.lock().await;
        if let Some(current) = self.store.access_token() {
            if current != stale {
                debug!("Access token already refreshed by a concurrent call; reusing it.");
                return Ok(current);
            }
        }
        self.refresh_locked().await
    }

    async fn refresh_locked(&self) -> Result<String, AuthError> {
        let refresh_token = self
            .store
            .refresh_token()
            .ok_or(AuthError::NoRefreshToken)?;
        let access_token = self.api.refresh(&refresh_token).await?;
        self.store.replace_access_token(&access_token);
        Ok(access_token)
    }

    //-------------------------------------------------------------------------------------
    // Synchronous reads
    //-------------------------------------------------------------------------------------

    /// The cached profile from the last successful auth response.
    pub fn current_user(&self) -> Option<Profile> {
        self.store.profile()
    }

    pub fn current_access_token(&self) -> Option<String> {
        self.store.access_token()
    }

    pub fn current_refresh_token(&self) -> Option<String> {
        self.store.refresh_token()
    }

    pub fn is_authenticated(&self) -> bool {
        self.store.access_token().is_some()
    }

    /// Subscribes to the authentication-state signal. New subscribers
    /// immediately observe the current value; every transition is broadcast.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.auth_state.subscribe()
    }

    fn install(&self, credential: &Credential) {
        self.store.store(credential);
        self.auth_state.send_replace(true);
        info!(user_id = credential.user.id, "Authenticated.");
    }
}

//=========================================================================================
// Tests
//=========================================================================================
