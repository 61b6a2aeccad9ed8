/// Session Orchestration
///
/// Signup, signin, logout and refresh on top of the user store, the secret
/// hasher and the token codec. Per user the session is either logged out
/// (no refresh-token hash) or logged in (hash of the one live refresh
/// token). Every issuance overwrites the hash, which is the only way a
/// previous refresh token is revoked.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use crate::auth::jwt::{TokenCodec, TokenPair};
use crate::auth::password::SecretHasher;
use crate::error::{AppError, AuthError, StoreError};
use crate::store::{NewUser, UserStore};
use crate::validators::{is_valid_email, is_valid_password};

const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(5);

/// Email/password pair submitted by a client
#[derive(Clone, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Clone)]
pub struct AuthCore {
    store: Arc<dyn UserStore>,
    codec: Arc<TokenCodec>,
    hasher: SecretHasher,
    store_timeout: Duration,
}

impl AuthCore {
    pub fn new(store: Arc<dyn UserStore>, codec: Arc<TokenCodec>, hasher: SecretHasher) -> Self {
        Self {
            store,
            codec,
            hasher,
            store_timeout: DEFAULT_STORE_TIMEOUT,
        }
    }

    pub fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = timeout;
        self
    }

    pub fn codec(&self) -> Arc<TokenCodec> {
        self.codec.clone()
    }

    /// Register a new user and open their first session
    ///
    /// # Errors
    /// - `Validation` for a malformed email or empty password
    /// - `Auth(Conflict)` if the email is already registered
    /// - `Store` on store failure; never retried here, since a retry could
    ///   duplicate a committed insert
    #[tracing::instrument(name = "signup", skip_all)]
    pub async fn signup(&self, credentials: Credentials) -> Result<TokenPair, AppError> {
        let email = is_valid_email(&credentials.email)?;
        is_valid_password(&credentials.password)?;

        if self
            .with_timeout(self.store.find_by_email(&email))
            .await?
            .is_some()
        {
            return Err(AuthError::Conflict.into());
        }

        let password_hash = self.hash_secret(credentials.password).await?;
        let user = self
            .with_timeout(self.store.insert(NewUser {
                email,
                password_hash,
            }))
            .await
            .map_err(|e| match e {
                AppError::Store(StoreError::Duplicate) => AuthError::Conflict.into(),
                other => other,
            })?;

        let tokens = self.open_session(user.id, &user.email).await?;
        tracing::info!(user_id = user.id, "User signed up");
        Ok(tokens)
    }

    /// Authenticate by password and reset the session
    ///
    /// Any previously issued refresh token stops working.
    ///
    /// # Errors
    /// - `Auth(NotFound)` if no user has this email
    /// - `Auth(InvalidCredentials)` if the password does not verify
    #[tracing::instrument(name = "signin", skip_all)]
    pub async fn signin(&self, credentials: Credentials) -> Result<TokenPair, AppError> {
        let email = is_valid_email(&credentials.email)?;
        is_valid_password(&credentials.password)?;

        let user = self
            .with_timeout(self.store.find_by_email(&email))
            .await?
            .ok_or(AuthError::NotFound)?;

        if !self
            .verify_secret(credentials.password, user.password_hash)
            .await?
        {
            return Err(AuthError::InvalidCredentials.into());
        }

        let tokens = self.open_session(user.id, &user.email).await?;
        tracing::info!(user_id = user.id, "User signed in");
        Ok(tokens)
    }

    /// End the user's session. Idempotent.
    ///
    /// An unknown id is a silent no-op so logout never reveals whether a user
    /// exists; confirm before turning this into an error.
    #[tracing::instrument(name = "logout", skip(self))]
    pub async fn logout(&self, subject_id: i64) -> Result<(), AppError> {
        let ended = self
            .with_timeout(self.store.clear_refresh_token_hash(subject_id))
            .await?;

        if ended {
            tracing::info!(user_id = subject_id, "User logged out");
        } else {
            tracing::debug!(user_id = subject_id, "Logout without an active session");
        }
        Ok(())
    }

    /// Rotate the session: exchange the live refresh token for a new pair
    ///
    /// The presented token's signature and expiry are checked upstream by the
    /// refresh guard; here it is only compared with the stored hash.
    ///
    /// # Errors
    /// - `Auth(NotFound)` if the user does not exist
    /// - `Auth(NotLoggedIn)` if the user has no active session
    /// - `Auth(AccessDenied)` if the token is stale or forged, or a concurrent
    ///   rotation won the race
    #[tracing::instrument(name = "refresh_token", skip(self, presented_refresh_token))]
    pub async fn refresh_token(
        &self,
        subject_id: i64,
        presented_refresh_token: &str,
    ) -> Result<TokenPair, AppError> {
        let user = self
            .with_timeout(self.store.find_by_id(subject_id))
            .await?
            .ok_or(AuthError::NotFound)?;

        let current_hash = user.refresh_token_hash.ok_or(AuthError::NotLoggedIn)?;

        if !self
            .verify_secret(presented_refresh_token.to_string(), current_hash.clone())
            .await?
        {
            return Err(AuthError::AccessDenied.into());
        }

        let tokens = self.codec.issue_pair(user.id, &user.email)?;
        let new_hash = self.hash_secret(tokens.refresh_token.clone()).await?;

        let swapped = self
            .with_timeout(
                self.store
                    .swap_refresh_token_hash(user.id, &current_hash, new_hash),
            )
            .await?;
        if !swapped {
            tracing::warn!(user_id = user.id, "Refresh lost a concurrent rotation");
            return Err(AuthError::AccessDenied.into());
        }

        tracing::info!(user_id = user.id, "Refresh token rotated");
        Ok(tokens)
    }

    /// Issue a pair and make its refresh token the only live one
    async fn open_session(&self, user_id: i64, email: &str) -> Result<TokenPair, AppError> {
        let tokens = self.codec.issue_pair(user_id, email)?;
        let refresh_hash = self.hash_secret(tokens.refresh_token.clone()).await?;

        if !self
            .with_timeout(self.store.set_refresh_token_hash(user_id, refresh_hash))
            .await?
        {
            return Err(AuthError::NotFound.into());
        }
        Ok(tokens)
    }

    async fn with_timeout<T>(
        &self,
        call: impl Future<Output = Result<T, StoreError>>,
    ) -> Result<T, AppError> {
        match tokio::time::timeout(self.store_timeout, call).await {
            Ok(result) => result.map_err(AppError::from),
            Err(_) => Err(StoreError::Timeout.into()),
        }
    }

    // bcrypt is CPU-bound; keep it off the async workers
    async fn hash_secret(&self, secret: String) -> Result<String, AppError> {
        let hasher = self.hasher;
        tokio::task::spawn_blocking(move || hasher.hash(&secret))
            .await
            .map_err(|e| AppError::Internal(format!("Hashing task failed: {}", e)))?
    }

    async fn verify_secret(&self, secret: String, stored_hash: String) -> Result<bool, AppError> {
        let hasher = self.hasher;
        tokio::task::spawn_blocking(move || hasher.verify(&secret, &stored_hash))
            .await
            .map_err(|e| AppError::Internal(format!("Verification task failed: {}", e)))
    }
}
