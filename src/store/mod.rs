/// User Record Storage
///
/// The auth core only talks to storage through [`UserStore`]. Implementations
/// must make every refresh-token hash mutation atomic per user row; the
/// compare-and-set in [`UserStore::swap_refresh_token_hash`] is what keeps two
/// concurrent refreshes with the same token from both succeeding.

mod memory;
mod postgres;

pub use memory::InMemoryUserStore;
pub use postgres::PgUserStore;

use async_trait::async_trait;

use crate::error::StoreError;

/// Durable user record
#[derive(Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub id: i64,
    pub email: String,
    pub password_hash: String,
    /// `None` means no active session
    pub refresh_token_hash: Option<String>,
}

impl std::fmt::Debug for UserRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserRecord")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("password_hash", &"<redacted>")
            .field(
                "refresh_token_hash",
                &self.refresh_token_hash.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

/// Fields needed to create a user
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_id(&self, id: i64) -> Result<Option<UserRecord>, StoreError>;

    /// Exact, case-sensitive match
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError>;

    /// Insert a user with no refresh-token hash
    ///
    /// # Errors
    /// [`StoreError::Duplicate`] if the email is taken
    async fn insert(&self, user: NewUser) -> Result<UserRecord, StoreError>;

    /// Unconditionally overwrite the refresh-token hash.
    /// Returns `false` if no such user exists.
    async fn set_refresh_token_hash(&self, id: i64, hash: String) -> Result<bool, StoreError>;

    /// Replace the refresh-token hash only if it still equals `expected`.
    /// Returns `false` if the row changed underneath (or is missing).
    async fn swap_refresh_token_hash(
        &self,
        id: i64,
        expected: &str,
        hash: String,
    ) -> Result<bool, StoreError>;

    /// Clear the refresh-token hash if present.
    /// Returns `true` only when a session was actually ended.
    async fn clear_refresh_token_hash(&self, id: i64) -> Result<bool, StoreError>;
}
