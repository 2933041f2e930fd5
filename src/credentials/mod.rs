/// Credential store
///
/// Repository contract over persisted user records, plus the partial-update
/// patch type. The auth core depends only on this trait so the backing
/// store can be swapped and tests can run against an in-memory database.

mod store;

pub use store::{new_user_record, SqliteCredentialStore};

use crate::db::models::UserRecord;
use crate::error::AuthResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Partial update over a user record.
///
/// `None` leaves a field untouched; nullable columns use a nested `Option`
/// so they can be explicitly cleared. `updated_at` is always refreshed.
#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub password_hash: Option<String>,
    pub verified: Option<bool>,
    pub active: Option<bool>,
    pub locked: Option<bool>,
    pub locked_until: Option<Option<DateTime<Utc>>>,
    pub login_attempts: Option<i64>,
    pub last_login: Option<DateTime<Utc>>,
    pub reset_token: Option<Option<String>>,
    pub reset_expires: Option<Option<DateTime<Utc>>>,
    pub verify_token: Option<Option<String>>,
    pub verify_expires: Option<Option<DateTime<Utc>>>,
}

impl UserPatch {
    pub fn is_empty(&self) -> bool {
        self.password_hash.is_none()
            && self.verified.is_none()
            && self.active.is_none()
            && self.locked.is_none()
            && self.locked_until.is_none()
            && self.login_attempts.is_none()
            && self.last_login.is_none()
            && self.reset_token.is_none()
            && self.reset_expires.is_none()
            && self.verify_token.is_none()
            && self.verify_expires.is_none()
    }
}

/// Repository of persisted user records
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> AuthResult<Option<UserRecord>>;

    async fn find_by_id(&self, id: &str) -> AuthResult<Option<UserRecord>>;

    async fn find_by_reset_token(&self, token: &str) -> AuthResult<Option<UserRecord>>;

    async fn find_by_verify_token(&self, token: &str) -> AuthResult<Option<UserRecord>>;

    async fn insert(&self, user: &UserRecord) -> AuthResult<()>;

    /// Partial merge: only the fields listed in the patch change,
    /// `updated_at` is always refreshed.
    async fn update_fields(&self, id: &str, patch: UserPatch) -> AuthResult<()>;

    /// Atomic store-level increment of the failed-login counter.
    /// Returns the counter value after the increment.
    async fn increment_login_attempts(&self, id: &str) -> AuthResult<i64>;

    async fn delete(&self, id: &str) -> AuthResult<()>;
}
