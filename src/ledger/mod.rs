/// Refresh-token ledger
///
/// Persisted refresh-token records grouped into families. Each family is
/// the lineage of tokens descended from one login; reuse of an
/// already-rotated token is treated as theft and revokes the whole family.

mod store;

pub use store::SqliteRefreshLedger;

use crate::db::models::RefreshTokenRecord;
use crate::error::AuthResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Outcome of a successful ledger verification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedRefresh {
    pub user_id: String,
    pub family: String,
}

/// Repository of persisted refresh-token records
#[async_trait]
pub trait RefreshTokenLedger: Send + Sync {
    /// Issue a new refresh token. `family = None` mints a fresh family id
    /// (first login of a session chain).
    async fn issue(&self, user_id: &str, family: Option<&str>)
        -> AuthResult<RefreshTokenRecord>;

    /// Check signature, expiry, and the ledger record. A token whose
    /// signature is valid but whose record is missing, revoked, or expired
    /// is invalid.
    async fn verify(&self, token: &str) -> AuthResult<Option<VerifiedRefresh>>;

    /// Rotate a refresh token: revoke the old record and issue a new token
    /// in the same family. Returns `None` when the old token is invalid;
    /// reuse of an already-revoked token additionally revokes the entire
    /// family (theft response).
    async fn rotate(&self, old_token: &str) -> AuthResult<Option<RefreshTokenRecord>>;

    /// Revoke a single token. Idempotent.
    async fn revoke_one(&self, token: &str) -> AuthResult<()>;

    /// Revoke every live token in a family
    async fn revoke_family(&self, family: &str) -> AuthResult<()>;

    /// Revoke every live token belonging to a user
    async fn revoke_all_for_user(&self, user_id: &str) -> AuthResult<()>;

    /// Delete records past their expiry. Runs out-of-band, not on the
    /// request path. Returns the number of deleted records.
    async fn sweep_expired(&self, now: DateTime<Utc>) -> AuthResult<u64>;
}
