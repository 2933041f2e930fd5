/// SQLite refresh-token ledger using runtime queries
use crate::{
    db::models::RefreshTokenRecord,
    error::{AuthError, AuthResult},
    ledger::{RefreshTokenLedger, VerifiedRefresh},
    tokens::TokenIssuer,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use std::sync::Arc;
use uuid::Uuid;

/// Refresh-token ledger backed by the auth SQLite database
pub struct SqliteRefreshLedger {
    db: SqlitePool,
    issuer: Arc<TokenIssuer>,
}

impl SqliteRefreshLedger {
    pub fn new(db: SqlitePool, issuer: Arc<TokenIssuer>) -> Self {
        Self { db, issuer }
    }

    async fn fetch_record(&self, token: &str) -> AuthResult<Option<RefreshTokenRecord>> {
        let row = sqlx::query(
            "SELECT token, user_id, family, expires_at, is_revoked, created_at, updated_at
             FROM refresh_token WHERE token = ?1",
        )
        .bind(token)
        .fetch_optional(&self.db)
        .await
        .map_err(AuthError::Database)?;

        let Some(row) = row else {
            return Ok(None);
        };

        Ok(Some(RefreshTokenRecord {
            token: row.try_get("token")?,
            user_id: row.try_get("user_id")?,
            family: row.try_get("family")?,
            expires_at: row.try_get("expires_at")?,
            is_revoked: row.try_get("is_revoked")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        }))
    }

    /// Revoke the old record if and only if it is still live. Returns true
    /// when this call was the one that revoked it; a concurrent rotation
    /// racing on the same token sees false and takes the theft path.
    async fn claim(&self, token: &str, now: DateTime<Utc>) -> AuthResult<bool> {
        let result = sqlx::query(
            "UPDATE refresh_token SET is_revoked = 1, updated_at = ?1
             WHERE token = ?2 AND is_revoked = 0",
        )
        .bind(now)
        .bind(token)
        .execute(&self.db)
        .await
        .map_err(AuthError::Database)?;

        Ok(result.rows_affected() == 1)
    }
}

#[async_trait]
impl RefreshTokenLedger for SqliteRefreshLedger {
    async fn issue(
        &self,
        user_id: &str,
        family: Option<&str>,
    ) -> AuthResult<RefreshTokenRecord> {
        let family = family
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let token = self.issuer.issue_refresh(user_id, &family)?;
        let now = Utc::now();
        let expires_at = now + self.issuer.refresh_ttl();

        sqlx::query(
            "INSERT INTO refresh_token (token, user_id, family, expires_at, is_revoked, \
             created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )
        .bind(&token)
        .bind(user_id)
        .bind(&family)
        .bind(expires_at)
        .bind(false)
        .bind(now)
        .bind(now)
        .execute(&self.db)
        .await
        .map_err(AuthError::Database)?;

        Ok(RefreshTokenRecord {
            token,
            user_id: user_id.to_string(),
            family,
            expires_at,
            is_revoked: false,
            created_at: now,
            updated_at: now,
        })
    }

    async fn verify(&self, token: &str) -> AuthResult<Option<VerifiedRefresh>> {
        if self.issuer.verify_refresh(token).is_err() {
            return Ok(None);
        }

        let Some(record) = self.fetch_record(token).await? else {
            return Ok(None);
        };

        if record.is_revoked || record.expires_at < Utc::now() {
            return Ok(None);
        }

        Ok(Some(VerifiedRefresh {
            user_id: record.user_id,
            family: record.family,
        }))
    }

    async fn rotate(&self, old_token: &str) -> AuthResult<Option<RefreshTokenRecord>> {
        // A forged or expired signature identifies no family; nothing to
        // revoke beyond refusing the call
        let claims = match self.issuer.verify_refresh(old_token) {
            Ok(claims) => claims,
            Err(_) => return Ok(None),
        };

        let now = Utc::now();

        if !self.claim(old_token, now).await? {
            // The token was already rotated (or never persisted): someone
            // is replaying a stale credential. Kill the whole lineage.
            tracing::warn!(
                user_id = %claims.sub,
                family = %claims.fam,
                "Refresh token reuse detected, revoking family"
            );
            self.revoke_family(&claims.fam).await?;
            return Ok(None);
        }

        // Claimed but past its store expiry: no replacement, caller
        // re-authenticates
        let Some(record) = self.fetch_record(old_token).await? else {
            return Ok(None);
        };
        if record.expires_at < now {
            return Ok(None);
        }

        // Revoke-then-issue: a crash here leaves no live token in the
        // family, which fails safe by forcing re-login
        let new_record = self.issue(&claims.sub, Some(&claims.fam)).await?;

        Ok(Some(new_record))
    }

    async fn revoke_one(&self, token: &str) -> AuthResult<()> {
        sqlx::query(
            "UPDATE refresh_token SET is_revoked = 1, updated_at = ?1
             WHERE token = ?2 AND is_revoked = 0",
        )
        .bind(Utc::now())
        .bind(token)
        .execute(&self.db)
        .await
        .map_err(AuthError::Database)?;

        Ok(())
    }

    async fn revoke_family(&self, family: &str) -> AuthResult<()> {
        let result = sqlx::query(
            "UPDATE refresh_token SET is_revoked = 1, updated_at = ?1
             WHERE family = ?2 AND is_revoked = 0",
        )
        .bind(Utc::now())
        .bind(family)
        .execute(&self.db)
        .await
        .map_err(AuthError::Database)?;

        if result.rows_affected() > 0 {
            tracing::info!(family, revoked = result.rows_affected(), "Revoked token family");
        }

        Ok(())
    }

    async fn revoke_all_for_user(&self, user_id: &str) -> AuthResult<()> {
        let result = sqlx::query(
            "UPDATE refresh_token SET is_revoked = 1, updated_at = ?1
             WHERE user_id = ?2 AND is_revoked = 0",
        )
        .bind(Utc::now())
        .bind(user_id)
        .execute(&self.db)
        .await
        .map_err(AuthError::Database)?;

        if result.rows_affected() > 0 {
            tracing::info!(
                user_id,
                revoked = result.rows_affected(),
                "Revoked all refresh tokens for user"
            );
        }

        Ok(())
    }

    async fn sweep_expired(&self, now: DateTime<Utc>) -> AuthResult<u64> {
        let result = sqlx::query("DELETE FROM refresh_token WHERE expires_at < ?1")
            .bind(now)
            .execute(&self.db)
            .await
            .map_err(AuthError::Database)?;

        Ok(result.rows_affected())
    }
}
