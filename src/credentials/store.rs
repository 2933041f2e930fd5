/// SQLite credential store using runtime queries
use crate::{
    credentials::{CredentialStore, UserPatch},
    db::models::{Role, UserRecord},
    error::{AuthError, AuthResult},
};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};

const USER_COLUMNS: &str = "id, email, password_hash, role, verified, active, locked, \
     locked_until, login_attempts, last_login, reset_token, reset_expires, \
     verify_token, verify_expires, created_at, updated_at";

/// Credential store backed by the auth SQLite database
pub struct SqliteCredentialStore {
    db: SqlitePool,
}

impl SqliteCredentialStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    fn user_from_row(row: &sqlx::sqlite::SqliteRow) -> AuthResult<UserRecord> {
        let role_str: String = row.try_get("role")?;

        Ok(UserRecord {
            id: row.try_get("id")?,
            email: row.try_get("email")?,
            password_hash: row.try_get("password_hash")?,
            role: Role::parse(&role_str)?,
            verified: row.try_get("verified")?,
            active: row.try_get("active")?,
            locked: row.try_get("locked")?,
            locked_until: row.try_get("locked_until")?,
            login_attempts: row.try_get("login_attempts")?,
            last_login: row.try_get("last_login")?,
            reset_token: row.try_get("reset_token")?,
            reset_expires: row.try_get("reset_expires")?,
            verify_token: row.try_get("verify_token")?,
            verify_expires: row.try_get("verify_expires")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    async fn find_one(&self, column: &str, value: &str) -> AuthResult<Option<UserRecord>> {
        let sql = format!(
            "SELECT {} FROM user_account WHERE {} = ?1",
            USER_COLUMNS, column
        );

        let row = sqlx::query(&sql)
            .bind(value)
            .fetch_optional(&self.db)
            .await
            .map_err(AuthError::Database)?;

        row.as_ref().map(Self::user_from_row).transpose()
    }
}

#[async_trait]
impl CredentialStore for SqliteCredentialStore {
    async fn find_by_email(&self, email: &str) -> AuthResult<Option<UserRecord>> {
        self.find_one("email", email).await
    }

    async fn find_by_id(&self, id: &str) -> AuthResult<Option<UserRecord>> {
        self.find_one("id", id).await
    }

    async fn find_by_reset_token(&self, token: &str) -> AuthResult<Option<UserRecord>> {
        self.find_one("reset_token", token).await
    }

    async fn find_by_verify_token(&self, token: &str) -> AuthResult<Option<UserRecord>> {
        self.find_one("verify_token", token).await
    }

    async fn insert(&self, user: &UserRecord) -> AuthResult<()> {
        sqlx::query(
            "INSERT INTO user_account (id, email, password_hash, role, verified, active, \
             locked, locked_until, login_attempts, last_login, reset_token, reset_expires, \
             verify_token, verify_expires, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
        )
        .bind(&user.id)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(user.verified)
        .bind(user.active)
        .bind(user.locked)
        .bind(user.locked_until)
        .bind(user.login_attempts)
        .bind(user.last_login)
        .bind(&user.reset_token)
        .bind(&user.reset_expires)
        .bind(&user.verify_token)
        .bind(&user.verify_expires)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.db)
        .await
        .map_err(AuthError::Database)?;

        Ok(())
    }

    async fn update_fields(&self, id: &str, patch: UserPatch) -> AuthResult<()> {
        if patch.is_empty() {
            return Ok(());
        }

        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE user_account SET updated_at = ");
        qb.push_bind(Utc::now());

        if let Some(v) = patch.password_hash {
            qb.push(", password_hash = ").push_bind(v);
        }
        if let Some(v) = patch.verified {
            qb.push(", verified = ").push_bind(v);
        }
        if let Some(v) = patch.active {
            qb.push(", active = ").push_bind(v);
        }
        if let Some(v) = patch.locked {
            qb.push(", locked = ").push_bind(v);
        }
        if let Some(v) = patch.locked_until {
            qb.push(", locked_until = ").push_bind(v);
        }
        if let Some(v) = patch.login_attempts {
            qb.push(", login_attempts = ").push_bind(v);
        }
        if let Some(v) = patch.last_login {
            qb.push(", last_login = ").push_bind(v);
        }
        if let Some(v) = patch.reset_token {
            qb.push(", reset_token = ").push_bind(v);
        }
        if let Some(v) = patch.reset_expires {
            qb.push(", reset_expires = ").push_bind(v);
        }
        if let Some(v) = patch.verify_token {
            qb.push(", verify_token = ").push_bind(v);
        }
        if let Some(v) = patch.verify_expires {
            qb.push(", verify_expires = ").push_bind(v);
        }

        qb.push(" WHERE id = ").push_bind(id);

        let result = qb.build().execute(&self.db).await.map_err(AuthError::Database)?;

        if result.rows_affected() == 0 {
            return Err(AuthError::NotFound("User not found".to_string()));
        }

        Ok(())
    }

    async fn increment_login_attempts(&self, id: &str) -> AuthResult<i64> {
        // Single-statement read-modify-write so concurrent failures can
        // never lose the locked flag (see LockoutPolicy)
        let count: i64 = sqlx::query_scalar(
            "UPDATE user_account SET login_attempts = login_attempts + 1, updated_at = ?1
             WHERE id = ?2
             RETURNING login_attempts",
        )
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .map_err(AuthError::Database)?
        .ok_or_else(|| AuthError::NotFound("User not found".to_string()))?;

        Ok(count)
    }

    async fn delete(&self, id: &str) -> AuthResult<()> {
        sqlx::query("DELETE FROM user_account WHERE id = ?1")
            .bind(id)
            .execute(&self.db)
            .await
            .map_err(AuthError::Database)?;

        Ok(())
    }
}

/// Build a fresh user record with defaults for a new registration
pub fn new_user_record(email: &str, password_hash: &str, role: Role) -> UserRecord {
    let now = Utc::now();
    UserRecord {
        id: uuid::Uuid::new_v4().to_string(),
        email: email.to_string(),
        password_hash: password_hash.to_string(),
        role,
        verified: false,
        active: true,
        locked: false,
        locked_until: None,
        login_attempts: 0,
        last_login: None,
        reset_token: None,
        reset_expires: None,
        verify_token: None,
        verify_expires: None,
        created_at: now,
        updated_at: now,
    }
}
