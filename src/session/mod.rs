/// Session lifecycle orchestration
///
/// Ties the credential store, lockout policy, password hasher, token issuer,
/// and refresh-token ledger together behind the operations the HTTP layer
/// exposes: register, verify, login, refresh, logout, password reset, and
/// the admin unlock/revoke actions.
use crate::{
    config::SecurityConfig,
    credentials::{CredentialStore, UserPatch},
    db::models::{Role, UserRecord},
    error::{AuthError, AuthResult},
    ledger::RefreshTokenLedger,
    lockout::LockoutPolicy,
    mailer::Mailer,
    password::PasswordHasher,
    tokens::TokenIssuer,
};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

const MIN_PASSWORD_LEN: usize = 8;
const RESET_TOKEN_TTL_HOURS: i64 = 1;
const VERIFY_TOKEN_TTL_HOURS: i64 = 24;

/// User shape returned to clients. Never carries the password hash or any
/// of the token fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: String,
    pub email: String,
    pub role: Role,
    pub verified: bool,
    pub active: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<UserRecord> for PublicUser {
    fn from(user: UserRecord) -> Self {
        Self {
            id: user.id,
            email: user.email,
            role: user.role,
            verified: user.verified,
            active: user.active,
            last_login: user.last_login,
            created_at: user.created_at,
        }
    }
}

/// Response to a successful login
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub user: PublicUser,
}

/// Response to a successful token rotation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub access_token: String,
    pub refresh_token: String,
}

/// Session lifecycle service
pub struct SessionService {
    users: Arc<dyn CredentialStore>,
    ledger: Arc<dyn RefreshTokenLedger>,
    issuer: Arc<TokenIssuer>,
    mailer: Arc<Mailer>,
    hasher: PasswordHasher,
    lockout: LockoutPolicy,
    allow_unverified_login: bool,
    base_url: String,
    /// Verified against when the email is unknown, so the response time
    /// does not reveal whether an account exists
    dummy_hash: String,
}

impl SessionService {
    pub fn new(
        users: Arc<dyn CredentialStore>,
        ledger: Arc<dyn RefreshTokenLedger>,
        issuer: Arc<TokenIssuer>,
        mailer: Arc<Mailer>,
        security: &SecurityConfig,
        base_url: String,
    ) -> AuthResult<Self> {
        let hasher = PasswordHasher::new();
        let dummy_hash = hasher.hash("amoris-dummy-password")?;

        Ok(Self {
            users,
            ledger,
            issuer,
            mailer,
            hasher,
            lockout: LockoutPolicy::new(security.max_login_attempts, security.lockout_minutes),
            allow_unverified_login: security.allow_unverified_login,
            base_url,
            dummy_hash,
        })
    }

    fn normalize_email(email: &str) -> AuthResult<String> {
        let email = email.trim().to_lowercase();

        match email.split_once('@') {
            Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(email),
            _ => Err(AuthError::Validation("Invalid email address".to_string())),
        }
    }

    fn check_password_strength(password: &str) -> AuthResult<()> {
        if password.len() < MIN_PASSWORD_LEN {
            return Err(AuthError::Validation(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }
        Ok(())
    }

    /// Register a new account. New users always start as unverified subjects;
    /// role promotion is an admin concern, never part of signup.
    pub async fn register(&self, email: &str, password: &str) -> AuthResult<PublicUser> {
        let email = Self::normalize_email(email)?;
        Self::check_password_strength(password)?;

        if self.users.find_by_email(&email).await?.is_some() {
            return Err(AuthError::Conflict(
                "An account with this email already exists".to_string(),
            ));
        }

        let hash = self.hasher.hash(password)?;
        let mut user = crate::credentials::new_user_record(&email, &hash, Role::Subject);

        let verify_token = Uuid::new_v4().to_string();
        user.verify_token = Some(verify_token.clone());
        user.verify_expires = Some(Utc::now() + Duration::hours(VERIFY_TOKEN_TTL_HOURS));

        self.users.insert(&user).await?;
        tracing::info!(user_id = %user.id, "Registered new account");

        // Registration stands even if the email bounces; the token can be
        // re-sent through the reset flow
        if let Err(e) = self
            .mailer
            .send_verification_email(&email, &verify_token, &self.base_url)
            .await
        {
            tracing::warn!(user_id = %user.id, "Verification email failed: {}", e);
        }

        Ok(user.into())
    }

    /// Mark an account verified from an emailed single-use token
    pub async fn verify_email(&self, token: &str) -> AuthResult<()> {
        let invalid =
            || AuthError::Validation("Invalid or expired verification token".to_string());

        let user = self
            .users
            .find_by_verify_token(token)
            .await?
            .ok_or_else(invalid)?;

        match user.verify_expires {
            Some(expires) if expires > Utc::now() => {}
            _ => return Err(invalid()),
        }

        self.users
            .update_fields(
                &user.id,
                UserPatch {
                    verified: Some(true),
                    verify_token: Some(None),
                    verify_expires: Some(None),
                    ..Default::default()
                },
            )
            .await?;

        tracing::info!(user_id = %user.id, "Email verified");
        Ok(())
    }

    /// Authenticate with email and password, returning a fresh token pair.
    ///
    /// Unknown email, wrong password, and deactivated account all collapse
    /// to `InvalidCredentials`; only lock state and the unverified gate get
    /// their own signals, and those are only reachable with a real account.
    pub async fn login(&self, email: &str, password: &str) -> AuthResult<SessionResponse> {
        let email = Self::normalize_email(email)?;
        let now = Utc::now();

        let Some(mut user) = self.users.find_by_email(&email).await? else {
            // Burn the same hashing cost as the real-account path
            self.hasher.verify(password, &self.dummy_hash);
            return Err(AuthError::InvalidCredentials);
        };

        if !user.active {
            return Err(AuthError::InvalidCredentials);
        }

        if user.locked {
            match self.lockout.expired_unlock(user.locked, user.locked_until, now) {
                Some(patch) => {
                    self.users.update_fields(&user.id, patch).await?;
                    user.locked = false;
                    user.locked_until = None;
                    user.login_attempts = 0;
                }
                None => return Err(AuthError::AccountLocked),
            }
        }

        if !self.hasher.verify(password, &user.password_hash) {
            let attempts = self.users.increment_login_attempts(&user.id).await?;

            if let Some(patch) = self.lockout.on_failure(attempts, now) {
                self.users.update_fields(&user.id, patch).await?;
                tracing::warn!(user_id = %user.id, attempts, "Account locked after repeated failures");
                return Err(AuthError::AccountLocked);
            }

            return Err(AuthError::InvalidCredentials);
        }

        if !user.verified && !self.allow_unverified_login {
            return Err(AuthError::AccountNotVerified);
        }

        self.users
            .update_fields(&user.id, self.lockout.on_success(now))
            .await?;
        user.login_attempts = 0;
        user.last_login = Some(now);

        let access_token = self.issuer.issue_access(&user)?;
        let refresh = self.ledger.issue(&user.id, None).await?;

        tracing::info!(user_id = %user.id, "Login succeeded");

        Ok(SessionResponse {
            access_token,
            refresh_token: refresh.token,
            user: user.into(),
        })
    }

    /// Exchange a refresh token for a new token pair
    pub async fn refresh(&self, old_token: &str) -> AuthResult<RefreshResponse> {
        let Some(record) = self.ledger.rotate(old_token).await? else {
            return Err(AuthError::InvalidToken);
        };

        // The rotation succeeded but the account is gone or disabled: the
        // new token must not survive it
        let user = match self.users.find_by_id(&record.user_id).await? {
            Some(user) if user.active => user,
            _ => {
                self.ledger.revoke_family(&record.family).await?;
                return Err(AuthError::InvalidToken);
            }
        };

        let access_token = self.issuer.issue_access(&user)?;

        Ok(RefreshResponse {
            access_token,
            refresh_token: record.token,
        })
    }

    /// Revoke one refresh token. Idempotent: logging out twice, or with a
    /// token that never existed, is still a success.
    pub async fn logout(&self, refresh_token: &str) -> AuthResult<()> {
        self.ledger.revoke_one(refresh_token).await
    }

    /// Store a single-use reset token and email it to the account holder.
    /// Always succeeds for unknown emails.
    pub async fn request_password_reset(&self, email: &str) -> AuthResult<()> {
        let email = Self::normalize_email(email)?;

        let Some(user) = self.users.find_by_email(&email).await? else {
            tracing::debug!("Password reset requested for unknown email");
            return Ok(());
        };

        let token = Uuid::new_v4().to_string();
        self.users
            .update_fields(
                &user.id,
                UserPatch {
                    reset_token: Some(Some(token.clone())),
                    reset_expires: Some(Some(
                        Utc::now() + Duration::hours(RESET_TOKEN_TTL_HOURS),
                    )),
                    ..Default::default()
                },
            )
            .await?;

        self.mailer
            .send_password_reset_email(&email, &token, &self.base_url)
            .await?;

        tracing::info!(user_id = %user.id, "Password reset requested");
        Ok(())
    }

    /// Replace the password from an emailed reset token, then revoke every
    /// refresh token the user holds.
    pub async fn reset_password(&self, token: &str, new_password: &str) -> AuthResult<()> {
        Self::check_password_strength(new_password)?;

        let invalid = || AuthError::Validation("Invalid or expired reset token".to_string());

        let user = self
            .users
            .find_by_reset_token(token)
            .await?
            .ok_or_else(invalid)?;

        match user.reset_expires {
            Some(expires) if expires > Utc::now() => {}
            _ => return Err(invalid()),
        }

        let hash = self.hasher.hash(new_password)?;

        // Hash swap and token clear in one mutation so the token can never
        // be replayed against the new password
        self.users
            .update_fields(
                &user.id,
                UserPatch {
                    password_hash: Some(hash),
                    reset_token: Some(None),
                    reset_expires: Some(None),
                    ..Default::default()
                },
            )
            .await?;

        self.ledger.revoke_all_for_user(&user.id).await?;

        tracing::info!(user_id = %user.id, "Password reset completed, sessions revoked");
        Ok(())
    }

    /// Admin action: clear the lock and failed-attempt counter
    pub async fn unlock(&self, user_id: &str) -> AuthResult<()> {
        if self.users.find_by_id(user_id).await?.is_none() {
            return Err(AuthError::NotFound("User not found".to_string()));
        }

        self.users
            .update_fields(
                user_id,
                UserPatch {
                    locked: Some(false),
                    locked_until: Some(None),
                    login_attempts: Some(0),
                    ..Default::default()
                },
            )
            .await?;

        tracing::info!(user_id, "Account unlocked by staff");
        Ok(())
    }

    /// Staff action: revoke every refresh token the user holds
    pub async fn revoke_sessions(&self, user_id: &str) -> AuthResult<()> {
        if self.users.find_by_id(user_id).await?.is_none() {
            return Err(AuthError::NotFound("User not found".to_string()));
        }

        self.ledger.revoke_all_for_user(user_id).await?;

        tracing::info!(user_id, "All sessions revoked by staff");
        Ok(())
    }
}
