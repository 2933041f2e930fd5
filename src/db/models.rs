/// Persisted record types for the auth store
use crate::error::{AuthError, AuthResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// User roles, ordered by privilege
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Regular end user looking for matches
    Subject,
    /// Matched partner account
    Counterpart,
    /// Can review accounts, revoke sessions
    Moderator,
    /// Full access
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Subject => "subject",
            Role::Counterpart => "counterpart",
            Role::Moderator => "moderator",
            Role::Admin => "admin",
        }
    }

    pub fn parse(s: &str) -> AuthResult<Self> {
        match s.to_lowercase().as_str() {
            "subject" => Ok(Role::Subject),
            "counterpart" => Ok(Role::Counterpart),
            "moderator" => Ok(Role::Moderator),
            "admin" => Ok(Role::Admin),
            _ => Err(AuthError::Validation(format!("Invalid role: {}", s))),
        }
    }

    /// Check if this role can perform actions requiring another role
    pub fn can_act_as(&self, required: Role) -> bool {
        self >= &required
    }
}

/// User record in the database
///
/// Invariants: `locked == true` implies `locked_until` is set or was cleared
/// by an explicit unlock; `login_attempts` resets to 0 on successful login
/// or explicit unlock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub verified: bool,
    pub active: bool,
    pub locked: bool,
    pub locked_until: Option<DateTime<Utc>>,
    pub login_attempts: i64,
    pub last_login: Option<DateTime<Utc>>,
    pub reset_token: Option<String>,
    pub reset_expires: Option<DateTime<Utc>>,
    pub verify_token: Option<String>,
    pub verify_expires: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Refresh token record
///
/// Invariant: at most one unrevoked, unexpired record per (user_id, family).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshTokenRecord {
    pub token: String,
    pub user_id: String,
    pub family: String,
    pub expires_at: DateTime<Utc>,
    pub is_revoked: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trip() {
        for role in [Role::Subject, Role::Counterpart, Role::Moderator, Role::Admin] {
            assert_eq!(Role::parse(role.as_str()).unwrap(), role);
        }
    }

    #[test]
    fn test_unknown_role_rejected() {
        assert!(Role::parse("superuser").is_err());
    }

    #[test]
    fn test_role_ordering() {
        assert!(Role::Admin.can_act_as(Role::Moderator));
        assert!(Role::Moderator.can_act_as(Role::Moderator));
        assert!(!Role::Subject.can_act_as(Role::Moderator));
        assert!(!Role::Counterpart.can_act_as(Role::Admin));
    }
}
