/// Stateless signed-token issuing and verification
///
/// Access tokens are short-lived HS256 JWTs carrying the user's identity
/// and role; refresh tokens are longer-lived JWTs carrying the user id and
/// token family, and are never trusted on signature alone (the ledger has
/// the final word).
use crate::{
    config::TokenConfig,
    db::models::{Role, UserRecord},
    error::{AuthError, AuthResult},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Claims embedded in every access token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    /// User id
    pub sub: String,
    pub email: String,
    pub role: Role,
    pub iss: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

/// Claims embedded in every refresh token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshClaims {
    /// User id
    pub sub: String,
    /// Token family id
    pub fam: String,
    /// Unique token id; makes rotations within the same second distinct
    pub jti: String,
    pub iss: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

/// Token issuing and verification service
pub struct TokenIssuer {
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
    issuer: String,
    audience: String,
}

impl TokenIssuer {
    pub fn new(config: &TokenConfig) -> Self {
        Self {
            access_encoding: EncodingKey::from_secret(config.access_secret.as_bytes()),
            access_decoding: DecodingKey::from_secret(config.access_secret.as_bytes()),
            refresh_encoding: EncodingKey::from_secret(config.refresh_secret.as_bytes()),
            refresh_decoding: DecodingKey::from_secret(config.refresh_secret.as_bytes()),
            access_ttl: Duration::minutes(config.access_ttl_minutes),
            refresh_ttl: Duration::days(config.refresh_ttl_days),
            issuer: config.issuer.clone(),
            audience: config.audience.clone(),
        }
    }

    /// How long an issued refresh token lives
    pub fn refresh_ttl(&self) -> Duration {
        self.refresh_ttl
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        // No clock-skew leeway: the expiry boundary is exact
        validation.leeway = 0;
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.audience]);
        validation
    }

    /// Issue a signed access token for the given user
    pub fn issue_access(&self, user: &UserRecord) -> AuthResult<String> {
        let now = Utc::now().timestamp();
        let claims = AccessClaims {
            sub: user.id.clone(),
            email: user.email.clone(),
            role: user.role,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            iat: now,
            exp: now + self.access_ttl.num_seconds(),
        };

        encode(&Header::default(), &claims, &self.access_encoding)
            .map_err(|e| AuthError::Internal(format!("Failed to sign access token: {}", e)))
    }

    /// Verify an access token: signature, expiry, issuer, audience.
    ///
    /// Every failure collapses to `InvalidToken`; the caller re-authenticates
    /// via refresh either way.
    pub fn verify_access(&self, token: &str) -> AuthResult<AccessClaims> {
        decode::<AccessClaims>(token, &self.access_decoding, &self.validation())
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!("Access token rejected: {}", e);
                AuthError::InvalidToken
            })
    }

    /// Issue a signed refresh token for the given user and family
    pub fn issue_refresh(&self, user_id: &str, family: &str) -> AuthResult<String> {
        let now = Utc::now().timestamp();
        let claims = RefreshClaims {
            sub: user_id.to_string(),
            fam: family.to_string(),
            jti: uuid::Uuid::new_v4().to_string(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            iat: now,
            exp: now + self.refresh_ttl.num_seconds(),
        };

        encode(&Header::default(), &claims, &self.refresh_encoding)
            .map_err(|e| AuthError::Internal(format!("Failed to sign refresh token: {}", e)))
    }

    /// Verify a refresh token's signature and claims.
    ///
    /// Signature validity alone does not make the token usable; the ledger
    /// record must also be live.
    pub fn verify_refresh(&self, token: &str) -> AuthResult<RefreshClaims> {
        decode::<RefreshClaims>(token, &self.refresh_decoding, &self.validation())
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!("Refresh token rejected: {}", e);
                AuthError::InvalidToken
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::new_user_record;

    fn test_token_config() -> TokenConfig {
        TokenConfig {
            access_secret: "test-access-secret-that-is-long-enough!!".to_string(),
            access_ttl_minutes: 15,
            refresh_secret: "test-refresh-secret-that-is-long-enough!".to_string(),
            refresh_ttl_days: 7,
            issuer: "amoris-auth".to_string(),
            audience: "amoris-app".to_string(),
        }
    }

    fn issuer() -> TokenIssuer {
        TokenIssuer::new(&test_token_config())
    }

    #[test]
    fn test_access_token_round_trip() {
        let issuer = issuer();
        let user = new_user_record("a@x.com", "hash", Role::Moderator);

        let token = issuer.issue_access(&user).unwrap();
        let claims = issuer.verify_access(&token).unwrap();

        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.email, "a@x.com");
        assert_eq!(claims.role, Role::Moderator);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_tampered_token_is_invalid() {
        let issuer = issuer();
        let user = new_user_record("a@x.com", "hash", Role::Subject);

        let mut token = issuer.issue_access(&user).unwrap();
        token.push('x');

        assert!(matches!(
            issuer.verify_access(&token),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn test_expired_token_is_invalid() {
        let issuer = issuer();
        let now = Utc::now().timestamp();

        // Craft a token whose exp is already in the past, signed with the
        // same secret
        let claims = AccessClaims {
            sub: "user-1".to_string(),
            email: "a@x.com".to_string(),
            role: Role::Subject,
            iss: "amoris-auth".to_string(),
            aud: "amoris-app".to_string(),
            iat: now - 120,
            exp: now - 60,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(test_token_config().access_secret.as_bytes()),
        )
        .unwrap();

        assert!(matches!(
            issuer.verify_access(&token),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn test_wrong_audience_is_invalid() {
        let issuer = issuer();
        let mut other_config = test_token_config();
        other_config.audience = "other-app".to_string();
        let other = TokenIssuer::new(&other_config);

        let user = new_user_record("a@x.com", "hash", Role::Subject);
        let token = other.issue_access(&user).unwrap();

        assert!(matches!(
            issuer.verify_access(&token),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn test_refresh_token_round_trip() {
        let issuer = issuer();

        let token = issuer.issue_refresh("user-1", "family-1").unwrap();
        let claims = issuer.verify_refresh(&token).unwrap();

        assert_eq!(claims.sub, "user-1");
        assert_eq!(claims.fam, "family-1");
    }

    #[test]
    fn test_refresh_and_access_secrets_are_not_interchangeable() {
        let issuer = issuer();
        let user = new_user_record("a@x.com", "hash", Role::Subject);

        let access = issuer.issue_access(&user).unwrap();
        assert!(issuer.verify_refresh(&access).is_err());

        let refresh = issuer.issue_refresh(&user.id, "family-1").unwrap();
        assert!(issuer.verify_access(&refresh).is_err());
    }
}
