/// Request authentication and role-based authorization
///
/// Credentials arrive either as an `Authorization: Bearer` header or in a
/// cookie; the guard tries its configured transports in order so both client
/// styles hit the same verification path. Guard checks never mutate state.
use crate::{
    context::AppContext,
    credentials::CredentialStore,
    db::models::{Role, UserRecord},
    error::{AuthError, AuthResult},
    tokens::{AccessClaims, TokenIssuer},
};
use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
};
use std::sync::Arc;

/// Default cookie consulted when no transport list is configured
pub const ACCESS_COOKIE: &str = "amoris_access";

/// Where an access token may be carried on a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenTransport {
    BearerHeader,
    Cookie(String),
}

impl TokenTransport {
    fn extract(&self, headers: &HeaderMap) -> Option<String> {
        match self {
            TokenTransport::BearerHeader => headers
                .get(header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.strip_prefix("Bearer "))
                .map(str::to_string),
            TokenTransport::Cookie(name) => headers
                .get(header::COOKIE)
                .and_then(|v| v.to_str().ok())
                .and_then(|cookies| {
                    cookies.split(';').find_map(|pair| {
                        let (key, value) = pair.trim().split_once('=')?;
                        (key == name).then(|| value.to_string())
                    })
                }),
        }
    }
}

/// Verifies access tokens and loads the caller's account for role checks
pub struct AuthorizationGuard {
    issuer: Arc<TokenIssuer>,
    users: Arc<dyn CredentialStore>,
    transports: Vec<TokenTransport>,
}

impl AuthorizationGuard {
    pub fn new(issuer: Arc<TokenIssuer>, users: Arc<dyn CredentialStore>) -> Self {
        Self::with_transports(
            issuer,
            users,
            vec![
                TokenTransport::BearerHeader,
                TokenTransport::Cookie(ACCESS_COOKIE.to_string()),
            ],
        )
    }

    pub fn with_transports(
        issuer: Arc<TokenIssuer>,
        users: Arc<dyn CredentialStore>,
        transports: Vec<TokenTransport>,
    ) -> Self {
        Self {
            issuer,
            users,
            transports,
        }
    }

    fn extract_token(&self, headers: &HeaderMap) -> Option<String> {
        self.transports.iter().find_map(|t| t.extract(headers))
    }

    /// Verify the request's access token. Stateless; does not touch the store.
    pub fn authenticate(&self, headers: &HeaderMap) -> AuthResult<AccessClaims> {
        let token = self
            .extract_token(headers)
            .ok_or(AuthError::InvalidToken)?;

        self.issuer.verify_access(&token)
    }

    /// Verify the token and load the caller's account.
    ///
    /// A token whose subject no longer exists or is deactivated is treated
    /// as unauthenticated, not as a missing resource. An empty `required`
    /// slice admits any authenticated caller.
    pub async fn authorize(
        &self,
        headers: &HeaderMap,
        required: &[Role],
    ) -> AuthResult<UserRecord> {
        let claims = self.authenticate(headers)?;

        let user = match self.users.find_by_id(&claims.sub).await? {
            Some(user) if user.active => user,
            _ => return Err(AuthError::InvalidToken),
        };

        if !required.is_empty() && !required.iter().any(|r| user.role.can_act_as(*r)) {
            return Err(AuthError::Forbidden(format!(
                "Requires {} role",
                required
                    .iter()
                    .map(Role::as_str)
                    .collect::<Vec<_>>()
                    .join(" or ")
            )));
        }

        Ok(user)
    }
}

/// The authenticated caller. Rejects the request when no valid token is
/// presented.
pub struct Identity(pub UserRecord);

#[axum::async_trait]
impl FromRequestParts<AppContext> for Identity {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        ctx: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        let user = ctx.guard.authorize(&parts.headers, &[]).await?;
        Ok(Identity(user))
    }
}

/// The caller when authenticated, `None` otherwise. Never rejects.
pub struct OptionalIdentity(pub Option<UserRecord>);

#[axum::async_trait]
impl FromRequestParts<AppContext> for OptionalIdentity {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        ctx: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        Ok(OptionalIdentity(
            ctx.guard.authorize(&parts.headers, &[]).await.ok(),
        ))
    }
}

/// An authenticated moderator or admin
pub struct StaffIdentity(pub UserRecord);

#[axum::async_trait]
impl FromRequestParts<AppContext> for StaffIdentity {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        ctx: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        let user = ctx.guard.authorize(&parts.headers, &[Role::Moderator]).await?;
        Ok(StaffIdentity(user))
    }
}

/// An authenticated admin
pub struct AdminIdentity(pub UserRecord);

#[axum::async_trait]
impl FromRequestParts<AppContext> for AdminIdentity {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        ctx: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        let user = ctx.guard.authorize(&parts.headers, &[Role::Admin]).await?;
        Ok(AdminIdentity(user))
    }
}
