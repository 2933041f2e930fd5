/// Shared application context passed to request handlers
use crate::{
    config::ServerConfig,
    credentials::{CredentialStore, SqliteCredentialStore},
    error::AuthResult,
    guard::AuthorizationGuard,
    ledger::{RefreshTokenLedger, SqliteRefreshLedger},
    mailer::Mailer,
    session::SessionService,
    tokens::TokenIssuer,
};
use sqlx::SqlitePool;
use std::sync::Arc;

/// Application context holding every shared service.
///
/// Cheap to clone; axum clones it per request.
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ServerConfig>,
    pub db: SqlitePool,
    pub users: Arc<dyn CredentialStore>,
    pub ledger: Arc<dyn RefreshTokenLedger>,
    pub issuer: Arc<TokenIssuer>,
    pub sessions: Arc<SessionService>,
    pub guard: Arc<AuthorizationGuard>,
    pub mailer: Arc<Mailer>,
}

impl AppContext {
    /// Wire up all services from config and an open database pool
    pub fn new(config: ServerConfig, db: SqlitePool) -> AuthResult<Self> {
        let users: Arc<dyn CredentialStore> = Arc::new(SqliteCredentialStore::new(db.clone()));
        let issuer = Arc::new(TokenIssuer::new(&config.tokens));
        let ledger: Arc<dyn RefreshTokenLedger> =
            Arc::new(SqliteRefreshLedger::new(db.clone(), issuer.clone()));
        let mailer = Arc::new(Mailer::new(config.email.clone())?);

        let base_url = format!(
            "http://{}:{}",
            config.service.hostname, config.service.port
        );

        let sessions = Arc::new(SessionService::new(
            users.clone(),
            ledger.clone(),
            issuer.clone(),
            mailer.clone(),
            &config.security,
            base_url,
        )?);

        let guard = Arc::new(AuthorizationGuard::new(issuer.clone(), users.clone()));

        Ok(Self {
            config: Arc::new(config),
            db,
            users,
            ledger,
            issuer,
            sessions,
            guard,
            mailer,
        })
    }
}
