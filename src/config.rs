/// Configuration management for the Amoris auth service
use crate::error::{AuthError, AuthResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Development fallback secrets. `validate()` refuses these in production.
const DEV_ACCESS_SECRET: &str = "amoris-dev-access-secret-change-me-0000";
const DEV_REFRESH_SECRET: &str = "amoris-dev-refresh-secret-change-me-000";

/// Main server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub service: ServiceConfig,
    pub storage: StorageConfig,
    pub tokens: TokenConfig,
    pub security: SecurityConfig,
    pub email: Option<EmailConfig>,
    pub logging: LoggingConfig,
    /// True when AMORIS_ENV=production
    pub production: bool,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub hostname: String,
    pub port: u16,
    pub version: String,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_directory: PathBuf,
    pub auth_db: PathBuf,
}

/// Token signing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenConfig {
    pub access_secret: String,
    pub access_ttl_minutes: i64,
    pub refresh_secret: String,
    pub refresh_ttl_days: i64,
    pub issuer: String,
    pub audience: String,
}

/// Login security configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// Failed attempts before the account locks
    pub max_login_attempts: i64,
    /// Lock duration once the threshold is reached
    pub lockout_minutes: i64,
    /// Dev/test bypass: allow login for unverified accounts
    pub allow_unverified_login: bool,
}

/// Email configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    pub smtp_url: String,
    pub from_address: String,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> AuthResult<Self> {
        dotenv::dotenv().ok();

        let hostname = env::var("AMORIS_HOSTNAME").unwrap_or_else(|_| "localhost".to_string());
        let port = env::var("AMORIS_PORT")
            .unwrap_or_else(|_| "4000".to_string())
            .parse()
            .map_err(|_| AuthError::Validation("Invalid port number".to_string()))?;
        let version = env::var("AMORIS_VERSION").unwrap_or_else(|_| "0.1.0".to_string());

        let data_directory: PathBuf = env::var("AMORIS_DATA_DIRECTORY")
            .unwrap_or_else(|_| "./data".to_string())
            .into();
        let auth_db = env::var("AMORIS_AUTH_DB_LOCATION")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_directory.join("auth.sqlite"));

        let access_secret = env::var("AMORIS_ACCESS_TOKEN_SECRET").unwrap_or_else(|_| {
            tracing::warn!("AMORIS_ACCESS_TOKEN_SECRET not set, using development fallback");
            DEV_ACCESS_SECRET.to_string()
        });
        let access_ttl_minutes = env::var("AMORIS_ACCESS_TOKEN_TTL_MINUTES")
            .unwrap_or_else(|_| "15".to_string())
            .parse()
            .unwrap_or(15);
        let refresh_secret = env::var("AMORIS_REFRESH_TOKEN_SECRET").unwrap_or_else(|_| {
            tracing::warn!("AMORIS_REFRESH_TOKEN_SECRET not set, using development fallback");
            DEV_REFRESH_SECRET.to_string()
        });
        let refresh_ttl_days = env::var("AMORIS_REFRESH_TOKEN_TTL_DAYS")
            .unwrap_or_else(|_| "7".to_string())
            .parse()
            .unwrap_or(7);
        let issuer =
            env::var("AMORIS_TOKEN_ISSUER").unwrap_or_else(|_| "amoris-auth".to_string());
        let audience =
            env::var("AMORIS_TOKEN_AUDIENCE").unwrap_or_else(|_| "amoris-app".to_string());

        let max_login_attempts = env::var("AMORIS_MAX_LOGIN_ATTEMPTS")
            .unwrap_or_else(|_| "5".to_string())
            .parse()
            .unwrap_or(5);
        let lockout_minutes = env::var("AMORIS_LOCKOUT_MINUTES")
            .unwrap_or_else(|_| "30".to_string())
            .parse()
            .unwrap_or(30);
        let allow_unverified_login = env::var("AMORIS_ALLOW_UNVERIFIED_LOGIN")
            .unwrap_or_else(|_| "false".to_string())
            .parse()
            .unwrap_or(false);

        let email = if let Ok(smtp_url) = env::var("AMORIS_EMAIL_SMTP_URL") {
            Some(EmailConfig {
                smtp_url,
                from_address: env::var("AMORIS_EMAIL_FROM_ADDRESS")
                    .unwrap_or_else(|_| format!("noreply@{}", hostname)),
            })
        } else {
            None
        };

        let log_level = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let production = env::var("AMORIS_ENV")
            .map(|v| v.eq_ignore_ascii_case("production"))
            .unwrap_or(false);

        Ok(ServerConfig {
            service: ServiceConfig {
                hostname,
                port,
                version,
            },
            storage: StorageConfig {
                data_directory,
                auth_db,
            },
            tokens: TokenConfig {
                access_secret,
                access_ttl_minutes,
                refresh_secret,
                refresh_ttl_days,
                issuer,
                audience,
            },
            security: SecurityConfig {
                max_login_attempts,
                lockout_minutes,
                allow_unverified_login,
            },
            email,
            logging: LoggingConfig { level: log_level },
            production,
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> AuthResult<()> {
        if self.service.hostname.is_empty() {
            return Err(AuthError::Validation("Hostname cannot be empty".to_string()));
        }

        if self.tokens.access_secret.len() < 32 || self.tokens.refresh_secret.len() < 32 {
            return Err(AuthError::Validation(
                "Token secrets must be at least 32 characters".to_string(),
            ));
        }

        if self.tokens.access_ttl_minutes <= 0 || self.tokens.refresh_ttl_days <= 0 {
            return Err(AuthError::Validation(
                "Token TTLs must be positive".to_string(),
            ));
        }

        if self.production {
            if self.tokens.access_secret == DEV_ACCESS_SECRET
                || self.tokens.refresh_secret == DEV_REFRESH_SECRET
            {
                return Err(AuthError::Validation(
                    "Development token secrets cannot be used in production".to_string(),
                ));
            }
            if self.security.allow_unverified_login {
                return Err(AuthError::Validation(
                    "Unverified-login bypass cannot be enabled in production".to_string(),
                ));
            }
        }

        Ok(())
    }
}
