/// Amoris auth service entry point
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod api;
mod config;
mod context;
mod credentials;
mod db;
mod error;
mod guard;
mod jobs;
mod ledger;
mod lockout;
mod mailer;
mod password;
mod server;
mod session;
mod tokens;

use config::ServerConfig;
use context::AppContext;
use error::AuthResult;
use jobs::JobScheduler;

#[tokio::main]
async fn main() -> AuthResult<()> {
    let config = ServerConfig::from_env()?;

    init_tracing(&config);

    tracing::info!("Starting Amoris auth service v{}", config.service.version);

    config.validate()?;

    let pool = db::create_pool(&config.storage.auth_db, db::DatabaseOptions::default()).await?;
    db::run_migrations(&pool).await?;
    tracing::info!("Database ready at {}", config.storage.auth_db.display());

    let ctx = AppContext::new(config, pool)?;

    let scheduler = Arc::new(JobScheduler::new(Arc::new(ctx.clone())));
    scheduler.start();

    server::serve(ctx).await
}

fn init_tracing(config: &ServerConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "amoris_auth={},tower_http=debug",
            config.logging.level
        ))
    });

    if config.production {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}
