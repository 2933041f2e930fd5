use std::sync::Arc;
use tokio::time::{interval, Duration};
use tracing::{error, info};

pub mod tasks;

/// Job scheduler for background tasks
pub struct JobScheduler {
    context: Arc<crate::context::AppContext>,
}

impl JobScheduler {
    pub fn new(context: Arc<crate::context::AppContext>) -> Self {
        Self { context }
    }

    /// Start all background jobs
    pub fn start(self: Arc<Self>) {
        info!("Starting background job scheduler");

        tokio::spawn(Self::refresh_token_sweep_job(Arc::clone(&self)));
        tokio::spawn(Self::expired_lock_sweep_job(Arc::clone(&self)));
        tokio::spawn(Self::health_check_job(Arc::clone(&self)));

        info!("Background jobs started");
    }

    /// Sweep expired refresh-token records (runs every hour)
    async fn refresh_token_sweep_job(scheduler: Arc<Self>) {
        let mut interval = interval(Duration::from_secs(3600)); // Every hour

        loop {
            interval.tick().await;
            info!("Running refresh token sweep");

            match tasks::sweep_refresh_tokens(&scheduler.context).await {
                Ok(count) => {
                    if count > 0 {
                        info!("Swept {} expired refresh tokens", count);
                    } else {
                        info!("Refresh token sweep: nothing to delete");
                    }
                }
                Err(e) => error!("Failed to sweep refresh tokens: {}", e),
            }
        }
    }

    /// Clear expired account locks (runs every 15 minutes)
    async fn expired_lock_sweep_job(scheduler: Arc<Self>) {
        let mut interval = interval(Duration::from_secs(900)); // Every 15 minutes

        loop {
            interval.tick().await;

            match tasks::sweep_expired_locks(&scheduler.context).await {
                Ok(count) => {
                    if count > 0 {
                        info!("Cleared {} expired account locks", count);
                    }
                }
                Err(e) => error!("Failed to clear expired locks: {}", e),
            }
        }
    }

    /// Health check job (runs every 5 minutes)
    async fn health_check_job(scheduler: Arc<Self>) {
        let mut interval = interval(Duration::from_secs(300)); // Every 5 minutes

        loop {
            interval.tick().await;

            match tasks::health_check(&scheduler.context).await {
                Ok(_) => {
                    // Silent success - health is good
                }
                Err(e) => error!("Health check failed: {}", e),
            }
        }
    }
}
