/// HTTP API route builders
pub mod admin;
pub mod session;

use crate::context::AppContext;
use axum::Router;

/// All API routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .merge(session::routes())
        .merge(admin::routes())
}
