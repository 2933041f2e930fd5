/// HTTP server assembly
use crate::{api, context::AppContext, error::AuthResult};
use axum::{
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

/// Build the full application router
pub fn build_router(ctx: AppContext) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(api::routes())
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .with_state(ctx)
}

/// Bind and serve until shutdown
pub async fn serve(ctx: AppContext) -> AuthResult<()> {
    let addr = format!("0.0.0.0:{}", ctx.config.service.port);
    let router = build_router(ctx);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {}", addr);

    axum::serve(listener, router).await?;

    Ok(())
}

async fn health(
    axum::extract::State(ctx): axum::extract::State<AppContext>,
) -> AuthResult<Json<serde_json::Value>> {
    crate::db::test_connection(&ctx.db).await?;

    Ok(Json(serde_json::json!({
        "status": "ok",
        "version": ctx.config.service.version,
    })))
}

async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({
            "error": "NotFound",
            "message": "Route not found",
        })),
    )
}
