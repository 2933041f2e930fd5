/// Session endpoints: register, verify, login, refresh, logout, reset
use crate::{
    context::AppContext,
    error::AuthResult,
    guard::Identity,
    session::{PublicUser, RefreshResponse, SessionResponse},
};
use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/verify-email", post(verify_email))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .route("/auth/logout", post(logout))
        .route("/auth/session", get(current_session))
        .route("/auth/request-password-reset", post(request_password_reset))
        .route("/auth/reset-password", post(reset_password))
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub user: PublicUser,
}

async fn register(
    State(ctx): State<AppContext>,
    Json(req): Json<RegisterRequest>,
) -> AuthResult<Json<RegisterResponse>> {
    let user = ctx.sessions.register(&req.email, &req.password).await?;
    Ok(Json(RegisterResponse { user }))
}

#[derive(Debug, Deserialize)]
pub struct VerifyEmailRequest {
    pub token: String,
}

async fn verify_email(
    State(ctx): State<AppContext>,
    Json(req): Json<VerifyEmailRequest>,
) -> AuthResult<Json<serde_json::Value>> {
    ctx.sessions.verify_email(&req.token).await?;
    Ok(Json(serde_json::json!({})))
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

async fn login(
    State(ctx): State<AppContext>,
    Json(req): Json<LoginRequest>,
) -> AuthResult<Json<SessionResponse>> {
    let session = ctx.sessions.login(&req.email, &req.password).await?;
    Ok(Json(session))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

async fn refresh(
    State(ctx): State<AppContext>,
    Json(req): Json<RefreshRequest>,
) -> AuthResult<Json<RefreshResponse>> {
    let pair = ctx.sessions.refresh(&req.refresh_token).await?;
    Ok(Json(pair))
}

async fn logout(
    State(ctx): State<AppContext>,
    Json(req): Json<RefreshRequest>,
) -> AuthResult<Json<serde_json::Value>> {
    ctx.sessions.logout(&req.refresh_token).await?;
    Ok(Json(serde_json::json!({})))
}

async fn current_session(Identity(user): Identity) -> Json<PublicUser> {
    Json(user.into())
}

#[derive(Debug, Deserialize)]
pub struct PasswordResetRequest {
    pub email: String,
}

async fn request_password_reset(
    State(ctx): State<AppContext>,
    Json(req): Json<PasswordResetRequest>,
) -> AuthResult<Json<serde_json::Value>> {
    ctx.sessions.request_password_reset(&req.email).await?;
    Ok(Json(serde_json::json!({})))
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub password: String,
}

async fn reset_password(
    State(ctx): State<AppContext>,
    Json(req): Json<ResetPasswordRequest>,
) -> AuthResult<Json<serde_json::Value>> {
    ctx.sessions.reset_password(&req.token, &req.password).await?;
    Ok(Json(serde_json::json!({})))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::{body_json, request, test_app};
    use axum::http::StatusCode;

    #[tokio::test]
    async fn test_register_login_refresh_logout_flow() {
        let (app, ctx) = test_app(true).await;

        let response = request(
            app.clone(),
            "POST",
            "/auth/register",
            Some(serde_json::json!({"email": "a@example.com", "password": "Secret1!"})),
            None,
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["user"]["email"], "a@example.com");
        assert_eq!(body["user"]["role"], "subject");
        assert!(body["user"]["passwordHash"].is_null());

        let response = request(
            app.clone(),
            "POST",
            "/auth/login",
            Some(serde_json::json!({"email": "a@example.com", "password": "Secret1!"})),
            None,
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        let access = body["accessToken"].as_str().unwrap().to_string();
        let refresh = body["refreshToken"].as_str().unwrap().to_string();

        // The access token opens the guarded session endpoint
        let response = request(app.clone(), "GET", "/auth/session", None, Some(&access)).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["email"], "a@example.com");

        let response = request(
            app.clone(),
            "POST",
            "/auth/refresh",
            Some(serde_json::json!({"refreshToken": refresh})),
            None,
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        let rotated = body["refreshToken"].as_str().unwrap().to_string();
        assert_ne!(rotated, refresh);

        let response = request(
            app.clone(),
            "POST",
            "/auth/logout",
            Some(serde_json::json!({"refreshToken": rotated.clone()})),
            None,
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = request(
            app,
            "POST",
            "/auth/refresh",
            Some(serde_json::json!({"refreshToken": rotated})),
            None,
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        drop(ctx);
    }

    #[tokio::test]
    async fn test_login_failure_statuses() {
        let (app, _ctx) = test_app(true).await;

        request(
            app.clone(),
            "POST",
            "/auth/register",
            Some(serde_json::json!({"email": "a@example.com", "password": "Secret1!"})),
            None,
        )
        .await;

        let response = request(
            app.clone(),
            "POST",
            "/auth/login",
            Some(serde_json::json!({"email": "a@example.com", "password": "Wrong1234"})),
            None,
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = body_json(response).await;
        assert_eq!(body["error"], "InvalidCredentials");

        let response = request(
            app,
            "POST",
            "/auth/login",
            Some(serde_json::json!({"email": "ghost@example.com", "password": "Secret1!"})),
            None,
        )
        .await;
        // Unknown email is indistinguishable from a wrong password
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = body_json(response).await;
        assert_eq!(body["error"], "InvalidCredentials");
    }

    #[tokio::test]
    async fn test_unverified_login_forbidden() {
        let (app, _ctx) = test_app(false).await;

        request(
            app.clone(),
            "POST",
            "/auth/register",
            Some(serde_json::json!({"email": "a@example.com", "password": "Secret1!"})),
            None,
        )
        .await;

        let response = request(
            app,
            "POST",
            "/auth/login",
            Some(serde_json::json!({"email": "a@example.com", "password": "Secret1!"})),
            None,
        )
        .await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let body = body_json(response).await;
        assert_eq!(body["error"], "AccountNotVerified");
    }

    #[tokio::test]
    async fn test_session_requires_token() {
        let (app, _ctx) = test_app(true).await;

        let response = request(app, "GET", "/auth/session", None, None).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_reset_request_never_reveals_account_existence() {
        let (app, _ctx) = test_app(true).await;

        let response = request(
            app,
            "POST",
            "/auth/request-password-reset",
            Some(serde_json::json!({"email": "ghost@example.com"})),
            None,
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
    }
}
