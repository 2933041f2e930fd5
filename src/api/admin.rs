/// Staff endpoints for account lock and session management
use crate::{
    context::AppContext,
    error::AuthResult,
    guard::{AdminIdentity, StaffIdentity},
};
use axum::{
    extract::{Path, State},
    routing::post,
    Json, Router,
};

pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/admin/users/:id/unlock", post(unlock_user))
        .route("/admin/users/:id/revoke-sessions", post(revoke_sessions))
}

async fn unlock_user(
    State(ctx): State<AppContext>,
    AdminIdentity(admin): AdminIdentity,
    Path(id): Path<String>,
) -> AuthResult<Json<serde_json::Value>> {
    tracing::info!(admin_id = %admin.id, user_id = %id, "Unlock requested");
    ctx.sessions.unlock(&id).await?;
    Ok(Json(serde_json::json!({})))
}

async fn revoke_sessions(
    State(ctx): State<AppContext>,
    StaffIdentity(staff): StaffIdentity,
    Path(id): Path<String>,
) -> AuthResult<Json<serde_json::Value>> {
    tracing::info!(staff_id = %staff.id, user_id = %id, "Session revocation requested");
    ctx.sessions.revoke_sessions(&id).await?;
    Ok(Json(serde_json::json!({})))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::{request, test_app};
    use crate::credentials::{new_user_record, UserPatch};
    use crate::db::models::Role;
    use axum::http::StatusCode;
    use chrono::{Duration, Utc};

    async fn seed(ctx: &AppContext, role: Role) -> (String, String) {
        let user = new_user_record(&format!("{}@x.com", role.as_str()), "hash", role);
        ctx.users.insert(&user).await.unwrap();
        let token = ctx.issuer.issue_access(&user).unwrap();
        (user.id, token)
    }

    #[tokio::test]
    async fn test_unlock_requires_admin() {
        let (app, ctx) = test_app(true).await;
        let (subject_id, subject_token) = seed(&ctx, Role::Subject).await;
        let (_, moderator_token) = seed(&ctx, Role::Moderator).await;
        let (_, admin_token) = seed(&ctx, Role::Admin).await;

        ctx.users
            .update_fields(
                &subject_id,
                UserPatch {
                    locked: Some(true),
                    locked_until: Some(Some(Utc::now() + Duration::minutes(30))),
                    login_attempts: Some(5),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let uri = format!("/admin/users/{}/unlock", subject_id);

        let response = request(app.clone(), "POST", &uri, None, Some(&subject_token)).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = request(app.clone(), "POST", &uri, None, Some(&moderator_token)).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = request(app, "POST", &uri, None, Some(&admin_token)).await;
        assert_eq!(response.status(), StatusCode::OK);

        let unlocked = ctx.users.find_by_id(&subject_id).await.unwrap().unwrap();
        assert!(!unlocked.locked);
        assert_eq!(unlocked.login_attempts, 0);
    }

    #[tokio::test]
    async fn test_revoke_sessions_allows_moderators() {
        let (app, ctx) = test_app(true).await;
        let (subject_id, subject_token) = seed(&ctx, Role::Subject).await;
        let (_, moderator_token) = seed(&ctx, Role::Moderator).await;

        let refresh = ctx.ledger.issue(&subject_id, None).await.unwrap();

        let uri = format!("/admin/users/{}/revoke-sessions", subject_id);

        let response = request(app.clone(), "POST", &uri, None, Some(&subject_token)).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = request(app, "POST", &uri, None, Some(&moderator_token)).await;
        assert_eq!(response.status(), StatusCode::OK);

        assert!(ctx.ledger.verify(&refresh.token).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unlock_unknown_user_is_not_found() {
        let (app, ctx) = test_app(true).await;
        let (_, admin_token) = seed(&ctx, Role::Admin).await;

        let response = request(
            app,
            "POST",
            "/admin/users/missing/unlock",
            None,
            Some(&admin_token),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_admin_routes_require_authentication() {
        let (app, _ctx) = test_app(true).await;

        let response = request(app, "POST", "/admin/users/x/unlock", None, None).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
