/// Background task implementations
use crate::{context::AppContext, error::AuthResult};
use chrono::Utc;

/// Delete refresh-token records past their expiry
pub async fn sweep_refresh_tokens(ctx: &AppContext) -> AuthResult<u64> {
    ctx.ledger.sweep_expired(Utc::now()).await
}

/// Clear locks whose deadline has passed.
///
/// The login path already unlocks lazily; this keeps the table tidy for
/// accounts that never try to log in again.
pub async fn sweep_expired_locks(ctx: &AppContext) -> AuthResult<u64> {
    let result = sqlx::query(
        "UPDATE user_account
         SET locked = 0, locked_until = NULL, login_attempts = 0, updated_at = ?1
         WHERE locked = 1 AND locked_until IS NOT NULL AND locked_until < ?1",
    )
    .bind(Utc::now())
    .execute(&ctx.db)
    .await?;

    Ok(result.rows_affected())
}

/// Health check - verify the database is reachable
pub async fn health_check(ctx: &AppContext) -> AuthResult<()> {
    sqlx::query("SELECT 1").fetch_one(&ctx.db).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::test_app;
    use crate::credentials::{new_user_record, UserPatch};
    use crate::db::models::Role;
    use chrono::Duration;

    #[tokio::test]
    async fn test_health_check() {
        let (_, ctx) = test_app(true).await;
        health_check(&ctx).await.unwrap();
    }

    #[tokio::test]
    async fn test_refresh_token_sweep() {
        let (_, ctx) = test_app(true).await;

        let user = new_user_record("a@x.com", "hash", Role::Subject);
        ctx.users.insert(&user).await.unwrap();
        let record = ctx.ledger.issue(&user.id, None).await.unwrap();

        sqlx::query("UPDATE refresh_token SET expires_at = ?1 WHERE token = ?2")
            .bind(Utc::now() - Duration::days(1))
            .bind(&record.token)
            .execute(&ctx.db)
            .await
            .unwrap();

        assert_eq!(sweep_refresh_tokens(&ctx).await.unwrap(), 1);
        assert_eq!(sweep_refresh_tokens(&ctx).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_expired_lock_sweep() {
        let (_, ctx) = test_app(true).await;

        let expired = new_user_record("expired@x.com", "hash", Role::Subject);
        let held = new_user_record("held@x.com", "hash", Role::Subject);
        ctx.users.insert(&expired).await.unwrap();
        ctx.users.insert(&held).await.unwrap();

        ctx.users
            .update_fields(
                &expired.id,
                UserPatch {
                    locked: Some(true),
                    locked_until: Some(Some(Utc::now() - Duration::minutes(5))),
                    login_attempts: Some(5),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        ctx.users
            .update_fields(
                &held.id,
                UserPatch {
                    locked: Some(true),
                    locked_until: Some(Some(Utc::now() + Duration::minutes(25))),
                    login_attempts: Some(5),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(sweep_expired_locks(&ctx).await.unwrap(), 1);

        let cleared = ctx.users.find_by_id(&expired.id).await.unwrap().unwrap();
        assert!(!cleared.locked);
        assert_eq!(cleared.login_attempts, 0);

        let still_locked = ctx.users.find_by_id(&held.id).await.unwrap().unwrap();
        assert!(still_locked.locked);
    }
}
