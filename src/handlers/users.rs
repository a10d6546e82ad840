// src/handlers/users.rs

use std::collections::HashMap;

use axum::{
    Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use chrono::{DateTime, TimeZone, Utc};
use sqlx::PgPool;

use crate::{
    error::AppError,
    models::response::{ApiResponse, PageQuery, Paginated},
    models::user::{AgentRow, RoleRow, User, UserSummary},
};

/// Lists users with their roles and agent associations eagerly loaded.
/// Paginated with the same envelope as the video listing.
pub async fn list_users(
    State(pool): State<PgPool>,
    Query(params): Query<PageQuery>,
) -> Result<impl IntoResponse, AppError> {
    let (page, limit) = (params.page(), params.limit());

    let total_fut = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users").fetch_one(&pool);
    let users_fut = sqlx::query_as::<_, User>(
        r#"
        SELECT id, email, first_name, last_name, password, photo,
               otp, otp_expires_at, created_at, updated_at
        FROM users
        ORDER BY created_at DESC
        LIMIT $1 OFFSET $2
        "#,
    )
    .bind(limit)
    .bind(params.offset())
    .fetch_all(&pool);

    let (total, users) = tokio::try_join!(total_fut, users_fut)?;

    let ids: Vec<i64> = users.iter().map(|u| u.id).collect();

    let roles = sqlx::query_as::<_, RoleRow>(
        "SELECT user_id, role FROM user_roles WHERE user_id = ANY($1) ORDER BY id",
    )
    .bind(&ids)
    .fetch_all(&pool)
    .await?;

    let agents = sqlx::query_as::<_, AgentRow>(
        "SELECT id, user_id, agency_name FROM agents WHERE user_id = ANY($1) ORDER BY id",
    )
    .bind(&ids)
    .fetch_all(&pool)
    .await?;

    let mut roles_by_user: HashMap<i64, Vec<_>> = HashMap::new();
    for row in roles {
        roles_by_user.entry(row.user_id).or_default().push(row.role);
    }
    let mut agents_by_user: HashMap<i64, Vec<AgentRow>> = HashMap::new();
    for row in agents {
        agents_by_user.entry(row.user_id).or_default().push(row);
    }

    let summaries: Vec<UserSummary> = users
        .into_iter()
        .map(|u| UserSummary {
            roles: roles_by_user.remove(&u.id).unwrap_or_default(),
            agents: agents_by_user.remove(&u.id).unwrap_or_default(),
            id: u.id,
            email: u.email,
            first_name: u.first_name,
            last_name: u.last_name,
            photo: u.photo,
            created_at: u.created_at,
        })
        .collect();

    Ok(Json(ApiResponse::ok(
        "welcome",
        Paginated::new(summaries, total, page, limit),
    )))
}

/// Deletes a user and every row referencing it, in one transaction.
///
/// Child rows go first to satisfy referential constraints: likes,
/// testimonials, agent reviews, agents, videos (and likes pointing at
/// them), role assignments, then the user row itself.
pub async fn delete_user(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let exists = sqlx::query_scalar::<_, i64>("SELECT id FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(&pool)
        .await?;
    if exists.is_none() {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM likes WHERE user_id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    sqlx::query("DELETE FROM testimonials WHERE user_id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    sqlx::query(
        "DELETE FROM agent_reviews WHERE agent_id IN (SELECT id FROM agents WHERE user_id = $1)",
    )
    .bind(id)
    .execute(&mut *tx)
    .await?;

    sqlx::query("DELETE FROM agents WHERE user_id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    // Likes from other users on this user's videos block the video delete.
    sqlx::query("DELETE FROM likes WHERE video_id IN (SELECT id FROM videos WHERE user_id = $1)")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    sqlx::query("DELETE FROM videos WHERE user_id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    sqlx::query("DELETE FROM user_roles WHERE user_id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    tracing::info!(user_id = id, "user and related activities deleted");

    Ok(Json(ApiResponse::<()>::message(
        "User and related activities deleted successfully",
    )))
}

/// Users created per month within the given year, as a fixed 12-element
/// count array (index 0 = January).
pub async fn count_by_month(
    State(pool): State<PgPool>,
    Path(year): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    let start = Utc
        .with_ymd_and_hms(year, 1, 1, 0, 0, 0)
        .single()
        .ok_or(AppError::BadRequest("Invalid year".to_string()))?;
    let end = Utc
        .with_ymd_and_hms(year + 1, 1, 1, 0, 0, 0)
        .single()
        .ok_or(AppError::BadRequest("Invalid year".to_string()))?;

    let timestamps = sqlx::query_scalar::<_, DateTime<Utc>>(
        "SELECT created_at FROM users WHERE created_at >= $1 AND created_at < $2",
    )
    .bind(start)
    .bind(end)
    .fetch_all(&pool)
    .await?;

    let mut counts = [0i64; 12];
    for created_at in timestamps {
        counts[chrono::Datelike::month0(&created_at) as usize] += 1;
    }

    Ok(Json(ApiResponse::ok(
        "Users count by month fetched successfully",
        counts,
    )))
}
