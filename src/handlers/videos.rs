// src/handlers/videos.rs

use axum::{
    Extension, Json,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::response::{PageQuery, Paginated},
    models::user::User,
    models::video::{
        OwnerProfile, UpdateStatusRequest, VideoListParams, VideoOwnerRow, VideoResponse,
        VideoStatus,
    },
    state::AppState,
    utils::{jwt::Claims, upload::process_video_upload},
};

const SELECT_VIDEO_WITH_OWNER: &str = r#"
    SELECT v.id, v.title, v.description, v.url, v.thumbnail, v.status, v.metadata,
           v.user_id, v.created_at, v.updated_at,
           u.email AS owner_email, u.first_name AS owner_first_name,
           u.last_name AS owner_last_name, u.photo AS owner_photo
    FROM videos v
    JOIN users u ON u.id = v.user_id
"#;

/// Uploads a new video for processing.
///
/// The multipart adapter has already written files to disk and resolved
/// `url`/`thumbnail` to plain strings. The record is always created with
/// status UPLOADED, whatever the caller supplied.
pub async fn upload_video(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let owner = sqlx::query_as::<_, User>(
        r#"
        SELECT id, email, first_name, last_name, password, photo,
               otp, otp_expires_at, created_at, updated_at
        FROM users
        WHERE email = $1
        "#,
    )
    .bind(&claims.sub)
    .fetch_optional(&state.pool)
    .await?
    .ok_or(AppError::NotFound("User not found".to_string()))?;

    let form = process_video_upload(&state.config, multipart).await?;

    let title = form
        .title
        .filter(|t| !t.trim().is_empty())
        .ok_or(AppError::BadRequest("Title is required".to_string()))?;

    // The adapter guarantees url is a resolved string at this point.
    let url = form.url.unwrap_or_default();

    let id = Uuid::new_v4();
    let (created_at, updated_at) = sqlx::query_as::<_, (DateTime<Utc>, DateTime<Utc>)>(
        r#"
        INSERT INTO videos (id, title, description, url, thumbnail, status, user_id)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING created_at, updated_at
        "#,
    )
    .bind(id)
    .bind(&title)
    .bind(&form.description)
    .bind(&url)
    .bind(&form.thumbnail)
    .bind(VideoStatus::Uploaded)
    .bind(owner.id)
    .fetch_one(&state.pool)
    .await?;

    tracing::info!(video_id = %id, user_id = owner.id, "video uploaded");

    let video = VideoResponse {
        id,
        title,
        description: form.description,
        url,
        thumbnail: form.thumbnail,
        status: VideoStatus::Uploaded,
        metadata: serde_json::json!({}),
        user_id: owner.id,
        created_at,
        updated_at,
        user: OwnerProfile {
            id: owner.id,
            email: owner.email,
            first_name: owner.first_name,
            last_name: owner.last_name,
            photo: owner.photo,
        },
    };

    Ok((StatusCode::CREATED, Json(video)))
}

/// Paginated video listing with optional status filter, newest first.
///
/// The count and the page fetch are independent read-only queries and run
/// concurrently against the same filter.
pub async fn list_videos(
    State(pool): State<PgPool>,
    Query(params): Query<VideoListParams>,
) -> Result<impl IntoResponse, AppError> {
    let paging = PageQuery {
        page: params.page,
        limit: params.limit,
    };
    let (page, limit) = (paging.page(), paging.limit());

    let count_fut = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM videos WHERE ($1::video_status IS NULL OR status = $1)",
    )
    .bind(params.status)
    .fetch_one(&pool);

    let page_sql = format!(
        "{SELECT_VIDEO_WITH_OWNER}
         WHERE ($1::video_status IS NULL OR v.status = $1)
         ORDER BY v.created_at DESC
         LIMIT $2 OFFSET $3"
    );
    let page_fut = sqlx::query_as::<_, VideoOwnerRow>(&page_sql)
        .bind(params.status)
        .bind(limit)
        .bind(paging.offset())
        .fetch_all(&pool);

    let (total, rows) = tokio::try_join!(count_fut, page_fut)?;

    let videos: Vec<VideoResponse> = rows.into_iter().map(VideoResponse::from).collect();

    Ok(Json(Paginated::new(videos, total, page, limit)))
}

/// Advances a video through its processing lifecycle.
///
/// Rejects any jump outside UPLOADED → PENDING → PROCESSING →
/// {COMPLETED | FAILED} with 400. Supplied metadata is shallow-merged into
/// the stored JSONB; untouched keys survive.
pub async fn update_status(
    State(pool): State<PgPool>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStatusRequest>,
) -> Result<impl IntoResponse, AppError> {
    let current = sqlx::query_scalar::<_, VideoStatus>("SELECT status FROM videos WHERE id = $1")
        .bind(id)
        .fetch_optional(&pool)
        .await?
        .ok_or(AppError::NotFound("Video not found".to_string()))?;

    if !current.can_transition_to(payload.status) {
        return Err(AppError::BadRequest(format!(
            "Invalid status transition: {} -> {}",
            current.as_str(),
            payload.status.as_str()
        )));
    }

    if payload.metadata.as_ref().is_some_and(|m| !m.is_object()) {
        return Err(AppError::BadRequest(
            "metadata must be a JSON object".to_string(),
        ));
    }
    let metadata = payload.metadata.unwrap_or(serde_json::json!({}));

    // Guarded against concurrent updates: the write only lands if the row
    // still carries the status the transition was validated from.
    let result = sqlx::query(
        r#"
        UPDATE videos
        SET status = $2, metadata = metadata || $3, updated_at = NOW()
        WHERE id = $1 AND status = $4
        "#,
    )
    .bind(id)
    .bind(payload.status)
    .bind(&metadata)
    .bind(current)
    .execute(&pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::Conflict(
            "Video status changed concurrently, please retry".to_string(),
        ));
    }

    let updated = sqlx::query_as::<_, VideoOwnerRow>(&format!(
        "{SELECT_VIDEO_WITH_OWNER} WHERE v.id = $1"
    ))
    .bind(id)
    .fetch_one(&pool)
    .await?;

    tracing::info!(video_id = %id, status = payload.status.as_str(), "video status updated");

    Ok(Json(VideoResponse::from(updated)))
}
