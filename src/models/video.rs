// src/models/video.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Video processing lifecycle.
///
/// The only legal walk is UPLOADED → PENDING → PROCESSING → {COMPLETED | FAILED};
/// everything else (self-transitions included) is rejected with 400.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "video_status", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum VideoStatus {
    Uploaded,
    Pending,
    Processing,
    Completed,
    Failed,
}

impl VideoStatus {
    pub fn can_transition_to(self, next: VideoStatus) -> bool {
        matches!(
            (self, next),
            (VideoStatus::Uploaded, VideoStatus::Pending)
                | (VideoStatus::Pending, VideoStatus::Processing)
                | (VideoStatus::Processing, VideoStatus::Completed)
                | (VideoStatus::Processing, VideoStatus::Failed)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            VideoStatus::Uploaded => "UPLOADED",
            VideoStatus::Pending => "PENDING",
            VideoStatus::Processing => "PROCESSING",
            VideoStatus::Completed => "COMPLETED",
            VideoStatus::Failed => "FAILED",
        }
    }
}

/// Reduced owner profile joined onto every video response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerProfile {
    pub id: i64,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub photo: Option<String>,
}

/// Flat row produced by the videos-joined-with-owner queries.
#[derive(Debug, Clone, FromRow)]
pub struct VideoOwnerRow {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub url: String,
    pub thumbnail: Option<String>,
    pub status: VideoStatus,
    pub metadata: serde_json::Value,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub owner_email: String,
    pub owner_first_name: String,
    pub owner_last_name: String,
    pub owner_photo: Option<String>,
}

/// A video record joined with its reduced owner profile.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoResponse {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub url: String,
    pub thumbnail: Option<String>,
    pub status: VideoStatus,
    pub metadata: serde_json::Value,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub user: OwnerProfile,
}

impl From<VideoOwnerRow> for VideoResponse {
    fn from(row: VideoOwnerRow) -> Self {
        VideoResponse {
            id: row.id,
            title: row.title,
            description: row.description,
            url: row.url,
            thumbnail: row.thumbnail,
            status: row.status,
            metadata: row.metadata,
            user_id: row.user_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
            user: OwnerProfile {
                id: row.user_id,
                email: row.owner_email,
                first_name: row.owner_first_name,
                last_name: row.owner_last_name,
                photo: row.owner_photo,
            },
        }
    }
}

/// Query parameters for the paginated video listing.
#[derive(Debug, Deserialize)]
pub struct VideoListParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub status: Option<VideoStatus>,
}

/// Body of `PATCH /videos/{id}/status`.
#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: VideoStatus,
    pub metadata: Option<serde_json::Value>,
}
