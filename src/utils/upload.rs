// src/utils/upload.rs

use std::path::Path;

use axum::extract::Multipart;
use uuid::Uuid;

use crate::{config::Config, error::AppError};

/// Accepted video container mime types.
const ALLOWED_VIDEO_TYPES: [&str; 4] = [
    "video/mp4",
    "video/quicktime",
    "video/x-msvideo",
    "video/x-matroska",
];

/// The fields a video upload request resolves to once all files have been
/// written to disk. `url` and `thumbnail` are plain string paths at this
/// point, never raw upload handles.
#[derive(Debug, Default)]
pub struct VideoUploadForm {
    pub title: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub thumbnail: Option<String>,
}

/// Upload adapter for `POST /videos`.
///
/// Walks the multipart form, writes the `video` (and optional `thumbnail`)
/// file to the configured upload directories under a UUID filename, and
/// collects the plain-text fields. Pre-resolved `url`/`thumbnail` string
/// fields are accepted in place of files.
///
/// Fails with 400 before any video logic runs when no video file or `url`
/// string is present, or when the video mime type is unrecognized.
pub async fn process_video_upload(
    config: &Config,
    mut multipart: Multipart,
) -> Result<VideoUploadForm, AppError> {
    let mut form = VideoUploadForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Malformed multipart body: {}", e)))?
    {
        let Some(name) = field.name().map(|s| s.to_string()) else {
            continue;
        };

        match name.as_str() {
            "video" => {
                let content_type = field.content_type().unwrap_or_default().to_string();
                if !ALLOWED_VIDEO_TYPES.contains(&content_type.as_str()) {
                    return Err(AppError::BadRequest("Invalid video file type".to_string()));
                }
                let stored = store_file(&config.video_upload_dir, field).await?;
                form.url = Some(stored);
            }
            "thumbnail" => {
                if field.file_name().is_some() {
                    let stored = store_file(&config.thumbnail_upload_dir, field).await?;
                    form.thumbnail = Some(stored);
                } else {
                    form.thumbnail = Some(read_text(field).await?);
                }
            }
            "url" => {
                let value = read_text(field).await?;
                // A stored video file already resolved the url; a trailing
                // text field must not orphan it.
                if form.url.is_none() {
                    form.url = Some(value);
                }
            }
            "title" => {
                form.title = Some(read_text(field).await?);
            }
            "description" => {
                form.description = Some(read_text(field).await?);
            }
            // Unknown fields are drained and ignored.
            _ => {
                let _ = field.bytes().await;
            }
        }
    }

    if form.url.as_deref().is_none_or(str::is_empty) {
        return Err(AppError::BadRequest("Video file is required".to_string()));
    }

    Ok(form)
}

async fn read_text(field: axum::extract::multipart::Field<'_>) -> Result<String, AppError> {
    field
        .text()
        .await
        .map_err(|e| AppError::BadRequest(format!("Malformed multipart field: {}", e)))
}

/// Writes the field body to `dir` under a fresh UUID filename, keeping the
/// original extension. Returns the resulting path as a string URL.
async fn store_file(
    dir: &str,
    field: axum::extract::multipart::Field<'_>,
) -> Result<String, AppError> {
    let extension = field
        .file_name()
        .and_then(|n| Path::new(n).extension().and_then(|e| e.to_str()))
        .map(|e| format!(".{}", e.to_lowercase()))
        .unwrap_or_default();

    let bytes = field
        .bytes()
        .await
        .map_err(|e| AppError::BadRequest(format!("Failed to read upload: {}", e)))?;

    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| AppError::InternalServerError(format!("Failed to create upload dir: {}", e)))?;

    let path = format!("{}/{}{}", dir.trim_end_matches('/'), Uuid::new_v4(), extension);

    tokio::fs::write(&path, &bytes)
        .await
        .map_err(|e| AppError::InternalServerError(format!("Failed to store upload: {}", e)))?;

    Ok(path)
}
