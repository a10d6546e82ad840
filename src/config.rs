// src/config.rs

use dotenvy::dotenv;
use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    /// Token lifetime in seconds.
    pub jwt_expiration: u64,
    pub rust_log: String,
    /// Directory where uploaded video files are written.
    pub video_upload_dir: String,
    /// Directory where uploaded thumbnails are written.
    pub thumbnail_upload_dir: String,
    /// Empty host means the mailer runs in no-op mode (logs only).
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_username: Option<String>,
    pub smtp_password: Option<String>,
    pub smtp_from: String,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");

        let jwt_secret = env::var("JWT_SECRET").expect("JWT_SECRET must be set");

        let jwt_expiration = env::var("JWT_EXPIRATION_SECONDS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(60 * 60 * 24);

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let video_upload_dir =
            env::var("VIDEO_UPLOAD_DIR").unwrap_or_else(|_| "./uploads/videos".to_string());

        let thumbnail_upload_dir =
            env::var("THUMBNAIL_UPLOAD_DIR").unwrap_or_else(|_| "./uploads/thumbnails".to_string());

        let smtp_host = env::var("SMTP_HOST").unwrap_or_default();
        let smtp_port = env::var("SMTP_PORT")
            .ok()
            .and_then(|v| v.parse::<u16>().ok())
            .unwrap_or(587);
        let smtp_username = env::var("SMTP_USERNAME").ok();
        let smtp_password = env::var("SMTP_PASSWORD").ok();
        let smtp_from =
            env::var("SMTP_FROM").unwrap_or_else(|_| "Clipflow <no-reply@clipflow.local>".to_string());

        Self {
            database_url,
            jwt_secret,
            jwt_expiration,
            rust_log,
            video_upload_dir,
            thumbnail_upload_dir,
            smtp_host,
            smtp_port,
            smtp_username,
            smtp_password,
            smtp_from,
        }
    }

    /// Configuration for tests: no database/SMTP requirements beyond
    /// what the caller supplies.
    pub fn for_tests(database_url: String) -> Self {
        Self {
            database_url,
            jwt_secret: "test_secret_for_integration_tests".to_string(),
            jwt_expiration: 600,
            rust_log: "error".to_string(),
            video_upload_dir: std::env::temp_dir()
                .join("clipflow_test_videos")
                .to_string_lossy()
                .into_owned(),
            thumbnail_upload_dir: std::env::temp_dir()
                .join("clipflow_test_thumbnails")
                .to_string_lossy()
                .into_owned(),
            smtp_host: String::new(),
            smtp_port: 587,
            smtp_username: None,
            smtp_password: None,
            smtp_from: "Clipflow <no-reply@clipflow.local>".to_string(),
        }
    }
}
