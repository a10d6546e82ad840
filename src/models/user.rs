// src/models/user.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Closed set of role values a user may be assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Admin,
    Client,
    Guest,
}

/// Represents the 'users' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,

    /// Unique email, doubles as the login identity.
    pub email: String,

    pub first_name: String,
    pub last_name: String,

    /// Argon2 password hash.
    /// Skipped during serialization to prevent leaking sensitive data.
    #[serde(skip)]
    pub password: String,

    pub photo: Option<String>,

    /// Password-reset OTP. Null unless a reset is pending;
    /// cleared again on successful reset.
    #[serde(skip)]
    pub otp: Option<String>,
    #[serde(skip)]
    pub otp_expires_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One `(user, role)` assignment row, used to group roles per user.
#[derive(Debug, Clone, FromRow)]
pub struct RoleRow {
    pub user_id: i64,
    pub role: Role,
}

/// One agent association row, used to group agents per user.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentRow {
    pub id: i64,
    #[serde(skip)]
    pub user_id: i64,
    pub agency_name: String,
}

/// DTO for user signup.
/// An optional `roles` field is accepted but ignored: every signup is
/// assigned exactly one CLIENT role.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SignUpRequest {
    #[validate(email(message = "A valid email address is required."))]
    pub email: String,
    #[validate(length(
        min = 8,
        max = 128,
        message = "Password length must be between 8 and 128 characters."
    ))]
    pub password: String,
    #[validate(length(min = 1, max = 100))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100))]
    pub last_name: String,
}

/// DTO for user login.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 128))]
    pub password: String,
}

/// DTO for requesting a password-reset OTP.
#[derive(Debug, Deserialize, Validate)]
pub struct RequestPasswordResetRequest {
    #[validate(email)]
    pub email: String,
}

/// DTO for redeeming a password-reset OTP.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(equal = 6, message = "OTP must be 6 characters."))]
    pub otp: String,
    #[validate(length(
        min = 8,
        max = 128,
        message = "Password length must be between 8 and 128 characters."
    ))]
    pub new_password: String,
}

/// Profile plus role list, returned by `/me` and embedded in auth responses.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: i64,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub photo: Option<String>,
    pub roles: Vec<Role>,
}

/// Auth response payload: signed token plus the profile it belongs to.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthData {
    pub token: String,
    pub id: i64,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub photo: Option<String>,
    pub roles: Vec<Role>,
}

/// Listing item: profile with roles and agent associations eagerly loaded.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: i64,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub photo: Option<String>,
    pub created_at: DateTime<Utc>,
    pub roles: Vec<Role>,
    pub agents: Vec<AgentRow>,
}
