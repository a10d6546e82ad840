// src/handlers/auth.rs

use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use sqlx::PgPool;
use validator::Validate;

use crate::{
    config::Config,
    error::AppError,
    models::user::{
        AuthData, LoginRequest, RequestPasswordResetRequest, ResetPasswordRequest, Role,
        SignUpRequest, User, UserProfile,
    },
    models::response::ApiResponse,
    utils::{
        email::Mailer,
        hash::{hash_password, verify_password},
        jwt::{Claims, sign_jwt},
        otp::{generate_otp, otp_expiry},
    },
};

const SELECT_USER: &str = r#"
    SELECT id, email, first_name, last_name, password, photo,
           otp, otp_expires_at, created_at, updated_at
    FROM users
"#;

async fn find_user_by_email(pool: &PgPool, email: &str) -> Result<Option<User>, AppError> {
    let user = sqlx::query_as::<_, User>(&format!("{SELECT_USER} WHERE email = $1"))
        .bind(email)
        .fetch_optional(pool)
        .await?;
    Ok(user)
}

async fn fetch_roles(pool: &PgPool, user_id: i64) -> Result<Vec<Role>, AppError> {
    let roles = sqlx::query_scalar::<_, Role>(
        "SELECT role FROM user_roles WHERE user_id = $1 ORDER BY id",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(roles)
}

/// Registers a new user.
///
/// Hashes the password using Argon2 before storing it. The user row and its
/// single CLIENT role assignment are created inside one transaction: if
/// either insert fails, neither persists.
/// Returns 201 Created with the signed token and profile.
pub async fn signup(
    State(pool): State<PgPool>,
    State(config): State<Config>,
    Json(payload): Json<SignUpRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    if find_user_by_email(&pool, &payload.email).await?.is_some() {
        return Err(AppError::Conflict("User already exists".to_string()));
    }

    let hashed_password = hash_password(&payload.password)?;
    let token = sign_jwt(
        &payload.email,
        &[Role::Client],
        &config.jwt_secret,
        config.jwt_expiration,
    )?;

    let mut tx = pool.begin().await?;

    let user_id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO users (email, first_name, last_name, password)
        VALUES ($1, $2, $3, $4)
        RETURNING id
        "#,
    )
    .bind(&payload.email)
    .bind(&payload.first_name)
    .bind(&payload.last_name)
    .bind(&hashed_password)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| {
        // Postgres error code for unique violation is 23505
        let is_unique_violation = e
            .as_database_error()
            .and_then(|db| db.code())
            .is_some_and(|code| code == "23505");
        if is_unique_violation {
            AppError::Conflict("User already exists".to_string())
        } else {
            tracing::error!("Failed to create user: {:?}", e);
            AppError::from(e)
        }
    })?;

    sqlx::query("INSERT INTO user_roles (user_id, role) VALUES ($1, $2)")
        .bind(user_id)
        .bind(Role::Client)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    tracing::info!(user_id, email = %payload.email, "user registered");

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::created(
            "User created successfully",
            AuthData {
                token,
                id: user_id,
                email: payload.email,
                first_name: payload.first_name,
                last_name: payload.last_name,
                photo: None,
                roles: vec![Role::Client],
            },
        )),
    ))
}

/// Authenticates a user and returns a JWT token keyed by the email.
///
/// An unknown email and a wrong password both surface as 401; database
/// failures keep their own classification instead of masking it.
pub async fn signin(
    State(pool): State<PgPool>,
    State(config): State<Config>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let user = find_user_by_email(&pool, &payload.email)
        .await?
        .ok_or(AppError::AuthError("User account not found".to_string()))?;

    let is_valid = verify_password(&payload.password, &user.password)?;
    if !is_valid {
        return Err(AppError::AuthError(
            "User account with email or password not found".to_string(),
        ));
    }

    let roles = fetch_roles(&pool, user.id).await?;
    let token = sign_jwt(&user.email, &roles, &config.jwt_secret, config.jwt_expiration)?;

    tracing::info!(user_id = user.id, email = %user.email, "user logged in");

    Ok(Json(ApiResponse::ok(
        "Login successful",
        AuthData {
            token,
            id: user.id,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            photo: user.photo,
            roles,
        },
    )))
}

/// Issues a password-reset OTP.
///
/// Stores a 6-hex-char uppercase OTP with a 1-hour expiry on the user row
/// and emails it to the account address. No token is returned.
pub async fn request_password_reset(
    State(pool): State<PgPool>,
    State(mailer): State<Mailer>,
    Json(payload): Json<RequestPasswordResetRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let user = find_user_by_email(&pool, &payload.email)
        .await?
        .ok_or(AppError::NotFound("User not found".to_string()))?;

    let otp = generate_otp();
    let expires_at = otp_expiry();

    sqlx::query("UPDATE users SET otp = $1, otp_expires_at = $2, updated_at = NOW() WHERE email = $3")
        .bind(&otp)
        .bind(expires_at)
        .bind(&user.email)
        .execute(&pool)
        .await?;

    let body = format!(
        "Dear {},\n\n\
         You have requested to reset your password. Please use the following \
         One-Time Password (OTP) to proceed with the password reset process:\n\n\
         OTP: {}\n\n\
         This OTP is valid for one hour. If you did not request a password \
         reset, please disregard this email.\n\n\
         Best regards,\n\
         Clipflow Support Team",
        user.first_name, otp
    );

    mailer
        .send(&user.email, "Password Reset - One-Time Password (OTP)", &body)
        .await?;

    Ok(Json(ApiResponse::<()>::message("OTP sent to your email")))
}

/// Redeems a password-reset OTP.
///
/// The OTP is single-use: a successful reset replaces the password hash and
/// clears both OTP columns. A missing, mismatched or expired OTP is a 400.
pub async fn reset_password(
    State(pool): State<PgPool>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let user = find_user_by_email(&pool, &payload.email)
        .await?
        .ok_or(AppError::NotFound("User not found".to_string()))?;

    let otp_is_valid = match (&user.otp, user.otp_expires_at) {
        (Some(stored), Some(expires_at)) => *stored == payload.otp && expires_at > Utc::now(),
        _ => false,
    };
    if !otp_is_valid {
        return Err(AppError::BadRequest("Invalid or expired OTP".to_string()));
    }

    let hashed_password = hash_password(&payload.new_password)?;

    sqlx::query(
        r#"
        UPDATE users
        SET password = $1, otp = NULL, otp_expires_at = NULL, updated_at = NOW()
        WHERE email = $2
        "#,
    )
    .bind(&hashed_password)
    .bind(&user.email)
    .execute(&pool)
    .await?;

    tracing::info!(user_id = user.id, "password reset completed");

    Ok(Json(ApiResponse::<()>::message("Password reset successfully")))
}

/// Returns the authenticated user's profile and role list.
pub async fn me(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user = find_user_by_email(&pool, &claims.sub)
        .await?
        .ok_or(AppError::NotFound("User not found".to_string()))?;

    let roles = fetch_roles(&pool, user.id).await?;

    Ok(Json(ApiResponse::ok(
        "User fetched successfully",
        UserProfile {
            id: user.id,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            photo: user.photo,
            roles,
        },
    )))
}
