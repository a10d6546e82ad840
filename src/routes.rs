// src/routes.rs

use axum::{
    Router,
    extract::DefaultBodyLimit,
    handler::Handler,
    http::Method,
    middleware,
    routing::{delete, get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{auth, users, videos},
    state::AppState,
    utils::jwt::auth_middleware,
};

/// Assembles the main application router.
///
/// * Merges all sub-routers (auth, videos).
/// * Applies global middleware (Trace, CORS).
/// * Injects global state (pool, config, mailer).
pub fn create_router(state: AppState) -> Router {
    let origins = [
        "http://localhost:3000".parse().unwrap(),
        "http://127.0.0.1:3000".parse().unwrap(),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    let require_auth = middleware::from_fn_with_state(state.clone(), auth_middleware);

    let auth_routes = Router::new()
        .route("/signup", post(auth::signup))
        .route("/signin", post(auth::signin))
        .route("/request-password-reset", post(auth::request_password_reset))
        .route("/reset-password", post(auth::reset_password))
        .route("/users", get(users::list_users))
        .route("/user/count-by-month/{year}", get(users::count_by_month))
        // Protected account routes
        .merge(
            Router::new()
                .route("/me", get(auth::me))
                .route("/delete/{id}", delete(users::delete_user))
                .layer(require_auth.clone()),
        );

    let video_routes = Router::new()
        // GET is public; POST and PATCH require a bearer token. The auth
        // layer sits on the handlers so both methods can share "/".
        .route(
            "/",
            get(videos::list_videos).post(videos::upload_video.layer(require_auth.clone())),
        )
        .route(
            "/{id}/status",
            axum::routing::patch(videos::update_status.layer(require_auth)),
        )
        // Uploads up to 500MB
        .layer(DefaultBodyLimit::max(500 * 1024 * 1024));

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/videos", video_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
