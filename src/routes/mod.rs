use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderValue, Method, StatusCode},
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

pub mod auth;
pub mod movies;
pub mod users;

use crate::{
    error::AppError,
    models::User,
    services::security::verify_user_token,
    state::AppState,
};

/// Creates the application router with all routes
pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.frontend_url);

    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .nest("/movies", movies::router())
        .nest("/auth", auth::router())
        .nest("/users", users::router())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(frontend_url: &str) -> CorsLayer {
    let origins: Vec<HeaderValue> = [
        frontend_url,
        "http://localhost:5173",
        "http://127.0.0.1:5173",
    ]
    .iter()
    .filter_map(|origin| origin.parse().ok())
    .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
}

async fn root() -> Json<Value> {
    Json(json!({ "message": "Welcome to the MovieCompass App API!" }))
}

/// Health check endpoint
async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

/// Extractor for the authenticated user behind a Bearer token
pub struct CurrentUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let not_authenticated = || AppError::unauthorized("token", "Not authenticated");

        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or_else(not_authenticated)?;

        let user_id = verify_user_token(&state.config.secret_key, token)?;

        let user = state
            .users
            .find_by_id(&user_id)
            .await?
            .ok_or_else(not_authenticated)?;

        if !user.is_verified {
            return Err(AppError::forbidden(
                "verification",
                "Please verify your email before logging in.",
            ));
        }

        Ok(CurrentUser(user))
    }
}
