use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Application-level errors
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Cache error: {0}")]
    Cache(#[from] redis::RedisError),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Validation failure scoped to a single request field
    #[error("{message}")]
    Validation { field: String, message: String },

    #[error("{message}")]
    Unauthorized { field: String, message: String },

    #[error("{message}")]
    Forbidden { field: String, message: String },

    #[error("External API error: {0}")]
    ExternalApi(String),

    /// Upstream error already mapped to an HTTP status (e.g. TMDB status codes)
    #[error("Upstream error ({status}): {message}")]
    Upstream { status: StatusCode, message: String },

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        AppError::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }

    pub fn unauthorized(field: &str, message: impl Into<String>) -> Self {
        AppError::Unauthorized {
            field: field.to_string(),
            message: message.into(),
        }
    }

    pub fn forbidden(field: &str, message: impl Into<String>) -> Self {
        AppError::Forbidden {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Field-scoped errors use the `errors` array shape the frontend
        // renders next to form fields; everything else is a plain message.
        match self {
            AppError::Validation { field, message } => {
                field_error_response(StatusCode::BAD_REQUEST, &field, &message)
            }
            AppError::Unauthorized { field, message } => {
                let mut response =
                    field_error_response(StatusCode::UNAUTHORIZED, &field, &message);
                response.headers_mut().insert(
                    header::WWW_AUTHENTICATE,
                    header::HeaderValue::from_static("Bearer"),
                );
                response
            }
            AppError::Forbidden { field, message } => {
                field_error_response(StatusCode::FORBIDDEN, &field, &message)
            }
            AppError::NotFound(message) => {
                (StatusCode::NOT_FOUND, Json(json!({ "error": message }))).into_response()
            }
            AppError::Upstream { status, message } => {
                (status, Json(json!({ "error": message }))).into_response()
            }
            AppError::ExternalApi(message) => {
                (StatusCode::BAD_GATEWAY, Json(json!({ "error": message }))).into_response()
            }
            AppError::HttpClient(_) => (
                StatusCode::BAD_GATEWAY,
                Json(json!({ "error": self.to_string() })),
            )
                .into_response(),
            AppError::Database(_) | AppError::Cache(_) | AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": self.to_string() })),
            )
                .into_response(),
        }
    }
}

fn field_error_response(status: StatusCode, field: &str, message: &str) -> Response {
    let body = Json(json!({
        "errors": [{ "field": field, "message": message }]
    }));

    (status, body).into_response()
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_status() {
        let err = AppError::validation("username", "Username already taken");
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_unauthorized_sets_www_authenticate() {
        let err = AppError::unauthorized("username", "Incorrect username or password");
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers().get(header::WWW_AUTHENTICATE).unwrap(),
            "Bearer"
        );
    }

    #[test]
    fn test_not_found_status() {
        let err = AppError::NotFound("Movie not found".to_string());
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_upstream_preserves_status() {
        let err = AppError::Upstream {
            status: StatusCode::NOT_FOUND,
            message: "The resource you requested could not be found.".to_string(),
        };
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
